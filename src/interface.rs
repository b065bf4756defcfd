use crate::{
    net::client::Stub,
    types::{join_types, Type},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({}) -> {}", self.name, join_types(&self.params), self.ret)
    }
}

/// Description of a remote interface: the methods a proxy promises to forward.
///
/// Built once when a proxy is created and checked with [`Interface::validate`]
/// before any connection is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    name: String,
    methods: Vec<MethodSignature>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, name: impl Into<String>, params: Vec<Type>, ret: Type) -> Self {
        self.methods.push(MethodSignature {
            name: name.into(),
            params,
            ret,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|m| m.name.as_str())
    }

    /// Rejects the interface if any parameter or return type has no wire
    /// representation. Reports the first offender in declaration order.
    pub fn validate(&self) -> Result<(), InvalidInterface> {
        for method in &self.methods {
            let slots = method
                .params
                .iter()
                .enumerate()
                .map(|(i, ty)| (Slot::Param(i), ty))
                .chain([(Slot::Return, &method.ret)]);

            for (slot, ty) in slots {
                if !ty.is_transmittable() {
                    return Err(InvalidInterface {
                        interface: self.name.clone(),
                        method: method.name.clone(),
                        slot,
                        ty: ty.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Where in a signature a type appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Param(usize),
    Return,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Slot::Param(i) => write!(f, "parameter {i}"),
            Slot::Return => f.write_str("return value"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid interface {interface}: {slot} of {method} has non-transmittable type {ty}")]
pub struct InvalidInterface {
    pub interface: String,
    pub method: String,
    pub slot: Slot,
    pub ty: Type,
}

/// A client-side adapter for a remote interface.
///
/// Implementors forward each of their methods to [`Stub::call`]. The
/// [`proxy!`](crate::proxy) macro writes this impl; hand-written adapters work
/// the same way.
pub trait RemoteInterface: Sized {
    fn interface() -> Interface;
    fn from_stub(stub: Stub) -> Self;
}
