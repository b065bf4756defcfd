use crate::{
    args::ArgList,
    interface::MethodSignature,
    net::{FailureKind, RemoteFailure, Request, Response},
    types::{join_types, Encode, Number, Transmittable, Type, Typed, Value},
};
use std::{collections::BTreeMap, fmt, marker::PhantomData, sync::Arc};
use thiserror::Error;
use tokio::task::{self, JoinError};
use tracing::{debug, warn};

/// A service object that can be bound to a server.
///
/// `register` fills the method table once, at bind time. Methods take `&self`
/// and may run concurrently from many connections, so any mutable state must
/// live behind the service's own locks or atomics.
///
/// The [`service!`](crate::service) macro writes this impl from a method list.
pub trait Service: Send + Sync + Sized + 'static {
    fn register(table: &mut MethodTable<Self>) -> Result<(), RegisterError>;
}

/// A registered method with its type erased.
pub trait Method<S>: Send + Sync {
    fn signature(&self) -> &MethodSignature;
    fn invoke(&self, service: &S, args: Vec<Value>) -> Result<Value, RemoteFailure>;
}

/// What a service method may return: a plain transmittable value, or a
/// `Result` whose error is reported to the caller by its `Display` text.
pub trait IntoOutcome {
    fn return_type() -> Type;
    fn into_outcome(self) -> Result<Value, String>;
}

impl<T: Transmittable, E: fmt::Display> IntoOutcome for Result<T, E> {
    fn return_type() -> Type {
        T::rpc_type()
    }

    fn into_outcome(self) -> Result<Value, String> {
        self.map(T::encode).map_err(|e| e.to_string())
    }
}

macro_rules! impl_into_outcome {
    ($($rust_type:ty),*) => {
        $(
            impl IntoOutcome for $rust_type {
                fn return_type() -> Type {
                    <$rust_type as Typed>::rpc_type()
                }

                fn into_outcome(self) -> Result<Value, String> {
                    Ok(<$rust_type as Encode>::encode(self))
                }
            }
        )*
    };
}

impl_into_outcome!((), bool, i32, u32, i64, f64, Number, String, Value);

impl<T: Transmittable> IntoOutcome for Vec<T> {
    fn return_type() -> Type {
        Self::rpc_type()
    }

    fn into_outcome(self) -> Result<Value, String> {
        Ok(Self::encode(self))
    }
}

impl<T: Transmittable> IntoOutcome for Option<T> {
    fn return_type() -> Type {
        Self::rpc_type()
    }

    fn into_outcome(self) -> Result<Value, String> {
        Ok(Self::encode(self))
    }
}

struct TypedMethod<S, Args, R, F> {
    handler: F,
    signature: MethodSignature,
    _marker: PhantomData<fn(&S, Args) -> R>,
}

impl<S, Args, R, F> Method<S> for TypedMethod<S, Args, R, F>
where
    Args: ArgList,
    R: IntoOutcome,
    F: Fn(&S, Args) -> R + Send + Sync,
{
    fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    fn invoke(&self, service: &S, args: Vec<Value>) -> Result<Value, RemoteFailure> {
        let args = Args::decode_args(args)
            .map_err(|err| RemoteFailure::new(FailureKind::ArgumentMismatch, err.to_string()))?;
        (self.handler)(service, args)
            .into_outcome()
            .map_err(|message| RemoteFailure::new(FailureKind::Invocation, message))
    }
}

/// Maps method names to their overloads, in registration order.
///
/// Resolution walks a name's overloads in the order they were added and takes
/// the first one whose arity matches and whose parameter types accept the
/// argument values. Register more specific overloads before broader ones.
pub struct MethodTable<S> {
    methods: BTreeMap<String, Vec<Arc<dyn Method<S>>>>,
}

impl<S> Default for MethodTable<S> {
    fn default() -> Self {
        Self {
            methods: BTreeMap::new(),
        }
    }
}

impl<S: 'static> MethodTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    ///
    /// Fails if `name` already has an overload with exactly these parameter
    /// types, since the second one could never be resolved.
    pub fn add<Args, R, F>(&mut self, name: &str, handler: F) -> Result<&mut Self, RegisterError>
    where
        Args: ArgList + 'static,
        R: IntoOutcome + 'static,
        F: Fn(&S, Args) -> R + Send + Sync + 'static,
    {
        let signature = MethodSignature {
            name: name.to_owned(),
            params: Args::param_types(),
            ret: R::return_type(),
        };
        let overloads = self.methods.entry(name.to_owned()).or_default();
        if overloads
            .iter()
            .any(|m| m.signature().params == signature.params)
        {
            return Err(RegisterError::DuplicateOverload(signature));
        }
        overloads.push(Arc::new(TypedMethod {
            handler,
            signature,
            _marker: PhantomData,
        }));
        Ok(self)
    }

    /// Finds the first overload of `name` that can take `args`.
    pub fn resolve(
        &self,
        name: &str,
        args: &[Value],
    ) -> Result<Arc<dyn Method<S>>, NoMatchingMethod> {
        self.methods
            .get(name)
            .into_iter()
            .flatten()
            .find(|m| {
                let params = &m.signature().params;
                params.len() == args.len() && params.iter().zip(args).all(|(p, a)| p.accepts(a))
            })
            .cloned()
            .ok_or_else(|| NoMatchingMethod {
                method: name.to_owned(),
                arg_types: args.iter().map(Value::runtime_type).collect(),
            })
    }

    /// Every registered signature, by name and then registration order.
    pub fn signatures(&self) -> Vec<MethodSignature> {
        self.methods
            .values()
            .flatten()
            .map(|m| m.signature().clone())
            .collect()
    }

    /// Number of registered overloads.
    pub fn len(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Resolves and runs calls against one kind of [`Service`].
pub struct Dispatcher<S> {
    table: MethodTable<S>,
}

impl<S: Service> Dispatcher<S> {
    pub fn new() -> Result<Self, RegisterError> {
        let mut table = MethodTable::new();
        S::register(&mut table)?;
        Ok(Self { table })
    }

    pub fn table(&self) -> &MethodTable<S> {
        &self.table
    }

    pub fn signatures(&self) -> Vec<MethodSignature> {
        self.table.signatures()
    }

    /// Resolves `name` against the arguments and runs it on the blocking pool.
    ///
    /// Every method-level failure, including a panic inside the service, comes
    /// back as a [`RemoteFailure`].
    pub async fn call(
        &self,
        service: &Arc<S>,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, RemoteFailure> {
        let method = self
            .table
            .resolve(name, &args)
            .map_err(|err| RemoteFailure::new(FailureKind::NoMatchingMethod, err.to_string()))?;
        debug!(signature = %method.signature(), "invoking");

        let service = Arc::clone(service);
        match task::spawn_blocking(move || method.invoke(&service, args)).await {
            Ok(outcome) => outcome,
            Err(err) => Err(RemoteFailure::new(FailureKind::Panic, panic_message(err))),
        }
    }

    pub(crate) async fn dispatch(&self, service: &Arc<S>, request: Request) -> Response {
        let Request { method, args } = request;
        match self.call(service, &method, args).await {
            Ok(value) => Response::Return(value),
            Err(failure) => {
                warn!(%method, kind = ?failure.kind(), error = %failure, "call failed");
                Response::Failure(failure)
            }
        }
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "service method panicked".to_owned()),
        Err(err) => err.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no matching method found: {method}({})", join_types(.arg_types))]
pub struct NoMatchingMethod {
    pub method: String,
    pub arg_types: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("overload {0} is already registered")]
    DuplicateOverload(MethodSignature),
}
