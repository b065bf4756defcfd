use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The declared type of a parameter or return value.
///
/// Every variant except [`Type::Opaque`] has a wire representation. Compound
/// types are transmittable iff their element type is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Type {
    Nil,
    Bool,
    Int,
    /// An `Int` that fits in 32 signed bits.
    Int32,
    /// An `Int` that fits in 32 unsigned bits.
    UInt32,
    Float,
    /// Numeric supertype, accepts both [`Type::Int`] and [`Type::Float`] values.
    Number,
    String,
    List(Box<Type>),
    /// Accepts [`Value::Nil`] or anything the inner type accepts.
    Optional(Box<Type>),
    /// Accepts every value.
    Any,
    /// A named type with no wire representation (a socket, a file handle, a callback).
    Opaque(String),
}

impl Type {
    pub fn list(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }

    pub fn optional(inner: Type) -> Self {
        Type::Optional(Box::new(inner))
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        Type::Opaque(name.into())
    }

    /// Whether values of this type can be written to and rebuilt from the wire
    /// without outside context.
    pub fn is_transmittable(&self) -> bool {
        match self {
            Type::Opaque(_) => false,
            Type::List(elem) | Type::Optional(elem) => elem.is_transmittable(),
            _ => true,
        }
    }

    /// Assignability check: can a parameter of this type take `value`?
    ///
    /// This is a covariant match, not type equality. A `Number` parameter
    /// takes an `Int`, a `List<Number>` takes a list of ints and floats.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Type::Any, _) => true,
            (Type::Nil, Value::Nil)
            | (Type::Bool, Value::Bool(_))
            | (Type::Int, Value::Int(_))
            | (Type::Float, Value::Float(_))
            | (Type::String, Value::String(_)) => true,
            (Type::Int32, Value::Int(n)) => i32::try_from(*n).is_ok(),
            (Type::UInt32, Value::Int(n)) => u32::try_from(*n).is_ok(),
            (Type::Number, Value::Int(_) | Value::Float(_)) => true,
            (Type::List(elem), Value::List(items)) => items.iter().all(|item| elem.accepts(item)),
            (Type::Optional(_), Value::Nil) => true,
            (Type::Optional(inner), value) => inner.accepts(value),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Nil => f.write_str("Nil"),
            Type::Bool => f.write_str("Bool"),
            Type::Int => f.write_str("Int"),
            Type::Int32 => f.write_str("Int32"),
            Type::UInt32 => f.write_str("UInt32"),
            Type::Float => f.write_str("Float"),
            Type::Number => f.write_str("Number"),
            Type::String => f.write_str("String"),
            Type::List(elem) => write!(f, "List<{elem}>"),
            Type::Optional(inner) => write!(f, "Optional<{inner}>"),
            Type::Any => f.write_str("Any"),
            Type::Opaque(name) => f.write_str(name),
        }
    }
}

pub(crate) fn join_types(types: &[Type]) -> String {
    types
        .iter()
        .map(Type::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A self-describing value as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// The most specific [`Type`] describing this value.
    pub fn runtime_type(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::String(_) => Type::String,
            Value::List(items) => {
                let mut types = items.iter().map(Value::runtime_type);
                let elem = match types.next() {
                    Some(first) if types.all(|t| t == first) => first,
                    _ => Type::Any,
                };
                Type::list(elem)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

/// A number that is either integral or floating point.
///
/// Used where an interface wants to promise "some number" without pinning
/// down the representation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self {
            Number::Int(n) => Some(n),
            Number::Float(_) => None,
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::Int(n)
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number::Int(n.into())
    }
}

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        Number::Float(x)
    }
}

impl PartialEq<i64> for Number {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

pub trait Typed {
    fn rpc_type() -> Type;
}

pub trait Encode {
    fn encode(val: Self) -> Value;
}

pub trait Decode: Sized {
    fn decode(val: Value) -> Result<Self, TypeMismatch>;
}

/// A Rust type that can cross the wire in both directions.
pub trait Transmittable: Typed + Encode + Decode {}

impl<T: Typed + Encode + Decode> Transmittable for T {}

macro_rules! impl_encode_decode {
    ($rust_type:ty, $rpc_type:expr, $encode_name:pat => $encode_expr:expr, $($from_rpc_arm:tt)*) => {
        impl Typed for $rust_type {
            fn rpc_type() -> Type {
                $rpc_type
            }
        }

        impl Encode for $rust_type {
            fn encode($encode_name: $rust_type) -> Value {
                $encode_expr
            }
        }

        impl Decode for $rust_type {
            fn decode(val: Value) -> Result<Self, TypeMismatch> {
                Ok(match val {
                    $($from_rpc_arm)*,
                    val => return Err(TypeMismatch::new(val, <Self as Typed>::rpc_type())),
                })
            }
        }

        impl From<$rust_type> for Value {
            fn from(val: $rust_type) -> Value {
                <$rust_type as Encode>::encode(val)
            }
        }
    };
}

impl_encode_decode!((), Type::Nil, () => Value::Nil, Value::Nil => ());
impl_encode_decode!(bool, Type::Bool, b => Value::Bool(b), Value::Bool(b) => b);
impl_encode_decode!(i64, Type::Int, n => Value::Int(n), Value::Int(n) => n);
impl_encode_decode!(f64, Type::Float, x => Value::Float(x), Value::Float(x) => x);
impl_encode_decode!(String, Type::String, s => Value::String(s), Value::String(s) => s);
impl_encode_decode!(
    i32,
    Type::Int32,
    n => Value::Int(n.into()),
    Value::Int(n) => match i32::try_from(n) {
        Ok(n) => n,
        Err(_) => return Err(TypeMismatch::new(Value::Int(n), Type::Int32)),
    }
);
impl_encode_decode!(
    u32,
    Type::UInt32,
    n => Value::Int(n.into()),
    Value::Int(n) => match u32::try_from(n) {
        Ok(n) => n,
        Err(_) => return Err(TypeMismatch::new(Value::Int(n), Type::UInt32)),
    }
);
impl_encode_decode!(
    Number,
    Type::Number,
    n => match n {
        Number::Int(n) => Value::Int(n),
        Number::Float(x) => Value::Float(x),
    },
    Value::Int(n) => Number::Int(n),
    Value::Float(x) => Number::Float(x)
);

impl Typed for Value {
    fn rpc_type() -> Type {
        Type::Any
    }
}

impl Encode for Value {
    fn encode(val: Value) -> Value {
        val
    }
}

impl Decode for Value {
    fn decode(val: Value) -> Result<Self, TypeMismatch> {
        Ok(val)
    }
}

impl<T: Transmittable> Typed for Vec<T> {
    fn rpc_type() -> Type {
        Type::list(T::rpc_type())
    }
}

impl<T: Transmittable> Encode for Vec<T> {
    fn encode(val: Vec<T>) -> Value {
        Value::List(val.into_iter().map(T::encode).collect())
    }
}

impl<T: Transmittable> Decode for Vec<T> {
    fn decode(val: Value) -> Result<Self, TypeMismatch> {
        match val {
            Value::List(items) => items.into_iter().map(T::decode).collect(),
            val => Err(TypeMismatch::new(val, Self::rpc_type())),
        }
    }
}

// `Some(())` encodes to `Nil` and comes back as `None`.
impl<T: Transmittable> Typed for Option<T> {
    fn rpc_type() -> Type {
        Type::optional(T::rpc_type())
    }
}

impl<T: Transmittable> Encode for Option<T> {
    fn encode(val: Option<T>) -> Value {
        val.map_or(Value::Nil, T::encode)
    }
}

impl<T: Transmittable> Decode for Option<T> {
    fn decode(val: Value) -> Result<Self, TypeMismatch> {
        match val {
            Value::Nil => Ok(None),
            val => T::decode(val).map(Some),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error, Deserialize, Serialize)]
#[error("type error: {value:?} :/: {expected_type}")]
pub struct TypeMismatch {
    value: Value,
    expected_type: Type,
}

impl TypeMismatch {
    pub(crate) fn new(value: Value, expected_type: Type) -> Self {
        Self {
            value,
            expected_type,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn expected_type(&self) -> &Type {
        &self.expected_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_accepts_ints_and_floats() {
        assert!(Type::Number.accepts(&Value::Int(3)));
        assert!(Type::Number.accepts(&Value::Float(0.5)));
        assert!(!Type::Number.accepts(&Value::from("3")));
        assert!(!Type::Int.accepts(&Value::Float(3.0)));
    }

    #[test]
    fn compound_types_check_their_elements() {
        let numbers = Type::list(Type::Number);
        assert!(numbers.accepts(&Value::List(vec![Value::Int(1), Value::Float(2.5)])));
        assert!(numbers.accepts(&Value::List(vec![])));
        assert!(!numbers.accepts(&Value::List(vec![Value::Int(1), Value::Nil])));

        let maybe = Type::optional(Type::String);
        assert!(maybe.accepts(&Value::Nil));
        assert!(maybe.accepts(&Value::from("x")));
        assert!(!maybe.accepts(&Value::Bool(true)));

        assert!(Type::Any.accepts(&Value::List(vec![Value::Nil])));
    }

    #[test]
    fn opaque_types_are_not_transmittable() {
        assert!(Type::Number.is_transmittable());
        assert!(Type::list(Type::optional(Type::String)).is_transmittable());
        assert!(!Type::opaque("TcpStream").is_transmittable());
        assert!(!Type::list(Type::opaque("TcpStream")).is_transmittable());
        assert!(!Type::opaque("Callback").accepts(&Value::Nil));
    }

    #[test]
    fn runtime_type_of_lists() {
        let ints = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(ints.runtime_type(), Type::list(Type::Int));

        let mixed = Value::List(vec![Value::Int(1), Value::from("two")]);
        assert_eq!(mixed.runtime_type(), Type::list(Type::Any));
        assert_eq!(Value::List(vec![]).runtime_type(), Type::list(Type::Any));
    }

    #[test]
    fn decode_reports_mismatch() {
        let err = String::decode(Value::Int(4)).unwrap_err();
        assert_eq!(err.value(), &Value::Int(4));
        assert_eq!(err.expected_type(), &Type::String);

        let err = i32::decode(Value::Int(i64::MAX)).unwrap_err();
        assert_eq!(err.expected_type(), &Type::Int32);
    }

    #[test]
    fn narrow_ints_accept_only_what_they_decode() {
        for n in [0, -1, i64::from(i32::MAX), i64::from(i32::MIN), i64::MAX, i64::from(u32::MAX)] {
            let value = Value::Int(n);
            assert_eq!(Type::Int32.accepts(&value), i32::decode(value.clone()).is_ok());
            assert_eq!(Type::UInt32.accepts(&value), u32::decode(value).is_ok());
        }
        assert!(!Type::Int32.accepts(&Value::Float(1.0)));
        assert!(Type::Int.accepts(&Value::Int(i64::MAX)));
        assert_eq!(u32::encode(7), Value::Int(7));
    }

    #[test]
    fn containers_encode_elementwise() {
        let encoded = Vec::<Option<i64>>::encode(vec![Some(1), None]);
        assert_eq!(encoded, Value::List(vec![Value::Int(1), Value::Nil]));
        assert_eq!(
            Vec::<Option<i64>>::decode(encoded).unwrap(),
            vec![Some(1), None]
        );
        assert_eq!(
            <Vec<Option<i64>>>::rpc_type(),
            Type::list(Type::optional(Type::Int))
        );

        assert!(Vec::<i64>::decode(Value::List(vec![Value::from("x")])).is_err());
    }

    #[test]
    fn number_decodes_either_representation() {
        assert_eq!(Number::decode(Value::Int(5)).unwrap(), 5i64);
        assert_eq!(
            Number::decode(Value::Float(1.5)).unwrap(),
            Number::Float(1.5)
        );
        assert!(Number::decode(Value::Bool(false)).is_err());
        assert_eq!(Number::from(2.0).as_f64(), 2.0);
    }
}
