use crate::types::{Decode, Transmittable, Type, TypeMismatch, Typed, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A typed parameter list, implemented for tuples of [`Transmittable`] types
/// up to eight elements. `()` is the empty parameter list.
pub trait ArgList: Sized {
    fn param_types() -> Vec<Type>;
    fn decode_args(args: Vec<Value>) -> Result<Self, ArgsMismatch>;
}

#[derive(Debug, Clone, PartialEq, Error, Deserialize, Serialize)]
pub enum ArgsMismatch {
    #[error("expected {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("argument {index}: {mismatch}")]
    Type { index: usize, mismatch: TypeMismatch },
}

macro_rules! impl_arg_list {
    ($len:literal; $($idx:tt $ty:ident $var:ident),*) => {
        impl<$($ty: Transmittable),*> ArgList for ($($ty,)*) {
            fn param_types() -> Vec<Type> {
                vec![$(<$ty as Typed>::rpc_type()),*]
            }

            fn decode_args(args: Vec<Value>) -> Result<Self, ArgsMismatch> {
                let got = args.len();
                let [$($var),*]: [Value; $len] = args
                    .try_into()
                    .map_err(|_| ArgsMismatch::Arity { expected: $len, got })?;
                Ok(($(
                    <$ty as Decode>::decode($var)
                        .map_err(|mismatch| ArgsMismatch::Type { index: $idx, mismatch })?,
                )*))
            }
        }
    };
}

impl_arg_list!(0;);
impl_arg_list!(1; 0 A a);
impl_arg_list!(2; 0 A a, 1 B b);
impl_arg_list!(3; 0 A a, 1 B b, 2 C c);
impl_arg_list!(4; 0 A a, 1 B b, 2 C c, 3 D d);
impl_arg_list!(5; 0 A a, 1 B b, 2 C c, 3 D d, 4 E e);
impl_arg_list!(6; 0 A a, 1 B b, 2 C c, 3 D d, 4 E e, 5 F f);
impl_arg_list!(7; 0 A a, 1 B b, 2 C c, 3 D d, 4 E e, 5 F f, 6 G g);
impl_arg_list!(8; 0 A a, 1 B b, 2 C c, 3 D d, 4 E e, 5 F f, 6 G g, 7 H h);
