/// Declares a proxy type for a remote interface.
///
/// Each listed method becomes an `async fn` that forwards its arguments to
/// [`Stub::call`](crate::Stub::call) and returns `Result<Ret, CallError>`.
/// Parameters accept anything that converts into the declared type. The wire
/// name is the method name unless renamed with `as "name"`.
///
/// ```ignore
/// rpcproxy::proxy! {
///     pub struct Greeter {
///         fn greet(name: String) -> String;
///         fn greet_number as "greet"(n: Number) -> String;
///     }
/// }
/// ```
#[macro_export]
macro_rules! proxy {
    (
        $(#[$meta:meta])*
        $vis:vis struct $proxy:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident $(as $wire:literal)? ( $($arg:ident : $arg_ty:ty),* $(,)? ) -> $ret:ty;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $proxy {
            stub: $crate::Stub,
        }

        impl $crate::RemoteInterface for $proxy {
            fn interface() -> $crate::Interface {
                $crate::Interface::new(stringify!($proxy))
                    $(
                        .method(
                            $crate::__wire_name!($method $(, $wire)?),
                            vec![$(<$arg_ty as $crate::Typed>::rpc_type()),*],
                            <$ret as $crate::Typed>::rpc_type(),
                        )
                    )*
            }

            fn from_stub(stub: $crate::Stub) -> Self {
                Self { stub }
            }
        }

        impl $proxy {
            $(
                $(#[$method_meta])*
                pub async fn $method(
                    &self,
                    $($arg: impl Into<$arg_ty>),*
                ) -> ::std::result::Result<$ret, $crate::CallError> {
                    let args = vec![$(<$arg_ty as $crate::Encode>::encode($arg.into())),*];
                    self.stub
                        .call::<$ret>($crate::__wire_name!($method $(, $wire)?), args)
                        .await
                }
            )*
        }
    };
}

/// Implements [`Service`](crate::Service) by registering the listed methods.
///
/// Every method is called as `self.method(args..)` and may return a
/// transmittable value or a `Result` of one. Methods sharing a wire name
/// (through `as "name"`) become overloads, resolved in the listed order.
///
/// ```ignore
/// rpcproxy::service! {
///     GreeterImpl {
///         fn greet(name: String);
///         fn greet_number as "greet"(n: Number);
///     }
/// }
/// ```
#[macro_export]
macro_rules! service {
    (
        $svc:ty {
            $(
                fn $method:ident $(as $wire:literal)? ( $($arg:ident : $arg_ty:ty),* $(,)? );
            )*
        }
    ) => {
        impl $crate::Service for $svc {
            fn register(
                table: &mut $crate::MethodTable<Self>,
            ) -> ::std::result::Result<(), $crate::RegisterError> {
                $(
                    table.add(
                        $crate::__wire_name!($method $(, $wire)?),
                        |svc: &Self, ($($arg,)*): ($($arg_ty,)*)| svc.$method($($arg),*),
                    )?;
                )*
                Ok(())
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wire_name {
    ($method:ident) => {
        stringify!($method)
    };
    ($method:ident, $wire:literal) => {
        $wire
    };
}
