//! Remote procedure calls through local proxies.
//!
//! A client asks a [`ClientFactory`] for a proxy of some remote interface
//! (declared with [`proxy!`] or by implementing [`RemoteInterface`] by hand).
//! Every call on the proxy opens a fresh TCP connection, sends the method
//! name and arguments, and waits for the single response. On the server, a
//! [`Dispatcher`] resolves the name and argument shape against the bound
//! [`Service`]'s method table, runs the method, and answers with the return
//! value or a [`RemoteFailure`].

mod args;
pub mod dispatcher;
pub mod interface;
mod macros;
pub mod net;
pub mod types;

pub use args::{ArgList, ArgsMismatch};
pub use dispatcher::{
    Dispatcher, IntoOutcome, Method, MethodTable, NoMatchingMethod, RegisterError, Service,
};
pub use interface::{Interface, InvalidInterface, MethodSignature, RemoteInterface, Slot};
pub use net::{
    client::{CallError, ClientFactory, Stub, TransportError},
    server::{Listener, Server, ShutdownHandle},
    FailureKind, RemoteFailure,
};
pub use types::{Decode, Encode, Number, Transmittable, Type, TypeMismatch, Typed, Value};
