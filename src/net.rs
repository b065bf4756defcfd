pub mod client;
pub mod server;

use crate::types::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One call on the wire. Field order is the wire order: the method name, then
/// the argument values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Request {
    pub(crate) method: String,
    pub(crate) args: Vec<Value>,
}

/// The single reply to a [`Request`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) enum Response {
    Return(Value),
    Failure(RemoteFailure),
}

/// A method-level failure produced on the server and shipped back as data.
///
/// Displays as the original message only, so a caller sees the same text the
/// service produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteFailure {
    kind: FailureKind,
    message: String,
}

impl RemoteFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No registered method matched the name and argument shape.
    NoMatchingMethod,
    /// A method matched but its arguments failed to decode.
    ArgumentMismatch,
    /// The service method returned an error.
    Invocation,
    /// The service method panicked.
    Panic,
    /// The request frame arrived but could not be decoded.
    MalformedRequest,
}
