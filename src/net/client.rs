use super::{RemoteFailure, Request, Response};
use crate::{
    interface::{InvalidInterface, RemoteInterface},
    types::{Decode, TypeMismatch, Value},
};
use async_bincode::{tokio::AsyncBincodeStream, AsyncDestination};
use futures::{SinkExt, StreamExt};
use std::{fmt, io, sync::Arc};
use thiserror::Error;
use tokio::{io::BufStream, net::TcpStream};
use tracing::debug;

#[derive(Debug)]
struct Target {
    host: String,
    port: u16,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Hands out proxies for remote interfaces served at one host and port.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    target: Arc<Target>,
}

impl ClientFactory {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            target: Arc::new(Target {
                host: host.into(),
                port,
            }),
        }
    }

    /// Validates `P`'s interface and builds the proxy.
    ///
    /// Nothing touches the network here; an interface with a non-transmittable
    /// type is rejected before any call can be made.
    pub fn new_client<P: RemoteInterface>(&self) -> Result<P, InvalidInterface> {
        let interface = P::interface();
        interface.validate()?;
        debug!(
            interface = interface.name(),
            target = %self.target,
            methods = interface.methods().len(),
            "created proxy"
        );
        Ok(P::from_stub(Stub {
            target: Arc::clone(&self.target),
        }))
    }
}

/// The call routine shared by every proxy. Each [`Stub::call`] is one round
/// trip on its own connection.
#[derive(Debug, Clone)]
pub struct Stub {
    target: Arc<Target>,
}

type ClientStream = AsyncBincodeStream<BufStream<TcpStream>, Response, Request, AsyncDestination>;

impl Stub {
    async fn connect(&self) -> Result<ClientStream, TransportError> {
        let target = &self.target;
        let sock = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|source| TransportError::Connect {
                target: target.to_string(),
                source,
            })?;
        let sock = BufStream::new(sock);
        let sock = AsyncBincodeStream::from(sock).for_async();
        Ok(sock)
    }

    async fn send_recv(&self, req: Request) -> Result<Response, TransportError> {
        let mut sock = self.connect().await?;
        sock.send(req).await?;
        let resp = sock.next().await.ok_or(TransportError::NoResponse)??;
        Ok(resp)
    }

    /// Ships `method(args)` to the server and waits for the outcome.
    ///
    /// A failure reported by the server comes back as [`CallError::Remote`]
    /// carrying the server's message unchanged.
    pub async fn call<R: Decode>(&self, method: &str, args: Vec<Value>) -> Result<R, CallError> {
        let req = Request {
            method: method.to_owned(),
            args,
        };
        let resp = self.send_recv(req).await?;
        debug!(method, target = %self.target, "round trip complete");
        match resp {
            Response::Return(value) => R::decode(value).map_err(CallError::ReturnType),
            Response::Failure(failure) => Err(CallError::Remote(failure)),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connecting to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("wire codec: {0}")]
    Codec(#[from] bincode::Error),

    #[error("connection closed before a response arrived")]
    NoResponse,
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Remote(RemoteFailure),

    #[error("return value: {0}")]
    ReturnType(TypeMismatch),
}

impl CallError {
    /// The server-side failure, if this error came back from the server.
    pub fn remote(&self) -> Option<&RemoteFailure> {
        match self {
            CallError::Remote(failure) => Some(failure),
            _ => None,
        }
    }
}
