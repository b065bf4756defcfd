use crate::{
    dispatcher::{Dispatcher, RegisterError, Service},
    net::{FailureKind, RemoteFailure, Request, Response},
};
use async_bincode::tokio::AsyncBincodeStream;
use futures::{SinkExt, StreamExt};
use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::{
    io::BufStream,
    net::{TcpListener, TcpStream},
    sync::watch,
    task, time,
};
use tracing::{debug, info, warn};

/// A service object together with its method table.
pub struct Server<S> {
    dispatcher: Arc<Dispatcher<S>>,
    service: Arc<S>,
}

impl<S: Service> Server<S> {
    pub fn new(service: S) -> Result<Self, RegisterError> {
        Self::from_arc(Arc::new(service))
    }

    /// Like [`Server::new`], for a service the caller keeps a handle to.
    pub fn from_arc(service: Arc<S>) -> Result<Self, RegisterError> {
        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new()?),
            service,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    /// Binds every interface on `port`.
    pub async fn bind(self, port: u16) -> io::Result<Listener<S>> {
        self.bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .await
    }

    pub async fn bind_addr(self, addr: SocketAddr) -> io::Result<Listener<S>> {
        let tcp = TcpListener::bind(addr).await?;
        info!(
            addr = %tcp.local_addr()?,
            methods = self.dispatcher.table().len(),
            "listening"
        );
        for signature in self.dispatcher.signatures() {
            debug!(%signature, "registered");
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Listener {
            tcp,
            server: self,
            shutdown: ShutdownHandle(Arc::new(shutdown_tx)),
            shutdown_rx,
        })
    }

    /// Binds `port` and serves until the process ends.
    ///
    /// There is no way to stop this listener. Use [`Server::bind`] and
    /// [`Listener::shutdown_handle`] for one that can be shut down.
    pub async fn serve_tcp(self, port: u16) -> io::Result<()> {
        self.bind(port).await?.run().await
    }
}

/// A bound listening socket. [`Listener::run`] drives the accept loop.
pub struct Listener<S> {
    tcp: TcpListener,
    server: Server<S>,
    shutdown: ShutdownHandle,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: Service> Listener<S> {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accepts connections until [`ShutdownHandle::shutdown`] is called, then
    /// returns `Ok(())`. Each connection is handled on its own task; calls that
    /// are already in flight finish on their own.
    pub async fn run(mut self) -> io::Result<()> {
        loop {
            let (sock, peer) = tokio::select! {
                _ = async { self.shutdown_rx.wait_for(|stop| *stop).await.map(|_| ()) } => break,
                accepted = self.tcp.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(error = %err, "accepting connection");
                        if let Some(pause) = accept_backoff(&err) {
                            time::sleep(pause).await;
                        }
                        continue;
                    }
                },
            };
            debug!(%peer, "accepted connection");

            let dispatcher = Arc::clone(&self.server.dispatcher);
            let service = Arc::clone(&self.server.service);
            task::spawn(handle_connection(sock, peer, dispatcher, service));
        }
        info!(addr = ?self.tcp.local_addr().ok(), "listener shut down");
        Ok(())
    }
}

/// How long to pause after a failed `accept`.
///
/// Errors that belong to a single connection are retried at once. Anything
/// else, such as running out of file descriptors, pauses the loop first.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted => None,
        _ => Some(Duration::from_millis(100)),
    }
}

/// Stops a [`Listener`]'s accept loop. Cheap to clone and safe to call from
/// any thread, any number of times.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}

/// Serves exactly one request/response pair, then closes the connection.
///
/// Method-level failures are answered with a failure response. Only I/O
/// failures on the connection itself end the call without a reply.
async fn handle_connection<S: Service>(
    sock: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher<S>>,
    service: Arc<S>,
) {
    let mut sock =
        AsyncBincodeStream::<_, Request, Response, _>::from(BufStream::new(sock)).for_async();

    let response = match sock.next().await {
        Some(Ok(request)) => dispatcher.dispatch(&service, request).await,
        Some(Err(err)) => match *err {
            bincode::ErrorKind::Io(err) => {
                warn!(%peer, error = %err, "reading request");
                return;
            }
            err => {
                warn!(%peer, error = %err, "malformed request");
                Response::Failure(RemoteFailure::new(
                    FailureKind::MalformedRequest,
                    err.to_string(),
                ))
            }
        },
        None => {
            debug!(%peer, "peer closed before sending a request");
            return;
        }
    };

    if let Err(err) = sock.send(response).await {
        warn!(%peer, error = %err, "writing response");
        return;
    }
    // The client may already be gone once it has its response.
    _ = sock.close().await;
}
