#![allow(dead_code)]

use rpcproxy::{ClientFactory, Server, Service, ShutdownHandle};
use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::task::{self, JoinHandle};

pub struct Running {
    pub factory: ClientFactory,
    pub shutdown: ShutdownHandle,
    pub task: JoinHandle<io::Result<()>>,
}

impl Running {
    pub async fn stop(self) {
        self.shutdown.shutdown();
        self.task.await.unwrap().unwrap();
    }
}

pub async fn serve<S: Service>(service: S) -> Running {
    serve_arc(Arc::new(service)).await
}

pub async fn serve_arc<S: Service>(service: Arc<S>) -> Running {
    let listener = Server::from_arc(service)
        .unwrap()
        .bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    Running {
        factory: ClientFactory::new("127.0.0.1", port),
        shutdown: listener.shutdown_handle(),
        task: task::spawn(listener.run()),
    }
}
