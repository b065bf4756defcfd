use rpcproxy::{proxy, service, ClientFactory, Number, Server};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::task;

pub struct Greeter;

impl Greeter {
    fn hello(&self, name: String) -> String {
        format!("Hello, {name}!")
    }

    fn count(&self, name: String) -> Number {
        Number::Int(name.chars().count() as i64)
    }
}

service! {
    Greeter {
        fn hello(name: String);
        fn count(name: String);
    }
}

proxy! {
    pub struct GreeterClient {
        fn hello(name: String) -> String;
        fn count(name: String) -> Number;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let listener = Server::new(Greeter)?
        .bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await?;
    let port = listener.local_addr()?.port();
    let shutdown = listener.shutdown_handle();
    let server = task::spawn(listener.run());

    let client = ClientFactory::new("127.0.0.1", port).new_client::<GreeterClient>()?;
    println!("{}", client.hello("world").await?);
    println!("{}", client.count("world").await?);

    shutdown.shutdown();
    server.await??;
    Ok(())
}
