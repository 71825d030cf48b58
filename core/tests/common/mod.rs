#![allow(dead_code)]

use std::net::SocketAddr;

use courier_core::{AgentOptions, ClientConfig, Defaults, QueryClient, TransportKind};

/// Start the mock server on a random port on its own thread and runtime.
pub fn spawn_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// A client of `kind` whose defaults point at `addr`.
pub fn client(kind: TransportKind, addr: SocketAddr) -> QueryClient {
    let defaults = Defaults {
        protocol: Some("http:".into()),
        host: Some(addr.ip().to_string()),
        port: Some(addr.port()),
        ..Defaults::default()
    };
    let agent = AgentOptions {
        proxy_from_env: false,
        ..AgentOptions::default()
    };
    let config = ClientConfig::default()
        .transport(kind)
        .agent(agent)
        .defaults(defaults);
    QueryClient::new(config).unwrap()
}

/// An address nothing listens on.
pub fn dead_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
