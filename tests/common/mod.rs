//! Test utilities for Chainproxy integration tests
//!
//! Provides an echo destination, a minimal upstream SOCKS5 server that
//! records the targets it is asked for, and a helper to start the proxy on
//! ephemeral ports.

#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use chainproxy::{Config, ProxyServer};
use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address nothing listens on
pub async fn closed_port() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr
}

/// Destination that echoes every byte back
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut read, mut write) = stream.split();
                let _ = tokio::io::copy(&mut read, &mut write).await;
            });
        }
    });
    addr
}

/// Destination that reads the first chunk it receives and reports it
pub async fn spawn_capture_server() -> (SocketAddr, tokio::sync::mpsc::Receiver<Vec<u8>>) {
    let (listener, addr) = create_test_listener().await;
    let (tx, rx) = tokio::sync::mpsc::channel(4);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut received = Vec::new();
                let _ = stream.read_to_end(&mut received).await;
                let _ = tx.send(received).await;
            });
        }
    });
    (addr, rx)
}

/// How the fake upstream answers CONNECT requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMode {
    /// Dial the target and relay
    Relay,
    /// Answer every CONNECT with "connection refused"
    Refuse,
    /// Accept the TCP connection, never answer, wait for the peer to close
    Silent,
}

/// Minimal upstream SOCKS5 proxy
pub struct FakeUpstream {
    pub addr: SocketAddr,
    targets: Arc<Mutex<Vec<String>>>,
    closed_by_proxy: Arc<AtomicUsize>,
}

impl FakeUpstream {
    pub async fn spawn(mode: UpstreamMode) -> Self {
        let (listener, addr) = create_test_listener().await;
        let targets = Arc::new(Mutex::new(Vec::new()));

        let closed_by_proxy = Arc::new(AtomicUsize::new(0));

        let recorded = targets.clone();
        let closed = closed_by_proxy.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let closed = closed.clone();
                tokio::spawn(async move {
                    let _ = serve_upstream_client(stream, mode, recorded, closed).await;
                });
            }
        });

        FakeUpstream {
            addr,
            targets,
            closed_by_proxy,
        }
    }

    /// Wait until the proxy has closed `count` silent connections
    pub async fn wait_closed_by_proxy(&self, count: usize) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            if self.closed_by_proxy.load(Ordering::SeqCst) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    /// Targets requested so far, as `host:port`
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

async fn serve_upstream_client(
    mut stream: TcpStream,
    mode: UpstreamMode,
    targets: Arc<Mutex<Vec<String>>>,
    closed_by_proxy: Arc<AtomicUsize>,
) -> io::Result<()> {
    if mode == UpstreamMode::Silent {
        let mut buf = [0u8; 256];
        let read_until_eof = async {
            while stream.read(&mut buf).await? > 0 {}
            io::Result::Ok(())
        };
        if let Ok(Ok(())) = tokio::time::timeout(Duration::from_secs(30), read_until_eof).await {
            closed_by_proxy.fetch_add(1, Ordering::SeqCst);
        }
        return Ok(());
    }

    let mut greeting = [0u8; 2];
    stream.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    stream.read_exact(&mut methods).await?;
    stream.write_all(&[5, 0]).await?;

    let mut request = [0u8; 4];
    stream.read_exact(&mut request).await?;
    let target = match request[3] {
        1 => {
            let mut ip = [0u8; 4];
            stream.read_exact(&mut ip).await?;
            let port = stream.read_u16().await?;
            SocketAddr::from((Ipv4Addr::from(ip), port)).to_string()
        }
        3 => {
            let len = stream.read_u8().await?;
            let mut name = vec![0u8; len as usize];
            stream.read_exact(&mut name).await?;
            let port = stream.read_u16().await?;
            format!("{}:{}", String::from_utf8_lossy(&name), port)
        }
        4 => {
            let mut ip = [0u8; 16];
            stream.read_exact(&mut ip).await?;
            let port = stream.read_u16().await?;
            SocketAddrV6::new(Ipv6Addr::from(ip), port, 0, 0).to_string()
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad address type {}", other),
            ))
        }
    };
    targets.lock().unwrap().push(target.clone());

    if mode == UpstreamMode::Refuse {
        stream.write_all(&[5, 5, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
        return Ok(());
    }

    match TcpStream::connect(&target).await {
        Ok(mut destination) => {
            stream.write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
            let _ = tokio::io::copy_bidirectional(&mut stream, &mut destination).await;
        }
        Err(_) => {
            stream.write_all(&[5, 4, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
        }
    }
    Ok(())
}

/// Test configuration builder
pub struct TestConfigBuilder {
    upstream: SocketAddr,
    enable_auth: bool,
    users: HashMap<String, String>,
    connect_timeout: u64,
}

impl TestConfigBuilder {
    /// Create a builder pointing at the given upstream proxy
    pub fn new(upstream: SocketAddr) -> Self {
        TestConfigBuilder {
            upstream,
            enable_auth: false,
            users: HashMap::new(),
            connect_timeout: 5,
        }
    }

    /// Require SOCKS5 username/password authentication
    pub fn enable_auth(mut self, enable: bool) -> Self {
        self.enable_auth = enable;
        self
    }

    /// Add a user to the credential table
    pub fn user(mut self, username: &str, password: &str) -> Self {
        self.users
            .insert(username.to_string(), password.to_string());
        self
    }

    /// Set the dial timeout in seconds
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = secs;
        self
    }

    /// Build the config
    pub fn build(self) -> Config {
        Config {
            bind_addr: "127.0.0.1".to_string(),
            enable_auth: self.enable_auth,
            auth: self.users,
            proxy_host: self.upstream.ip().to_string(),
            proxy_port: self.upstream.port(),
            connect_timeout: self.connect_timeout,
            ..Default::default()
        }
    }
}

/// A running proxy on ephemeral ports
pub struct RunningProxy {
    pub http_addr: SocketAddr,
    pub socks_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
}

impl RunningProxy {
    pub async fn start(config: Config) -> Self {
        let (http_listener, http_addr) = create_test_listener().await;
        let (socks_listener, socks_addr) = create_test_listener().await;

        let server =
            ProxyServer::from_listeners(Arc::new(config), http_listener, socks_listener).unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(server.run(shutdown_rx));

        RunningProxy {
            http_addr,
            socks_addr,
            shutdown_tx,
        }
    }
}

impl Drop for RunningProxy {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// `Proxy-Authorization` value for the given credentials
pub fn basic_auth(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", username, password))
    )
}

/// Read until EOF, failing the test if it takes too long
pub async fn read_to_end_timeout(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received))
        .await
        .expect("peer did not close in time")
        .unwrap();
    received
}
