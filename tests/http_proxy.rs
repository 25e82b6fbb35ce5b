//! End-to-end tests for the HTTP proxy listener

mod common;

use common::*;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

async fn proxy_with_user(upstream: &FakeUpstream) -> RunningProxy {
    let config = TestConfigBuilder::new(upstream.addr)
        .user("user", "pass")
        .build();
    RunningProxy::start(config).await
}

#[tokio::test]
async fn test_connect_tunnel_round_trip() {
    let echo = spawn_echo_server().await;
    let upstream = FakeUpstream::spawn(UpstreamMode::Relay).await;
    let proxy = proxy_with_user(&upstream).await;

    let mut client = TcpStream::connect(proxy.http_addr).await.unwrap();
    let request = format!(
        "CONNECT {0} HTTP/1.1\r\nHost: {0}\r\nProxy-Authorization: {1}\r\n\r\n",
        echo,
        basic_auth("user", "pass")
    );
    client.write_all(request.as_bytes()).await.unwrap();

    let mut response = vec![0u8; ESTABLISHED.len()];
    client.read_exact(&mut response).await.unwrap();
    assert_eq!(response, ESTABLISHED);

    client.write_all(b"ping through tunnel").await.unwrap();
    let mut echoed = [0u8; 19];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"ping through tunnel");

    assert_eq!(upstream.targets(), vec![echo.to_string()]);
}

#[tokio::test]
async fn test_connect_head_split_across_writes() {
    let echo = spawn_echo_server().await;
    let upstream = FakeUpstream::spawn(UpstreamMode::Relay).await;
    let proxy = proxy_with_user(&upstream).await;

    let mut client = TcpStream::connect(proxy.http_addr).await.unwrap();
    client.set_nodelay(true).unwrap();
    let request = format!(
        "CONNECT {0} HTTP/1.1\r\nHost: {0}\r\nProxy-Authorization: {1}\r\n\r\n",
        echo,
        basic_auth("user", "pass")
    );
    for chunk in request.as_bytes().chunks(7) {
        client.write_all(chunk).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let mut response = vec![0u8; ESTABLISHED.len()];
    client.read_exact(&mut response).await.unwrap();
    assert_eq!(response, ESTABLISHED);
}

#[tokio::test]
async fn test_missing_credentials_get_no_response() {
    let echo = spawn_echo_server().await;
    let upstream = FakeUpstream::spawn(UpstreamMode::Relay).await;
    let proxy = proxy_with_user(&upstream).await;

    let mut client = TcpStream::connect(proxy.http_addr).await.unwrap();
    let request = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n\r\n", echo);
    client.write_all(request.as_bytes()).await.unwrap();

    assert!(read_to_end_timeout(&mut client).await.is_empty());
    assert!(upstream.targets().is_empty());
}

#[tokio::test]
async fn test_wrong_password_gets_no_response() {
    let echo = spawn_echo_server().await;
    let upstream = FakeUpstream::spawn(UpstreamMode::Relay).await;
    let proxy = proxy_with_user(&upstream).await;

    let mut client = TcpStream::connect(proxy.http_addr).await.unwrap();
    let request = format!(
        "CONNECT {0} HTTP/1.1\r\nHost: {0}\r\nProxy-Authorization: {1}\r\n\r\n",
        echo,
        basic_auth("user", "nope")
    );
    client.write_all(request.as_bytes()).await.unwrap();

    assert!(read_to_end_timeout(&mut client).await.is_empty());
    assert!(upstream.targets().is_empty());
}

#[tokio::test]
async fn test_plain_request_forwarded_verbatim() {
    let (destination, mut captured) = spawn_capture_server().await;
    let upstream = FakeUpstream::spawn(UpstreamMode::Relay).await;
    let proxy = proxy_with_user(&upstream).await;

    let head = format!(
        "POST http://{0}/submit HTTP/1.1\r\nHost: {0}\r\nProxy-Authorization: {1}\r\nContent-Length: 4\r\n\r\n",
        destination,
        basic_auth("user", "pass")
    );
    let mut request = head.clone().into_bytes();
    request.extend_from_slice(b"body");

    let mut client = TcpStream::connect(proxy.http_addr).await.unwrap();
    client.write_all(&request).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.shutdown().await.unwrap();

    let forwarded = tokio::time::timeout(Duration::from_secs(5), captured.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(forwarded, request);
}

#[tokio::test]
async fn test_refused_upstream_closes_silently() {
    let upstream = FakeUpstream::spawn(UpstreamMode::Refuse).await;
    let proxy = proxy_with_user(&upstream).await;

    let mut client = TcpStream::connect(proxy.http_addr).await.unwrap();
    let request = format!(
        "CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\nProxy-Authorization: {}\r\n\r\n",
        basic_auth("user", "pass")
    );
    client.write_all(request.as_bytes()).await.unwrap();

    assert!(read_to_end_timeout(&mut client).await.is_empty());
    assert_eq!(upstream.targets(), vec!["example.com:443".to_string()]);
}

#[tokio::test]
async fn test_silent_upstream_times_out() {
    let upstream = FakeUpstream::spawn(UpstreamMode::Silent).await;
    let config = TestConfigBuilder::new(upstream.addr)
        .user("user", "pass")
        .connect_timeout(1)
        .build();
    let proxy = RunningProxy::start(config).await;

    let mut client = TcpStream::connect(proxy.http_addr).await.unwrap();
    let request = format!(
        "CONNECT example.com HTTP/1.1\r\nHost: example.com\r\nProxy-Authorization: {}\r\n\r\n",
        basic_auth("user", "pass")
    );
    client.write_all(request.as_bytes()).await.unwrap();

    assert!(read_to_end_timeout(&mut client).await.is_empty());
    assert!(upstream.wait_closed_by_proxy(1).await);
}

#[tokio::test]
async fn test_destination_close_closes_client() {
    let (listener, destination) = create_test_listener().await;
    let upstream = FakeUpstream::spawn(UpstreamMode::Relay).await;
    let proxy = proxy_with_user(&upstream).await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"bye").await.unwrap();
    });

    let mut client = TcpStream::connect(proxy.http_addr).await.unwrap();
    let request = format!(
        "CONNECT {0} HTTP/1.1\r\nHost: {0}\r\nProxy-Authorization: {1}\r\n\r\n",
        destination,
        basic_auth("user", "pass")
    );
    client.write_all(request.as_bytes()).await.unwrap();

    let received = read_to_end_timeout(&mut client).await;
    let mut expected = ESTABLISHED.to_vec();
    expected.extend_from_slice(b"bye");
    assert_eq!(received, expected);
}
