/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Connector behaviour against a loopback fake proxy.

use fixgate_core::error::TransportError;
use fixgate_core::message::MsgType;
use fixgate_core::types::{CompId, Timestamp};
use fixgate_session::{ProxyConfig, SessionConfig};
use fixgate_tagvalue::{Encoder, Header};
use fixgate_transport::{Connector, FixCodec, Route};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::FramedRead;

fn session(proxy_port: u16) -> SessionConfig {
    SessionConfig::new(
        "lp",
        "10.20.30.40",
        9876,
        CompId::new("GW").unwrap(),
        CompId::new("LP").unwrap(),
    )
    .with_proxy(ProxyConfig::new("127.0.0.1", proxy_port).with_credentials("user", "pass"))
    .with_connect_timeout(Duration::from_millis(500))
}

async fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        head.push(stream.read_u8().await.unwrap());
    }
    String::from_utf8(head).unwrap()
}

#[tokio::test]
async fn test_socks5_refused_falls_back_to_http_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let proxy = tokio::spawn(async move {
        // first connection: SOCKS5 with no acceptable method
        let (mut socks, _) = listener.accept().await.unwrap();
        let mut greeting = [0u8; 4];
        socks.read_exact(&mut greeting).await.unwrap();
        assert_eq!(greeting, [5, 2, 0, 2]);
        socks.write_all(&[5, 0xFF]).await.unwrap();
        drop(socks);

        // second connection: HTTP CONNECT, then echo
        let (mut http, _) = listener.accept().await.unwrap();
        let head = read_head(&mut http).await;
        http.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
            .await
            .unwrap();
        let (mut rd, mut wr) = http.split();
        let _ = tokio::io::copy(&mut rd, &mut wr).await;
        head
    });

    let mut connection = Connector::new(&session(port)).connect().await.unwrap();
    assert_eq!(connection.route, Route::HttpConnect);
    assert!(!connection.tls);

    let header = Header {
        sender_comp_id: "GW",
        target_comp_id: "LP",
        msg_seq_num: 1,
        sending_time: Timestamp::now(),
    };
    let frame = Encoder::with_header("FIX.4.4", &MsgType::Heartbeat, &header)
        .finish()
        .unwrap();
    connection.stream.write_all(&frame).await.unwrap();

    let mut frames = FramedRead::new(connection.stream, FixCodec::new());
    let echoed = frames.next().await.unwrap().unwrap();
    assert_eq!(&echoed[..], &frame[..]);
    drop(frames);

    let head = proxy.await.unwrap();
    assert!(head.starts_with("CONNECT 10.20.30.40:9876 HTTP/1.1\r\n"));
    assert!(head.contains("Host: 10.20.30.40:9876\r\n"));
    assert!(head.contains("Proxy-Authorization: Basic dXNlcjpwYXNz\r\n"));
}

#[tokio::test]
async fn test_socks5_success_is_preferred() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socks, _) = listener.accept().await.unwrap();
        let mut greeting = [0u8; 4];
        socks.read_exact(&mut greeting).await.unwrap();
        socks.write_all(&[5, 0]).await.unwrap();
        let mut connect = [0u8; 10];
        socks.read_exact(&mut connect).await.unwrap();
        socks.write_all(&[5, 0, 0, 1, 127, 0, 0, 1, 0, 80]).await.unwrap();
        let mut buf = [0u8; 16];
        let _ = socks.read(&mut buf).await;
    });

    let connection = Connector::new(&session(port)).connect().await.unwrap();
    assert_eq!(connection.route, Route::Socks5);
}

#[tokio::test]
async fn test_both_tunnels_fail() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socks, _) = listener.accept().await.unwrap();
        let mut greeting = [0u8; 4];
        socks.read_exact(&mut greeting).await.unwrap();
        socks.write_all(&[5, 0xFF]).await.unwrap();
        drop(socks);

        let (mut http, _) = listener.accept().await.unwrap();
        let _ = read_head(&mut http).await;
        http.write_all(b"HTTP/1.1 403 Forbidden\r\n\r\n").await.unwrap();
    });

    let err = Connector::new(&session(port)).connect().await.unwrap_err();
    match err {
        TransportError::ProxyExhausted { socks5, http } => {
            assert!(socks5.contains("no acceptable authentication method"));
            assert!(http.contains("403"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_silent_proxy_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let config = session(port).with_connect_timeout(Duration::from_millis(100));
    let err = Connector::new(&config).connect().await.unwrap_err();
    match err {
        TransportError::ProxyExhausted { socks5, http } => {
            assert!(socks5.contains("socks5 timed out"));
            assert!(http.contains("http-connect timed out"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_direct_route() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    let config = SessionConfig::new(
        "lp",
        "127.0.0.1",
        port,
        CompId::new("GW").unwrap(),
        CompId::new("LP").unwrap(),
    );
    let connection = Connector::new(&config).connect().await.unwrap();
    assert_eq!(connection.route, Route::Direct);
}
