//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use socks_gate::{AdmissionGate, HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Response served by [`start_mock_origin`]: two cookies and a custom header.
pub const ORIGIN_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/plain\r\n\
    X-Origin: mock\r\n\
    Set-Cookie: session=abc; Path=/\r\n\
    Set-Cookie: theme=dark; Path=/\r\n\
    Content-Length: 17\r\n\
    Connection: close\r\n\
    \r\n\
    Hello from origin";

/// Start a mock origin on an ephemeral port. Each received request head is
/// sent on the returned channel.
pub async fn start_mock_origin() -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(head) = read_head(&mut socket).await else {
                    return;
                };
                let _ = tx.send(head);
                let _ = socket.write_all(ORIGIN_RESPONSE.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

async fn read_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8(buf).ok()
}

/// Minimal SOCKS5 server: CONNECT only, optional username/password.
pub struct MockSocks {
    pub addr: SocketAddr,
    connects: Arc<AtomicUsize>,
}

impl MockSocks {
    /// Number of CONNECT commands served so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

pub async fn start_mock_socks(credentials: Option<(&'static str, &'static str)>) -> MockSocks {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connects = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&connects);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let _ = serve_socks(socket, credentials, counter).await;
            });
        }
    });

    MockSocks { addr, connects }
}

async fn serve_socks(
    mut client: TcpStream,
    credentials: Option<(&'static str, &'static str)>,
    connects: Arc<AtomicUsize>,
) -> std::io::Result<()> {
    // Method selection.
    let mut header = [0u8; 2];
    client.read_exact(&mut header).await?;
    let mut methods = vec![0u8; header[1] as usize];
    client.read_exact(&mut methods).await?;

    match credentials {
        Some((user, password)) => {
            if !methods.contains(&0x02) {
                client.write_all(&[0x05, 0xff]).await?;
                return Ok(());
            }
            client.write_all(&[0x05, 0x02]).await?;

            let mut version = [0u8; 2];
            client.read_exact(&mut version).await?;
            let mut got_user = vec![0u8; version[1] as usize];
            client.read_exact(&mut got_user).await?;
            let mut plen = [0u8; 1];
            client.read_exact(&mut plen).await?;
            let mut got_password = vec![0u8; plen[0] as usize];
            client.read_exact(&mut got_password).await?;

            if got_user != user.as_bytes() || got_password != password.as_bytes() {
                client.write_all(&[0x01, 0x01]).await?;
                return Ok(());
            }
            client.write_all(&[0x01, 0x00]).await?;
        }
        None => client.write_all(&[0x05, 0x00]).await?,
    }

    // CONNECT request.
    let mut request = [0u8; 4];
    client.read_exact(&mut request).await?;
    let host = match request[3] {
        0x01 => {
            let mut ip = [0u8; 4];
            client.read_exact(&mut ip).await?;
            Ipv4Addr::from(ip).to_string()
        }
        0x04 => {
            let mut ip = [0u8; 16];
            client.read_exact(&mut ip).await?;
            Ipv6Addr::from(ip).to_string()
        }
        _ => {
            let mut len = [0u8; 1];
            client.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            client.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).into_owned()
        }
    };
    let mut port = [0u8; 2];
    client.read_exact(&mut port).await?;
    let port = u16::from_be_bytes(port);
    connects.fetch_add(1, Ordering::SeqCst);

    let mut target = match TcpStream::connect((host.as_str(), port)).await {
        Ok(target) => target,
        Err(_) => {
            client.write_all(&[0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).await?;
            return Ok(());
        }
    };
    client.write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).await?;

    tokio::io::copy_bidirectional(&mut client, &mut target).await?;
    Ok(())
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Serve `gate` on an ephemeral port until the returned handle is triggered.
pub async fn start_proxy(gate: AdmissionGate) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        HttpServer::new(Arc::new(gate)).run(listener, rx).await.unwrap();
    });

    (addr, shutdown)
}

/// HTTP client that sends every request through the proxy at `proxy`.
pub fn proxied_client(proxy: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .proxy(reqwest::Proxy::http(format!("http://{proxy}")).unwrap())
        .build()
        .unwrap()
}
