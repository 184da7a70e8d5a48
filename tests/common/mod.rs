//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }

    pub fn query(&self) -> &str {
        self.target.split_once('?').map_or("", |(_, q)| q)
    }
}

pub type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

/// Keep test traffic to loopback away from any configured HTTP proxy.
pub fn bypass_proxies() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    std::env::set_var("no_proxy", "127.0.0.1,localhost");
}

/// Start a mock backend on an ephemeral port. `f` picks the status and
/// body for every request; all requests are recorded.
pub async fn start_programmable_backend<F>(f: F) -> (SocketAddr, Recorded)
where
    F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    bypass_proxies();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let log = recorded.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        serve(socket, f.as_ref(), &log).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, recorded)
}

/// A backend answering every request with 200 and `body`.
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, Recorded) {
    start_programmable_backend(move |_| (200, body.to_string())).await
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn requests(recorded: &Recorded) -> Vec<RecordedRequest> {
    recorded.lock().unwrap().clone()
}

async fn serve<F>(mut socket: TcpStream, f: &F, log: &Recorded)
where
    F: Fn(&RecordedRequest) -> (u16, String),
{
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let (status, body) = f(&request);
    log.lock().unwrap().push(request);

    let status_text = match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();
    Some(RecordedRequest { method, target, body })
}
