//! Canned HTTP server for handler tests
//!
//! Serves one request per connection, records it, and answers with whatever
//! the responder returns for it.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub content_type: String,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

type Responder = dyn Fn(&Recorded) -> (u16, String) + Send + Sync;

pub struct CannedServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl CannedServer {
    pub async fn start(
        responder: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let log = log.clone();
                let responder = responder.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);

                    let mut request_line = String::new();
                    reader.read_line(&mut request_line).await.unwrap();
                    let mut parts = request_line.split_whitespace();
                    let method = parts.next().unwrap_or_default().to_string();
                    let target = parts.next().unwrap_or_default().to_string();

                    let mut content_length = 0usize;
                    let mut content_type = String::new();
                    loop {
                        let mut line = String::new();
                        reader.read_line(&mut line).await.unwrap();
                        let line = line.trim_end();
                        if line.is_empty() {
                            break;
                        }
                        if let Some((name, value)) = line.split_once(':') {
                            if name.eq_ignore_ascii_case("content-length") {
                                content_length = value.trim().parse().unwrap();
                            } else if name.eq_ignore_ascii_case("content-type") {
                                content_type = value.trim().to_string();
                            }
                        }
                    }
                    let mut body = vec![0u8; content_length];
                    reader.read_exact(&mut body).await.unwrap();

                    let recorded = Recorded {
                        method,
                        target,
                        content_type,
                        body: String::from_utf8_lossy(&body).into_owned(),
                    };
                    let (status, payload) = responder(&recorded);
                    log.lock().unwrap().push(recorded);

                    let response = format!(
                        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
                        payload.len()
                    );
                    write.write_all(response.as_bytes()).await.unwrap();
                    write.shutdown().await.ok();
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// JSON-RPC success envelope
pub fn rpc_result(request: &Recorded, result: serde_json::Value) -> (u16, String) {
    let id = request.json()["id"].clone();
    (
        200,
        serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string(),
    )
}

/// JSON-RPC error envelope
pub fn rpc_failure(request: &Recorded, code: i64, message: &str) -> (u16, String) {
    let id = request.json()["id"].clone();
    (
        200,
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        })
        .to_string(),
    )
}
