//! In-process HTTP server that records every request and answers with a
//! canned reply. Runs on its own thread so blocking clients can call it.

use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Router;

/// One request as the server received it.
#[derive(Debug, Clone)]
pub(crate) struct Seen {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

pub(crate) struct LocalServer {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl LocalServer {
    pub fn start<F>(reply: F) -> Self
    where
        F: Fn(&Seen) -> (StatusCode, Vec<u8>) + Send + Sync + 'static,
    {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let reply = Arc::new(reply);
        let (tx, rx) = mpsc::channel::<SocketAddr>();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();

                let app = Router::new().fallback(move |request: Request| {
                    let recorded = Arc::clone(&recorded);
                    let reply = Arc::clone(&reply);
                    async move {
                        let (parts, body) = request.into_parts();
                        let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
                        let seen = Seen {
                            method: parts.method.to_string(),
                            path: parts.uri.path().to_string(),
                            query: parts.uri.query().map(str::to_string),
                            authorization: header_value(&parts.headers, header::AUTHORIZATION),
                            content_type: header_value(&parts.headers, header::CONTENT_TYPE),
                            body: body.to_vec(),
                        };
                        let response = (*reply)(&seen);
                        recorded.lock().unwrap().push(seen);
                        response
                    }
                });
                axum::serve(listener, app).await.unwrap();
            });
        });

        let addr = rx.recv().unwrap();
        Self {
            base_url: format!("http://{addr}"),
            seen,
        }
    }

    /// Everything received so far, oldest first.
    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
