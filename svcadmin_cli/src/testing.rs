//! In-process admin backend for tests

use axum::Router;
use reqwest::Url;
use std::net::SocketAddr;

/// Serve `app` on an ephemeral local port
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

pub fn http_base(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

pub fn ws_base(addr: SocketAddr) -> Url {
    Url::parse(&format!("ws://{}", addr)).unwrap()
}
