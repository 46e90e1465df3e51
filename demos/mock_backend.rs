//! Toy upstream for trying the proxy by hand.
//!
//! ```text
//! cargo run --example mock_backend -- 5001
//! ```
//!
//! `/health` answers 200 so the proxy marks it healthy; every other path
//! answers with a greeting naming the port and the path it saw.

use std::net::SocketAddr;

use axum::{http::Uri, routing::get, Router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port: u16 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 5001,
    };

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .fallback(move |uri: Uri| async move { format!("Hello from upstream {port} at {uri}\n") });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Upstream listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
