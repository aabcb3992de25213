pub mod auth;
pub mod error;
pub mod extractors;

use std::sync::Arc;

use anyhow::Result;
use axum::{response::Html, routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use auth::AuthState;

const INDEX_HTML: &str = include_str!("../../web/index.html");

pub fn run_server(port: u16, config: Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(start_server_async(port, config))
}

/// Async version of `run_server` for embedding in an existing tokio runtime.
pub async fn start_server_async(port: u16, config: Config) -> Result<()> {
    let state = Arc::new(AuthState::new(config)?);
    let app = router(state);

    println!("sstat running at http://localhost:{}", port);
    if let Some(ip) = local_ip() {
        println!("  Network: http://{}:{}", ip, port);
    }

    let listener = bind_with_reuse(port).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Full application router; exposed so tests can drive it directly.
pub fn router(state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .merge(auth::routes(state))
        .layer(CorsLayer::permissive())
}

async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Bind a TCP listener with SO_REUSEADDR so `cargo-watch` restarts reclaim the port instantly.
async fn bind_with_reuse(port: u16) -> Result<tokio::net::TcpListener> {
    let addr: std::net::SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let socket = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(tokio::net::TcpListener::from_std(std_listener)?)
}

/// Detect the machine's LAN IP address by opening a UDP socket to a public address.
fn local_ip() -> Option<std::net::IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|a| a.ip())
}
