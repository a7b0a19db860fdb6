//! Matching engine server binary.
//!
//! Serves the REST API on `PORT` (default 8080). `RUST_LOG` controls log
//! verbosity.

use matchbook::api;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let state = api::create_app_state();
    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("bind");
    tracing::info!("listening on http://{}", addr);
    axum::serve(listener, app).await.expect("serve");
}
