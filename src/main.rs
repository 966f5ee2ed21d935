use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use plemiona_backend::api::{self, AppState};
use plemiona_backend::config::{self, Config};
use plemiona_backend::dispatch;
use plemiona_backend::metrics;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    config::set_local_mode(config.local_mode);
    if config.local_mode {
        tracing::info!("Running in local mode: rate limiting disabled");
    }
    metrics::register_metrics();

    let state = AppState::new();

    // Stale support commands must never reach the game; sweep them out.
    dispatch::spawn_expiry_worker(state.dispatch_queue.clone(), config.dispatch_ttl_secs);

    let mut app = api::router(state).layer(CorsLayer::permissive());

    // Serve the built panel frontend when configured.
    if let Some(static_dir) = &config.static_dir {
        tracing::info!("Serving static files from {}", static_dir.display());
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {addr}"));

    tracing::info!("Plemiona panel backend listening on port {}", config.port);
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
