use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::WebConfig;

use super::api::{
    dispatcher_status, get_status, health_check, ingest, list_ingestions, list_queue, AppState,
};

/// Build the HTTP router over shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/status/:ingestion_id", get(get_status))
        .route("/health", get(health_check))
        .route("/dispatcher/status", get(dispatcher_status))
        .route("/queue", get(list_queue))
        .route("/ingestions", get(list_ingestions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server and serve until `shutdown_rx` flips to true
pub async fn run_server(
    state: AppState,
    web_config: WebConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let app = build_router(state);

    let listener = TcpListener::bind(web_config.listen.as_str()).await?;
    info!(addr = %web_config.listen, "Web server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|&v| v).await;
            info!("Web server shutting down gracefully");
        })
        .await
}
