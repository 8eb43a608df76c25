//! HTTP server setup: router, CORS, and graceful shutdown.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::chunks;
use super::state::ApiState;
use crate::service::ChunkService;

/// Start the HTTP server on the given address.
///
/// Returns a handle that resolves when the server shuts down. The caller
/// passes a `tokio::sync::watch::Receiver<bool>` for graceful shutdown.
pub async fn start_http_server(
    bind: SocketAddr,
    service: Arc<ChunkService>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let state = Arc::new(ApiState::new(service));

    // Fixed local development origins.
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:3003"),
        ])
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(chunks::health))
        .route("/add_document_chunks", post(chunks::add_document_chunks))
        .route("/search_chunks", post(chunks::search_chunks))
        .route("/search_policy_aware", post(chunks::search_policy_aware))
        .route("/document_info/{document_id}", get(chunks::document_info))
        .route("/list_documents", get(chunks::list_documents))
        .route(
            "/delete_document/{document_id}",
            delete(chunks::delete_document),
        )
        .route("/clear_all", delete(chunks::clear_all))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "HTTP server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
            .ok();
    });

    Ok(handle)
}
