//! HTTP API module for the session registry
//!
//! Exposes the session lifecycle over JSON endpoints.

mod error;
pub mod routes;

use crate::config::Config;
use crate::error::Result;
use crate::handlers::SessionRegistry;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle operations
    pub registry: SessionRegistry,
    /// Take the caller address from X-Forwarded-For when present
    pub trust_forwarded_for: bool,
}

/// Start the HTTP API server
pub async fn serve(addr: SocketAddr, registry: SessionRegistry, config: &Config) -> Result<()> {
    let state = AppState {
        registry,
        trust_forwarded_for: config.server.trust_forwarded_for,
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    // Clients call from browsers on other hosts
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::welcome))
        .route("/health", get(routes::health))
        // Session lifecycle
        .route("/login", post(routes::login))
        .route("/session", get(routes::get_session))
        .route("/listCurrentSessions", get(routes::list_current_sessions))
        .route("/update", put(routes::update_session))
        .route("/logout", post(routes::logout))
        // Administrative
        .route("/listAllSessions", get(routes::list_all_sessions))
        .route("/deleteAllSessions", delete(routes::delete_all_sessions))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
