//! Ethics tutor - fulfillment webhook for a scripted AI-ethics lesson
//!
//! Receives intent-detection results from the NLU agent, runs the matching
//! conversation states and returns the next message(s), keeping what the
//! learner has told us in a per-session store.

mod api;
mod config;
mod dialogue;
mod session;
mod webhook;

use api::{create_router, AppState};
use config::Config;
use dialogue::{Orchestrator, StateGraph};
use session::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ethics_tutor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "Configuration loaded");

    // Refuse to start with a malformed conversation script
    let graph = StateGraph::standard();
    graph.validate()?;

    let store = Arc::new(SessionStore::new());
    match config.session_ttl {
        Some(ttl) => {
            session::spawn_sweeper(Arc::clone(&store), ttl, config.sweep_interval);
        }
        None => tracing::warn!("Session eviction disabled; sessions live until reset"),
    }

    let state = AppState::new(Orchestrator::new(store, graph));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Ethics tutor webhook listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
