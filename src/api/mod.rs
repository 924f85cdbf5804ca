//! HTTP remote
//!
//! - `auth`: login/logout and the session cookie check
//! - `audio`: playback control, now-playing and the account's playlists
//! - `search`: catalog search
//! - `reply`: JSON/JSONP bodies and error mapping

mod audio;
mod auth;
mod reply;
mod search;

use std::future::Future;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::controller::SessionCoordinator;

pub use auth::SessionToken;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub coordinator: SessionCoordinator,
    pub token: Arc<SessionToken>,
}

impl AppState {
    pub fn new(coordinator: SessionCoordinator) -> Self {
        Self {
            coordinator,
            token: Arc::new(SessionToken::default()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(auth::hello))
        .route("/auth/:action/", get(auth::auth))
        .route("/audio/:action/", get(audio::audio))
        .route("/search/", get(search::search))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP remote listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("HTTP remote stopped");
    Ok(())
}
