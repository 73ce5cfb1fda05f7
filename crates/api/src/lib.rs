//! HTTP surface for the engram daemon.
//!
//! A small request-driven API the UI and tests drive: connect a
//! repository (materialise its brain), trigger and inspect syncs, flip
//! auto-sync, disconnect, and receive provider webhooks. All state
//! changes delegate to the sync crate; this layer only validates
//! sessions, shapes responses, and keeps the error body stable.

mod error;
mod routes;
mod sessions;
mod state;
mod webhook;

use axum::Router;
use axum::routing::{delete, get, post};

pub use error::ApiError;
pub use sessions::{SessionUser, Sessions};
pub use state::AppState;

/// Builds the full router for the daemon.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/sync/analyze", post(routes::analyze))
		.route("/sync/manual", post(routes::manual))
		.route("/sync/repositories", get(routes::repositories))
		.route("/sync/connected", get(routes::connected))
		.route("/sync/disconnect/{*repo_key}", delete(routes::disconnect))
		.route("/sync/sync-status", get(routes::sync_status))
		.route("/sync/auto-sync", post(routes::auto_sync))
		.route("/webhook/github", post(webhook::github))
		.with_state(state)
}
