//! Shared handler state.

use std::sync::Arc;

use engram_store::Store;
use engram_sync::{CraftFactory, Materialiser, SyncHandle, VcsFactory};

use crate::sessions::Sessions;

/// Everything the handlers need, wired once by the binary.
#[derive(Clone)]
pub struct AppState {
	pub store: Store,
	pub sessions: Arc<Sessions>,
	pub materialiser: Arc<Materialiser>,
	pub sync: SyncHandle,
	pub vcs_factory: Arc<dyn VcsFactory>,
	pub craft_factory: Arc<dyn CraftFactory>,
	/// Shared secret for webhook signature verification; unset disables
	/// the webhook endpoint.
	pub webhook_secret: Option<String>,
}
