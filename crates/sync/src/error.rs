//! Error type shared by the materialiser, change processor and engine.

use thiserror::Error;

/// Errors surfaced by sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error(transparent)]
	Github(#[from] engram_github::GithubError),

	#[error(transparent)]
	Craft(#[from] engram_craft::CraftError),

	#[error(transparent)]
	Oracle(#[from] engram_oracle::OracleError),

	#[error(transparent)]
	Store(#[from] engram_store::StoreError),

	#[error("unknown connection: {0}")]
	UnknownConnection(String),

	#[error("cycle failed: {0}")]
	Cycle(String),
}
