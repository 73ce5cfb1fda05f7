//! Error types for the connection store.

use thiserror::Error;

/// Errors returned by store operations.
///
/// `CursorRegression` is an invariant violation, not an operational
/// failure; callers treat it as fatal.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("database error: {0}")]
	Sqlite(#[from] rusqlite::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("encode error: {0}")]
	Encode(#[from] serde_json::Error),

	#[error("unknown connection: {0}")]
	UnknownConnection(String),

	#[error("cursor regression for {repo_key}: {from} -> {to}")]
	CursorRegression {
		repo_key: String,
		from: u64,
		to: u64,
	},
}
