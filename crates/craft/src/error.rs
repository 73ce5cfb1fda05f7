//! Error types for the workspace client.

use thiserror::Error;

/// Errors returned by [`crate::CraftClient`] operations.
#[derive(Debug, Error)]
pub enum CraftError {
	/// The endpoint URL could not be parsed.
	#[error("invalid workspace endpoint: {0}")]
	InvalidEndpoint(String),

	/// Transport-level fault; retryable on timeouts, 5xx and 429.
	#[error("transport error (status {status}): {message}")]
	Transport {
		status: u16,
		retryable: bool,
		message: String,
	},

	/// The reply could not be parsed, or its shape was unexpected.
	/// Not retryable within a cycle.
	#[error("protocol error: {0}")]
	Protocol(String),
}

impl CraftError {
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transport { retryable: true, .. })
	}
}

impl From<reqwest::Error> for CraftError {
	fn from(err: reqwest::Error) -> Self {
		let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
		Self::Transport {
			status,
			retryable: err.is_timeout() || err.is_connect() || status >= 500 || status == 429,
			message: err.to_string(),
		}
	}
}
