//! Error types for the oracle client.

use thiserror::Error;

/// Errors returned by [`crate::OracleClient`].
#[derive(Debug, Error)]
pub enum OracleError {
	/// Transport-level fault talking to the provider.
	#[error("oracle transport error (status {status}): {message}")]
	Transport {
		status: u16,
		retryable: bool,
		message: String,
	},

	/// No JSON object could be recovered from the reply, even after
	/// repair. Recoverable: callers degrade rather than fail.
	#[error("oracle parse error: {0}")]
	Parse(String),
}

impl From<reqwest::Error> for OracleError {
	fn from(err: reqwest::Error) -> Self {
		let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
		Self::Transport {
			status,
			retryable: err.is_timeout() || err.is_connect() || status >= 500,
			message: err.to_string(),
		}
	}
}
