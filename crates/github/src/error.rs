//! Error types for the GitHub client.

use thiserror::Error;

/// Errors returned by [`crate::GithubClient`] operations.
#[derive(Debug, Error)]
pub enum GithubError {
	/// The requested entity does not exist (404, or an invalid ref).
	#[error("not found: {0}")]
	NotFound(String),

	/// Transport-level fault. `retryable` is true for 5xx, 429 and
	/// connection/timeout failures; the scheduler backs off and retries
	/// those on a later cycle.
	#[error("transport error (status {status}): {message}")]
	Transport {
		status: u16,
		retryable: bool,
		message: String,
	},

	/// The provider returned a body this client cannot decode.
	#[error("decode error: {0}")]
	Decode(String),
}

impl GithubError {
	/// Classifies a non-success HTTP status.
	pub fn from_status(status: u16, context: &str) -> Self {
		match status {
			404 => Self::NotFound(context.to_string()),
			429 => Self::Transport {
				status,
				retryable: true,
				message: format!("rate limited: {context}"),
			},
			s if s >= 500 => Self::Transport {
				status: s,
				retryable: true,
				message: context.to_string(),
			},
			s => Self::Transport {
				status: s,
				retryable: false,
				message: context.to_string(),
			},
		}
	}

	/// True when the scheduler should retry the unit of work later.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transport { retryable: true, .. })
	}
}

impl From<reqwest::Error> for GithubError {
	fn from(err: reqwest::Error) -> Self {
		let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
		Self::Transport {
			status,
			retryable: err.is_timeout() || err.is_connect() || status >= 500,
			message: err.to_string(),
		}
	}
}
