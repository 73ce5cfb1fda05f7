//! Stable error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API-level failures, rendered as `{error, message}` with a matching
/// status code.
#[derive(Debug)]
pub enum ApiError {
	BadRequest(String),
	Unauthorized,
	NotFound(String),
	Internal(String),
}

impl ApiError {
	fn parts(&self) -> (StatusCode, &'static str, String) {
		match self {
			Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
			Self::Unauthorized => (
				StatusCode::UNAUTHORIZED,
				"unauthorized",
				"invalid or expired session".to_string(),
			),
			Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
			Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg.clone()),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, error, message) = self.parts();
		(status, Json(json!({"error": error, "message": message}))).into_response()
	}
}

impl From<engram_sync::SyncError> for ApiError {
	fn from(err: engram_sync::SyncError) -> Self {
		Self::Internal(err.to_string())
	}
}

impl From<engram_store::StoreError> for ApiError {
	fn from(err: engram_store::StoreError) -> Self {
		Self::Internal(err.to_string())
	}
}

impl From<engram_craft::CraftError> for ApiError {
	fn from(err: engram_craft::CraftError) -> Self {
		Self::Internal(err.to_string())
	}
}

impl From<engram_github::GithubError> for ApiError {
	fn from(err: engram_github::GithubError) -> Self {
		Self::Internal(err.to_string())
	}
}
