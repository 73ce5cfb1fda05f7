//! Contract tests for the HTTP surface: status codes and the stable
//! `{error, message}` body, with no network behind the handlers.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use engram_api::{AppState, SessionUser, Sessions, router};
use engram_oracle::{OracleClient, OracleConfig};
use engram_proto::{Credential, OwnerUser};
use engram_store::Store;
use engram_sync::{
	EngineConfig, Materialiser, RestVcsFactory, SyncService, ToolCraftFactory,
};
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct Harness {
	app: Router,
	shutdown: CancellationToken,
	_dir: TempDir,
}

impl Drop for Harness {
	fn drop(&mut self) {
		self.shutdown.cancel();
	}
}

fn harness(webhook_secret: Option<&str>) -> Harness {
	let dir = TempDir::new().expect("tempdir");
	let store = Store::open(&dir.path().join("engram.db"), &dir.path().join("engram.json"));
	store.initialize().expect("initialize");

	let sessions = Arc::new(Sessions::new());
	sessions.insert(
		"good-session",
		SessionUser {
			credential: Credential::new("token"),
			user: OwnerUser {
				id: 7,
				login: "octocat".to_string(),
				display_name: None,
				email: None,
			},
		},
	);

	let oracle = Arc::new(OracleClient::new(OracleConfig::default()).expect("oracle"));
	let vcs_factory = Arc::new(RestVcsFactory::new());
	let craft_factory = Arc::new(ToolCraftFactory);
	let shutdown = CancellationToken::new();

	let sync = SyncService::start(
		store.clone(),
		vcs_factory.clone(),
		craft_factory.clone(),
		oracle.clone(),
		EngineConfig::default(),
		shutdown.clone(),
	);
	let materialiser = Arc::new(Materialiser::new(
		store.clone(),
		vcs_factory.clone(),
		craft_factory.clone(),
		oracle,
	));

	let app = router(AppState {
		store,
		sessions,
		materialiser,
		sync,
		vcs_factory,
		craft_factory,
		webhook_secret: webhook_secret.map(String::from),
	});
	Harness {
		app,
		shutdown,
		_dir: dir,
	}
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
	let builder = Request::builder()
		.method(method)
		.uri(uri)
		.header("content-type", "application/json");
	let request = match body {
		Some(body) => builder.body(Body::from(body.to_string())),
		None => builder.body(Body::empty()),
	}
	.expect("request");

	let response = app.clone().oneshot(request).await.expect("response");
	let status = response.status();
	let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
		.await
		.expect("body");
	let value = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("json body")
	};
	(status, value)
}

#[tokio::test(flavor = "current_thread")]
async fn analyze_rejects_missing_fields_with_400() {
	let h = harness(None);
	let (status, body) = send(&h.app, "POST", "/sync/analyze", Some("{}")).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "bad_request");
	assert!(body["message"].as_str().expect("message").contains("sessionId"));
}

#[tokio::test(flavor = "current_thread")]
async fn analyze_rejects_unknown_session_with_401() {
	let h = harness(None);
	let body = r#"{"sessionId":"bogus","owner":"octocat","repo":"hello","craftMcpUrl":"https://craft.example/mcp"}"#;
	let (status, reply) = send(&h.app, "POST", "/sync/analyze", Some(body)).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(reply["error"], "unauthorized");
}

#[tokio::test(flavor = "current_thread")]
async fn manual_sync_for_unconnected_repo_is_404() {
	let h = harness(None);
	let body = r#"{"sessionId":"good-session","owner":"octocat","repo":"hello","craftMcpUrl":"https://craft.example/mcp"}"#;
	let (status, reply) = send(&h.app, "POST", "/sync/manual", Some(body)).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(reply["error"], "not_found");
}

#[tokio::test(flavor = "current_thread")]
async fn sync_status_reports_the_scheduler() {
	let h = harness(None);
	let (status, body) = send(&h.app, "GET", "/sync/sync-status", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["isRunning"], true);
	assert_eq!(body["connectedRepos"], 0);
	assert_eq!(body["syncInterval"], 300);
	assert!(body["lastSyncTimes"].is_object());
}

#[tokio::test(flavor = "current_thread")]
async fn connected_requires_a_session() {
	let h = harness(None);
	let (status, _) = send(&h.app, "GET", "/sync/connected", None).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, body) = send(&h.app, "GET", "/sync/connected?sessionId=good-session", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["connections"], serde_json::json!([]));
}

#[tokio::test(flavor = "current_thread")]
async fn auto_sync_flip_for_unknown_connection_is_404() {
	let h = harness(None);
	let body = r#"{"sessionId":"good-session","repoFullName":"octocat/hello","enabled":false}"#;
	let (status, _) = send(&h.app, "POST", "/sync/auto-sync", Some(body)).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "current_thread")]
async fn disconnect_validates_the_key() {
	let h = harness(None);
	let (status, _) = send(
		&h.app,
		"DELETE",
		"/sync/disconnect/not-a-key?sessionId=good-session",
		None,
	)
	.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "current_thread")]
async fn unsigned_webhook_is_rejected() {
	let h = harness(Some("topsecret"));
	let body = r#"{"repository":{"full_name":"octocat/hello"}}"#;
	let (status, reply) = send(&h.app, "POST", "/webhook/github", Some(body)).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(reply["error"], "unauthorized");
}

#[tokio::test(flavor = "current_thread")]
async fn webhook_without_configured_secret_is_404() {
	let h = harness(None);
	let body = r#"{"repository":{"full_name":"octocat/hello"}}"#;
	let (status, _) = send(&h.app, "POST", "/webhook/github", Some(body)).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
}
