//! Handlers for the sync API.

use axum::Json;
use axum::extract::{Path, Query, State};
use engram_craft::DocumentProbe;
use engram_proto::{ConnectionRecord, RepoKey};
use engram_sync::{MaterialiseRequest, MaterialiseResult};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::sessions::SessionUser;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeBody {
	session_id: Option<String>,
	owner: Option<String>,
	repo: Option<String>,
	branch: Option<String>,
	craft_mcp_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionQuery {
	session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DisconnectQuery {
	session_id: Option<String>,
	#[serde(default)]
	delete_craft_doc: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AutoSyncBody {
	session_id: Option<String>,
	repo_full_name: Option<String>,
	enabled: Option<bool>,
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
	value.ok_or_else(|| ApiError::BadRequest(format!("missing required field: {field}")))
}

fn resolve_session(state: &AppState, session_id: &str) -> Result<SessionUser, ApiError> {
	state
		.sessions
		.resolve(session_id)
		.ok_or(ApiError::Unauthorized)
}

/// Record fields safe to show the UI; the credential never leaves the
/// store.
fn connection_info(record: &ConnectionRecord) -> Value {
	json!({
		"repoKey": record.repo_key.as_str(),
		"documentId": record.document_id,
		"documentTitle": record.document_title,
		"connectedAt": record.connected_at.to_rfc3339(),
		"lastSyncedAt": record.last_synced_at.map(|t| t.to_rfc3339()),
		"lastProcessedPR": record.last_processed_pr,
		"autoSyncEnabled": record.auto_sync_enabled,
		"confidence": record.confidence,
	})
}

fn owned_record(state: &AppState, key: &RepoKey, session: &SessionUser) -> Result<ConnectionRecord, ApiError> {
	let record = state
		.store
		.get(key)
		.ok_or_else(|| ApiError::NotFound(format!("no connection for {key}")))?;
	if record.owner_user.id != session.user.id {
		return Err(ApiError::NotFound(format!("no connection for {key}")));
	}
	Ok(record)
}

/// POST /sync/analyze: materialise the brain for a repository.
pub(crate) async fn analyze(
	State(state): State<AppState>,
	Json(body): Json<AnalyzeBody>,
) -> Result<Json<Value>, ApiError> {
	let session_id = require(body.session_id, "sessionId")?;
	let owner = require(body.owner, "owner")?;
	let repo = require(body.repo, "repo")?;
	let craft_mcp_url = require(body.craft_mcp_url, "craftMcpUrl")?;
	let session = resolve_session(&state, &session_id)?;

	let repo_key = RepoKey::parse(&format!("{owner}/{repo}"))
		.ok_or_else(|| ApiError::BadRequest("invalid owner/repo".to_string()))?;

	let result = state
		.materialiser
		.analyse(MaterialiseRequest {
			repo_key: repo_key.clone(),
			credential: session.credential.clone(),
			workspace_endpoint: craft_mcp_url,
			branch: body.branch.unwrap_or_else(|| "main".to_string()),
			owner_user: session.user.clone(),
		})
		.await?;

	let info = state.store.get(&repo_key).map(|r| connection_info(&r));
	let reply = match result {
		MaterialiseResult::Existing { document_id, title } => json!({
			"success": true,
			"alreadyExists": true,
			"craftDocument": {"id": document_id, "title": title},
			"connectionInfo": info,
		}),
		MaterialiseResult::Created {
			document_id,
			title,
			confidence,
			tech_stack,
			..
		} => json!({
			"success": true,
			"craftDocument": {"id": document_id, "title": title},
			"analysis": {
				"repoName": repo_key.as_str(),
				"confidence": (confidence * 100.0).round() as i64,
				"techStack": tech_stack,
			},
			"connectionInfo": info,
		}),
	};
	Ok(Json(reply))
}

/// POST /sync/manual: force one sync cycle for a repository.
pub(crate) async fn manual(
	State(state): State<AppState>,
	Json(body): Json<AnalyzeBody>,
) -> Result<Json<Value>, ApiError> {
	let session_id = require(body.session_id, "sessionId")?;
	let owner = require(body.owner, "owner")?;
	let repo = require(body.repo, "repo")?;
	let session = resolve_session(&state, &session_id)?;

	let repo_key = RepoKey::parse(&format!("{owner}/{repo}"))
		.ok_or_else(|| ApiError::BadRequest("invalid owner/repo".to_string()))?;
	owned_record(&state, &repo_key, &session)?;

	let report = state.sync.trigger_one(repo_key).await?;
	Ok(Json(json!({
		"success": true,
		"prCount": report.prs.len(),
		"commitCount": report.commits.len(),
		"prs": report.prs,
		"commits": report.commits,
	})))
}

/// GET /sync/repositories: the session user's provider repositories.
pub(crate) async fn repositories(
	State(state): State<AppState>,
	Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
	let session_id = require(query.session_id, "sessionId")?;
	let session = resolve_session(&state, &session_id)?;

	let vcs = state.vcs_factory.client(&session.credential)?;
	let repos = vcs.list_repositories().await?;
	Ok(Json(json!({"success": true, "repositories": repos})))
}

/// GET /sync/connected: the user's connections, reconciled against the
/// workspace: records whose remote document is gone are deleted here.
pub(crate) async fn connected(
	State(state): State<AppState>,
	Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
	let session_id = require(query.session_id, "sessionId")?;
	let session = resolve_session(&state, &session_id)?;

	let mut connections = Vec::new();
	for record in state.store.all() {
		if record.owner_user.id != session.user.id {
			continue;
		}
		let probe = match state.craft_factory.client(&record.workspace_endpoint) {
			Ok(craft) => craft.document_exists(&record.document_title).await,
			Err(err) => Err(err),
		};
		match probe {
			Ok(DocumentProbe::Absent) => {
				tracing::info!(repo = %record.repo_key, "remote document gone, removing connection");
				state.store.delete(&record.repo_key)?;
			}
			Ok(DocumentProbe::Found(_)) => connections.push(connection_info(&record)),
			Err(err) => {
				// An unreachable workspace is not evidence of deletion.
				tracing::warn!(repo = %record.repo_key, error = %err, "reconciliation probe failed");
				connections.push(connection_info(&record));
			}
		}
	}
	Ok(Json(json!({"success": true, "connections": connections})))
}

/// DELETE /sync/disconnect/{repoKey}: remove a connection, optionally
/// deleting the remote document.
pub(crate) async fn disconnect(
	State(state): State<AppState>,
	Path(repo_key): Path<String>,
	Query(query): Query<DisconnectQuery>,
) -> Result<Json<Value>, ApiError> {
	let session_id = require(query.session_id, "sessionId")?;
	let session = resolve_session(&state, &session_id)?;

	let repo_key = RepoKey::parse(&repo_key)
		.ok_or_else(|| ApiError::BadRequest("invalid repo key".to_string()))?;
	let record = owned_record(&state, &repo_key, &session)?;

	if query.delete_craft_doc
		&& let Some(document_id) = &record.document_id
	{
		let craft = state.craft_factory.client(&record.workspace_endpoint)?;
		if let Err(err) = craft.delete_document(document_id).await {
			tracing::warn!(repo = %repo_key, error = %err, "remote document delete failed");
		}
	}

	state.store.delete(&repo_key)?;
	Ok(Json(json!({"success": true})))
}

/// GET /sync/sync-status: scheduler snapshot.
pub(crate) async fn sync_status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	let status = state
		.sync
		.status()
		.await
		.ok_or_else(|| ApiError::Internal("sync service stopped".to_string()))?;
	Ok(Json(json!({
		"isRunning": status.is_running,
		"connectedRepos": status.connected_repos,
		"syncInterval": status.sync_interval.as_secs(),
		"lastSyncTimes": status.last_sync_times,
	})))
}

/// POST /sync/auto-sync: flip the auto-sync flag for a connection.
pub(crate) async fn auto_sync(
	State(state): State<AppState>,
	Json(body): Json<AutoSyncBody>,
) -> Result<Json<Value>, ApiError> {
	let session_id = require(body.session_id, "sessionId")?;
	let repo_full_name = require(body.repo_full_name, "repoFullName")?;
	let enabled = require(body.enabled, "enabled")?;
	let session = resolve_session(&state, &session_id)?;

	let repo_key = RepoKey::parse(&repo_full_name)
		.ok_or_else(|| ApiError::BadRequest("invalid repo key".to_string()))?;
	let mut record = owned_record(&state, &repo_key, &session)?;

	record.auto_sync_enabled = enabled;
	record.last_updated_at = chrono::Utc::now();
	state.store.put(record)?;
	Ok(Json(json!({"success": true, "autoSyncEnabled": enabled})))
}
