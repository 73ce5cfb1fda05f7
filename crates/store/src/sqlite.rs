//! SQLite row mapping for the connection store.

use chrono::{DateTime, Utc};
use engram_proto::{ConnectionRecord, Credential, RepoKey, SyncHistoryEntry};
use rusqlite::{Connection, Row, params};

use crate::error::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS connections (
	repo_key TEXT PRIMARY KEY COLLATE NOCASE,
	credential TEXT NOT NULL,
	workspace_endpoint TEXT NOT NULL,
	document_id TEXT,
	document_title TEXT NOT NULL,
	collection_ids TEXT,
	owner_user TEXT NOT NULL,
	connected_at TEXT NOT NULL,
	last_updated_at TEXT NOT NULL,
	last_synced_at TEXT,
	last_processed_pr INTEGER,
	confidence REAL,
	auto_sync_enabled INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS sync_history (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	repo_key TEXT NOT NULL,
	pr_number INTEGER,
	commit_sha TEXT,
	sync_type TEXT NOT NULL CHECK (sync_type IN ('pr','commit','manual')),
	is_significant INTEGER NOT NULL,
	change_type TEXT NOT NULL,
	summary TEXT NOT NULL,
	synced_at TEXT NOT NULL
);
";

pub(crate) fn init(conn: &Connection) -> Result<(), StoreError> {
	conn.execute_batch(SCHEMA)?;
	Ok(())
}

pub(crate) fn upsert(conn: &Connection, record: &ConnectionRecord) -> Result<(), StoreError> {
	let collection_ids = record
		.collection_ids
		.as_ref()
		.map(serde_json::to_string)
		.transpose()?;
	conn.execute(
		"INSERT OR REPLACE INTO connections (
			repo_key, credential, workspace_endpoint, document_id, document_title,
			collection_ids, owner_user, connected_at, last_updated_at, last_synced_at,
			last_processed_pr, confidence, auto_sync_enabled
		) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
		params![
			record.repo_key.as_str(),
			record.credential.expose(),
			record.workspace_endpoint,
			record.document_id,
			record.document_title,
			collection_ids,
			serde_json::to_string(&record.owner_user)?,
			record.connected_at.to_rfc3339(),
			record.last_updated_at.to_rfc3339(),
			record.last_synced_at.map(|t| t.to_rfc3339()),
			record.last_processed_pr.map(|n| n as i64),
			record.confidence,
			record.auto_sync_enabled,
		],
	)?;
	Ok(())
}

pub(crate) fn delete(conn: &Connection, repo_key: &RepoKey) -> Result<bool, StoreError> {
	let affected = conn.execute(
		"DELETE FROM connections WHERE repo_key = ?1",
		params![repo_key.as_str()],
	)?;
	Ok(affected > 0)
}

pub(crate) fn load_all(conn: &Connection) -> Result<Vec<ConnectionRecord>, StoreError> {
	let mut stmt = conn.prepare(
		"SELECT repo_key, credential, workspace_endpoint, document_id, document_title,
			collection_ids, owner_user, connected_at, last_updated_at, last_synced_at,
			last_processed_pr, confidence, auto_sync_enabled
		FROM connections",
	)?;
	let rows = stmt.query_map([], record_from_row)?;
	let mut records = Vec::new();
	for row in rows {
		match row {
			Ok(Some(record)) => records.push(record),
			Ok(None) => {}
			Err(err) => return Err(err.into()),
		}
	}
	Ok(records)
}

pub(crate) fn append_history(
	conn: &Connection,
	entry: &SyncHistoryEntry,
) -> Result<(), StoreError> {
	conn.execute(
		"INSERT INTO sync_history (
			repo_key, pr_number, commit_sha, sync_type, is_significant,
			change_type, summary, synced_at
		) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
		params![
			entry.repo_key.as_str(),
			entry.pr_number.map(|n| n as i64),
			entry.commit_sha,
			entry.sync_type.as_str(),
			entry.is_significant,
			entry.change_type,
			entry.summary,
			entry.synced_at.to_rfc3339(),
		],
	)?;
	Ok(())
}

/// Maps one row, dropping rows whose stored JSON or key no longer parses
/// rather than poisoning the whole load.
fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Option<ConnectionRecord>> {
	let raw_key: String = row.get(0)?;
	let Some(repo_key) = RepoKey::parse(&raw_key) else {
		tracing::warn!(repo_key = %raw_key, "skipping row with malformed key");
		return Ok(None);
	};
	let owner_raw: String = row.get(6)?;
	let Ok(owner_user) = serde_json::from_str(&owner_raw) else {
		tracing::warn!(repo_key = %raw_key, "skipping row with malformed owner");
		return Ok(None);
	};
	let collection_ids = row
		.get::<_, Option<String>>(5)?
		.and_then(|raw| serde_json::from_str(&raw).ok());

	Ok(Some(ConnectionRecord {
		repo_key,
		credential: Credential::new(row.get::<_, String>(1)?),
		workspace_endpoint: row.get(2)?,
		document_id: row.get(3)?,
		document_title: row.get(4)?,
		collection_ids,
		owner_user,
		connected_at: parse_instant(&row.get::<_, String>(7)?),
		last_updated_at: parse_instant(&row.get::<_, String>(8)?),
		last_synced_at: row
			.get::<_, Option<String>>(9)?
			.map(|raw| parse_instant(&raw)),
		last_processed_pr: row.get::<_, Option<i64>>(10)?.map(|n| n as u64),
		confidence: row.get::<_, Option<f64>>(11)?.unwrap_or(0.0),
		auto_sync_enabled: row.get(12)?,
	}))
}

fn parse_instant(raw: &str) -> DateTime<Utc> {
	DateTime::parse_from_rfc3339(raw)
		.map(|t| t.with_timezone(&Utc))
		.unwrap_or_else(|_| DateTime::<Utc>::MIN_UTC)
}
