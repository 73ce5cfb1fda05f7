//! Durable `RepoKey -> ConnectionRecord` store.
//!
//! An in-memory index serves all reads lock-free; every mutation acquires
//! a per-key lock and writes through to SQLite. When the database cannot
//! be opened the store degrades to a file-backed JSON map at a configured
//! path, the same way the knowledge index degrades to disabled when its
//! engine is unavailable.

mod error;
mod fallback;
mod sqlite;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use engram_proto::{ConnectionRecord, RepoKey, SyncHistoryEntry};
use parking_lot::{Mutex, RwLock};
use rusqlite::Connection;

pub use error::StoreError;

/// Partial cursor advance for one connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorUpdate {
	pub last_processed_pr: Option<u64>,
	pub last_synced_at: Option<DateTime<Utc>>,
}

enum Backend {
	Sqlite(Mutex<Connection>),
	Json(PathBuf),
}

struct Inner {
	index: RwLock<HashMap<RepoKey, ConnectionRecord>>,
	key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
	backend: Backend,
}

/// The connection store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Store {
	inner: Arc<Inner>,
}

impl Store {
	/// Opens the SQLite store at `db_path`, degrading to a JSON map at
	/// `fallback_path` when the database is unavailable.
	pub fn open(db_path: &Path, fallback_path: &Path) -> Self {
		let backend = match open_sqlite(db_path) {
			Ok(conn) => Backend::Sqlite(Mutex::new(conn)),
			Err(err) => {
				tracing::warn!(
					error = %err,
					path = %db_path.display(),
					fallback = %fallback_path.display(),
					"database unavailable, using JSON fallback"
				);
				Backend::Json(fallback_path.to_path_buf())
			}
		};
		Self {
			inner: Arc::new(Inner {
				index: RwLock::new(HashMap::new()),
				key_locks: Mutex::new(HashMap::new()),
				backend,
			}),
		}
	}

	/// Loads every persisted record into the in-memory index.
	pub fn initialize(&self) -> Result<usize, StoreError> {
		let records = match &self.inner.backend {
			Backend::Sqlite(conn) => sqlite::load_all(&conn.lock())?,
			Backend::Json(path) => fallback::load(path)?,
		};
		let count = records.len();
		let mut index = self.inner.index.write();
		index.clear();
		for record in records {
			index.insert(record.repo_key.clone(), record);
		}
		Ok(count)
	}

	/// Inserts or replaces a record.
	pub fn put(&self, record: ConnectionRecord) -> Result<(), StoreError> {
		let lock = self.key_lock(&record.repo_key);
		let _guard = lock.lock();
		self.write_through(&record)?;
		self.inner
			.index
			.write()
			.insert(record.repo_key.clone(), record);
		Ok(())
	}

	pub fn get(&self, repo_key: &RepoKey) -> Option<ConnectionRecord> {
		self.inner.index.read().get(repo_key).cloned()
	}

	/// Removes a record; true when something was removed.
	pub fn delete(&self, repo_key: &RepoKey) -> Result<bool, StoreError> {
		let lock = self.key_lock(repo_key);
		let _guard = lock.lock();
		let removed = self.inner.index.write().remove(repo_key).is_some();
		match &self.inner.backend {
			Backend::Sqlite(conn) => {
				sqlite::delete(&conn.lock(), repo_key)?;
			}
			Backend::Json(path) => self.save_json(path)?,
		}
		Ok(removed)
	}

	pub fn all(&self) -> Vec<ConnectionRecord> {
		self.inner.index.read().values().cloned().collect()
	}

	/// Advances the sync cursor. Idempotent; a decrease of
	/// `last_processed_pr` is rejected as an invariant violation.
	pub fn update_cursor(
		&self,
		repo_key: &RepoKey,
		update: CursorUpdate,
	) -> Result<ConnectionRecord, StoreError> {
		let lock = self.key_lock(repo_key);
		let _guard = lock.lock();

		let mut record = self
			.get(repo_key)
			.ok_or_else(|| StoreError::UnknownConnection(repo_key.to_string()))?;

		if let Some(pr) = update.last_processed_pr {
			let current = record.last_processed_pr.unwrap_or(0);
			if pr < current {
				return Err(StoreError::CursorRegression {
					repo_key: repo_key.to_string(),
					from: current,
					to: pr,
				});
			}
			record.last_processed_pr = Some(pr);
		}
		if let Some(at) = update.last_synced_at {
			record.last_synced_at = Some(at);
		}
		record.last_updated_at = Utc::now();

		self.write_through(&record)?;
		self.inner
			.index
			.write()
			.insert(record.repo_key.clone(), record.clone());
		Ok(record)
	}

	/// Appends an audit row. Best-effort by contract; the JSON fallback
	/// keeps no history.
	pub fn record_history(&self, entry: &SyncHistoryEntry) -> Result<(), StoreError> {
		match &self.inner.backend {
			Backend::Sqlite(conn) => sqlite::append_history(&conn.lock(), entry),
			Backend::Json(_) => Ok(()),
		}
	}

	/// True when running against the JSON fallback rather than SQLite.
	pub fn is_degraded(&self) -> bool {
		matches!(self.inner.backend, Backend::Json(_))
	}

	fn write_through(&self, record: &ConnectionRecord) -> Result<(), StoreError> {
		match &self.inner.backend {
			Backend::Sqlite(conn) => sqlite::upsert(&conn.lock(), record),
			Backend::Json(path) => {
				// The index write happens after this call; include the
				// new record in the snapshot explicitly.
				let mut records: Vec<ConnectionRecord> = self
					.inner
					.index
					.read()
					.values()
					.filter(|r| r.repo_key != record.repo_key)
					.cloned()
					.collect();
				records.push(record.clone());
				fallback::save(path, &records)
			}
		}
	}

	fn save_json(&self, path: &Path) -> Result<(), StoreError> {
		let records: Vec<ConnectionRecord> = self.all();
		fallback::save(path, &records)
	}

	fn key_lock(&self, repo_key: &RepoKey) -> Arc<Mutex<()>> {
		let mut locks = self.inner.key_locks.lock();
		locks
			.entry(repo_key.as_str().to_ascii_lowercase())
			.or_default()
			.clone()
	}
}

fn open_sqlite(path: &Path) -> Result<Connection, StoreError> {
	let conn = Connection::open(path)?;
	sqlite::init(&conn)?;
	Ok(conn)
}

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use engram_proto::{
		CollectionIds, ConnectionRecord, Credential, OwnerUser, RepoKey, SyncHistoryEntry, SyncType,
	};
	use tempfile::TempDir;

	use super::{CursorUpdate, Store, StoreError};

	fn record(key: &str) -> ConnectionRecord {
		let repo_key = RepoKey::parse(key).expect("key");
		let document_title = repo_key.document_title();
		ConnectionRecord {
			repo_key,
			credential: Credential::new("token"),
			workspace_endpoint: "https://craft.example/mcp".to_string(),
			document_id: Some("doc-1".to_string()),
			document_title,
			collection_ids: Some(CollectionIds {
				release_notes: "c1".to_string(),
				adrs: "c2".to_string(),
				engineering_tasks: "c3".to_string(),
				doc_history: "c4".to_string(),
			}),
			owner_user: OwnerUser {
				id: 7,
				login: "octocat".to_string(),
				display_name: None,
				email: None,
			},
			connected_at: Utc::now(),
			last_updated_at: Utc::now(),
			last_synced_at: None,
			last_processed_pr: Some(41),
			auto_sync_enabled: true,
			confidence: 0.82,
		}
	}

	fn open_store(dir: &TempDir) -> Store {
		let store = Store::open(&dir.path().join("engram.db"), &dir.path().join("engram.json"));
		assert!(!store.is_degraded());
		store.initialize().expect("initialize");
		store
	}

	#[test]
	fn put_get_delete_roundtrip() {
		let dir = TempDir::new().expect("tempdir");
		let store = open_store(&dir);

		store.put(record("octocat/hello")).expect("put");
		let key = RepoKey::parse("OCTOCAT/HELLO").expect("key");
		let got = store.get(&key).expect("case-insensitive get");
		assert_eq!(got.document_id.as_deref(), Some("doc-1"));

		assert!(store.delete(&key).expect("delete"));
		assert!(store.get(&key).is_none());
		assert!(!store.delete(&key).expect("idempotent delete"));
	}

	#[test]
	fn initialize_reloads_persisted_rows() {
		let dir = TempDir::new().expect("tempdir");
		{
			let store = open_store(&dir);
			store.put(record("octocat/hello")).expect("put");
			store.put(record("octocat/world")).expect("put");
		}
		let store = Store::open(&dir.path().join("engram.db"), &dir.path().join("engram.json"));
		assert_eq!(store.initialize().expect("reload"), 2);
		assert_eq!(store.all().len(), 2);
	}

	#[test]
	fn cursor_is_monotonic() {
		let dir = TempDir::new().expect("tempdir");
		let store = open_store(&dir);
		let key = RepoKey::parse("octocat/hello").expect("key");
		store.put(record("octocat/hello")).expect("put");

		let updated = store
			.update_cursor(
				&key,
				CursorUpdate {
					last_processed_pr: Some(44),
					last_synced_at: Some(Utc::now()),
				},
			)
			.expect("advance");
		assert_eq!(updated.last_processed_pr, Some(44));
		assert!(updated.last_synced_at.is_some());

		// Idempotent at the same number.
		store
			.update_cursor(
				&key,
				CursorUpdate {
					last_processed_pr: Some(44),
					..Default::default()
				},
			)
			.expect("same number");

		// Regression is an invariant violation.
		let err = store
			.update_cursor(
				&key,
				CursorUpdate {
					last_processed_pr: Some(43),
					..Default::default()
				},
			)
			.expect_err("regression");
		assert!(matches!(err, StoreError::CursorRegression { .. }));
	}

	#[test]
	fn cursor_update_for_unknown_connection_fails() {
		let dir = TempDir::new().expect("tempdir");
		let store = open_store(&dir);
		let key = RepoKey::parse("ghost/repo").expect("key");
		let err = store
			.update_cursor(&key, CursorUpdate::default())
			.expect_err("unknown");
		assert!(matches!(err, StoreError::UnknownConnection(_)));
	}

	#[test]
	fn degrades_to_json_fallback() {
		let dir = TempDir::new().expect("tempdir");
		// A directory path cannot be opened as a database file.
		let store = Store::open(dir.path(), &dir.path().join("fallback.json"));
		assert!(store.is_degraded());
		store.initialize().expect("initialize");

		store.put(record("octocat/hello")).expect("put");
		let key = RepoKey::parse("octocat/hello").expect("key");
		assert!(store.get(&key).is_some());

		// The fallback survives a reopen.
		let store = Store::open(dir.path(), &dir.path().join("fallback.json"));
		store.initialize().expect("reload");
		assert!(store.get(&key).is_some());
	}

	#[test]
	fn history_rows_are_accepted() {
		let dir = TempDir::new().expect("tempdir");
		let store = open_store(&dir);
		store
			.record_history(&SyncHistoryEntry {
				repo_key: RepoKey::parse("octocat/hello").expect("key"),
				pr_number: Some(42),
				commit_sha: None,
				sync_type: SyncType::Pr,
				is_significant: true,
				change_type: "feature".to_string(),
				summary: "adds things".to_string(),
				synced_at: Utc::now(),
			})
			.expect("history");
	}
}
