//! Connection records and their identity types.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a connected repository, `"{owner}/{name}"`.
///
/// Case-preserving for display, case-insensitive for comparison and hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoKey(String);

impl RepoKey {
	/// Builds a key from owner and repository name.
	pub fn new(owner: &str, name: &str) -> Self {
		Self(format!("{owner}/{name}"))
	}

	/// Parses a `"{owner}/{name}"` string, rejecting anything without
	/// exactly one separating slash between non-empty halves.
	pub fn parse(raw: &str) -> Option<Self> {
		let (owner, name) = raw.split_once('/')?;
		if owner.is_empty() || name.is_empty() || name.contains('/') {
			return None;
		}
		Some(Self(raw.to_string()))
	}

	/// The owner half of the key.
	pub fn owner(&self) -> &str {
		self.0.split_once('/').map(|(o, _)| o).unwrap_or(&self.0)
	}

	/// The repository-name half of the key.
	pub fn name(&self) -> &str {
		self.0.split_once('/').map(|(_, n)| n).unwrap_or("")
	}

	/// The key as stored, original casing intact.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Canonical title of the root workspace document for this repository.
	pub fn document_title(&self) -> String {
		format!("{}-{}-docs", self.owner(), self.name())
	}
}

impl fmt::Display for RepoKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl PartialEq for RepoKey {
	fn eq(&self, other: &Self) -> bool {
		self.0.eq_ignore_ascii_case(&other.0)
	}
}

impl Eq for RepoKey {}

impl Hash for RepoKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		for byte in self.0.bytes() {
			state.write_u8(byte.to_ascii_lowercase());
		}
	}
}

/// Provider access token. The token text never appears in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
	pub fn new(token: impl Into<String>) -> Self {
		Self(token.into())
	}

	/// The raw token, for constructing authenticated clients.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Credential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Credential(***)")
	}
}

/// The provider user who created a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerUser {
	pub id: u64,
	pub login: String,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
}

/// Identifiers of the four collections under a root document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionIds {
	pub release_notes: String,
	pub adrs: String,
	pub engineering_tasks: String,
	pub doc_history: String,
}

/// One connected repository and its sync cursor.
///
/// A record with a non-null `document_id` always carries all four
/// collection ids; partial-progress records (document created but a later
/// materialisation step failed) persist whatever ids were obtained so a
/// retry can short-circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
	pub repo_key: RepoKey,
	pub credential: Credential,
	pub workspace_endpoint: String,
	pub document_id: Option<String>,
	pub document_title: String,
	pub collection_ids: Option<CollectionIds>,
	pub owner_user: OwnerUser,
	pub connected_at: DateTime<Utc>,
	pub last_updated_at: DateTime<Utc>,
	pub last_synced_at: Option<DateTime<Utc>>,
	pub last_processed_pr: Option<u64>,
	pub auto_sync_enabled: bool,
	pub confidence: f64,
}

impl ConnectionRecord {
	/// True once materialisation completed and the brain is sweepable.
	pub fn is_materialised(&self) -> bool {
		self.document_id.is_some() && self.collection_ids.is_some()
	}
}

/// Origin of a recorded sync event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
	Pr,
	Commit,
	Manual,
}

impl SyncType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Pr => "pr",
			Self::Commit => "commit",
			Self::Manual => "manual",
		}
	}
}

/// One row of the optional sync-history audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncHistoryEntry {
	pub repo_key: RepoKey,
	pub pr_number: Option<u64>,
	pub commit_sha: Option<String>,
	pub sync_type: SyncType,
	pub is_significant: bool,
	pub change_type: String,
	pub summary: String,
	pub synced_at: DateTime<Utc>,
}
