//! Response models for the GitHub client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository visible to the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSummary {
	pub full_name: String,
	pub name: String,
	pub owner: String,
	pub private: bool,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub default_branch: Option<String>,
}

/// A merged pull request as returned by the list sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrSummary {
	pub number: u64,
	pub title: String,
	pub merged_at: DateTime<Utc>,
}

/// One changed file in a pull request or commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileChange {
	pub filename: String,
	#[serde(default)]
	pub additions: u64,
	#[serde(default)]
	pub deletions: u64,
	#[serde(default)]
	pub patch: Option<String>,
}

/// A discussion comment on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrComment {
	pub author: String,
	pub body: String,
}

/// A review on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrReview {
	pub author: String,
	pub state: String,
	#[serde(default)]
	pub body: String,
}

/// Full pull-request detail, including discussion and reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrDetail {
	pub number: u64,
	pub title: String,
	#[serde(default)]
	pub body: String,
	pub author: String,
	pub merged_at: Option<DateTime<Utc>>,
	pub base_ref: String,
	pub files_changed: Vec<FileChange>,
	pub comments: Vec<PrComment>,
	pub reviews: Vec<PrReview>,
}

/// Aggregate line counts for a commit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CommitStats {
	pub additions: u64,
	pub deletions: u64,
	pub total: u64,
}

/// A single commit with its files and stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
	pub sha: String,
	pub message: String,
	pub author: String,
	pub date: DateTime<Utc>,
	#[serde(default)]
	pub files: Vec<FileChange>,
	#[serde(default)]
	pub stats: CommitStats,
}
