//! The GitHub REST client.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use engram_proto::{IssueSummary, TreeEntry};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::GithubError;
use crate::types::{
	CommitInfo, CommitStats, FileChange, PrComment, PrDetail, PrReview, PrSummary, RepoSummary,
};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "engram-sync";
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Manifest files probed per ecosystem, keyed by the name used in
/// repository signals.
const MANIFEST_PROBES: &[(&str, &str)] = &[
	("node", "package.json"),
	("rust", "Cargo.toml"),
	("go", "go.mod"),
	("python", "requirements.txt"),
	("java", "pom.xml"),
	("ruby", "Gemfile"),
];

/// Authenticated client for one provider token.
///
/// Constructed per connection per cycle so a revoked or rotated token never
/// outlives the cycle that discovered it.
pub struct GithubClient {
	http: reqwest::Client,
	base: String,
	token: String,
}

impl GithubClient {
	/// Builds a client for the given token against the public API.
	pub fn new(token: &str) -> Result<Self, GithubError> {
		Self::with_base(token, DEFAULT_API_BASE)
	}

	/// Builds a client against a custom API base (test servers).
	pub fn with_base(token: &str, base: &str) -> Result<Self, GithubError> {
		let http = reqwest::Client::builder()
			.timeout(CALL_TIMEOUT)
			.user_agent(USER_AGENT)
			.build()?;
		Ok(Self {
			http,
			base: base.trim_end_matches('/').to_string(),
			token: token.to_string(),
		})
	}

	async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GithubError> {
		let url = format!("{}{path}", self.base);
		let resp = self
			.http
			.get(&url)
			.bearer_auth(&self.token)
			.header("Accept", "application/vnd.github+json")
			.send()
			.await?;
		let status = resp.status().as_u16();
		if !resp.status().is_success() {
			return Err(GithubError::from_status(status, path));
		}
		resp.json::<T>()
			.await
			.map_err(|err| GithubError::Decode(format!("{path}: {err}")))
	}

	/// Lists the full file tree of `ref_`, recursively.
	pub async fn list_tree(
		&self,
		owner: &str,
		name: &str,
		ref_: &str,
	) -> Result<Vec<TreeEntry>, GithubError> {
		let raw: RawTree = self
			.get_json(&format!(
				"/repos/{owner}/{name}/git/trees/{ref_}?recursive=1"
			))
			.await?;
		Ok(raw
			.tree
			.into_iter()
			.filter(|entry| entry.kind == "blob")
			.map(|entry| TreeEntry {
				path: entry.path,
				size: entry.size.unwrap_or(0),
			})
			.collect())
	}

	/// Fetches the repository README, decoded, or `None` when absent.
	///
	/// A missing README is data; a README that cannot be decoded is a fault.
	pub async fn get_readme(&self, owner: &str, name: &str) -> Result<Option<String>, GithubError> {
		let raw: RawContent = match self.get_json(&format!("/repos/{owner}/{name}/readme")).await {
			Ok(raw) => raw,
			Err(GithubError::NotFound(_)) => return Ok(None),
			Err(err) => return Err(err),
		};
		decode_content(&raw).map(Some)
	}

	/// Probes well-known package manifests; absent ecosystems are omitted.
	pub async fn get_package_manifests(
		&self,
		owner: &str,
		name: &str,
	) -> Result<BTreeMap<String, String>, GithubError> {
		let mut manifests = BTreeMap::new();
		for (ecosystem, file) in MANIFEST_PROBES {
			let raw: RawContent = match self
				.get_json(&format!("/repos/{owner}/{name}/contents/{file}"))
				.await
			{
				Ok(raw) => raw,
				Err(GithubError::NotFound(_)) => continue,
				Err(err) => return Err(err),
			};
			manifests.insert(ecosystem.to_string(), decode_content(&raw)?);
		}
		Ok(manifests)
	}

	/// Byte counts per language.
	pub async fn get_languages(
		&self,
		owner: &str,
		name: &str,
	) -> Result<BTreeMap<String, u64>, GithubError> {
		self.get_json(&format!("/repos/{owner}/{name}/languages"))
			.await
	}

	/// Open issues, excluding pull requests.
	pub async fn list_open_issues(
		&self,
		owner: &str,
		name: &str,
	) -> Result<Vec<IssueSummary>, GithubError> {
		let raw: Vec<RawIssue> = self
			.get_json(&format!(
				"/repos/{owner}/{name}/issues?state=open&per_page=50"
			))
			.await?;
		Ok(raw
			.into_iter()
			.filter(|issue| issue.pull_request.is_none())
			.map(|issue| IssueSummary {
				number: issue.number,
				title: issue.title,
				labels: issue.labels.into_iter().map(|l| l.name).collect(),
			})
			.collect())
	}

	/// Repositories visible to the token, most recently pushed first.
	pub async fn list_repositories(&self) -> Result<Vec<RepoSummary>, GithubError> {
		let raw: Vec<RawRepo> = self
			.get_json("/user/repos?sort=pushed&per_page=100")
			.await?;
		Ok(raw
			.into_iter()
			.map(|repo| RepoSummary {
				full_name: repo.full_name,
				name: repo.name,
				owner: repo.owner.login,
				private: repo.private,
				description: repo.description,
				default_branch: repo.default_branch,
			})
			.collect())
	}

	/// Merged pull requests with a number strictly greater than `since`,
	/// ascending by number.
	pub async fn list_merged_prs_since(
		&self,
		owner: &str,
		name: &str,
		since: Option<u64>,
	) -> Result<Vec<PrSummary>, GithubError> {
		let raw: Vec<RawPr> = self
			.get_json(&format!(
				"/repos/{owner}/{name}/pulls?state=closed&sort=updated&direction=desc&per_page=100"
			))
			.await?;
		let floor = since.unwrap_or(0);
		let mut merged: Vec<PrSummary> = raw
			.into_iter()
			.filter(|pr| pr.number > floor)
			.filter_map(|pr| {
				pr.merged_at.map(|merged_at| PrSummary {
					number: pr.number,
					title: pr.title,
					merged_at,
				})
			})
			.collect();
		merged.sort_by_key(|pr| pr.number);
		Ok(merged)
	}

	/// Full pull-request detail including files, discussion and reviews.
	pub async fn get_pr(
		&self,
		owner: &str,
		name: &str,
		number: u64,
	) -> Result<PrDetail, GithubError> {
		let pr: RawPr = self
			.get_json(&format!("/repos/{owner}/{name}/pulls/{number}"))
			.await?;
		let files: Vec<RawFile> = self
			.get_json(&format!(
				"/repos/{owner}/{name}/pulls/{number}/files?per_page=100"
			))
			.await?;
		let comments: Vec<RawComment> = self
			.get_json(&format!(
				"/repos/{owner}/{name}/issues/{number}/comments?per_page=100"
			))
			.await?;
		let reviews: Vec<RawReview> = self
			.get_json(&format!(
				"/repos/{owner}/{name}/pulls/{number}/reviews?per_page=100"
			))
			.await?;

		Ok(PrDetail {
			number: pr.number,
			title: pr.title,
			body: pr.body.unwrap_or_default(),
			author: pr.user.map(|u| u.login).unwrap_or_default(),
			merged_at: pr.merged_at,
			base_ref: pr.base.map(|b| b.r#ref).unwrap_or_default(),
			files_changed: files.into_iter().map(FileChange::from).collect(),
			comments: comments
				.into_iter()
				.map(|c| PrComment {
					author: c.user.map(|u| u.login).unwrap_or_default(),
					body: c.body.unwrap_or_default(),
				})
				.collect(),
			reviews: reviews
				.into_iter()
				.map(|r| PrReview {
					author: r.user.map(|u| u.login).unwrap_or_default(),
					state: r.state,
					body: r.body.unwrap_or_default(),
				})
				.collect(),
		})
	}

	/// One commit with its files and stats.
	pub async fn get_commit(
		&self,
		owner: &str,
		name: &str,
		sha: &str,
	) -> Result<CommitInfo, GithubError> {
		let raw: RawCommit = self
			.get_json(&format!("/repos/{owner}/{name}/commits/{sha}"))
			.await?;
		Ok(raw.into())
	}

	/// Commits on `ref_` since `since`, descending by commit date as the
	/// provider returns them.
	pub async fn list_commits(
		&self,
		owner: &str,
		name: &str,
		ref_: &str,
		since: Option<DateTime<Utc>>,
	) -> Result<Vec<CommitInfo>, GithubError> {
		let mut path = format!("/repos/{owner}/{name}/commits?sha={ref_}&per_page=50");
		if let Some(since) = since {
			path.push_str(&format!("&since={}", since.to_rfc3339()));
		}
		let raw: Vec<RawCommit> = self.get_json(&path).await?;
		Ok(raw.into_iter().map(CommitInfo::from).collect())
	}
}

fn decode_content(raw: &RawContent) -> Result<String, GithubError> {
	let cleaned: String = raw
		.content
		.chars()
		.filter(|c| !c.is_ascii_whitespace())
		.collect();
	let bytes = base64::engine::general_purpose::STANDARD
		.decode(cleaned)
		.map_err(|err| GithubError::Decode(format!("base64: {err}")))?;
	String::from_utf8(bytes).map_err(|err| GithubError::Decode(format!("utf8: {err}")))
}

#[derive(Deserialize)]
struct RawTree {
	#[serde(default)]
	tree: Vec<RawTreeEntry>,
}

#[derive(Deserialize)]
struct RawTreeEntry {
	path: String,
	#[serde(rename = "type")]
	kind: String,
	#[serde(default)]
	size: Option<u64>,
}

#[derive(Deserialize)]
struct RawContent {
	#[serde(default)]
	content: String,
}

#[derive(Deserialize)]
struct RawLabel {
	name: String,
}

#[derive(Deserialize)]
struct RawIssue {
	number: u64,
	title: String,
	#[serde(default)]
	labels: Vec<RawLabel>,
	#[serde(default)]
	pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawUser {
	login: String,
}

#[derive(Deserialize)]
struct RawRepo {
	full_name: String,
	name: String,
	owner: RawUser,
	private: bool,
	#[serde(default)]
	description: Option<String>,
	#[serde(default)]
	default_branch: Option<String>,
}

#[derive(Deserialize)]
struct RawBase {
	r#ref: String,
}

#[derive(Deserialize)]
struct RawPr {
	number: u64,
	title: String,
	#[serde(default)]
	body: Option<String>,
	#[serde(default)]
	user: Option<RawUser>,
	#[serde(default)]
	merged_at: Option<DateTime<Utc>>,
	#[serde(default)]
	base: Option<RawBase>,
}

#[derive(Deserialize)]
struct RawFile {
	filename: String,
	#[serde(default)]
	additions: u64,
	#[serde(default)]
	deletions: u64,
	#[serde(default)]
	patch: Option<String>,
}

impl From<RawFile> for FileChange {
	fn from(raw: RawFile) -> Self {
		Self {
			filename: raw.filename,
			additions: raw.additions,
			deletions: raw.deletions,
			patch: raw.patch,
		}
	}
}

#[derive(Deserialize)]
struct RawComment {
	#[serde(default)]
	user: Option<RawUser>,
	#[serde(default)]
	body: Option<String>,
}

#[derive(Deserialize)]
struct RawReview {
	#[serde(default)]
	user: Option<RawUser>,
	state: String,
	#[serde(default)]
	body: Option<String>,
}

#[derive(Deserialize)]
struct RawCommitAuthor {
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawCommitInner {
	message: String,
	#[serde(default)]
	author: Option<RawCommitAuthor>,
}

#[derive(Deserialize)]
struct RawStats {
	#[serde(default)]
	additions: u64,
	#[serde(default)]
	deletions: u64,
	#[serde(default)]
	total: u64,
}

#[derive(Deserialize)]
struct RawCommit {
	sha: String,
	commit: RawCommitInner,
	#[serde(default)]
	files: Vec<RawFile>,
	#[serde(default)]
	stats: Option<RawStats>,
}

impl From<RawCommit> for CommitInfo {
	fn from(raw: RawCommit) -> Self {
		let author = raw.commit.author.as_ref();
		Self {
			sha: raw.sha,
			message: raw.commit.message,
			author: author
				.and_then(|a| a.name.clone())
				.unwrap_or_default(),
			date: author
				.and_then(|a| a.date)
				.unwrap_or_else(|| DateTime::<Utc>::MIN_UTC),
			files: raw.files.into_iter().map(FileChange::from).collect(),
			stats: raw
				.stats
				.map(|s| CommitStats {
					additions: s.additions,
					deletions: s.deletions,
					total: s.total,
				})
				.unwrap_or_default(),
		}
	}
}
