//! Trait seams over the external collaborators.
//!
//! The engine constructs a fresh provider and workspace client per
//! connection per cycle (stale credentials must not outlive the cycle
//! that discovered them), so the seams are factories handing out trait
//! objects. Tests substitute recording mocks.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engram_craft::{
	CollectionSchema, CraftClient, CraftError, DocumentProbe, DocumentRef, MainDocumentUpdate,
	Position,
};
use engram_github::{
	CommitInfo, GithubClient, GithubError, PrDetail, PrSummary, RepoSummary,
};
use engram_oracle::{OracleClient, OracleError};
use engram_proto::{
	ChangeAnalysis, CommitSignificance, Credential, IssueSummary, RepoAnalysis, RepoSignals,
	TreeEntry,
};
use serde_json::Value;

/// Version-control provider operations the sync engine consumes.
#[async_trait]
pub trait VcsApi: Send + Sync {
	async fn list_tree(&self, owner: &str, name: &str, ref_: &str)
	-> Result<Vec<TreeEntry>, GithubError>;
	async fn get_readme(&self, owner: &str, name: &str) -> Result<Option<String>, GithubError>;
	async fn get_package_manifests(
		&self,
		owner: &str,
		name: &str,
	) -> Result<BTreeMap<String, String>, GithubError>;
	async fn get_languages(&self, owner: &str, name: &str)
	-> Result<BTreeMap<String, u64>, GithubError>;
	async fn list_open_issues(&self, owner: &str, name: &str)
	-> Result<Vec<IssueSummary>, GithubError>;
	async fn list_repositories(&self) -> Result<Vec<RepoSummary>, GithubError>;
	async fn list_merged_prs_since(
		&self,
		owner: &str,
		name: &str,
		since: Option<u64>,
	) -> Result<Vec<PrSummary>, GithubError>;
	async fn get_pr(&self, owner: &str, name: &str, number: u64) -> Result<PrDetail, GithubError>;
	async fn get_commit(&self, owner: &str, name: &str, sha: &str)
	-> Result<CommitInfo, GithubError>;
	async fn list_commits(
		&self,
		owner: &str,
		name: &str,
		ref_: &str,
		since: Option<DateTime<Utc>>,
	) -> Result<Vec<CommitInfo>, GithubError>;
}

/// Workspace operations the sync engine consumes.
#[async_trait]
pub trait CraftApi: Send + Sync {
	async fn document_exists(&self, title: &str) -> Result<DocumentProbe, CraftError>;
	async fn list_documents(&self) -> Result<Vec<DocumentRef>, CraftError>;
	async fn create_document(&self, title: &str) -> Result<String, CraftError>;
	async fn delete_document(&self, document_id: &str) -> Result<(), CraftError>;
	async fn append_markdown(
		&self,
		page_id: &str,
		markdown: &str,
		position: Position,
	) -> Result<(), CraftError>;
	async fn create_collection(
		&self,
		page_id: &str,
		name: &str,
		schema: &CollectionSchema,
	) -> Result<String, CraftError>;
	async fn add_collection_items(
		&self,
		collection_id: &str,
		items: &[Value],
	) -> Result<(), CraftError>;
	async fn update_main_document(&self, update: &MainDocumentUpdate) -> Result<(), CraftError>;
	async fn regenerate_section(
		&self,
		page_id: &str,
		section_name: &str,
		new_markdown: &str,
	) -> Result<(), CraftError>;
}

/// The language-model oracle.
#[async_trait]
pub trait OracleApi: Send + Sync {
	async fn analyse_repository(&self, signals: &RepoSignals)
	-> Result<RepoAnalysis, OracleError>;
	async fn analyse_pr(&self, pr: &PrDetail) -> Result<ChangeAnalysis, OracleError>;
	async fn analyse_commits(
		&self,
		commits: &[CommitInfo],
		files: &[engram_github::FileChange],
	) -> Result<CommitSignificance, OracleError>;
}

/// Hands out a provider client bound to one credential.
pub trait VcsFactory: Send + Sync {
	fn client(&self, credential: &Credential) -> Result<Arc<dyn VcsApi>, GithubError>;
}

/// Hands out a workspace client bound to one endpoint.
pub trait CraftFactory: Send + Sync {
	fn client(&self, endpoint: &str) -> Result<Arc<dyn CraftApi>, CraftError>;
}

#[async_trait]
impl VcsApi for GithubClient {
	async fn list_tree(
		&self,
		owner: &str,
		name: &str,
		ref_: &str,
	) -> Result<Vec<TreeEntry>, GithubError> {
		GithubClient::list_tree(self, owner, name, ref_).await
	}

	async fn get_readme(&self, owner: &str, name: &str) -> Result<Option<String>, GithubError> {
		GithubClient::get_readme(self, owner, name).await
	}

	async fn get_package_manifests(
		&self,
		owner: &str,
		name: &str,
	) -> Result<BTreeMap<String, String>, GithubError> {
		GithubClient::get_package_manifests(self, owner, name).await
	}

	async fn get_languages(
		&self,
		owner: &str,
		name: &str,
	) -> Result<BTreeMap<String, u64>, GithubError> {
		GithubClient::get_languages(self, owner, name).await
	}

	async fn list_open_issues(
		&self,
		owner: &str,
		name: &str,
	) -> Result<Vec<IssueSummary>, GithubError> {
		GithubClient::list_open_issues(self, owner, name).await
	}

	async fn list_repositories(&self) -> Result<Vec<RepoSummary>, GithubError> {
		GithubClient::list_repositories(self).await
	}

	async fn list_merged_prs_since(
		&self,
		owner: &str,
		name: &str,
		since: Option<u64>,
	) -> Result<Vec<PrSummary>, GithubError> {
		GithubClient::list_merged_prs_since(self, owner, name, since).await
	}

	async fn get_pr(&self, owner: &str, name: &str, number: u64) -> Result<PrDetail, GithubError> {
		GithubClient::get_pr(self, owner, name, number).await
	}

	async fn get_commit(
		&self,
		owner: &str,
		name: &str,
		sha: &str,
	) -> Result<CommitInfo, GithubError> {
		GithubClient::get_commit(self, owner, name, sha).await
	}

	async fn list_commits(
		&self,
		owner: &str,
		name: &str,
		ref_: &str,
		since: Option<DateTime<Utc>>,
	) -> Result<Vec<CommitInfo>, GithubError> {
		GithubClient::list_commits(self, owner, name, ref_, since).await
	}
}

#[async_trait]
impl CraftApi for CraftClient {
	async fn document_exists(&self, title: &str) -> Result<DocumentProbe, CraftError> {
		CraftClient::document_exists(self, title).await
	}

	async fn list_documents(&self) -> Result<Vec<DocumentRef>, CraftError> {
		CraftClient::list_documents(self).await
	}

	async fn create_document(&self, title: &str) -> Result<String, CraftError> {
		CraftClient::create_document(self, title).await
	}

	async fn delete_document(&self, document_id: &str) -> Result<(), CraftError> {
		CraftClient::delete_document(self, document_id).await
	}

	async fn append_markdown(
		&self,
		page_id: &str,
		markdown: &str,
		position: Position,
	) -> Result<(), CraftError> {
		CraftClient::append_markdown(self, page_id, markdown, position).await
	}

	async fn create_collection(
		&self,
		page_id: &str,
		name: &str,
		schema: &CollectionSchema,
	) -> Result<String, CraftError> {
		CraftClient::create_collection(self, page_id, name, schema).await
	}

	async fn add_collection_items(
		&self,
		collection_id: &str,
		items: &[Value],
	) -> Result<(), CraftError> {
		CraftClient::add_collection_items(self, collection_id, items).await
	}

	async fn update_main_document(&self, update: &MainDocumentUpdate) -> Result<(), CraftError> {
		CraftClient::update_main_document(self, update).await
	}

	async fn regenerate_section(
		&self,
		page_id: &str,
		section_name: &str,
		new_markdown: &str,
	) -> Result<(), CraftError> {
		CraftClient::regenerate_section(self, page_id, section_name, new_markdown).await
	}
}

#[async_trait]
impl OracleApi for OracleClient {
	async fn analyse_repository(
		&self,
		signals: &RepoSignals,
	) -> Result<RepoAnalysis, OracleError> {
		OracleClient::analyse_repository(self, signals).await
	}

	async fn analyse_pr(&self, pr: &PrDetail) -> Result<ChangeAnalysis, OracleError> {
		OracleClient::analyse_pr(self, pr).await
	}

	async fn analyse_commits(
		&self,
		commits: &[CommitInfo],
		files: &[engram_github::FileChange],
	) -> Result<CommitSignificance, OracleError> {
		OracleClient::analyse_commits(self, commits, files).await
	}
}

/// Factory producing real GitHub clients.
pub struct RestVcsFactory {
	base: Option<String>,
}

impl RestVcsFactory {
	pub fn new() -> Self {
		Self { base: None }
	}

	/// Points the factory at a custom API base (test servers).
	pub fn with_base(base: impl Into<String>) -> Self {
		Self {
			base: Some(base.into()),
		}
	}
}

impl Default for RestVcsFactory {
	fn default() -> Self {
		Self::new()
	}
}

impl VcsFactory for RestVcsFactory {
	fn client(&self, credential: &Credential) -> Result<Arc<dyn VcsApi>, GithubError> {
		let client = match &self.base {
			Some(base) => GithubClient::with_base(credential.expose(), base)?,
			None => GithubClient::new(credential.expose())?,
		};
		Ok(Arc::new(client))
	}
}

/// Factory producing real workspace clients.
#[derive(Default)]
pub struct ToolCraftFactory;

impl CraftFactory for ToolCraftFactory {
	fn client(&self, endpoint: &str) -> Result<Arc<dyn CraftApi>, CraftError> {
		Ok(Arc::new(CraftClient::new(endpoint)?))
	}
}
