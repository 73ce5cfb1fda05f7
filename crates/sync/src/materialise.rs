//! One-shot materialisation of an Engineering Brain.
//!
//! The pipeline is idempotent by repository key: the store is consulted
//! first, then the workspace itself (the ground truth), and only then is
//! anything created. Signal gathering degrades per call; an oracle
//! failure degrades to a low-confidence skeleton. Once the root document
//! exists, every later failure still persists a partial record so a
//! retry short-circuits instead of duplicating documents.

use std::sync::Arc;

use chrono::Utc;
use engram_craft::Position;
use engram_proto::{
	CollectionIds, ConnectionRecord, Credential, OwnerUser, RepoAnalysis, RepoKey, RepoSignals,
};
use engram_store::Store;

use crate::clients::{CraftApi, CraftFactory, OracleApi, VcsApi, VcsFactory};
use crate::collections;
use crate::error::SyncError;
use crate::markdown;

/// Confidence assigned to the skeleton analysis when the oracle fails.
const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Inputs for one materialisation.
#[derive(Debug, Clone)]
pub struct MaterialiseRequest {
	pub repo_key: RepoKey,
	pub credential: Credential,
	pub workspace_endpoint: String,
	pub branch: String,
	pub owner_user: OwnerUser,
}

/// Outcome of a materialisation.
#[derive(Debug, Clone)]
pub enum MaterialiseResult {
	/// The brain already existed; nothing was created.
	Existing { document_id: String, title: String },
	/// A fresh brain was created.
	Created {
		document_id: String,
		title: String,
		collection_ids: CollectionIds,
		confidence: f64,
		tech_stack: Vec<String>,
	},
}

impl MaterialiseResult {
	pub fn document_id(&self) -> &str {
		match self {
			Self::Existing { document_id, .. } | Self::Created { document_id, .. } => document_id,
		}
	}

	pub fn title(&self) -> &str {
		match self {
			Self::Existing { title, .. } | Self::Created { title, .. } => title,
		}
	}

	pub fn already_existed(&self) -> bool {
		matches!(self, Self::Existing { .. })
	}
}

/// Drives the materialisation pipeline.
pub struct Materialiser {
	store: Store,
	vcs_factory: Arc<dyn VcsFactory>,
	craft_factory: Arc<dyn CraftFactory>,
	oracle: Arc<dyn OracleApi>,
}

impl Materialiser {
	pub fn new(
		store: Store,
		vcs_factory: Arc<dyn VcsFactory>,
		craft_factory: Arc<dyn CraftFactory>,
		oracle: Arc<dyn OracleApi>,
	) -> Self {
		Self {
			store,
			vcs_factory,
			craft_factory,
			oracle,
		}
	}

	/// Materialises the brain for one repository, or short-circuits when
	/// it already exists.
	pub async fn analyse(&self, req: MaterialiseRequest) -> Result<MaterialiseResult, SyncError> {
		let title = req.repo_key.document_title();

		// Idempotence gate: the store first, then the workspace itself.
		if let Some(record) = self.store.get(&req.repo_key)
			&& let Some(document_id) = record.document_id.clone()
		{
			return Ok(MaterialiseResult::Existing {
				document_id,
				title: record.document_title,
			});
		}

		let craft = self.craft_factory.client(&req.workspace_endpoint)?;
		if let Some(doc) = craft.document_exists(&title).await?.found() {
			tracing::info!(repo = %req.repo_key, document = %doc.id, "document already in workspace, hydrating record");
			let record = self.base_record(&req, Some(doc.id.clone()), None, 0.0);
			self.store.put(record)?;
			return Ok(MaterialiseResult::Existing {
				document_id: doc.id.clone(),
				title: doc.title.clone(),
			});
		}

		let vcs = self.vcs_factory.client(&req.credential)?;
		let signals = gather_signals(&*vcs, &req.repo_key, &req.branch).await;

		let analysis = match self.oracle.analyse_repository(&signals).await {
			Ok(analysis) => analysis,
			Err(err) => {
				tracing::warn!(repo = %req.repo_key, error = %err, "oracle failed, using skeleton analysis");
				skeleton_analysis(&req.repo_key)
			}
		};

		let document_id = craft.create_document(&title).await?;
		tracing::info!(repo = %req.repo_key, document = %document_id, "created root document");

		// The document now exists remotely; persist progress before any
		// fallible step so a retry short-circuits instead of re-creating.
		let partial = self.base_record(&req, Some(document_id.clone()), None, analysis.confidence);
		self.store.put(partial)?;

		self.seed_document(&*craft, &req.repo_key, &document_id, &analysis)
			.await?;

		let collection_ids = self
			.create_collections(&*craft, &document_id, &analysis)
			.await?;

		let record = self.base_record(
			&req,
			Some(document_id.clone()),
			Some(collection_ids.clone()),
			analysis.confidence,
		);
		self.store.put(record)?;

		Ok(MaterialiseResult::Created {
			document_id,
			title,
			collection_ids,
			confidence: analysis.confidence,
			tech_stack: analysis.technical_stack.flattened(),
		})
	}

	async fn seed_document(
		&self,
		craft: &dyn CraftApi,
		repo_key: &RepoKey,
		document_id: &str,
		analysis: &RepoAnalysis,
	) -> Result<(), SyncError> {
		craft
			.append_markdown(
				document_id,
				&markdown::main_page(repo_key, analysis),
				Position::Start,
			)
			.await?;
		craft
			.append_markdown(document_id, &markdown::tech_spec(analysis), Position::End)
			.await?;
		Ok(())
	}

	async fn create_collections(
		&self,
		craft: &dyn CraftApi,
		document_id: &str,
		analysis: &RepoAnalysis,
	) -> Result<CollectionIds, SyncError> {
		let now = Utc::now();

		let release_notes = craft
			.create_collection(document_id, "release_notes", &collections::release_notes_schema())
			.await?;
		let adrs = craft
			.create_collection(document_id, "adrs", &collections::adrs_schema())
			.await?;
		let engineering_tasks = craft
			.create_collection(
				document_id,
				"engineering_tasks",
				&collections::engineering_tasks_schema(),
			)
			.await?;
		let doc_history = craft
			.create_collection(document_id, "doc_history", &collections::doc_history_schema())
			.await?;

		craft
			.add_collection_items(&release_notes, &collections::seed_release_notes(analysis, now))
			.await?;
		craft
			.add_collection_items(&adrs, &collections::seed_adrs(analysis, now))
			.await?;
		craft
			.add_collection_items(
				&engineering_tasks,
				&collections::seed_engineering_tasks(analysis, now),
			)
			.await?;
		craft
			.add_collection_items(&doc_history, &collections::seed_doc_history(analysis, now))
			.await?;

		Ok(CollectionIds {
			release_notes,
			adrs,
			engineering_tasks,
			doc_history,
		})
	}

	fn base_record(
		&self,
		req: &MaterialiseRequest,
		document_id: Option<String>,
		collection_ids: Option<CollectionIds>,
		confidence: f64,
	) -> ConnectionRecord {
		let now = Utc::now();
		ConnectionRecord {
			repo_key: req.repo_key.clone(),
			credential: req.credential.clone(),
			workspace_endpoint: req.workspace_endpoint.clone(),
			document_id,
			document_title: req.repo_key.document_title(),
			collection_ids,
			owner_user: req.owner_user.clone(),
			connected_at: now,
			last_updated_at: now,
			last_synced_at: None,
			last_processed_pr: None,
			auto_sync_enabled: true,
			confidence,
		}
	}
}

/// Gathers repository signals best-effort; every failed call degrades to
/// an empty value with a warning, never a fatal error.
pub(crate) async fn gather_signals(
	vcs: &dyn VcsApi,
	repo_key: &RepoKey,
	branch: &str,
) -> RepoSignals {
	let owner = repo_key.owner();
	let name = repo_key.name();
	let mut signals = RepoSignals::default();

	match vcs.list_tree(owner, name, branch).await {
		Ok(tree) => signals.file_tree = tree,
		Err(err) => tracing::warn!(repo = %repo_key, error = %err, "tree listing failed"),
	}
	match vcs.get_readme(owner, name).await {
		Ok(readme) => signals.readme = readme,
		Err(err) => tracing::warn!(repo = %repo_key, error = %err, "readme fetch failed"),
	}
	match vcs.get_package_manifests(owner, name).await {
		Ok(manifests) => signals.package_manifests = manifests,
		Err(err) => tracing::warn!(repo = %repo_key, error = %err, "manifest probe failed"),
	}
	match vcs.get_languages(owner, name).await {
		Ok(languages) => signals.languages = languages,
		Err(err) => tracing::warn!(repo = %repo_key, error = %err, "language listing failed"),
	}
	match vcs.list_open_issues(owner, name).await {
		Ok(issues) => signals.open_issues = issues,
		Err(err) => tracing::warn!(repo = %repo_key, error = %err, "issue listing failed"),
	}
	signals
}

/// Low-confidence analysis used when the oracle is unavailable.
fn skeleton_analysis(repo_key: &RepoKey) -> RepoAnalysis {
	let mut analysis = RepoAnalysis {
		confidence: FALLBACK_CONFIDENCE,
		..Default::default()
	};
	analysis.overview.project_name = repo_key.name().to_string();
	analysis.overview.description =
		"Automatic analysis was unavailable; this brain was seeded from a skeleton.".to_string();
	analysis.architecture.pattern = "Unknown".to_string();
	analysis.open_questions = vec![
		"What architectural pattern does this repository follow?".to_string(),
		"Which modules form the public surface?".to_string(),
	];
	analysis.engineering_tasks = vec![engram_proto::EngineeringTask {
		task: "Re-run repository analysis once the oracle is reachable".to_string(),
		priority: engram_proto::TaskPriority::High,
		category: "Documentation".to_string(),
		reasoning: "The initial analysis fell back to a skeleton".to_string(),
	}];
	analysis
}
