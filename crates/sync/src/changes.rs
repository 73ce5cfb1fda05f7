//! Turning classified changes into targeted workspace mutations.
//!
//! Each entry point performs one oracle classification, then a fan-out of
//! independent best-effort mutations: a failed collection insert or block
//! update logs and moves on, and only a failure to fetch the change
//! itself aborts the unit (which keeps the cursor from advancing past
//! it). Oracle failures degrade the unit to advisory-only: the history
//! trail still records the event at zero confidence, but nothing is
//! promoted.

use std::sync::Arc;

use chrono::Utc;
use engram_craft::MainDocumentUpdate;
use engram_github::{CommitInfo, FileChange};
use engram_proto::{
	ChangeAnalysis, CollectionIds, CommitSignificance, ConnectionRecord, ImpactLevel,
	SyncHistoryEntry, SyncType,
};
use engram_store::Store;

use crate::clients::{CraftApi, OracleApi, VcsApi};
use crate::collections;
use crate::error::SyncError;
use crate::markdown;

/// Applies pull-request and commit changes to the remote brain.
pub struct ChangeProcessor {
	oracle: Arc<dyn OracleApi>,
}

impl ChangeProcessor {
	pub fn new(oracle: Arc<dyn OracleApi>) -> Self {
		Self { oracle }
	}

	/// Processes one merged pull request.
	///
	/// Fetching the PR is the only fatal step; everything downstream is
	/// best-effort.
	pub async fn on_pull_request(
		&self,
		vcs: &dyn VcsApi,
		craft: &dyn CraftApi,
		store: &Store,
		conn: &ConnectionRecord,
		pr_number: u64,
	) -> Result<(), SyncError> {
		let owner = conn.repo_key.owner();
		let name = conn.repo_key.name();
		let pr = vcs.get_pr(owner, name, pr_number).await?;

		let (analysis, advisory) = match self.oracle.analyse_pr(&pr).await {
			Ok(analysis) => (analysis, false),
			Err(err) => {
				tracing::warn!(repo = %conn.repo_key, pr = pr_number, error = %err, "oracle failed, recording advisory entry only");
				(ChangeAnalysis::default(), true)
			}
		};

		let (Some(document_id), Some(ids)) = (&conn.document_id, &conn.collection_ids) else {
			tracing::warn!(repo = %conn.repo_key, pr = pr_number, "connection not fully materialised, skipping mutations");
			return Ok(());
		};

		let now = Utc::now();
		let history_item = collections::doc_history_item(
			&format!("PR #{pr_number} Merged: {}", pr.title),
			&analysis.summary,
			Some(pr_number),
			analysis.confidence,
			now,
		);
		self.add_items(craft, &ids.doc_history, &[history_item], "doc_history")
			.await;

		if !advisory {
			self.promote(craft, conn, ids, document_id, &pr.title, pr_number, &analysis, now)
				.await;
		}

		let history = SyncHistoryEntry {
			repo_key: conn.repo_key.clone(),
			pr_number: Some(pr_number),
			commit_sha: None,
			sync_type: SyncType::Pr,
			is_significant: !advisory,
			change_type: analysis.change_type.as_str().to_string(),
			summary: analysis.summary.clone(),
			synced_at: now,
		};
		if let Err(err) = store.record_history(&history) {
			tracing::warn!(repo = %conn.repo_key, error = %err, "history append failed");
		}

		Ok(())
	}

	/// Applies the promotion rules and main-document mutations for one
	/// classified pull request.
	#[allow(clippy::too_many_arguments)]
	async fn promote(
		&self,
		craft: &dyn CraftApi,
		conn: &ConnectionRecord,
		ids: &CollectionIds,
		document_id: &str,
		pr_title: &str,
		pr_number: u64,
		analysis: &ChangeAnalysis,
		now: chrono::DateTime<Utc>,
	) {
		if analysis.release_note_worthy() {
			let item = collections::release_note_item(pr_title, analysis, pr_number, now);
			self.add_items(craft, &ids.release_notes, &[item], "release_notes")
				.await;
		}

		if analysis.requires_adr {
			let decision = analysis
				.architecture_changes
				.clone()
				.unwrap_or_else(|| analysis.summary.clone());
			let item = collections::adr_item(
				&format!("ADR: {pr_title}"),
				&analysis.summary,
				&decision,
				analysis.confidence,
				now,
			);
			self.add_items(craft, &ids.adrs, &[item], "adrs").await;
		}

		if !analysis.follow_up_tasks.is_empty() {
			let items: Vec<_> = analysis
				.follow_up_tasks
				.iter()
				.map(|task| {
					collections::engineering_task_item(
						task,
						"Medium",
						&format!("From PR#{pr_number}"),
						&analysis.summary,
						now,
					)
				})
				.collect();
			self.add_items(craft, &ids.engineering_tasks, &items, "engineering_tasks")
				.await;
		}

		if !analysis.new_technologies.is_empty() {
			let update = MainDocumentUpdate::new(document_id)
				.section("Tech Stack")
				.content(markdown::tech_stack_section(&[], &analysis.new_technologies));
			if let Err(err) = craft.update_main_document(&update).await {
				tracing::warn!(repo = %conn.repo_key, error = %err, "tech-stack upsert failed");
			}
		}

		if let Some(arch) = &analysis.architecture_changes {
			let body = format!("## Architecture\n\n{arch}\n");
			if let Err(err) = craft.regenerate_section(document_id, "Architecture", &body).await {
				tracing::warn!(repo = %conn.repo_key, error = %err, "architecture regeneration failed");
			}
		}

		if analysis.public_api_changes {
			let block = markdown::api_changes_block(pr_number, &analysis.summary, now);
			if let Err(err) = craft
				.append_markdown(document_id, &block, engram_craft::Position::End)
				.await
			{
				tracing::warn!(repo = %conn.repo_key, error = %err, "api-changes append failed");
			}
		}

		if analysis.breaking_changes {
			let block = markdown::breaking_changes_block(pr_number, &analysis.summary, now);
			if let Err(err) = craft
				.append_markdown(document_id, &block, engram_craft::Position::End)
				.await
			{
				tracing::warn!(repo = %conn.repo_key, error = %err, "breaking-changes append failed");
			}
		}

		let log = MainDocumentUpdate::new(document_id)
			.delete_matching("Last updated from PR")
			.content(markdown::update_log_line(pr_number, now));
		if let Err(err) = craft.update_main_document(&log).await {
			tracing::warn!(repo = %conn.repo_key, error = %err, "update-log write failed");
		}
	}

	/// Processes a batch of direct-branch commits, ascending by date.
	///
	/// The oracle's significance verdict is the sole gate: an
	/// insignificant batch records nothing at all.
	pub async fn on_commits(
		&self,
		craft: &dyn CraftApi,
		store: &Store,
		conn: &ConnectionRecord,
		commits: &[CommitInfo],
		newest_files: &[FileChange],
	) -> Result<Option<CommitSignificance>, SyncError> {
		if commits.is_empty() {
			return Ok(None);
		}

		let significance = match self.oracle.analyse_commits(commits, newest_files).await {
			Ok(significance) => significance,
			Err(err) => {
				tracing::warn!(repo = %conn.repo_key, error = %err, "oracle failed, treating commit batch as insignificant");
				return Ok(None);
			}
		};
		if !significance.is_significant {
			return Ok(None);
		}

		let (Some(document_id), Some(ids)) = (&conn.document_id, &conn.collection_ids) else {
			tracing::warn!(repo = %conn.repo_key, "connection not fully materialised, skipping commit mutations");
			return Ok(Some(significance));
		};

		let now = Utc::now();
		let newest = commits.last();

		let history_item = collections::doc_history_item(
			&format!("{} direct commits to main", commits.len()),
			&significance.summary,
			None,
			significance.confidence,
			now,
		);
		self.add_items(craft, &ids.doc_history, &[history_item], "doc_history")
			.await;

		if significance.impact_level == ImpactLevel::Major {
			let analysis = ChangeAnalysis {
				change_type: significance.change_type,
				impact_level: significance.impact_level,
				summary: significance.summary.clone(),
				confidence: significance.confidence,
				..Default::default()
			};
			let title = newest
				.map(|c| c.message.lines().next().unwrap_or("Direct commits").to_string())
				.unwrap_or_else(|| "Direct commits".to_string());
			let item = collections::release_note_item(&title, &analysis, 0, now);
			self.add_items(craft, &ids.release_notes, &[item], "release_notes")
				.await;
		}

		if !significance.suggested_tasks.is_empty() {
			let items: Vec<_> = significance
				.suggested_tasks
				.iter()
				.map(|task| {
					collections::engineering_task_item(
						task,
						"Medium",
						"From direct commits",
						&significance.summary,
						now,
					)
				})
				.collect();
			self.add_items(craft, &ids.engineering_tasks, &items, "engineering_tasks")
				.await;
		}

		let block = markdown::commit_block(&significance, commits, now);
		if let Err(err) = craft
			.append_markdown(document_id, &block, engram_craft::Position::End)
			.await
		{
			tracing::warn!(repo = %conn.repo_key, error = %err, "commit block append failed");
		}

		let history = SyncHistoryEntry {
			repo_key: conn.repo_key.clone(),
			pr_number: None,
			commit_sha: newest.map(|c| c.sha.clone()),
			sync_type: SyncType::Commit,
			is_significant: true,
			change_type: significance.change_type.as_str().to_string(),
			summary: significance.summary.clone(),
			synced_at: now,
		};
		if let Err(err) = store.record_history(&history) {
			tracing::warn!(repo = %conn.repo_key, error = %err, "history append failed");
		}

		Ok(Some(significance))
	}

	async fn add_items(
		&self,
		craft: &dyn CraftApi,
		collection_id: &str,
		items: &[serde_json::Value],
		collection: &str,
	) {
		if let Err(err) = craft.add_collection_items(collection_id, items).await {
			tracing::warn!(collection, error = %err, "collection insert failed");
		}
	}
}
