//! Scheduler and cycle scenarios.

use std::sync::Arc;
use std::time::Duration;

use engram_proto::{ChangeAnalysis, ChangeType, CommitSignificance, ImpactLevel, RepoKey};
use tokio_util::sync::CancellationToken;

use super::mocks::{
	FixedCraftFactory, FixedVcsFactory, MockCraft, MockOracle, MockVcs, commit, connected_record,
	temp_store,
};
use crate::changes::ChangeProcessor;
use crate::engine::{EngineConfig, SyncService, run_cycle};

struct Fixture {
	craft: Arc<MockCraft>,
	vcs: Arc<MockVcs>,
	oracle: Arc<MockOracle>,
	store: engram_store::Store,
	processor: ChangeProcessor,
	_dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
	let craft = Arc::new(MockCraft::with_document("octocat-hello-docs"));
	let vcs = Arc::new(MockVcs::default());
	let oracle = Arc::new(MockOracle::default());
	let (store, dir) = temp_store();
	let processor = ChangeProcessor::new(oracle.clone());
	Fixture {
		craft,
		vcs,
		oracle,
		store,
		processor,
		_dir: dir,
	}
}

fn key() -> RepoKey {
	RepoKey::parse("octocat/hello").expect("key")
}

impl Fixture {
	async fn cycle(&self) -> Result<crate::CycleReport, crate::SyncError> {
		self.cycle_with(&CancellationToken::new()).await
	}

	async fn cycle_with(
		&self,
		shutdown: &CancellationToken,
	) -> Result<crate::CycleReport, crate::SyncError> {
		run_cycle(
			&self.store,
			&FixedVcsFactory(self.vcs.clone()),
			&FixedCraftFactory(self.craft.clone()),
			&self.processor,
			&key(),
			shutdown,
		)
		.await
	}
}

#[tokio::test(flavor = "current_thread")]
async fn pr_sweep_processes_ascending_and_advances_cursor() {
	let fx = fixture();
	let mut record = connected_record("octocat/hello");
	record.last_processed_pr = Some(41);
	fx.store.put(record).expect("put");

	fx.vcs.push_pr(44, "third");
	fx.vcs.push_pr(42, "first");
	fx.vcs.push_pr(43, "second");
	fx.oracle.pr_analyses.lock().insert(
		43,
		ChangeAnalysis {
			change_type: ChangeType::Feature,
			impact_level: ImpactLevel::Major,
			public_api_changes: true,
			breaking_changes: true,
			requires_adr: true,
			follow_up_tasks: vec!["migrate clients".to_string()],
			summary: "major rework".to_string(),
			confidence: 0.9,
			..Default::default()
		},
	);

	let report = fx.cycle().await.expect("cycle");
	assert_eq!(report.prs, vec![42, 43, 44]);

	// PR 43 promoted everywhere; 42 and 44 are history-only defaults.
	assert_eq!(fx.craft.items_for("col-hist").len(), 3);
	assert_eq!(fx.craft.items_for("col-rn").len(), 1);
	assert_eq!(fx.craft.items_for("col-adr").len(), 1);
	assert_eq!(fx.craft.items_for("col-task").len(), 1);

	let record = fx.store.get(&key()).expect("record");
	assert_eq!(record.last_processed_pr, Some(44));
	assert!(record.last_synced_at.is_some());
}

#[tokio::test(flavor = "current_thread")]
async fn failed_pr_stops_the_sweep_short() {
	let fx = fixture();
	let mut record = connected_record("octocat/hello");
	record.last_processed_pr = Some(41);
	fx.store.put(record).expect("put");

	fx.vcs.push_pr(42, "ok");
	fx.vcs.push_pr(43, "broken");
	fx.vcs.push_pr(44, "never reached");
	*fx.vcs.fail_pr.lock() = Some(43);

	let report = fx.cycle().await.expect("cycle");
	assert_eq!(report.prs, vec![42]);

	let record = fx.store.get(&key()).expect("record");
	// The cursor stops at the last fully-processed PR...
	assert_eq!(record.last_processed_pr, Some(42));
	// ...and the failed sweep does not stamp the cycle complete.
	assert!(record.last_synced_at.is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn empty_sweep_still_stamps_the_cycle() {
	let fx = fixture();
	let mut record = connected_record("octocat/hello");
	record.last_processed_pr = Some(41);
	fx.store.put(record).expect("put");

	let report = fx.cycle().await.expect("cycle");
	assert!(report.prs.is_empty());

	let record = fx.store.get(&key()).expect("record");
	assert_eq!(record.last_processed_pr, Some(41));
	assert!(record.last_synced_at.is_some());
}

#[tokio::test(flavor = "current_thread")]
async fn first_commit_sweep_is_skipped() {
	let fx = fixture();
	let record = connected_record("octocat/hello");
	assert!(record.last_synced_at.is_none());
	fx.store.put(record).expect("put");

	for i in 0..12 {
		fx.vcs
			.commits
			.lock()
			.push(commit(&format!("sha{i}"), "direct work", i * 10));
	}

	let report = fx.cycle().await.expect("cycle");
	assert!(report.commits.is_empty());
	// No commit-path oracle call at all.
	assert!(!fx.oracle.calls.lock().contains(&"analyse_commits"));

	// The baseline is now stamped, so the next cycle sweeps only newer
	// commits.
	let record = fx.store.get(&key()).expect("record");
	assert!(record.last_synced_at.is_some());
	assert_eq!(record.last_processed_pr, None);

	let report = fx.cycle().await.expect("second cycle");
	assert!(report.commits.is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn commit_sweep_filters_merges_and_caps_the_batch() {
	let fx = fixture();
	let mut record = connected_record("octocat/hello");
	record.last_synced_at = Some(chrono::Utc::now() - chrono::Duration::hours(2));
	fx.store.put(record).expect("put");

	*fx.oracle.significance.lock() = Ok(CommitSignificance {
		is_significant: true,
		change_type: ChangeType::Refactor,
		impact_level: ImpactLevel::Minor,
		summary: "direct work".to_string(),
		suggested_tasks: Vec::new(),
		confidence: 0.6,
	});

	{
		let mut commits = fx.vcs.commits.lock();
		for i in 0..14 {
			commits.push(commit(&format!("sha{i}"), "direct work", i));
		}
		commits.push(commit("merge1", "Merge pull request #9", 3));
	}

	let report = fx.cycle().await.expect("cycle");
	// Capped at ten, merge commits excluded.
	assert_eq!(report.commits.len(), 10);
	assert!(!report.commits.contains(&"merge1".to_string()));
}

#[tokio::test(flavor = "current_thread")]
async fn absent_remote_document_removes_the_connection() {
	let fx = fixture();
	fx.craft.documents.lock().clear();
	fx.store.put(connected_record("octocat/hello")).expect("put");
	fx.vcs.push_pr(42, "pending");

	let report = fx.cycle().await.expect("cycle");
	assert!(report.removed);
	assert!(fx.store.get(&key()).is_none());
	// Exactly one action: the probe. No provider calls at all.
	assert_eq!(fx.vcs.call_count(), 0);
	assert_eq!(fx.craft.ops(), vec!["document_exists"]);
}

#[tokio::test(flavor = "current_thread")]
async fn unreachable_workspace_is_not_treated_as_deletion() {
	let fx = fixture();
	let mut record = connected_record("octocat/hello");
	record.last_processed_pr = Some(41);
	fx.store.put(record).expect("put");
	*fx.craft.fail_probe.lock() = true;

	let err = fx.cycle().await.expect_err("probe failure");
	assert!(matches!(err, crate::SyncError::Craft(_)));

	// The record survives and the cursor is untouched.
	let record = fx.store.get(&key()).expect("record kept");
	assert_eq!(record.last_processed_pr, Some(41));
	assert!(record.last_synced_at.is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn cancelled_cycle_does_not_stamp_completion() {
	let fx = fixture();
	let mut record = connected_record("octocat/hello");
	record.last_processed_pr = Some(41);
	fx.store.put(record).expect("put");
	fx.vcs.push_pr(42, "never processed");

	let shutdown = CancellationToken::new();
	shutdown.cancel();
	let report = fx.cycle_with(&shutdown).await.expect("cycle");

	assert!(report.prs.is_empty());
	let record = fx.store.get(&key()).expect("record");
	assert_eq!(record.last_processed_pr, Some(41));
	assert!(record.last_synced_at.is_none());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn service_serialises_cycles_per_key() {
	let fx = fixture();
	fx.store.put(connected_record("octocat/hello")).expect("put");

	let shutdown = CancellationToken::new();
	let handle = SyncService::start(
		fx.store.clone(),
		Arc::new(FixedVcsFactory(fx.vcs.clone())),
		Arc::new(FixedCraftFactory(fx.craft.clone())),
		fx.oracle.clone(),
		EngineConfig {
			period: Duration::from_secs(300),
			min_interval: Duration::from_secs(120),
			workers: 4,
		},
		shutdown.clone(),
	);

	// Two manual triggers racing the scheduled first cycle: per-key
	// serialisation must keep overlap at one.
	let (a, b) = tokio::join!(
		handle.trigger_one(key()),
		handle.trigger_one(key()),
	);
	a.expect("first trigger");
	b.expect("second trigger");

	assert!(fx.craft.max_live_calls.load(std::sync::atomic::Ordering::SeqCst) <= 1);
	shutdown.cancel();
}

#[tokio::test(flavor = "current_thread")]
async fn trigger_for_unknown_connection_fails() {
	let fx = fixture();
	let shutdown = CancellationToken::new();
	let handle = SyncService::start(
		fx.store.clone(),
		Arc::new(FixedVcsFactory(fx.vcs.clone())),
		Arc::new(FixedCraftFactory(fx.craft.clone())),
		fx.oracle.clone(),
		EngineConfig::default(),
		shutdown.clone(),
	);

	let err = handle.trigger_one(key()).await.expect_err("unknown");
	assert!(err.to_string().contains("unknown connection"));
	shutdown.cancel();
}
