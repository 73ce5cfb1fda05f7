//! Change-processor promotion scenarios.

use std::sync::Arc;

use engram_proto::{ChangeAnalysis, ChangeType, CommitSignificance, ImpactLevel};

use super::mocks::{MockCraft, MockOracle, MockVcs, commit, connected_record, temp_store};
use crate::changes::ChangeProcessor;

struct Fixture {
	craft: Arc<MockCraft>,
	vcs: Arc<MockVcs>,
	oracle: Arc<MockOracle>,
	store: engram_store::Store,
	processor: ChangeProcessor,
	_dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
	let craft = Arc::new(MockCraft::default());
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

#[tokio::test(flavor = "current_thread")]
async fn major_breaking_pr_promotes_everywhere() {
	let fx = fixture();
	fx.vcs.push_pr(43, "Rework auth API");
	fx.oracle.pr_analyses.lock().insert(
		43,
		ChangeAnalysis {
			change_type: ChangeType::Feature,
			impact_level: ImpactLevel::Major,
			public_api_changes: true,
			breaking_changes: true,
			requires_adr: true,
			summary: "Auth is now token-based".to_string(),
			follow_up_tasks: vec!["migrate clients".to_string()],
			confidence: 0.9,
			..Default::default()
		},
	);

	let conn = connected_record("octocat/hello");
	fx.processor
		.on_pull_request(&*fx.vcs, &*fx.craft, &fx.store, &conn, 43)
		.await
		.expect("process");

	let history = fx.craft.items_for("col-hist");
	assert_eq!(history.len(), 1);
	assert_eq!(history[0]["event"], "PR #43 Merged: Rework auth API");
	assert_eq!(history[0]["confidence"], "90%");

	let notes = fx.craft.items_for("col-rn");
	assert_eq!(notes.len(), 1);
	let version = notes[0]["version"].as_str().expect("version");
	// Major: v{YYYY}.{MM}.0
	let now = chrono::Utc::now();
	assert_eq!(version, format!("v{}.0", now.format("%Y.%m")));

	let adrs = fx.craft.items_for("col-adr");
	assert_eq!(adrs.len(), 1);
	let adr_id = adrs[0]["adr_id"].as_str().expect("adr id");
	assert!(adr_id.starts_with("ADR-") && adr_id.len() == 8);

	let tasks = fx.craft.items_for("col-task");
	assert_eq!(tasks.len(), 1);
	assert_eq!(tasks[0]["task"], "migrate clients");
	assert_eq!(tasks[0]["priority"], "Medium");
	assert_eq!(tasks[0]["category"], "From PR#43");

	// Breaking-changes and API-changes blocks were appended.
	let appended = fx.craft.appended.lock().join("\n");
	assert!(appended.contains("Breaking Changes"));
	assert!(appended.contains("API Changes"));
}

#[tokio::test(flavor = "current_thread")]
async fn patch_pr_records_history_only() {
	let fx = fixture();
	fx.vcs.push_pr(50, "Fix typo");
	fx.oracle.pr_analyses.lock().insert(
		50,
		ChangeAnalysis {
			change_type: ChangeType::Docs,
			impact_level: ImpactLevel::Patch,
			summary: "typo".to_string(),
			confidence: 0.7,
			..Default::default()
		},
	);

	let conn = connected_record("octocat/hello");
	fx.processor
		.on_pull_request(&*fx.vcs, &*fx.craft, &fx.store, &conn, 50)
		.await
		.expect("process");

	assert_eq!(fx.craft.items_for("col-hist").len(), 1);
	assert!(fx.craft.items_for("col-rn").is_empty());
	assert!(fx.craft.items_for("col-adr").is_empty());
	assert!(fx.craft.items_for("col-task").is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn oracle_failure_degrades_to_advisory_entry() {
	let fx = fixture();
	fx.vcs.push_pr(51, "Mystery change");
	*fx.oracle.fail_pr_analysis.lock() = true;

	let conn = connected_record("octocat/hello");
	fx.processor
		.on_pull_request(&*fx.vcs, &*fx.craft, &fx.store, &conn, 51)
		.await
		.expect("process");

	// History records the merge at zero confidence, nothing is promoted.
	let history = fx.craft.items_for("col-hist");
	assert_eq!(history.len(), 1);
	assert_eq!(history[0]["confidence"], "0%");
	assert!(fx.craft.items_for("col-rn").is_empty());
	assert!(fx.craft.count("update_main_document") == 0);
}

#[tokio::test(flavor = "current_thread")]
async fn architecture_changes_regenerate_the_section() {
	let fx = fixture();
	fx.vcs.push_pr(52, "Split the monolith");
	fx.oracle.pr_analyses.lock().insert(
		52,
		ChangeAnalysis {
			change_type: ChangeType::Architecture,
			impact_level: ImpactLevel::Minor,
			architecture_changes: Some("Now two services".to_string()),
			new_technologies: vec!["NATS".to_string()],
			summary: "split".to_string(),
			confidence: 0.8,
			..Default::default()
		},
	);

	let conn = connected_record("octocat/hello");
	fx.processor
		.on_pull_request(&*fx.vcs, &*fx.craft, &fx.store, &conn, 52)
		.await
		.expect("process");

	let ops = fx.craft.ops();
	assert!(ops.contains(&"regenerate_section"));
	// Tech-stack upsert went through the targeted-update path.
	let sections: Vec<String> = fx
		.craft
		.calls
		.lock()
		.iter()
		.filter(|c| c.op == "update_main_document")
		.map(|c| c.detail.clone())
		.collect();
	assert!(sections.contains(&"Tech Stack".to_string()));
}

#[tokio::test(flavor = "current_thread")]
async fn insignificant_commits_record_nothing() {
	let fx = fixture();
	*fx.oracle.significance.lock() = Ok(CommitSignificance {
		is_significant: false,
		..Default::default()
	});

	let conn = connected_record("octocat/hello");
	let commits = vec![commit("abc123", "tweak", 10)];
	let result = fx
		.processor
		.on_commits(&*fx.craft, &fx.store, &conn, &commits, &[])
		.await
		.expect("process");

	assert!(result.is_none());
	assert!(fx.craft.calls.lock().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn significant_major_commits_promote_a_release_note() {
	let fx = fixture();
	*fx.oracle.significance.lock() = Ok(CommitSignificance {
		is_significant: true,
		change_type: ChangeType::Feature,
		impact_level: ImpactLevel::Major,
		summary: "big direct change".to_string(),
		suggested_tasks: vec!["document the change".to_string()],
		confidence: 0.75,
	});

	let conn = connected_record("octocat/hello");
	let commits = vec![commit("abc123", "feat: new engine", 10)];
	let result = fx
		.processor
		.on_commits(&*fx.craft, &fx.store, &conn, &commits, &[])
		.await
		.expect("process")
		.expect("significant");

	assert!(result.is_significant);
	assert_eq!(fx.craft.items_for("col-hist").len(), 1);
	assert_eq!(fx.craft.items_for("col-rn").len(), 1);
	assert_eq!(fx.craft.items_for("col-task").len(), 1);
	// The commit block landed on the main page.
	let appended = fx.craft.appended.lock().join("\n");
	assert!(appended.contains("abc123"));
}
