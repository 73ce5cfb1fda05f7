//! The sync scheduler.
//!
//! A single actor owns all scheduling state: which connections have a
//! cycle in flight, when each connection last started one, and which
//! manual triggers are queued behind a running cycle. Cycles execute on a
//! bounded worker pool; per-key serialisation is absolute (a repository
//! never has two concurrent cycles), and cancellation is cooperative:
//! checked between pull requests and between commit batches, never
//! inside a workspace mutation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use engram_craft::DocumentProbe;
use engram_proto::RepoKey;
use engram_store::{CursorUpdate, Store, StoreError};
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::changes::ChangeProcessor;
use crate::clients::{CraftApi, CraftFactory, OracleApi, VcsApi, VcsFactory};
use crate::error::SyncError;

/// Most direct commits processed per cycle.
const COMMIT_BATCH_LIMIT: usize = 10;

/// Branch swept for direct commits.
const SWEEP_BRANCH: &str = "main";

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Cycle cadence; the first cycle runs immediately on start.
	pub period: Duration,
	/// Minimum gap between two cycle starts for one connection.
	pub min_interval: Duration,
	/// Worker-pool size for concurrent per-connection cycles.
	pub workers: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			period: Duration::from_secs(300),
			min_interval: Duration::from_secs(120),
			workers: 4,
		}
	}
}

/// What one cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
	/// The connection was deleted because its remote document is gone.
	pub removed: bool,
	/// PR numbers fully processed, ascending.
	pub prs: Vec<u64>,
	/// Shas of direct commits processed.
	pub commits: Vec<String>,
}

/// Snapshot for the status endpoint.
#[derive(Debug, Clone)]
pub struct SyncStatus {
	pub is_running: bool,
	pub connected_repos: usize,
	pub sync_interval: Duration,
	/// Last completed sync per repository, epoch milliseconds.
	pub last_sync_times: HashMap<String, i64>,
}

enum SyncCmd {
	TriggerOne {
		repo_key: RepoKey,
		reply: oneshot::Sender<Result<CycleReport, String>>,
	},
	Status {
		reply: oneshot::Sender<SyncStatus>,
	},
	CycleDone {
		repo_key: RepoKey,
	},
}

/// Handle for communicating with the [`SyncService`].
#[derive(Clone)]
pub struct SyncHandle {
	tx: mpsc::Sender<SyncCmd>,
}

impl SyncHandle {
	/// Forces a cycle for one connection, out of schedule. Queued behind
	/// any cycle already in flight for the same key.
	pub async fn trigger_one(&self, repo_key: RepoKey) -> Result<CycleReport, SyncError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(SyncCmd::TriggerOne { repo_key, reply })
			.await
			.map_err(|_| SyncError::Cycle("sync service stopped".to_string()))?;
		rx.await
			.map_err(|_| SyncError::Cycle("sync service stopped".to_string()))?
			.map_err(SyncError::Cycle)
	}

	/// Current scheduler status.
	pub async fn status(&self) -> Option<SyncStatus> {
		let (reply, rx) = oneshot::channel();
		self.tx.send(SyncCmd::Status { reply }).await.ok()?;
		rx.await.ok()
	}
}

/// Actor service driving periodic sync cycles.
pub struct SyncService {
	rx: mpsc::Receiver<SyncCmd>,
	tx: mpsc::Sender<SyncCmd>,
	store: Store,
	vcs_factory: Arc<dyn VcsFactory>,
	craft_factory: Arc<dyn CraftFactory>,
	processor: Arc<ChangeProcessor>,
	config: EngineConfig,
	shutdown: CancellationToken,
	workers: Arc<Semaphore>,
	in_flight: HashSet<RepoKey>,
	queued: HashMap<RepoKey, Vec<oneshot::Sender<Result<CycleReport, String>>>>,
	last_cycle_start: HashMap<RepoKey, Instant>,
}

impl SyncService {
	/// Spawns the scheduler actor.
	pub fn start(
		store: Store,
		vcs_factory: Arc<dyn VcsFactory>,
		craft_factory: Arc<dyn CraftFactory>,
		oracle: Arc<dyn OracleApi>,
		config: EngineConfig,
		shutdown: CancellationToken,
	) -> SyncHandle {
		let (tx, rx) = mpsc::channel(256);
		let workers = Arc::new(Semaphore::new(config.workers.max(1)));
		let service = Self {
			rx,
			tx: tx.clone(),
			store,
			vcs_factory,
			craft_factory,
			processor: Arc::new(ChangeProcessor::new(oracle)),
			config,
			shutdown,
			workers,
			in_flight: HashSet::new(),
			queued: HashMap::new(),
			last_cycle_start: HashMap::new(),
		};
		tokio::spawn(service.run());
		SyncHandle { tx }
	}

	async fn run(mut self) {
		let mut tick = tokio::time::interval(self.config.period);
		tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = self.shutdown.cancelled() => break,
				_ = tick.tick() => self.run_scheduled_cycles(),
				cmd = self.rx.recv() => match cmd {
					Some(cmd) => self.handle(cmd),
					None => break,
				},
			}
		}
		// In-flight cycles observe the token themselves and stop at the
		// next safe point, persisting their cursors on the way out.
		tracing::info!("sync scheduler stopped");
	}

	fn run_scheduled_cycles(&mut self) {
		for record in self.store.all() {
			if !record.auto_sync_enabled {
				continue;
			}
			let repo_key = record.repo_key.clone();
			if self.in_flight.contains(&repo_key) {
				continue;
			}
			if let Some(started) = self.last_cycle_start.get(&repo_key)
				&& started.elapsed() < self.config.min_interval
			{
				continue;
			}
			self.spawn_cycle(repo_key, Vec::new());
		}
	}

	fn handle(&mut self, cmd: SyncCmd) {
		match cmd {
			SyncCmd::TriggerOne { repo_key, reply } => {
				if self.store.get(&repo_key).is_none() {
					let _ = reply.send(Err(format!("unknown connection: {repo_key}")));
					return;
				}
				if self.in_flight.contains(&repo_key) {
					self.queued.entry(repo_key).or_default().push(reply);
				} else {
					self.spawn_cycle(repo_key, vec![reply]);
				}
			}
			SyncCmd::Status { reply } => {
				let records = self.store.all();
				let last_sync_times = records
					.iter()
					.filter_map(|r| {
						r.last_synced_at
							.map(|at| (r.repo_key.to_string(), at.timestamp_millis()))
					})
					.collect();
				let _ = reply.send(SyncStatus {
					is_running: !self.shutdown.is_cancelled(),
					connected_repos: records.len(),
					sync_interval: self.config.period,
					last_sync_times,
				});
			}
			SyncCmd::CycleDone { repo_key } => {
				self.in_flight.remove(&repo_key);
				if let Some(replies) = self.queued.remove(&repo_key)
					&& !self.shutdown.is_cancelled()
				{
					self.spawn_cycle(repo_key, replies);
				}
			}
		}
	}

	fn spawn_cycle(
		&mut self,
		repo_key: RepoKey,
		replies: Vec<oneshot::Sender<Result<CycleReport, String>>>,
	) {
		self.in_flight.insert(repo_key.clone());
		self.last_cycle_start.insert(repo_key.clone(), Instant::now());

		let store = self.store.clone();
		let vcs_factory = Arc::clone(&self.vcs_factory);
		let craft_factory = Arc::clone(&self.craft_factory);
		let processor = Arc::clone(&self.processor);
		let workers = Arc::clone(&self.workers);
		let shutdown = self.shutdown.clone();
		let done_tx = self.tx.clone();

		tokio::spawn(async move {
			let result = match workers.acquire_owned().await {
				Ok(_permit) => {
					run_cycle(
						&store,
						&*vcs_factory,
						&*craft_factory,
						&processor,
						&repo_key,
						&shutdown,
					)
					.await
				}
				Err(_) => Err(SyncError::Cycle("worker pool closed".to_string())),
			};

			match &result {
				Ok(report) => {
					tracing::debug!(
						repo = %repo_key,
						prs = report.prs.len(),
						commits = report.commits.len(),
						removed = report.removed,
						"cycle complete"
					);
					for reply in replies {
						let _ = reply.send(Ok(report.clone()));
					}
				}
				Err(err) => {
					tracing::warn!(repo = %repo_key, error = %err, "cycle failed");
					let message = err.to_string();
					for reply in replies {
						let _ = reply.send(Err(message.clone()));
					}
				}
			}
			let _ = done_tx.send(SyncCmd::CycleDone { repo_key }).await;
		});
	}
}

/// One per-connection sync cycle: reconcile, PR sweep, commit sweep,
/// cursor advance.
pub(crate) async fn run_cycle(
	store: &Store,
	vcs_factory: &dyn VcsFactory,
	craft_factory: &dyn CraftFactory,
	processor: &ChangeProcessor,
	repo_key: &RepoKey,
	shutdown: &CancellationToken,
) -> Result<CycleReport, SyncError> {
	let record = store
		.get(repo_key)
		.ok_or_else(|| SyncError::UnknownConnection(repo_key.to_string()))?;
	let owner = record.repo_key.owner().to_string();
	let name = record.repo_key.name().to_string();

	// Remote reconciliation. A missing document means the user deleted
	// the brain; drop the connection and do nothing else this cycle.
	let craft = craft_factory.client(&record.workspace_endpoint)?;
	if let DocumentProbe::Absent = craft.document_exists(&record.document_title).await? {
		tracing::info!(repo = %repo_key, "remote document gone, removing connection");
		store.delete(repo_key)?;
		return Ok(CycleReport {
			removed: true,
			..Default::default()
		});
	}

	let vcs = vcs_factory.client(&record.credential)?;
	let mut report = CycleReport::default();
	let mut cancelled = false;
	let mut clean = true;

	// PR sweep, strictly ascending. A failed PR stops the sweep so the
	// cursor never advances past it.
	let mut highest_pr = None;
	let prs = vcs
		.list_merged_prs_since(&owner, &name, record.last_processed_pr)
		.await?;
	for pr in &prs {
		if shutdown.is_cancelled() {
			cancelled = true;
			break;
		}
		match processor
			.on_pull_request(&*vcs, &*craft, store, &record, pr.number)
			.await
		{
			Ok(()) => {
				highest_pr = Some(pr.number);
				report.prs.push(pr.number);
			}
			Err(err) => {
				tracing::warn!(repo = %repo_key, pr = pr.number, error = %err, "pull request failed, stopping sweep");
				clean = false;
				break;
			}
		}
	}

	// Commit sweep. The first cycle has no baseline; skip it entirely
	// rather than replay the repository's history.
	if !cancelled && let Some(since) = record.last_synced_at {
		if shutdown.is_cancelled() {
			cancelled = true;
		} else {
			match sweep_commits(&*vcs, &*craft, processor, store, &record, &owner, &name, since)
				.await
			{
				Ok(shas) => report.commits = shas,
				Err(err) => {
					tracing::warn!(repo = %repo_key, error = %err, "commit sweep failed");
					clean = false;
				}
			}
		}
	}

	// Cursor advance. The PR floor moves up to the last fully-processed
	// number regardless; the sync instant moves only on a clean,
	// uncancelled pass.
	let update = CursorUpdate {
		last_processed_pr: highest_pr,
		last_synced_at: (!cancelled && clean).then(Utc::now),
	};
	match store.update_cursor(repo_key, update) {
		Ok(_) => {}
		Err(err @ StoreError::CursorRegression { .. }) => {
			// Monotonicity is load-bearing; continuing would rewrite
			// history on the remote brain.
			panic!("sync cursor invariant violated: {err}");
		}
		Err(err) => return Err(err.into()),
	}

	Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn sweep_commits(
	vcs: &dyn VcsApi,
	craft: &dyn CraftApi,
	processor: &ChangeProcessor,
	store: &Store,
	record: &engram_proto::ConnectionRecord,
	owner: &str,
	name: &str,
	since: chrono::DateTime<Utc>,
) -> Result<Vec<String>, SyncError> {
	let mut commits: Vec<_> = vcs
		.list_commits(owner, name, SWEEP_BRANCH, Some(since))
		.await?
		.into_iter()
		.filter(|c| !c.message.starts_with("Merge "))
		.collect();
	if commits.is_empty() {
		return Ok(Vec::new());
	}

	// Provider order is newest-first; process the newest batch in
	// ascending date order.
	commits.sort_by_key(|c| c.date);
	let start = commits.len().saturating_sub(COMMIT_BATCH_LIMIT);
	let batch = &commits[start..];

	let newest_files = match batch.last() {
		Some(newest) if newest.files.is_empty() => {
			match vcs.get_commit(owner, name, &newest.sha).await {
				Ok(full) => full.files,
				Err(err) => {
					tracing::warn!(sha = %newest.sha, error = %err, "commit detail fetch failed");
					Vec::new()
				}
			}
		}
		Some(newest) => newest.files.clone(),
		None => Vec::new(),
	};

	processor
		.on_commits(craft, store, record, batch, &newest_files)
		.await?;
	Ok(batch.iter().map(|c| c.sha.clone()).collect())
}
