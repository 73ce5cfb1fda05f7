//! Engram daemon binary.
//!
//! The daemon runs as a long-lived process and owns:
//! - the connection store and its SQLite database
//! - the sync scheduler and its worker pool
//! - the HTTP API the UI drives

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use engram_api::{AppState, Sessions};
use engram_oracle::{OracleClient, OracleConfig};
use engram_store::Store;
use engram_sync::{EngineConfig, Materialiser, RestVcsFactory, SyncService, ToolCraftFactory};
use tokio_util::sync::CancellationToken;
use tracing::info;

mod config;

use config::Config;

/// Daemon command line arguments.
#[derive(Parser, Debug)]
#[command(name = "engram")]
#[command(about = "Repository-to-workspace engineering brain sync daemon")]
struct Args {
	/// Path to the TOML config file
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Override the bind address
	#[arg(short, long)]
	bind: Option<String>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
				if args.verbose {
					"engram=debug,info".into()
				} else {
					"info".into()
				}
			}),
		)
		.init();

	info!("starting engram");

	let mut config = Config::load(args.config.as_deref())?;
	if let Some(bind) = args.bind {
		config.bind_addr = bind;
	}

	let store = Store::open(&config.database_path, &config.fallback_path);
	let loaded = store.initialize()?;
	info!(connections = loaded, degraded = store.is_degraded(), "store ready");

	let oracle = Arc::new(OracleClient::new(OracleConfig {
		base_url: config.oracle.base_url.clone(),
		api_key: config.oracle.api_key.clone().unwrap_or_default(),
		model: config.oracle.model.clone(),
		temperature: config.oracle.temperature,
	})?);
	let vcs_factory = Arc::new(RestVcsFactory::new());
	let craft_factory = Arc::new(ToolCraftFactory);

	let shutdown = CancellationToken::new();
	let sync = SyncService::start(
		store.clone(),
		vcs_factory.clone(),
		craft_factory.clone(),
		oracle.clone(),
		EngineConfig {
			period: config.sync_period(),
			min_interval: config.min_interval(),
			workers: config.workers,
		},
		shutdown.clone(),
	);

	let materialiser = Arc::new(Materialiser::new(
		store.clone(),
		vcs_factory.clone(),
		craft_factory.clone(),
		oracle,
	));

	let state = AppState {
		store,
		sessions: Arc::new(Sessions::new()),
		materialiser,
		sync,
		vcs_factory,
		craft_factory,
		webhook_secret: config.webhook_secret.clone(),
	};

	let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
	info!(addr = %config.bind_addr, "HTTP API listening");

	let server_shutdown = shutdown.clone();
	axum::serve(listener, engram_api::router(state))
		.with_graceful_shutdown(async move {
			let _ = tokio::signal::ctrl_c().await;
			info!("shutdown requested");
			server_shutdown.cancel();
		})
		.await?;

	// The scheduler observes the same token; in-flight cycles stop at
	// their next safe point and persist cursors before exiting.
	shutdown.cancel();
	info!("engram stopped");
	Ok(())
}
