//! Daemon configuration.
//!
//! Loaded from a TOML file with per-field defaults; secrets (the oracle
//! key and webhook secret) can also arrive via environment variables so
//! they stay out of config files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Address the HTTP API binds to.
	pub bind_addr: String,
	/// SQLite database path.
	pub database_path: PathBuf,
	/// JSON fallback path used when the database cannot be opened.
	pub fallback_path: PathBuf,
	/// Sync cycle period in seconds.
	pub sync_period_secs: u64,
	/// Per-connection minimum interval between cycles, in seconds.
	pub min_interval_secs: u64,
	/// Worker-pool size for concurrent cycles.
	pub workers: usize,
	/// Webhook shared secret; unset disables the webhook endpoint.
	pub webhook_secret: Option<String>,
	pub oracle: OracleSection,
}

/// Oracle provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleSection {
	pub base_url: String,
	pub api_key: Option<String>,
	pub model: String,
	pub temperature: f32,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			bind_addr: "127.0.0.1:8417".to_string(),
			database_path: PathBuf::from("engram.db"),
			fallback_path: PathBuf::from("engram.json"),
			sync_period_secs: 300,
			min_interval_secs: 120,
			workers: 4,
			webhook_secret: None,
			oracle: OracleSection::default(),
		}
	}
}

impl Default for OracleSection {
	fn default() -> Self {
		Self {
			base_url: "http://localhost:4000".to_string(),
			api_key: None,
			model: "gpt-4o-mini".to_string(),
			temperature: 0.2,
		}
	}
}

impl Config {
	/// Loads the file when present, then applies environment overrides.
	pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
		let mut config = match path {
			Some(path) => {
				let raw = std::fs::read_to_string(path)?;
				toml::from_str(&raw)?
			}
			None => Self::default(),
		};
		if let Ok(key) = std::env::var("ENGRAM_ORACLE_API_KEY") {
			config.oracle.api_key = Some(key);
		}
		if let Ok(secret) = std::env::var("ENGRAM_WEBHOOK_SECRET") {
			config.webhook_secret = Some(secret);
		}
		Ok(config)
	}

	pub fn sync_period(&self) -> Duration {
		Duration::from_secs(self.sync_period_secs)
	}

	pub fn min_interval(&self) -> Duration {
		Duration::from_secs(self.min_interval_secs)
	}
}

#[cfg(test)]
mod tests {
	use super::Config;

	#[test]
	fn empty_toml_is_all_defaults() {
		let config: Config = toml::from_str("").expect("parse");
		assert_eq!(config.sync_period_secs, 300);
		assert_eq!(config.min_interval_secs, 120);
		assert_eq!(config.workers, 4);
		assert!(config.webhook_secret.is_none());
	}

	#[test]
	fn partial_toml_overrides_defaults() {
		let config: Config = toml::from_str(
			"sync_period_secs = 60\n\n[oracle]\nmodel = \"local-llama\"\n",
		)
		.expect("parse");
		assert_eq!(config.sync_period_secs, 60);
		assert_eq!(config.oracle.model, "local-llama");
		assert_eq!(config.workers, 4);
	}
}
