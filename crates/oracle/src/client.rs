//! The oracle HTTP client.

use std::time::Duration;

use engram_github::{CommitInfo, FileChange, PrDetail};
use engram_proto::{ChangeAnalysis, CommitSignificance, RepoAnalysis, RepoSignals};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::OracleError;
use crate::parse::{
	change_analysis_from_value, commit_significance_from_value, repo_analysis_from_value,
};
use crate::prompts;
use crate::repair::extract_and_repair;

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider configuration for the oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
	/// Chat-completions base URL, e.g. `https://api.openai.com` or a local
	/// gateway.
	pub base_url: String,
	pub api_key: String,
	pub model: String,
	pub temperature: f32,
}

impl Default for OracleConfig {
	fn default() -> Self {
		Self {
			base_url: "http://localhost:4000".to_string(),
			api_key: String::new(),
			model: "gpt-4o-mini".to_string(),
			temperature: 0.2,
		}
	}
}

/// Request-response facade over the language-model provider.
pub struct OracleClient {
	http: reqwest::Client,
	config: OracleConfig,
}

impl OracleClient {
	pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
		let http = reqwest::Client::builder()
			.timeout(CALL_TIMEOUT)
			.build()?;
		Ok(Self { http, config })
	}

	/// Produces the full repository analysis the materialiser consumes.
	pub async fn analyse_repository(
		&self,
		signals: &RepoSignals,
	) -> Result<RepoAnalysis, OracleError> {
		let value = self.complete_json(prompts::repository_prompt(signals)).await?;
		Ok(repo_analysis_from_value(&value))
	}

	/// Classifies one merged pull request.
	pub async fn analyse_pr(&self, pr: &PrDetail) -> Result<ChangeAnalysis, OracleError> {
		let value = self.complete_json(prompts::pull_request_prompt(pr)).await?;
		Ok(change_analysis_from_value(&value))
	}

	/// Judges a batch of direct-branch commits for significance.
	pub async fn analyse_commits(
		&self,
		commits: &[CommitInfo],
		files: &[FileChange],
	) -> Result<CommitSignificance, OracleError> {
		let value = self
			.complete_json(prompts::commits_prompt(commits, files))
			.await?;
		Ok(commit_significance_from_value(&value))
	}

	async fn complete_json(&self, prompt: String) -> Result<Value, OracleError> {
		let url = format!(
			"{}/v1/chat/completions",
			self.config.base_url.trim_end_matches('/')
		);
		let resp = self
			.http
			.post(&url)
			.bearer_auth(&self.config.api_key)
			.json(&json!({
				"model": self.config.model,
				"temperature": self.config.temperature,
				"messages": [{"role": "user", "content": prompt}],
			}))
			.send()
			.await?;
		let status = resp.status().as_u16();
		if !resp.status().is_success() {
			return Err(OracleError::Transport {
				status,
				retryable: status >= 500 || status == 429,
				message: "completion request failed".to_string(),
			});
		}
		let reply: ChatReply = resp
			.json()
			.await
			.map_err(|err| OracleError::Parse(format!("reply envelope: {err}")))?;
		let content = reply
			.choices
			.first()
			.map(|choice| choice.message.content.as_str())
			.unwrap_or("");

		let repaired = extract_and_repair(content)
			.ok_or_else(|| OracleError::Parse("no JSON object in reply".to_string()))?;
		serde_json::from_str(&repaired)
			.map_err(|err| OracleError::Parse(format!("unrepairable reply: {err}")))
	}
}

#[derive(Deserialize)]
struct ChatReply {
	#[serde(default)]
	choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
	message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
	#[serde(default)]
	content: String,
}
