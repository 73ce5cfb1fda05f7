//! Repository signals and the typed analysis records the oracle produces.
//!
//! The oracle replies with loosely-shaped JSON; the records here pin the
//! contract. Every field carries a serde default so a partially-repaired
//! reply still deserialises, and unknown enum values collapse to the
//! conservative variant instead of failing the parse.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One file in a repository tree listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
	pub path: String,
	#[serde(default)]
	pub size: u64,
}

/// An open issue, carried as a repository signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
	pub number: u64,
	pub title: String,
	#[serde(default)]
	pub labels: Vec<String>,
}

/// Everything gathered from the provider ahead of a repository analysis.
///
/// Every signal is best-effort; an empty value means the gather step failed
/// or the repository genuinely lacks it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoSignals {
	pub file_tree: Vec<TreeEntry>,
	pub readme: Option<String>,
	pub package_manifests: BTreeMap<String, String>,
	pub languages: BTreeMap<String, u64>,
	pub open_issues: Vec<IssueSummary>,
}

/// Classification of what a change is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
	Feature,
	Bugfix,
	Refactor,
	Docs,
	Test,
	Security,
	Performance,
	Architecture,
	#[default]
	#[serde(other)]
	Unknown,
}

impl ChangeType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Feature => "feature",
			Self::Bugfix => "bugfix",
			Self::Refactor => "refactor",
			Self::Docs => "docs",
			Self::Test => "test",
			Self::Security => "security",
			Self::Performance => "performance",
			Self::Architecture => "architecture",
			Self::Unknown => "unknown",
		}
	}
}

/// How large the blast radius of a change is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
	Major,
	Patch,
	#[default]
	#[serde(other)]
	Minor,
}

impl ImpactLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Major => "major",
			Self::Minor => "minor",
			Self::Patch => "patch",
		}
	}
}

/// Priority of a generated engineering task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskPriority {
	High,
	Low,
	#[default]
	#[serde(other)]
	Medium,
}

impl TaskPriority {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::High => "High",
			Self::Medium => "Medium",
			Self::Low => "Low",
		}
	}
}

/// Project overview section of a repository analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverviewInfo {
	pub project_name: String,
	pub tagline: String,
	pub description: String,
	pub problem_statement: String,
}

/// Scope boundaries of the project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScopeInfo {
	pub in_scope: Vec<String>,
	pub out_of_scope: Vec<String>,
	pub future_considerations: Vec<String>,
}

/// One architectural layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerInfo {
	pub name: String,
	pub purpose: String,
	pub technologies: Vec<String>,
}

/// Architecture description of the analysed repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchitectureInfo {
	pub pattern: String,
	pub description: String,
	pub layers: Vec<LayerInfo>,
	pub data_flow: String,
	pub frameworks: Vec<String>,
	pub confidence: f64,
}

/// Domain term with its definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyConcept {
	pub term: String,
	pub definition: String,
}

/// One core module the oracle identified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreModule {
	pub name: String,
	pub purpose: String,
	pub responsibilities: Vec<String>,
	pub location: String,
	pub dependencies: Vec<String>,
	pub key_files: Vec<String>,
	pub confidence: f64,
}

/// Technology stack grouped by tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TechnicalStack {
	pub frontend: Vec<String>,
	pub backend: Vec<String>,
	pub database: Vec<String>,
	pub infrastructure: Vec<String>,
	pub tooling: Vec<String>,
}

impl TechnicalStack {
	/// All stack entries flattened, tier order preserved.
	pub fn flattened(&self) -> Vec<String> {
		self.frontend
			.iter()
			.chain(&self.backend)
			.chain(&self.database)
			.chain(&self.infrastructure)
			.chain(&self.tooling)
			.cloned()
			.collect()
	}
}

/// Consequences block of an architecture decision record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdrConsequences {
	pub positive: Vec<String>,
	pub negative: Vec<String>,
	pub risks: Vec<String>,
}

/// The initial architecture decision record seeded at materialisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdrRecord {
	pub title: String,
	pub context: String,
	pub decision: String,
	pub consequences: AdrConsequences,
}

/// A generated engineering task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineeringTask {
	pub task: String,
	pub priority: TaskPriority,
	pub category: String,
	pub reasoning: String,
}

/// Full structured analysis of a repository, the materialiser's input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepoAnalysis {
	pub overview: OverviewInfo,
	pub scope: ScopeInfo,
	pub architecture: ArchitectureInfo,
	pub key_concepts: Vec<KeyConcept>,
	pub core_modules: Vec<CoreModule>,
	pub public_apis: Vec<String>,
	pub internal_interfaces: Vec<String>,
	pub technical_stack: TechnicalStack,
	pub open_questions: Vec<String>,
	pub initial_adr: AdrRecord,
	pub engineering_tasks: Vec<EngineeringTask>,
	pub confidence: f64,
}

/// Per-pull-request oracle verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangeAnalysis {
	pub change_type: ChangeType,
	pub impact_level: ImpactLevel,
	pub affected_modules: Vec<String>,
	pub public_api_changes: bool,
	pub breaking_changes: bool,
	pub requires_adr: bool,
	pub summary: String,
	pub documentation_updates: Vec<String>,
	pub follow_up_tasks: Vec<String>,
	pub new_technologies: Vec<String>,
	pub architecture_changes: Option<String>,
	pub confidence: f64,
}

impl ChangeAnalysis {
	/// Whether this change deserves a release-notes entry.
	pub fn release_note_worthy(&self) -> bool {
		self.impact_level == ImpactLevel::Major
			|| self.breaking_changes
			|| (self.change_type == ChangeType::Feature && self.public_api_changes)
	}
}

/// Oracle verdict over a batch of direct-branch commits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommitSignificance {
	pub is_significant: bool,
	pub change_type: ChangeType,
	pub impact_level: ImpactLevel,
	pub summary: String,
	pub suggested_tasks: Vec<String>,
	pub confidence: f64,
}
