//! Pinning loose oracle JSON to typed records.
//!
//! Parsing is lossy per field: a field that is missing or wrongly typed
//! falls back to its default instead of failing the record, and every
//! confidence is clamped into [0, 1] so provider leakage (percentages,
//! negatives) cannot escape into the data model.

use engram_proto::{ChangeAnalysis, CommitSignificance, RepoAnalysis};
use serde::de::DeserializeOwned;
use serde_json::Value;

fn field<T: DeserializeOwned + Default>(value: &Value, key: &str) -> T {
	value
		.get(key)
		.cloned()
		.and_then(|v| serde_json::from_value(v).ok())
		.unwrap_or_default()
}

fn clamp_confidence(raw: f64) -> f64 {
	if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
}

/// Builds a [`RepoAnalysis`] from a repaired reply value.
pub fn repo_analysis_from_value(value: &Value) -> RepoAnalysis {
	let mut analysis = RepoAnalysis {
		overview: field(value, "overview"),
		scope: field(value, "scope"),
		architecture: field(value, "architecture"),
		key_concepts: field(value, "keyConcepts"),
		core_modules: field(value, "coreModules"),
		public_apis: field(value, "publicAPIs"),
		internal_interfaces: field(value, "internalInterfaces"),
		technical_stack: field(value, "technicalStack"),
		open_questions: field(value, "openQuestions"),
		initial_adr: field(value, "initialADR"),
		engineering_tasks: field(value, "engineeringTasks"),
		confidence: field(value, "confidence"),
	};
	analysis.confidence = clamp_confidence(analysis.confidence);
	analysis.architecture.confidence = clamp_confidence(analysis.architecture.confidence);
	for module in &mut analysis.core_modules {
		module.confidence = clamp_confidence(module.confidence);
	}
	analysis
}

/// Builds a [`ChangeAnalysis`] from a repaired reply value.
pub fn change_analysis_from_value(value: &Value) -> ChangeAnalysis {
	let mut analysis = ChangeAnalysis {
		change_type: field(value, "changeType"),
		impact_level: field(value, "impactLevel"),
		affected_modules: field(value, "affectedModules"),
		public_api_changes: field(value, "publicAPIChanges"),
		breaking_changes: field(value, "breakingChanges"),
		requires_adr: field(value, "requiresADR"),
		summary: field(value, "summary"),
		documentation_updates: field(value, "documentationUpdates"),
		follow_up_tasks: field(value, "followUpTasks"),
		new_technologies: field(value, "newTechnologies"),
		architecture_changes: field(value, "architectureChanges"),
		confidence: field(value, "confidence"),
	};
	analysis.confidence = clamp_confidence(analysis.confidence);
	analysis
}

/// Builds a [`CommitSignificance`] from a repaired reply value.
pub fn commit_significance_from_value(value: &Value) -> CommitSignificance {
	let mut significance = CommitSignificance {
		is_significant: field(value, "isSignificant"),
		change_type: field(value, "changeType"),
		impact_level: field(value, "impactLevel"),
		summary: field(value, "summary"),
		suggested_tasks: field(value, "suggestedTasks"),
		confidence: field(value, "confidence"),
	};
	significance.confidence = clamp_confidence(significance.confidence);
	significance
}
