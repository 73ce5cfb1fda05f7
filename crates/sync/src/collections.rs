//! Schemas and item builders for the four brain collections.
//!
//! Each collection names its content property differently (`title`,
//! `task`, `event`); an item inserted under the wrong key is silently
//! dropped by the workspace, so every builder here is the single source
//! of truth for its collection's shape.

use chrono::{DateTime, Utc};
use engram_craft::{CollectionSchema, PropertyDef, PropertyKind};
use engram_proto::{ChangeAnalysis, ImpactLevel, RepoAnalysis};
use serde_json::{Value, json};

/// Creation order of the four collections under a root document.
pub const COLLECTION_NAMES: [&str; 4] =
	["release_notes", "adrs", "engineering_tasks", "doc_history"];

pub fn release_notes_schema() -> CollectionSchema {
	CollectionSchema {
		content_property: "title",
		properties: vec![
			PropertyDef { name: "version", kind: PropertyKind::Text },
			PropertyDef { name: "date", kind: PropertyKind::Date },
			PropertyDef { name: "summary", kind: PropertyKind::Text },
			PropertyDef { name: "pr_number", kind: PropertyKind::Number },
			PropertyDef { name: "changes", kind: PropertyKind::Text },
		],
	}
}

pub fn adrs_schema() -> CollectionSchema {
	CollectionSchema {
		content_property: "title",
		properties: vec![
			PropertyDef { name: "adr_id", kind: PropertyKind::Text },
			PropertyDef { name: "status", kind: PropertyKind::Text },
			PropertyDef { name: "date", kind: PropertyKind::Date },
			PropertyDef { name: "context", kind: PropertyKind::Text },
			PropertyDef { name: "decision", kind: PropertyKind::Text },
			PropertyDef { name: "consequences", kind: PropertyKind::Text },
			PropertyDef { name: "confidence", kind: PropertyKind::Number },
		],
	}
}

pub fn engineering_tasks_schema() -> CollectionSchema {
	CollectionSchema {
		content_property: "task",
		properties: vec![
			PropertyDef { name: "priority", kind: PropertyKind::Text },
			PropertyDef { name: "category", kind: PropertyKind::Text },
			PropertyDef { name: "reasoning", kind: PropertyKind::Text },
			PropertyDef { name: "status", kind: PropertyKind::Text },
			PropertyDef { name: "created_at", kind: PropertyKind::Date },
		],
	}
}

pub fn doc_history_schema() -> CollectionSchema {
	CollectionSchema {
		content_property: "event",
		properties: vec![
			PropertyDef { name: "date", kind: PropertyKind::Date },
			PropertyDef { name: "description", kind: PropertyKind::Text },
			PropertyDef { name: "pr_number", kind: PropertyKind::Number },
			PropertyDef { name: "confidence", kind: PropertyKind::Text },
		],
	}
}

/// Release-note version string: majors reset the day segment, patches
/// mark the day.
pub fn release_version(impact: ImpactLevel, at: DateTime<Utc>) -> String {
	let date = at.date_naive();
	match impact {
		ImpactLevel::Major => format!("v{}.0", date.format("%Y.%m")),
		ImpactLevel::Minor => format!("v{}", date.format("%Y.%m.%d")),
		ImpactLevel::Patch => format!("v{}-patch", date.format("%Y.%m.%d")),
	}
}

/// Auto-generated ADR id from the last four digits of the epoch-ms clock.
pub fn adr_id(at: DateTime<Utc>) -> String {
	format!("ADR-{:04}", at.timestamp_millis().rem_euclid(10_000))
}

/// Confidence rendered the way doc-history rows carry it, e.g. `"82%"`.
pub fn confidence_percent(confidence: f64) -> String {
	format!("{}%", (confidence * 100.0).round() as i64)
}

fn date_str(at: DateTime<Utc>) -> String {
	at.format("%Y-%m-%d").to_string()
}

pub fn doc_history_item(
	event: &str,
	description: &str,
	pr_number: Option<u64>,
	confidence: f64,
	at: DateTime<Utc>,
) -> Value {
	json!({
		"event": event,
		"date": date_str(at),
		"description": description,
		"pr_number": pr_number,
		"confidence": confidence_percent(confidence),
	})
}

pub fn release_note_item(
	title: &str,
	analysis: &ChangeAnalysis,
	pr_number: u64,
	at: DateTime<Utc>,
) -> Value {
	json!({
		"title": title,
		"version": release_version(analysis.impact_level, at),
		"date": date_str(at),
		"summary": analysis.summary,
		"pr_number": pr_number,
		"changes": analysis.affected_modules.join(", "),
	})
}

pub fn adr_item(title: &str, context: &str, decision: &str, confidence: f64, at: DateTime<Utc>) -> Value {
	json!({
		"title": title,
		"adr_id": adr_id(at),
		"status": "Proposed",
		"date": date_str(at),
		"context": context,
		"decision": decision,
		"consequences": "",
		"confidence": confidence,
	})
}

pub fn engineering_task_item(
	task: &str,
	priority: &str,
	category: &str,
	reasoning: &str,
	at: DateTime<Utc>,
) -> Value {
	json!({
		"task": task,
		"priority": priority,
		"category": category,
		"reasoning": reasoning,
		"status": "Open",
		"created_at": date_str(at),
	})
}

/// Seed items for a fresh brain, one `collectionItems_add` batch per
/// collection.
pub fn seed_release_notes(analysis: &RepoAnalysis, at: DateTime<Utc>) -> Vec<Value> {
	vec![json!({
		"title": "Initial documentation",
		"version": release_version(ImpactLevel::Minor, at),
		"date": date_str(at),
		"summary": format!(
			"Engineering brain created for {}",
			display_name(analysis)
		),
		"pr_number": Value::Null,
		"changes": "Initial analysis of the repository",
	})]
}

pub fn seed_adrs(analysis: &RepoAnalysis, at: DateTime<Utc>) -> Vec<Value> {
	let adr = &analysis.initial_adr;
	let consequences = [
		("Positive", &adr.consequences.positive),
		("Negative", &adr.consequences.negative),
		("Risks", &adr.consequences.risks),
	]
	.iter()
	.filter(|(_, items)| !items.is_empty())
	.map(|(label, items)| format!("{label}: {}", items.join("; ")))
	.collect::<Vec<_>>()
	.join(" | ");

	vec![json!({
		"title": if adr.title.is_empty() { "Initial architecture".to_string() } else { adr.title.clone() },
		"adr_id": adr_id(at),
		"status": "Accepted",
		"date": date_str(at),
		"context": adr.context,
		"decision": adr.decision,
		"consequences": consequences,
		"confidence": analysis.confidence,
	})]
}

pub fn seed_engineering_tasks(analysis: &RepoAnalysis, at: DateTime<Utc>) -> Vec<Value> {
	if analysis.engineering_tasks.is_empty() {
		return vec![engineering_task_item(
			"Review the generated documentation",
			"Medium",
			"Documentation",
			"Fresh analysis should be verified by a maintainer",
			at,
		)];
	}
	analysis
		.engineering_tasks
		.iter()
		.map(|task| {
			engineering_task_item(
				&task.task,
				task.priority.as_str(),
				&task.category,
				&task.reasoning,
				at,
			)
		})
		.collect()
}

pub fn seed_doc_history(analysis: &RepoAnalysis, at: DateTime<Utc>) -> Vec<Value> {
	vec![doc_history_item(
		"Documentation created",
		&format!(
			"Initial engineering brain materialised for {}",
			display_name(analysis)
		),
		None,
		analysis.confidence,
		at,
	)]
}

fn display_name(analysis: &RepoAnalysis) -> &str {
	if analysis.overview.project_name.is_empty() {
		"the repository"
	} else {
		&analysis.overview.project_name
	}
}

#[cfg(test)]
mod tests {
	use chrono::{TimeZone, Utc};
	use engram_proto::{ChangeAnalysis, ImpactLevel};

	use super::{adr_id, confidence_percent, release_version};

	#[test]
	fn version_strings_per_impact() {
		let at = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
		assert_eq!(release_version(ImpactLevel::Major, at), "v2026.08.0");
		assert_eq!(release_version(ImpactLevel::Minor, at), "v2026.08.01");
		assert_eq!(release_version(ImpactLevel::Patch, at), "v2026.08.01-patch");
	}

	#[test]
	fn adr_id_uses_last_four_digits() {
		let at = Utc.timestamp_millis_opt(1_723_456_789_123).unwrap();
		assert_eq!(adr_id(at), "ADR-9123");
		let early = Utc.timestamp_millis_opt(1_000_000_000_042).unwrap();
		assert_eq!(adr_id(early), "ADR-0042");
	}

	#[test]
	fn confidence_renders_as_percent() {
		assert_eq!(confidence_percent(0.82), "82%");
		assert_eq!(confidence_percent(0.0), "0%");
		assert_eq!(confidence_percent(1.0), "100%");
	}

	#[test]
	fn item_keys_match_collection_content_props() {
		let at = Utc::now();
		let history = super::doc_history_item("PR #42 Merged: x", "summary", Some(42), 0.5, at);
		assert!(history.get("event").is_some());
		assert!(history.get("title").is_none());

		let note = super::release_note_item("x", &ChangeAnalysis::default(), 42, at);
		assert!(note.get("title").is_some());

		let task = super::engineering_task_item("do it", "Medium", "From PR#42", "", at);
		assert!(task.get("task").is_some());
		assert!(task.get("title").is_none());
	}
}
