//! Markdown rendering for the main brain document.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use engram_github::CommitInfo;
use engram_proto::{CommitSignificance, RepoAnalysis, RepoKey};

/// README-shaped header seeded onto a fresh main page.
pub(crate) fn main_page(repo_key: &RepoKey, analysis: &RepoAnalysis) -> String {
	let overview = &analysis.overview;
	let name = if overview.project_name.is_empty() {
		repo_key.name()
	} else {
		&overview.project_name
	};

	let mut md = format!("# {name} — Engineering Brain\n\n");
	if !overview.tagline.is_empty() {
		let _ = writeln!(md, "> {}\n", overview.tagline);
	}
	let _ = writeln!(md, "Repository: `{repo_key}`\n");
	if !overview.description.is_empty() {
		let _ = writeln!(md, "{}\n", overview.description);
	}
	if !overview.problem_statement.is_empty() {
		let _ = writeln!(md, "**Problem:** {}\n", overview.problem_statement);
	}

	md.push_str("## Tech Stack\n\n");
	let stack = analysis.technical_stack.flattened();
	if stack.is_empty() {
		md.push_str("_Not yet identified._\n\n");
	} else {
		for item in stack {
			let _ = writeln!(md, "- {item}");
		}
		md.push('\n');
	}

	md.push_str(concat!(
		"## Contents\n\n",
		"- Technical specification (below)\n",
		"- Release Notes collection\n",
		"- Architecture Decision Records collection\n",
		"- Engineering Tasks collection\n",
		"- Documentation History collection\n",
	));
	md
}

/// The technical-specification body appended after the header.
pub(crate) fn tech_spec(analysis: &RepoAnalysis) -> String {
	let mut md = String::from("## Technical Specification\n\n### Scope\n\n");
	push_list(&mut md, "In scope", &analysis.scope.in_scope);
	push_list(&mut md, "Out of scope", &analysis.scope.out_of_scope);
	push_list(
		&mut md,
		"Future considerations",
		&analysis.scope.future_considerations,
	);

	md.push_str("### Architecture\n\n");
	let arch = &analysis.architecture;
	if !arch.pattern.is_empty() {
		let _ = writeln!(md, "**Pattern:** {}\n", arch.pattern);
	}
	if !arch.description.is_empty() {
		let _ = writeln!(md, "{}\n", arch.description);
	}
	for layer in &arch.layers {
		let _ = writeln!(
			md,
			"- **{}** — {} ({})",
			layer.name,
			layer.purpose,
			layer.technologies.join(", ")
		);
	}
	if !arch.layers.is_empty() {
		md.push('\n');
	}
	if !arch.data_flow.is_empty() {
		let _ = writeln!(md, "**Data flow:** {}\n", arch.data_flow);
	}

	if !analysis.core_modules.is_empty() {
		md.push_str("### Core Modules\n\n");
		for module in &analysis.core_modules {
			let _ = writeln!(md, "#### {}\n", module.name);
			if !module.purpose.is_empty() {
				let _ = writeln!(md, "{}\n", module.purpose);
			}
			if !module.location.is_empty() {
				let _ = writeln!(md, "Location: `{}`\n", module.location);
			}
			push_list(&mut md, "Responsibilities", &module.responsibilities);
			push_list(&mut md, "Depends on", &module.dependencies);
		}
	}

	push_section(&mut md, "### Public APIs", &analysis.public_apis);
	push_section(&mut md, "### Internal Interfaces", &analysis.internal_interfaces);

	if !analysis.key_concepts.is_empty() {
		md.push_str("### Key Concepts\n\n");
		for concept in &analysis.key_concepts {
			let _ = writeln!(md, "- **{}** — {}", concept.term, concept.definition);
		}
		md.push('\n');
	}

	push_section(&mut md, "### Open Questions", &analysis.open_questions);
	md
}

/// Block appended to the main page for a significant commit batch.
pub(crate) fn commit_block(
	significance: &CommitSignificance,
	commits: &[CommitInfo],
	at: DateTime<Utc>,
) -> String {
	let mut md = format!(
		"### Direct commits — {}\n\n{}\n\n",
		at.format("%Y-%m-%d"),
		significance.summary,
	);
	for commit in commits {
		let _ = writeln!(
			md,
			"- `{}` {}",
			&commit.sha[..commit.sha.len().min(8)],
			commit.message.lines().next().unwrap_or("")
		);
	}
	md
}

/// Appended when a pull request changed public APIs.
pub(crate) fn api_changes_block(pr_number: u64, summary: &str, at: DateTime<Utc>) -> String {
	format!(
		"### API Changes — PR #{pr_number} ({})\n\n{summary}\n",
		at.format("%Y-%m-%d")
	)
}

/// Appended when a pull request introduced breaking changes.
pub(crate) fn breaking_changes_block(pr_number: u64, summary: &str, at: DateTime<Utc>) -> String {
	format!(
		"### Breaking Changes — PR #{pr_number} ({})\n\n{summary}\n",
		at.format("%Y-%m-%d")
	)
}

/// Terminal update-log line; replaces the previous one.
pub(crate) fn update_log_line(pr_number: u64, at: DateTime<Utc>) -> String {
	format!(
		"_Last updated from PR #{pr_number} on {}_",
		at.format("%Y-%m-%d")
	)
}

/// Tech-stack section content after an upsert with new technologies.
pub(crate) fn tech_stack_section(existing: &[String], added: &[String]) -> String {
	let mut md = String::from("## Tech Stack\n\n");
	for item in existing.iter().chain(added) {
		let _ = writeln!(md, "- {item}");
	}
	md
}

fn push_list(md: &mut String, label: &str, items: &[String]) {
	if items.is_empty() {
		return;
	}
	let _ = writeln!(md, "**{label}:**\n");
	for item in items {
		let _ = writeln!(md, "- {item}");
	}
	md.push('\n');
}

fn push_section(md: &mut String, heading: &str, items: &[String]) {
	if items.is_empty() {
		return;
	}
	let _ = writeln!(md, "{heading}\n");
	for item in items {
		let _ = writeln!(md, "- {item}");
	}
	md.push('\n');
}

#[cfg(test)]
mod tests {
	use engram_proto::{RepoAnalysis, RepoKey};

	use super::{main_page, update_log_line};

	#[test]
	fn main_page_falls_back_to_repo_name() {
		let key = RepoKey::parse("octocat/hello").expect("key");
		let md = main_page(&key, &RepoAnalysis::default());
		assert!(md.starts_with("# hello — Engineering Brain"));
		assert!(md.contains("`octocat/hello`"));
		assert!(md.contains("## Tech Stack"));
	}

	#[test]
	fn update_log_carries_pr_and_date() {
		let at = chrono::Utc::now();
		let line = update_log_line(42, at);
		assert!(line.contains("PR #42"));
		assert!(line.contains(&at.format("%Y-%m-%d").to_string()));
	}
}
