//! Prompt construction for the three analysis calls.
//!
//! Prompts carry truncated signal excerpts (the provider has a context
//! budget) and end with the exact JSON shape the reply must use; the
//! parser tolerates deviation, but a precise shape keeps repair rare.

use std::fmt::Write;

use engram_github::{CommitInfo, FileChange, PrDetail};
use engram_proto::RepoSignals;

const MAX_TREE_PATHS: usize = 400;
const MAX_README_CHARS: usize = 6000;
const MAX_MANIFEST_CHARS: usize = 2000;
const MAX_PATCH_CHARS: usize = 1500;
const MAX_PR_FILES: usize = 30;

pub(crate) fn repository_prompt(signals: &RepoSignals) -> String {
	let mut prompt = String::from(
		"Analyse this repository and produce an engineering knowledge-base record.\n\n",
	);

	if !signals.languages.is_empty() {
		let langs: Vec<String> = signals
			.languages
			.iter()
			.map(|(lang, bytes)| format!("{lang} ({bytes} bytes)"))
			.collect();
		let _ = writeln!(prompt, "Languages: {}\n", langs.join(", "));
	}

	if !signals.file_tree.is_empty() {
		prompt.push_str("File tree (truncated):\n");
		for entry in signals.file_tree.iter().take(MAX_TREE_PATHS) {
			let _ = writeln!(prompt, "  {}", entry.path);
		}
		if signals.file_tree.len() > MAX_TREE_PATHS {
			let _ = writeln!(
				prompt,
				"  ... and {} more files",
				signals.file_tree.len() - MAX_TREE_PATHS
			);
		}
		prompt.push('\n');
	}

	for (ecosystem, manifest) in &signals.package_manifests {
		let _ = writeln!(
			prompt,
			"Manifest ({ecosystem}):\n{}\n",
			truncate(manifest, MAX_MANIFEST_CHARS)
		);
	}

	if let Some(readme) = &signals.readme {
		let _ = writeln!(prompt, "README:\n{}\n", truncate(readme, MAX_README_CHARS));
	}

	if !signals.open_issues.is_empty() {
		prompt.push_str("Open issues:\n");
		for issue in signals.open_issues.iter().take(20) {
			let _ = writeln!(prompt, "  #{} {}", issue.number, issue.title);
		}
		prompt.push('\n');
	}

	prompt.push_str(concat!(
		"Reply with a single JSON object, no prose, using exactly this shape:\n",
		"{\"overview\":{\"projectName\":\"\",\"tagline\":\"\",\"description\":\"\",\"problemStatement\":\"\"},",
		"\"scope\":{\"inScope\":[],\"outOfScope\":[],\"futureConsiderations\":[]},",
		"\"architecture\":{\"pattern\":\"\",\"description\":\"\",\"layers\":[{\"name\":\"\",\"purpose\":\"\",\"technologies\":[]}],\"dataFlow\":\"\",\"frameworks\":[],\"confidence\":0.0},",
		"\"keyConcepts\":[{\"term\":\"\",\"definition\":\"\"}],",
		"\"coreModules\":[{\"name\":\"\",\"purpose\":\"\",\"responsibilities\":[],\"location\":\"\",\"dependencies\":[],\"keyFiles\":[],\"confidence\":0.0}],",
		"\"publicAPIs\":[],\"internalInterfaces\":[],",
		"\"technicalStack\":{\"frontend\":[],\"backend\":[],\"database\":[],\"infrastructure\":[],\"tooling\":[]},",
		"\"openQuestions\":[],",
		"\"initialADR\":{\"title\":\"\",\"context\":\"\",\"decision\":\"\",\"consequences\":{\"positive\":[],\"negative\":[],\"risks\":[]}},",
		"\"engineeringTasks\":[{\"task\":\"\",\"priority\":\"High|Medium|Low\",\"category\":\"\",\"reasoning\":\"\"}],",
		"\"confidence\":0.0}\n",
	));
	prompt
}

pub(crate) fn pull_request_prompt(pr: &PrDetail) -> String {
	let mut prompt = format!(
		"Classify this merged pull request for documentation impact.\n\nPR #{}: {}\nAuthor: {}\nBase: {}\n\n{}\n\n",
		pr.number,
		pr.title,
		pr.author,
		pr.base_ref,
		truncate(&pr.body, 3000),
	);

	prompt.push_str("Changed files:\n");
	for file in pr.files_changed.iter().take(MAX_PR_FILES) {
		let _ = writeln!(
			prompt,
			"  {} (+{} -{})",
			file.filename, file.additions, file.deletions
		);
		if let Some(patch) = &file.patch {
			let _ = writeln!(prompt, "{}", truncate(patch, MAX_PATCH_CHARS));
		}
	}
	if pr.files_changed.len() > MAX_PR_FILES {
		let _ = writeln!(
			prompt,
			"  ... and {} more files",
			pr.files_changed.len() - MAX_PR_FILES
		);
	}

	if !pr.comments.is_empty() {
		prompt.push_str("\nDiscussion:\n");
		for comment in pr.comments.iter().take(10) {
			let _ = writeln!(prompt, "  {}: {}", comment.author, truncate(&comment.body, 400));
		}
	}
	if !pr.reviews.is_empty() {
		prompt.push_str("\nReviews:\n");
		for review in pr.reviews.iter().take(10) {
			let _ = writeln!(
				prompt,
				"  {} ({}): {}",
				review.author,
				review.state,
				truncate(&review.body, 400)
			);
		}
	}

	prompt.push_str(concat!(
		"\nReply with a single JSON object, no prose:\n",
		"{\"changeType\":\"feature|bugfix|refactor|docs|test|security|performance|architecture|unknown\",",
		"\"impactLevel\":\"major|minor|patch\",\"affectedModules\":[],",
		"\"publicAPIChanges\":false,\"breakingChanges\":false,\"requiresADR\":false,",
		"\"summary\":\"\",\"documentationUpdates\":[],\"followUpTasks\":[],",
		"\"newTechnologies\":[],\"architectureChanges\":null,\"confidence\":0.0}\n",
	));
	prompt
}

pub(crate) fn commits_prompt(commits: &[CommitInfo], files: &[FileChange]) -> String {
	let mut prompt = String::from(
		"Judge whether this batch of direct-branch commits is significant enough to document.\n\nCommits:\n",
	);
	for commit in commits {
		let _ = writeln!(
			prompt,
			"  {} {} ({})",
			&commit.sha[..commit.sha.len().min(8)],
			commit.message.lines().next().unwrap_or(""),
			commit.author,
		);
	}
	if !files.is_empty() {
		prompt.push_str("\nFiles of the newest commit:\n");
		for file in files.iter().take(MAX_PR_FILES) {
			let _ = writeln!(
				prompt,
				"  {} (+{} -{})",
				file.filename, file.additions, file.deletions
			);
		}
	}
	prompt.push_str(concat!(
		"\nReply with a single JSON object, no prose:\n",
		"{\"isSignificant\":false,\"changeType\":\"feature|bugfix|refactor|docs|test|security|performance|architecture|unknown\",",
		"\"impactLevel\":\"major|minor|patch\",\"summary\":\"\",\"suggestedTasks\":[],\"confidence\":0.0}\n",
	));
	prompt
}

fn truncate(text: &str, max: usize) -> &str {
	if text.len() <= max {
		return text;
	}
	let mut end = max;
	while !text.is_char_boundary(end) {
		end -= 1;
	}
	&text[..end]
}

#[cfg(test)]
mod tests {
	use super::truncate;

	#[test]
	fn truncate_respects_char_boundaries() {
		let text = "héllo wörld";
		let cut = truncate(text, 2);
		assert!(cut.len() <= 2);
		assert!(text.starts_with(cut));
		assert_eq!(truncate("short", 100), "short");
	}
}
