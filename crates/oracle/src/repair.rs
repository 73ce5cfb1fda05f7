//! Extraction and repair of model-produced JSON.
//!
//! Models wrap JSON in prose, leave trailing commas, and truncate output
//! mid-structure. The routines here recover a parseable object from all
//! three defects. `repair` is idempotent: repairing already-repaired text
//! is the identity.

/// Finds the first `{` and returns the substring up to its balanced close,
/// dropping any trailing prose. An unbalanced tail is returned whole so
/// `repair` can close it.
pub fn extract_json(text: &str) -> Option<&str> {
	let start = text.find('{')?;
	let body = &text[start..];

	let mut depth = 0usize;
	let mut in_string = false;
	let mut escaped = false;
	for (idx, ch) in body.char_indices() {
		if escaped {
			escaped = false;
			continue;
		}
		match ch {
			'\\' if in_string => escaped = true,
			'"' => in_string = !in_string,
			'{' | '[' if !in_string => depth += 1,
			'}' | ']' if !in_string => {
				depth = depth.saturating_sub(1);
				if depth == 0 {
					return Some(&body[..=idx]);
				}
			}
			_ => {}
		}
	}
	Some(body)
}

/// Repairs common structural defects: strips trailing commas before a
/// closing bracket, closes an unterminated string, and closes unbalanced
/// brackets and braces by counting.
pub fn repair(text: &str) -> String {
	let stripped = strip_trailing_commas(text);

	let mut stack = Vec::new();
	let mut in_string = false;
	let mut escaped = false;
	for ch in stripped.chars() {
		if escaped {
			escaped = false;
			continue;
		}
		match ch {
			'\\' if in_string => escaped = true,
			'"' => in_string = !in_string,
			'{' if !in_string => stack.push('}'),
			'[' if !in_string => stack.push(']'),
			'}' | ']' if !in_string => {
				if stack.last() == Some(&ch) {
					stack.pop();
				}
			}
			_ => {}
		}
	}

	let mut repaired = stripped;
	if in_string {
		repaired.push('"');
	}
	// A truncated value may end on a dangling comma that only became
	// trailing once the closers are known; drop it before closing.
	while repaired.trim_end().ends_with(',') {
		let cut = repaired.trim_end().len() - 1;
		repaired.truncate(cut);
	}
	while let Some(close) = stack.pop() {
		repaired.push(close);
	}
	repaired
}

/// Extracts the first JSON object from `reply` and repairs it, or `None`
/// when the reply contains no object at all.
pub fn extract_and_repair(reply: &str) -> Option<String> {
	extract_json(reply).map(repair)
}

fn strip_trailing_commas(text: &str) -> String {
	let bytes = text.as_bytes();
	let mut out = String::with_capacity(text.len());
	let mut in_string = false;
	let mut escaped = false;

	for (idx, ch) in text.char_indices() {
		if escaped {
			escaped = false;
			out.push(ch);
			continue;
		}
		match ch {
			'\\' if in_string => {
				escaped = true;
				out.push(ch);
			}
			'"' => {
				in_string = !in_string;
				out.push(ch);
			}
			',' if !in_string => {
				let next = bytes[idx + 1..]
					.iter()
					.copied()
					.find(|b| !b.is_ascii_whitespace());
				if !matches!(next, Some(b'}') | Some(b']')) {
					out.push(ch);
				}
			}
			_ => out.push(ch),
		}
	}
	out
}
