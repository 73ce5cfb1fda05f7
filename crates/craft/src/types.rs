//! Typed shapes for workspace operations.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A document as listed by the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
	pub id: String,
	pub title: String,
}

/// Outcome of an existence probe. Absence is data, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentProbe {
	Found(DocumentRef),
	Absent,
}

impl DocumentProbe {
	pub fn found(&self) -> Option<&DocumentRef> {
		match self {
			Self::Found(doc) => Some(doc),
			Self::Absent => None,
		}
	}
}

/// One block of a workspace page, normalised from the protocol's
/// `content`/`text`/`markdown` field variants.
#[derive(Debug, Clone, PartialEq)]
pub struct CraftBlock {
	pub id: String,
	pub text: String,
}

impl CraftBlock {
	/// Markdown heading level of this block, if it is a heading.
	pub fn heading_level(&self) -> Option<usize> {
		let trimmed = self.text.trim_start();
		let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
		if hashes == 0 || hashes > 6 {
			return None;
		}
		trimmed.as_bytes().get(hashes).copied().filter(|b| *b == b' ').map(|_| hashes)
	}
}

/// Insertion position within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
	Start,
	End,
}

impl Position {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Start => "start",
			Self::End => "end",
		}
	}
}

/// Type of a collection property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
	Text,
	Date,
	Number,
}

impl PropertyKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Date => "date",
			Self::Number => "number",
		}
	}
}

/// One typed property of a collection schema.
#[derive(Debug, Clone)]
pub struct PropertyDef {
	pub name: &'static str,
	pub kind: PropertyKind,
}

/// Schema for a collection, including which property carries the item
/// content. The content-property key differs between the four brain
/// collections; inserting with the wrong key silently drops the item on
/// the remote side.
#[derive(Debug, Clone)]
pub struct CollectionSchema {
	pub content_property: &'static str,
	pub properties: Vec<PropertyDef>,
}

impl CollectionSchema {
	/// Wire shape for `collections_create`.
	pub fn to_value(&self) -> Value {
		json!({
			"contentProperty": self.content_property,
			"properties": self
				.properties
				.iter()
				.map(|p| json!({"name": p.name, "type": p.kind.as_str()}))
				.collect::<Vec<_>>(),
		})
	}
}

/// A targeted partial update of the main document.
///
/// Applied in order: delete every block matching `delete_pattern`, then
/// update the first block matching `section_to_update`, then append
/// `new_content` when no section matched and `append_if_not_found` holds.
#[derive(Debug, Clone)]
pub struct MainDocumentUpdate {
	pub page_id: String,
	pub section_to_update: Option<String>,
	pub new_content: Option<String>,
	pub delete_pattern: Option<String>,
	pub append_if_not_found: bool,
}

impl MainDocumentUpdate {
	pub fn new(page_id: impl Into<String>) -> Self {
		Self {
			page_id: page_id.into(),
			section_to_update: None,
			new_content: None,
			delete_pattern: None,
			append_if_not_found: true,
		}
	}

	pub fn section(mut self, name: impl Into<String>) -> Self {
		self.section_to_update = Some(name.into());
		self
	}

	pub fn content(mut self, markdown: impl Into<String>) -> Self {
		self.new_content = Some(markdown.into());
		self
	}

	pub fn delete_matching(mut self, pattern: impl Into<String>) -> Self {
		self.delete_pattern = Some(pattern.into());
		self
	}

	pub fn append_if_not_found(mut self, append: bool) -> Self {
		self.append_if_not_found = append;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::CraftBlock;

	#[test]
	fn heading_levels() {
		let block = |text: &str| CraftBlock {
			id: "b".to_string(),
			text: text.to_string(),
		};
		assert_eq!(block("# Title").heading_level(), Some(1));
		assert_eq!(block("### Sub").heading_level(), Some(3));
		assert_eq!(block("plain text").heading_level(), None);
		assert_eq!(block("#hashtag").heading_level(), None);
		assert_eq!(block("####### too deep").heading_level(), None);
	}
}
