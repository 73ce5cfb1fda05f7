//! The workspace client and its document, block and collection operations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use regex::RegexBuilder;
use serde_json::{Value, json};
use url::Url;

use crate::error::CraftError;
use crate::rpc::{extract_collection_id, parse_reply, unwrap_envelope};
use crate::types::{
	CollectionSchema, CraftBlock, DocumentProbe, DocumentRef, MainDocumentUpdate, Position,
};

const CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Client bound to one workspace endpoint.
///
/// Constructed fresh per connection per cycle; holds no state beyond the
/// endpoint and a request-id counter.
pub struct CraftClient {
	http: reqwest::Client,
	endpoint: Url,
	next_id: AtomicU64,
}

impl CraftClient {
	pub fn new(endpoint: &str) -> Result<Self, CraftError> {
		let endpoint =
			Url::parse(endpoint).map_err(|err| CraftError::InvalidEndpoint(err.to_string()))?;
		let http = reqwest::Client::builder()
			.timeout(CALL_TIMEOUT)
			.build()?;
		Ok(Self {
			http,
			endpoint,
			next_id: AtomicU64::new(1),
		})
	}

	/// Invokes one tool and returns its unwrapped result.
	async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, CraftError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let envelope = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": "tools/call",
			"params": {"name": tool, "arguments": arguments},
		});
		let resp = self
			.http
			.post(self.endpoint.clone())
			.header("Accept", "application/json, text/event-stream")
			.json(&envelope)
			.send()
			.await?;
		let status = resp.status().as_u16();
		if !resp.status().is_success() {
			return Err(CraftError::Transport {
				status,
				retryable: status >= 500 || status == 429,
				message: format!("{tool} failed"),
			});
		}
		let body = resp.text().await?;
		unwrap_envelope(parse_reply(&body)?)
	}

	/// All documents in the workspace. Authoritative, unlike search.
	pub async fn list_documents(&self) -> Result<Vec<DocumentRef>, CraftError> {
		let result = self.call_tool("documents_list", json!({})).await?;
		Ok(parse_document_refs(&result))
	}

	/// Search-index lookup. May lag the canonical state; fallback only.
	pub async fn search_documents(&self, query: &str) -> Result<Vec<DocumentRef>, CraftError> {
		let result = self
			.call_tool("documents_search", json!({"query": query}))
			.await?;
		Ok(parse_document_refs(&result))
	}

	/// Probes for a document by exact title, case-insensitively.
	///
	/// `documents_list` is the ground truth; the search index is consulted
	/// only when the list call itself fails.
	pub async fn document_exists(&self, title: &str) -> Result<DocumentProbe, CraftError> {
		let docs = match self.list_documents().await {
			Ok(docs) => docs,
			Err(err) => {
				tracing::warn!(error = %err, "documents_list failed, falling back to search");
				self.search_documents(title).await?
			}
		};
		let hit = docs
			.into_iter()
			.find(|doc| doc.title.eq_ignore_ascii_case(title));
		Ok(match hit {
			Some(doc) => DocumentProbe::Found(doc),
			None => DocumentProbe::Absent,
		})
	}

	/// Creates a root-level document and returns its id.
	pub async fn create_document(&self, title: &str) -> Result<String, CraftError> {
		let result = self
			.call_tool(
				"documents_create",
				json!({"documents": [{"title": title, "location": "root"}]}),
			)
			.await?;
		let id = result
			.get("documents")
			.and_then(|d| d.as_array())
			.and_then(|d| d.first())
			.and_then(|d| d.get("id"))
			.or_else(|| result.as_array().and_then(|a| a.first()).and_then(|d| d.get("id")))
			.or_else(|| result.get("id"))
			.and_then(|id| id.as_str());
		match id {
			Some(id) if !id.is_empty() => Ok(id.to_string()),
			_ => Err(CraftError::Protocol(format!(
				"no document id in create reply: {result}"
			))),
		}
	}

	pub async fn delete_document(&self, document_id: &str) -> Result<(), CraftError> {
		self.call_tool("documents_delete", json!({"documentIds": [document_id]}))
			.await?;
		Ok(())
	}

	/// Appends markdown to a page.
	pub async fn append_markdown(
		&self,
		page_id: &str,
		markdown: &str,
		position: Position,
	) -> Result<(), CraftError> {
		self.call_tool(
			"markdown_add",
			json!({
				"markdown": markdown,
				"position": {"pageId": page_id, "position": position.as_str()},
			}),
		)
		.await?;
		Ok(())
	}

	/// All blocks of a page, text normalised.
	pub async fn get_blocks(&self, page_id: &str) -> Result<Vec<CraftBlock>, CraftError> {
		let result = self.call_tool("blocks_get", json!({"pageId": page_id})).await?;
		let items = result
			.as_array()
			.cloned()
			.or_else(|| result.get("blocks").and_then(|b| b.as_array()).cloned())
			.unwrap_or_default();
		Ok(items
			.iter()
			.filter_map(|item| {
				let id = item.get("id").and_then(|id| id.as_str())?;
				let text = ["content", "text", "markdown"]
					.iter()
					.find_map(|key| item.get(*key).and_then(|t| t.as_str()))
					.unwrap_or("");
				Some(CraftBlock {
					id: id.to_string(),
					text: text.to_string(),
				})
			})
			.collect())
	}

	pub async fn update_block(&self, block_id: &str, content: &str) -> Result<(), CraftError> {
		self.call_tool(
			"blocks_update",
			json!({"blockId": block_id, "content": content}),
		)
		.await?;
		Ok(())
	}

	pub async fn delete_block(&self, block_id: &str) -> Result<(), CraftError> {
		self.call_tool("blocks_delete", json!({"blockId": block_id}))
			.await?;
		Ok(())
	}

	/// Creates a collection with its schema at the end of a page and
	/// returns the extracted collection id.
	pub async fn create_collection(
		&self,
		page_id: &str,
		name: &str,
		schema: &CollectionSchema,
	) -> Result<String, CraftError> {
		let result = self
			.call_tool(
				"collections_create",
				json!({
					"name": name,
					"schema": schema.to_value(),
					"position": {"pageId": page_id, "position": Position::End.as_str()},
				}),
			)
			.await?;
		extract_collection_id(&result)
	}

	/// Appends items to a collection. Items must use the collection's
	/// content-property key; the remote drops mismatched items silently.
	pub async fn add_collection_items(
		&self,
		collection_id: &str,
		items: &[Value],
	) -> Result<(), CraftError> {
		self.call_tool(
			"collectionItems_add",
			json!({"collectionBlockId": collection_id, "items": items}),
		)
		.await?;
		Ok(())
	}

	/// Applies a targeted partial update to the main document.
	pub async fn update_main_document(
		&self,
		update: &MainDocumentUpdate,
	) -> Result<(), CraftError> {
		let blocks = self.get_blocks(&update.page_id).await?;

		if let Some(pattern) = &update.delete_pattern {
			let matcher = RegexBuilder::new(pattern)
				.case_insensitive(true)
				.build()
				.map_err(|err| CraftError::Protocol(format!("bad delete pattern: {err}")))?;
			for block in blocks.iter().filter(|b| matcher.is_match(&b.text)) {
				if let Err(err) = self.delete_block(&block.id).await {
					tracing::warn!(block = %block.id, error = %err, "block delete failed");
				}
			}
		}

		let Some(new_content) = &update.new_content else {
			return Ok(());
		};

		if let Some(section) = &update.section_to_update {
			let needle = section.to_ascii_lowercase();
			if let Some(block) = blocks
				.iter()
				.find(|b| b.text.to_ascii_lowercase().contains(&needle))
			{
				return self.update_block(&block.id, new_content).await;
			}
		}

		if update.append_if_not_found {
			return self
				.append_markdown(&update.page_id, new_content, Position::End)
				.await;
		}
		Ok(())
	}

	/// Replaces a whole section: deletes the heading matching
	/// `section_name` and every contiguous block under it until a heading
	/// of the same or higher level, then appends the new markdown.
	pub async fn regenerate_section(
		&self,
		page_id: &str,
		section_name: &str,
		new_markdown: &str,
	) -> Result<(), CraftError> {
		let blocks = self.get_blocks(page_id).await?;
		for block_id in section_block_ids(&blocks, section_name) {
			if let Err(err) = self.delete_block(&block_id).await {
				tracing::warn!(block = %block_id, error = %err, "section block delete failed");
			}
		}
		self.append_markdown(page_id, new_markdown, Position::End)
			.await
	}
}

/// Ids of the heading matching `section_name` plus its descendant blocks.
fn section_block_ids(blocks: &[CraftBlock], section_name: &str) -> Vec<String> {
	let needle = section_name.to_ascii_lowercase();
	let Some(start) = blocks.iter().position(|b| {
		b.heading_level().is_some() && b.text.to_ascii_lowercase().contains(&needle)
	}) else {
		return Vec::new();
	};
	let level = blocks[start].heading_level().unwrap_or(1);

	let mut ids = vec![blocks[start].id.clone()];
	for block in &blocks[start + 1..] {
		if block.heading_level().is_some_and(|l| l <= level) {
			break;
		}
		ids.push(block.id.clone());
	}
	ids
}

fn parse_document_refs(result: &Value) -> Vec<DocumentRef> {
	let items = result
		.as_array()
		.cloned()
		.or_else(|| result.get("documents").and_then(|d| d.as_array()).cloned())
		.unwrap_or_default();
	items
		.iter()
		.filter_map(|item| {
			let id = item.get("id").and_then(|id| id.as_str())?;
			let title = item.get("title").and_then(|t| t.as_str())?;
			Some(DocumentRef {
				id: id.to_string(),
				title: title.to_string(),
			})
		})
		.collect()
}
