//! File-backed JSON fallback used when the database cannot be opened.

use std::path::Path;

use engram_proto::ConnectionRecord;

use crate::error::StoreError;

pub(crate) fn load(path: &Path) -> Result<Vec<ConnectionRecord>, StoreError> {
	if !path.exists() {
		return Ok(Vec::new());
	}
	let raw = std::fs::read_to_string(path)?;
	if raw.trim().is_empty() {
		return Ok(Vec::new());
	}
	Ok(serde_json::from_str(&raw)?)
}

/// Writes the whole record set atomically via a sibling temp file.
pub(crate) fn save(path: &Path, records: &[ConnectionRecord]) -> Result<(), StoreError> {
	if let Some(parent) = path.parent()
		&& !parent.as_os_str().is_empty()
		&& !parent.exists()
	{
		std::fs::create_dir_all(parent)?;
	}
	let tmp = path.with_extension("json.tmp");
	std::fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
	std::fs::rename(&tmp, path)?;
	Ok(())
}
