//! The sync engine: materialisation, change processing and scheduling.
//!
//! This crate owns all state transitions for connected repositories. The
//! [`Materialiser`] drives the one-shot pipeline that creates an
//! Engineering Brain in the workspace; the [`ChangeProcessor`] turns
//! merged pull requests and direct commits into targeted workspace
//! mutations; the [`engine::SyncService`] schedules per-connection sync
//! cycles with strict per-key serialisation, reconciles local records
//! against the remote workspace, and owns the cursor.

pub mod changes;
pub mod clients;
pub mod collections;
pub mod engine;
mod error;
mod markdown;
pub mod materialise;

#[cfg(test)]
mod tests;

pub use changes::ChangeProcessor;
pub use clients::{CraftApi, CraftFactory, OracleApi, RestVcsFactory, ToolCraftFactory, VcsApi, VcsFactory};
pub use engine::{CycleReport, EngineConfig, SyncHandle, SyncService, SyncStatus};
pub use error::SyncError;
pub use materialise::{MaterialiseRequest, MaterialiseResult, Materialiser};
