//! Shared records for the engram sync engine.
//!
//! This crate defines the data model exchanged between the version-control
//! client, the workspace client, the oracle, the store, and the scheduler:
//! connection records with their sync cursor, transient repository signals,
//! and the typed analysis records the oracle produces.

pub mod analysis;
pub mod connection;

pub use analysis::{
	AdrRecord, ArchitectureInfo, ChangeAnalysis, ChangeType, CommitSignificance, CoreModule,
	EngineeringTask, ImpactLevel, IssueSummary, KeyConcept, LayerInfo, OverviewInfo, RepoAnalysis,
	RepoSignals, ScopeInfo, TaskPriority, TechnicalStack, TreeEntry,
};
pub use connection::{
	CollectionIds, ConnectionRecord, Credential, OwnerUser, RepoKey, SyncHistoryEntry, SyncType,
};
