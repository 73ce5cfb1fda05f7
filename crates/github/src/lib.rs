//! Typed wrapper over the GitHub REST API.
//!
//! Every operation is a thin, explicitly-typed call; transport faults are
//! classified into retryable and terminal variants so the scheduler can
//! decide whether to back off or surface the failure.

mod client;
mod error;
mod types;

pub use client::GithubClient;
pub use error::GithubError;
pub use types::{
	CommitInfo, CommitStats, FileChange, PrComment, PrDetail, PrReview, PrSummary, RepoSummary,
};
