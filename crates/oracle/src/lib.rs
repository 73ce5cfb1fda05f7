//! Language-model facade.
//!
//! One request-response client: format a prompt, call the provider, pull
//! the first balanced JSON object out of the reply, repair the defects
//! models habitually produce, and pin the result to a typed record. A
//! reply that cannot be coaxed into JSON at all is a recoverable
//! [`OracleError::Parse`]; callers substitute a degraded record and mark
//! the downstream operation advisory-only.

mod client;
mod error;
mod parse;
mod prompts;
mod repair;

pub use client::{OracleClient, OracleConfig};
pub use error::OracleError;
pub use parse::{change_analysis_from_value, commit_significance_from_value, repo_analysis_from_value};
pub use repair::{extract_and_repair, repair};
