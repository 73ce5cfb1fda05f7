//! Client for the Craft workspace tool protocol.
//!
//! The remote speaks JSON-RPC 2.0 over HTTP with replies framed as
//! server-sent events (`event: message\ndata: <json>`). This crate strips
//! the framing, pins the historically inconsistent reply shapes to typed
//! results, and layers the targeted block-mutation operations the change
//! processor needs on top of the raw tool calls.

mod client;
mod error;
mod rpc;
mod types;

pub use client::CraftClient;
pub use error::CraftError;
pub use rpc::extract_collection_id;
pub use types::{
	CollectionSchema, CraftBlock, DocumentProbe, DocumentRef, MainDocumentUpdate, Position,
	PropertyDef, PropertyKind,
};
