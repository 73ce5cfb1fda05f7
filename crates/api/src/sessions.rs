//! Process-scoped session registry.
//!
//! The OAuth dance that mints sessions lives outside this system; the
//! API only resolves a session id to the user and credential behind it.
//! Explicitly constructed and owned by the binary, never module state.

use std::collections::HashMap;

use engram_proto::{Credential, OwnerUser};
use parking_lot::RwLock;

/// The user and provider credential behind one session id.
#[derive(Debug, Clone)]
pub struct SessionUser {
	pub credential: Credential,
	pub user: OwnerUser,
}

/// In-memory session registry.
#[derive(Default)]
pub struct Sessions {
	inner: RwLock<HashMap<String, SessionUser>>,
}

impl Sessions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, session_id: impl Into<String>, user: SessionUser) {
		self.inner.write().insert(session_id.into(), user);
	}

	pub fn resolve(&self, session_id: &str) -> Option<SessionUser> {
		self.inner.read().get(session_id).cloned()
	}

	pub fn remove(&self, session_id: &str) {
		self.inner.write().remove(session_id);
	}
}

#[cfg(test)]
mod tests {
	use engram_proto::{Credential, OwnerUser};

	use super::{SessionUser, Sessions};

	#[test]
	fn resolve_roundtrip() {
		let sessions = Sessions::new();
		assert!(sessions.resolve("s1").is_none());

		sessions.insert(
			"s1",
			SessionUser {
				credential: Credential::new("token"),
				user: OwnerUser {
					id: 7,
					login: "octocat".to_string(),
					display_name: None,
					email: None,
				},
			},
		);
		assert_eq!(sessions.resolve("s1").expect("resolve").user.login, "octocat");

		sessions.remove("s1");
		assert!(sessions.resolve("s1").is_none());
	}
}
