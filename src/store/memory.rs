//! Thread-safe in-memory [`SessionStore`] for single-process hosts and tests.

// self
use crate::{_prelude::*, store::SessionStore};

/// Session store that keeps values in-process; create one per user session.
#[derive(Clone, Debug, Default)]
pub struct MemorySession(Arc<RwLock<HashMap<String, Value>>>);
impl MemorySession {
	/// Returns `true` when a value is stored under `key`.
	pub fn contains(&self, key: &str) -> bool {
		self.0.read().contains_key(key)
	}

	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when the session holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl SessionStore for MemorySession {
	fn get(&self, key: &str) -> Option<Value> {
		self.0.read().get(key).cloned()
	}

	fn set(&self, key: &str, value: Value) {
		self.0.write().insert(key.to_owned(), value);
	}

	fn clear(&self, key: &str) {
		self.0.write().remove(key);
	}
}
