//! Session-scoped token caching on top of a caller-provided session store.

pub mod memory;

pub use memory::MemorySession;

// self
use crate::{_prelude::*, auth::Token};

/// Session-like key/value storage owned by the host (one instance per user session).
///
/// Values are plain JSON so any host session mechanism can hold them. Implementations must not
/// share entries across sessions.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if any.
	fn get(&self, key: &str) -> Option<Value>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: Value);

	/// Removes the value stored under `key`.
	fn clear(&self, key: &str);
}

/// Fixed namespace identifiers, one per credential tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
	/// OAuth2 gateway token.
	GatewayToken,
	/// User-scoped API token.
	ApiToken,
}
impl CacheKey {
	/// Returns the session key the token is stored under.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheKey::GatewayToken => "workorder_bff.oauth2_token",
			CacheKey::ApiToken => "workorder_bff.api_token",
		}
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Typed get/set/clear for [`Token`] values in a [`SessionStore`].
///
/// The cache never fails: an entry that no longer deserializes is treated as absent and a token
/// that cannot be serialized is simply not cached.
#[derive(Clone)]
pub struct TokenCache(Arc<dyn SessionStore>);
impl TokenCache {
	/// Binds the cache to a session store.
	pub fn new(session: Arc<dyn SessionStore>) -> Self {
		Self(session)
	}

	/// Returns the cached token for `key`, if present and readable.
	pub fn get(&self, key: CacheKey) -> Option<Token> {
		let value = self.0.get(key.as_str())?;

		serde_json::from_value(value).ok()
	}

	/// Caches `token` under `key`, replacing the previous token wholesale.
	pub fn set(&self, key: CacheKey, token: &Token) {
		if let Ok(value) = serde_json::to_value(token) {
			self.0.set(key.as_str(), value);
		}
	}

	/// Drops the token cached under `key`.
	pub fn clear(&self, key: CacheKey) {
		self.0.clear(key.as_str());
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenCache(..)")
	}
}
