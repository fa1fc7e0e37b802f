//! Backend-for-frontend proxy for a third-party work-order API: keeps gateway and user credentials
//! on the server, caches both token tiers per session, and retries once on auth failure.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod obs;
pub mod proxy;
pub mod service;
pub mod store;
pub mod upstream;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::BffConfig,
		http::ReqwestTransport,
		proxy::RequestProxy,
		store::{MemorySession, SessionStore, TokenCache},
	};

	/// Consumer key used by test configurations.
	pub const TEST_CONSUMER_KEY: &str = "consumer-key";
	/// Consumer secret used by test configurations.
	pub const TEST_CONSUMER_SECRET: &str = "consumer-secret";
	/// Upstream username used by test configurations.
	pub const TEST_USERNAME: &str = "bff-user";
	/// Upstream password used by test configurations.
	pub const TEST_PASSWORD: &str = "bff-password";

	/// Proxy type alias used by reqwest-backed integration tests.
	pub type ReqwestTestProxy = RequestProxy<ReqwestTransport>;

	/// Builds a reqwest transport that ignores proxy environment variables so requests always
	/// reach the local `httpmock` server.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.no_proxy()
			.build()
			.expect("Failed to build Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Builds a configuration pointing every endpoint at `base_url`.
	pub fn test_config(base_url: &str) -> BffConfig {
		BffConfig::builder()
			.base_url(base_url)
			.consumer_key(TEST_CONSUMER_KEY)
			.consumer_secret(TEST_CONSUMER_SECRET)
			.username(TEST_USERNAME)
			.password(TEST_PASSWORD)
			.build()
			.expect("Test configuration should build successfully.")
	}

	/// Constructs a [`RequestProxy`] backed by an in-memory session and the reqwest transport
	/// used across integration tests.
	pub fn build_reqwest_test_proxy(config: &BffConfig) -> (ReqwestTestProxy, Arc<MemorySession>) {
		let session_backend = Arc::new(MemorySession::default());
		let session: Arc<dyn SessionStore> = session_backend.clone();
		let proxy = RequestProxy::new(test_reqwest_transport(), TokenCache::new(session), config)
			.expect("Test proxy should build from the test configuration.");

		(proxy, session_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
