//! Service configuration: the validated [`BffConfig`] and the raw [`BffSettings`] a host supplies.

// std
use std::{path::PathBuf, time::Duration as StdDuration};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Path appended to the base URL when no OAuth2 token endpoint is configured.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/token";
/// Outbound request timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Validated configuration consumed by the auth clients and the proxy.
#[derive(Clone)]
pub struct BffConfig {
	/// Upstream API base URL; proxied paths are appended to it verbatim.
	pub base_url: Url,
	/// OAuth2 client-credentials token endpoint.
	pub token_endpoint: Url,
	/// OAuth2 consumer key.
	pub consumer_key: String,
	/// OAuth2 consumer secret.
	pub consumer_secret: Secret,
	/// Upstream API username.
	pub username: String,
	/// Upstream API password.
	pub password: Secret,
	/// Timeout applied to every outbound call.
	pub request_timeout: StdDuration,
}
impl BffConfig {
	/// Returns a builder for validated configurations.
	pub fn builder() -> BffConfigBuilder {
		BffConfigBuilder::default()
	}

	/// Resolves `path` against the base URL by plain concatenation.
	///
	/// A single `/` is inserted when the path does not start with one, and trailing slashes on
	/// the base URL are collapsed, so `https://api.example/v1/` + `items` yields
	/// `https://api.example/v1/items`.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		join_base(&self.base_url, path)
			.map_err(|source| ConfigError::InvalidUrl { setting: "path", source })
	}
}
impl Debug for BffConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BffConfig")
			.field("base_url", &self.base_url.as_str())
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("consumer_key", &self.consumer_key)
			.field("consumer_secret", &self.consumer_secret)
			.field("username", &self.username)
			.field("password", &self.password)
			.field("request_timeout", &self.request_timeout)
			.finish()
	}
}

/// Builder for [`BffConfig`] values.
#[derive(Clone, Default)]
pub struct BffConfigBuilder {
	base_url: Option<String>,
	token_endpoint: Option<String>,
	consumer_key: Option<String>,
	consumer_secret: Option<String>,
	username: Option<String>,
	password: Option<String>,
	request_timeout: Option<StdDuration>,
}
impl BffConfigBuilder {
	/// Sets the upstream API base URL.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());

		self
	}

	/// Sets the OAuth2 token endpoint; defaults to `<base_url>/oauth2/token`.
	pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
		self.token_endpoint = Some(url.into());

		self
	}

	/// Sets the OAuth2 consumer key.
	pub fn consumer_key(mut self, key: impl Into<String>) -> Self {
		self.consumer_key = Some(key.into());

		self
	}

	/// Sets the OAuth2 consumer secret.
	pub fn consumer_secret(mut self, secret: impl Into<String>) -> Self {
		self.consumer_secret = Some(secret.into());

		self
	}

	/// Sets the upstream API username.
	pub fn username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Sets the upstream API password.
	pub fn password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(password.into());

		self
	}

	/// Overrides the outbound request timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<BffConfig, ConfigError> {
		let base_url = required("base_url", self.base_url)?;
		let consumer_key = required("consumer_key", self.consumer_key)?;
		let consumer_secret = required("consumer_secret", self.consumer_secret)?;
		let base_url = Url::parse(base_url.trim())
			.map_err(|source| ConfigError::InvalidUrl { setting: "base_url", source })?;
		let token_endpoint = match self.token_endpoint.filter(|value| !value.trim().is_empty()) {
			Some(endpoint) => Url::parse(endpoint.trim()),
			None => join_base(&base_url, DEFAULT_TOKEN_PATH),
		}
		.map_err(|source| ConfigError::InvalidUrl { setting: "oauth2_token_endpoint", source })?;

		Ok(BffConfig {
			base_url,
			token_endpoint,
			consumer_key,
			consumer_secret: Secret::new(consumer_secret),
			username: self.username.unwrap_or_default(),
			password: Secret::new(self.password.unwrap_or_default()),
			request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
		})
	}
}
impl Debug for BffConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BffConfigBuilder")
			.field("base_url", &self.base_url)
			.field("token_endpoint", &self.token_endpoint)
			.field("consumer_key", &self.consumer_key)
			.field("consumer_secret_set", &self.consumer_secret.is_some())
			.field("username", &self.username)
			.field("password_set", &self.password.is_some())
			.field("request_timeout", &self.request_timeout)
			.finish()
	}
}

/// Flat settings blob as a host stores it (module parameters, a config file section, env).
///
/// Every field defaults to empty so partially configured hosts deserialize cleanly; validation
/// happens in [`BffSettings::to_config`].
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct BffSettings {
	/// Upstream API base URL.
	pub base_url: String,
	/// OAuth2 token endpoint; empty means `<base_url>/oauth2/token`.
	pub oauth2_token_endpoint: String,
	/// OAuth2 consumer key.
	pub consumer_key: String,
	/// OAuth2 consumer secret.
	pub consumer_secret: String,
	/// Upstream API username.
	pub username: String,
	/// Upstream API password.
	pub password: String,
	/// Outbound request timeout in seconds.
	pub request_timeout_secs: Option<u64>,
	/// Enables the request/response audit log.
	pub log_enabled: bool,
	/// Directory for audit log files; defaults to the OS temp directory.
	pub log_directory: Option<PathBuf>,
}
impl BffSettings {
	/// Validates the settings into a [`BffConfig`].
	pub fn to_config(&self) -> Result<BffConfig, ConfigError> {
		BffConfig::builder()
			.base_url(&self.base_url)
			.token_endpoint(&self.oauth2_token_endpoint)
			.consumer_key(&self.consumer_key)
			.consumer_secret(&self.consumer_secret)
			.username(&self.username)
			.password(&self.password)
			.request_timeout(self.request_timeout())
			.build()
	}

	/// Outbound timeout; zero or unset falls back to [`DEFAULT_REQUEST_TIMEOUT`].
	pub fn request_timeout(&self) -> StdDuration {
		self.request_timeout_secs
			.filter(|secs| *secs > 0)
			.map_or(DEFAULT_REQUEST_TIMEOUT, StdDuration::from_secs)
	}
}
impl Debug for BffSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BffSettings")
			.field("base_url", &self.base_url)
			.field("oauth2_token_endpoint", &self.oauth2_token_endpoint)
			.field("consumer_key", &self.consumer_key)
			.field("consumer_secret_set", &!self.consumer_secret.is_empty())
			.field("username", &self.username)
			.field("password_set", &!self.password.is_empty())
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("log_enabled", &self.log_enabled)
			.field("log_directory", &self.log_directory)
			.finish()
	}
}

fn required(setting: &'static str, value: Option<String>) -> Result<String, ConfigError> {
	value.filter(|value| !value.trim().is_empty()).ok_or(ConfigError::MissingSetting { setting })
}

fn join_base(base: &Url, path: &str) -> Result<Url, url::ParseError> {
	let base = base.as_str().trim_end_matches('/');

	if path.starts_with('/') {
		Url::parse(&format!("{base}{path}"))
	} else {
		Url::parse(&format!("{base}/{path}"))
	}
}
