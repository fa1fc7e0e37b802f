//! OAuth2 client-credentials tier: admission tokens for the API gateway.
//!
//! [`GatewayAuthClient::get_valid_token`] serves the session-cached token while it is outside
//! the 60-second expiry buffer and only calls the token endpoint when the cached token is
//! missing or about to expire. The buffer keeps a token from lapsing halfway through a call
//! chain that depends on it (the user login is itself gated by this token).

// std
use std::time::Duration as StdDuration;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::{Secret, Token, token},
	config::BffConfig,
	error::{AuthError, AuthStage, ConfigError},
	http::{HttpTransport, Method, OutboundRequest, header},
	obs::{self, Operation},
	store::{CacheKey, TokenCache},
};

/// Safety margin subtracted from the gateway token lifetime.
pub const GATEWAY_EXPIRY_BUFFER: Duration = Duration::seconds(60);

const GRANT_FORM: &str = "grant_type=client_credentials";

/// Client-credentials token client bound to one session cache.
pub struct GatewayAuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	http_client: Arc<C>,
	cache: TokenCache,
	token_endpoint: Url,
	consumer_key: String,
	consumer_secret: Secret,
	request_timeout: StdDuration,
	refresh_guard: AsyncMutex<()>,
}
impl<C> GatewayAuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that caches tokens in `cache`.
	pub fn new(http_client: impl Into<Arc<C>>, cache: TokenCache, config: &BffConfig) -> Self {
		Self {
			http_client: http_client.into(),
			cache,
			token_endpoint: config.token_endpoint.clone(),
			consumer_key: config.consumer_key.clone(),
			consumer_secret: config.consumer_secret.clone(),
			request_timeout: config.request_timeout,
			refresh_guard: AsyncMutex::new(()),
		}
	}

	/// Returns `true` when `token` should no longer be used at `now`.
	pub fn is_expired_at(token: &Token, now: OffsetDateTime) -> bool {
		token.is_expired_at(now, GATEWAY_EXPIRY_BUFFER)
	}

	/// Returns the cached token, obtaining and caching a fresh one when needed.
	///
	/// Concurrent callers sharing this client wait on a guard and re-check the cache, so only
	/// one of them reaches the token endpoint.
	pub async fn get_valid_token(&self) -> Result<Token> {
		if let Some(current) = self.cached() {
			return Ok(current);
		}

		let _singleflight = self.refresh_guard.lock().await;

		if let Some(current) = self.cached() {
			return Ok(current);
		}

		let token = self.obtain_token().await?;

		self.cache.set(CacheKey::GatewayToken, &token);

		Ok(token)
	}

	/// Requests a new token from the token endpoint without touching the cache.
	pub async fn obtain_token(&self) -> Result<Token> {
		obs::observe(Operation::GatewayToken, "obtain_token", async move {
			let request = OutboundRequest::new(Method::POST, self.token_endpoint.clone())
				.header(header::AUTHORIZATION, self.basic_credentials())
				.map_err(|_| ConfigError::InvalidHeaderValue { header: "authorization" })?
				.form(GRANT_FORM)
				.timeout(self.request_timeout);
			let response = self
				.http_client
				.execute(request)
				.await
				.map_err(|source| AuthError::Unreachable { stage: AuthStage::Gateway, source })?;

			Ok(token::decode_token_response(
				AuthStage::Gateway,
				&response,
				OffsetDateTime::now_utc(),
			)?)
		})
		.await
	}

	/// Drops the cached token so the next call re-authenticates.
	pub fn clear_cache(&self) {
		self.cache.clear(CacheKey::GatewayToken);
	}

	fn cached(&self) -> Option<Token> {
		self.cache
			.get(CacheKey::GatewayToken)
			.filter(|token| !Self::is_expired_at(token, OffsetDateTime::now_utc()))
	}

	fn basic_credentials(&self) -> String {
		let pair = format!("{}:{}", self.consumer_key, self.consumer_secret.expose());

		format!("Basic {}", STANDARD.encode(pair))
	}
}
impl<C> Debug for GatewayAuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GatewayAuthClient")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("consumer_key", &self.consumer_key)
			.field("consumer_secret_set", &!self.consumer_secret.is_empty())
			.finish()
	}
}
