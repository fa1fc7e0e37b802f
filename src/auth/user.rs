//! Username/password tier: user-scoped API tokens, gated behind a gateway token.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{GatewayAuthClient, Secret, Token, token},
	config::BffConfig,
	error::{AuthError, AuthStage, ConfigError},
	http::{HttpTransport, Method, OutboundRequest},
	obs::{self, Operation},
	store::{CacheKey, TokenCache},
};

/// Login path appended to the base URL.
pub const LOGIN_PATH: &str = "/ao-produkt/v1/auth/login";

#[derive(Serialize)]
struct LoginRequest<'a> {
	username: &'a str,
	password: &'a str,
}

/// Login client producing user API tokens.
///
/// Holds a shared handle to the [`GatewayAuthClient`] whose token admits the login call; the
/// two tiers keep independent cache entries and are cleared independently.
pub struct UserAuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	http_client: Arc<C>,
	gateway: Arc<GatewayAuthClient<C>>,
	cache: TokenCache,
	login_url: Url,
	username: String,
	password: Secret,
	request_timeout: StdDuration,
	login_guard: AsyncMutex<()>,
}
impl<C> UserAuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that logs in through `gateway` and caches tokens in `cache`.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		gateway: Arc<GatewayAuthClient<C>>,
		cache: TokenCache,
		config: &BffConfig,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			http_client: http_client.into(),
			gateway,
			cache,
			login_url: config.endpoint(LOGIN_PATH)?,
			username: config.username.clone(),
			password: config.password.clone(),
			request_timeout: config.request_timeout,
			login_guard: AsyncMutex::new(()),
		})
	}

	/// Returns `true` when `token` has reached its exact expiry at `now`.
	pub fn is_expired_at(token: &Token, now: OffsetDateTime) -> bool {
		token.is_expired_at(now, Duration::ZERO)
	}

	/// Returns the cached API token, logging in again when it is missing or expired.
	pub async fn get_valid_api_token(&self) -> Result<Token> {
		if let Some(current) = self.cached() {
			return Ok(current);
		}

		let _singleflight = self.login_guard.lock().await;

		if let Some(current) = self.cached() {
			return Ok(current);
		}

		let token = self.login().await?;

		self.cache.set(CacheKey::ApiToken, &token);

		Ok(token)
	}

	/// Logs in with the configured username and password without touching the API token cache.
	///
	/// Obtains (or reuses) a gateway token first; a gateway failure aborts the login.
	pub async fn login(&self) -> Result<Token> {
		obs::observe(Operation::ApiLogin, "login", async move {
			let gateway_token = self.gateway.get_valid_token().await?;
			let payload =
				LoginRequest { username: &self.username, password: self.password.expose() };
			let request = OutboundRequest::new(Method::POST, self.login_url.clone())
				.bearer(gateway_token.access_token.expose())
				.map_err(|_| AuthError::UnusableAccessToken { stage: AuthStage::Gateway })?
				.json(&payload)?
				.timeout(self.request_timeout);
			let response = self
				.http_client
				.execute(request)
				.await
				.map_err(|source| AuthError::Unreachable { stage: AuthStage::Login, source })?;

			Ok(token::decode_token_response(
				AuthStage::Login,
				&response,
				OffsetDateTime::now_utc(),
			)?)
		})
		.await
	}

	/// Drops the cached API token; the gateway token is left alone.
	pub fn clear_cache(&self) {
		self.cache.clear(CacheKey::ApiToken);
	}

	/// Gateway client this login depends on.
	pub fn gateway(&self) -> &GatewayAuthClient<C> {
		&self.gateway
	}

	fn cached(&self) -> Option<Token> {
		self.cache
			.get(CacheKey::ApiToken)
			.filter(|token| !Self::is_expired_at(token, OffsetDateTime::now_utc()))
	}
}
impl<C> Debug for UserAuthClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserAuthClient")
			.field("login_url", &self.login_url.as_str())
			.field("username", &self.username)
			.field("password_set", &!self.password.is_empty())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{error::TransportError, http::TransportFuture, store::MemorySession};

	struct NoopTransport;
	impl HttpTransport for NoopTransport {
		fn execute(&self, _request: OutboundRequest) -> TransportFuture<'_> {
			Box::pin(async { Err(TransportError::Io(std::io::Error::other("offline"))) })
		}
	}

	#[test]
	fn expiry_is_exact_without_buffer() {
		let now = OffsetDateTime::now_utc();
		let token = Token::new("t", 600, now - Duration::seconds(600));

		assert!(UserAuthClient::<NoopTransport>::is_expired_at(&token, now));
		assert!(!UserAuthClient::<NoopTransport>::is_expired_at(
			&token,
			now - Duration::seconds(1)
		));
	}

	#[test]
	fn login_payload_serializes_credentials() {
		let payload = LoginRequest { username: "user", password: "pass" };

		assert_eq!(
			serde_json::to_value(&payload).expect("Login payload should serialize."),
			serde_json::json!({ "username": "user", "password": "pass" }),
		);
	}

	#[tokio::test]
	async fn gateway_token_that_breaks_headers_is_blamed_on_the_gateway() {
		let config = BffConfig::builder()
			.base_url("https://api.example.com")
			.consumer_key("key")
			.consumer_secret("secret")
			.build()
			.expect("Test configuration should build.");
		let cache = TokenCache::new(Arc::new(MemorySession::default()));
		let transport = Arc::new(NoopTransport);
		let gateway = Arc::new(GatewayAuthClient::<NoopTransport>::new(
			transport.clone(),
			cache.clone(),
			&config,
		));
		let user = UserAuthClient::<NoopTransport>::new(transport, gateway, cache.clone(), &config)
			.expect("User client should build.");

		cache.set(
			CacheKey::GatewayToken,
			&Token::new("gateway\ntoken", 3600, OffsetDateTime::now_utc()),
		);

		let err = user.get_valid_api_token().await.expect_err("Login must not be attempted.");

		assert!(matches!(
			err,
			Error::Auth(AuthError::UnusableAccessToken { stage: AuthStage::Gateway })
		));
		assert!(cache.get(CacheKey::ApiToken).is_none());
	}
}
