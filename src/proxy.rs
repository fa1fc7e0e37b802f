//! Authenticated request forwarding with a single retry on rejected credentials.
//!
//! [`RequestProxy::proxy`] attaches the gateway bearer token and, outside auth endpoints, the
//! user API token, then forwards the call. When the [`UpstreamStrategy`] classifies the answer as
//! an auth failure both token tiers are dropped from the session and the call is sent exactly
//! once more with freshly obtained tokens. The second answer is returned whatever it says.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

// self
use crate::{
	_prelude::*,
	auth::{GatewayAuthClient, UserAuthClient},
	config::BffConfig,
	error::{AuthError, AuthStage, ConfigError},
	http::{HeaderName, HttpTransport, OutboundRequest, X_AUTH_TOKEN},
	obs::{self, Operation, Outcome},
	store::TokenCache,
	upstream::{DefaultUpstreamStrategy, UpstreamStrategy},
};

/// Forwards [`ProxyRequest`]s to the work-order API on behalf of one session.
pub struct RequestProxy<C>
where
	C: ?Sized + HttpTransport,
{
	http_client: Arc<C>,
	user: UserAuthClient<C>,
	strategy: Arc<dyn UpstreamStrategy>,
	config: BffConfig,
}
impl<C> RequestProxy<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a proxy whose token tiers share `http_client` and the session behind `cache`.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		cache: TokenCache,
		config: &BffConfig,
	) -> Result<Self, ConfigError> {
		let http_client = http_client.into();
		let gateway = Arc::new(GatewayAuthClient::new(http_client.clone(), cache.clone(), config));
		let user = UserAuthClient::new(http_client.clone(), gateway, cache, config)?;

		Ok(Self {
			http_client,
			user,
			strategy: Arc::new(DefaultUpstreamStrategy),
			config: config.clone(),
		})
	}

	/// Replaces the upstream classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn UpstreamStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Gateway token client.
	pub fn gateway(&self) -> &GatewayAuthClient<C> {
		self.user.gateway()
	}

	/// Forwards `request`, retrying once with fresh tokens when the credentials are rejected.
	///
	/// Non-auth upstream errors (404, 500, ...) are returned as responses. Token failures and
	/// transport failures surface as errors and are never retried.
	pub async fn proxy(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
		obs::observe(Operation::Proxy, "proxy", async move {
			let first = self.send(request).await?;

			if !self.strategy.is_auth_failure(&first) {
				return Ok(first);
			}

			self.clear_tokens();
			obs::auth_retry_event(&request.path, first.status);
			obs::record_outcome(Operation::Proxy, Outcome::Retry);

			self.send(request).await
		})
		.await
	}

	/// Drops both cached token tiers for this session.
	pub fn clear_tokens(&self) {
		self.user.gateway().clear_cache();
		self.user.clear_cache();
	}

	async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
		let gateway_token = self.user.gateway().get_valid_token().await?;
		let url = self.config.endpoint(&request.path)?;
		let mut outbound = OutboundRequest::new(request.method.to_http(), url)
			.bearer(gateway_token.access_token.expose())
			.map_err(|_| AuthError::UnusableAccessToken { stage: AuthStage::Gateway })?
			.timeout(self.config.request_timeout);

		if !self.strategy.is_auth_endpoint(&request.path) {
			let api_token = self.user.get_valid_api_token().await?;

			outbound = outbound
				.header(HeaderName::from_static(X_AUTH_TOKEN), api_token.access_token.expose())
				.map_err(|_| AuthError::UnusableAccessToken { stage: AuthStage::Login })?;
		}

		outbound = match request.effective_body() {
			Some(ProxyBody::Json(value)) => outbound.json(value)?,
			Some(ProxyBody::Multipart(parts)) => outbound.multipart(parts.clone()),
			None => outbound,
		};

		let response = self.http_client.execute(outbound).await?;

		Ok(ProxyResponse::from_http(&response))
	}
}
impl<C> Debug for RequestProxy<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestProxy")
			.field("base_url", &self.config.base_url.as_str())
			.field("user", &self.user)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::VecDeque;
	// self
	use super::*;
	use crate::{
		auth::Token,
		error::TransportError,
		http::{HttpResponse, OutboundBody, StatusCode, TransportFuture, header},
		store::{CacheKey, MemorySession},
	};

	/// Replays canned responses and records every request it receives.
	#[derive(Default)]
	struct ScriptedTransport {
		responses: Mutex<VecDeque<Result<(u16, String), TransportError>>>,
		requests: Mutex<Vec<OutboundRequest>>,
	}
	impl ScriptedTransport {
		fn respond(self, status: u16, body: &str) -> Self {
			self.responses.lock().push_back(Ok((status, body.to_owned())));

			self
		}

		fn fail(self) -> Self {
			let error = TransportError::Io(std::io::Error::other("reset"));

			self.responses.lock().push_back(Err(error));

			self
		}

		fn requests(&self) -> Vec<OutboundRequest> {
			self.requests.lock().clone()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
			self.requests.lock().push(request);

			let next = self.responses.lock().pop_front();

			Box::pin(async move {
				let (status, body) = next.expect("Scripted transport ran out of responses.")?;
				let mut response = HttpResponse::new(body.into_bytes());

				*response.status_mut() =
					StatusCode::from_u16(status).expect("Scripted status should be valid.");

				Ok(response)
			})
		}
	}

	fn config() -> BffConfig {
		BffConfig::builder()
			.base_url("https://api.example.com")
			.consumer_key("key")
			.consumer_secret("secret")
			.username("user")
			.password("pass")
			.build()
			.expect("Test configuration should build.")
	}

	fn seeded_proxy(transport: ScriptedTransport) -> (RequestProxy<ScriptedTransport>, TokenCache) {
		let cache = TokenCache::new(Arc::new(MemorySession::default()));
		let now = OffsetDateTime::now_utc();

		cache.set(CacheKey::GatewayToken, &Token::new("gateway-old", 3600, now));
		cache.set(CacheKey::ApiToken, &Token::new("api-old", 3600, now));

		let proxy = RequestProxy::new(transport, cache.clone(), &config())
			.expect("Proxy should build from a valid configuration.");

		(proxy, cache)
	}

	fn header_value<'a>(request: &'a OutboundRequest, name: &str) -> Option<&'a str> {
		request.headers.get(name).and_then(|value| value.to_str().ok())
	}

	#[tokio::test]
	async fn cached_tokens_are_attached_to_resource_calls() {
		let (proxy, _) = seeded_proxy(ScriptedTransport::default().respond(200, "[]"));
		let request = ProxyRequest::new("/ao-produkt/v1/arbetsorder", HttpMethod::Get)
			.expect("Path should be accepted.");
		let response = proxy.proxy(&request).await.expect("Proxy call should succeed.");
		let requests = proxy.http_client.requests();

		assert_eq!(response.status, 200);
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].url.as_str(), "https://api.example.com/ao-produkt/v1/arbetsorder");
		assert_eq!(header_value(&requests[0], "authorization"), Some("Bearer gateway-old"));
		assert_eq!(header_value(&requests[0], X_AUTH_TOKEN), Some("api-old"));
		assert_eq!(requests[0].timeout, Some(proxy.config.request_timeout));
	}

	#[tokio::test]
	async fn every_outbound_call_carries_the_configured_timeout() {
		let transport = ScriptedTransport::default()
			.respond(200, r#"{"access_token":"gateway-new","expires_in":3600}"#)
			.respond(200, r#"{"access_token":"api-new","expires_in":3600}"#)
			.respond(200, "[]");
		let cache = TokenCache::new(Arc::new(MemorySession::default()));
		let config = BffConfig {
			request_timeout: std::time::Duration::from_millis(750),
			..config()
		};
		let proxy = RequestProxy::<ScriptedTransport>::new(transport, cache, &config)
			.expect("Proxy should build from a valid configuration.");
		let request = ProxyRequest::new("/ao-produkt/v1/arbetsorder", HttpMethod::Get)
			.expect("Path should be accepted.");

		proxy.proxy(&request).await.expect("Proxy call should succeed.");

		let requests = proxy.http_client.requests();

		assert_eq!(requests.len(), 3);
		assert!(
			requests
				.iter()
				.all(|request| request.timeout == Some(std::time::Duration::from_millis(750)))
		);
	}

	#[tokio::test]
	async fn unusable_tokens_are_blamed_on_the_issuing_tier() {
		let cache = TokenCache::new(Arc::new(MemorySession::default()));
		let now = OffsetDateTime::now_utc();
		let proxy = RequestProxy::<ScriptedTransport>::new(
			ScriptedTransport::default(),
			cache.clone(),
			&config(),
		)
		.expect("Proxy should build from a valid configuration.");
		let request = ProxyRequest::new("/ao-produkt/v1/arbetsorder", HttpMethod::Get)
			.expect("Path should be accepted.");

		cache.set(CacheKey::GatewayToken, &Token::new("gateway", 3600, now));
		cache.set(CacheKey::ApiToken, &Token::new("api\r\ntoken", 3600, now));

		let err = proxy.proxy(&request).await.expect_err("Broken API token should fail.");

		assert!(matches!(
			err,
			Error::Auth(AuthError::UnusableAccessToken { stage: AuthStage::Login })
		));

		cache.set(CacheKey::GatewayToken, &Token::new("gate\nway", 3600, now));

		let err = proxy.proxy(&request).await.expect_err("Broken gateway token should fail.");

		assert!(matches!(
			err,
			Error::Auth(AuthError::UnusableAccessToken { stage: AuthStage::Gateway })
		));
		assert!(proxy.http_client.requests().is_empty());
	}

	#[tokio::test]
	async fn auth_endpoints_skip_the_api_token() {
		let (proxy, _) = seeded_proxy(ScriptedTransport::default().respond(200, "{}"));
		let request = ProxyRequest::new("/ao-produkt/v1/auth/logout", HttpMethod::Post)
			.expect("Path should be accepted.");

		proxy.proxy(&request).await.expect("Proxy call should succeed.");

		let requests = proxy.http_client.requests();

		assert_eq!(header_value(&requests[0], "authorization"), Some("Bearer gateway-old"));
		assert_eq!(header_value(&requests[0], X_AUTH_TOKEN), None);
	}

	#[tokio::test]
	async fn rejected_credentials_are_refreshed_and_retried_once() {
		let transport = ScriptedTransport::default()
			.respond(401, r#"{"message":"Invalid JWT token"}"#)
			.respond(200, r#"{"access_token":"gateway-new","expires_in":3600}"#)
			.respond(200, r#"{"access_token":"api-new","expires_in":3600}"#)
			.respond(200, r#"[{"id":1}]"#);
		let (proxy, cache) = seeded_proxy(transport);
		let request = ProxyRequest::new("/ao-produkt/v1/arbetsorder", HttpMethod::Get)
			.expect("Path should be accepted.");
		let response = proxy.proxy(&request).await.expect("Retried call should succeed.");
		let requests = proxy.http_client.requests();

		assert_eq!(response.status, 200);
		assert_eq!(requests.len(), 4);
		assert_eq!(header_value(&requests[3], "authorization"), Some("Bearer gateway-new"));
		assert_eq!(header_value(&requests[3], X_AUTH_TOKEN), Some("api-new"));
		assert_eq!(
			cache.get(CacheKey::ApiToken).map(|token| token.access_token.expose().to_owned()),
			Some("api-new".to_owned()),
		);
	}

	#[tokio::test]
	async fn second_rejection_is_returned_without_another_retry() {
		let transport = ScriptedTransport::default()
			.respond(403, "")
			.respond(200, r#"{"access_token":"gateway-new","expires_in":3600}"#)
			.respond(200, r#"{"access_token":"api-new","expires_in":3600}"#)
			.respond(403, r#"{"error":"forbidden"}"#);
		let (proxy, _) = seeded_proxy(transport);
		let request = ProxyRequest::new("/ao-produkt/v1/arbetsorder/7", HttpMethod::Delete)
			.expect("Path should be accepted.");
		let response = proxy.proxy(&request).await.expect("Second answer should be returned.");

		assert_eq!(response.status, 403);
		assert_eq!(proxy.http_client.requests().len(), 4);
	}

	#[tokio::test]
	async fn upstream_errors_other_than_auth_are_returned_as_is() {
		let (proxy, cache) = seeded_proxy(ScriptedTransport::default().respond(404, "Not found"));
		let request = ProxyRequest::new("/ao-produkt/v1/arbetsorder/9", HttpMethod::Get)
			.expect("Path should be accepted.");
		let response = proxy.proxy(&request).await.expect("404 is a response, not an error.");

		assert_eq!(response.status, 404);
		assert_eq!(response.data, Some(ResponseData::Raw("Not found".into())));
		assert!(cache.get(CacheKey::GatewayToken).is_some());
	}

	#[tokio::test]
	async fn transport_failure_is_not_retried() {
		let (proxy, cache) = seeded_proxy(ScriptedTransport::default().fail());
		let request = ProxyRequest::new("/ao-produkt/v1/arbetsorder", HttpMethod::Get)
			.expect("Path should be accepted.");
		let err = proxy.proxy(&request).await.expect_err("Transport failure should surface.");

		assert!(matches!(err, Error::Transport(_)));
		assert_eq!(proxy.http_client.requests().len(), 1);
		assert!(cache.get(CacheKey::ApiToken).is_some());
	}

	#[tokio::test]
	async fn token_failure_aborts_before_the_resource_call() {
		let transport = ScriptedTransport::default().respond(200, "{}");
		let cache = TokenCache::new(Arc::new(MemorySession::default()));
		let proxy = RequestProxy::<ScriptedTransport>::new(transport, cache, &config())
			.expect("Proxy should build from a valid configuration.");
		let request = ProxyRequest::new("/ao-produkt/v1/arbetsorder", HttpMethod::Get)
			.expect("Path should be accepted.");
		let err = proxy.proxy(&request).await.expect_err("Missing access_token should fail.");

		assert!(matches!(
			err,
			Error::Auth(AuthError::MissingAccessToken { stage: AuthStage::Gateway })
		));
		assert_eq!(proxy.http_client.requests().len(), 1);
	}

	#[tokio::test]
	async fn json_body_is_sent_only_for_post_and_put() {
		let transport = ScriptedTransport::default().respond(201, "{}").respond(200, "{}");
		let (proxy, _) = seeded_proxy(transport);
		let body = ProxyBody::Json(serde_json::json!({ "title": "Leaking tap" }));
		let post = ProxyRequest::new("/ao-produkt/v1/arbetsorder", HttpMethod::Post)
			.expect("Path should be accepted.")
			.with_body(body.clone());
		let get = ProxyRequest::new("/ao-produkt/v1/arbetsorder", HttpMethod::Get)
			.expect("Path should be accepted.")
			.with_body(body);

		proxy.proxy(&post).await.expect("POST should succeed.");
		proxy.proxy(&get).await.expect("GET should succeed.");

		let requests = proxy.http_client.requests();

		assert_eq!(
			requests[0].headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/json"),
		);
		assert_eq!(requests[0].body, OutboundBody::Bytes(br#"{"title":"Leaking tap"}"#.to_vec()));
		assert_eq!(requests[1].body, OutboundBody::Empty);
		assert!(requests[1].headers.get(header::CONTENT_TYPE).is_none());
	}
}
