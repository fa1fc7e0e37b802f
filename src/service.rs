//! Inbound boundary: turns a browser-side proxy call into a uniform [`ProxyEnvelope`].
//!
//! Validation runs in a fixed order so caller mistakes never cost a network round trip: the
//! path first, then the method, then the configured credentials. Only then is a
//! [`RequestProxy`] bound to the caller's session and invoked. Every failure, whatever its
//! class, is reported as `{ success: false, error }`.

// self
use crate::{
	_prelude::*,
	config::BffSettings,
	filter::{self, ConfidentialFilter},
	http::HttpTransport,
	obs::AuditLogger,
	proxy::{ProxyBody, ProxyRequest, ProxyResponse, RequestProxy},
	store::{SessionStore, TokenCache},
	upstream::{DefaultUpstreamStrategy, UpstreamStrategy},
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport};

/// Method assumed when the caller omits one.
pub const DEFAULT_METHOD: &str = "GET";

/// Proxy call as received from the browser widget.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InboundRequest {
	/// Upstream path; empty means missing.
	pub path: String,
	/// Method name; `None` means `GET`.
	pub http_method: Option<String>,
	/// Body for POST and PUT.
	pub body: Option<ProxyBody>,
	/// Name of the signed-in user, recorded in the audit log.
	pub user: Option<String>,
}
impl InboundRequest {
	/// Creates a `GET` request for `path`.
	pub fn new(path: impl Into<String>) -> Self {
		Self { path: path.into(), ..Default::default() }
	}

	/// Sets the method name.
	pub fn method(mut self, method: impl Into<String>) -> Self {
		self.http_method = Some(method.into());

		self
	}

	/// Sets the body.
	pub fn body(mut self, body: ProxyBody) -> Self {
		self.body = Some(body);

		self
	}

	/// Sets the user name recorded in the audit log.
	pub fn user(mut self, user: impl Into<String>) -> Self {
		self.user = Some(user.into());

		self
	}
}

/// Uniform answer returned to the browser widget.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProxyEnvelope {
	/// `true` when an upstream response was obtained, whatever its status.
	pub success: bool,
	/// Upstream status code.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
	/// Upstream body; `Some(Value::Null)` for an empty body.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	/// Failure message.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl ProxyEnvelope {
	/// Wraps an upstream response.
	pub fn success(response: ProxyResponse) -> Self {
		Self {
			success: true,
			status: Some(response.status),
			data: Some(response.data.map(|data| data.into_json()).unwrap_or(Value::Null)),
			error: None,
		}
	}

	/// Wraps a failure message.
	pub fn failure(error: impl Display) -> Self {
		Self { success: false, status: None, data: None, error: Some(error.to_string()) }
	}
}

/// Entry point hosts call for every proxied request.
///
/// The service holds the raw [`BffSettings`] and validates them per call, so a host can be
/// deployed before it is configured and still answer with a readable error.
pub struct BffService<C>
where
	C: ?Sized + HttpTransport,
{
	http_client: Arc<C>,
	settings: BffSettings,
	filter: ConfidentialFilter,
	strategy: Arc<dyn UpstreamStrategy>,
	audit: AuditLogger,
}
impl<C> BffService<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a service over `http_client`; the audit log follows `settings`.
	pub fn new(http_client: impl Into<Arc<C>>, settings: BffSettings) -> Self {
		let audit = AuditLogger::from_settings(&settings);

		Self {
			http_client: http_client.into(),
			settings,
			filter: ConfidentialFilter::default(),
			strategy: Arc::new(DefaultUpstreamStrategy),
			audit,
		}
	}

	/// Replaces the confidential work-order filter.
	pub fn with_filter(mut self, filter: ConfidentialFilter) -> Self {
		self.filter = filter;

		self
	}

	/// Replaces the upstream classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn UpstreamStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Replaces the audit logger.
	pub fn with_audit_logger(mut self, audit: AuditLogger) -> Self {
		self.audit = audit;

		self
	}

	/// Proxies `request` with the tokens cached in `session`.
	pub async fn handle(
		&self,
		session: Arc<dyn SessionStore>,
		request: InboundRequest,
	) -> ProxyEnvelope {
		let user = request.user.clone();

		match self.dispatch(session, request).await {
			Ok(response) => ProxyEnvelope::success(response),
			Err(e) => {
				let message = e.to_string();

				self.audit.log_error(user.as_deref(), &message);

				ProxyEnvelope::failure(message)
			},
		}
	}

	async fn dispatch(
		&self,
		session: Arc<dyn SessionStore>,
		request: InboundRequest,
	) -> Result<ProxyResponse> {
		let InboundRequest { path, http_method, body, user } = request;
		let mut proxy_request =
			ProxyRequest::parse(path, http_method.as_deref().unwrap_or(DEFAULT_METHOD))?;

		if let Some(body) = body {
			proxy_request = proxy_request.with_body(body);
		}

		let config = self.settings.to_config()?;
		let cache = TokenCache::new(session);
		let proxy = RequestProxy::<C>::new(self.http_client.clone(), cache, &config)?
			.with_strategy(self.strategy.clone());
		let mut response = proxy.proxy(&proxy_request).await?;

		self.audit.log_exchange(user.as_deref(), &proxy_request, &response);

		if filter::is_work_order_listing(proxy_request.method, &proxy_request.path) {
			self.filter.apply(&mut response.data);
		}

		Ok(response)
	}
}
#[cfg(feature = "reqwest")]
impl BffService<ReqwestTransport> {
	/// Creates a service with a reqwest transport honoring the configured timeout.
	pub fn with_reqwest(settings: BffSettings) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::new(settings.request_timeout())?;

		Ok(Self::new(transport, settings))
	}
}
impl<C> Debug for BffService<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BffService")
			.field("settings", &self.settings)
			.field("filter", &self.filter)
			.field("audit", &self.audit)
			.finish()
	}
}
