//! Transport primitives for token requests and proxied resource calls.
//!
//! The module exposes [`HttpTransport`] alongside [`OutboundRequest`] so hosts can plug in their
//! own HTTP stack (or a recording fake in tests) without touching the auth clients or the proxy.
//! Requests and responses use the `http` crate types re-exported by `oauth2`, which keeps the
//! seam independent from reqwest.

pub use oauth2::{
	HttpResponse,
	http::{
		HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
		header::{self, InvalidHeaderValue},
	},
};

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	error::TransportError,
	proxy::MultipartPart,
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Header carrying the user-scoped API token on resource calls.
pub const X_AUTH_TOKEN: &str = "x-auth-token";

/// Abstraction over HTTP stacks able to execute outbound calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// gateway client, the user client, and the proxy. Any response that arrives, whatever its
/// status, is returned as `Ok`; only failures to obtain a response are errors.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Body attached to an [`OutboundRequest`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum OutboundBody {
	/// No body.
	#[default]
	Empty,
	/// Pre-encoded bytes; the caller sets `Content-Type`.
	Bytes(Vec<u8>),
	/// Multipart form; the transport chooses the boundary and `Content-Type`.
	Multipart(Vec<MultipartPart>),
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Request body.
	pub body: OutboundBody,
	/// Upper bound for the whole exchange; transports must honor it when set.
	pub timeout: Option<StdDuration>,
}
impl OutboundRequest {
	/// Creates a request without headers, body, or timeout.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: OutboundBody::Empty, timeout: None }
	}

	/// Sets a header, replacing any previous value.
	///
	/// The caller maps the failure to whoever supplied the value: configuration for static
	/// credentials, the issuing tier for tokens.
	pub fn header(
		mut self,
		name: HeaderName,
		value: impl AsRef<str>,
	) -> Result<Self, InvalidHeaderValue> {
		self.headers.insert(name, HeaderValue::from_str(value.as_ref())?);

		Ok(self)
	}

	/// Sets `Authorization: Bearer <token>`.
	pub fn bearer(self, token: &str) -> Result<Self, InvalidHeaderValue> {
		self.header(header::AUTHORIZATION, format!("Bearer {token}"))
	}

	/// Bounds the exchange by `timeout`.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Serializes `payload` as JSON and sets `Content-Type: application/json`.
	pub fn json<T>(mut self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(payload).map_err(Error::Encode)?;

		self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = OutboundBody::Bytes(bytes);

		Ok(self)
	}

	/// Sets a form-encoded body and `Content-Type: application/x-www-form-urlencoded`.
	pub fn form(mut self, encoded: impl Into<String>) -> Self {
		self.headers.insert(
			header::CONTENT_TYPE,
			HeaderValue::from_static("application/x-www-form-urlencoded"),
		);
		self.body = OutboundBody::Bytes(encoded.into().into_bytes());

		self
	}

	/// Sets a multipart body without touching `Content-Type`.
	pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
		self.body = OutboundBody::Multipart(parts);

		self
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints and the upstream API answer directly, so [`ReqwestTransport::new`] disables
/// redirect following. A per-request [`OutboundRequest::timeout`] overrides the client-wide one,
/// so transports built through [`ReqwestTransport::with_client`] or `Default` stay bounded too.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with the provided request timeout.
	pub fn new(timeout: StdDuration) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let OutboundRequest { method, url, headers, body, timeout } = request;
			let mut builder = self.0.request(method, url).headers(headers);

			if let Some(timeout) = timeout {
				builder = builder.timeout(timeout);
			}

			builder = match body {
				OutboundBody::Empty => builder,
				OutboundBody::Bytes(bytes) => builder.body(bytes),
				OutboundBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
			};

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(feature = "reqwest")]
fn multipart_form(parts: Vec<MultipartPart>) -> Result<reqwest::multipart::Form, TransportError> {
	// self
	use crate::proxy::PartContent;

	let mut form = reqwest::multipart::Form::new();

	for MultipartPart { name, content } in parts {
		form = match content {
			PartContent::Text(value) => form.text(name, value),
			PartContent::File(file) => {
				let mut part =
					reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);

				if let Some(mime) = file.mime_type {
					part = part.mime_str(&mime)?;
				}

				form.part(name, part)
			},
		};
	}

	Ok(form)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url() -> Url {
		Url::parse("https://api.example.com/items").expect("Fixture URL should parse.")
	}

	#[test]
	fn json_sets_content_type_and_body() {
		let request = OutboundRequest::new(Method::POST, url())
			.json(&serde_json::json!({ "title": "Broken lamp" }))
			.expect("JSON body should encode.");

		assert_eq!(
			request.headers.get(header::CONTENT_TYPE).map(HeaderValue::as_bytes),
			Some(&b"application/json"[..]),
		);
		assert_eq!(request.body, OutboundBody::Bytes(br#"{"title":"Broken lamp"}"#.to_vec()));
	}

	#[test]
	fn multipart_leaves_content_type_to_transport() {
		let request = OutboundRequest::new(Method::POST, url())
			.multipart(vec![MultipartPart::text("comment", "see photo")]);

		assert!(request.headers.get(header::CONTENT_TYPE).is_none());
		assert!(matches!(request.body, OutboundBody::Multipart(ref parts) if parts.len() == 1));
	}

	#[test]
	fn header_rejects_control_characters() {
		let result = OutboundRequest::new(Method::GET, url())
			.header(HeaderName::from_static(X_AUTH_TOKEN), "bad\nvalue");

		assert!(result.is_err());
	}

	#[test]
	fn timeout_is_unset_until_requested() {
		let request = OutboundRequest::new(Method::GET, url());

		assert_eq!(request.timeout, None);
		assert_eq!(
			request.timeout(StdDuration::from_millis(250)).timeout,
			Some(StdDuration::from_millis(250)),
		);
	}

	#[test]
	fn bearer_formats_authorization() {
		let request = OutboundRequest::new(Method::GET, url())
			.bearer("gateway-token")
			.expect("Bearer header should be valid.");

		assert_eq!(
			request.headers.get(header::AUTHORIZATION).map(HeaderValue::as_bytes),
			Some(&b"Bearer gateway-token"[..]),
		);
	}
}
