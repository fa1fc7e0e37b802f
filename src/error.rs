//! Crate-level error types shared by the auth clients, the proxy, and the inbound service.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Required configuration is missing or invalid.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A token endpoint was unreachable, refused the credentials, or answered with garbage.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transport failure (DNS, TCP, TLS) while calling an upstream resource.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Caller asked for a method outside GET, POST, PUT, and DELETE.
	#[error("Unsupported HTTP method: {method}.")]
	UnsupportedMethod {
		/// Method string supplied by the caller.
		method: String,
	},
	/// Caller did not supply an upstream path.
	#[error("Missing path parameter")]
	MissingPath,
	/// A request body could not be encoded as JSON.
	#[error("Failed to encode the request body.")]
	Encode(#[source] serde_json::Error),
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required setting was empty or absent.
	#[error("Service not configured: `{setting}` is required.")]
	MissingSetting {
		/// Name of the missing setting.
		setting: &'static str,
	},
	/// A URL setting (or a URL derived from one) cannot be parsed.
	#[error("Setting `{setting}` is not a valid URL.")]
	InvalidUrl {
		/// Name of the offending setting.
		setting: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header value contains bytes HTTP does not allow.
	#[error("Header `{header}` contains invalid characters.")]
	InvalidHeaderValue {
		/// Header name.
		header: &'static str,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Which credential tier an [`AuthError`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthStage {
	/// OAuth2 client-credentials request against the gateway token endpoint.
	Gateway,
	/// Username/password login against the upstream API.
	Login,
}
impl AuthStage {
	/// Returns a stable label suitable for messages and span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthStage::Gateway => "OAuth2 token",
			AuthStage::Login => "API login",
		}
	}
}
impl Display for AuthStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token acquisition failures. None of them are retried by the auth clients.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The token endpoint could not be reached.
	#[error("{stage} request failed: {source}")]
	Unreachable {
		/// Credential tier.
		stage: AuthStage,
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// The token endpoint answered with a status other than 200.
	#[error("{stage} request failed: {status} {body}")]
	Rejected {
		/// Credential tier.
		stage: AuthStage,
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// The token endpoint answered 200 with a body that is not a JSON token object.
	#[error("Invalid {stage} response.")]
	MalformedResponse {
		/// Credential tier.
		stage: AuthStage,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The token endpoint answered 200 without an `access_token`.
	#[error("Invalid {stage} response: missing access_token.")]
	MissingAccessToken {
		/// Credential tier.
		stage: AuthStage,
	},
	/// The issued `access_token` contains bytes that cannot be sent in an HTTP header.
	#[error("Invalid {stage} response: access_token is not a valid header value.")]
	UnusableAccessToken {
		/// Credential tier that issued the token.
		stage: AuthStage,
	},
}
impl AuthError {
	/// Credential tier that failed.
	pub fn stage(&self) -> AuthStage {
		match self {
			Self::Unreachable { stage, .. }
			| Self::Rejected { stage, .. }
			| Self::MalformedResponse { stage, .. }
			| Self::MissingAccessToken { stage }
			| Self::UnusableAccessToken { stage } => *stage,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
