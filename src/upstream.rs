//! Upstream strategy hooks: which paths are auth endpoints and which responses mean the
//! cached credentials were rejected.
//!
//! The hooks work on crate-owned types ([`ProxyResponse`]) so strategies stay independent from
//! any HTTP client.

// self
use crate::{_prelude::*, proxy::ProxyResponse};

/// Path fragments identifying auth endpoints, which only receive the gateway bearer token.
pub const AUTH_ENDPOINT_MARKERS: [&str; 4] =
	["/auth/login", "/auth/refresh", "/auth/logout", "/auth/loginsso"];
/// Body fragments the work-order vendor uses to report rejected credentials.
///
/// These match the vendor's gateway and API error format (an invalid JWT, invalid credentials,
/// and the gateway's numeric "invalid credentials" code) and are not a general contract.
pub const AUTH_FAILURE_MARKERS: [&str; 3] = ["Invalid JWT token", "Invalid Credentials", "900901"];

/// Strategy hook that classifies upstream paths and responses.
///
/// Implementors are required to be `Send + Sync`. Both hooks have defaults matching
/// [`DefaultUpstreamStrategy`]; override only what a different upstream needs.
pub trait UpstreamStrategy: Send + Sync {
	/// Returns `true` when `path` is an auth endpoint (no user API token is attached).
	fn is_auth_endpoint(&self, path: &str) -> bool {
		AUTH_ENDPOINT_MARKERS.iter().any(|marker| path.contains(marker))
	}

	/// Returns `true` when `response` means the credentials were rejected.
	fn is_auth_failure(&self, response: &ProxyResponse) -> bool {
		if matches!(response.status, 401 | 403) {
			return true;
		}

		let body = response.body_text();

		AUTH_FAILURE_MARKERS.iter().any(|marker| body.contains(marker))
	}
}

/// Strategy for the work-order API: status 401/403 or a known vendor error marker.
#[derive(Debug, Default)]
pub struct DefaultUpstreamStrategy;
impl Display for DefaultUpstreamStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-upstream-strategy")
	}
}
impl UpstreamStrategy for DefaultUpstreamStrategy {}
