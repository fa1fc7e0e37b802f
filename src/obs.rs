//! Observability helpers: operation spans, outcome counters, and the request audit log.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `workorder_bff.operation` with the
//!   `operation` and `stage` (call site) fields.
//! - Enable `metrics` to increment the `workorder_bff_operation_total` counter for every
//!   attempt/success/failure/retry, labeled by `operation` + `outcome`.

pub mod audit;

mod tracing;

pub use self::{audit::*, tracing::*};

// self
use crate::_prelude::*;

/// Operations observed by the proxy layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// OAuth2 client-credentials token acquisition.
	GatewayToken,
	/// Username/password login for the user API token.
	ApiLogin,
	/// Proxied resource call.
	Proxy,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::GatewayToken => "gateway_token",
			Operation::ApiLogin => "api_login",
			Operation::Proxy => "proxy",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Upstream rejected the credentials and the call is repeated with fresh tokens.
	Retry,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Retry => "retry",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Increments `workorder_bff_operation_total` for `operation` + `outcome` (when enabled).
pub fn record_outcome(operation: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"workorder_bff_operation_total",
			"operation" => operation.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}

/// Runs `fut` inside the operation span, counting the attempt and its final outcome.
///
/// Intermediate outcomes such as [`Outcome::Retry`] are recorded by the caller.
pub async fn observe<T, Fut>(operation: Operation, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	record_outcome(operation, Outcome::Attempt);

	let result = OperationSpan::new(operation, stage).instrument(fut).await;

	record_outcome(operation, if result.is_ok() { Outcome::Success } else { Outcome::Failure });

	result
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn labels_are_stable() {
		assert_eq!(Operation::ApiLogin.to_string(), "api_login");
		assert_eq!(Outcome::Retry.to_string(), "retry");
	}

	#[tokio::test]
	async fn observe_passes_the_result_through() {
		let ok = observe(Operation::Proxy, "test", async { Ok(7) }).await;
		let err =
			observe(Operation::Proxy, "test", async { Err::<(), _>(Error::MissingPath) }).await;

		assert_eq!(ok.expect("Successful futures should pass through."), 7);
		assert!(matches!(err, Err(Error::MissingPath)));
	}
}
