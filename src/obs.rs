//! Optional observability helpers for guard decisions.
//!
//! # Feature Flags
//!
//! - `tracing` (default) emits spans named `storefront_guard.op` with the `guard` and `stage`
//!   fields, plus events for rejections, missing configuration, and sweeps.
//! - `metrics` increments the `storefront_guard_decision_total` counter for every
//!   attempt/allow/deny/failure, labeled by `guard` + `outcome`, and adds sweep results to
//!   `storefront_guard_swept_windows_total`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Guard kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuardKind {
	/// Fixed-window rate limiter checks.
	RateLimit,
	/// Resource-link signing and verification.
	ResourceLink,
	/// Bearer session issuance and parsing.
	BearerToken,
	/// Scheduled-job caller authorization.
	ServiceAuth,
	/// Expired-window sweeps.
	Sweep,
}
impl GuardKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GuardKind::RateLimit => "rate_limit",
			GuardKind::ResourceLink => "resource_link",
			GuardKind::BearerToken => "bearer_token",
			GuardKind::ServiceAuth => "service_auth",
			GuardKind::Sweep => "sweep",
		}
	}
}
impl Display for GuardKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each guard decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuardOutcome {
	/// Entry to a guard operation.
	Attempt,
	/// Request or token accepted.
	Allowed,
	/// Request or token rejected by policy.
	Denied,
	/// Operation failed (store outage, missing configuration).
	Failure,
}
impl GuardOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GuardOutcome::Attempt => "attempt",
			GuardOutcome::Allowed => "allowed",
			GuardOutcome::Denied => "denied",
			GuardOutcome::Failure => "failure",
		}
	}

	/// Classifies a finished operation: policy rejections are denials, everything else fails.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => GuardOutcome::Allowed,
			Err(e) if e.is_unauthorized() || matches!(e, Error::RateLimitExceeded { .. }) =>
				GuardOutcome::Denied,
			Err(_) => GuardOutcome::Failure,
		}
	}
}
impl Display for GuardOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
