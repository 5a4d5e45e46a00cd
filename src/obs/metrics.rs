// self
use crate::obs::{GuardKind, GuardOutcome};

/// Counts one guard decision as `storefront_guard_decision_total{guard, outcome}`.
pub fn record_guard_outcome(kind: GuardKind, outcome: GuardOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"storefront_guard_decision_total",
			"guard" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Adds swept rows to `storefront_guard_swept_windows_total`; a sweep that removed nothing
/// still touches the counter so dashboards see the sweeper is alive.
pub fn record_swept_windows(deleted: u64) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("storefront_guard_swept_windows_total").increment(deleted);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = deleted;
	}
}
