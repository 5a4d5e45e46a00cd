//! Per-limiter decision counters.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe decision counters for a [`crate::limit::RateLimiter`].
#[derive(Debug, Default)]
pub struct LimiterMetrics {
	allowed: AtomicU64,
	denied: AtomicU64,
	failure: AtomicU64,
}
impl LimiterMetrics {
	/// Returns the number of admitted requests.
	pub fn allowed(&self) -> u64 {
		self.allowed.load(Ordering::Relaxed)
	}

	/// Returns the number of requests denied by a saturated window.
	pub fn denied(&self) -> u64 {
		self.denied.load(Ordering::Relaxed)
	}

	/// Returns the number of checks that failed (store outage, invalid arguments).
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_allowed(&self) {
		self.allowed.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_denied(&self) {
		self.denied.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
