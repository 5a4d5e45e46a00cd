//! Out-of-band janitor for expired rate-limit windows.
//!
//! Sweeping only bounds storage growth: a check against a deleted row simply opens a new
//! window, so a sweep may interleave freely with [`crate::limit::RateLimiter`] traffic.

// std
use std::{pin::pin, time::Duration as StdDuration};
// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	limit::{self, RateLimiterConfig},
	obs::{self, GuardKind, GuardOutcome, GuardSpan},
	store::WindowStore,
};

/// Deletes rows whose window has closed.
#[derive(Clone)]
pub struct WindowSweeper {
	store: Arc<dyn WindowStore>,
	config: RateLimiterConfig,
}
impl WindowSweeper {
	/// Creates a sweeper over the limiter's store.
	pub fn new(store: Arc<dyn WindowStore>) -> Self {
		Self { store, config: RateLimiterConfig::default() }
	}

	/// Replaces the runtime configuration (store timeout).
	pub fn with_config(mut self, config: RateLimiterConfig) -> Self {
		self.config = config;

		self
	}

	/// Deletes every window closed as of the current clock.
	pub async fn sweep(&self) -> Result<u64> {
		self.sweep_at(OffsetDateTime::now_utc()).await
	}

	/// Deletes every row with `reset_at <= now`, returning how many were removed.
	pub async fn sweep_at(&self, now: OffsetDateTime) -> Result<u64> {
		const KIND: GuardKind = GuardKind::Sweep;

		let span = GuardSpan::new(KIND, "sweep");
		let result = span
			.instrument(limit::store_call(
				self.config.store_timeout,
				"delete_expired",
				self.store.delete_expired(now),
			))
			.await;

		match &result {
			Ok(deleted) => {
				obs::log_sweep(*deleted);
				obs::record_swept_windows(*deleted);
				obs::record_guard_outcome(KIND, GuardOutcome::Allowed);
			},
			Err(e) => {
				obs::log_failure(KIND, e);
				obs::record_guard_outcome(KIND, GuardOutcome::Failure);
			},
		}

		result
	}

	/// Sweeps roughly every `interval` until `shutdown` resolves, returning the total deleted.
	///
	/// Each pause adds up to 10% random jitter so sweepers on many workers spread out. A
	/// failed sweep is logged and retried on the next tick.
	pub async fn run<F>(&self, interval: StdDuration, shutdown: F) -> u64
	where
		F: Future<Output = ()>,
	{
		let mut shutdown = pin!(shutdown);
		let mut total = 0;

		loop {
			tokio::select! {
				_ = &mut shutdown => break,
				_ = tokio::time::sleep(jittered(interval)) => {
					if let Ok(deleted) = self.sweep().await {
						total += deleted;
					}
				},
			}
		}

		total
	}
}
impl Debug for WindowSweeper {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WindowSweeper").field("config", &self.config).finish()
	}
}

fn jittered(interval: StdDuration) -> StdDuration {
	let max_jitter = interval / 10;

	if max_jitter.is_zero() {
		return interval;
	}

	interval + max_jitter.mul_f64(rand::rng().random::<f64>())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn jitter_stays_within_ten_percent() {
		let interval = StdDuration::from_secs(60);

		for _ in 0..32 {
			let pause = jittered(interval);

			assert!(pause >= interval && pause <= interval + StdDuration::from_secs(6));
		}

		assert_eq!(jittered(StdDuration::ZERO), StdDuration::ZERO);
	}
}
