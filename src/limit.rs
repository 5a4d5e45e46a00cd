//! Fixed-window rate limiting over a shared [`WindowStore`].
//!
//! [`RateLimiter::check_and_consume`] reads the window row, then either opens a fresh window
//! or increments the live one. Both mutations are conditional, atomic store operations, so
//! concurrent workers never both reset a window nor increment past the limit. When a
//! concurrent writer (or the sweeper) changes the row between the read and the write, the
//! check starts over from the read.
//!
//! This is a fixed window, not a sliding window: up to `2 × limit` requests can pass around
//! a window boundary.

pub mod key;
pub mod metrics;
pub mod sweeper;

pub use key::*;
pub use metrics::LimiterMetrics;
pub use sweeper::WindowSweeper;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	obs::{self, GuardKind, GuardOutcome, GuardSpan},
	store::{IncrementOutcome, StoreError, StoreFuture, UpsertOutcome, WindowStore},
};

const MAX_ATTEMPTS: usize = 4;

/// Runtime settings for [`RateLimiter`] and [`WindowSweeper`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
	/// Upper bound for a single store round trip.
	#[serde(with = "duration_millis")]
	pub store_timeout: StdDuration,
}
impl RateLimiterConfig {
	const DEFAULT_STORE_TIMEOUT: StdDuration = StdDuration::from_secs(2);

	/// Overrides the store timeout.
	pub fn with_store_timeout(mut self, timeout: StdDuration) -> Self {
		self.store_timeout = timeout;

		self
	}
}
impl Default for RateLimiterConfig {
	fn default() -> Self {
		Self { store_timeout: Self::DEFAULT_STORE_TIMEOUT }
	}
}

/// Outcome of [`RateLimiter::check_and_consume`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
	/// Whether the request may proceed.
	pub allowed: bool,
	/// Requests still admitted in the current window.
	pub remaining: u32,
	/// Instant when the current window closes; denied callers must not retry before it.
	pub reset_at: OffsetDateTime,
}
impl RateLimitDecision {
	fn allowed(limit: u32, count: u32, reset_at: OffsetDateTime) -> Self {
		Self { allowed: true, remaining: limit.saturating_sub(count), reset_at }
	}

	fn denied(reset_at: OffsetDateTime) -> Self {
		Self { allowed: false, remaining: 0, reset_at }
	}

	/// Suggested wait before retrying, or `None` when allowed.
	pub fn retry_after(&self, now: OffsetDateTime) -> Option<Duration> {
		(!self.allowed).then(|| (self.reset_at - now).max(Duration::ZERO))
	}

	/// Converts a denial into [`Error::RateLimitExceeded`].
	pub fn into_result(self) -> Result<Self> {
		if self.allowed {
			Ok(self)
		} else {
			Err(Error::RateLimitExceeded { reset_at: self.reset_at })
		}
	}
}

/// Read-only view returned by [`RateLimiter::status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitStatus {
	/// Whether the next check would be denied.
	pub limited: bool,
	/// Close of the live window, if one exists.
	pub reset_at: Option<OffsetDateTime>,
}

/// Store-backed fixed-window limiter; cheap to clone and share across tasks.
#[derive(Clone)]
pub struct RateLimiter {
	store: Arc<dyn WindowStore>,
	config: RateLimiterConfig,
	metrics: Arc<LimiterMetrics>,
}
impl RateLimiter {
	/// Creates a limiter with the default configuration.
	pub fn new(store: Arc<dyn WindowStore>) -> Self {
		Self { store, config: RateLimiterConfig::default(), metrics: Default::default() }
	}

	/// Replaces the runtime configuration.
	pub fn with_config(mut self, config: RateLimiterConfig) -> Self {
		self.config = config;

		self
	}

	/// Decision counters for this limiter (shared by clones).
	pub fn metrics(&self) -> &LimiterMetrics {
		&self.metrics
	}

	/// Checks `key` against `limit` per `window` and consumes one unit when allowed.
	pub async fn check_and_consume(
		&self,
		key: &str,
		limit: u32,
		window: Duration,
	) -> Result<RateLimitDecision> {
		self.check_and_consume_at(key, limit, window, OffsetDateTime::now_utc()).await
	}

	/// [`RateLimiter::check_and_consume`] as of `now`.
	pub async fn check_and_consume_at(
		&self,
		key: &str,
		limit: u32,
		window: Duration,
		now: OffsetDateTime,
	) -> Result<RateLimitDecision> {
		const KIND: GuardKind = GuardKind::RateLimit;

		let span = GuardSpan::new(KIND, "check_and_consume");

		obs::record_guard_outcome(KIND, GuardOutcome::Attempt);

		let result = span.instrument(self.consume(key, limit, window, now)).await;

		match &result {
			Ok(decision) if decision.allowed => {
				self.metrics.record_allowed();
				obs::record_guard_outcome(KIND, GuardOutcome::Allowed);
			},
			Ok(_) => {
				self.metrics.record_denied();
				obs::record_guard_outcome(KIND, GuardOutcome::Denied);
			},
			Err(e) => {
				self.metrics.record_failure();
				obs::record_guard_outcome(KIND, GuardOutcome::Failure);
				obs::log_failure(KIND, e);
			},
		}

		result
	}

	/// Like [`RateLimiter::check_and_consume`], but a denial becomes
	/// [`Error::RateLimitExceeded`].
	pub async fn enforce(
		&self,
		key: &str,
		limit: u32,
		window: Duration,
	) -> Result<RateLimitDecision> {
		self.check_and_consume(key, limit, window).await?.into_result()
	}

	/// Checks a preset rule for `subject`.
	pub async fn check_rule(
		&self,
		rule: &RateLimitRule,
		subject: &RateLimitSubject,
	) -> Result<RateLimitDecision> {
		self.check_and_consume(&rule.key_for(subject), rule.limit, rule.window).await
	}

	/// Enforces a preset rule for `subject`.
	pub async fn enforce_rule(
		&self,
		rule: &RateLimitRule,
		subject: &RateLimitSubject,
	) -> Result<RateLimitDecision> {
		self.check_rule(rule, subject).await?.into_result()
	}

	/// Reports whether `key` is currently limited without consuming anything.
	pub async fn status(&self, key: &str, limit: u32) -> Result<RateLimitStatus> {
		self.status_at(key, limit, OffsetDateTime::now_utc()).await
	}

	/// [`RateLimiter::status`] as of `now`.
	pub async fn status_at(
		&self,
		key: &str,
		limit: u32,
		now: OffsetDateTime,
	) -> Result<RateLimitStatus> {
		if limit == 0 {
			return Err(ConfigError::ZeroLimit.into());
		}

		let span = GuardSpan::new(GuardKind::RateLimit, "status");
		let timeout = self.config.store_timeout;
		let row = span
			.instrument(store_call(timeout, "get_window", self.store.get_window(key)))
			.await
			.inspect_err(|e| obs::log_failure(GuardKind::RateLimit, e))?;

		Ok(match row {
			Some(row) if !row.is_expired_at(now) =>
				RateLimitStatus { limited: row.count >= limit, reset_at: Some(row.reset_at) },
			_ => RateLimitStatus { limited: false, reset_at: None },
		})
	}

	async fn consume(
		&self,
		key: &str,
		limit: u32,
		window: Duration,
		now: OffsetDateTime,
	) -> Result<RateLimitDecision> {
		if limit == 0 {
			return Err(ConfigError::ZeroLimit.into());
		}
		if !window.is_positive() {
			return Err(ConfigError::NonPositiveWindow { window }.into());
		}

		let reset_at = now.checked_add(window).ok_or(ConfigError::WindowOutOfRange)?;
		let timeout = self.config.store_timeout;

		for _ in 0..MAX_ATTEMPTS {
			let current = store_call(timeout, "get_window", self.store.get_window(key)).await?;
			let live = match current {
				Some(row) if !row.is_expired_at(now) => row,
				_ => match store_call(
					timeout,
					"upsert_window",
					self.store.upsert_window(key, 1, reset_at, now),
				)
				.await?
				{
					UpsertOutcome::Opened(row) =>
						return Ok(RateLimitDecision::allowed(limit, row.count, row.reset_at)),
					// Another worker opened the window first; count against theirs.
					UpsertOutcome::Live(row) => row,
				},
			};

			if live.count >= limit {
				return Ok(RateLimitDecision::denied(live.reset_at));
			}

			let increment = self.store.increment_window(key, limit, now);

			match store_call(timeout, "increment_window", increment).await? {
				IncrementOutcome::Incremented(row) =>
					return Ok(RateLimitDecision::allowed(limit, row.count, row.reset_at)),
				IncrementOutcome::Saturated(row) =>
					return Ok(RateLimitDecision::denied(row.reset_at)),
				// Swept or rolled over since the read; start again.
				IncrementOutcome::Missing | IncrementOutcome::Expired => continue,
			}
		}

		Err(Error::StoreUnavailable {
			operation: "check_and_consume",
			reason: format!("window for `{key}` kept changing across {MAX_ATTEMPTS} attempts"),
		})
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter")
			.field("config", &self.config)
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Awaits a store operation under `timeout`, mapping outages to [`Error::StoreUnavailable`].
pub(crate) async fn store_call<T>(
	timeout: StdDuration,
	operation: &'static str,
	fut: StoreFuture<'_, T>,
) -> Result<T> {
	match tokio::time::timeout(timeout, fut).await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(StoreError::Unavailable { message })) =>
			Err(Error::StoreUnavailable { operation, reason: message }),
		Ok(Err(e)) => Err(e.into()),
		Err(_) => Err(Error::StoreUnavailable {
			operation,
			reason: format!("timed out after {} ms", timeout.as_millis()),
		}),
	}
}

mod duration_millis {
	// std
	use std::time::Duration as StdDuration;
	// crates.io
	use serde::{Deserialize, Deserializer};

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<StdDuration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u64::deserialize(deserializer).map(StdDuration::from_millis)
	}
}
