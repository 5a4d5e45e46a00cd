// self
use crate::{_prelude::*, config::TokenPurpose, obs::GuardKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedGuard<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedGuard<F> = F;

/// A span builder used by guard operations.
#[derive(Clone, Debug)]
pub struct GuardSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl GuardSpan {
	/// Creates a new span tagged with the provided guard kind + stage.
	pub fn new(kind: GuardKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::debug_span!("storefront_guard.op", guard = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> GuardSpanGuard {
		#[cfg(feature = "tracing")]
		{
			GuardSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			GuardSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedGuard<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`GuardSpan::entered`].
pub struct GuardSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for GuardSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("GuardSpanGuard(..)")
	}
}

/// Logs a failed guard operation at a level matching its severity.
///
/// Token rejections keep their internal reason at `debug`; missing secrets are deployment
/// errors and log at `error`; store outages log at `warn`.
pub(crate) fn log_failure(kind: GuardKind, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		match error {
			Error::ConfigurationMissing { purpose } => log_missing_secret(*purpose),
			Error::StoreUnavailable { .. } | Error::Storage(_) => {
				tracing::warn!(guard = kind.as_str(), %error, "guard store failure");
			},
			_ => {
				tracing::debug!(guard = kind.as_str(), %error, "guard rejected request");
			},
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Logs a purpose whose secret fallback chain resolved nothing.
pub(crate) fn log_missing_secret(purpose: TokenPurpose) {
	#[cfg(feature = "tracing")]
	{
		let chain = purpose
			.fallback_chain()
			.iter()
			.map(|slot| slot.env_var())
			.collect::<Vec<_>>()
			.join(", ");

		tracing::error!(
			purpose = purpose.as_str(),
			chain,
			"no signing secret configured; refusing to sign or verify"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = purpose;
	}
}

/// Logs the size of a completed sweep.
pub(crate) fn log_sweep(deleted: u64) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(deleted, "swept expired rate limit windows");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = deleted;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn guard_span_noop_without_subscriber() {
		let _guard = GuardSpan::new(GuardKind::ServiceAuth, "test").entered();

		log_failure(GuardKind::ServiceAuth, &Error::ConfigurationMissing {
			purpose: TokenPurpose::Cron,
		});
		log_sweep(3);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = GuardSpan::new(GuardKind::RateLimit, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
