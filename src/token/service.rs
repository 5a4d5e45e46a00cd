//! Authorization for scheduled-job (cron) callers.

// self
use crate::{
	_prelude::*,
	compare,
	config::TokenPurpose,
	error::InvalidTokenReason,
	obs::GuardKind,
	token::{TokenSigner, bearer},
};

/// Dedicated header a scheduler may use instead of `Authorization`.
pub const SERVICE_SECRET_HEADER: &str = "x-cron-secret";

impl TokenSigner {
	/// Authorizes a scheduled-job call.
	///
	/// Either credential channel suffices: `Authorization: Bearer <secret>` or the
	/// [`SERVICE_SECRET_HEADER`] value, each compared in constant time against the cron secret.
	/// Both channels are always evaluated. Fails with [`Error::ConfigurationMissing`] when no
	/// cron secret is configured.
	pub fn authorize_service_call(
		&self,
		authorization: Option<&str>,
		service_header: Option<&str>,
	) -> Result<()> {
		Self::observe(GuardKind::ServiceAuth, "authorize_service_call", || {
			let secret = self.secret_for(TokenPurpose::Cron)?.expose();
			let via_bearer = authorization
				.and_then(bearer::strip_bearer_scheme)
				.is_some_and(|credential| compare::timing_safe_eq_str(credential, secret));
			let via_header = service_header
				.map(str::trim)
				.is_some_and(|credential| compare::timing_safe_eq_str(credential, secret));

			if via_bearer | via_header {
				Ok(())
			} else {
				Err(Error::invalid(InvalidTokenReason::SignatureMismatch))
			}
		})
	}
}
