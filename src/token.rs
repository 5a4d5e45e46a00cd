//! Stateless HMAC-signed capabilities: resource links, bearer sessions, and service auth.
//!
//! [`TokenSigner`] is a pure function of its inputs and the injected [`SecretsConfig`]; it
//! holds no locks and never touches the counter store. Every signing and verification path
//! resolves its key through [`SecretsConfig::resolve`] and fails closed with
//! [`Error::ConfigurationMissing`] when nothing is configured.

pub mod bearer;
pub mod id;
pub mod link;
pub mod secret;
pub mod service;

pub use bearer::*;
pub use id::*;
pub use link::*;
pub use secret::*;
pub use service::*;

// crates.io
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	config::{SecretsConfig, TokenPurpose},
	obs::{self, GuardKind, GuardOutcome, GuardSpan},
};

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies signed tokens for every [`TokenPurpose`].
#[derive(Clone)]
pub struct TokenSigner {
	secrets: Arc<SecretsConfig>,
}
impl TokenSigner {
	/// Creates a signer over the provided secrets.
	pub fn new(secrets: SecretsConfig) -> Self {
		Self { secrets: Arc::new(secrets) }
	}

	/// Returns the injected secret configuration.
	pub fn secrets(&self) -> &SecretsConfig {
		&self.secrets
	}

	/// Returns `true` when a secret resolves for the purpose.
	pub fn is_configured(&self, purpose: TokenPurpose) -> bool {
		self.secrets.resolve(purpose).is_some()
	}

	fn secret_for(&self, purpose: TokenPurpose) -> Result<&SigningSecret> {
		self.secrets.resolve(purpose).ok_or(Error::ConfigurationMissing { purpose })
	}

	/// HMAC-SHA256 of `message` under the purpose's resolved secret.
	fn mac(&self, purpose: TokenPurpose, message: &[u8]) -> Result<[u8; 32]> {
		let secret = self.secret_for(purpose)?;
		// HMAC accepts keys of any length; the error arm is unreachable for non-empty keys.
		let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
			.map_err(|_| Error::ConfigurationMissing { purpose })?;

		mac.update(message);

		let mut digest = [0; 32];

		digest.copy_from_slice(&mac.finalize().into_bytes());

		Ok(digest)
	}

	/// Runs a synchronous guard operation inside a span, recording outcome and failures.
	fn observe<T>(
		kind: GuardKind,
		stage: &'static str,
		op: impl FnOnce() -> Result<T>,
	) -> Result<T> {
		let _span = GuardSpan::new(kind, stage).entered();

		obs::record_guard_outcome(kind, GuardOutcome::Attempt);

		let result = op();

		obs::record_guard_outcome(kind, GuardOutcome::of(&result));

		if let Err(e) = &result {
			obs::log_failure(kind, e);
		}

		result
	}
}
impl Debug for TokenSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSigner")
			.field("order_link", &self.is_configured(TokenPurpose::OrderLink))
			.field("unsubscribe", &self.is_configured(TokenPurpose::Unsubscribe))
			.field("mobile_api", &self.is_configured(TokenPurpose::MobileApi))
			.field("cron", &self.is_configured(TokenPurpose::Cron))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::SecretSlot;

	#[test]
	fn mac_requires_a_resolved_secret() {
		let signer = TokenSigner::new(SecretsConfig::default());
		let err = signer
			.mac(TokenPurpose::OrderLink, b"payload")
			.expect_err("Signing without any secret must fail closed.");

		assert!(matches!(err, Error::ConfigurationMissing { purpose: TokenPurpose::OrderLink }));
	}

	#[test]
	fn mac_is_keyed_by_purpose_secret() {
		let secrets = SecretsConfig::default()
			.with_secret(SecretSlot::Link, SigningSecret::new("link").expect("valid"))
			.with_secret(SecretSlot::Unsubscribe, SigningSecret::new("unsub").expect("valid"));
		let signer = TokenSigner::new(secrets);
		let order = signer.mac(TokenPurpose::OrderLink, b"m").expect("Order link should sign.");
		let unsub = signer.mac(TokenPurpose::Unsubscribe, b"m").expect("Unsubscribe should sign.");

		assert_ne!(order, unsub);
		assert!(format!("{signer:?}").contains("cron: false"));
	}
}
