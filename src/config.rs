//! Explicit secret configuration with enumerated fallback chains.
//!
//! Every token purpose resolves its key by walking [`TokenPurpose::fallback_chain`] in order.
//! An unset slot is skipped; a slot that is set but empty is a configuration error rather
//! than an empty HMAC key. When nothing resolves, signers fail closed with
//! [`Error::ConfigurationMissing`].

// std
use std::env::{self, VarError};
// self
use crate::{_prelude::*, error::ConfigError, token::SigningSecret};

/// What a signed token authorizes; each purpose owns a secret fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
	/// Time-limited invoice and order links.
	OrderLink,
	/// Newsletter unsubscribe links.
	Unsubscribe,
	/// Mobile API bearer sessions.
	MobileApi,
	/// Scheduled-job triggers.
	Cron,
}
impl TokenPurpose {
	/// Returns a stable label suitable for canonical strings, spans, and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenPurpose::OrderLink => "order_link",
			TokenPurpose::Unsubscribe => "unsubscribe",
			TokenPurpose::MobileApi => "mobile_api",
			TokenPurpose::Cron => "cron",
		}
	}

	/// Slots consulted, in order, when resolving this purpose's secret.
	///
	/// Cron never falls back to the application secret: the cron secret travels verbatim in
	/// request headers, so sharing it with an HMAC key would expose that key.
	pub const fn fallback_chain(self) -> &'static [SecretSlot] {
		match self {
			TokenPurpose::OrderLink => &[SecretSlot::Link, SecretSlot::App],
			TokenPurpose::Unsubscribe => &[SecretSlot::Unsubscribe, SecretSlot::App],
			TokenPurpose::MobileApi => &[SecretSlot::MobileApi, SecretSlot::App],
			TokenPurpose::Cron => &[SecretSlot::Cron],
		}
	}
}
impl Display for TokenPurpose {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Named secret source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecretSlot {
	/// Shared application secret.
	App,
	/// Dedicated order/invoice link secret.
	Link,
	/// Dedicated unsubscribe link secret.
	Unsubscribe,
	/// Dedicated mobile API session secret.
	MobileApi,
	/// Dedicated scheduled-job secret.
	Cron,
}
impl SecretSlot {
	/// All slots, in declaration order.
	pub const ALL: [SecretSlot; 5] = [
		SecretSlot::App,
		SecretSlot::Link,
		SecretSlot::Unsubscribe,
		SecretSlot::MobileApi,
		SecretSlot::Cron,
	];

	/// Environment variable read by [`SecretsConfig::from_env`].
	pub const fn env_var(self) -> &'static str {
		match self {
			SecretSlot::App => "STOREFRONT_APP_SECRET",
			SecretSlot::Link => "STOREFRONT_LINK_SECRET",
			SecretSlot::Unsubscribe => "STOREFRONT_UNSUBSCRIBE_SECRET",
			SecretSlot::MobileApi => "STOREFRONT_MOBILE_API_SECRET",
			SecretSlot::Cron => "STOREFRONT_CRON_SECRET",
		}
	}
}

/// Process-local secrets injected into [`crate::token::TokenSigner`] at construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
	/// Shared application secret used as the final fallback.
	pub app: Option<SigningSecret>,
	/// Dedicated order/invoice link secret.
	pub link: Option<SigningSecret>,
	/// Dedicated unsubscribe link secret.
	pub unsubscribe: Option<SigningSecret>,
	/// Dedicated mobile API session secret.
	pub mobile_api: Option<SigningSecret>,
	/// Dedicated scheduled-job secret.
	pub cron: Option<SigningSecret>,
}
impl SecretsConfig {
	/// Reads every slot from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| match env::var(name) {
			Ok(value) => Ok(Some(value)),
			Err(VarError::NotPresent) => Ok(None),
			Err(VarError::NotUnicode(_)) => Err(ConfigError::SecretNotUnicode { name }),
		})
	}

	/// Builds the config from an arbitrary lookup (env var name → optional value).
	pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
	where
		F: FnMut(&'static str) -> Result<Option<String>, ConfigError>,
	{
		let mut config = Self::default();

		for slot in SecretSlot::ALL {
			let name = slot.env_var();

			if let Some(value) = lookup(name)? {
				config.set(slot, SigningSecret::named(name, value)?);
			}
		}

		Ok(config)
	}

	/// Sets a slot, returning the updated config.
	pub fn with_secret(mut self, slot: SecretSlot, secret: SigningSecret) -> Self {
		self.set(slot, secret);

		self
	}

	/// Returns the secret stored in a single slot, without fallback.
	pub fn get(&self, slot: SecretSlot) -> Option<&SigningSecret> {
		match slot {
			SecretSlot::App => self.app.as_ref(),
			SecretSlot::Link => self.link.as_ref(),
			SecretSlot::Unsubscribe => self.unsubscribe.as_ref(),
			SecretSlot::MobileApi => self.mobile_api.as_ref(),
			SecretSlot::Cron => self.cron.as_ref(),
		}
	}

	/// Walks the purpose's fallback chain and returns the first configured secret.
	pub fn resolve(&self, purpose: TokenPurpose) -> Option<&SigningSecret> {
		purpose.fallback_chain().iter().find_map(|slot| self.get(*slot))
	}

	fn set(&mut self, slot: SecretSlot, secret: SigningSecret) {
		let target = match slot {
			SecretSlot::App => &mut self.app,
			SecretSlot::Link => &mut self.link,
			SecretSlot::Unsubscribe => &mut self.unsubscribe,
			SecretSlot::MobileApi => &mut self.mobile_api,
			SecretSlot::Cron => &mut self.cron,
		};

		*target = Some(secret);
	}
}
