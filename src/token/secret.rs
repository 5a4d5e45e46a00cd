//! Signing secret wrapper that refuses empty keys and redacts itself in logs.

// self
use crate::{_prelude::*, error::ConfigError};

/// HMAC key material; never empty, never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SigningSecret(String);
impl SigningSecret {
	/// Wraps a secret string, rejecting the empty string.
	pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
		Self::named("secret", value)
	}

	pub(crate) fn named(name: &'static str, value: impl Into<String>) -> Result<Self, ConfigError> {
		let value = value.into();

		if value.is_empty() {
			return Err(ConfigError::EmptySecret { name });
		}

		Ok(Self(value))
	}

	/// Returns the raw key. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	pub(crate) fn as_bytes(&self) -> &[u8] {
		self.0.as_bytes()
	}
}
impl TryFrom<String> for SigningSecret {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<SigningSecret> for String {
	fn from(value: SigningSecret) -> Self {
		value.0
	}
}
impl Debug for SigningSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SigningSecret").field(&"<redacted>").finish()
	}
}
impl Display for SigningSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = SigningSecret::new("super-secret").expect("Non-empty secret should build.");

		assert_eq!(format!("{secret:?}"), "SigningSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn empty_secret_is_rejected() {
		let err = SigningSecret::new("").expect_err("Empty secret must not build.");

		assert!(matches!(err, ConfigError::EmptySecret { .. }));
		assert!(serde_json::from_str::<SigningSecret>("\"\"").is_err());
	}
}
