//! Compact bearer sessions for the mobile API.
//!
//! Wire format: `Authorization: Bearer <base64url(json claims)>.<base64url(hmac)>`. The HMAC
//! covers the encoded payload exactly as transmitted, and the payload is decoded only after
//! the signature checks out.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	compare,
	config::TokenPurpose,
	error::{ConfigError, InvalidTokenReason},
	obs::GuardKind,
	token::{SubjectId, TokenSigner},
};

/// Separator between the encoded payload and its signature.
pub const BEARER_SEPARATOR: char = '.';
/// Lifetime applied by [`BearerClaims::new`].
pub const DEFAULT_SESSION_TTL: Duration = Duration::days(30);

const SCHEME: &str = "Bearer ";

/// Claims embedded in a bearer session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerClaims {
	/// Account identifier.
	#[serde(rename = "sub")]
	pub subject: SubjectId,
	/// Account email.
	pub email: String,
	/// Optional display name.
	#[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	/// Expiry, in whole Unix seconds on the wire.
	#[serde(rename = "exp", with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl BearerClaims {
	/// Creates claims expiring [`DEFAULT_SESSION_TTL`] from now.
	pub fn new(subject: SubjectId, email: impl Into<String>) -> Self {
		Self::with_expiry(subject, email, OffsetDateTime::now_utc() + DEFAULT_SESSION_TTL)
	}

	/// Creates claims with an explicit expiry (truncated to whole seconds).
	pub fn with_expiry(
		subject: SubjectId,
		email: impl Into<String>,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			subject,
			email: email.into(),
			display_name: None,
			expires_at: expires_at.replace_nanosecond(0).unwrap_or(expires_at),
		}
	}

	/// Attaches a display name.
	pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());

		self
	}

	/// Returns `true` if the claims are past expiry at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

impl TokenSigner {
	/// Serializes, encodes, and signs the claims into `<payload>.<signature>`.
	pub fn issue_bearer_token(&self, claims: &BearerClaims) -> Result<String> {
		Self::observe(GuardKind::BearerToken, "issue_bearer_token", || {
			if claims.email.trim().is_empty() {
				return Err(ConfigError::EmptyEmail.into());
			}

			let json = serde_json::to_vec(claims)
				.map_err(|source| ConfigError::ClaimsEncoding { source })?;
			let payload = URL_SAFE_NO_PAD.encode(json);
			let signature = self.bearer_signature(&payload)?;

			Ok(format!("{payload}{BEARER_SEPARATOR}{signature}"))
		})
	}

	/// Parses an `Authorization` header value against the current clock.
	pub fn parse_bearer_token(&self, header_value: &str) -> Result<BearerClaims> {
		self.parse_bearer_token_at(header_value, OffsetDateTime::now_utc())
	}

	/// Parses an `Authorization` header value as of `now`.
	///
	/// Any failure yields an error; a partially decoded claim set is never returned.
	pub fn parse_bearer_token_at(
		&self,
		header_value: &str,
		now: OffsetDateTime,
	) -> Result<BearerClaims> {
		Self::observe(GuardKind::BearerToken, "parse_bearer_token", || {
			let token = strip_bearer_scheme(header_value)
				.ok_or(Error::invalid(InvalidTokenReason::MissingScheme))?;
			let (payload, signature) = token
				.split_once(BEARER_SEPARATOR)
				.filter(|(p, s)| !p.is_empty() && !s.is_empty() && !s.contains(BEARER_SEPARATOR))
				.ok_or(Error::invalid(InvalidTokenReason::Malformed))?;
			let expected = self.bearer_signature(payload)?;

			if expected.len() != signature.len()
				|| !compare::timing_safe_eq_str(&expected, signature)
			{
				return Err(Error::invalid(InvalidTokenReason::SignatureMismatch));
			}

			let claims = decode_claims(payload)?;

			if claims.is_expired_at(now) {
				return Err(Error::TokenExpired { expired_at: claims.expires_at });
			}

			Ok(claims)
		})
	}

	fn bearer_signature(&self, payload: &str) -> Result<String> {
		Ok(URL_SAFE_NO_PAD.encode(self.mac(TokenPurpose::MobileApi, payload.as_bytes())?))
	}
}

/// Returns the credential after a case-insensitive `Bearer ` scheme, if present.
pub(crate) fn strip_bearer_scheme(header_value: &str) -> Option<&str> {
	let trimmed = header_value.trim();
	let (scheme, rest) = trimmed.split_at_checked(SCHEME.len())?;

	if !scheme.eq_ignore_ascii_case(SCHEME) {
		return None;
	}

	let credential = rest.trim();

	(!credential.is_empty()).then_some(credential)
}

fn decode_claims(payload: &str) -> Result<BearerClaims> {
	let bytes = URL_SAFE_NO_PAD
		.decode(payload)
		.map_err(|_| Error::invalid(InvalidTokenReason::PayloadEncoding))?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
	let claims: BearerClaims = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| Error::invalid(InvalidTokenReason::Claims { detail: e.to_string() }))?;

	if claims.email.trim().is_empty() {
		return Err(Error::invalid(InvalidTokenReason::Claims {
			detail: "email: must not be empty".into(),
		}));
	}

	Ok(claims)
}
