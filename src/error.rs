//! Guard-level error types shared across token signing, rate limiting, and stores.

// self
use crate::{_prelude::*, config::TokenPurpose, store::StoreError};

/// Guard-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical guard error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure other than unavailability.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration or argument problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The caller exhausted the window budget and must wait until `reset_at`.
	#[error("Rate limit exceeded; retry after {reset_at}.")]
	RateLimitExceeded {
		/// Instant when the current window closes.
		reset_at: OffsetDateTime,
	},
	/// Signature mismatch, malformed encoding, or missing claim.
	#[error("Token is invalid: {0}")]
	InvalidToken(InvalidTokenReason),
	/// Structurally valid and correctly signed, but past its expiry.
	#[error("Token expired at {expired_at}.")]
	TokenExpired {
		/// Expiry instant embedded in the token.
		expired_at: OffsetDateTime,
	},
	/// No secret resolved for the requested purpose; signing refuses to proceed.
	#[error("No signing secret is configured for `{purpose}`.")]
	ConfigurationMissing {
		/// Token purpose whose fallback chain resolved nothing.
		purpose: TokenPurpose,
	},
	/// The shared counter store could not be reached in time.
	#[error("Counter store is unavailable during {operation}: {reason}.")]
	StoreUnavailable {
		/// Store operation that failed.
		operation: &'static str,
		/// Timeout or backend message.
		reason: String,
	},
}
impl Error {
	/// Returns `true` for failures that surface to external callers as "unauthorized".
	///
	/// [`Error::InvalidToken`] and [`Error::TokenExpired`] stay distinct internally so logs can
	/// tell them apart, but callers must not reveal which one occurred.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Error::InvalidToken(_) | Error::TokenExpired { .. })
	}

	pub(crate) fn invalid(reason: InvalidTokenReason) -> Self {
		Self::InvalidToken(reason)
	}
}

/// Why a token failed structural or signature validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum InvalidTokenReason {
	/// Header value lacks the `Bearer ` scheme prefix.
	#[error("missing bearer scheme.")]
	MissingScheme,
	/// Token is not shaped like `<payload>.<signature>` (or a hex link signature).
	#[error("malformed token.")]
	Malformed,
	/// Signature does not match the recomputed value.
	#[error("signature mismatch.")]
	SignatureMismatch,
	/// Payload bytes are not valid base64url.
	#[error("payload is not valid base64url.")]
	PayloadEncoding,
	/// Payload decoded but a mandatory claim is absent or mistyped.
	#[error("claims rejected ({detail}).")]
	Claims {
		/// Path-qualified decoder message naming the failing claim.
		detail: String,
	},
	/// Expiry cannot be represented as a timestamp.
	#[error("expiry is out of range.")]
	ExpiryOutOfRange,
}

/// Configuration and argument validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A secret source is present but holds an empty value.
	#[error("Secret `{name}` is set but empty.")]
	EmptySecret {
		/// Configuration key or environment variable name.
		name: &'static str,
	},
	/// A secret environment variable is not valid UTF-8.
	#[error("Secret `{name}` is not valid unicode.")]
	SecretNotUnicode {
		/// Environment variable name.
		name: &'static str,
	},
	/// Rate limits must admit at least one request.
	#[error("Rate limit must be greater than zero.")]
	ZeroLimit,
	/// Windows must have a positive length.
	#[error("Rate limit window must be positive, got {window}.")]
	NonPositiveWindow {
		/// Rejected window length.
		window: Duration,
	},
	/// Window end does not fit the supported timestamp range.
	#[error("Rate limit window end is out of range.")]
	WindowOutOfRange,
	/// Identifier embedded in a token failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::token::IdentifierError),
	/// Bearer claims carry an empty email address.
	#[error("Bearer claims require a non-empty email.")]
	EmptyEmail,
	/// Link base URL cannot carry path segments (e.g. `mailto:`).
	#[error("Base URL `{url}` cannot carry a resource path.")]
	InvalidBaseUrl {
		/// Rejected base URL.
		url: String,
	},
	/// Token claims could not be serialized.
	#[error("Token claims could not be encoded.")]
	ClaimsEncoding {
		/// Underlying serializer failure.
		#[source]
		source: serde_json::Error,
	},
}
