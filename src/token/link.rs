//! Time-limited resource links (`<base>/<id>?expires=<epochMillis>&token=<hex>`).

// self
use crate::{
	_prelude::*,
	compare,
	config::TokenPurpose,
	error::{ConfigError, InvalidTokenReason},
	obs::GuardKind,
	token::{ResourceId, TokenSigner},
};

const EXPIRES_PARAM: &str = "expires";
const TOKEN_PARAM: &str = "token";
const SIGNATURE_HEX_LEN: usize = 64;

/// A signed link to a single resource, valid until `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceLink {
	/// Resource the link grants access to.
	pub resource_id: ResourceId,
	/// Expiry, truncated to whole milliseconds.
	pub expires_at: OffsetDateTime,
	/// Lowercase hex HMAC signature.
	pub token: String,
}
impl ResourceLink {
	/// Expiry as Unix epoch milliseconds, the form carried on the wire.
	pub fn expires_at_millis(&self) -> i64 {
		epoch_millis(self.expires_at)
	}

	/// Appends the resource id as the last path segment plus `expires` and `token` parameters.
	pub fn to_url(&self, base: &Url) -> Result<Url> {
		let mut url = base.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidBaseUrl { url: base.to_string() })?
			.pop_if_empty()
			.push(&self.resource_id);

		let mut pairs = url.query_pairs_mut();

		pairs.append_pair(EXPIRES_PARAM, &self.expires_at_millis().to_string());
		pairs.append_pair(TOKEN_PARAM, &self.token);

		drop(pairs);

		Ok(url)
	}

	/// Extracts a link from a URL produced by [`ResourceLink::to_url`].
	///
	/// Only the shape is checked here; call [`TokenSigner::verify_link`] to authorize it.
	pub fn from_url(url: &Url) -> Result<Self> {
		let malformed = || Error::invalid(InvalidTokenReason::Malformed);
		let resource_id = url
			.path_segments()
			.and_then(|mut segments| segments.next_back())
			.and_then(|segment| segment.parse::<ResourceId>().ok())
			.ok_or_else(malformed)?;
		let mut expires = None;
		let mut token = None;

		for (name, value) in url.query_pairs() {
			match name.as_ref() {
				EXPIRES_PARAM => expires = Some(value.into_owned()),
				TOKEN_PARAM => token = Some(value.into_owned()),
				_ => {},
			}
		}

		let millis = expires.and_then(|raw| raw.parse::<i64>().ok()).ok_or_else(malformed)?;
		let token = token.ok_or_else(malformed)?;

		Ok(Self { resource_id, expires_at: from_epoch_millis(millis)?, token })
	}
}

impl TokenSigner {
	/// Signs a link to `resource_id` that stays valid until `expires_at`.
	///
	/// Fails with [`Error::ConfigurationMissing`] when no secret resolves for `purpose`; a link
	/// is never issued unsigned.
	pub fn sign_resource_link(
		&self,
		purpose: TokenPurpose,
		resource_id: &ResourceId,
		expires_at: OffsetDateTime,
	) -> Result<ResourceLink> {
		Self::observe(GuardKind::ResourceLink, "sign_resource_link", || {
			let expires_at = from_epoch_millis(epoch_millis(expires_at))?;
			let token = self.link_signature(purpose, resource_id, expires_at)?;

			Ok(ResourceLink { resource_id: resource_id.clone(), expires_at, token })
		})
	}

	/// Verifies a link against the current clock.
	pub fn verify_resource_link(
		&self,
		purpose: TokenPurpose,
		resource_id: &ResourceId,
		expires_at: OffsetDateTime,
		token: &str,
	) -> Result<()> {
		self.verify_resource_link_at(
			purpose,
			resource_id,
			expires_at,
			token,
			OffsetDateTime::now_utc(),
		)
	}

	/// Verifies a link as of `now`.
	///
	/// Expiry is checked first so stale links cost no hashing. Past expiry yields
	/// [`Error::TokenExpired`]; a bad or malformed signature yields [`Error::InvalidToken`].
	pub fn verify_resource_link_at(
		&self,
		purpose: TokenPurpose,
		resource_id: &ResourceId,
		expires_at: OffsetDateTime,
		token: &str,
		now: OffsetDateTime,
	) -> Result<()> {
		Self::observe(GuardKind::ResourceLink, "verify_resource_link", || {
			if now >= expires_at {
				return Err(Error::TokenExpired { expired_at: expires_at });
			}
			if token.len() != SIGNATURE_HEX_LEN {
				return Err(Error::invalid(InvalidTokenReason::Malformed));
			}

			let expected = self.link_signature(purpose, resource_id, expires_at)?;

			if compare::timing_safe_eq_str(&expected, token) {
				Ok(())
			} else {
				Err(Error::invalid(InvalidTokenReason::SignatureMismatch))
			}
		})
	}

	/// Verifies a parsed [`ResourceLink`] against the current clock.
	pub fn verify_link(&self, purpose: TokenPurpose, link: &ResourceLink) -> Result<()> {
		self.verify_resource_link(purpose, &link.resource_id, link.expires_at, &link.token)
	}

	fn link_signature(
		&self,
		purpose: TokenPurpose,
		resource_id: &ResourceId,
		expires_at: OffsetDateTime,
	) -> Result<String> {
		let canonical = canonical_link(purpose, resource_id, expires_at);

		Ok(hex::encode(self.mac(purpose, canonical.as_bytes())?))
	}
}

/// `purpose \n resource_id \n expires_millis`; the purpose label keeps links minted under a
/// shared fallback secret from being replayed across purposes.
fn canonical_link(
	purpose: TokenPurpose,
	resource_id: &ResourceId,
	expires_at: OffsetDateTime,
) -> String {
	format!("{}\n{}\n{}", purpose.as_str(), resource_id, epoch_millis(expires_at))
}

fn epoch_millis(instant: OffsetDateTime) -> i64 {
	// Every representable `OffsetDateTime` fits in i64 milliseconds.
	(instant.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_epoch_millis(millis: i64) -> Result<OffsetDateTime> {
	OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
		.map_err(|_| Error::invalid(InvalidTokenReason::ExpiryOutOfRange))
}
