//! Strongly typed identifiers embedded in signed tokens.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $allowed:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view, $allowed)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value, $allowed)?;

				Ok(Self(value))
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (resource, subject).
		kind: &'static str,
	},
	/// The identifier contains a character outside its allowed set.
	#[error("{kind} identifier contains the disallowed character {found:?}.")]
	DisallowedChar {
		/// Kind of identifier (resource, subject).
		kind: &'static str,
		/// First offending character.
		found: char,
	},
	/// The identifier exceeded the allowed byte length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier (resource, subject).
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

def_id! {
	ResourceId,
	"Identifier of a linkable resource (order, invoice, subscriber); URL-path safe.",
	"Resource",
	url_unreserved
}
def_id! {
	SubjectId,
	"Subject (account) identifier carried by bearer sessions.",
	"Subject",
	printable
}

/// RFC 3986 unreserved characters, so the id embeds in a URL path without escaping.
fn url_unreserved(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}

fn printable(c: char) -> bool {
	!c.is_whitespace() && !c.is_control()
}

fn validate_view(
	kind: &'static str,
	view: &str,
	allowed: fn(char) -> bool,
) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if let Some(found) = view.chars().find(|c| !allowed(*c)) {
		return Err(IdentifierError::DisallowedChar { kind, found });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
