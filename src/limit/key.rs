//! Rate-limit keys (`bucket:kind:subject`) and the storefront's preset rules.

// std
use std::net::IpAddr;
// self
use crate::_prelude::*;

/// Who a rate-limit bucket counts against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitSubject {
	/// Client address.
	Ip(IpAddr),
	/// User-supplied email, compared case-insensitively.
	Email(String),
	/// Authenticated account identifier.
	User(String),
}
impl RateLimitSubject {
	/// Builds an email subject, trimming and lower-casing the address.
	pub fn email(address: impl AsRef<str>) -> Self {
		Self::Email(address.as_ref().trim().to_lowercase())
	}

	/// Returns a stable label for the subject kind.
	pub const fn kind(&self) -> &'static str {
		match self {
			RateLimitSubject::Ip(_) => "ip",
			RateLimitSubject::Email(_) => "email",
			RateLimitSubject::User(_) => "user",
		}
	}
}
impl Display for RateLimitSubject {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			RateLimitSubject::Ip(ip) => write!(f, "ip:{ip}"),
			RateLimitSubject::Email(email) => write!(f, "email:{email}"),
			RateLimitSubject::User(user) => write!(f, "user:{user}"),
		}
	}
}

/// Named bucket with its budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitRule {
	/// Bucket name; the first key component.
	pub bucket: &'static str,
	/// Requests admitted per window.
	pub limit: u32,
	/// Window length.
	pub window: Duration,
}
impl RateLimitRule {
	/// Sign-in attempts: 5 per 15 minutes.
	pub const LOGIN: Self = Self::new("login", 5, Duration::minutes(15));
	/// Password reset requests: 3 per hour.
	pub const PASSWORD_RESET: Self = Self::new("password_reset", 3, Duration::hours(1));
	/// Contact form submissions: 5 per hour.
	pub const CONTACT_FORM: Self = Self::new("contact", 5, Duration::hours(1));
	/// Back-office mutations: 60 per minute.
	pub const ADMIN_MUTATION: Self = Self::new("admin", 60, Duration::minutes(1));

	/// Creates a rule.
	pub const fn new(bucket: &'static str, limit: u32, window: Duration) -> Self {
		Self { bucket, limit, window }
	}

	/// Store key for `subject` under this bucket, e.g. `login:ip:1.2.3.4`.
	pub fn key_for(&self, subject: &RateLimitSubject) -> String {
		format!("{}:{subject}", self.bucket)
	}
}
