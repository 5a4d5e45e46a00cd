//! Throttles a burst of sign-in attempts, then issues a mobile session and an invoice link for
//! the account that got through.

// std
use std::{net::IpAddr, sync::Arc};
// crates.io
use color_eyre::Result;
use time::{Duration, OffsetDateTime};
// self
use storefront_guard::{
	config::{SecretSlot, SecretsConfig, TokenPurpose},
	limit::{RateLimitRule, RateLimitSubject, RateLimiter},
	store::MemoryStore,
	token::{BearerClaims, ResourceId, SigningSecret, SubjectId, TokenSigner},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let limiter = RateLimiter::new(Arc::new(MemoryStore::default()));
	let ip: IpAddr = "198.51.100.7".parse()?;
	let subject = RateLimitSubject::Ip(ip);
	let rule = RateLimitRule::LOGIN;

	for attempt in 1..=rule.limit + 2 {
		let decision = limiter.check_rule(&rule, &subject).await?;

		match decision.retry_after(OffsetDateTime::now_utc()) {
			None => println!("attempt {attempt}: allowed, {} left", decision.remaining),
			Some(wait) => println!("attempt {attempt}: denied, retry in {}s", wait.whole_seconds()),
		}
	}

	let secrets = SecretsConfig::from_env()?
		.with_secret(SecretSlot::App, SigningSecret::new("demo-app-secret")?);
	let signer = TokenSigner::new(secrets);
	let claims = BearerClaims::new(SubjectId::new("u1")?, "jane@shop.example");
	let session = signer.issue_bearer_token(&claims)?;
	let parsed = signer.parse_bearer_token(&format!("Bearer {session}"))?;

	println!("session for {} expires {}", parsed.email, parsed.expires_at);

	let link = signer.sign_resource_link(
		TokenPurpose::OrderLink,
		&ResourceId::new("order-1042")?,
		OffsetDateTime::now_utc() + Duration::days(7),
	)?;

	println!("invoice: {}", link.to_url(&Url::parse("https://shop.example/invoices/")?)?);

	Ok(())
}
