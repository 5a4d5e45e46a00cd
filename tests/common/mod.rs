//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{
	future,
	sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	},
};
// crates.io
use time::OffsetDateTime;
// self
use storefront_guard::{
	config::{SecretSlot, SecretsConfig},
	limit::RateLimiter,
	store::{
		IncrementOutcome, MemoryStore, StoreError, StoreFuture, UpsertOutcome, WindowRow,
		WindowStore,
	},
	token::{SigningSecret, TokenSigner},
};

pub fn secret(value: &str) -> SigningSecret {
	SigningSecret::new(value).expect("Secret fixture should be non-empty.")
}

/// Signer with only the shared application secret configured.
pub fn app_signer() -> TokenSigner {
	TokenSigner::new(SecretsConfig::default().with_secret(SecretSlot::App, secret("app-secret")))
}

/// Signer with every slot configured with a distinct value.
pub fn full_signer() -> TokenSigner {
	TokenSigner::new(
		SecretsConfig::default()
			.with_secret(SecretSlot::App, secret("app-secret"))
			.with_secret(SecretSlot::Link, secret("link-secret"))
			.with_secret(SecretSlot::Unsubscribe, secret("unsubscribe-secret"))
			.with_secret(SecretSlot::MobileApi, secret("mobile-secret"))
			.with_secret(SecretSlot::Cron, secret("cron-secret")),
	)
}

pub fn memory_limiter() -> (RateLimiter, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let limiter = RateLimiter::new(store.clone());

	(limiter, store)
}

/// Store whose operations never complete.
pub struct StallingStore;
impl WindowStore for StallingStore {
	fn get_window<'a>(&'a self, _: &'a str) -> StoreFuture<'a, Option<WindowRow>> {
		Box::pin(future::pending::<Result<Option<WindowRow>, StoreError>>())
	}

	fn upsert_window<'a>(
		&'a self,
		_: &'a str,
		_: u32,
		_: OffsetDateTime,
		_: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome> {
		Box::pin(future::pending::<Result<UpsertOutcome, StoreError>>())
	}

	fn increment_window<'a>(
		&'a self,
		_: &'a str,
		_: u32,
		_: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome> {
		Box::pin(future::pending::<Result<IncrementOutcome, StoreError>>())
	}

	fn delete_expired(&self, _: OffsetDateTime) -> StoreFuture<'_, u64> {
		Box::pin(future::pending::<Result<u64, StoreError>>())
	}
}

/// Store that reports every operation as unreachable.
pub struct DownStore;
impl DownStore {
	fn down<T>() -> Result<T, StoreError> {
		Err(StoreError::Unavailable { message: "connection refused".into() })
	}
}
impl WindowStore for DownStore {
	fn get_window<'a>(&'a self, _: &'a str) -> StoreFuture<'a, Option<WindowRow>> {
		Box::pin(async { Self::down() })
	}

	fn upsert_window<'a>(
		&'a self,
		_: &'a str,
		_: u32,
		_: OffsetDateTime,
		_: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome> {
		Box::pin(async { Self::down() })
	}

	fn increment_window<'a>(
		&'a self,
		_: &'a str,
		_: u32,
		_: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome> {
		Box::pin(async { Self::down() })
	}

	fn delete_expired(&self, _: OffsetDateTime) -> StoreFuture<'_, u64> {
		Box::pin(async { Self::down() })
	}
}

/// Memory store whose reads always miss, forcing every check through the conditional upsert
/// as if another worker had raced ahead of the read.
#[derive(Default)]
pub struct StaleReadStore(pub MemoryStore);
impl WindowStore for StaleReadStore {
	fn get_window<'a>(&'a self, _: &'a str) -> StoreFuture<'a, Option<WindowRow>> {
		Box::pin(async { Ok(None) })
	}

	fn upsert_window<'a>(
		&'a self,
		key: &'a str,
		count: u32,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome> {
		self.0.upsert_window(key, count, reset_at, now)
	}

	fn increment_window<'a>(
		&'a self,
		key: &'a str,
		limit: u32,
		now: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome> {
		self.0.increment_window(key, limit, now)
	}

	fn delete_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, u64> {
		self.0.delete_expired(now)
	}
}

/// Memory store that yields to the scheduler before every operation, so concurrent checks
/// interleave between the limiter's read and its conditional write.
#[derive(Default)]
pub struct YieldingStore(pub MemoryStore);
impl WindowStore for YieldingStore {
	fn get_window<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<WindowRow>> {
		Box::pin(async move {
			tokio::task::yield_now().await;

			self.0.get_window(key).await
		})
	}

	fn upsert_window<'a>(
		&'a self,
		key: &'a str,
		count: u32,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome> {
		Box::pin(async move {
			tokio::task::yield_now().await;

			self.0.upsert_window(key, count, reset_at, now).await
		})
	}

	fn increment_window<'a>(
		&'a self,
		key: &'a str,
		limit: u32,
		now: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome> {
		Box::pin(async move {
			tokio::task::yield_now().await;

			self.0.increment_window(key, limit, now).await
		})
	}

	fn delete_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, u64> {
		Box::pin(async move {
			tokio::task::yield_now().await;

			self.0.delete_expired(now).await
		})
	}
}

/// Memory store whose next `misses` increments report the row as gone, as if a sweep had
/// removed it between the limiter's read and its increment.
pub struct VanishingRowStore {
	pub inner: MemoryStore,
	misses: AtomicU32,
}
impl VanishingRowStore {
	pub fn new(misses: u32) -> Self {
		Self { inner: MemoryStore::default(), misses: AtomicU32::new(misses) }
	}

	/// `Missing` answers still to be handed out.
	pub fn pending_misses(&self) -> u32 {
		self.misses.load(Ordering::SeqCst)
	}
}
impl WindowStore for VanishingRowStore {
	fn get_window<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<WindowRow>> {
		self.inner.get_window(key)
	}

	fn upsert_window<'a>(
		&'a self,
		key: &'a str,
		count: u32,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome> {
		self.inner.upsert_window(key, count, reset_at, now)
	}

	fn increment_window<'a>(
		&'a self,
		key: &'a str,
		limit: u32,
		now: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome> {
		let vanished = self
			.misses
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok();

		if vanished {
			Box::pin(async { Ok(IncrementOutcome::Missing) })
		} else {
			self.inner.increment_window(key, limit, now)
		}
	}

	fn delete_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, u64> {
		self.inner.delete_expired(now)
	}
}

/// Memory store whose first sweep fails as unreachable; later sweeps succeed.
#[derive(Default)]
pub struct FlakySweepStore {
	pub inner: MemoryStore,
	sweeps: AtomicU32,
}
impl FlakySweepStore {
	pub fn sweeps(&self) -> u32 {
		self.sweeps.load(Ordering::SeqCst)
	}
}
impl WindowStore for FlakySweepStore {
	fn get_window<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<WindowRow>> {
		self.inner.get_window(key)
	}

	fn upsert_window<'a>(
		&'a self,
		key: &'a str,
		count: u32,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome> {
		self.inner.upsert_window(key, count, reset_at, now)
	}

	fn increment_window<'a>(
		&'a self,
		key: &'a str,
		limit: u32,
		now: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome> {
		self.inner.increment_window(key, limit, now)
	}

	fn delete_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, u64> {
		if self.sweeps.fetch_add(1, Ordering::SeqCst) == 0 {
			Box::pin(async { DownStore::down() })
		} else {
			self.inner.delete_expired(now)
		}
	}
}
