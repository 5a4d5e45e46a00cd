//! Thread-safe in-memory [`WindowStore`] for tests and single-process deployments.

// self
use crate::{
	_prelude::*,
	store::{IncrementOutcome, StoreFuture, UpsertOutcome, WindowRow, WindowStore},
};

type WindowMap = Arc<RwLock<HashMap<String, WindowRow>>>;

/// In-process store; every conditional mutation runs under one write lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(WindowMap);
impl MemoryStore {
	/// Number of rows currently held, expired ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no rows are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn upsert_now(
		map: &WindowMap,
		key: &str,
		count: u32,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> UpsertOutcome {
		let mut guard = map.write();

		match guard.get(key) {
			Some(existing) if !existing.is_expired_at(now) => UpsertOutcome::Live(existing.clone()),
			_ => {
				let row = WindowRow { key: key.to_owned(), count, reset_at };

				guard.insert(key.to_owned(), row.clone());

				UpsertOutcome::Opened(row)
			},
		}
	}

	fn increment_now(
		map: &WindowMap,
		key: &str,
		limit: u32,
		now: OffsetDateTime,
	) -> IncrementOutcome {
		let mut guard = map.write();

		match guard.get_mut(key) {
			None => IncrementOutcome::Missing,
			Some(row) if row.is_expired_at(now) => IncrementOutcome::Expired,
			Some(row) if row.count >= limit => IncrementOutcome::Saturated(row.clone()),
			Some(row) => {
				row.count += 1;

				IncrementOutcome::Incremented(row.clone())
			},
		}
	}

	fn delete_expired_now(map: &WindowMap, now: OffsetDateTime) -> u64 {
		let mut guard = map.write();
		let before = guard.len();

		guard.retain(|_, row| !row.is_expired_at(now));

		(before - guard.len()) as u64
	}
}
impl WindowStore for MemoryStore {
	fn get_window<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<WindowRow>> {
		Box::pin(async move { Ok(self.0.read().get(key).cloned()) })
	}

	fn upsert_window<'a>(
		&'a self,
		key: &'a str,
		count: u32,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome> {
		Box::pin(async move { Ok(Self::upsert_now(&self.0, key, count, reset_at, now)) })
	}

	fn increment_window<'a>(
		&'a self,
		key: &'a str,
		limit: u32,
		now: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome> {
		Box::pin(async move { Ok(Self::increment_now(&self.0, key, limit, now)) })
	}

	fn delete_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, u64> {
		Box::pin(async move { Ok(Self::delete_expired_now(&self.0, now)) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const KEY: &str = "login:ip:1.2.3.4";

	#[tokio::test]
	async fn upsert_leaves_live_rows_untouched() {
		let store = MemoryStore::default();
		let now = macros::datetime!(2030-01-01 00:00 UTC);
		let reset_at = now + Duration::minutes(1);
		let opened = store
			.upsert_window(KEY, 1, reset_at, now)
			.await
			.expect("Opening a window should succeed.");

		assert!(matches!(opened, UpsertOutcome::Opened(ref row) if row.count == 1));

		let live = store
			.upsert_window(KEY, 1, reset_at + Duration::seconds(5), now + Duration::seconds(5))
			.await
			.expect("Second upsert should succeed.");

		assert_eq!(live, UpsertOutcome::Live(WindowRow { key: KEY.into(), count: 1, reset_at }));

		let reopened = store
			.upsert_window(KEY, 1, reset_at + Duration::minutes(1), reset_at)
			.await
			.expect("Upsert over an expired row should succeed.");

		assert!(matches!(reopened, UpsertOutcome::Opened(_)));
	}

	#[tokio::test]
	async fn increment_respects_limit_and_expiry() {
		let store = MemoryStore::default();
		let now = macros::datetime!(2030-01-01 00:00 UTC);
		let reset_at = now + Duration::minutes(1);

		assert_eq!(
			store.increment_window(KEY, 2, now).await.expect("Increment should not fail."),
			IncrementOutcome::Missing
		);

		store.upsert_window(KEY, 1, reset_at, now).await.expect("Opening should succeed.");

		assert!(matches!(
			store.increment_window(KEY, 2, now).await.expect("Increment should not fail."),
			IncrementOutcome::Incremented(WindowRow { count: 2, .. })
		));
		assert!(matches!(
			store.increment_window(KEY, 2, now).await.expect("Increment should not fail."),
			IncrementOutcome::Saturated(WindowRow { count: 2, .. })
		));
		assert_eq!(
			store.increment_window(KEY, 2, reset_at).await.expect("Increment should not fail."),
			IncrementOutcome::Expired
		);
	}

	#[tokio::test]
	async fn delete_expired_keeps_live_rows() {
		let store = MemoryStore::default();
		let now = macros::datetime!(2030-01-01 00:00 UTC);

		store.upsert_window("a", 1, now, now - Duration::seconds(1)).await.expect("open a");
		store
			.upsert_window("b", 1, now + Duration::seconds(1), now)
			.await
			.expect("open b");

		assert_eq!(store.delete_expired(now).await.expect("Sweep should succeed."), 1);
		assert_eq!(store.len(), 1);
		assert!(store.get_window("b").await.expect("Fetch should succeed.").is_some());
		assert_eq!(store.delete_expired(now).await.expect("Repeat sweep should succeed."), 0);
	}
}
