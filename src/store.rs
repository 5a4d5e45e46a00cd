//! Storage contracts and built-in store implementations for rate-limit windows.
//!
//! The limiter is correct only if every mutation below executes as one atomic, conditional
//! operation on the backing engine. In SQL terms:
//!
//! - `upsert_window`: `INSERT .. ON CONFLICT (key) DO UPDATE SET count = $count, reset_at =
//!   $reset_at WHERE windows.reset_at <= $now RETURNING ..`
//! - `increment_window`: `UPDATE windows SET count = count + 1 WHERE key = $key AND reset_at >
//!   $now AND count < $limit RETURNING ..`
//! - `delete_expired`: `DELETE FROM windows WHERE reset_at <= $now`

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`WindowStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Shared counter store backing the rate limiter.
pub trait WindowStore
where
	Self: Send + Sync,
{
	/// Fetches the row for `key`, expired or not.
	fn get_window<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<WindowRow>>;

	/// Atomically opens a window with `count`/`reset_at` if the row is absent or expired at
	/// `now`; a live row is left untouched and reported instead.
	fn upsert_window<'a>(
		&'a self,
		key: &'a str,
		count: u32,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome>;

	/// Atomically increments a live row whose count is below `limit`.
	fn increment_window<'a>(
		&'a self,
		key: &'a str,
		limit: u32,
		now: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome>;

	/// Deletes every row with `reset_at <= now`, returning how many were removed.
	fn delete_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, u64>;
}

/// Persisted fixed-window counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRow {
	/// Bucket + subject key.
	pub key: String,
	/// Requests admitted in the current window.
	pub count: u32,
	/// Instant when the window closes.
	#[serde(with = "time::serde::rfc3339")]
	pub reset_at: OffsetDateTime,
}
impl WindowRow {
	/// Returns `true` once the window has closed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.reset_at
	}
}

/// Result of a conditional [`WindowStore::upsert_window`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
	/// The row was absent or expired and now holds the new window.
	Opened(WindowRow),
	/// A concurrent writer already holds a live window; nothing changed.
	Live(WindowRow),
}

/// Result of a conditional [`WindowStore::increment_window`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncrementOutcome {
	/// The count was incremented; the row reflects the new count.
	Incremented(WindowRow),
	/// The live window is already at the limit; nothing changed.
	Saturated(WindowRow),
	/// No row exists for the key.
	Missing,
	/// The row exists but its window has closed.
	Expired,
}

/// Error type produced by [`WindowStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// The backend could not be reached (connection refused, pool exhausted).
	#[error("Store unavailable: {message}.")]
	Unavailable {
		/// Human-readable error payload.
		message: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
