mod common;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use storefront_guard::{
	error::Error,
	limit::{RateLimiter, WindowSweeper},
	store::{MemoryStore, WindowStore},
};

const WINDOW: Duration = Duration::minutes(1);

#[tokio::test]
async fn sweep_removes_only_closed_windows() {
	let (limiter, store) = common::memory_limiter();
	let now = macros::datetime!(2030-01-01 12:00 UTC);

	limiter
		.check_and_consume_at("login:ip:10.0.0.1", 5, WINDOW, now - Duration::minutes(5))
		.await
		.expect("Seeding an old window should succeed.");
	limiter
		.check_and_consume_at("login:ip:10.0.0.2", 5, WINDOW, now - WINDOW)
		.await
		.expect("Seeding a window closing exactly now should succeed.");
	limiter
		.check_and_consume_at("login:ip:10.0.0.3", 5, WINDOW, now)
		.await
		.expect("Seeding a live window should succeed.");

	let sweeper = WindowSweeper::new(store.clone());

	assert_eq!(sweeper.sweep_at(now).await.expect("Sweep should succeed."), 2);
	assert_eq!(store.len(), 1);
	assert!(
		store.get_window("login:ip:10.0.0.3").await.expect("Fetch should succeed.").is_some()
	);
	assert_eq!(sweeper.sweep_at(now).await.expect("Second sweep should succeed."), 0);
}

#[tokio::test]
async fn checks_after_a_sweep_open_fresh_windows() {
	let (limiter, store) = common::memory_limiter();
	let now = macros::datetime!(2030-01-01 12:00 UTC);
	let key = "contact:email:a@b.com";

	for _ in 0..3 {
		limiter.check_and_consume_at(key, 3, WINDOW, now).await.expect("Check should succeed.");
	}

	let later = now + WINDOW;

	WindowSweeper::new(store.clone()).sweep_at(later).await.expect("Sweep should succeed.");

	assert!(store.is_empty());

	let decision = limiter
		.check_and_consume_at(key, 3, WINDOW, later)
		.await
		.expect("Check after sweep should succeed.");

	assert!(decision.allowed);
	assert_eq!(decision.remaining, 2);
	assert_eq!(decision.reset_at, later + WINDOW);
}

#[tokio::test]
async fn sweep_surfaces_store_outages() {
	let err = WindowSweeper::new(Arc::new(common::DownStore))
		.sweep()
		.await
		.expect_err("Sweeping an unreachable store should fail.");

	assert!(matches!(err, Error::StoreUnavailable { operation: "delete_expired", .. }));
}

#[tokio::test]
async fn run_sweeps_until_shutdown() {
	let store = Arc::new(MemoryStore::default());
	let limiter = RateLimiter::new(store.clone());
	let past = OffsetDateTime::now_utc() - Duration::hours(2);

	for key in ["admin:user:1", "admin:user:2"] {
		limiter
			.check_and_consume_at(key, 60, WINDOW, past)
			.await
			.expect("Seeding an old window should succeed.");
	}

	let deleted = WindowSweeper::new(store.clone())
		.run(StdDuration::from_millis(10), tokio::time::sleep(StdDuration::from_millis(200)))
		.await;

	assert_eq!(deleted, 2);
	assert!(store.is_empty());
}

#[tokio::test]
async fn run_keeps_going_when_sweeps_fail() {
	let store = Arc::new(common::FlakySweepStore::default());
	let past = OffsetDateTime::now_utc() - Duration::hours(2);

	for key in ["contact:ip:10.0.0.1", "contact:ip:10.0.0.2"] {
		store
			.upsert_window(key, 1, past + WINDOW, past)
			.await
			.expect("Seeding an old window should succeed.");
	}

	let deleted = WindowSweeper::new(store.clone())
		.run(StdDuration::from_millis(5), tokio::time::sleep(StdDuration::from_millis(200)))
		.await;

	assert_eq!(deleted, 2, "sweeps after the failed one should still run");
	assert!(store.sweeps() >= 2);
	assert!(store.inner.is_empty());
}
