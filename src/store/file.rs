//! JSON-file [`WindowStore`] for single-node deployments whose counters must survive a restart.
//!
//! Each mutation holds an async lock on the rows, writes the resulting snapshot on tokio's
//! blocking pool, and applies the change in memory only after the write succeeded. A failed
//! write leaves memory untouched, and a slow disk never blocks the executor, so the limiter's
//! store timeout still fires.
//!
//! A write that outlives its caller's timeout still lands on disk. After a restart such a
//! mutation may count even though the caller saw
//! [`crate::error::Error::StoreUnavailable`]; the limiter then errs towards denying. Several
//! processes must not share one file; horizontally scaled workers need a networked backend.

// std
use std::{
	fs::{self, File},
	io::{self, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{IncrementOutcome, StoreError, StoreFuture, UpsertOutcome, WindowRow, WindowStore},
};

const SNAPSHOT_VERSION: u32 = 1;

type WindowMap = HashMap<String, WindowRow>;

/// On-disk document: rows sorted by key so diffs between snapshots stay readable.
#[derive(Serialize, Deserialize)]
struct Snapshot<R> {
	version: u32,
	windows: Vec<R>,
}

#[derive(Debug)]
struct Windows {
	rows: WindowMap,
	// Bumped under the rows lock for every snapshot handed to the writer.
	generation: u64,
}

/// Window rows mirrored to a JSON snapshot after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	windows: Arc<AsyncMutex<Windows>>,
	// Generation of the newest snapshot on disk; held for the duration of a write.
	written: Arc<Mutex<u64>>,
}
impl FileStore {
	/// Opens the snapshot at `path`, creating parent directories; a missing or empty file
	/// starts an empty store.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			fs::create_dir_all(dir).map_err(io_failure("create directory", dir))?;
		}

		let rows = read_snapshot(&path)?;

		Ok(Self {
			path,
			windows: Arc::new(AsyncMutex::new(Windows { rows, generation: 0 })),
			written: Arc::new(Mutex::new(0)),
		})
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Writes `snapshot` as the next generation without blocking the executor.
	///
	/// A generation older than the one already on disk is discarded, so a write abandoned by a
	/// timed-out caller cannot overwrite newer state.
	async fn persist(&self, generation: &mut u64, snapshot: Vec<u8>) -> Result<(), StoreError> {
		*generation += 1;

		let generation = *generation;
		let path = self.path.clone();
		let written = self.written.clone();

		tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
			let mut newest = written.lock();

			if *newest > generation {
				return Ok(());
			}

			write_snapshot(&path, &snapshot)?;

			*newest = generation;

			Ok(())
		})
		.await
		.map_err(|e| StoreError::Backend { message: format!("snapshot writer failed: {e}") })?
	}
}
impl WindowStore for FileStore {
	fn get_window<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<WindowRow>> {
		Box::pin(async move { Ok(self.windows.lock().await.rows.get(key).cloned()) })
	}

	fn upsert_window<'a>(
		&'a self,
		key: &'a str,
		count: u32,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, UpsertOutcome> {
		Box::pin(async move {
			let mut windows = self.windows.lock().await;

			if let Some(live) = windows.rows.get(key).filter(|row| !row.is_expired_at(now)) {
				return Ok(UpsertOutcome::Live(live.clone()));
			}

			let opened = WindowRow { key: key.to_owned(), count, reset_at };
			let snapshot =
				encode(windows.rows.values().filter(|row| row.key != key).chain([&opened]))?;

			self.persist(&mut windows.generation, snapshot).await?;
			windows.rows.insert(key.to_owned(), opened.clone());

			Ok(UpsertOutcome::Opened(opened))
		})
	}

	fn increment_window<'a>(
		&'a self,
		key: &'a str,
		limit: u32,
		now: OffsetDateTime,
	) -> StoreFuture<'a, IncrementOutcome> {
		Box::pin(async move {
			let mut windows = self.windows.lock().await;
			let incremented = match windows.rows.get(key) {
				None => return Ok(IncrementOutcome::Missing),
				Some(row) if row.is_expired_at(now) => return Ok(IncrementOutcome::Expired),
				Some(row) if row.count >= limit =>
					return Ok(IncrementOutcome::Saturated(row.clone())),
				Some(row) => WindowRow { count: row.count + 1, ..row.clone() },
			};
			let snapshot =
				encode(windows.rows.values().filter(|row| row.key != key).chain([&incremented]))?;

			self.persist(&mut windows.generation, snapshot).await?;
			windows.rows.insert(key.to_owned(), incremented.clone());

			Ok(IncrementOutcome::Incremented(incremented))
		})
	}

	fn delete_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, u64> {
		Box::pin(async move {
			let mut windows = self.windows.lock().await;
			let expired = windows.rows.values().filter(|row| row.is_expired_at(now)).count();

			if expired == 0 {
				return Ok(0);
			}

			let snapshot = encode(windows.rows.values().filter(|row| !row.is_expired_at(now)))?;

			self.persist(&mut windows.generation, snapshot).await?;
			windows.rows.retain(|_, row| !row.is_expired_at(now));

			Ok(expired as u64)
		})
	}
}

fn encode<'r>(rows: impl Iterator<Item = &'r WindowRow>) -> Result<Vec<u8>, StoreError> {
	let mut rows = rows.collect::<Vec<_>>();

	rows.sort_unstable_by(|a, b| a.key.cmp(&b.key));

	serde_json::to_vec_pretty(&Snapshot { version: SNAPSHOT_VERSION, windows: rows }).map_err(
		|e| StoreError::Serialization { message: format!("cannot encode window snapshot: {e}") },
	)
}

fn write_snapshot(path: &Path, snapshot: &[u8]) -> Result<(), StoreError> {
	let staging = path.with_extension("tmp");
	let mut file = File::create(&staging).map_err(io_failure("create", &staging))?;

	file.write_all(snapshot).map_err(io_failure("write", &staging))?;
	file.sync_all().map_err(io_failure("sync", &staging))?;
	fs::rename(&staging, path).map_err(io_failure("replace", path))
}

fn read_snapshot(path: &Path) -> Result<WindowMap, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(WindowMap::new()),
		Err(e) => return Err(io_failure("read", path)(e)),
	};

	if bytes.is_empty() {
		return Ok(WindowMap::new());
	}

	let snapshot = serde_json::from_slice::<Snapshot<WindowRow>>(&bytes).map_err(|e| {
		StoreError::Serialization { message: format!("cannot decode {}: {e}", path.display()) }
	})?;

	if snapshot.version != SNAPSHOT_VERSION {
		return Err(StoreError::Serialization {
			message: format!(
				"{} has snapshot version {}, expected {SNAPSHOT_VERSION}",
				path.display(),
				snapshot.version
			),
		});
	}

	Ok(snapshot.windows.into_iter().map(|row| (row.key.clone(), row)).collect())
}

fn io_failure(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> StoreError {
	let path = path.display().to_string();

	move |e| StoreError::Backend { message: format!("cannot {action} {path}: {e}") }
}
