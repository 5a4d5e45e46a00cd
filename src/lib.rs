//! Storefront security core: HMAC-signed resource links and bearer sessions, scheduled-job
//! authorization, and store-backed fixed-window rate limiting that stays correct across many
//! stateless workers.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod compare;
pub mod config;
pub mod error;
pub mod limit;
pub mod obs;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use color_eyre as _;
