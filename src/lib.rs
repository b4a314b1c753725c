//! In-memory cache of blind-signed auth tokens—dispense synchronously from a request hot path,
//! refill in the background from an asynchronous token source, honor issuer-directed backoff, and
//! measure token spend/expiration rates.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod clock;
pub mod error;
pub mod obs;
pub mod source;
pub mod token;

mod _prelude {
	pub use std::{
		collections::VecDeque,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::{Arc, Weak},
	};

	pub use parking_lot::Mutex;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

pub use time;
