//! Cache error types.
//!
//! The cache surface is deliberately almost error-free: an empty cache is an expected steady-state
//! condition reported as `None`, and an issuer decline is absorbed internally as backoff. The only
//! fallible operation is an explicit fill request.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by explicit fill requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
	/// The cache was built without a token source; it stays permanently empty.
	#[error("No token source is bound to this cache.")]
	SourceUnbound,
	/// A token batch request or refill callback is already outstanding.
	#[error("A token batch request is already in flight.")]
	RefillPending,
}
