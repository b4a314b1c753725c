//! Optional observability helpers for the token cache.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment the `blind_token_cache_requests_total` counter on every
//!   dispense attempt (labeled by `outcome`) and to record the periodic
//!   `blind_token_cache_token_spend_rate_per_hour` / `blind_token_cache_token_expiration_rate_per_hour`
//!   histograms.
//! - Enable `tracing` to emit debug events for refill completions, backoff deadlines, and expiry
//!   purges.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for every dispense attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenRequestOutcome {
	/// A token was available and handed to the caller.
	Hit,
	/// The cache was empty after purging expired tokens.
	Miss,
}
impl TokenRequestOutcome {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenRequestOutcome::Hit => "hit",
			TokenRequestOutcome::Miss => "miss",
		}
	}
}
impl Display for TokenRequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
