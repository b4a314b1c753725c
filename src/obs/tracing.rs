// self
use crate::_prelude::OffsetDateTime;

/// Emits a debug event for a refill that merged a token batch (when enabled).
pub fn trace_refill(added: usize, cached: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(added, cached, "token cache refilled");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (added, cached);
	}
}

/// Emits a debug event for a source-directed backoff deadline (when enabled).
pub fn trace_backoff(try_again_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(%try_again_at, "token source declined, backing off");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = try_again_at;
	}
}

/// Emits a debug event for tokens discarded as expired (when enabled).
pub fn trace_expired(purged: usize, cached: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(purged, cached, "expired tokens purged");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (purged, cached);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn tracers_noop_without_tracing() {
		trace_refill(64, 64);
		trace_backoff(OffsetDateTime::UNIX_EPOCH);
		trace_expired(3, 13);
	}
}
