//! Wall-clock source backed by the Tokio runtime's monotonic clock.

// crates.io
use tokio::time::Instant;
// self
use crate::_prelude::*;

/// Wall-clock instants derived from a fixed anchor plus Tokio's monotonic elapsed time.
///
/// Token expirations are absolute wall times handed out by the issuer, while every timer in this
/// crate runs on the Tokio clock. Anchoring the wall clock to the runtime clock keeps the two in
/// lockstep—in particular under `tokio::time::pause`, where advancing the runtime advances this
/// clock by exactly the same amount.
#[derive(Clone, Debug)]
pub struct CacheClock {
	wall_anchor: OffsetDateTime,
	monotonic_anchor: Instant,
}
impl CacheClock {
	/// Creates a clock anchored to the current wall time and runtime instant.
	pub fn new() -> Self {
		Self { wall_anchor: OffsetDateTime::now_utc(), monotonic_anchor: Instant::now() }
	}

	/// Returns the current wall-clock instant.
	pub fn now(&self) -> OffsetDateTime {
		self.wall_anchor + self.monotonic_anchor.elapsed()
	}
}
impl Default for CacheClock {
	fn default() -> Self {
		Self::new()
	}
}

/// Converts a wall-clock delay into a sleepable duration, clamping negative delays to zero.
pub(crate) fn sleepable(delay: Duration) -> std::time::Duration {
	if delay.is_negative() { std::time::Duration::ZERO } else { delay.unsigned_abs() }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn clock_tracks_paused_runtime() {
		let clock = CacheClock::new();
		let start = clock.now();

		tokio::time::advance(std::time::Duration::from_secs(90)).await;

		assert_eq!(clock.now() - start, Duration::seconds(90));
	}

	#[test]
	fn negative_delays_clamp_to_zero() {
		assert_eq!(sleepable(Duration::seconds(-3)), std::time::Duration::ZERO);
		assert_eq!(sleepable(Duration::seconds(2)), std::time::Duration::from_secs(2));
	}
}
