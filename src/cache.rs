//! Blind-signed token cache with background refill and token-rate telemetry.
//!
//! [`BlindTokenCache`] sits in a request hot path: [`BlindTokenCache::is_token_available`] and
//! [`BlindTokenCache::get_token`] are synchronous, answer out of an in-memory queue kept sorted by
//! expiry, and never wait on the token source. Replenishment happens off to the side—consuming a
//! token nudges an idempotent refill check, and a dedicated scheduler task re-arms a single
//! deferred wake-up for the next instant anything can change: the source-directed backoff
//! deadline while one is pending, or the front token's expiry once the queue is healthy. At most
//! one batch request is in flight at any time.
//!
//! A second, independent task converts the spent/expired counters into per-hour rates every
//! [`RATE_MEASUREMENT_INTERVAL`] for the lifetime of the cache.

// crates.io
use tokio::{
	runtime::Handle,
	sync::Notify,
	task::JoinHandle,
	time::{Instant, sleep},
};
// self
use crate::{
	_prelude::*,
	clock::{self, CacheClock},
	obs::{self, TokenRequestOutcome},
	source::{BlindTokenSource, TokenBatchReply},
	token::BlindSignedToken,
};

/// Number of tokens requested from the source in one batch.
pub const BATCH_SIZE: u32 = 64;
/// Queue size below which a refill attempt is made.
pub const LOW_WATER_MARK: usize = 16;
/// Margin by which a token must outlive "now" to be dispensed; anything closer to its expiry is
/// treated as already expired.
pub const FRESHNESS_MARGIN: Duration = Duration::seconds(5);
/// Interval between token spend/expiration rate measurements.
pub const RATE_MEASUREMENT_INTERVAL: Duration = Duration::minutes(5);

const MILLIS_PER_HOUR: u128 = 3_600_000;

/// One-shot callback invoked when the next asynchronous refill attempt completes, whether it
/// merged a batch or recorded a backoff deadline.
pub type OnCacheRefilled = Box<dyn FnOnce() + Send>;

/// Token spend/expiration rates over one measurement interval, normalized to tokens per hour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenRateSample {
	/// Tokens dispensed to callers per hour.
	pub spent_per_hour: u64,
	/// Tokens discarded as expired per hour.
	pub expired_per_hour: u64,
}

/// In-memory cache of blind-signed auth tokens.
///
/// Built via [`BlindTokenCache::builder`]. The cache owns its background tasks; dropping it stops
/// them. Building a cache without a source is a valid, permanently-empty deployment mode: every
/// availability check is `false` and every dispense is `None`.
pub struct BlindTokenCache {
	shared: Arc<Shared>,
	refill_scheduler: JoinHandle<()>,
	rate_measurer: JoinHandle<()>,
}
impl BlindTokenCache {
	/// Returns a builder for constructing a cache.
	pub fn builder() -> BlindTokenCacheBuilder {
		BlindTokenCacheBuilder::default()
	}

	/// Returns whether a usable token is currently available.
	///
	/// Purges expired tokens first. This is observation-only: it neither consumes a token nor
	/// triggers a refill, so it is safe to call on every outgoing request.
	pub fn is_token_available(&self) -> bool {
		let now = self.shared.clock.now();
		let mut state = self.shared.state.lock();

		state.remove_expired(now);

		!state.queue.is_empty()
	}

	/// Removes and returns the soonest-expiring usable token, if any.
	///
	/// An empty reply is an expected steady-state condition under load, not an error. Either way
	/// the call feeds consumption pressure back into refill scheduling.
	pub fn get_token(&self) -> Option<BlindSignedToken> {
		let token = {
			let now = self.shared.clock.now();
			let mut state = self.shared.state.lock();

			state.remove_expired(now);

			let token = state.queue.pop_front();

			if token.is_some() {
				state.tokens_spent += 1;

				obs::record_token_request(TokenRequestOutcome::Hit);
			} else {
				obs::record_token_request(TokenRequestOutcome::Miss);
			}

			token
		};

		self.shared.maybe_refill();

		token
	}

	/// Registers a one-shot callback invoked when the next refill attempt completes.
	///
	/// Replaces any previously registered callback.
	pub fn set_on_cache_refilled(&self, callback: OnCacheRefilled) {
		self.shared.state.lock().on_cache_refilled = Some(callback);
	}

	/// Turns background cache management on after a
	/// [`disable_cache_management`](BlindTokenCacheBuilder::disable_cache_management) build.
	pub fn enable_cache_management(&self) {
		self.shared.state.lock().management_enabled = true;
		self.shared.reschedule.notify_one();
	}

	/// Requests one batch from the source immediately, bypassing the low-water and backoff
	/// checks, and invokes `on_refilled` when the reply has been merged.
	///
	/// Intended for tests and diagnostics that drive refills manually with background management
	/// disabled.
	pub fn fill_cache(&self, on_refilled: OnCacheRefilled) -> Result<()> {
		let source = self.shared.source.as_ref().ok_or(Error::SourceUnbound)?;

		{
			let mut state = self.shared.state.lock();

			if state.fetch_in_flight || state.on_cache_refilled.is_some() {
				return Err(Error::RefillPending);
			}

			state.fetch_in_flight = true;
			state.on_cache_refilled = Some(on_refilled);
		}

		self.shared.spawn_fetch(Arc::clone(source));

		Ok(())
	}

	/// Returns the most recent token-rate sample, if a measurement interval has elapsed.
	pub fn last_token_rates(&self) -> Option<TokenRateSample> {
		self.shared.state.lock().last_rates
	}
}
impl Drop for BlindTokenCache {
	fn drop(&mut self) {
		self.refill_scheduler.abort();
		self.rate_measurer.abort();
	}
}

/// Builder for [`BlindTokenCache`].
#[derive(Default)]
pub struct BlindTokenCacheBuilder {
	clock: Option<CacheClock>,
	management_disabled: bool,
	source: Option<Arc<dyn BlindTokenSource>>,
}
impl BlindTokenCacheBuilder {
	/// Binds the token source the cache refills from.
	pub fn source(mut self, source: Arc<dyn BlindTokenSource>) -> Self {
		self.source = Some(source);

		self
	}

	/// Overrides the clock used for expiry and backoff decisions.
	pub fn clock(mut self, clock: CacheClock) -> Self {
		self.clock = Some(clock);

		self
	}

	/// Builds the cache with background management off, so tests can control refill timing via
	/// [`BlindTokenCache::fill_cache`] and [`BlindTokenCache::enable_cache_management`].
	pub fn disable_cache_management(mut self) -> Self {
		self.management_disabled = true;

		self
	}

	/// Consumes the builder and starts the cache's background tasks.
	///
	/// Must be called from within a Tokio runtime; the cache captures the runtime handle so the
	/// synchronous entry points can spawn batch requests from any thread.
	pub fn build(self) -> BlindTokenCache {
		let runtime = Handle::current();
		let shared = Arc::new_cyclic(|weak| Shared {
			clock: self.clock.unwrap_or_default(),
			reschedule: Notify::new(),
			runtime: runtime.clone(),
			self_weak: weak.clone(),
			source: self.source,
			state: Mutex::new(CacheState {
				fetch_in_flight: false,
				last_rates: None,
				management_enabled: !self.management_disabled,
				on_cache_refilled: None,
				queue: VecDeque::new(),
				tokens_expired: 0,
				tokens_spent: 0,
				try_again_at: None,
			}),
		});
		let refill_scheduler = runtime.spawn(run_refill_scheduler(Arc::downgrade(&shared)));
		let rate_measurer = runtime.spawn(run_rate_measurer(Arc::downgrade(&shared)));

		BlindTokenCache { shared, refill_scheduler, rate_measurer }
	}
}

struct Shared {
	clock: CacheClock,
	reschedule: Notify,
	runtime: Handle,
	self_weak: Weak<Shared>,
	source: Option<Arc<dyn BlindTokenSource>>,
	state: Mutex<CacheState>,
}
impl Shared {
	// Idempotent refill check; safe to call at any time, even redundantly. Anything that changes
	// the next relevant wake-up ends by nudging the scheduler.
	fn maybe_refill(&self) {
		let now = self.clock.now();
		let mut state = self.state.lock();

		state.remove_expired(now);

		let Some(source) = &self.source else { return };

		if state.fetch_in_flight || !state.management_enabled {
			return;
		}
		if let Some(after) = state.try_again_at
			&& now < after
		{
			// Still inside the backoff window; make sure the scheduler is armed for it.
			self.reschedule.notify_one();

			return;
		}
		if state.queue.len() < LOW_WATER_MARK {
			state.fetch_in_flight = true;

			self.spawn_fetch(Arc::clone(source));
		}

		self.reschedule.notify_one();
	}

	fn spawn_fetch(&self, source: Arc<dyn BlindTokenSource>) {
		let weak = self.self_weak.clone();

		// The reply handler holds a weak reference: a cache dropped mid-request makes the
		// completion a no-op instead of resurrecting state.
		self.runtime.spawn(async move {
			let reply = source.try_get_tokens(BATCH_SIZE).await;

			if let Some(shared) = weak.upgrade() {
				shared.on_tokens_fetched(reply);
			}
		});
	}

	fn on_tokens_fetched(&self, reply: TokenBatchReply) {
		let callback = {
			let mut state = self.state.lock();

			state.fetch_in_flight = false;

			match reply {
				TokenBatchReply::Issued(tokens) => {
					state.try_again_at = None;

					let added = tokens.len();

					// Batches arrive in no particular order; the queue invariant is ascending
					// expiry.
					state.queue.extend(tokens);
					state.queue.make_contiguous().sort_by_key(BlindSignedToken::expires_at);

					obs::trace_refill(added, state.queue.len());
				},
				TokenBatchReply::TryAgainAt(instant) => {
					state.try_again_at = Some(instant);

					obs::trace_backoff(instant);
				},
			}

			state.on_cache_refilled.take()
		};

		if let Some(callback) = callback {
			callback();
		}

		self.reschedule.notify_one();
	}

	fn measure_token_rates(&self, elapsed: std::time::Duration) {
		let elapsed_ms = elapsed.as_millis();
		let mut state = self.state.lock();

		if elapsed_ms != 0 {
			let per_hour = |count: u64| {
				u64::try_from(u128::from(count) * MILLIS_PER_HOUR / elapsed_ms)
					.unwrap_or(u64::MAX)
			};
			let sample = TokenRateSample {
				spent_per_hour: per_hour(state.tokens_spent),
				expired_per_hour: per_hour(state.tokens_expired),
			};

			obs::record_token_rates(&sample);

			state.last_rates = Some(sample);
		}

		state.tokens_spent = 0;
		state.tokens_expired = 0;
	}
}

struct CacheState {
	fetch_in_flight: bool,
	last_rates: Option<TokenRateSample>,
	management_enabled: bool,
	on_cache_refilled: Option<OnCacheRefilled>,
	queue: VecDeque<BlindSignedToken>,
	tokens_expired: u64,
	tokens_spent: u64,
	try_again_at: Option<OffsetDateTime>,
}
impl CacheState {
	// The queue is sorted, so expired tokens form a prefix.
	fn remove_expired(&mut self, now: OffsetDateTime) {
		let mut purged = 0_usize;

		while self.queue.front().is_some_and(|token| token.expires_within(now, FRESHNESS_MARGIN)) {
			self.queue.pop_front();

			self.tokens_expired += 1;
			purged += 1;
		}

		if purged > 0 {
			obs::trace_expired(purged, self.queue.len());
		}
	}

	// When the next unprompted refill check should run: immediately (or at the backoff deadline)
	// while the queue is low, at the front token's staleness instant while it is healthy, and not
	// at all while a request is in flight or management is off.
	fn next_refill_wake(&self, has_source: bool, now: OffsetDateTime) -> Option<OffsetDateTime> {
		if self.fetch_in_flight || !has_source || !self.management_enabled {
			return None;
		}
		if self.queue.len() < LOW_WATER_MARK {
			return Some(self.try_again_at.unwrap_or(now));
		}

		self.queue.front().map(|token| token.expires_at() - FRESHNESS_MARGIN)
	}
}

async fn run_refill_scheduler(shared: Weak<Shared>) {
	loop {
		let Some(shared) = shared.upgrade() else { break };
		let wake_at = {
			let state = shared.state.lock();

			state.next_refill_wake(shared.source.is_some(), shared.clock.now())
		};

		match wake_at {
			None => shared.reschedule.notified().await,
			Some(deadline) => {
				let delay = clock::sleepable(deadline - shared.clock.now());

				tokio::select! {
					_ = sleep(delay) => shared.maybe_refill(),
					_ = shared.reschedule.notified() => {},
				}
			},
		}
	}
}

async fn run_rate_measurer(shared: Weak<Shared>) {
	let period = clock::sleepable(RATE_MEASUREMENT_INTERVAL);
	let mut last_measured = Instant::now();

	loop {
		sleep(period).await;

		let Some(shared) = shared.upgrade() else { break };
		let now = Instant::now();

		shared.measure_token_rates(now - last_measured);

		last_measured = now;
	}
}
