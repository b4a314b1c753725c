// self
use crate::{cache::TokenRateSample, obs::TokenRequestOutcome};

/// Records a dispense outcome via the global metrics recorder (when enabled).
pub fn record_token_request(outcome: TokenRequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("blind_token_cache_requests_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records a periodic token-rate sample via the global metrics recorder (when enabled).
pub fn record_token_rates(sample: &TokenRateSample) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("blind_token_cache_token_spend_rate_per_hour")
			.record(sample.spent_per_hour as f64);
		metrics::histogram!("blind_token_cache_token_expiration_rate_per_hour")
			.record(sample.expired_per_hour as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = sample;
	}
}
