//! Backoff schedule for token source implementations.
//!
//! The cache itself never grows a backoff interval; it honors whatever deadline the source hands
//! it. The schedule that produces those deadlines lives here: sources classify each issue attempt
//! as a [`TokenIssueResult`] and feed it to a [`BackoffSchedule`], which picks the base interval
//! for that class and doubles it while the same failure repeats.

// self
use crate::_prelude::*;

/// Backoff after an attempt found no signed-in account. An account may appear at any time, so the
/// wait is short.
pub const NO_ACCOUNT_BACKOFF: Duration = Duration::minutes(5);
/// Backoff after the issuer reported the account is not eligible. Eligibility is unlikely to
/// change quickly.
pub const NOT_ELIGIBLE_BACKOFF: Duration = Duration::days(1);
/// Base backoff after a transient failure.
pub const TRANSIENT_BACKOFF: Duration = Duration::seconds(5);
/// Base backoff after the issuer rejected the request itself.
pub const MALFORMED_REQUEST_BACKOFF: Duration = Duration::minutes(10);

/// Classified outcome of one token issue attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenIssueResult {
	/// Tokens were issued.
	Success,
	/// No account was available to authenticate the request.
	NoAccount,
	/// The issuer refused because the account is not eligible for tokens.
	NotEligible,
	/// A transient failure (network, upstream availability) interrupted the attempt.
	TransientFailure,
	/// The issuer rejected the request as malformed or unauthenticated.
	MalformedRequest,
}

/// Tracks consecutive issue results and derives the wait before the next attempt.
#[derive(Debug, Default)]
pub struct BackoffSchedule {
	last_result: Option<TokenIssueResult>,
	last_backoff: Option<Duration>,
}
impl BackoffSchedule {
	/// Creates an empty schedule with no failure history.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records the outcome of an attempt and returns how long to wait before the next one.
	///
	/// `None` means the next attempt may happen immediately. Transient and malformed-request
	/// backoffs double while the same result repeats; any other result resets the progression.
	pub fn note_result(&mut self, result: TokenIssueResult) -> Option<Duration> {
		let (base, exponential) = match result {
			TokenIssueResult::Success => (None, false),
			TokenIssueResult::NoAccount => (Some(NO_ACCOUNT_BACKOFF), false),
			TokenIssueResult::NotEligible => (Some(NOT_ELIGIBLE_BACKOFF), false),
			TokenIssueResult::TransientFailure => (Some(TRANSIENT_BACKOFF), true),
			TokenIssueResult::MalformedRequest => (Some(MALFORMED_REQUEST_BACKOFF), true),
		};
		let mut backoff = base;

		if exponential
			&& self.last_result == Some(result)
			&& let Some(previous) = self.last_backoff
		{
			backoff = Some(previous * 2);
		}

		self.last_result = Some(result);
		self.last_backoff = backoff;

		backoff
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn success_yields_no_backoff() {
		let mut schedule = BackoffSchedule::new();

		assert_eq!(schedule.note_result(TokenIssueResult::Success), None);
		assert_eq!(schedule.note_result(TokenIssueResult::Success), None);
	}

	#[test]
	fn transient_failures_double_while_repeating() {
		let mut schedule = BackoffSchedule::new();

		assert_eq!(
			schedule.note_result(TokenIssueResult::TransientFailure),
			Some(Duration::seconds(5))
		);
		assert_eq!(
			schedule.note_result(TokenIssueResult::TransientFailure),
			Some(Duration::seconds(10))
		);
		assert_eq!(
			schedule.note_result(TokenIssueResult::TransientFailure),
			Some(Duration::seconds(20))
		);
	}

	#[test]
	fn changing_result_resets_the_progression() {
		let mut schedule = BackoffSchedule::new();

		schedule.note_result(TokenIssueResult::TransientFailure);
		schedule.note_result(TokenIssueResult::TransientFailure);

		assert_eq!(
			schedule.note_result(TokenIssueResult::MalformedRequest),
			Some(Duration::minutes(10))
		);
		assert_eq!(
			schedule.note_result(TokenIssueResult::MalformedRequest),
			Some(Duration::minutes(20))
		);
		assert_eq!(
			schedule.note_result(TokenIssueResult::TransientFailure),
			Some(Duration::seconds(5))
		);
	}

	#[test]
	fn flat_tiers_never_grow() {
		let mut schedule = BackoffSchedule::new();

		assert_eq!(schedule.note_result(TokenIssueResult::NoAccount), Some(Duration::minutes(5)));
		assert_eq!(schedule.note_result(TokenIssueResult::NoAccount), Some(Duration::minutes(5)));
		assert_eq!(schedule.note_result(TokenIssueResult::NotEligible), Some(Duration::days(1)));
		assert_eq!(schedule.note_result(TokenIssueResult::NotEligible), Some(Duration::days(1)));
	}

	#[test]
	fn success_clears_failure_history() {
		let mut schedule = BackoffSchedule::new();

		schedule.note_result(TokenIssueResult::TransientFailure);
		schedule.note_result(TokenIssueResult::TransientFailure);

		assert_eq!(schedule.note_result(TokenIssueResult::Success), None);
		assert_eq!(
			schedule.note_result(TokenIssueResult::TransientFailure),
			Some(Duration::seconds(5))
		);
	}
}
