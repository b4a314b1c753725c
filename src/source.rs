//! Token source contract implemented by issuers of blind-signed token batches.

pub mod backoff;

// self
use crate::{_prelude::*, token::BlindSignedToken};

/// Boxed future returned by [`BlindTokenSource::try_get_tokens`].
pub type TokenSourceFuture<'a> = Pin<Box<dyn Future<Output = TokenBatchReply> + 'a + Send>>;

/// Asynchronous supplier of blind-signed token batches.
///
/// The cache calls [`try_get_tokens`](Self::try_get_tokens) with at most one request outstanding
/// at a time and treats the reply as authoritative: an issued batch (even an empty one) clears any
/// standing backoff, while a [`TokenBatchReply::TryAgainAt`] deadline suppresses further requests
/// until it passes. Implementations that talk to a remote issuer can derive that deadline with
/// [`backoff::BackoffSchedule`].
pub trait BlindTokenSource
where
	Self: Send + Sync,
{
	/// Requests a batch of up to `batch_size` tokens from the issuer.
	fn try_get_tokens(&self, batch_size: u32) -> TokenSourceFuture<'_>;
}

/// Reply to a token batch request.
#[derive(Debug)]
pub enum TokenBatchReply {
	/// The issuer produced a batch of tokens, in no particular order and possibly empty.
	Issued(Vec<BlindSignedToken>),
	/// The issuer declined; no further request should be made before this instant.
	TryAgainAt(OffsetDateTime),
}
