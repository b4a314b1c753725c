//! Blind-signed token data model.

// self
use crate::_prelude::*;

/// Redacted wrapper around the signed token material, keeping it out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPayload(String);
impl TokenPayload {
	/// Wraps a new payload string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner payload. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenPayload {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenPayload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenPayload").field(&"<redacted>").finish()
	}
}
impl Display for TokenPayload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// One blind-signed credential, usable by exactly one downstream request.
///
/// A token is opaque to the cache: only its expiry participates in any decision. Dispensing moves
/// the token out of the cache, so a token can never be handed to two callers.
#[derive(Clone)]
pub struct BlindSignedToken {
	payload: TokenPayload,
	expires_at: OffsetDateTime,
}
impl BlindSignedToken {
	/// Creates a token from its signed payload and absolute expiry instant.
	pub fn new(payload: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { payload: TokenPayload::new(payload), expires_at }
	}

	/// Returns the signed payload.
	pub fn payload(&self) -> &TokenPayload {
		&self.payload
	}

	/// Returns the absolute expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Returns `true` if the token expires at or before `instant + margin`.
	///
	/// The margin treats a token as stale slightly before its literal expiry, so a token dispensed
	/// now cannot expire while the request carrying it is still in flight.
	pub fn expires_within(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		self.expires_at <= instant + margin
	}
}
impl Debug for BlindSignedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BlindSignedToken")
			.field("payload", &self.payload)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
