//! Cached bearer token state and token endpoint payloads.

// self
use crate::{_prelude::*, auth::Secret};

/// Point-in-time view of the cached bearer token.
///
/// An empty cache carries no token and an expiry at the Unix epoch, so it always reads as
/// expired.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
	token: Option<Secret>,
	expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Returns the cached token, if any.
	pub fn token(&self) -> Option<&Secret> {
		self.token.as_ref()
	}

	/// Returns the expiry instant; the Unix epoch when nothing is cached.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Returns the expiry as epoch milliseconds.
	pub fn expires_at_unix_ms(&self) -> i128 {
		self.expires_at.unix_timestamp_nanos() / 1_000_000
	}

	/// Returns `true` when no token is cached.
	pub fn is_empty(&self) -> bool {
		self.token.is_none()
	}

	/// Returns the token when it outlives `now + buffer`.
	pub fn fresh_at(&self, now: OffsetDateTime, buffer: Duration) -> Option<&Secret> {
		self.token.as_ref().filter(|_| self.expires_at > now + buffer)
	}
}
impl Default for CachedToken {
	fn default() -> Self {
		Self { token: None, expires_at: OffsetDateTime::UNIX_EPOCH }
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Single-slot, thread-safe token cache owned by a token manager.
#[derive(Debug, Default)]
pub struct TokenCache(Mutex<CachedToken>);
impl TokenCache {
	/// Returns a copy of the current cache state.
	pub fn snapshot(&self) -> CachedToken {
		self.0.lock().clone()
	}

	/// Returns the cached token when it outlives `now + buffer`.
	pub fn fresh_at(&self, now: OffsetDateTime, buffer: Duration) -> Option<Secret> {
		self.0.lock().fresh_at(now, buffer).cloned()
	}

	/// Replaces the cached token. An empty token clears the cache instead.
	pub fn store(&self, token: Secret, expires_at: OffsetDateTime) {
		let mut slot = self.0.lock();

		*slot = if token.is_empty() {
			CachedToken::default()
		} else {
			CachedToken { token: Some(token), expires_at }
		};
	}

	/// Drops the cached token so the next request performs a fresh exchange.
	pub fn clear(&self) {
		*self.0.lock() = CachedToken::default();
	}
}

/// Successful client-credentials exchange.
#[derive(Clone)]
pub struct TokenGrant {
	/// Issued bearer token (never empty).
	pub access_token: Secret,
	/// Lifetime reported by the token endpoint, if any.
	pub expires_in: Option<u64>,
	/// Reported token type, `Bearer` when omitted.
	pub token_type: String,
}
impl TokenGrant {
	/// Resolves the token lifetime, substituting `fallback` for a missing or zero `expires_in`.
	pub fn lifetime(&self, fallback: Duration) -> Duration {
		match self.expires_in {
			Some(secs) if secs > 0 =>
				Duration::seconds(i64::from(u32::try_from(secs).unwrap_or(u32::MAX))),
			_ => fallback,
		}
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("token_type", &self.token_type)
			.finish()
	}
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
	#[serde(default)]
	pub(crate) access_token: Option<Secret>,
	#[serde(default)]
	pub(crate) expires_in: Option<u64>,
	#[serde(default)]
	pub(crate) token_type: Option<String>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn empty_cache_reads_as_expired() {
		let cached = CachedToken::default();

		assert!(cached.is_empty());
		assert_eq!(cached.expires_at_unix_ms(), 0);
		assert!(cached.fresh_at(OffsetDateTime::UNIX_EPOCH, Duration::ZERO).is_none());
	}

	#[test]
	fn freshness_respects_buffer() {
		let cache = TokenCache::default();
		let now = datetime!(2025-01-01 00:00 UTC);

		cache.store(Secret::new("token"), now + Duration::seconds(90));

		assert_eq!(
			cache.fresh_at(now, Duration::seconds(60)).map(|s| s.expose().to_owned()),
			Some("token".into())
		);
		assert!(cache.fresh_at(now + Duration::seconds(30), Duration::seconds(60)).is_none());
		assert!(cache.fresh_at(now, Duration::seconds(90)).is_none());
	}

	#[test]
	fn storing_empty_token_clears_cache() {
		let cache = TokenCache::default();
		let now = datetime!(2025-01-01 00:00 UTC);

		cache.store(Secret::new("token"), now + Duration::HOUR);
		cache.store(Secret::new(""), now + Duration::HOUR);

		assert!(cache.snapshot().is_empty());
		assert_eq!(cache.snapshot().expires_at(), OffsetDateTime::UNIX_EPOCH);
	}

	#[test]
	fn grant_lifetime_falls_back_on_zero_or_missing() {
		let fallback = Duration::seconds(1800);
		let mut grant =
			TokenGrant { access_token: Secret::new("t"), expires_in: None, token_type: "Bearer".into() };

		assert_eq!(grant.lifetime(fallback), fallback);

		grant.expires_in = Some(0);

		assert_eq!(grant.lifetime(fallback), fallback);

		grant.expires_in = Some(3600);

		assert_eq!(grant.lifetime(fallback), Duration::HOUR);
	}
}
