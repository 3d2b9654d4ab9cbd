//! Bearer token model and its validity predicate.

pub mod secret;

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Tokens are treated as expired this long before their recorded expiry so in-flight requests
/// never carry a credential that lapses mid-call.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(10);

/// Opaque bearer credential with an optional expiry instant.
///
/// A token without an expiry never expires.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Credential value; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Authorization scheme, `Bearer` unless the issuer says otherwise.
	pub token_type: String,
	/// Instant after which the issuer no longer honors the credential.
	pub expires_at: Option<OffsetDateTime>,
}
impl Token {
	/// Creates a non-expiring bearer token.
	pub fn new(access_token: impl Into<Arc<str>>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			token_type: "Bearer".into(),
			expires_at: None,
		}
	}

	/// Sets an absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry relative to the current clock.
	pub fn with_expires_in(self, ttl: Duration) -> Self {
		self.with_expires_at(OffsetDateTime::now_utc() + ttl)
	}

	/// Overrides the authorization scheme.
	pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = token_type.into();

		self
	}

	/// Returns `true` when the token is still usable at `now`, honoring [`EXPIRY_SKEW`].
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		match self.expires_at {
			Some(expires_at) => now < expires_at - EXPIRY_SKEW,
			None => true,
		}
	}

	/// Checks validity against the current UTC clock.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Returns the cached token only if it is present and valid at `now`.
pub fn usable_at(token: Option<&Token>, now: OffsetDateTime) -> Option<&Token> {
	token.filter(|token| token.is_valid_at(now))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn validity_honors_skew() {
		let expires = macros::datetime!(2025-01-01 01:00 UTC);
		let token = Token::new("access").with_expires_at(expires);

		assert!(token.is_valid_at(macros::datetime!(2025-01-01 00:59:49 UTC)));
		assert!(!token.is_valid_at(macros::datetime!(2025-01-01 00:59:50 UTC)));
		assert!(!token.is_valid_at(macros::datetime!(2025-01-01 00:59:55 UTC)));
		assert!(!token.is_valid_at(expires));
	}

	#[test]
	fn tokens_without_expiry_never_lapse() {
		let token = Token::new("static");

		assert!(token.is_valid_at(macros::datetime!(9999-12-31 23:59 UTC)));
		assert_eq!(usable_at(Some(&token), OffsetDateTime::now_utc()), Some(&token));
		assert_eq!(usable_at(None, OffsetDateTime::now_utc()), None);
	}

	#[test]
	fn expired_tokens_are_filtered_out() {
		let token =
			Token::new("access").with_expires_at(macros::datetime!(2025-01-01 01:00 UTC));

		assert!(usable_at(Some(&token), macros::datetime!(2025-01-01 00:59 UTC)).is_some());
		assert!(usable_at(Some(&token), macros::datetime!(2025-01-01 01:00 UTC)).is_none());
	}

	#[test]
	fn debug_redacts_the_access_token() {
		let token = Token::new("ya29.abc").with_token_type("MAC");

		assert!(!format!("{token:?}").contains("ya29.abc"));
		assert!(format!("{token:?}").contains("MAC"));
	}
}
