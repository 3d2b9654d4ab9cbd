//! Shared, redacted credential string.

// self
use crate::_prelude::*;

/// Access-token value handed to every reader of a [`crate::auth::TokenCache`].
///
/// Cloning only bumps a reference count, so workers can copy the cached token on every
/// invocation. The value is hidden from `Debug` and `Display`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(Arc<str>);
impl TokenSecret {
	/// Wraps a credential string.
	pub fn new(value: impl Into<Arc<str>>) -> Self {
		Self(value.into())
	}

	/// Raw credential for attaching to outgoing requests; never log it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when both handles point at the same issued credential.
	pub fn same_issue(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret(<{} bytes redacted>)", self.0.len())
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
