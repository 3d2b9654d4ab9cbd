//! Token source contract shared by credential issuers and caches.

// self
use crate::{_prelude::*, auth::Token};

/// Boxed future returned by [`TokenSource::token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<Token>> + 'a + Send>>;

/// Anything that can hand out a bearer [`Token`].
///
/// Identity providers implement this to mint fresh credentials; [`TokenCache`](crate::auth::TokenCache)
/// both consumes one as its delegate and implements it, so caches compose.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Returns a token, minting or fetching one if necessary.
	fn token(&self) -> TokenFuture<'_>;
}
impl<T> TokenSource for Arc<T>
where
	T: ?Sized + TokenSource,
{
	fn token(&self) -> TokenFuture<'_> {
		(**self).token()
	}
}

/// Token source that always hands out the same credential.
#[derive(Clone, Debug)]
pub struct StaticTokenSource(Token);
impl StaticTokenSource {
	/// Wraps a fixed token.
	pub fn new(token: Token) -> Self {
		Self(token)
	}
}
impl TokenSource for StaticTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move { Ok(self.0.clone()) })
	}
}
