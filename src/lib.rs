//! Execution and credential-supply core for synthetic database load generators: a rate-limited
//! concurrent workload runner and a proactively refreshed access-token cache.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod obs;
pub mod plan;
pub mod runner;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		auth::{Token, TokenFuture, TokenSource},
		runner::{Runnable, WorkFuture},
	};

	/// Token source that fails a fixed number of times before minting tokens.
	///
	/// Every successful call mints a distinct access token (`token-1`, `token-2`, ...) that
	/// expires `ttl` after issuance.
	#[derive(Debug)]
	pub struct ScriptedTokenSource {
		failures_left: AtomicUsize,
		calls: AtomicUsize,
		minted: AtomicUsize,
		ttl: Duration,
	}
	impl ScriptedTokenSource {
		/// Creates a source that fails `failures` times, then succeeds forever.
		pub fn failing_then_ok(failures: usize, ttl: Duration) -> Self {
			Self {
				failures_left: AtomicUsize::new(failures),
				calls: AtomicUsize::new(0),
				minted: AtomicUsize::new(0),
				ttl,
			}
		}

		/// Creates a source that always succeeds.
		pub fn always_ok(ttl: Duration) -> Self {
			Self::failing_then_ok(0, ttl)
		}

		/// Creates a source that never succeeds.
		pub fn always_failing() -> Self {
			Self::failing_then_ok(usize::MAX, Duration::ZERO)
		}

		/// Total number of delegate invocations observed so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenSource for ScriptedTokenSource {
		fn token(&self) -> TokenFuture<'_> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				let failed = self
					.failures_left
					.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
					.is_ok();

				if failed {
					return Err(Error::delegate_msg("identity provider unavailable"));
				}

				let serial = self.minted.fetch_add(1, Ordering::SeqCst) + 1;

				Ok(Token::new(format!("token-{serial}")).with_expires_in(self.ttl))
			})
		}
	}

	/// Work function that counts invocations and fails on demand.
	#[derive(Debug, Default)]
	pub struct CountingWork {
		invocations: AtomicUsize,
		fail: bool,
	}
	impl CountingWork {
		/// Work that always succeeds.
		pub fn succeeding() -> Self {
			Self::default()
		}

		/// Work that always fails.
		pub fn failing() -> Self {
			Self { fail: true, ..Default::default() }
		}

		/// Number of times the work has been invoked.
		pub fn invocations(&self) -> usize {
			self.invocations.load(Ordering::SeqCst)
		}
	}
	impl Runnable for CountingWork {
		fn run(&self, _: &CancellationToken) -> WorkFuture<'_> {
			Box::pin(async move {
				self.invocations.fetch_add(1, Ordering::SeqCst);

				if self.fail { Err(Error::delegate_msg("transaction aborted")) } else { Ok(()) }
			})
		}
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::RwLock as AsyncRwLock;
	pub use parking_lot::Mutex;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use tokio_util::sync::CancellationToken;

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use {color_eyre as _, serde_json as _};
pub use tokio_util::sync::CancellationToken;
