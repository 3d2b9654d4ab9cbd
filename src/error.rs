//! Crate-level error types shared by the runner, the token cache, and plan parsing.

// std
use std::num::ParseIntError;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed, thread-safe error used to carry collaborator failures.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Construction-time configuration problem; never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream token issuer or work function failed; retried with backoff.
	#[error("Delegate failed: {source}.")]
	Delegate {
		/// Underlying collaborator failure.
		#[source]
		source: BoxError,
	},
	/// A work invocation exceeded its configured deadline.
	#[error("Invocation timed out after {after:?}.")]
	Timeout {
		/// Deadline that elapsed.
		after: Duration,
	},
	/// Rate limiter refused a permit for a reason other than cancellation.
	#[error(transparent)]
	Limiter(#[from] LimiterError),
	/// The governing cancellation token fired.
	#[error("Operation was cancelled.")]
	Cancelled,
}
impl Error {
	/// Wraps a collaborator failure inside [`Error::Delegate`].
	pub fn delegate(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Delegate { source: Box::new(src) }
	}

	/// Builds an [`Error::Delegate`] from a plain message.
	pub fn delegate_msg(message: impl Display) -> Self {
		Self::Delegate { source: message.to_string().into() }
	}

	/// Returns `true` for [`Error::Cancelled`].
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

/// Configuration and validation failures raised while constructing components.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Token cache renew period was zero.
	#[error("Renew period must be greater than zero.")]
	NonPositiveRenewPeriod,
	/// Runner rate was zero.
	#[error("Rate per second must be greater than zero.")]
	NonPositiveRate,
	/// Runner parallelism was zero.
	#[error("Parallelism must be greater than zero.")]
	NonPositiveParallelism,
	/// Runner permits per invocation was zero.
	#[error("Permits per invocation must be greater than zero.")]
	NonPositivePermits,
	/// A workload plan entry could not be parsed.
	#[error("Workload plan entry `{entry}` is invalid.")]
	InvalidPlan {
		/// Offending `NAME:RATE` entry.
		entry: String,
		/// Rate parsing failure.
		#[source]
		source: ParseIntError,
	},
}

/// Rate limiter refusals that are not caused by cancellation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LimiterError {
	/// More permits were requested at once than the bucket can ever hold.
	#[error("Requested {requested} permits but the burst capacity is {burst}.")]
	ExceedsBurst {
		/// Permits requested by the caller.
		requested: u32,
		/// Bucket capacity.
		burst: u32,
	},
}
