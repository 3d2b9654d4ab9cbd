//! Optional observability helpers for the runner and the token cache.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to wrap every work invocation in a `workload_runner.work`
//!   span carrying `workload` + `worker` fields, every token fetch in a `workload_runner.token`
//!   span carrying a `path` field, and to emit warning events for failures.
//! - Enable `metrics` to increment `workload_runner_work_total` (labeled by `workload` +
//!   `outcome`) and `workload_runner_token_fetch_total` (labeled by `path` + `outcome`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each work invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkOutcome {
	/// Invocation returned `Ok`.
	Ok,
	/// Invocation returned an error.
	Failed,
	/// Invocation exceeded its deadline.
	Timeout,
}
impl WorkOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			WorkOutcome::Ok => "ok",
			WorkOutcome::Failed => "failed",
			WorkOutcome::Timeout => "timeout",
		}
	}
}
impl Display for WorkOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Which code path asked the delegate for a new token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchPath {
	/// A reader found no usable token and fetched inline.
	Sync,
	/// The proactive refresh loop.
	Background,
}
impl FetchPath {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FetchPath::Sync => "sync",
			FetchPath::Background => "background",
		}
	}
}
impl Display for FetchPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each delegate fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchOutcome {
	/// Delegate minted a token.
	Success,
	/// Delegate failed.
	Failure,
}
impl FetchOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FetchOutcome::Success => "success",
			FetchOutcome::Failure => "failure",
		}
	}
}
impl Display for FetchOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
