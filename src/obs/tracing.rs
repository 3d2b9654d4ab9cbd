// self
use crate::{_prelude::*, error::LimiterError, obs::FetchPath};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type Instrumented<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type Instrumented<F> = F;

/// Span wrapper used around work invocations and token fetches.
#[derive(Clone, Debug)]
pub struct WorkSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl WorkSpan {
	/// Creates a span for one invocation of `workload` on the given worker lane.
	pub fn work(workload: &str, worker: usize) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("workload_runner.work", workload, worker);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (workload, worker);

			Self {}
		}
	}

	/// Creates a span for a delegate token fetch on the given path.
	pub fn token(path: FetchPath) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::debug_span!("workload_runner.token", path = path.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = path;

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning for a failed work invocation and the backoff it triggered.
pub fn log_work_failure(
	workload: &str,
	worker: usize,
	error_count: u32,
	backoff: Duration,
	error: &Error,
) {
	#[cfg(feature = "tracing")]
	tracing::warn!(workload, worker, error_count, ?backoff, %error, "work invocation failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (workload, worker, error_count, backoff, error);
}

/// Emits a warning when the limiter refuses a permit without being cancelled.
pub fn log_limiter_refusal(workload: &str, worker: usize, error: &LimiterError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(workload, worker, %error, "rate limiter refused permit");
	#[cfg(not(feature = "tracing"))]
	let _ = (workload, worker, error);
}

/// Emits a debug event when a worker lane exits after cancellation.
pub fn log_worker_stopped(workload: &str, worker: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(workload, worker, "worker stopped");
	#[cfg(not(feature = "tracing"))]
	let _ = (workload, worker);
}

/// Emits a warning when the refresh loop fails to mint a token.
pub fn log_refresh_failure(retry_in: Duration, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(?retry_in, %error, "proactive token refresh failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (retry_in, error);
}

/// Emits a debug event when the refresh loop caches a new token.
pub fn log_refresh_success(expires_at: Option<OffsetDateTime>) {
	#[cfg(feature = "tracing")]
	tracing::debug!(?expires_at, "cached refreshed token");
	#[cfg(not(feature = "tracing"))]
	let _ = expires_at;
}

/// Emits a debug event when the refresh loop exits.
pub fn log_refresh_stopped() {
	#[cfg(feature = "tracing")]
	tracing::debug!("proactive token refresh stopped");
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn log_helpers_noop_without_subscriber() {
		log_work_failure("Tweet.Insert", 3, 2, Duration::from_secs(1500), &Error::Cancelled);
		log_refresh_stopped();
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = WorkSpan::work("Balance.Deposit", 0);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
