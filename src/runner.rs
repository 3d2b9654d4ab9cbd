//! Rate-limited concurrent workload runner.
//!
//! A [`Runner`] drives a caller-supplied [`Runnable`] forever across a fixed number of worker
//! lanes. All lanes of one [`Runner::run`] call share a single [`RateLimiter`], so the aggregate
//! invocation rate never exceeds the configured permits per second. A failing lane sleeps for a
//! linearly growing, jittered backoff and keeps going; lanes only stop when the cancellation
//! token fires. Failures are reported out of band through tracing, metrics, the shared
//! [`WorkStats`] counters, and an optional [`WorkFailure`] channel.

pub mod limiter;

pub use limiter::RateLimiter;

// std
use std::{
	num::{NonZeroU32, NonZeroUsize},
	panic,
	sync::atomic::{AtomicU64, Ordering},
};
// crates.io
use rand::Rng;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	obs::{self, WorkOutcome, WorkSpan},
};

/// Base unit of the failure backoff; the n-th consecutive failure waits at least `n` units.
pub const FAILURE_BACKOFF_UNIT: Duration = Duration::from_secs(600);
/// Pause before asking the limiter again after it refused a permit.
pub const LIMITER_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Boxed future returned by [`Runnable::run`].
pub type WorkFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// One unit of workload logic, invoked repeatedly by a [`Runner`].
///
/// Implementations should tolerate being called again after a failure and should watch
/// `cancel` themselves if they need to stop promptly; the runner never interrupts an in-flight
/// invocation unless an invocation timeout is configured.
pub trait Runnable
where
	Self: Send + Sync,
{
	/// Performs the work once.
	fn run(&self, cancel: &CancellationToken) -> WorkFuture<'_>;
}

/// Adapts an async closure into a [`Runnable`].
pub fn from_fn<F, Fut>(f: F) -> impl Runnable
where
	F: Send + Sync + Fn(CancellationToken) -> Fut,
	Fut: 'static + Send + Future<Output = Result<()>>,
{
	struct FnRunnable<F>(F);
	impl<F, Fut> Runnable for FnRunnable<F>
	where
		F: Send + Sync + Fn(CancellationToken) -> Fut,
		Fut: 'static + Send + Future<Output = Result<()>>,
	{
		fn run(&self, cancel: &CancellationToken) -> WorkFuture<'_> {
			Box::pin((self.0)(cancel.clone()))
		}
	}

	FnRunnable(f)
}

/// Linear failure backoff: `FAILURE_BACKOFF_UNIT * error_count + jitter`.
pub fn failure_backoff(error_count: u32, jitter: Duration) -> Duration {
	FAILURE_BACKOFF_UNIT.saturating_mul(error_count).saturating_add(jitter)
}

fn jittered_failure_backoff(error_count: u32) -> Duration {
	let jitter = FAILURE_BACKOFF_UNIT.mul_f64(rand::rng().random::<f64>());

	failure_backoff(error_count, jitter)
}

/// Serializable runner settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
	/// Aggregate invocations per second across all workers.
	pub rate_per_sec: u32,
	/// Number of worker lanes, i.e. the maximum number of in-flight invocations.
	pub parallelism: usize,
	/// Optional deadline applied to every invocation.
	#[serde(default)]
	pub invocation_timeout: Option<Duration>,
	/// Limiter permits consumed by one invocation, for work that batches several operations.
	#[serde(default = "RunnerConfig::default_permits")]
	pub permits_per_invocation: u32,
}
impl RunnerConfig {
	/// Creates a config without an invocation deadline.
	pub fn new(rate_per_sec: u32, parallelism: usize) -> Self {
		Self {
			rate_per_sec,
			parallelism,
			invocation_timeout: None,
			permits_per_invocation: Self::default_permits(),
		}
	}

	/// Bounds every invocation by `timeout`.
	pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
		self.invocation_timeout = Some(timeout);

		self
	}

	/// Charges `permits` limiter permits per invocation.
	pub fn with_permits_per_invocation(mut self, permits: u32) -> Self {
		self.permits_per_invocation = permits;

		self
	}

	fn default_permits() -> u32 {
		1
	}
}

/// Failure report delivered to the sink registered with [`Runner::with_failure_sink`].
#[derive(Debug)]
pub struct WorkFailure {
	/// Diagnostic workload name passed to [`Runner::run`].
	pub workload: Arc<str>,
	/// Worker lane that observed the failure.
	pub worker: usize,
	/// Consecutive failures on that lane, including this one.
	pub error_count: u32,
	/// Sleep the lane takes before its next attempt.
	pub backoff: Duration,
	/// Error returned by the invocation.
	pub error: Error,
}

/// Thread-safe outcome counters shared by the workers of one run.
#[derive(Debug, Default)]
pub struct WorkStats {
	ok: AtomicU64,
	failed: AtomicU64,
	timed_out: AtomicU64,
	throttled: AtomicU64,
}
impl WorkStats {
	/// Returns the number of successful invocations.
	pub fn ok(&self) -> u64 {
		self.ok.load(Ordering::Relaxed)
	}

	/// Returns the number of invocations that returned an error.
	pub fn failed(&self) -> u64 {
		self.failed.load(Ordering::Relaxed)
	}

	/// Returns the number of invocations that exceeded their deadline.
	pub fn timed_out(&self) -> u64 {
		self.timed_out.load(Ordering::Relaxed)
	}

	/// Returns the number of permit requests the limiter refused.
	///
	/// Refusals are retried after [`LIMITER_RETRY_PAUSE`] and never count as invocations.
	pub fn throttled(&self) -> u64 {
		self.throttled.load(Ordering::Relaxed)
	}

	/// Returns the number of completed invocations of any outcome.
	pub fn total(&self) -> u64 {
		self.ok() + self.failed() + self.timed_out()
	}

	pub(crate) fn record(&self, outcome: WorkOutcome) {
		let counter = match outcome {
			WorkOutcome::Ok => &self.ok,
			WorkOutcome::Failed => &self.failed,
			WorkOutcome::Timeout => &self.timed_out,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}

	fn record_throttled(&self) {
		self.throttled.fetch_add(1, Ordering::Relaxed);
	}
}

/// Rate-limited executor spreading one workload over several lanes.
#[derive(Clone, Debug)]
pub struct Runner {
	rate_per_sec: NonZeroU32,
	parallelism: NonZeroUsize,
	permits_per_invocation: NonZeroU32,
	invocation_timeout: Option<Duration>,
	failure_sink: Option<UnboundedSender<WorkFailure>>,
}
impl Runner {
	/// Creates a runner admitting `rate_per_sec` invocations per second over `parallelism`
	/// lanes.
	pub fn new(rate_per_sec: u32, parallelism: usize) -> Result<Self> {
		Self::from_config(RunnerConfig::new(rate_per_sec, parallelism))
	}

	/// Creates a runner from a deserialized config.
	pub fn from_config(config: RunnerConfig) -> Result<Self> {
		let rate_per_sec = NonZeroU32::new(config.rate_per_sec).ok_or(ConfigError::NonPositiveRate)?;
		let parallelism =
			NonZeroUsize::new(config.parallelism).ok_or(ConfigError::NonPositiveParallelism)?;
		let permits_per_invocation =
			NonZeroU32::new(config.permits_per_invocation).ok_or(ConfigError::NonPositivePermits)?;

		Ok(Self {
			rate_per_sec,
			parallelism,
			permits_per_invocation,
			invocation_timeout: config.invocation_timeout,
			failure_sink: None,
		})
	}

	/// Forwards every failed invocation to `sink`.
	pub fn with_failure_sink(mut self, sink: UnboundedSender<WorkFailure>) -> Self {
		self.failure_sink = Some(sink);

		self
	}

	/// Aggregate invocations per second.
	pub fn rate_per_sec(&self) -> u32 {
		self.rate_per_sec.get()
	}

	/// Number of worker lanes.
	pub fn parallelism(&self) -> usize {
		self.parallelism.get()
	}

	/// Limiter permits one invocation consumes.
	pub fn permits_per_invocation(&self) -> u32 {
		self.permits_per_invocation.get()
	}

	/// Spawns the worker lanes and returns immediately.
	///
	/// `name` only labels logs, metrics, and failure reports. The returned handle can be
	/// awaited after cancelling `cancel` to wait for every lane to exit.
	pub fn run(&self, cancel: &CancellationToken, name: &str, work: Arc<dyn Runnable>) -> RunHandle {
		let workload = <Arc<str>>::from(name);
		let limiter = Arc::new(RateLimiter::new(self.rate_per_sec));
		let stats = Arc::new(WorkStats::default());
		let workers = (0..self.parallelism.get())
			.map(|id| {
				let worker = Worker {
					id,
					workload: workload.clone(),
					work: work.clone(),
					limiter: limiter.clone(),
					permits: self.permits_per_invocation.get(),
					cancel: cancel.clone(),
					invocation_timeout: self.invocation_timeout,
					stats: stats.clone(),
					failure_sink: self.failure_sink.clone(),
				};

				tokio::spawn(worker.run())
			})
			.collect();

		RunHandle { workload, workers, stats }
	}
}

/// Handle over the lanes spawned by one [`Runner::run`] call.
#[derive(Debug)]
pub struct RunHandle {
	workload: Arc<str>,
	workers: Vec<JoinHandle<()>>,
	stats: Arc<WorkStats>,
}
impl RunHandle {
	/// Diagnostic workload name.
	pub fn workload(&self) -> &str {
		&self.workload
	}

	/// Outcome counters shared by all lanes.
	pub fn stats(&self) -> Arc<WorkStats> {
		self.stats.clone()
	}

	/// Returns `true` once every lane has exited.
	pub fn is_finished(&self) -> bool {
		self.workers.iter().all(JoinHandle::is_finished)
	}

	/// Waits for every lane to exit; lanes only exit after cancellation.
	///
	/// A panic inside a work invocation is resumed on the caller.
	pub async fn join(self) {
		for worker in self.workers {
			if let Err(err) = worker.await
				&& err.is_panic()
			{
				panic::resume_unwind(err.into_panic());
			}
		}
	}
}

struct Worker {
	id: usize,
	workload: Arc<str>,
	work: Arc<dyn Runnable>,
	limiter: Arc<RateLimiter>,
	permits: u32,
	cancel: CancellationToken,
	invocation_timeout: Option<Duration>,
	stats: Arc<WorkStats>,
	failure_sink: Option<UnboundedSender<WorkFailure>>,
}
impl Worker {
	async fn run(self) {
		let mut error_count = 0_u32;

		while !self.cancel.is_cancelled() {
			match self.limiter.acquire_many(self.permits, &self.cancel).await {
				Ok(()) => (),
				Err(Error::Limiter(err)) => {
					obs::log_limiter_refusal(&self.workload, self.id, &err);
					self.stats.record_throttled();

					if !self.pause(LIMITER_RETRY_PAUSE).await {
						break;
					}

					continue;
				},
				Err(_) => break,
			}

			match self.invoke().await {
				Ok(()) => {
					error_count = 0;

					self.record(WorkOutcome::Ok);
				},
				// Only the governing token stops a lane; work may return `Cancelled` on its own.
				Err(_) if self.cancel.is_cancelled() => break,
				Err(err) => {
					error_count = error_count.saturating_add(1);

					let outcome = match err {
						Error::Timeout { .. } => WorkOutcome::Timeout,
						_ => WorkOutcome::Failed,
					};
					let backoff = jittered_failure_backoff(error_count);

					self.record(outcome);
					self.report(error_count, backoff, err);

					if !self.pause(backoff).await {
						break;
					}
				},
			}
		}

		obs::log_worker_stopped(&self.workload, self.id);
	}

	async fn invoke(&self) -> Result<()> {
		let span = WorkSpan::work(&self.workload, self.id);
		let work = self.work.run(&self.cancel);

		match self.invocation_timeout {
			Some(after) => span
				.instrument(time::timeout(after, work))
				.await
				.map_err(|_| Error::Timeout { after })?,
			None => span.instrument(work).await,
		}
	}

	// Sleeps for `duration`; returns `false` if cancelled first.
	async fn pause(&self, duration: Duration) -> bool {
		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => false,
			_ = time::sleep(duration) => true,
		}
	}

	fn record(&self, outcome: WorkOutcome) {
		self.stats.record(outcome);

		obs::record_work_outcome(&self.workload, outcome);
	}

	fn report(&self, error_count: u32, backoff: Duration, error: Error) {
		obs::log_work_failure(&self.workload, self.id, error_count, backoff, &error);

		if let Some(sink) = &self.failure_sink {
			// A dropped receiver only means nobody is listening anymore.
			let _ = sink.send(WorkFailure {
				workload: self.workload.clone(),
				worker: self.id,
				error_count,
				backoff,
				error,
			});
		}
	}
}
