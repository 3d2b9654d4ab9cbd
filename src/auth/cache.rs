//! Proactively refreshed token cache.
//!
//! [`TokenCache`] keeps one bearer token warm in memory. Readers call [`TokenCache::token`],
//! which returns the cached value without touching the delegate as long as it is valid. A
//! background loop started through [`TokenCache::run`] (or [`TokenCache::spawn`]) replaces the
//! token every renew period and retries failed refreshes with a doubling, capped backoff, so the
//! inline delegate call only happens at cold start or after refreshes kept failing long enough
//! for the cached token to expire.

mod backoff;

pub use backoff::RetryBackoff;

// crates.io
use tokio::{
	sync::Notify,
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
// self
use crate::{
	_prelude::*,
	auth::{Token, TokenFuture, TokenSource, usable_at},
	error::ConfigError,
	obs::{self, FetchOutcome, FetchPath, WorkSpan},
};

/// Settings for [`TokenCache`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCacheConfig {
	/// How often the background loop replaces the cached token.
	pub renew_period: Duration,
	/// Ceiling for the refresh retry backoff; defaults to 10 seconds.
	#[serde(default)]
	pub max_wait: Option<Duration>,
	/// First refresh retry wait; defaults to 100 milliseconds.
	#[serde(default)]
	pub initial_wait: Option<Duration>,
}
impl TokenCacheConfig {
	/// Default ceiling for the refresh retry backoff.
	pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10);
	/// Default first refresh retry wait.
	pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_millis(100);
	/// Delay used for the first scheduled refresh when `now + renew_period` is unrepresentable.
	pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

	/// Creates a config with the default retry bounds.
	pub fn new(renew_period: Duration) -> Self {
		Self { renew_period, max_wait: None, initial_wait: None }
	}

	/// Overrides the retry backoff ceiling.
	pub fn with_max_wait(mut self, wait: Duration) -> Self {
		self.max_wait = Some(wait);

		self
	}

	/// Overrides the first retry wait.
	pub fn with_initial_wait(mut self, wait: Duration) -> Self {
		self.initial_wait = Some(wait);

		self
	}

	fn resolved_max_wait(&self) -> Duration {
		self.max_wait.filter(|wait| !wait.is_zero()).unwrap_or(Self::DEFAULT_MAX_WAIT)
	}

	fn resolved_initial_wait(&self) -> Duration {
		self.initial_wait.filter(|wait| !wait.is_zero()).unwrap_or(Self::DEFAULT_INITIAL_WAIT)
	}
}

/// Token source wrapper that keeps a credential warm ahead of expiry.
pub struct TokenCache {
	delegate: Arc<dyn TokenSource>,
	current: AsyncRwLock<Option<Token>>,
	renew_period: Duration,
	initial_wait: Duration,
	max_wait: Duration,
}
impl TokenCache {
	/// Wraps `delegate`, which remains the only source of new tokens.
	pub fn new(delegate: impl 'static + TokenSource, config: TokenCacheConfig) -> Result<Self> {
		if config.renew_period.is_zero() {
			return Err(ConfigError::NonPositiveRenewPeriod.into());
		}

		let max_wait = config.resolved_max_wait();
		let initial_wait = config.resolved_initial_wait().min(max_wait);

		Ok(Self {
			delegate: Arc::new(delegate),
			current: AsyncRwLock::new(None),
			renew_period: config.renew_period,
			initial_wait,
			max_wait,
		})
	}

	/// Period between proactive refreshes.
	pub fn renew_period(&self) -> Duration {
		self.renew_period
	}

	/// Backoff the refresh loop starts from after a success.
	pub fn retry_backoff(&self) -> RetryBackoff {
		RetryBackoff::new(self.initial_wait, self.max_wait)
	}

	/// Returns a valid token, fetching one inline only when the cache holds none.
	///
	/// Delegate failures surface here only while no valid token is cached; the stale token is
	/// never handed out in that case.
	pub async fn token(&self) -> Result<Token> {
		if let Some(token) = self.cached().await {
			return Ok(token);
		}

		let mut current = self.current.write().await;

		// Another writer may have filled the slot while we queued for the lock.
		if let Some(token) = usable_at(current.as_ref(), OffsetDateTime::now_utc()) {
			return Ok(token.clone());
		}

		let token = self.fetch(FetchPath::Sync).await?;

		*current = Some(token.clone());

		Ok(token)
	}

	/// Returns the cached token if it is still valid, without ever calling the delegate.
	pub async fn cached(&self) -> Option<Token> {
		usable_at(self.current.read().await.as_ref(), OffsetDateTime::now_utc()).cloned()
	}

	/// Runs the proactive refresh loop until `cancel` fires.
	///
	/// The first refresh happens immediately, then once per renew period. A failed refresh
	/// sleeps for the current backoff and schedules a single retry; retries requested while one
	/// is already pending are coalesced.
	pub async fn run(&self, cancel: CancellationToken) {
		let now = Instant::now();
		let first_tick = now
			.checked_add(self.renew_period)
			.unwrap_or_else(|| now + TokenCacheConfig::FAR_FUTURE);
		let mut ticker = time::interval_at(first_tick, self.renew_period);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		let retry = Notify::new();
		let mut backoff = self.retry_backoff();

		retry.notify_one();

		loop {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				_ = retry.notified() => {},
				_ = ticker.tick() => {},
			}

			match self.fetch(FetchPath::Background).await {
				Ok(token) => {
					obs::log_refresh_success(token.expires_at);

					*self.current.write().await = Some(token);

					backoff.reset();
				},
				Err(err) => {
					let wait = backoff.next_wait();

					obs::log_refresh_failure(wait, &err);

					tokio::select! {
						biased;
						_ = cancel.cancelled() => break,
						_ = time::sleep(wait) => {},
					}

					retry.notify_one();
				},
			}
		}

		obs::log_refresh_stopped();
	}

	/// Spawns [`TokenCache::run`] onto the current tokio runtime.
	pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
		let cache = Arc::clone(self);

		tokio::spawn(async move { cache.run(cancel).await })
	}

	async fn fetch(&self, path: FetchPath) -> Result<Token> {
		let result = WorkSpan::token(path).instrument(self.delegate.token()).await;
		let outcome = if result.is_ok() { FetchOutcome::Success } else { FetchOutcome::Failure };

		obs::record_token_fetch(path, outcome);

		result
	}
}
impl TokenSource for TokenCache {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(TokenCache::token(self))
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("renew_period", &self.renew_period)
			.field("initial_wait", &self.initial_wait)
			.field("max_wait", &self.max_wait)
			.finish()
	}
}
