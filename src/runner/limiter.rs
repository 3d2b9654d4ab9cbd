//! Token-bucket rate limiter shared by the workers of one run.

// std
use std::num::NonZeroU32;
// crates.io
use tokio::time::{self, Instant};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, LimiterError},
};

#[derive(Debug)]
struct Bucket {
	tokens: f64,
	last_refill: Instant,
}

/// Token bucket refilled at a fixed rate with one second's worth of burst capacity.
///
/// The bucket starts with a single token so the first permit is immediate and later permits
/// are spaced by [`RateLimiter::interval`].
#[derive(Debug)]
pub struct RateLimiter {
	rate: NonZeroU32,
	bucket: Mutex<Bucket>,
}
impl RateLimiter {
	/// Creates a limiter refilling `rate` tokens per second.
	pub fn new(rate: NonZeroU32) -> Self {
		Self { rate, bucket: Mutex::new(Bucket { tokens: 1., last_refill: Instant::now() }) }
	}

	/// Validating constructor for raw rates.
	pub fn per_second(rate: u32) -> Result<Self> {
		NonZeroU32::new(rate).map(Self::new).ok_or_else(|| ConfigError::NonPositiveRate.into())
	}

	/// Permits granted per second.
	pub fn rate(&self) -> u32 {
		self.rate.get()
	}

	/// Maximum number of tokens the bucket can hold.
	pub fn burst(&self) -> u32 {
		self.rate.get()
	}

	/// Minimum spacing between permits at the steady rate.
	pub fn interval(&self) -> Duration {
		Duration::from_secs(1) / self.rate.get()
	}

	/// Takes a permit if one is available right now.
	pub fn try_acquire(&self) -> bool {
		self.reserve(1).is_none()
	}

	/// Waits for one permit or until `cancel` fires.
	pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
		self.acquire_many(1, cancel).await
	}

	/// Waits until `permits` tokens can be taken at once, or until `cancel` fires.
	///
	/// Requests larger than the burst capacity could never be satisfied and are refused with
	/// [`LimiterError::ExceedsBurst`].
	pub async fn acquire_many(&self, permits: u32, cancel: &CancellationToken) -> Result<()> {
		if permits > self.burst() {
			return Err(LimiterError::ExceedsBurst { requested: permits, burst: self.burst() }.into());
		}

		loop {
			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			let Some(wait) = self.reserve(permits) else {
				return Ok(());
			};

			tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				_ = time::sleep(wait) => {},
			}
		}
	}

	// Takes the tokens and returns `None`, or returns how long until enough have accumulated.
	fn reserve(&self, permits: u32) -> Option<Duration> {
		let rate = f64::from(self.rate.get());
		let wanted = f64::from(permits);
		let now = Instant::now();
		let mut bucket = self.bucket.lock();
		let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();

		bucket.tokens = (bucket.tokens + elapsed * rate).min(f64::from(self.burst()));
		bucket.last_refill = now;

		if bucket.tokens >= wanted {
			bucket.tokens -= wanted;

			None
		} else {
			Some(Duration::from_secs_f64((wanted - bucket.tokens) / rate))
		}
	}
}
