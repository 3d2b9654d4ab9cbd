//! Exponential retry backoff with a ceiling.

// self
use crate::_prelude::*;

/// Doubling backoff bounded by a maximum wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryBackoff {
	initial: Duration,
	max: Duration,
	current: Duration,
}
impl RetryBackoff {
	/// Creates a backoff starting at `initial` and never exceeding `max`.
	pub fn new(initial: Duration, max: Duration) -> Self {
		let initial = initial.min(max);

		Self { initial, max, current: initial }
	}

	/// Wait that the next failure should sleep for.
	pub fn current(&self) -> Duration {
		self.current
	}

	/// Returns the wait for this failure and doubles the next one, capped at the maximum.
	pub fn next_wait(&mut self) -> Duration {
		let wait = self.current;

		self.current = self.current.saturating_mul(2).min(self.max);

		wait
	}

	/// Starts over from the initial wait after a success.
	pub fn reset(&mut self) {
		self.current = self.initial;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn doubles_until_capped() {
		let mut backoff = RetryBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
		let waits = (0..6).map(|_| backoff.next_wait().as_millis()).collect::<Vec<_>>();

		assert_eq!(waits, [100, 200, 400, 800, 1000, 1000]);
	}

	#[test]
	fn reset_returns_to_initial() {
		let mut backoff = RetryBackoff::new(Duration::from_millis(10), Duration::from_millis(100));

		backoff.next_wait();
		backoff.next_wait();

		assert_eq!(backoff.current(), Duration::from_millis(40));

		backoff.reset();

		assert_eq!(backoff.current(), Duration::from_millis(10));
	}

	#[test]
	fn initial_is_clamped_to_max() {
		let mut backoff = RetryBackoff::new(Duration::from_secs(30), Duration::from_secs(10));

		assert_eq!(backoff.next_wait(), Duration::from_secs(10));
		assert_eq!(backoff.next_wait(), Duration::from_secs(10));
	}
}
