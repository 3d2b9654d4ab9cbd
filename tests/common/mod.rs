#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
// self
use workload_runner::{
	auth::{Token, TokenFuture, TokenSource},
	error::{Error, Result},
	runner::{Runnable, WorkFuture},
};

/// One scripted outcome.
#[derive(Clone, Copy, Debug)]
pub enum Step {
	/// Succeed; token sources mint a token with this TTL.
	Ok(Duration),
	/// Fail with a delegate error.
	Fail,
	/// Sleep for the duration, then succeed.
	Stall(Duration),
}

#[derive(Debug)]
struct Script {
	steps: Mutex<VecDeque<Step>>,
	calls: Mutex<Vec<Instant>>,
}
impl Script {
	fn new(steps: impl IntoIterator<Item = Step>) -> Self {
		Self { steps: Mutex::new(steps.into_iter().collect()), calls: Mutex::new(Vec::new()) }
	}

	// Pops the next step, repeating the last one forever.
	fn advance(&self) -> Step {
		self.calls.lock().push(Instant::now());

		let mut steps = self.steps.lock();

		if steps.len() > 1 {
			steps.pop_front().expect("Script should hold at least one step.")
		} else {
			*steps.front().expect("Script should hold at least one step.")
		}
	}
}

/// Token source replaying a script and recording when it was called.
#[derive(Debug)]
pub struct RecordingSource {
	script: Script,
	minted: AtomicUsize,
}
impl RecordingSource {
	pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
		Arc::new(Self { script: Script::new(steps), minted: AtomicUsize::new(0) })
	}

	pub fn calls(&self) -> usize {
		self.script.calls.lock().len()
	}

	pub fn call_times(&self) -> Vec<Instant> {
		self.script.calls.lock().clone()
	}
}
impl TokenSource for RecordingSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let ttl = match self.script.advance() {
				Step::Ok(ttl) => ttl,
				Step::Fail => return Err(Error::delegate_msg("token endpoint returned 503")),
				Step::Stall(pause) => {
					time::sleep(pause).await;

					Duration::from_secs(3600)
				},
			};
			let serial = self.minted.fetch_add(1, Ordering::SeqCst) + 1;

			Ok(Token::new(format!("token-{serial}")).with_expires_in(ttl))
		})
	}
}

/// Work function replaying a script and tracking concurrency.
#[derive(Debug)]
pub struct RecordingWork {
	script: Script,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}
impl RecordingWork {
	pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
		Arc::new(Self {
			script: Script::new(steps),
			in_flight: AtomicUsize::new(0),
			max_in_flight: AtomicUsize::new(0),
		})
	}

	pub fn succeeding() -> Arc<Self> {
		Self::new([Step::Ok(Duration::ZERO)])
	}

	pub fn invocations(&self) -> usize {
		self.script.calls.lock().len()
	}

	pub fn call_times(&self) -> Vec<Instant> {
		self.script.calls.lock().clone()
	}

	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}
}
impl Runnable for RecordingWork {
	fn run(&self, _: &CancellationToken) -> WorkFuture<'_> {
		Box::pin(async move {
			let step = self.script.advance();
			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			self.max_in_flight.fetch_max(now, Ordering::SeqCst);

			let result: Result<()> = match step {
				Step::Ok(_) => Ok(()),
				Step::Fail => Err(Error::delegate_msg("transaction aborted")),
				Step::Stall(pause) => {
					time::sleep(pause).await;

					Ok(())
				},
			};

			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			result
		})
	}
}
