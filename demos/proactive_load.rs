//! Drives two simulated workloads against a fake transactional store, authenticating every
//! operation through a proactively refreshed token cache.
//!
//! The workload plan comes from `WORKLOAD_PLAN` (e.g. `DEPOSIT:20;QUERY:5`) and defaults to
//! `DEPOSIT:10;QUERY:5`.

// std
use std::{
	env,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};
// crates.io
use color_eyre::Result;
use tokio::time;
// self
use workload_runner::{
	CancellationToken,
	auth::{Token, TokenCache, TokenCacheConfig, TokenFuture, TokenSource},
	error::Error,
	plan::WorkloadPlan,
	runner::{Runnable, Runner, WorkFuture},
};

/// Identity provider that takes a while to mint short-lived tokens.
#[derive(Debug, Default)]
struct SlowIssuer {
	issued: AtomicU64,
}
impl TokenSource for SlowIssuer {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			time::sleep(Duration::from_millis(250)).await;

			let serial = self.issued.fetch_add(1, Ordering::Relaxed) + 1;

			Ok(Token::new(format!("demo-access-{serial}")).with_expires_in(Duration::from_secs(60)))
		})
	}
}

/// Simulated store operation that needs a bearer token for every call.
struct StoreOperation {
	credentials: Arc<TokenCache>,
	latency: Duration,
	abort_every: u64,
	calls: AtomicU64,
}
impl Runnable for StoreOperation {
	fn run(&self, cancel: &CancellationToken) -> WorkFuture<'_> {
		let cancel = cancel.clone();

		Box::pin(async move {
			let token = self.credentials.token().await?;
			let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;

			tokio::select! {
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				_ = time::sleep(self.latency) => {},
			}

			if call % self.abort_every == 0 {
				return Err(Error::delegate_msg(format!(
					"transaction aborted while authenticated as {}",
					token.token_type
				)));
			}

			Ok(())
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let plan = env::var("WORKLOAD_PLAN")
		.unwrap_or_else(|_| "DEPOSIT:10;QUERY:5".into())
		.parse::<WorkloadPlan>()?;
	let cancel = CancellationToken::new();
	let credentials = Arc::new(TokenCache::new(
		SlowIssuer::default(),
		TokenCacheConfig::new(Duration::from_secs(30)),
	)?);
	let refresh = credentials.spawn(cancel.clone());
	let mut handles = Vec::new();

	for (name, rate) in &plan {
		let work = Arc::new(StoreOperation {
			credentials: credentials.clone(),
			latency: Duration::from_millis(40),
			abort_every: 25,
			calls: AtomicU64::new(0),
		});

		handles.push(Runner::new(*rate, 4)?.run(&cancel, name, work));
	}

	time::sleep(Duration::from_secs(5)).await;
	cancel.cancel();

	for handle in handles {
		let stats = handle.stats();
		let workload = handle.workload().to_owned();

		handle.join().await;

		println!(
			"{workload}: {} ok, {} failed, {} timed out.",
			stats.ok(),
			stats.failed(),
			stats.timed_out()
		);
	}

	refresh.await?;

	Ok(())
}
