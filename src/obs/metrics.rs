// self
use crate::obs::{FetchOutcome, FetchPath, WorkOutcome};

/// Records a work invocation outcome via the global metrics recorder (when enabled).
pub fn record_work_outcome(workload: &str, outcome: WorkOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"workload_runner_work_total",
			"workload" => workload.to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (workload, outcome);
	}
}

/// Records a delegate fetch outcome via the global metrics recorder (when enabled).
pub fn record_token_fetch(path: FetchPath, outcome: FetchOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"workload_runner_token_fetch_total",
			"path" => path.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (path, outcome);
	}
}
