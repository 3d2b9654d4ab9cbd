//! Workload plan parsing.
//!
//! A plan names the workloads a load generator should start and the rate each one runs at,
//! written as `NAME:RATE` entries separated by semicolons, e.g. `DEPOSIT:10;TWEET`. An entry
//! without a rate runs at one invocation per second and a zero rate is rejected. Reading the
//! string from the environment is left to the application.

// std
use std::{
	collections::{BTreeMap, btree_map::Iter},
	num::NonZeroU32,
};
// self
use crate::{_prelude::*, error::ConfigError};

/// Parsed `NAME:RATE;...` plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadPlan(BTreeMap<String, u32>);
impl WorkloadPlan {
	/// Rate used for entries that omit one.
	pub const DEFAULT_RATE: u32 = 1;

	/// Returns the configured rate for `workload`, if it is part of the plan.
	pub fn rate(&self, workload: &str) -> Option<u32> {
		self.0.get(workload).copied()
	}

	/// Returns `true` if `workload` is part of the plan.
	pub fn contains(&self, workload: &str) -> bool {
		self.0.contains_key(workload)
	}

	/// Iterates over `(workload, rate)` pairs in name order.
	pub fn iter(&self) -> Iter<'_, String, u32> {
		self.0.iter()
	}

	/// Number of workloads in the plan.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` if the plan names no workloads.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl FromStr for WorkloadPlan {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let mut plan = BTreeMap::new();

		for entry in s.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
			let (name, rate) = match entry.split_once(':') {
				Some((name, rate)) => {
					let rate = rate.trim().parse::<NonZeroU32>().map_err(|source| {
						ConfigError::InvalidPlan { entry: entry.to_owned(), source }
					})?;

					(name.trim(), rate.get())
				},
				None => (entry, Self::DEFAULT_RATE),
			};

			plan.insert(name.to_owned(), rate);
		}

		Ok(Self(plan))
	}
}
impl<'a> IntoIterator for &'a WorkloadPlan {
	type IntoIter = Iter<'a, String, u32>;
	type Item = (&'a String, &'a u32);

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::num::IntErrorKind;
	// self
	use super::*;

	#[test]
	fn parses_rates_and_defaults() {
		let plan: WorkloadPlan =
			"DEPOSIT:10;TWEET;DEPOSIT_DML:3".parse().expect("Plan fixture should parse.");

		assert_eq!(plan.rate("DEPOSIT"), Some(10));
		assert_eq!(plan.rate("TWEET"), Some(WorkloadPlan::DEFAULT_RATE));
		assert_eq!(plan.rate("DEPOSIT_DML"), Some(3));
		assert!(!plan.contains("CREATE_USER_ACCOUNT"));
		assert_eq!(plan.len(), 3);
	}

	#[test]
	fn empty_entries_are_skipped_and_duplicates_overwrite() {
		let plan: WorkloadPlan = " ;DEPOSIT:1;;DEPOSIT:20; ".parse().expect("Plan should parse.");

		assert_eq!(plan.iter().collect::<Vec<_>>(), [(&"DEPOSIT".to_owned(), &20)]);
		assert!("".parse::<WorkloadPlan>().expect("Empty plan should parse.").is_empty());
	}

	#[test]
	fn non_numeric_rates_are_rejected() {
		let err = "DEPOSIT:ten".parse::<WorkloadPlan>().expect_err("Rate must be numeric.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidPlan { ref entry, .. }) if entry == "DEPOSIT:ten"
		));
	}

	#[test]
	fn zero_rates_are_rejected_with_the_entry() {
		let err = "TWEET:5;DEPOSIT:0".parse::<WorkloadPlan>().expect_err("Rate must be positive.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidPlan { ref entry, ref source })
				if entry == "DEPOSIT:0" && *source.kind() == IntErrorKind::Zero
		));
	}
}
