//! Form Engine (C6): per-dispenser state machine plus batch-run
//! orchestration across multiple visits (spec.md §4.5).

mod engine;
mod templates;

pub use engine::run_form;
pub use templates::FormTemplate;

use std::sync::Arc;
use std::time::Duration;

use automation_progress::JobContext;
use automation_protocol::dispenser::Dispenser;
use uuid::Uuid;

use crate::driver::TargetSiteDriver;

/// One unit of batch work: a dispenser to calibrate and the visit page it
/// lives on.
#[derive(Debug, Clone)]
pub struct BatchItem {
	pub dispenser: Dispenser,
	pub visit_url: String,
}

/// Batch-run parameters (spec.md §4.5: "configurable concurrency (default
/// 1), inter-job delay, per-item retry limit (default 3), and a
/// continue-on-error flag").
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
	pub concurrency: usize,
	pub inter_job_delay: Duration,
	pub retry_limit: u32,
	pub continue_on_error: bool,
}

impl Default for BatchOptions {
	fn default() -> Self {
		Self {
			concurrency: 1,
			inter_job_delay: Duration::from_millis(500),
			retry_limit: 3,
			continue_on_error: true,
		}
	}
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
	pub succeeded: u32,
	pub failed: u32,
	pub errors: Vec<(Uuid, String)>,
}

impl BatchOutcome {
	fn merge(&mut self, other: BatchOutcome) {
		self.succeeded += other.succeeded;
		self.failed += other.failed;
		self.errors.extend(other.errors);
	}
}

/// Runs a batch of dispensers to completion. Each entry in `drivers` is an
/// independent, already-authenticated session; work is partitioned
/// round-robin across them so `drivers.len()` items ever run concurrently
/// (spec.md §4.5: "a batch run holds a single logical job in the queue but
/// emits per-item progress events" — one event per `BatchItem`, not per
/// driver).
pub async fn run_batch(
	drivers: Vec<Arc<dyn TargetSiteDriver>>,
	ctx: JobContext,
	items: Vec<BatchItem>,
	options: BatchOptions,
) -> BatchOutcome {
	if drivers.is_empty() || items.is_empty() {
		return BatchOutcome::default();
	}

	let lanes = partition_round_robin(items, drivers.len());
	let mut tasks = tokio::task::JoinSet::new();
	for (driver, lane) in drivers.into_iter().zip(lanes) {
		let ctx = ctx.clone();
		tasks.spawn(async move { run_lane(driver.as_ref(), &ctx, lane, options).await });
	}

	let mut outcome = BatchOutcome::default();
	while let Some(result) = tasks.join_next().await {
		if let Ok(partial) = result {
			outcome.merge(partial);
		}
	}
	outcome
}

async fn run_lane(
	driver: &dyn TargetSiteDriver,
	ctx: &JobContext,
	lane: Vec<BatchItem>,
	options: BatchOptions,
) -> BatchOutcome {
	let mut outcome = BatchOutcome::default();
	for (i, item) in lane.into_iter().enumerate() {
		if ctx.is_cancelled() {
			break;
		}
		if i > 0 {
			tokio::time::sleep(options.inter_job_delay).await;
		}

		let mut attempt = 0;
		let result = loop {
			attempt += 1;
			match run_form(driver, ctx, &item.dispenser, &item.visit_url).await {
				Ok(()) => break Ok(()),
				Err(e) if attempt <= options.retry_limit => {
					tracing::warn!(dispenser_id = %item.dispenser.id, attempt, error = %e, "retrying form run");
					continue;
				}
				Err(e) => break Err(e),
			}
		};

		match result {
			Ok(()) => outcome.succeeded += 1,
			Err(e) => {
				outcome.failed += 1;
				outcome.errors.push((item.dispenser.id, e.to_string()));
				if !options.continue_on_error {
					break;
				}
			}
		}
	}
	outcome
}

fn partition_round_robin<T>(items: Vec<T>, lanes: usize) -> Vec<Vec<T>> {
	let mut buckets: Vec<Vec<T>> = (0..lanes).map(|_| Vec::new()).collect();
	for (i, item) in items.into_iter().enumerate() {
		buckets[i % lanes].push(item);
	}
	buckets
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_robin_spreads_items_evenly() {
		let items = vec![1, 2, 3, 4, 5];
		let buckets = partition_round_robin(items, 2);
		assert_eq!(buckets[0], vec![1, 3, 5]);
		assert_eq!(buckets[1], vec![2, 4]);
	}

	#[test]
	fn default_batch_options_match_documented_defaults() {
		let options = BatchOptions::default();
		assert_eq!(options.concurrency, 1);
		assert_eq!(options.retry_limit, 3);
		assert!(options.continue_on_error);
	}
}
