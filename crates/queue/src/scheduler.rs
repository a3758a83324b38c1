//! Processing loop (spec.md §4.9): one scheduler task per process, fair
//! across queue kinds, gated by dependencies/schedule/resources, dispatching
//! independent worker tasks up to a concurrency cap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use automation_progress::{CancelToken, JobContext, ProgressBus};
use automation_protocol::job::{Job, JobState, QueueKind};
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::handler::JobHandler;
use crate::queue::JobQueue;
use crate::resources::ResourceManager;
use crate::snapshot::JobStore;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
	pub max_concurrent_jobs: usize,
	pub queue_check_interval: Duration,
	pub cleanup_interval: Duration,
	pub terminal_job_max_age: chrono::Duration,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			max_concurrent_jobs: 3,
			queue_check_interval: Duration::from_secs(5),
			cleanup_interval: Duration::from_secs(3600),
			terminal_job_max_age: chrono::Duration::hours(24),
		}
	}
}

/// Owns the running-worker registry (for cancellation) on top of the
/// ordering/storage primitives in [`JobQueue`].
pub struct Scheduler {
	queue: Arc<JobQueue>,
	resources: Arc<ResourceManager>,
	handler: Arc<dyn JobHandler>,
	bus: Arc<ProgressBus>,
	store: Option<JobStore>,
	config: SchedulerConfig,
	running: Arc<Mutex<HashMap<Uuid, CancelToken>>>,
}

impl Scheduler {
	pub fn new(
		queue: Arc<JobQueue>,
		resources: Arc<ResourceManager>,
		handler: Arc<dyn JobHandler>,
		bus: Arc<ProgressBus>,
		store: Option<JobStore>,
		config: SchedulerConfig,
	) -> Self {
		Self { queue, resources, handler, bus, store, config, running: Arc::new(Mutex::new(HashMap::new())) }
	}

	/// Rehydrates a persisted snapshot (if `store` is set) and resubmits
	/// every non-terminal job (spec.md §4.9: "a restart rehydrates pending
	/// and queued jobs").
	pub async fn restore(&self) -> crate::error::Result<()> {
		let Some(store) = &self.store else { return Ok(()) };
		let now = Utc::now();
		let jobs = store.load().await?;
		let jobs = JobStore::purge_stale(jobs, now, self.config.terminal_job_max_age);
		for job in jobs {
			if !job.state.is_terminal() {
				self.queue.submit(job);
			} else {
				self.queue.update(job);
			}
		}
		Ok(())
	}

	/// Signals a running job's worker, if any. The actual state transition
	/// to `cancelled` happens via [`JobQueue::cancel`], called by the
	/// caller before or after this (order doesn't matter: the worker checks
	/// `ctx.is_cancelled()`, not queue state).
	pub fn signal_cancel(&self, job_id: Uuid) {
		if let Some(token) = self.running.lock().get(&job_id) {
			token.cancel();
		}
	}

	/// Runs the scheduler loop until `shutdown` resolves. Intended to be
	/// spawned once at process startup.
	pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
		let mut cleanup_tick = tokio::time::interval(self.config.cleanup_interval);
		loop {
			self.dispatch_ready().await;

			tokio::select! {
				_ = tokio::time::sleep(self.config.queue_check_interval) => {}
				_ = self.queue.notify.notified() => {}
				_ = cleanup_tick.tick() => { self.cleanup_and_persist().await; }
				_ = shutdown.changed() => {
					if *shutdown.borrow() {
						self.cleanup_and_persist().await;
						return;
					}
				}
			}
		}
	}

	async fn cleanup_and_persist(&self) {
		let now = Utc::now();
		let kept = JobStore::purge_stale(self.queue.all_jobs(), now, self.config.terminal_job_max_age);
		if let Some(store) = &self.store {
			if let Err(e) = store.save(&kept).await {
				tracing::warn!(error = %e, "job snapshot persist failed");
			}
		}
	}

	async fn dispatch_ready(&self) {
		let now = Utc::now();
		loop {
			if self.running.lock().len() >= self.config.max_concurrent_jobs {
				return;
			}
			let Some(job) = self.next_dispatchable(now) else { return };
			self.spawn_worker(job);
		}
	}

	/// Fixed fairness order across queue kinds (spec.md §4.9 step 1), with
	/// resource allocation as the final gate (step 2(d)).
	fn next_dispatchable(&self, now: chrono::DateTime<Utc>) -> Option<Job> {
		for kind in QueueKind::ALL {
			let Some(job) = self.queue.next_ready(kind, now) else { continue };
			if self.resources.allocate(job.job_id, job.resources) {
				return Some(job);
			}
			// Resource-denied: the job is dequeued (next_ready already
			// popped it) but still queued logically, so put it straight
			// back rather than dropping it. Quiet requeue — the head is
			// still ready, so notifying here would just wake this loop
			// straight back up in a busy-spin until a worker frees up.
			self.queue.requeue_quiet(job);
		}
		None
	}

	fn spawn_worker(&self, mut job: Job) {
		job.state = JobState::Running;
		job.started_at = Some(Utc::now());
		self.queue.update(job.clone());

		let cancel = CancelToken::new();
		self.running.lock().insert(job.job_id, cancel.clone());

		let queue = self.queue.clone();
		let resources = self.resources.clone();
		let handler = self.handler.clone();
		let bus = self.bus.clone();
		let running = self.running.clone();
		let max_duration = Duration::from_secs(job.resources.max_duration_secs);

		tokio::spawn(async move {
			let ctx = JobContext::new(job.job_id, job.user_id, cancel.clone(), bus);
			let outcome = tokio::time::timeout(max_duration, handler.handle(&job, ctx)).await;

			// Deferred release: resources are freed on every exit path,
			// including the timeout branch below (spec.md §5: "a deferred
			// release hook on the worker's exit path guarantees this").
			resources.deallocate(job.job_id);
			running.lock().remove(&job.job_id);

			let now = Utc::now();
			let current_state = queue.get(job.job_id).map(|j| j.state).unwrap_or(job.state);
			if current_state == JobState::Cancelled {
				return;
			}

			match outcome {
				Err(_elapsed) => {
					job.state = JobState::Timeout;
					job.completed_at = Some(now);
					job.error = Some(format!("exceeded max_duration of {}s", job.resources.max_duration_secs));
					queue.update(job);
				}
				Ok(Ok(value)) => {
					job.state = JobState::Completed;
					job.completed_at = Some(now);
					job.result = Some(value);
					queue.update(job);
				}
				Ok(Err(message)) if job.retry_count < job.max_retries => {
					job.retry_count += 1;
					job.state = JobState::Queued;
					job.scheduled_at = Some(now + chrono::Duration::seconds(job.retry_delay_secs as i64));
					job.error = Some(message);
					job.started_at = None;
					queue.requeue(job);
				}
				Ok(Err(message)) => {
					job.state = JobState::Failed;
					job.completed_at = Some(now);
					job.error = Some(message);
					queue.update(job);
				}
			}
		});
	}
}
