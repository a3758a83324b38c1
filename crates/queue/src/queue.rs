//! Job store and per-queue priority heaps (spec.md §4.9). Guarded
//! separately — `heaps` by a plain mutex (ordering structure only),
//! `jobs` by a read-write lock (spec.md §5: "readers: queue status
//! queries; writers: state transitions") — since the canonical job record
//! lives in `jobs` and heap entries are only ever used to find the next
//! candidate job_id.

use std::collections::{BinaryHeap, HashMap};

use automation_protocol::job::{DependencyMode, Job, JobState, QueueKind, QueuedJob};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::{QueueError, Result};

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct QueueCounts {
	pub pending: u32,
	pub queued: u32,
	pub running: u32,
	pub paused: u32,
	pub completed: u32,
	pub failed: u32,
	pub cancelled: u32,
	pub timeout: u32,
}

pub struct JobQueue {
	heaps: Mutex<HashMap<QueueKind, BinaryHeap<QueuedJob>>>,
	jobs: RwLock<HashMap<Uuid, Job>>,
	/// Woken on every submission and every retry re-queue so the scheduler
	/// doesn't have to wait out its full tick interval (spec.md §4.9 step 4:
	/// "or wake on new submission").
	pub(crate) notify: Notify,
}

impl JobQueue {
	pub fn new() -> Self {
		let heaps = QueueKind::ALL.into_iter().map(|k| (k, BinaryHeap::new())).collect();
		Self { heaps: Mutex::new(heaps), jobs: RwLock::new(HashMap::new()), notify: Notify::new() }
	}

	/// Accepts a job already in `queued` state (the API layer transitions
	/// `pending -> queued` before submission; jobs with a future
	/// `scheduled_at` are still `queued`, just not yet `ready`).
	pub fn submit(&self, job: Job) {
		let kind = job.queue;
		self.jobs.write().insert(job.job_id, job.clone());
		self.heaps.lock().entry(kind).or_default().push(QueuedJob(job));
		self.notify.notify_one();
	}

	pub fn get(&self, job_id: Uuid) -> Option<Job> {
		self.jobs.read().get(&job_id).cloned()
	}

	/// Marks a job cancelled. Returns the job so the caller can signal a
	/// running worker's cancel token; does nothing to heap membership since
	/// the scheduler discards non-`queued` heap entries lazily.
	pub fn cancel(&self, job_id: Uuid) -> Result<Job> {
		let mut jobs = self.jobs.write();
		let job = jobs.get_mut(&job_id).ok_or(QueueError::JobNotFound(job_id))?;
		if job.state.is_terminal() {
			return Err(QueueError::AlreadyTerminal { job_id });
		}
		job.state = JobState::Cancelled;
		job.completed_at = Some(Utc::now());
		Ok(job.clone())
	}

	pub fn all_jobs(&self) -> Vec<Job> {
		self.jobs.read().values().cloned().collect()
	}

	pub fn counts(&self) -> QueueCounts {
		let mut counts = QueueCounts::default();
		for job in self.jobs.read().values() {
			match job.state {
				JobState::Pending => counts.pending += 1,
				JobState::Queued => counts.queued += 1,
				JobState::Running => counts.running += 1,
				JobState::Paused => counts.paused += 1,
				JobState::Completed => counts.completed += 1,
				JobState::Failed => counts.failed += 1,
				JobState::Cancelled => counts.cancelled += 1,
				JobState::Timeout => counts.timeout += 1,
			}
		}
		counts
	}

	/// Replaces a job's canonical record after a state transition. Callers
	/// own the transition-legality check (`JobState::can_transition_to`).
	pub(crate) fn update(&self, job: Job) {
		self.jobs.write().insert(job.job_id, job);
	}

	/// Re-enqueues a job onto its own queue (spec.md §4.9: a retry, or a
	/// job whose `scheduled_at` has not yet arrived).
	pub(crate) fn requeue(&self, job: Job) {
		self.requeue_inner(job);
		self.notify.notify_one();
	}

	/// Same as [`Self::requeue`] but without waking the scheduler — for the
	/// resource-denied path (spec.md §4.8: "returns false … the queue
	/// retries on next tick"), where the head is still ready and would
	/// otherwise notify itself right back awake every pass.
	pub(crate) fn requeue_quiet(&self, job: Job) {
		self.requeue_inner(job);
	}

	fn requeue_inner(&self, job: Job) {
		let kind = job.queue;
		self.heaps.lock().entry(kind).or_default().push(QueuedJob(job.clone()));
		self.update(job);
	}

	pub(crate) fn dependencies_satisfied(&self, job: &Job) -> bool {
		if job.depends_on.is_empty() {
			return true;
		}
		let jobs = self.jobs.read();
		let mut satisfied = job.depends_on.iter().map(|id| jobs.get(id).is_some_and(|j| j.state == JobState::Completed));
		match job.dependency_mode {
			DependencyMode::All => satisfied.all(|ok| ok),
			DependencyMode::Any => satisfied.any(|ok| ok),
		}
	}

	/// Pops the next ready job from `kind`'s heap, if any, applying the gate
	/// checks of spec.md §4.9 step 2 ((a) and (b) and (c) — resource
	/// allocation, gate (d), is the scheduler's job). Stale heap entries
	/// (jobs no longer `queued`, e.g. cancelled while waiting) are silently
	/// discarded; a gate failure on a live head blocks that queue for this
	/// tick (head-of-line, not skip-ahead).
	pub(crate) fn next_ready(&self, kind: QueueKind, now: DateTime<Utc>) -> Option<Job> {
		let mut heaps = self.heaps.lock();
		let heap = heaps.entry(kind).or_default();
		loop {
			let job_id = heap.peek()?.0.job_id;
			let Some(job) = self.jobs.read().get(&job_id).cloned() else {
				heap.pop();
				continue;
			};
			if job.state != JobState::Queued {
				heap.pop();
				continue;
			}
			if !self.dependencies_satisfied(&job) || !job.is_ready_to_run(now) {
				return None;
			}
			heap.pop();
			return Some(job);
		}
	}
}

impl Default for JobQueue {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use automation_protocol::job::{JobKind, Priority, ResourceRequirement};
	use serde_json::Value;

	fn job(priority: Priority, queue: QueueKind) -> Job {
		Job {
			job_id: Uuid::new_v4(),
			user_id: Uuid::new_v4(),
			kind: JobKind::ScrapeList,
			priority,
			state: JobState::Queued,
			queue,
			payload: Value::Null,
			depends_on: vec![],
			dependency_mode: DependencyMode::All,
			resources: ResourceRequirement::default(),
			scheduled_at: None,
			deadline: None,
			max_retries: 3,
			retry_delay_secs: 30,
			retry_count: 0,
			created_at: Utc::now(),
			queued_at: Some(Utc::now()),
			started_at: None,
			completed_at: None,
			error: None,
			result: None,
		}
	}

	#[test]
	fn next_ready_returns_highest_priority_first() {
		let queue = JobQueue::new();
		let low = job(Priority::Low, QueueKind::Single);
		let critical = job(Priority::Critical, QueueKind::Single);
		queue.submit(low);
		queue.submit(critical.clone());

		let ready = queue.next_ready(QueueKind::Single, Utc::now()).unwrap();
		assert_eq!(ready.job_id, critical.job_id);
	}

	#[test]
	fn cancelled_head_is_discarded_without_blocking_the_next_job() {
		let queue = JobQueue::new();
		let first = job(Priority::Normal, QueueKind::Single);
		let second = job(Priority::Normal, QueueKind::Single);
		queue.submit(first.clone());
		queue.submit(second.clone());
		queue.cancel(first.job_id).unwrap();

		let ready = queue.next_ready(QueueKind::Single, Utc::now());
		assert!(ready.is_some());
		assert_ne!(ready.unwrap().job_id, first.job_id);
	}

	#[test]
	fn unsatisfied_dependency_blocks_the_head() {
		let queue = JobQueue::new();
		let mut dependent = job(Priority::Normal, QueueKind::Single);
		dependent.depends_on = vec![Uuid::new_v4()];
		queue.submit(dependent);

		assert!(queue.next_ready(QueueKind::Single, Utc::now()).is_none());
	}

	#[test]
	fn future_scheduled_at_blocks_the_head() {
		let queue = JobQueue::new();
		let mut scheduled = job(Priority::Normal, QueueKind::Scheduled);
		scheduled.scheduled_at = Some(Utc::now() + chrono::Duration::hours(1));
		queue.submit(scheduled);

		assert!(queue.next_ready(QueueKind::Scheduled, Utc::now()).is_none());
	}
}
