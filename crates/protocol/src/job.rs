//! Job domain type driving the priority queue (spec.md §3, §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
	Low,
	Normal,
	High,
	Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
	Pending,
	Queued,
	Running,
	Paused,
	Completed,
	Failed,
	Cancelled,
	Timeout,
}

impl JobState {
	/// Monotonic transition check (spec.md §3 "Job state transitions are
	/// monotonic except `running -> queued` on retry scheduling").
	pub fn can_transition_to(self, next: JobState) -> bool {
		use JobState::*;
		if self == next {
			return true;
		}
		match (self, next) {
			(Running, Queued) => true, // the documented retry exception
			(Pending, Queued)
			| (Queued, Running)
			| (Running, Paused)
			| (Paused, Running)
			| (Running, Completed)
			| (Running, Failed)
			| (Running, Timeout) => true,
			(Pending | Queued | Running | Paused, Cancelled) => true,
			_ => false,
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled | JobState::Timeout)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
	Single,
	Batch,
	Scheduled,
	Retry,
	Priority,
}

impl QueueKind {
	/// Fixed fairness order the scheduler visits queues in (spec.md §4.9
	/// step 1).
	pub const ALL: [QueueKind; 5] =
		[QueueKind::Priority, QueueKind::Single, QueueKind::Scheduled, QueueKind::Retry, QueueKind::Batch];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
	ScrapeList,
	ScrapeDispensers,
	RunForm,
	RunBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyMode {
	All,
	Any,
}

/// Resource requirement declared at enqueue time and checked by the
/// Resource Manager (spec.md §4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceRequirement {
	pub sessions: u32,
	pub memory_mb: u32,
	pub cpu: f64,
	pub max_duration_secs: u64,
}

impl Default for ResourceRequirement {
	fn default() -> Self {
		Self {
			sessions: 1,
			memory_mb: 512,
			cpu: 0.5,
			max_duration_secs: 600,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
	pub job_id: Uuid,
	pub user_id: Uuid,
	pub kind: JobKind,
	pub priority: Priority,
	pub state: JobState,
	pub queue: QueueKind,
	pub payload: Value,
	pub depends_on: Vec<Uuid>,
	pub dependency_mode: DependencyMode,
	pub resources: ResourceRequirement,
	pub scheduled_at: Option<DateTime<Utc>>,
	pub deadline: Option<DateTime<Utc>>,
	pub max_retries: u32,
	pub retry_delay_secs: u64,
	pub retry_count: u32,
	pub created_at: DateTime<Utc>,
	pub queued_at: Option<DateTime<Utc>>,
	pub started_at: Option<DateTime<Utc>>,
	pub completed_at: Option<DateTime<Utc>>,
	pub error: Option<String>,
	pub result: Option<Value>,
}

impl Job {
	/// `(-priority, scheduled_at ?? created_at, created_at)` ordering key
	/// (spec.md §4.9). Returned as a tuple so `Ord` composes field-by-field
	/// without a derive on the full struct (`payload`/`result` aren't `Ord`).
	pub fn order_key(&self) -> (std::cmp::Reverse<Priority>, DateTime<Utc>, DateTime<Utc>) {
		(
			std::cmp::Reverse(self.priority),
			self.scheduled_at.unwrap_or(self.created_at),
			self.created_at,
		)
	}

	pub fn is_ready_to_run(&self, now: DateTime<Utc>) -> bool {
		self.state == JobState::Queued && self.scheduled_at.is_none_or(|at| at <= now)
	}
}

/// Wrapper giving [`Job`] a total order for the priority heaps (spec.md §4.9,
/// testable property 6). Ties break exactly as `order_key` dictates.
#[derive(Debug, Clone)]
pub struct QueuedJob(pub Job);

impl PartialEq for QueuedJob {
	fn eq(&self, other: &Self) -> bool {
		self.0.job_id == other.0.job_id
	}
}
impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for QueuedJob {
	fn cmp(&self, other: &Self) -> Ordering {
		// BinaryHeap is a max-heap; we want the smallest order_key to sort
		// first, so reverse the comparison here.
		other.0.order_key().cmp(&self.0.order_key())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn job(priority: Priority, scheduled_at: Option<DateTime<Utc>>, created_at: DateTime<Utc>) -> Job {
		Job {
			job_id: Uuid::new_v4(),
			user_id: Uuid::nil(),
			kind: JobKind::ScrapeList,
			priority,
			state: JobState::Queued,
			queue: QueueKind::Single,
			payload: Value::Null,
			depends_on: vec![],
			dependency_mode: DependencyMode::All,
			resources: ResourceRequirement::default(),
			scheduled_at,
			deadline: None,
			max_retries: 0,
			retry_delay_secs: 0,
			retry_count: 0,
			created_at,
			queued_at: None,
			started_at: None,
			completed_at: None,
			error: None,
			result: None,
		}
	}

	#[test]
	fn higher_priority_sorts_first() {
		let t = Utc::now();
		let low = QueuedJob(job(Priority::Low, None, t));
		let critical = QueuedJob(job(Priority::Critical, None, t));
		let mut heap = std::collections::BinaryHeap::new();
		heap.push(low);
		heap.push(critical.clone());
		assert_eq!(heap.pop().unwrap().0.priority, Priority::Critical);
	}

	#[test]
	fn equal_priority_breaks_tie_on_scheduled_at_then_created_at() {
		let t0 = Utc::now();
		let t1 = t0 + chrono::Duration::seconds(5);
		let earlier = QueuedJob(job(Priority::Normal, Some(t0), t0));
		let later = QueuedJob(job(Priority::Normal, Some(t1), t0));
		let mut heap = std::collections::BinaryHeap::new();
		heap.push(later);
		heap.push(earlier);
		assert_eq!(heap.pop().unwrap().0.scheduled_at, Some(t0));
	}

	#[test]
	fn running_to_queued_is_the_only_non_monotonic_transition() {
		assert!(JobState::Running.can_transition_to(JobState::Queued));
		assert!(!JobState::Completed.can_transition_to(JobState::Running));
	}
}
