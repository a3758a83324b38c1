//! Job-store persistence (spec.md §6 "Persisted state": "periodic snapshot
//! keyed by job_id; contains full Job struct including enum values as
//! strings"). Schema-versioned, atomic write-then-rename, grounded on
//! `automation-vault::store`'s `CredentialStore` pattern.

use std::path::{Path, PathBuf};

use automation_protocol::job::Job;
use serde::{Deserialize, Serialize};

use crate::error::Result;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
	schema: u32,
	jobs: Vec<Job>,
}

pub struct JobStore {
	path: PathBuf,
}

impl JobStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub async fn save(&self, jobs: &[Job]) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		let file = SnapshotFile { schema: SCHEMA_VERSION, jobs: jobs.to_vec() };
		let bytes = serde_json::to_vec_pretty(&file)?;
		write_atomic(&self.path, &bytes).await?;
		Ok(())
	}

	/// Loads the last snapshot, rehydrating `running` jobs back to `queued`
	/// (spec.md §4.9: "a conservative rollback" — the process that was
	/// running them no longer exists).
	pub async fn load(&self) -> Result<Vec<Job>> {
		use automation_protocol::job::JobState;

		let bytes = match tokio::fs::read(&self.path).await {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};
		let file: SnapshotFile = serde_json::from_slice(&bytes)?;
		let jobs = file
			.jobs
			.into_iter()
			.map(|mut job| {
				if job.state == JobState::Running {
					job.state = JobState::Queued;
				}
				job
			})
			.collect();
		Ok(jobs)
	}

	/// Removes terminal jobs older than `max_age` from a loaded set (spec.md
	/// §4.9 "Cleanup").
	pub fn purge_stale(jobs: Vec<Job>, now: chrono::DateTime<chrono::Utc>, max_age: chrono::Duration) -> Vec<Job> {
		jobs.into_iter()
			.filter(|job| {
				!job.state.is_terminal()
					|| job.completed_at.is_none_or(|completed| now - completed < max_age)
			})
			.collect()
	}
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
	let tmp = path.with_extension("tmp");
	tokio::fs::write(&tmp, bytes).await?;
	tokio::fs::rename(&tmp, path).await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use automation_protocol::job::{DependencyMode, JobKind, JobState, Priority, QueueKind, ResourceRequirement};
	use chrono::Utc;
	use uuid::Uuid;

	fn job(state: JobState, completed_at: Option<chrono::DateTime<Utc>>) -> Job {
		Job {
			job_id: Uuid::new_v4(),
			user_id: Uuid::new_v4(),
			kind: JobKind::ScrapeList,
			priority: Priority::Normal,
			state,
			queue: QueueKind::Single,
			payload: serde_json::Value::Null,
			depends_on: vec![],
			dependency_mode: DependencyMode::All,
			resources: ResourceRequirement::default(),
			scheduled_at: None,
			deadline: None,
			max_retries: 3,
			retry_delay_secs: 30,
			retry_count: 0,
			created_at: Utc::now(),
			queued_at: None,
			started_at: None,
			completed_at,
			error: None,
			result: None,
		}
	}

	#[tokio::test]
	async fn round_trips_jobs_through_disk() {
		let dir = tempfile::tempdir().unwrap();
		let store = JobStore::new(dir.path().join("jobs.json"));
		let jobs = vec![job(JobState::Queued, None)];
		store.save(&jobs).await.unwrap();

		let loaded = store.load().await.unwrap();
		assert_eq!(loaded.len(), 1);
		assert_eq!(loaded[0].job_id, jobs[0].job_id);
	}

	#[tokio::test]
	async fn loading_rolls_running_jobs_back_to_queued() {
		let dir = tempfile::tempdir().unwrap();
		let store = JobStore::new(dir.path().join("jobs.json"));
		store.save(&[job(JobState::Running, None)]).await.unwrap();

		let loaded = store.load().await.unwrap();
		assert_eq!(loaded[0].state, JobState::Queued);
	}

	#[test]
	fn purge_stale_drops_old_terminal_jobs_but_keeps_recent_ones() {
		let now = Utc::now();
		let old = job(JobState::Completed, Some(now - chrono::Duration::hours(25)));
		let recent = job(JobState::Completed, Some(now - chrono::Duration::hours(1)));
		let active = job(JobState::Queued, None);

		let kept = JobStore::purge_stale(vec![old, recent.clone(), active.clone()], now, chrono::Duration::hours(24));
		let ids: Vec<_> = kept.iter().map(|j| j.job_id).collect();
		assert_eq!(ids, vec![recent.job_id, active.job_id]);
	}
}
