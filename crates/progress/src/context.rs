//! Per-job context handed to whatever invokes C5/C6 (spec.md §2 "the worker
//! obtains a session... invokes C5 or C6... emits progress on C10").
//! Bundles the three things a long-running operation needs and nothing it
//! doesn't: who to report progress to, what job it's reporting for, and how
//! to notice it's been cancelled.

use std::sync::Arc;

use automation_protocol::progress::{Phase, ProgressEvent};
use uuid::Uuid;

use crate::bus::ProgressBus;
use crate::cancel::CancelToken;

#[derive(Clone)]
pub struct JobContext {
	pub job_id: Uuid,
	pub user_id: Uuid,
	pub cancel: CancelToken,
	bus: Arc<ProgressBus>,
}

impl JobContext {
	pub fn new(job_id: Uuid, user_id: Uuid, cancel: CancelToken, bus: Arc<ProgressBus>) -> Self {
		Self { job_id, user_id, cancel, bus }
	}

	pub fn emit(&self, phase: &str, percentage: u8, message: impl Into<String>) {
		let event = ProgressEvent::new(self.job_id, Phase::new(phase), percentage, message);
		self.bus.publish(self.user_id, event);
	}

	pub fn emit_error(&self, phase: &str, percentage: u8, message: impl Into<String>, error: impl Into<String>) {
		let event = ProgressEvent::new(self.job_id, Phase::new(phase), percentage, message).with_error(error);
		self.bus.publish(self.user_id, event);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}
}
