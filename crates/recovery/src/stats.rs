//! Per-`(kind, action)` statistics with a bounded recent-errors ring buffer
//! (spec.md §4.7).

use std::collections::{HashMap, VecDeque};

use automation_protocol::recovery::ErrorKind;
use parking_lot::Mutex;

use crate::strategy::RecoveryAction;

const DEFAULT_RING_BUFFER_SIZE: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct KindActionStats {
	pub total_attempts: u64,
	pub successes: u64,
	pub failures: u64,
}

impl KindActionStats {
	pub fn success_rate(&self) -> f64 {
		if self.total_attempts == 0 {
			return 0.0;
		}
		self.successes as f64 / self.total_attempts as f64
	}
}

pub struct RecoveryStats {
	ring_buffer_size: usize,
	by_kind_action: Mutex<HashMap<(ErrorKind, RecoveryAction), KindActionStats>>,
	recent_errors: Mutex<VecDeque<String>>,
}

impl Default for RecoveryStats {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_RING_BUFFER_SIZE)
	}
}

impl RecoveryStats {
	pub fn with_capacity(ring_buffer_size: usize) -> Self {
		Self {
			ring_buffer_size,
			by_kind_action: Mutex::new(HashMap::new()),
			recent_errors: Mutex::new(VecDeque::with_capacity(ring_buffer_size)),
		}
	}

	pub fn record_attempt(&self, kind: ErrorKind, action: RecoveryAction) {
		self.by_kind_action.lock().entry((kind, action)).or_default().total_attempts += 1;
	}

	pub fn record_success(&self, kind: ErrorKind, action: RecoveryAction) {
		self.by_kind_action.lock().entry((kind, action)).or_default().successes += 1;
	}

	pub fn record_failure(&self, kind: ErrorKind, action: RecoveryAction, detail: &str) {
		self.by_kind_action.lock().entry((kind, action)).or_default().failures += 1;

		let mut recent = self.recent_errors.lock();
		if recent.len() >= self.ring_buffer_size {
			recent.pop_front();
		}
		recent.push_back(detail.to_string());
	}

	pub fn for_kind_action(&self, kind: ErrorKind, action: RecoveryAction) -> KindActionStats {
		self.by_kind_action.lock().get(&(kind, action)).cloned().unwrap_or_default()
	}

	pub fn recent_errors(&self) -> Vec<String> {
		self.recent_errors.lock().iter().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ring_buffer_drops_oldest_past_capacity() {
		let stats = RecoveryStats::with_capacity(3);
		for i in 0..5 {
			stats.record_failure(ErrorKind::Network, RecoveryAction::RetryWithDelay, &format!("err-{i}"));
		}
		let recent = stats.recent_errors();
		assert_eq!(recent.len(), 3);
		assert_eq!(recent, vec!["err-2", "err-3", "err-4"]);
	}

	#[test]
	fn success_rate_divides_successes_by_attempts() {
		let stats = RecoveryStats::default();
		stats.record_attempt(ErrorKind::Timeout, RecoveryAction::RetryWithRefresh);
		stats.record_attempt(ErrorKind::Timeout, RecoveryAction::RetryWithRefresh);
		stats.record_success(ErrorKind::Timeout, RecoveryAction::RetryWithRefresh);
		let entry = stats.for_kind_action(ErrorKind::Timeout, RecoveryAction::RetryWithRefresh);
		assert_eq!(entry.success_rate(), 0.5);
	}
}
