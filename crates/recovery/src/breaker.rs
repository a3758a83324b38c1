//! Circuit breaker keyed by `(error_kind, operation)` (spec.md §4.7).
//!
//! Grounded on `cyrup-ai-kodegen-tools-citescrape::crawl_engine::circuit_breaker`,
//! adapted from its per-domain `DashMap` to a `parking_lot::Mutex<HashMap<..>>`
//! to match this workspace's shared-state convention ([`automation-runtime`]'s
//! session map, the teacher's `handlers.rs`).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use automation_protocol::recovery::ErrorKind;
use parking_lot::Mutex;

use crate::OperationKind;

const FAILURE_THRESHOLD: u32 = 10;
const REOPEN_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
	Closed,
	Open,
	HalfOpen,
}

#[derive(Debug, Clone)]
struct BreakerEntry {
	consecutive_failures: u32,
	state: CircuitState,
	opened_at: Option<Instant>,
}

impl Default for BreakerEntry {
	fn default() -> Self {
		Self {
			consecutive_failures: 0,
			state: CircuitState::Closed,
			opened_at: None,
		}
	}
}

#[derive(Default)]
pub struct CircuitBreaker {
	entries: Mutex<HashMap<(ErrorKind, OperationKind), BreakerEntry>>,
}

impl CircuitBreaker {
	pub fn new() -> Self {
		Self::default()
	}

	/// `false` means short-circuit to `escalate_manual` without attempting
	/// the operation (spec.md §4.7).
	pub fn should_attempt(&self, kind: ErrorKind, operation: OperationKind) -> bool {
		let mut entries = self.entries.lock();
		let entry = entries.entry((kind, operation)).or_default();
		match entry.state {
			CircuitState::Closed | CircuitState::HalfOpen => true,
			CircuitState::Open => {
				let reopened = entry.opened_at.is_some_and(|t| t.elapsed() >= REOPEN_WINDOW);
				if reopened {
					entry.state = CircuitState::HalfOpen;
					true
				} else {
					false
				}
			}
		}
	}

	pub fn record_success(&self, kind: ErrorKind, operation: OperationKind) {
		let mut entries = self.entries.lock();
		let entry = entries.entry((kind, operation)).or_default();
		entry.consecutive_failures = 0;
		entry.state = CircuitState::Closed;
		entry.opened_at = None;
	}

	pub fn record_failure(&self, kind: ErrorKind, operation: OperationKind) {
		let mut entries = self.entries.lock();
		let entry = entries.entry((kind, operation)).or_default();
		entry.consecutive_failures += 1;
		if entry.consecutive_failures >= FAILURE_THRESHOLD && entry.state != CircuitState::Open {
			entry.state = CircuitState::Open;
			entry.opened_at = Some(Instant::now());
		}
	}

	pub fn state_of(&self, kind: ErrorKind, operation: OperationKind) -> CircuitState {
		self.entries.lock().get(&(kind, operation)).map(|e| e.state).unwrap_or(CircuitState::Closed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn opens_after_ten_consecutive_failures() {
		let breaker = CircuitBreaker::new();
		for _ in 0..9 {
			breaker.record_failure(ErrorKind::Network, "login");
			assert!(breaker.should_attempt(ErrorKind::Network, "login"));
		}
		breaker.record_failure(ErrorKind::Network, "login");
		assert!(!breaker.should_attempt(ErrorKind::Network, "login"));
		assert_eq!(breaker.state_of(ErrorKind::Network, "login"), CircuitState::Open);
	}

	#[test]
	fn success_resets_the_failure_count() {
		let breaker = CircuitBreaker::new();
		for _ in 0..5 {
			breaker.record_failure(ErrorKind::Timeout, "navigate");
		}
		breaker.record_success(ErrorKind::Timeout, "navigate");
		assert_eq!(breaker.state_of(ErrorKind::Timeout, "navigate"), CircuitState::Closed);
	}

	#[test]
	fn different_operations_have_independent_breakers() {
		let breaker = CircuitBreaker::new();
		for _ in 0..10 {
			breaker.record_failure(ErrorKind::Network, "login");
		}
		assert!(!breaker.should_attempt(ErrorKind::Network, "login"));
		assert!(breaker.should_attempt(ErrorKind::Network, "navigate"));
	}
}
