//! Error Classifier & Recovery (C7): static strategy table, circuit breaker,
//! and per-kind statistics (spec.md §4.7).

mod breaker;
mod classify;
mod stats;
mod strategy;

pub use breaker::{CircuitBreaker, CircuitState};
pub use classify::classify;
pub use stats::{KindActionStats, RecoveryStats};
pub use strategy::{RecoveryAction, StrategyEntry, strategy_for};

use std::future::Future;
use std::time::Duration;

use automation_protocol::recovery::ErrorKind;
use tracing::warn;

/// Operation identifier for circuit-breaker keying, e.g. `"login"` or
/// `"scrape_list"` (spec.md §4.7: "keyed by `(error_kind, operation_kind)`").
pub type OperationKind = &'static str;

/// Outcome of a fully-exhausted recovery attempt.
#[derive(Debug)]
pub enum RecoveryOutcome<E> {
	/// All retries (including a retrying fallback action) were exhausted.
	Exhausted(E),
	/// The circuit breaker was open for this `(kind, operation)` pair.
	CircuitOpen,
	/// The strategy (or its fallback) says to abort outright.
	Aborted(E),
	/// The strategy (or its fallback) says to escalate to a human.
	EscalateManual(E),
	/// The strategy's fallback is `skip_and_continue`: mark this item failed
	/// and let the caller proceed with the rest of the batch.
	Skipped(E),
}

/// Coordinates classification, retry, and circuit breaking for one
/// `(error_kind, operation)` scope. One instance is shared across a process
/// (spec.md §4.7's breaker and statistics are process-wide).
#[derive(Default)]
pub struct Recovery {
	breaker: CircuitBreaker,
	stats: RecoveryStats,
}

impl Recovery {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn stats(&self) -> &RecoveryStats {
		&self.stats
	}

	pub fn breaker(&self) -> &CircuitBreaker {
		&self.breaker
	}

	/// Runs `attempt` according to the strategy table for `kind`, retrying
	/// with the configured backoff, then falling back to the documented
	/// fallback action if the primary strategy exhausts (spec.md §4.7). Short
	/// circuits to [`RecoveryOutcome::CircuitOpen`] if the breaker for
	/// `(kind, operation)` is open.
	pub async fn recover<T, E, F, Fut>(
		&self,
		operation: OperationKind,
		kind: ErrorKind,
		mut attempt: F,
	) -> Result<T, RecoveryOutcome<E>>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		if !self.breaker.should_attempt(kind, operation) {
			return Err(RecoveryOutcome::CircuitOpen);
		}

		let primary = strategy_for(kind);
		let primary_result = self.run_strategy(operation, kind, &primary, &mut attempt).await;
		let Err(last_err) = primary_result else {
			self.breaker.record_success(kind, operation);
			return Ok(primary_result.ok().expect("checked Ok above"));
		};

		// Primary strategy exhausted; fall through to the documented fallback.
		let Some((fallback_action, fallback_attempts)) = primary.fallback else {
			self.breaker.record_failure(kind, operation);
			return match primary.action {
				RecoveryAction::Abort => Err(RecoveryOutcome::Aborted(last_err)),
				RecoveryAction::EscalateManual => Err(RecoveryOutcome::EscalateManual(last_err)),
				_ => Err(RecoveryOutcome::Exhausted(last_err)),
			};
		};

		match fallback_action {
			// Terminal fallbacks never re-invoke the operation; they just
			// classify how the caller should treat the already-exhausted result.
			RecoveryAction::Abort => {
				self.breaker.record_failure(kind, operation);
				Err(RecoveryOutcome::Aborted(last_err))
			}
			RecoveryAction::EscalateManual => {
				self.breaker.record_failure(kind, operation);
				Err(RecoveryOutcome::EscalateManual(last_err))
			}
			RecoveryAction::SkipAndContinue => {
				self.breaker.record_failure(kind, operation);
				Err(RecoveryOutcome::Skipped(last_err))
			}
			_ => {
				let fallback = StrategyEntry {
					action: fallback_action,
					max_attempts: fallback_attempts,
					base_delay: primary.base_delay,
					exponential_backoff: false,
					fallback: None,
				};
				match self.run_strategy(operation, kind, &fallback, &mut attempt).await {
					Ok(value) => {
						self.breaker.record_success(kind, operation);
						Ok(value)
					}
					Err(err) => {
						self.breaker.record_failure(kind, operation);
						Err(RecoveryOutcome::Exhausted(err))
					}
				}
			}
		}
	}

	async fn run_strategy<T, E, F, Fut>(
		&self,
		operation: OperationKind,
		kind: ErrorKind,
		entry: &StrategyEntry,
		attempt: &mut F,
	) -> Result<T, E>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let mut last_err = None;
		for n in 0..entry.max_attempts {
			self.stats.record_attempt(kind, entry.action);
			match attempt().await {
				Ok(value) => {
					self.stats.record_success(kind, entry.action);
					return Ok(value);
				}
				Err(e) => {
					self.stats.record_failure(kind, entry.action, &format!("{operation} attempt {n}"));
					if n + 1 < entry.max_attempts {
						let delay = if entry.exponential_backoff {
							entry.base_delay * 2u32.pow(n)
						} else {
							entry.base_delay
						};
						if delay > Duration::ZERO {
							tokio::time::sleep(delay).await;
						}
					}
					last_err = Some(e);
				}
			}
		}
		warn!(operation, ?kind, "recovery strategy exhausted");
		Err(last_err.expect("loop runs at least once since max_attempts >= 1"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[tokio::test]
	async fn succeeds_without_retry_when_first_attempt_works() {
		let recovery = Recovery::new();
		let result = recovery
			.recover::<_, &str, _, _>("op", ErrorKind::Network, || async { Ok::<_, &str>(42) })
			.await;
		assert!(matches!(result, Ok(42)));
	}

	#[tokio::test]
	async fn retries_up_to_max_attempts_then_falls_back() {
		let recovery = Recovery::new();
		let calls = AtomicU32::new(0);
		let result = recovery
			.recover::<(), &str, _, _>(OP, ErrorKind::Authentication, || {
				calls.fetch_add(1, Ordering::SeqCst);
				async { Err("fails every time") }
			})
			.await;
		assert!(matches!(result, Err(RecoveryOutcome::EscalateManual(_))));
		// authentication: 2 primary attempts + 1 fallback (escalate_manual has max_attempts 1, no delay)
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	const OP: OperationKind = "login";
}
