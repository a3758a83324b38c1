//! The static per-kind strategy table (spec.md §4.7).

use std::time::Duration;

use automation_protocol::recovery::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryAction {
	RetryImmediate,
	RetryWithDelay,
	RetryWithRefresh,
	RetryWithNewSession,
	RetryWithAlternative,
	SkipAndContinue,
	Abort,
	EscalateManual,
}

#[derive(Debug, Clone, Copy)]
pub struct StrategyEntry {
	pub action: RecoveryAction,
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub exponential_backoff: bool,
	/// `(action, max_attempts)` to fall back to once the primary strategy
	/// exhausts its own attempts.
	pub fallback: Option<(RecoveryAction, u32)>,
}

/// Looks up the fixed strategy for an error kind (spec.md §4.7 table).
pub fn strategy_for(kind: ErrorKind) -> StrategyEntry {
	use RecoveryAction::*;
	match kind {
		ErrorKind::Network => StrategyEntry {
			action: RetryWithDelay,
			max_attempts: 3,
			base_delay: Duration::from_secs(5),
			exponential_backoff: true,
			fallback: Some((RetryWithNewSession, 2)),
		},
		ErrorKind::Timeout => StrategyEntry {
			action: RetryWithRefresh,
			max_attempts: 2,
			base_delay: Duration::from_secs(3),
			exponential_backoff: false,
			fallback: Some((RetryWithNewSession, 1)),
		},
		ErrorKind::Authentication => StrategyEntry {
			action: RetryWithNewSession,
			max_attempts: 2,
			base_delay: Duration::from_secs(2),
			exponential_backoff: false,
			fallback: Some((EscalateManual, 1)),
		},
		ErrorKind::PageLoad => StrategyEntry {
			action: RetryWithRefresh,
			max_attempts: 3,
			base_delay: Duration::from_secs(2),
			exponential_backoff: true,
			fallback: Some((RetryWithAlternative, 2)),
		},
		ErrorKind::ElementNotFound => StrategyEntry {
			action: RetryWithDelay,
			max_attempts: 4,
			base_delay: Duration::from_secs(1),
			exponential_backoff: false,
			fallback: Some((RetryWithAlternative, 2)),
		},
		ErrorKind::FormSubmission => StrategyEntry {
			action: RetryWithRefresh,
			max_attempts: 2,
			base_delay: Duration::from_secs(3),
			exponential_backoff: false,
			fallback: Some((SkipAndContinue, 1)),
		},
		ErrorKind::Scraping => StrategyEntry {
			action: RetryWithAlternative,
			max_attempts: 3,
			base_delay: Duration::from_secs(2),
			exponential_backoff: false,
			fallback: Some((SkipAndContinue, 1)),
		},
		ErrorKind::BrowserCrash => StrategyEntry {
			action: RetryWithNewSession,
			max_attempts: 2,
			base_delay: Duration::from_secs(5),
			exponential_backoff: false,
			fallback: Some((Abort, 1)),
		},
		ErrorKind::Credential => StrategyEntry {
			action: EscalateManual,
			max_attempts: 1,
			base_delay: Duration::ZERO,
			exponential_backoff: false,
			fallback: None,
		},
		ErrorKind::Validation => StrategyEntry {
			action: Abort,
			max_attempts: 1,
			base_delay: Duration::ZERO,
			exponential_backoff: false,
			fallback: None,
		},
		ErrorKind::Unknown => StrategyEntry {
			action: RetryWithDelay,
			max_attempts: 2,
			base_delay: Duration::from_secs(3),
			exponential_backoff: false,
			fallback: Some((SkipAndContinue, 1)),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_error_kind_has_a_strategy_with_at_least_one_attempt() {
		for kind in ErrorKind::ALL {
			let entry = strategy_for(kind);
			assert!(entry.max_attempts >= 1, "{kind:?} must allow at least one attempt");
		}
	}

	#[test]
	fn network_backs_off_exponentially_with_a_new_session_fallback() {
		let entry = strategy_for(ErrorKind::Network);
		assert!(entry.exponential_backoff);
		assert_eq!(entry.fallback, Some((RecoveryAction::RetryWithNewSession, 2)));
	}
}
