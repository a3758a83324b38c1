//! Cooperative cancellation token shared between the Job Queue (C9, the
//! only thing that ever calls [`CancelToken::cancel`]) and the scraper/form
//! engine (C5, C6 — the only things that ever call
//! [`CancelToken::is_cancelled`]). Lives here rather than in either crate
//! because both already depend on `automation-progress` and neither should
//! depend on the other (SPEC_FULL §9 — a driver interface shared by the
//! scraper and the form engine, injected at construction, not a cyclic
//! reference between queue and core).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A long operation checks this between `.await` points (spec.md §5:
/// "Cancellation is cooperative; workers poll a cancel flag at each natural
/// boundary"). Cloning shares the same underlying flag.
#[derive(Clone, Default)]
pub struct CancelToken {
	cancelled: Arc<AtomicBool>,
	notify: Arc<Notify>,
}

impl CancelToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
		self.notify.notify_waiters();
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	/// Resolves once [`cancel`](Self::cancel) is called. Callers `select!`
	/// this against the operation they want to abort promptly rather than
	/// relying solely on the operation's own poll points.
	pub async fn cancelled(&self) {
		if self.is_cancelled() {
			return;
		}
		self.notify.notified().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn cancelled_future_resolves_immediately_if_already_cancelled() {
		let token = CancelToken::new();
		token.cancel();
		tokio::time::timeout(std::time::Duration::from_millis(50), token.cancelled())
			.await
			.expect("should resolve immediately");
	}

	#[tokio::test]
	async fn clones_observe_the_same_cancellation() {
		let token = CancelToken::new();
		let clone = token.clone();
		assert!(!clone.is_cancelled());
		token.cancel();
		assert!(clone.is_cancelled());
	}
}
