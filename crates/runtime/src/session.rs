use std::fmt;

use chromiumoxide::Page;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Opaque handle identifying a session across process restarts within a
/// single run (sessions are not persisted — spec.md §1 places durability
/// out of scope for the browser layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for SessionId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Per-user browser session: an isolated context with exactly one page
/// (spec.md §4.2 — "session's logged-in invariant").
#[derive(Clone)]
pub struct Session {
	pub session_id: SessionId,
	pub user_id: Uuid,
	pub(crate) browser_context_id: chromiumoxide::cdp::browser_protocol::target::BrowserContextId,
	pub page: Page,
	pub logged_in: bool,
	pub created_at: DateTime<Utc>,
	pub last_used_at: DateTime<Utc>,
}

impl Session {
	pub fn touch(&mut self) {
		self.last_used_at = Utc::now();
	}

	pub fn is_idle_past(&self, ttl: chrono::Duration) -> bool {
		Utc::now() - self.last_used_at > ttl
	}
}

/// A cheap, `Send` handle to a session returned from the pool. Callers clone
/// the inner `Page` rather than holding the pool's lock across an `.await`.
pub type SessionHandle = Session;

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("session_id", &self.session_id)
			.field("user_id", &self.user_id)
			.field("logged_in", &self.logged_in)
			.finish()
	}
}
