use automation_protocol::work_order::WorkOrderStatus;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct WorkOrderFilters {
	pub start_date: Option<DateTime<Utc>>,
	pub end_date: Option<DateTime<Utc>>,
	pub status: Option<WorkOrderStatus>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
	pub skip: u64,
	pub limit: u64,
}

impl Default for Pagination {
	fn default() -> Self {
		Self { skip: 0, limit: 50 }
	}
}

/// One entry of `GET /credentials` style listings — service name plus the
/// non-secret metadata (spec.md §4.10 `list_user_credentials`).
#[derive(Debug, Clone)]
pub struct CredentialListing {
	pub service: String,
	pub username: String,
	pub created_at: DateTime<Utc>,
}

/// Per-user browser preferences (spec.md §4.10 `get_user_browser_settings`).
#[derive(Debug, Clone, Copy)]
pub struct BrowserSettings {
	pub headless: bool,
	pub viewport_width: u32,
	pub viewport_height: u32,
}

impl Default for BrowserSettings {
	fn default() -> Self {
		Self {
			headless: true,
			viewport_width: 1366,
			viewport_height: 768,
		}
	}
}
