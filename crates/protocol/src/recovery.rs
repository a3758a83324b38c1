//! Shared recovery vocabulary (spec.md §3, §4.7). The classification and
//! strategy logic itself lives in `automation-recovery`; this crate only
//! carries the types that cross process/API boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error taxonomy (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	Network,
	Timeout,
	Authentication,
	PageLoad,
	ElementNotFound,
	FormSubmission,
	Scraping,
	BrowserCrash,
	Credential,
	Validation,
	Unknown,
}

impl ErrorKind {
	pub const ALL: [ErrorKind; 11] = [
		ErrorKind::Network,
		ErrorKind::Timeout,
		ErrorKind::Authentication,
		ErrorKind::PageLoad,
		ErrorKind::ElementNotFound,
		ErrorKind::FormSubmission,
		ErrorKind::Scraping,
		ErrorKind::BrowserCrash,
		ErrorKind::Credential,
		ErrorKind::Validation,
		ErrorKind::Unknown,
	];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryContext {
	pub error_id: Uuid,
	pub error_kind: ErrorKind,
	pub operation: String,
	pub session_id: Option<Uuid>,
	pub user_id: Option<Uuid>,
	pub job_id: Option<Uuid>,
	pub attempt_number: u32,
	pub timestamp: DateTime<Utc>,
	pub message: String,
	pub stack: Option<String>,
}
