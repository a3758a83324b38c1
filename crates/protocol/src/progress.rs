//! Progress event published by the Progress Bus (spec.md §3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase name used across the form-engine (§4.5) and scraper (§4.4)
/// pipelines. Wraps a plain string on the wire (rather than a closed Rust
/// enum) so API consumers see flat JSON (`"phase": "form_filling"`) and new
/// phases stay purely additive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phase(pub String);

impl Phase {
	pub const INITIALIZING: &'static str = "initializing";
	pub const LOGIN: &'static str = "login";
	pub const NAVIGATION: &'static str = "navigation";
	pub const FORM_DETECTION: &'static str = "form_detection";
	pub const FORM_PREPARATION: &'static str = "form_preparation";
	pub const FORM_FILLING: &'static str = "form_filling";
	pub const DISPENSER_AUTOMATION: &'static str = "dispenser_automation";
	pub const VALIDATION: &'static str = "validation";
	pub const COMPLETION: &'static str = "completion";
	pub const SCRAPING: &'static str = "scraping";
	pub const ERROR: &'static str = "error";

	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}
}

impl From<&str> for Phase {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
	pub job_id: Uuid,
	pub phase: Phase,
	/// 0..=100.
	pub percentage: u8,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dispenser_id: Option<Uuid>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
	pub fn new(job_id: Uuid, phase: Phase, percentage: u8, message: impl Into<String>) -> Self {
		Self {
			job_id,
			phase,
			percentage: percentage.min(100),
			message: message.into(),
			dispenser_id: None,
			error: None,
			timestamp: Utc::now(),
		}
	}

	pub fn with_error(mut self, error: impl Into<String>) -> Self {
		self.error = Some(error.into());
		self
	}

	pub fn with_dispenser(mut self, dispenser_id: Uuid) -> Self {
		self.dispenser_id = Some(dispenser_id);
		self
	}
}
