//! WebSocket frame shapes pushed over `/automation/ws/{token}` (spec.md §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsFrameType {
	AutomationProgress,
	EnhancedScrapingProgress,
	ScrapingProgress,
	FormAutomationProgress,
	BatchAutomationProgress,
	AutomationComplete,
	AutomationError,
	QueueEvent,
	Pong,
}

/// `{type, data}` envelope. `data` carries `{job_id, phase, percentage,
/// message, timestamp, ...kind-specific}` — represented as `Value` here
/// since its shape genuinely varies by `type` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFrame {
	#[serde(rename = "type")]
	pub kind: WsFrameType,
	pub data: Value,
}

impl WsFrame {
	pub fn new(kind: WsFrameType, data: Value) -> Self {
		Self { kind, data }
	}

	pub fn pong() -> Self {
		Self::new(WsFrameType::Pong, Value::Null)
	}
}
