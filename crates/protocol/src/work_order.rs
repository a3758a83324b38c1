//! Work-order domain type (spec.md §3) and its street-address component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Four-digit work-type code. Only these trigger dispenser-detail scraping
/// (spec.md GLOSSARY, §4.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCode {
	#[serde(rename = "2861")]
	Code2861,
	#[serde(rename = "2862")]
	Code2862,
	#[serde(rename = "3146")]
	Code3146,
	#[serde(rename = "3002")]
	Code3002,
}

impl ServiceCode {
	/// Parses a service code from the raw digits scraped from a row. Unknown
	/// codes are not an error at this layer — the scraper still records the
	/// work order, it simply will not be eligible for dispenser scraping.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"2861" => Some(Self::Code2861),
			"2862" => Some(Self::Code2862),
			"3146" => Some(Self::Code3146),
			"3002" => Some(Self::Code3002),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Code2861 => "2861",
			Self::Code2862 => "2862",
			Self::Code3146 => "3146",
			Self::Code3002 => "3002",
		}
	}

	/// Whether this code triggers dispenser-detail scraping (spec.md GLOSSARY).
	pub fn triggers_dispenser_scrape(self) -> bool {
		true
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
	pub street: String,
	pub city_state: String,
	pub county: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
	Pending,
	InProgress,
	Completed,
	Failed,
	Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
	pub id: Uuid,
	/// Target-site identifier, e.g. `W-100001`. Unique per user (spec.md §3).
	pub external_id: String,
	pub user_id: Uuid,
	pub site_name: String,
	pub address: Address,
	pub store_number: Option<String>,
	pub service_code: Option<ServiceCode>,
	pub service_items: Vec<String>,
	pub scheduled_date: Option<DateTime<Utc>>,
	pub status: WorkOrderStatus,
	/// Path must contain `/visits/` and must not contain `/customers/locations/`.
	pub visit_url: Option<String>,
	/// Path must contain `/customers/locations/`.
	pub customer_url: Option<String>,
	pub instructions: Option<String>,
	pub created_by: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl WorkOrder {
	/// Validates the URL-discrimination invariant (spec.md §8 property 3).
	pub fn urls_are_discriminated(&self) -> bool {
		let visit_ok = self
			.visit_url
			.as_deref()
			.is_none_or(|u| u.contains("/visits/") && !u.contains("/customers/locations/"));
		let customer_ok = self
			.customer_url
			.as_deref()
			.is_none_or(|u| u.contains("/customers/locations/"));
		visit_ok && customer_ok
	}
}

/// Append-only scrape run record (spec.md §6 "Persisted state").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingHistoryRecord {
	pub user_id: Uuid,
	pub schedule_type: String,
	pub started: DateTime<Utc>,
	pub completed: Option<DateTime<Utc>>,
	pub success: bool,
	pub items_scraped: u32,
	pub items_updated: u32,
	pub items_deleted: u32,
	pub error_message: Option<String>,
	pub duration_ms: Option<u64>,
	pub trigger_type: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn work_order(visit: Option<&str>, customer: Option<&str>) -> WorkOrder {
		WorkOrder {
			id: Uuid::nil(),
			external_id: "W-100001".into(),
			user_id: Uuid::nil(),
			site_name: "Test Site".into(),
			address: Address {
				street: "123 Main St".into(),
				city_state: "Austin, TX".into(),
				county: None,
			},
			store_number: None,
			service_code: ServiceCode::parse("2861"),
			service_items: vec![],
			scheduled_date: None,
			status: WorkOrderStatus::Pending,
			visit_url: visit.map(str::to_string),
			customer_url: customer.map(str::to_string),
			instructions: None,
			created_by: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn visit_and_customer_urls_discriminate() {
		let wo = work_order(
			Some("https://site.example/visits/55501"),
			Some("https://site.example/customers/locations/9"),
		);
		assert!(wo.urls_are_discriminated());
	}

	#[test]
	fn visit_url_containing_customer_path_is_rejected() {
		let wo = work_order(Some("https://site.example/customers/locations/9"), None);
		assert!(!wo.urls_are_discriminated());
	}

	#[test]
	fn service_code_parses_known_codes_only() {
		assert!(ServiceCode::parse("2861").is_some());
		assert!(ServiceCode::parse("9999").is_none());
	}
}
