//! List extraction (spec.md §4.4.1): work-order list view → ordered
//! `WorkOrder` records.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use automation_protocol::work_order::{Address, ServiceCode, WorkOrder, WorkOrderStatus};

use crate::driver::TargetSiteDriver;
use crate::error::Result;

/// Ordered structural patterns tried against the list page (spec.md
/// §4.4.1 step 1). The first pattern yielding `>=1` rows containing a
/// recognizable work-order identifier wins; earlier patterns are more
/// specific (and thus preferred) to a plain table row.
const ROW_PATTERNS: &[&str] = &[
	"[class*='work-order-row'], [class*='workorder-row']",
	"table tbody tr",
	"[class*='card']",
];

static WORK_ORDER_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"W-\d+").unwrap());
static SERVICE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(2861|2862|3146|3002)\b").unwrap());
static STREET_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"\d+\s+[A-Za-z0-9.'\s]+?\b(?:St|Ave|Rd|Blvd|Dr|Ln|Way|Hwy|Street|Avenue|Road|Boulevard|Drive|Lane)\b\.?").unwrap()
});
/// Street-address false positives: a work-order identifier's numeric
/// prefix followed by a service keyword (spec.md §4.4.1 step 2, testable
/// property 4).
static STREET_FALSE_POSITIVE_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^\d{5,}\D{0,4}\b(Meter|Calibration|Service|Inspection|Quality|Test)\b").unwrap());
static CITY_STATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z .]*,\s*[A-Z]{2}\b").unwrap());
static COUNTY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)county:\s*([A-Za-z .]+)").unwrap());
static STORE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)store\s*#?:?\s*(\w+)").unwrap());
static CREATED_BY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)created\s*by:\s*([A-Za-z .]+)").unwrap());
static DATE_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?i)(?:next visit|scheduled)\s*:?\s*(\d{1,2}/\d{1,2}(?:/\d{2,4})?)").unwrap());

/// Result of a list scrape. `diagnostics` is populated only when no rows
/// matched at all (spec.md §4.4.1: "list-level failures... return an empty
/// result and a structured diagnostic").
#[derive(Debug, Default)]
pub struct ListExtraction {
	pub work_orders: Vec<WorkOrder>,
	pub diagnostics: Option<ListDiagnostics>,
}

#[derive(Debug)]
pub struct ListDiagnostics {
	pub url: String,
	pub page_title: String,
	pub element_counts: Vec<(String, usize)>,
}

/// Extracts every work order row from the list page the driver is
/// currently positioned on (spec.md §4.4.1).
pub async fn extract_list(driver: &dyn TargetSiteDriver, user_id: Uuid) -> Result<ListExtraction> {
	let page = driver.page();
	let mut element_counts = Vec::with_capacity(ROW_PATTERNS.len());
	let mut winning_rows = None;

	for pattern in ROW_PATTERNS {
		let candidates = page.find_elements(pattern).await.unwrap_or_default();
		let mut matched = Vec::new();
		for candidate in candidates {
			let text = candidate.inner_text().await.ok().flatten().unwrap_or_default();
			if WORK_ORDER_ID_RE.is_match(&text) {
				matched.push((candidate, text));
			}
		}
		element_counts.push(((*pattern).to_string(), matched.len()));
		if !matched.is_empty() {
			winning_rows = Some(matched);
			break;
		}
	}

	let Some(rows) = winning_rows else {
		let url = page.url().await.ok().flatten().unwrap_or_default();
		let page_title = page
			.evaluate("document.title")
			.await
			.ok()
			.and_then(|v| v.into_value::<String>().ok())
			.unwrap_or_default();
		return Ok(ListExtraction {
			work_orders: Vec::new(),
			diagnostics: Some(ListDiagnostics { url, page_title, element_counts }),
		});
	};

	let mut work_orders = Vec::with_capacity(rows.len());
	for (row, text) in rows {
		let mut anchors_visit = None;
		let mut anchors_customer = None;
		for anchor in row.find_elements("a").await.unwrap_or_default() {
			let Ok(Some(href)) = anchor.attribute("href").await else { continue };
			let is_customer = href.contains("/customers/locations/");
			if href.contains("/visits/") && !is_customer {
				anchors_visit.get_or_insert(href.clone());
			}
			if is_customer {
				anchors_customer.get_or_insert(href);
			}
		}

		match parse_row(&text, user_id, anchors_visit, anchors_customer) {
			Some(wo) => work_orders.push(wo),
			// Row-level parse failure (e.g. no work-order id after all, or
			// corrupt text) is logged and skipped, not fatal to the scrape
			// (spec.md §4.4.1 failure semantics).
			None => tracing::warn!(row_text = %text, "skipping unparseable list row"),
		}
	}

	Ok(ListExtraction { work_orders, diagnostics: None })
}

fn parse_row(
	text: &str,
	user_id: Uuid,
	visit_url: Option<String>,
	customer_url: Option<String>,
) -> Option<WorkOrder> {
	let external_id = WORK_ORDER_ID_RE.find(text)?.as_str().to_string();
	let now = Utc::now();

	let service_code = SERVICE_CODE_RE.captures(text).and_then(|c| ServiceCode::parse(&c[1]));
	let service_items = service_code.map(|_| vec!["AccuMeasure Calibration".to_string()]).unwrap_or_default();

	let street = extract_street(text).unwrap_or_default();
	let city_state = CITY_STATE_RE.find(text).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
	let county = COUNTY_RE.captures(text).map(|c| c[1].trim().to_string());

	let store_number = STORE_NUMBER_RE.captures(text).map(|c| c[1].to_string());
	let created_by = CREATED_BY_RE.captures(text).map(|c| c[1].trim().to_string());
	let scheduled_date = extract_scheduled_date(text, now);

	let site_name = text.lines().next().unwrap_or_default().trim().to_string();

	Some(WorkOrder {
		id: Uuid::new_v4(),
		external_id,
		user_id,
		site_name,
		address: Address { street, city_state, county },
		store_number,
		service_code,
		service_items,
		scheduled_date,
		status: WorkOrderStatus::Pending,
		visit_url,
		customer_url,
		instructions: None,
		created_by,
		created_at: now,
		updated_at: now,
	})
}

/// Extracts a street address, rejecting work-order-identifier false
/// positives (spec.md §4.4.1 step 2, testable property 4).
fn extract_street(text: &str) -> Option<String> {
	STREET_RE
		.find_iter(text)
		.map(|m| m.as_str().trim().to_string())
		.find(|candidate| !STREET_FALSE_POSITIVE_RE.is_match(candidate))
}

/// Parses a `NEXT VISIT`/`Scheduled:` date, defaulting an absent year to
/// the current year (spec.md §4.4.1 step 4).
fn extract_scheduled_date(text: &str, now: chrono::DateTime<Utc>) -> Option<chrono::DateTime<Utc>> {
	let raw = &DATE_RE.captures(text)?[1];
	let parts: Vec<&str> = raw.split('/').collect();
	let (month, day, year) = match parts.as_slice() {
		[m, d] => (m.parse().ok()?, d.parse().ok()?, now.year()),
		[m, d, y] => {
			let year: i32 = y.parse().ok()?;
			(m.parse().ok()?, d.parse().ok()?, if year < 100 { 2000 + year } else { year })
		}
		_ => return None,
	};
	let date = NaiveDate::from_ymd_opt(year, month, day)?;
	Utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_work_order_id_and_service_code() {
		let text = "W-100001\n123 Main St, Austin, TX\nMeter Quality Calibration 2861";
		let wo = parse_row(text, Uuid::nil(), None, None).unwrap();
		assert_eq!(wo.external_id, "W-100001");
		assert_eq!(wo.service_code, ServiceCode::parse("2861"));
	}

	#[test]
	fn rejects_street_false_positive_from_work_order_identifier() {
		let text = "W-100001\n100001 Meter Quality Calibration Drive\n456 Oak Ave, Dallas, TX";
		let wo = parse_row(text, Uuid::nil(), None, None).unwrap();
		assert_eq!(wo.address.street, "456 Oak Ave");
	}

	#[test]
	fn scheduled_date_defaults_absent_year_to_current_year() {
		let now = Utc::now();
		let text = "W-100002\nScheduled: 03/15";
		let date = extract_scheduled_date(text, now).unwrap();
		assert_eq!(date.year(), now.year());
		assert_eq!(date.month(), 3);
		assert_eq!(date.day(), 15);
	}

	#[test]
	fn row_without_a_work_order_id_does_not_parse() {
		assert!(parse_row("Header Row\nStatus", Uuid::nil(), None, None).is_none());
	}
}
