//! Dispenser detail extraction (spec.md §4.4.2): customer/equipment page →
//! `Dispenser` records for a work order whose service code requires it.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use automation_protocol::dispenser::{canonicalize_grades, Dispenser, KNOWN_MANUFACTURERS};

use crate::driver::TargetSiteDriver;
use crate::error::{CoreError, Result};

const EQUIPMENT_TAB_SELECTOR: &str = "[data-testid='equipment-tab'], .equipment-tab";
const DISPENSER_SECTION_SELECTOR: &str = "[class*='dispenser-section'], [data-testid*='dispenser']";
const DETAIL_WAIT: Duration = Duration::from_secs(5);
const DETAIL_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// `<number>[/<number>] - <grades, comma separated> - <make>`. The make
/// segment is optional (spec.md §4.4.2 step 4).
static TITLE_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^\s*(\d+(?:/\d+)?)\s*-\s*([^-]+?)\s*(?:-\s*(.+))?\s*$").unwrap());
static SERIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)S/N:?\s*([A-Za-z0-9-]+)").unwrap());
static NOZZLES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)nozzles?:?\s*(\d+)").unwrap());
static METER_TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)meter\s*type:?\s*([A-Za-z0-9 ]+)").unwrap());
static STAND_ALONE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)stand\s*alone\s*code:?\s*(\w+)").unwrap());
static MODEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)model:?\s*([A-Za-z0-9 .-]+)").unwrap());
static MAKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)make:?\s*([A-Za-z0-9 .-]+)").unwrap());

/// Scrapes every dispenser row under the customer page's Equipment tab,
/// assumed already navigated to (the caller drives `go_to_customer` first —
/// spec.md §4.4.2 step 1).
pub async fn extract_dispensers(driver: &dyn TargetSiteDriver, work_order_id: Uuid) -> Result<Vec<Dispenser>> {
	let page = driver.page();

	if let Ok(tab) = page.find_element(EQUIPMENT_TAB_SELECTOR).await {
		let _ = tab.click().await;
	}
	wait_for(page, DISPENSER_SECTION_SELECTOR).await;

	let sections = page.find_elements(DISPENSER_SECTION_SELECTOR).await.unwrap_or_default();
	let mut dispensers = Vec::with_capacity(sections.len());

	for section in sections {
		// Sections render collapsed; expand before reading detail fields
		// (spec.md §4.4.2 step 2: "expand the Dispenser(N) section").
		if let Ok(header) = section.find_element("[class*='header'], summary, button").await {
			let _ = header.click().await;
		}

		let title = section
			.find_element("[class*='title'], h3, h4, summary")
			.await
			.ok();
		let title_text = match title {
			Some(el) => el.inner_text().await.ok().flatten(),
			None => None,
		};
		let body_text = section.inner_text().await.ok().flatten().unwrap_or_default();

		match parse_dispenser(work_order_id, title_text.as_deref(), &body_text) {
			Some(d) => dispensers.push(d),
			None => tracing::warn!(?work_order_id, "skipping unparseable dispenser section"),
		}
	}

	if dispensers.is_empty() {
		return Err(CoreError::Scraping(format!(
			"no dispenser sections found for work order {work_order_id}"
		)));
	}
	Ok(dispensers)
}

async fn wait_for(page: &chromiumoxide::Page, selector: &str) {
	let start = Instant::now();
	while start.elapsed() < DETAIL_WAIT {
		if page.find_element(selector).await.is_ok() {
			return;
		}
		tokio::time::sleep(DETAIL_POLL_INTERVAL).await;
	}
}

/// Parses one dispenser section, tolerating three degrading title shapes
/// (spec.md §4.4.2 step 4, testable property 5):
///   1. full: `1/2 - Regular, Plus, Diesel - Gilbarco`
///   2. no make: `1/2 - Regular, Plus, Diesel`
///   3. no title at all: only body-text labeled fields are trusted.
fn parse_dispenser(work_order_id: Uuid, title: Option<&str>, body: &str) -> Option<Dispenser> {
	let (number, numbers, grades_from_title, make_from_title) = match title.and_then(|t| TITLE_RE.captures(t)) {
		Some(caps) => {
			let number = caps[1].to_string();
			let numbers = number.split('/').map(str::to_string).collect();
			let grades = caps[2]
				.split(',')
				.map(|g| g.trim().to_string())
				.filter(|g| !g.is_empty())
				.collect::<Vec<_>>();
			let make = caps.get(3).map(|m| m.as_str().trim().to_string());
			(number, numbers, grades, make)
		}
		None => (String::new(), Vec::new(), Vec::new(), None),
	};

	if number.is_empty() && grades_from_title.is_empty() && body.trim().is_empty() {
		return None;
	}

	let serial_number = SERIAL_RE.captures(body).map(|c| c[1].to_string());
	let nozzles = NOZZLES_RE.captures(body).and_then(|c| c[1].parse().ok());
	let meter_type = METER_TYPE_RE.captures(body).map(|c| c[1].trim().to_string());
	let stand_alone_code = STAND_ALONE_CODE_RE.captures(body).map(|c| c[1].to_string());
	let model = MODEL_RE.captures(body).map(|c| c[1].trim().to_string());

	let make = make_from_title.or_else(|| MAKE_RE.captures(body).map(|c| c[1].trim().to_string())).or_else(|| {
		// Strategy 3: recognize a known manufacturer name anywhere in the
		// section body (spec.md §4.4.2 step 5).
		KNOWN_MANUFACTURERS
			.iter()
			.find(|m| body.to_lowercase().contains(&m.to_lowercase()))
			.map(|m| m.to_string())
	});

	let fuel_grades = canonicalize_grades(grades_from_title);

	Some(Dispenser {
		id: Uuid::new_v4(),
		work_order_id,
		number,
		numbers,
		title: title.map(str::to_string),
		make,
		model,
		serial_number,
		nozzles,
		meter_type,
		stand_alone_code,
		fuel_grades,
		custom_fields: Default::default(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_full_title_with_make() {
		let d = parse_dispenser(Uuid::nil(), Some("1/2 - Regular, Plus, Diesel - Gilbarco"), "S/N: ABC123").unwrap();
		assert_eq!(d.number, "1/2");
		assert_eq!(d.numbers, vec!["1", "2"]);
		assert_eq!(d.fuel_grades, vec!["Regular", "Plus", "Diesel"]);
		assert_eq!(d.make.as_deref(), Some("Gilbarco"));
		assert_eq!(d.serial_number.as_deref(), Some("ABC123"));
	}

	#[test]
	fn parses_title_without_make_then_falls_back_to_body() {
		let d = parse_dispenser(Uuid::nil(), Some("3 - Regular, Premium"), "Make: Wayne\nModel: Ovation").unwrap();
		assert_eq!(d.number, "3");
		assert_eq!(d.make.as_deref(), Some("Wayne"));
		assert_eq!(d.model.as_deref(), Some("Ovation"));
	}

	#[test]
	fn recognizes_known_manufacturer_in_body_without_any_label() {
		let d = parse_dispenser(Uuid::nil(), None, "Unit details: Tokheim unit, S/N: XYZ999").unwrap();
		assert_eq!(d.make.as_deref(), Some("Tokheim"));
		assert_eq!(d.serial_number.as_deref(), Some("XYZ999"));
	}

	#[test]
	fn empty_section_does_not_parse() {
		assert!(parse_dispenser(Uuid::nil(), None, "").is_none());
	}

	#[test]
	fn extracts_stand_alone_code_via_labeled_regex() {
		let d = parse_dispenser(
			Uuid::nil(),
			Some("1/2 - Regular, Plus - Gilbarco"),
			"S/N: ABC123\nStand Alone Code: SA42",
		)
		.unwrap();
		assert_eq!(d.stand_alone_code.as_deref(), Some("SA42"));
	}
}
