//! Per-dispenser form-automation state machine (spec.md §4.5).

use chrono::Local;

use automation_progress::JobContext;
use automation_protocol::dispenser::Dispenser;
use automation_protocol::progress::Phase;

use crate::driver::TargetSiteDriver;
use crate::error::{CoreError, Result};

use super::templates::FormTemplate;

const EXISTING_ROW_SELECTOR_PREFIX: &str = "[data-dispenser-number]";
const ADD_NEW_SELECTOR: &str = "button[class*='add-new'], [data-testid='add-new-row']";
const GRADE_FIELD_PREFIX: &str = "select[name*='grade'], input[name*='grade']";
const DATE_FIELD_SELECTOR: &str = "input[name*='test_date'], input[type='date']";
const TIME_FIELD_SELECTOR: &str = "input[name*='test_time'], input[type='time']";
const TEMP_FIELD_SELECTOR: &str = "input[name*='temperature'], input[name*='temp']";
const VOLUME_FIELD_SELECTOR: &str = "input[name*='volume'], input[name*='gallons']";
const ERROR_FIELD_SELECTOR: &str = "input[name*='error']";
const SUBMIT_SELECTOR: &str = "button[type='submit'], [data-testid='submit-form']";

/// Standard test values the form is populated with absent a more specific
/// input (spec.md §4.5 step 4).
struct StandardDefaults {
	date: String,
	time: String,
	temperature_f: &'static str,
	volume_gal: &'static str,
	error_pct: &'static str,
}

impl StandardDefaults {
	fn now() -> Self {
		let now = Local::now();
		Self {
			date: now.format("%m/%d/%Y").to_string(),
			time: now.format("%H:%M").to_string(),
			temperature_f: "70",
			volume_gal: "5.00",
			error_pct: "0.00",
		}
	}
}

/// Drives one dispenser through the full form state machine, emitting a
/// progress event per phase. The failure branch (`ERROR`, spec.md §4.5) is
/// represented as an `Err` return rather than a distinct phase value —
/// callers learn the failing phase from the error message, which recovery
/// classification already keys off of.
pub async fn run_form(driver: &dyn TargetSiteDriver, ctx: &JobContext, dispenser: &Dispenser, visit_url: &str) -> Result<()> {
	ctx.emit(Phase::INITIALIZING, 0, format!("preparing dispenser {}", dispenser.number));

	ctx.emit(Phase::NAVIGATION, 10, "navigating to visit");
	driver.go_to_visit(visit_url).await?;

	ctx.emit(Phase::FORM_DETECTION, 25, "locating dispenser row");
	let row_selector = format!("{EXISTING_ROW_SELECTOR_PREFIX}[data-dispenser-number='{}']", dispenser.number);
	let row_exists = driver.page().find_element(&row_selector).await.is_ok();
	if !row_exists {
		let add_new = driver
			.page()
			.find_element(ADD_NEW_SELECTOR)
			.await
			.map_err(|e| CoreError::ElementNotFound(format!("add new row: {e}")))?;
		add_new.click().await.map_err(|e| CoreError::ElementNotFound(e.to_string()))?;
	}

	ctx.emit(Phase::FORM_PREPARATION, 40, "preparing grade fields");
	let template = FormTemplate::match_grades(&dispenser.fuel_grades);
	let fill_order = template.fill_order(&dispenser.fuel_grades);

	ctx.emit(Phase::FORM_FILLING, 55, "filling grade and standard fields");
	for (i, grade) in fill_order.iter().enumerate() {
		let selector = format!("{GRADE_FIELD_PREFIX}[data-grade-index='{i}']");
		if let Ok(field) = driver.page().find_element(&selector).await {
			let _ = field.click().await;
			let _ = field.type_str(grade).await;
		}
	}

	let defaults = StandardDefaults::now();
	fill_if_present(driver, DATE_FIELD_SELECTOR, &defaults.date).await;
	fill_if_present(driver, TIME_FIELD_SELECTOR, &defaults.time).await;
	fill_if_present(driver, TEMP_FIELD_SELECTOR, defaults.temperature_f).await;
	fill_if_present(driver, VOLUME_FIELD_SELECTOR, defaults.volume_gal).await;
	fill_if_present(driver, ERROR_FIELD_SELECTOR, defaults.error_pct).await;

	ctx.emit(Phase::DISPENSER_AUTOMATION, 75, format!("dispenser {} fields set", dispenser.number));

	ctx.emit(Phase::VALIDATION, 85, "submitting form");
	let submit = driver
		.page()
		.find_element(SUBMIT_SELECTOR)
		.await
		.map_err(|e| CoreError::FormSubmission(format!("submit button: {e}")))?;
	submit.click().await.map_err(|e| CoreError::FormSubmission(e.to_string()))?;
	let _ = tokio::time::timeout(std::time::Duration::from_secs(5), driver.page().wait_for_navigation()).await;

	ctx.emit(Phase::COMPLETION, 100, format!("dispenser {} complete", dispenser.number));
	Ok(())
}

async fn fill_if_present(driver: &dyn TargetSiteDriver, selector: &str, value: &str) {
	if let Ok(field) = driver.page().find_element(selector).await {
		let _ = field.click().await;
		let _ = field.type_str(value).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn standard_defaults_use_fixed_values() {
		let defaults = StandardDefaults::now();
		assert_eq!(defaults.temperature_f, "70");
		assert_eq!(defaults.volume_gal, "5.00");
		assert_eq!(defaults.error_pct, "0.00");
	}
}
