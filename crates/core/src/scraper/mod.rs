//! Scraper (C5): drives [`TargetSiteDriver`] through a full list scrape,
//! dispenser extraction, and store reconciliation (spec.md §4.4).

mod dispenser;
mod list;
mod reconcile;

pub use dispenser::extract_dispensers;
pub use list::{extract_list, ListDiagnostics, ListExtraction};
pub use reconcile::{reconcile, ReconcileStats};

use automation_protocol::progress::Phase;
use automation_protocol::ScrapingHistoryRecord;
use automation_progress::JobContext;
use automation_repository::{Repository, WorkOrderFilters};
use chrono::Utc;

use crate::driver::{ListFilter, TargetSiteDriver};
use crate::error::{CoreError, Result};

/// Full scrape run: list → (conditionally) dispenser detail → reconcile.
/// Emits progress through `ctx` at each phase and records one
/// `ScrapingHistoryRecord` regardless of outcome (spec.md §6).
pub async fn run_scrape(
	driver: &dyn TargetSiteDriver,
	repo: &dyn Repository,
	ctx: &JobContext,
	trigger_type: &str,
) -> Result<ReconcileStats> {
	let started = Utc::now();
	ctx.emit(Phase::SCRAPING, 10, "loading work order list");

	driver.go_to_list(ListFilter { no_visits_completed: true }).await?;
	let _ = driver.set_page_size(100).await;

	let extraction = extract_list(driver, ctx.user_id).await?;
	if let Some(diag) = &extraction.diagnostics {
		tracing::warn!(url = %diag.url, page_title = %diag.page_title, "list scrape found no rows");
	}

	let mut scraped = extraction.work_orders;
	let total = scraped.len();
	ctx.emit(Phase::SCRAPING, 40, format!("found {total} work orders"));

	for (i, work_order) in scraped.iter_mut().enumerate() {
		if ctx.is_cancelled() {
			return Err(CoreError::Scraping("cancelled".into()));
		}
		let Some(service_code) = work_order.service_code else { continue };
		if !service_code.triggers_dispenser_scrape() {
			continue;
		}
		let Some(customer_url) = work_order.customer_url.clone() else { continue };

		let pct = 40 + (((i + 1) * 40) / total.max(1)) as u8;
		ctx.emit(Phase::SCRAPING, pct, format!("dispensers for {}", work_order.external_id));

		driver.go_to_customer(&customer_url).await?;
		match extract_dispensers(driver, work_order.id).await {
			Ok(dispensers) => repo.replace_dispensers_for(work_order.id, dispensers).await?,
			Err(e) => tracing::warn!(work_order = %work_order.external_id, error = %e, "dispenser scrape failed"),
		}
	}

	ctx.emit(Phase::SCRAPING, 85, "reconciling with stored work orders");
	let stats = reconcile(repo, ctx.user_id, WorkOrderFilters::default(), scraped).await?;

	let completed = Utc::now();
	repo.record_scraping_history(ScrapingHistoryRecord {
		user_id: ctx.user_id,
		schedule_type: trigger_type.to_string(),
		started,
		completed: Some(completed),
		success: true,
		items_scraped: stats.inserted + stats.updated,
		items_updated: stats.updated,
		items_deleted: stats.deleted,
		error_message: None,
		duration_ms: Some((completed - started).num_milliseconds().max(0) as u64),
		trigger_type: trigger_type.to_string(),
	})
	.await?;

	ctx.emit(Phase::COMPLETION, 100, "scrape complete");
	Ok(stats)
}
