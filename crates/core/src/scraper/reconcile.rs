//! Reconciliation (spec.md §4.4.3): merges a fresh list scrape against the
//! store, deleting completed work orders, updating existing ones, and
//! inserting new ones.

use std::collections::{HashMap, HashSet};

use automation_protocol::WorkOrder;
use automation_repository::{Pagination, Repository, WorkOrderFilters};
use uuid::Uuid;

use crate::error::Result;

/// Outcome counts, mirrored straight into `ScrapingHistoryRecord` by the
/// caller (spec.md §6 "Persisted state").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
	pub inserted: u32,
	pub updated: u32,
	pub deleted: u32,
}

/// Reconciles `scraped` against the store for `user_id`, scoped to `filters`
/// (spec.md §4.4.3, scope guard per SPEC_FULL §4.4: only work orders that
/// fall within the scrape's own declared scope are eligible for deletion —
/// a work order the scrape never looked at is left untouched rather than
/// treated as completed).
pub async fn reconcile(
	repo: &dyn Repository,
	user_id: Uuid,
	filters: WorkOrderFilters,
	scraped: Vec<WorkOrder>,
) -> Result<ReconcileStats> {
	let scraped_ids: HashSet<&str> = scraped.iter().map(|w| w.external_id.as_str()).collect();

	let mut stats = ReconcileStats::default();
	let mut existing_by_external_id: HashMap<String, Uuid> = HashMap::new();
	let mut skip = 0u64;
	const PAGE: u64 = 200;
	loop {
		let (existing, total) =
			repo.find_work_orders(user_id, filters.clone(), Pagination { skip, limit: PAGE }).await?;
		if existing.is_empty() {
			break;
		}
		for row in &existing {
			if scraped_ids.contains(row.external_id.as_str()) {
				existing_by_external_id.insert(row.external_id.clone(), row.id);
			} else {
				// Dispensers-before-work-order, per row, transactionally
				// (spec.md §4.4.3, testable property S2).
				repo.delete_work_order(row.id).await?;
				stats.deleted += 1;
			}
		}
		skip += existing.len() as u64;
		if skip >= total {
			break;
		}
	}

	for mut work_order in scraped {
		match existing_by_external_id.get(&work_order.external_id) {
			// Preserve the existing internal identity so this is an update,
			// not a duplicate insert under a fresh id.
			Some(&id) => {
				work_order.id = id;
				stats.updated += 1;
			}
			None => stats.inserted += 1,
		}
		repo.upsert_work_order(work_order).await?;
	}

	Ok(stats)
}

#[cfg(test)]
mod tests {
	use super::*;
	use automation_protocol::{Address, ScrapingHistoryRecord, WorkOrderStatus};
	use automation_repository::InMemoryRepository;
	use chrono::Utc;

	fn wo(user_id: Uuid, external_id: &str) -> WorkOrder {
		WorkOrder {
			id: Uuid::new_v4(),
			external_id: external_id.to_string(),
			user_id,
			site_name: "Site".into(),
			address: Address { street: "1 Main St".into(), city_state: "Austin, TX".into(), county: None },
			store_number: None,
			service_code: None,
			service_items: vec![],
			scheduled_date: None,
			status: WorkOrderStatus::Pending,
			visit_url: None,
			customer_url: None,
			instructions: None,
			created_by: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn deletes_rows_absent_from_new_scrape_and_keeps_the_rest() {
		let repo = InMemoryRepository::new();
		let user_id = Uuid::new_v4();
		for id in ["W-A", "W-B", "W-C"] {
			repo.upsert_work_order(wo(user_id, id)).await.unwrap();
		}

		let new_scrape = vec![wo(user_id, "W-A"), wo(user_id, "W-C"), wo(user_id, "W-D")];
		let stats = reconcile(&repo, user_id, WorkOrderFilters::default(), new_scrape).await.unwrap();

		assert_eq!(stats.deleted, 1);
		assert_eq!(stats.inserted, 1);
		assert_eq!(stats.updated, 2);

		let (remaining, _) =
			repo.find_work_orders(user_id, WorkOrderFilters::default(), Pagination { skip: 0, limit: 50 }).await.unwrap();
		let ids: HashSet<_> = remaining.iter().map(|w| w.external_id.clone()).collect();
		assert_eq!(ids, HashSet::from(["W-A".to_string(), "W-C".to_string(), "W-D".to_string()]));
	}

	#[test]
	fn scraping_history_record_shape_matches_stats() {
		let stats = ReconcileStats { inserted: 2, updated: 1, deleted: 1 };
		let record = ScrapingHistoryRecord {
			user_id: Uuid::new_v4(),
			schedule_type: "manual".into(),
			started: Utc::now(),
			completed: Some(Utc::now()),
			success: true,
			items_scraped: stats.inserted + stats.updated,
			items_updated: stats.updated,
			items_deleted: stats.deleted,
			error_message: None,
			duration_ms: Some(1200),
			trigger_type: "manual".into(),
		};
		assert_eq!(record.items_scraped, 3);
	}
}
