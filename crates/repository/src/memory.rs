//! In-memory reference [`Repository`] implementation. Used by tests and by
//! the API crate when no external store is wired in (spec.md §4.10, §1:
//! persistent storage itself is out of scope).

use std::collections::HashMap;

use async_trait::async_trait;
use automation_protocol::{Dispenser, ScrapingHistoryRecord, WorkOrder};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{RepositoryError, Result};
use crate::types::{BrowserSettings, CredentialListing, Pagination, WorkOrderFilters};
use crate::Repository;

#[derive(Default)]
struct State {
	work_orders: HashMap<Uuid, WorkOrder>,
	dispensers: HashMap<Uuid, Vec<Dispenser>>,
	scraping_history: Vec<ScrapingHistoryRecord>,
	browser_settings: HashMap<Uuid, BrowserSettings>,
	credentials: HashMap<Uuid, Vec<CredentialListing>>,
}

/// Single-lock reference implementation (spec.md SPEC_FULL §4.10). All
/// mutation paths take the write lock for their whole critical section, so
/// `replace_dispensers_for` is atomic by construction: no reader can
/// observe the old dispenser set mixed with the new one.
pub struct InMemoryRepository {
	state: RwLock<State>,
}

impl InMemoryRepository {
	pub fn new() -> Self {
		Self { state: RwLock::new(State::default()) }
	}

	/// Test/seed helper — not part of the [`Repository`] contract, since
	/// credential listing normally originates from `automation-vault`.
	pub fn seed_credential(&self, user_id: Uuid, listing: CredentialListing) {
		self.state.write().credentials.entry(user_id).or_default().push(listing);
	}

	pub fn set_browser_settings(&self, user_id: Uuid, settings: BrowserSettings) {
		self.state.write().browser_settings.insert(user_id, settings);
	}
}

impl Default for InMemoryRepository {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Repository for InMemoryRepository {
	async fn upsert_work_order(&self, work_order: WorkOrder) -> Result<()> {
		self.state.write().work_orders.insert(work_order.id, work_order);
		Ok(())
	}

	async fn delete_work_order(&self, id: Uuid) -> Result<()> {
		let mut state = self.state.write();
		state.dispensers.remove(&id);
		state
			.work_orders
			.remove(&id)
			.map(|_| ())
			.ok_or(RepositoryError::WorkOrderNotFound(id))
	}

	async fn replace_dispensers_for(&self, work_order_id: Uuid, dispensers: Vec<Dispenser>) -> Result<()> {
		self.state.write().dispensers.insert(work_order_id, dispensers);
		Ok(())
	}

	async fn dispensers_for(&self, work_order_id: Uuid) -> Result<Vec<Dispenser>> {
		Ok(self.state.read().dispensers.get(&work_order_id).cloned().unwrap_or_default())
	}

	async fn find_work_orders(
		&self,
		user_id: Uuid,
		filters: WorkOrderFilters,
		pagination: Pagination,
	) -> Result<(Vec<WorkOrder>, u64)> {
		let state = self.state.read();
		let mut matching: Vec<WorkOrder> = state
			.work_orders
			.values()
			.filter(|wo| wo.user_id == user_id)
			.filter(|wo| filters.status.is_none_or(|s| wo.status as u8 == s as u8))
			.filter(|wo| match (filters.start_date, wo.scheduled_date) {
				(Some(start), Some(scheduled)) => scheduled >= start,
				(Some(_), None) => false,
				(None, _) => true,
			})
			.filter(|wo| match (filters.end_date, wo.scheduled_date) {
				(Some(end), Some(scheduled)) => scheduled <= end,
				(Some(_), None) => false,
				(None, _) => true,
			})
			.cloned()
			.collect();

		matching.sort_by_key(|wo| wo.created_at);
		let total = matching.len() as u64;

		let page = matching
			.into_iter()
			.skip(pagination.skip as usize)
			.take(pagination.limit as usize)
			.collect();

		Ok((page, total))
	}

	async fn find_work_order(&self, id: Uuid, user_id: Uuid) -> Result<Option<WorkOrder>> {
		Ok(self
			.state
			.read()
			.work_orders
			.get(&id)
			.filter(|wo| wo.user_id == user_id)
			.cloned())
	}

	async fn list_user_credentials(&self, user_id: Uuid) -> Result<Vec<CredentialListing>> {
		Ok(self.state.read().credentials.get(&user_id).cloned().unwrap_or_default())
	}

	async fn record_scraping_history(&self, record: ScrapingHistoryRecord) -> Result<()> {
		self.state.write().scraping_history.push(record);
		Ok(())
	}

	async fn get_user_browser_settings(&self, user_id: Uuid) -> Result<BrowserSettings> {
		Ok(self.state.read().browser_settings.get(&user_id).copied().unwrap_or_default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use automation_protocol::work_order::{Address, WorkOrderStatus};
	use chrono::Utc;

	fn sample_work_order(user_id: Uuid) -> WorkOrder {
		WorkOrder {
			id: Uuid::new_v4(),
			external_id: "W-100001".into(),
			user_id,
			site_name: "Site A".into(),
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
	async fn delete_work_order_also_removes_its_dispensers() {
		let repo = InMemoryRepository::new();
		let user_id = Uuid::new_v4();
		let wo = sample_work_order(user_id);
		let wo_id = wo.id;
		repo.upsert_work_order(wo).await.unwrap();
		repo.replace_dispensers_for(wo_id, vec![]).await.unwrap();

		repo.delete_work_order(wo_id).await.unwrap();

		assert!(repo.find_work_order(wo_id, user_id).await.unwrap().is_none());
		assert!(repo.dispensers_for(wo_id).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn find_work_orders_scopes_to_user_and_reports_total_count() {
		let repo = InMemoryRepository::new();
		let user_a = Uuid::new_v4();
		let user_b = Uuid::new_v4();
		for _ in 0..3 {
			repo.upsert_work_order(sample_work_order(user_a)).await.unwrap();
		}
		repo.upsert_work_order(sample_work_order(user_b)).await.unwrap();

		let (page, total) = repo
			.find_work_orders(user_a, WorkOrderFilters::default(), Pagination { skip: 0, limit: 2 })
			.await
			.unwrap();

		assert_eq!(total, 3);
		assert_eq!(page.len(), 2);
	}

	#[tokio::test]
	async fn deleting_an_unknown_work_order_is_an_error() {
		let repo = InMemoryRepository::new();
		assert!(repo.delete_work_order(Uuid::new_v4()).await.is_err());
	}
}
