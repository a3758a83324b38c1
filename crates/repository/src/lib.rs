//! Repository Interface (C11): typed boundary to the persistent store
//! (spec.md §4.10). §1 places the store itself out of scope; this crate
//! defines the trait plus one in-memory reference implementation.

mod error;
mod memory;
mod types;

pub use error::{RepositoryError, Result};
pub use memory::InMemoryRepository;
pub use types::{BrowserSettings, CredentialListing, Pagination, WorkOrderFilters};

use async_trait::async_trait;
use automation_protocol::{Dispenser, ScrapingHistoryRecord, WorkOrder};
use uuid::Uuid;

/// Typed operations against the persistent store (spec.md §4.10). All
/// implementations must make `replace_dispensers_for` atomic: no caller may
/// ever observe a work order with a partially-replaced dispenser set.
#[async_trait]
pub trait Repository: Send + Sync {
	async fn upsert_work_order(&self, work_order: WorkOrder) -> Result<()>;

	/// Deletes a work order and, first, its dispensers (spec.md §4.4.3:
	/// "referential cleanup (dispensers-before-work-order)").
	async fn delete_work_order(&self, id: Uuid) -> Result<()>;

	async fn replace_dispensers_for(&self, work_order_id: Uuid, dispensers: Vec<Dispenser>) -> Result<()>;

	async fn dispensers_for(&self, work_order_id: Uuid) -> Result<Vec<Dispenser>>;

	async fn find_work_orders(
		&self,
		user_id: Uuid,
		filters: WorkOrderFilters,
		pagination: Pagination,
	) -> Result<(Vec<WorkOrder>, u64)>;

	async fn find_work_order(&self, id: Uuid, user_id: Uuid) -> Result<Option<WorkOrder>>;

	async fn list_user_credentials(&self, user_id: Uuid) -> Result<Vec<CredentialListing>>;

	async fn record_scraping_history(&self, record: ScrapingHistoryRecord) -> Result<()>;

	async fn get_user_browser_settings(&self, user_id: Uuid) -> Result<BrowserSettings>;
}
