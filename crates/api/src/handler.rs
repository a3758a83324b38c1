//! Bridges the queue's [`JobHandler`] seam to the concrete scrape/form
//! operations in `automation-core`. This is the one place in the workspace
//! that depends on both `automation-queue` and `automation-core` (SPEC_FULL
//! §9: the dependency-injection point named in the design notes).

use std::sync::Arc;

use automation_core::{
	run_batch, run_form, run_scrape, BatchItem, BatchOptions, ChromiumDriver, DriverConfig, LoginOutcome, TargetSiteDriver,
};
use automation_progress::JobContext;
use automation_protocol::dispenser::Dispenser;
use automation_protocol::job::Job;
use automation_protocol::recovery::ErrorKind;
use automation_queue::JobHandler;
use automation_recovery::{Recovery, RecoveryOutcome};
use automation_repository::Repository;
use automation_runtime::BrowserPool;
use automation_vault::CredentialVault;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::Config;

/// `POST /work-orders/scrape` payload (spec.md §6).
#[derive(Debug, Deserialize)]
pub struct ScrapeListPayload {
	#[serde(default = "default_trigger")]
	pub trigger_type: String,
}

fn default_trigger() -> String {
	"manual".into()
}

/// `POST /work-orders/{id}/scrape-dispensers` payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeDispensersPayload {
	pub work_order_id: Uuid,
}

/// `POST /automation/form/process-visit` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFormPayload {
	pub dispenser: Dispenser,
	pub visit_url: String,
}

/// `POST /automation/form/process-batch` payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunBatchPayload {
	pub items: Vec<RunFormPayload>,
	#[serde(default)]
	pub concurrency: Option<usize>,
}

pub struct ApiJobHandler {
	browser_pool: Arc<BrowserPool>,
	vault: Arc<CredentialVault>,
	repository: Arc<dyn Repository>,
	recovery: Arc<Recovery>,
	config: Arc<Config>,
}

impl ApiJobHandler {
	pub fn new(
		browser_pool: Arc<BrowserPool>,
		vault: Arc<CredentialVault>,
		repository: Arc<dyn Repository>,
		recovery: Arc<Recovery>,
		config: Arc<Config>,
	) -> Self {
		Self { browser_pool, vault, repository, recovery, config }
	}

	/// Opens a fresh session and authenticates it against the target site
	/// using the user's stored credential (spec.md §4.1, §4.2, §4.3). In
	/// `DEV_MODE` a missing live verification never blocks a scrape/form run
	/// — the stored (possibly unverified) credential is used as-is
	/// (SPEC_FULL §9: "DEV_MODE bypasses credential verification only").
	async fn authenticated_driver(&self, user_id: Uuid) -> Result<ChromiumDriver, String> {
		let credential = self
			.vault
			.retrieve(user_id)
			.await
			.map_err(|_| "credential retrieval failed".to_string())?
			.ok_or_else(|| "no credential stored for this user".to_string())?;

		let session = self.browser_pool.open(user_id).await.map_err(|e| e.to_string())?;
		let driver = ChromiumDriver::new(session, DriverConfig::default());

		let outcome = self
			.recovery
			.recover("login", ErrorKind::Authentication, || async {
				driver.login(&credential.username, &credential.password).await
			})
			.await;

		let login: LoginOutcome = match outcome {
			Ok(login) => login,
			Err(RecoveryOutcome::CircuitOpen) => return Err("login circuit breaker open".into()),
			Err(RecoveryOutcome::Exhausted(e))
			| Err(RecoveryOutcome::Aborted(e))
			| Err(RecoveryOutcome::EscalateManual(e))
			| Err(RecoveryOutcome::Skipped(e)) => return Err(e.to_string()),
		};
		if !login.ok {
			return Err("login failed: invalid credentials".into());
		}
		Ok(driver)
	}
}

#[async_trait::async_trait]
impl JobHandler for ApiJobHandler {
	async fn handle(&self, job: &Job, ctx: JobContext) -> Result<Value, String> {
		match job.kind {
			automation_protocol::job::JobKind::ScrapeList => {
				let payload: ScrapeListPayload =
					serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;
				let driver = self.authenticated_driver(job.user_id).await?;
				let stats = self
					.recovery
					.recover("scrape_list", ErrorKind::Scraping, || {
						run_scrape(&driver, self.repository.as_ref(), &ctx, &payload.trigger_type)
					})
					.await
					.map_err(recovery_message)?;
				Ok(json!({"inserted": stats.inserted, "updated": stats.updated, "deleted": stats.deleted}))
			}

			automation_protocol::job::JobKind::ScrapeDispensers => {
				let payload: ScrapeDispensersPayload =
					serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;
				let work_order = self
					.repository
					.find_work_order(payload.work_order_id, job.user_id)
					.await
					.map_err(|e| e.to_string())?
					.ok_or_else(|| "work order not found".to_string())?;
				let customer_url = work_order.customer_url.ok_or_else(|| "work order has no customer url".to_string())?;

				let driver = self.authenticated_driver(job.user_id).await?;
				let dispensers = self
					.recovery
					.recover("scrape_dispensers", ErrorKind::Scraping, || async {
						driver.go_to_customer(&customer_url).await?;
						automation_core::scraper::extract_dispensers(&driver, work_order.id).await
					})
					.await
					.map_err(recovery_message)?;

				self.repository.replace_dispensers_for(work_order.id, dispensers.clone()).await.map_err(|e| e.to_string())?;
				Ok(json!({"dispenser_count": dispensers.len()}))
			}

			automation_protocol::job::JobKind::RunForm => {
				let payload: RunFormPayload = serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;
				let driver = self.authenticated_driver(job.user_id).await?;
				self.recovery
					.recover("run_form", ErrorKind::FormSubmission, || {
						run_form(&driver, &ctx, &payload.dispenser, &payload.visit_url)
					})
					.await
					.map_err(recovery_message)?;
				Ok(json!({"dispenser_id": payload.dispenser.id}))
			}

			automation_protocol::job::JobKind::RunBatch => {
				let payload: RunBatchPayload = serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;
				let concurrency = payload.concurrency.unwrap_or(1).max(1);

				let mut drivers: Vec<Arc<dyn TargetSiteDriver>> = Vec::with_capacity(concurrency);
				for _ in 0..concurrency {
					let driver = self.authenticated_driver(job.user_id).await?;
					drivers.push(Arc::new(driver));
				}

				let items = payload
					.items
					.into_iter()
					.map(|p| BatchItem { dispenser: p.dispenser, visit_url: p.visit_url })
					.collect();

				let outcome = run_batch(drivers, ctx, items, BatchOptions { concurrency, ..BatchOptions::default() }).await;
				Ok(json!({
					"succeeded": outcome.succeeded,
					"failed": outcome.failed,
					"errors": outcome.errors.iter().map(|(id, msg)| json!({"dispenser_id": id, "error": msg})).collect::<Vec<_>>(),
				}))
			}
		}
	}
}

fn recovery_message(outcome: RecoveryOutcome<automation_core::CoreError>) -> String {
	match outcome {
		RecoveryOutcome::CircuitOpen => "circuit breaker open".to_string(),
		RecoveryOutcome::Exhausted(e)
		| RecoveryOutcome::Aborted(e)
		| RecoveryOutcome::EscalateManual(e)
		| RecoveryOutcome::Skipped(e) => e.to_string(),
	}
}
