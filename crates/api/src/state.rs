//! Shared application state wired once at startup and cloned (cheaply, via
//! `Arc`) into every request handler — the teacher's `SharedState =
//! Arc<Mutex<RelayState>>` pattern (`crates/cli/src/relay.rs`), generalized
//! to several independently-locked subsystems instead of one big mutex
//! since each subsystem already manages its own concurrency.

use std::sync::Arc;

use automation_progress::ProgressBus;
use automation_queue::{JobQueue, ResourceCapacity, ResourceManager, Scheduler, SchedulerConfig};
use automation_recovery::Recovery;
use automation_repository::{InMemoryRepository, Repository};
use automation_runtime::BrowserPool;
use automation_vault::CredentialVault;

use crate::config::Config;
use crate::handler::ApiJobHandler;

#[derive(Clone)]
pub struct AppState {
	pub config: Arc<Config>,
	pub vault: Arc<CredentialVault>,
	pub browser_pool: Arc<BrowserPool>,
	pub repository: Arc<dyn Repository>,
	pub recovery: Arc<Recovery>,
	pub queue: Arc<JobQueue>,
	pub resources: Arc<ResourceManager>,
	pub bus: Arc<ProgressBus>,
	pub scheduler: Arc<Scheduler>,
}

impl AppState {
	pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
		let config = Arc::new(config);

		std::fs::create_dir_all(&config.data_dir)?;
		let vault = Arc::new(CredentialVault::from_env(config.data_dir.join("credentials")).await?);

		let browser_pool = BrowserPool::launch(automation_runtime::BrowserPoolConfig {
			capacity: 5,
			headless: !config.browser_visible,
			user_data_dir: Some(config.data_dir.join("browser-profile")),
		})
		.await?;

		let repository: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
		let recovery = Arc::new(Recovery::new());
		let queue = Arc::new(JobQueue::new());
		let resources = Arc::new(ResourceManager::new(ResourceCapacity::default()));
		let bus = ProgressBus::new();

		let handler = Arc::new(ApiJobHandler::new(
			browser_pool.clone(),
			vault.clone(),
			repository.clone(),
			recovery.clone(),
			config.clone(),
		));

		let store = automation_queue::JobStore::new(config.data_dir.join("jobs.json"));
		let scheduler_config = SchedulerConfig {
			max_concurrent_jobs: config.max_concurrent_jobs,
			..SchedulerConfig::default()
		};
		let scheduler =
			Arc::new(Scheduler::new(queue.clone(), resources.clone(), handler, bus.clone(), Some(store), scheduler_config));
		scheduler.restore().await?;

		Ok(Self { config, vault, browser_pool, repository, recovery, queue, resources, bus, scheduler })
	}
}
