//! Route tables for the REST surface (spec.md §6), grouped by resource the
//! way the teacher groups relay routes in `relay.rs`'s `Router::new()`
//! chain. Assembled into one `Router<AppState>` here and merged with the
//! WS route in `main.rs`.

mod automation;
mod credentials;
mod work_orders;

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
	Router::new()
		.route("/credentials/{service}", post(credentials::store).get(credentials::summary).delete(credentials::remove))
		.route("/credentials/{service}/test", post(credentials::test))
		.route("/work-orders/scrape", post(work_orders::scrape_list))
		.route("/work-orders/scrape/progress/{user_id}", get(work_orders::scrape_progress))
		.route("/work-orders/scrape-dispensers-batch", post(work_orders::scrape_dispensers_batch))
		.route("/work-orders/clear-all", delete(work_orders::clear_all))
		.route("/work-orders/{id}", get(work_orders::find_one).delete(work_orders::delete_one))
		.route("/work-orders/{id}/status", patch(work_orders::update_status))
		.route("/work-orders/{id}/scrape-dispensers", post(work_orders::scrape_dispensers))
		.route("/work-orders", get(work_orders::list))
		.route("/automation/form/process-visit", post(automation::process_visit))
		.route("/automation/form/process-batch", post(automation::process_batch))
		.route("/automation/queue/jobs/{job_id}", get(automation::job_status))
		.route("/automation/queue/jobs/{job_id}/cancel", post(automation::cancel_job))
		.route("/automation/queue/status", get(automation::queue_status))
}

/// Shared job-construction helper: every enqueue endpoint needs the same
/// boilerplate (`pending -> queued`, timestamps, default retry policy) and
/// differs only in kind/queue/payload/resources (spec.md §3, §4.9).
pub(crate) fn new_job(
	user_id: uuid::Uuid,
	kind: automation_protocol::job::JobKind,
	queue: automation_protocol::job::QueueKind,
	priority: automation_protocol::job::Priority,
	payload: serde_json::Value,
	resources: automation_protocol::job::ResourceRequirement,
) -> automation_protocol::job::Job {
	let now = chrono::Utc::now();
	automation_protocol::job::Job {
		job_id: uuid::Uuid::new_v4(),
		user_id,
		kind,
		priority,
		state: automation_protocol::job::JobState::Queued,
		queue,
		payload,
		depends_on: vec![],
		dependency_mode: automation_protocol::job::DependencyMode::All,
		resources,
		scheduled_at: None,
		deadline: None,
		max_retries: 3,
		retry_delay_secs: 30,
		retry_count: 0,
		created_at: now,
		queued_at: Some(now),
		started_at: None,
		completed_at: None,
		error: None,
		result: None,
	}
}
