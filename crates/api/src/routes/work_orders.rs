//! `/work-orders` (spec.md §6): paginated listing, single-record fetch,
//! status transitions, and the scrape-triggering endpoints that hand work
//! off to the job queue.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use automation_protocol::job::{JobKind, Priority, QueueKind, ResourceRequirement};
use automation_protocol::error::ApiError;
use automation_protocol::work_order::{ServiceCode, WorkOrder, WorkOrderStatus};
use automation_repository::{Pagination, WorkOrderFilters};

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::handler::ScrapeDispensersPayload;
use crate::routes::new_job;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
	pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeListBody {
	#[serde(default = "default_trigger")]
	pub trigger_type: String,
}

fn default_trigger() -> String {
	"manual".into()
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
	pub status: &'static str,
	pub job_id: Uuid,
}

pub async fn scrape_list(
	State(state): State<AppState>,
	auth: AuthContext,
	Query(query): Query<UserIdQuery>,
	Json(body): Json<ScrapeListBody>,
) -> Result<Json<EnqueueResponse>, AppError> {
	let user_id = auth.resolve_user_id(query.user_id)?;
	let payload = serde_json::json!({ "trigger_type": body.trigger_type });
	let job = new_job(user_id, JobKind::ScrapeList, QueueKind::Single, Priority::Normal, payload, ResourceRequirement::default());
	let job_id = job.job_id;
	state.queue.submit(job);
	Ok(Json(EnqueueResponse { status: "queued", job_id }))
}

#[derive(Debug, Serialize)]
pub struct ScrapeProgressResponse {
	pub phase: String,
	pub percentage: u8,
	pub message: String,
	pub job_id: Option<Uuid>,
}

pub async fn scrape_progress(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(user_id): Path<Uuid>,
) -> Result<Json<ScrapeProgressResponse>, AppError> {
	auth.authorize(user_id)?;

	let latest_job = state
		.queue
		.all_jobs()
		.into_iter()
		.filter(|j| j.user_id == user_id && j.kind == JobKind::ScrapeList)
		.max_by_key(|j| j.created_at);

	let Some(job) = latest_job else {
		return Ok(Json(ScrapeProgressResponse {
			phase: "idle".into(),
			percentage: 0,
			message: "no scrape has been started".into(),
			job_id: None,
		}));
	};

	if let Some(event) = state.bus.latest(job.job_id) {
		return Ok(Json(ScrapeProgressResponse {
			phase: event.phase.0,
			percentage: event.percentage,
			message: event.message,
			job_id: Some(job.job_id),
		}));
	}

	use automation_protocol::job::JobState::*;
	let (phase, percentage) = match job.state {
		Pending | Queued => ("queued", 0),
		Running => ("scraping", 0),
		Completed => ("completion", 100),
		Failed | Timeout | Cancelled => ("error", 0),
		Paused => ("paused", 0),
	};
	Ok(Json(ScrapeProgressResponse {
		phase: phase.into(),
		percentage,
		message: job.error.clone().unwrap_or_else(|| format!("job is {:?}", job.state)),
		job_id: Some(job.job_id),
	}))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
	pub user_id: Option<Uuid>,
	pub skip: Option<u64>,
	pub limit: Option<u64>,
	pub start_date: Option<DateTime<Utc>>,
	pub end_date: Option<DateTime<Utc>>,
}

pub async fn list(
	State(state): State<AppState>,
	auth: AuthContext,
	Query(query): Query<ListQuery>,
) -> Result<(HeaderMap, Json<Vec<WorkOrder>>), AppError> {
	let user_id = auth.resolve_user_id(query.user_id)?;
	let pagination = Pagination { skip: query.skip.unwrap_or(0), limit: query.limit.unwrap_or(50) };
	let filters = WorkOrderFilters { start_date: query.start_date, end_date: query.end_date, status: None };

	let (work_orders, total) = state.repository.find_work_orders(user_id, filters, pagination).await?;

	let mut headers = HeaderMap::new();
	headers.insert("x-total-count", HeaderValue::from_str(&total.to_string()).expect("digits are valid header value bytes"));
	headers.insert("x-skip", HeaderValue::from_str(&pagination.skip.to_string()).expect("digits are valid header value bytes"));
	headers.insert("x-limit", HeaderValue::from_str(&pagination.limit.to_string()).expect("digits are valid header value bytes"));
	Ok((headers, Json(work_orders)))
}

#[derive(Debug, Serialize)]
pub struct WorkOrderDetail {
	#[serde(flatten)]
	pub work_order: WorkOrder,
	pub dispensers: Vec<automation_protocol::Dispenser>,
}

pub async fn find_one(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(id): Path<Uuid>,
	Query(query): Query<UserIdQuery>,
) -> Result<Json<WorkOrderDetail>, AppError> {
	let user_id = auth.resolve_user_id(query.user_id)?;
	let work_order = state
		.repository
		.find_work_order(id, user_id)
		.await?
		.ok_or_else(|| ApiError::not_found(format!("work order {id}")))?;
	let dispensers = state.repository.dispensers_for(id).await?;
	Ok(Json(WorkOrderDetail { work_order, dispensers }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
	pub status: WorkOrderStatus,
}

pub async fn update_status(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(id): Path<Uuid>,
	Query(query): Query<UserIdQuery>,
	Json(body): Json<UpdateStatusBody>,
) -> Result<Json<WorkOrder>, AppError> {
	let user_id = auth.resolve_user_id(query.user_id)?;
	let mut work_order = state
		.repository
		.find_work_order(id, user_id)
		.await?
		.ok_or_else(|| ApiError::not_found(format!("work order {id}")))?;
	work_order.status = body.status;
	work_order.updated_at = Utc::now();
	state.repository.upsert_work_order(work_order.clone()).await?;
	Ok(Json(work_order))
}

#[derive(Debug, Deserialize)]
pub struct ScrapeDispensersQuery {
	pub user_id: Option<Uuid>,
	#[serde(default)]
	pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ScrapeDispensersResponse {
	Cached { status: &'static str, dispensers: Vec<automation_protocol::Dispenser> },
	Queued { status: &'static str, job_id: Uuid },
}

pub async fn scrape_dispensers(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(id): Path<Uuid>,
	Query(query): Query<ScrapeDispensersQuery>,
) -> Result<Json<ScrapeDispensersResponse>, AppError> {
	let user_id = auth.resolve_user_id(query.user_id)?;
	let work_order = state
		.repository
		.find_work_order(id, user_id)
		.await?
		.ok_or_else(|| ApiError::not_found(format!("work order {id}")))?;

	if !query.force_refresh {
		let existing = state.repository.dispensers_for(work_order.id).await?;
		if !existing.is_empty() {
			return Ok(Json(ScrapeDispensersResponse::Cached { status: "cached", dispensers: existing }));
		}
	}

	let payload = serde_json::to_value(ScrapeDispensersPayload { work_order_id: work_order.id }).map_err(|e| {
		AppError::from(ApiError::validation(e.to_string()))
	})?;
	let job = new_job(user_id, JobKind::ScrapeDispensers, QueueKind::Single, Priority::Normal, payload, ResourceRequirement::default());
	let job_id = job.job_id;
	state.queue.submit(job);
	Ok(Json(ScrapeDispensersResponse::Queued { status: "queued", job_id }))
}

#[derive(Debug, Deserialize)]
pub struct BatchDispenserScrapeBody {
	pub user_id: Uuid,
	#[serde(default)]
	pub service_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchEnqueueResponse {
	pub status: &'static str,
	pub job_ids: Vec<Uuid>,
}

pub async fn scrape_dispensers_batch(
	State(state): State<AppState>,
	auth: AuthContext,
	Json(body): Json<BatchDispenserScrapeBody>,
) -> Result<Json<BatchEnqueueResponse>, AppError> {
	auth.authorize(body.user_id)?;

	let wanted: Vec<ServiceCode> = body
		.service_codes
		.iter()
		.map(|raw| ServiceCode::parse(raw).ok_or_else(|| ApiError::validation(format!("unknown service code '{raw}'"))))
		.collect::<Result<_, _>>()?;

	let (work_orders, _total) =
		state.repository.find_work_orders(body.user_id, WorkOrderFilters::default(), Pagination { skip: 0, limit: 10_000 }).await?;

	let mut job_ids = Vec::new();
	for work_order in work_orders {
		let Some(code) = work_order.service_code else { continue };
		if !wanted.is_empty() && !wanted.contains(&code) {
			continue;
		}
		if work_order.customer_url.is_none() {
			continue;
		}
		let payload = serde_json::to_value(ScrapeDispensersPayload { work_order_id: work_order.id })
			.map_err(|e| AppError::from(ApiError::validation(e.to_string())))?;
		let job = new_job(body.user_id, JobKind::ScrapeDispensers, QueueKind::Batch, Priority::Normal, payload, ResourceRequirement::default());
		job_ids.push(job.job_id);
		state.queue.submit(job);
	}

	Ok(Json(BatchEnqueueResponse { status: "queued", job_ids }))
}

pub async fn delete_one(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(id): Path<Uuid>,
	Query(query): Query<UserIdQuery>,
) -> Result<(), AppError> {
	let user_id = auth.resolve_user_id(query.user_id)?;
	state
		.repository
		.find_work_order(id, user_id)
		.await?
		.ok_or_else(|| ApiError::not_found(format!("work order {id}")))?;
	state.repository.delete_work_order(id).await?;
	Ok(())
}

pub async fn clear_all(
	State(state): State<AppState>,
	auth: AuthContext,
	Query(query): Query<UserIdQuery>,
) -> Result<Json<u64>, AppError> {
	let user_id = auth.resolve_user_id(query.user_id)?;
	let (work_orders, _total) =
		state.repository.find_work_orders(user_id, WorkOrderFilters::default(), Pagination { skip: 0, limit: 10_000 }).await?;
	let count = work_orders.len() as u64;
	for work_order in work_orders {
		state.repository.delete_work_order(work_order.id).await?;
	}
	Ok(Json(count))
}
