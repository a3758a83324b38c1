//! `/automation/form/*` and `/automation/queue/*` (spec.md §6): enqueues
//! form-run jobs and exposes queue/job introspection.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use automation_protocol::error::ApiError;
use automation_protocol::job::{Job, JobKind, Priority, QueueKind, ResourceRequirement};

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::handler::{RunBatchPayload, RunFormPayload};
use crate::routes::new_job;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessVisitBody {
	pub user_id: Uuid,
	#[serde(flatten)]
	pub form: RunFormPayload,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
	pub status: &'static str,
	pub job_id: Uuid,
}

pub async fn process_visit(
	State(state): State<AppState>,
	auth: AuthContext,
	Json(body): Json<ProcessVisitBody>,
) -> Result<Json<EnqueueResponse>, AppError> {
	auth.authorize(body.user_id)?;
	let payload = serde_json::to_value(&body.form).map_err(|e| AppError::from(ApiError::validation(e.to_string())))?;
	let job = new_job(body.user_id, JobKind::RunForm, QueueKind::Single, Priority::Normal, payload, ResourceRequirement::default());
	let job_id = job.job_id;
	state.queue.submit(job);
	Ok(Json(EnqueueResponse { status: "queued", job_id }))
}

#[derive(Debug, Deserialize)]
pub struct ProcessBatchBody {
	pub user_id: Uuid,
	pub items: Vec<RunFormPayload>,
	#[serde(default)]
	pub concurrency: Option<usize>,
}

pub async fn process_batch(
	State(state): State<AppState>,
	auth: AuthContext,
	Json(body): Json<ProcessBatchBody>,
) -> Result<Json<EnqueueResponse>, AppError> {
	auth.authorize(body.user_id)?;
	let concurrency = body.concurrency.unwrap_or(1).max(1);
	let resources = ResourceRequirement { sessions: concurrency as u32, ..ResourceRequirement::default() };
	let payload = serde_json::to_value(&RunBatchPayload { items: body.items, concurrency: Some(concurrency) })
		.map_err(|e| AppError::from(ApiError::validation(e.to_string())))?;
	let job = new_job(body.user_id, JobKind::RunBatch, QueueKind::Batch, Priority::Normal, payload, resources);
	let job_id = job.job_id;
	state.queue.submit(job);
	Ok(Json(EnqueueResponse { status: "queued", job_id }))
}

pub async fn job_status(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
	let job = state.queue.get(job_id).ok_or_else(|| ApiError::not_found(format!("job {job_id}")))?;
	auth.authorize(job.user_id)?;
	Ok(Json(job))
}

pub async fn cancel_job(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
	let job = state.queue.get(job_id).ok_or_else(|| ApiError::not_found(format!("job {job_id}")))?;
	auth.authorize(job.user_id)?;
	let cancelled = state.queue.cancel(job_id)?;
	state.scheduler.signal_cancel(job_id);
	Ok(Json(cancelled))
}

#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
	pub counts: automation_queue::QueueCounts,
	pub resource_utilization: ResourceUtilization,
}

#[derive(Debug, Serialize)]
pub struct ResourceUtilization {
	pub sessions: u32,
	pub memory_mb: u32,
	pub cpu: f64,
}

/// Process-wide aggregate, not scoped to one user — restricted to admin
/// callers (spec.md §6 authorization rule extends naturally to any endpoint
/// that exposes other users' activity in aggregate).
pub async fn queue_status(State(state): State<AppState>, auth: AuthContext) -> Result<Json<QueueStatusResponse>, AppError> {
	if !auth.is_admin {
		return Err(ApiError::forbidden().into());
	}
	let counts = state.queue.counts();
	let utilization = state.resources.utilization();
	Ok(Json(QueueStatusResponse {
		counts,
		resource_utilization: ResourceUtilization {
			sessions: utilization.sessions,
			memory_mb: utilization.memory_mb,
			cpu: utilization.cpu,
		},
	}))
}
