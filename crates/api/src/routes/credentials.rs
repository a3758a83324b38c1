//! `/credentials/{service}` (spec.md §6). The vault only ever holds one
//! credential per user — there is a single target site in scope (spec.md
//! §1) — so `service` is validated against that one supported name rather
//! than used as a real dimension of the store.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use automation_core::{ChromiumDriver, DriverConfig, TargetSiteDriver};
use automation_protocol::error::ApiError;
use automation_protocol::recovery::ErrorKind;
use automation_recovery::RecoveryOutcome;
use automation_runtime::SessionId;
use automation_vault::{CredentialSummary, PlainCredential};

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::state::AppState;

const SUPPORTED_SERVICE: &str = "workfossa";

fn check_service(service: &str) -> Result<(), AppError> {
	if service != SUPPORTED_SERVICE {
		return Err(ApiError::not_found(format!("unknown service '{service}'")).into());
	}
	Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CredentialPayload {
	pub username: String,
	pub password: String,
}

pub async fn store(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(service): Path<String>,
	Json(body): Json<CredentialPayload>,
) -> Result<Json<CredentialSummary>, AppError> {
	check_service(&service)?;
	if body.username.trim().is_empty() || body.password.is_empty() {
		return Err(ApiError::validation("username and password are required").into());
	}
	state
		.vault
		.store(auth.user_id, &PlainCredential { username: body.username, password: body.password })
		.await?;
	Ok(Json(state.vault.summary(auth.user_id).await?))
}

pub async fn summary(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(service): Path<String>,
) -> Result<Json<CredentialSummary>, AppError> {
	check_service(&service)?;
	Ok(Json(state.vault.summary(auth.user_id).await?))
}

pub async fn remove(
	State(state): State<AppState>,
	auth: AuthContext,
	Path(service): Path<String>,
) -> Result<(), AppError> {
	check_service(&service)?;
	state.vault.delete(auth.user_id).await?;
	Ok(())
}

#[derive(Debug, serde::Serialize)]
pub struct TestResult {
	pub ok: bool,
	pub message: String,
}

/// Live verification against the target site, performed against a candidate
/// credential rather than whatever is already stored (spec.md §6: "Live
/// verification against the target site"). In `DEV_MODE` this never opens a
/// browser — it accepts any well-formed `user@domain` plus a non-empty
/// password (spec.md §6 "Environment").
pub async fn test(
	State(state): State<AppState>,
	_auth: AuthContext,
	Path(service): Path<String>,
	Json(body): Json<CredentialPayload>,
) -> Result<Json<TestResult>, AppError> {
	check_service(&service)?;

	if state.config.dev_mode {
		let ok = body.username.contains('@') && !body.password.is_empty();
		let message = if ok { "accepted (dev mode)".to_string() } else { "rejected: malformed credential".to_string() };
		return Ok(Json(TestResult { ok, message }));
	}

	let session = state.browser_pool.open(uuid::Uuid::nil()).await?;
	let session_id: SessionId = session.session_id;
	let driver = ChromiumDriver::new(session, DriverConfig::default());

	let outcome = state
		.recovery
		.recover("credential_test", ErrorKind::Authentication, || async { driver.login(&body.username, &body.password).await })
		.await;

	let _ = state.browser_pool.close(session_id).await;

	match outcome {
		Ok(login) if login.ok => Ok(Json(TestResult { ok: true, message: "login succeeded".into() })),
		Ok(_) => Ok(Json(TestResult { ok: false, message: "invalid credentials".into() })),
		Err(RecoveryOutcome::CircuitOpen) => Ok(Json(TestResult { ok: false, message: "target site circuit breaker open".into() })),
		Err(RecoveryOutcome::Exhausted(e))
		| Err(RecoveryOutcome::Aborted(e))
		| Err(RecoveryOutcome::EscalateManual(e))
		| Err(RecoveryOutcome::Skipped(e)) => Ok(Json(TestResult { ok: false, message: e.to_string() })),
	}
}
