//! Maps every downstream crate's error type onto the wire `ApiError`
//! envelope (spec.md §7) and implements `IntoResponse` for it.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub use automation_protocol::error::{ApiError, ApiErrorKind};

pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.0)).into_response()
	}
}

impl From<ApiError> for AppError {
	fn from(err: ApiError) -> Self {
		Self(err)
	}
}

/// Every vault failure surfaces as the single generic `credential_error`
/// kind, regardless of cause (spec.md §7).
impl From<automation_vault::CredentialError> for AppError {
	fn from(_: automation_vault::CredentialError) -> Self {
		Self(ApiError::credential_error())
	}
}

impl From<automation_repository::RepositoryError> for AppError {
	fn from(err: automation_repository::RepositoryError) -> Self {
		use automation_repository::RepositoryError::*;
		let api = match err {
			WorkOrderNotFound(id) => ApiError::not_found(format!("work order {id}")),
			Backend(msg) => ApiError::new(ApiErrorKind::DatabaseConnectionFailed, "database_connection_failed", msg),
		};
		Self(api)
	}
}

impl From<automation_runtime::RuntimeError> for AppError {
	fn from(err: automation_runtime::RuntimeError) -> Self {
		Self(ApiError::new(ApiErrorKind::BrowserInitFailed, "browser_init_failed", err.to_string()))
	}
}

impl From<automation_core::CoreError> for AppError {
	fn from(err: automation_core::CoreError) -> Self {
		use automation_core::CoreError::*;
		let kind = match &err {
			Navigation(_) | Timeout(_) => ApiErrorKind::PageLoadFailed,
			InvalidCredentials => ApiErrorKind::InvalidCredentials,
			TransientLogin(_) => ApiErrorKind::WorkfossaAuthFailed,
			ElementNotFound(_) | FormSubmission(_) | Scraping(_) => ApiErrorKind::ExternalServiceError,
			BrowserCrash(_) => ApiErrorKind::BrowserInitFailed,
			Runtime(_) => ApiErrorKind::BrowserInitFailed,
			Repository(_) => ApiErrorKind::DatabaseConnectionFailed,
		};
		Self(ApiError::new(kind, "automation_error", err.to_string()))
	}
}

impl From<automation_queue::QueueError> for AppError {
	fn from(err: automation_queue::QueueError) -> Self {
		use automation_queue::QueueError::*;
		let api = match err {
			JobNotFound(id) => ApiError::not_found(format!("job {id}")),
			AlreadyTerminal { job_id } => {
				ApiError::validation(format!("job {job_id} is already in a terminal state"))
			}
			ResourceDenied(id) => {
				ApiError::new(ApiErrorKind::ExternalServiceError, "resource_denied", format!("job {id} denied resources"))
			}
			Io(e) => ApiError::new(ApiErrorKind::InternalError, "internal_error", e.to_string()),
			Serde(e) => ApiError::new(ApiErrorKind::InternalError, "internal_error", e.to_string()),
		};
		Self(api)
	}
}
