//! User-visible error envelope (spec.md §7) and its HTTP status mapping (§6).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
	AuthFailed,
	WorkfossaAuthFailed,
	TokenExpired,
	InvalidCredentials,
	Unauthorized,
	RecordNotFound,
	ValidationError,
	ConfigurationError,
	DatabaseConnectionFailed,
	BrowserInitFailed,
	PageLoadFailed,
	ExternalServiceError,
	InternalError,
	/// Credential errors never leak the underlying decryption/secret-manager
	/// detail (spec.md §7) — every vault failure surfaces as this one kind.
	CredentialError,
	Forbidden,
}

impl ApiErrorKind {
	/// Deterministic mapping to an HTTP status code (spec.md §6, §7).
	pub fn status_code(self) -> u16 {
		use ApiErrorKind::*;
		match self {
			ValidationError => 400,
			AuthFailed | WorkfossaAuthFailed | TokenExpired | InvalidCredentials => 401,
			Unauthorized | Forbidden => 403,
			RecordNotFound => 404,
			CredentialError => 409,
			ConfigurationError | InternalError => 500,
			ExternalServiceError | PageLoadFailed => 502,
			DatabaseConnectionFailed | BrowserInitFailed => 503,
		}
	}
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
	pub code: String,
	pub message: String,
	#[serde(rename = "type")]
	pub kind: ApiErrorKind,
}

impl ApiError {
	pub fn new(kind: ApiErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			message: message.into(),
			kind,
		}
	}

	/// Generic credential failure — never embeds the source error (spec.md §7).
	pub fn credential_error() -> Self {
		Self::new(
			ApiErrorKind::CredentialError,
			"credential_error",
			"Credential operation failed",
		)
	}

	pub fn not_found(what: impl Into<String>) -> Self {
		let what = what.into();
		Self::new(ApiErrorKind::RecordNotFound, "record_not_found", what)
	}

	pub fn forbidden() -> Self {
		Self::new(
			ApiErrorKind::Forbidden,
			"forbidden",
			"Not authorized for this resource",
		)
	}

	pub fn validation(message: impl Into<String>) -> Self {
		Self::new(ApiErrorKind::ValidationError, "validation_error", message)
	}

	pub fn status_code(&self) -> u16 {
		self.kind.status_code()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn credential_error_never_carries_extra_detail() {
		let err = ApiError::credential_error();
		assert_eq!(err.status_code(), 409);
		assert_eq!(err.message, "Credential operation failed");
	}

	#[test]
	fn forbidden_maps_to_403() {
		assert_eq!(ApiError::forbidden().status_code(), 403);
	}
}
