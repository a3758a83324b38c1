use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("failed to launch browser: {0}")]
	LaunchFailed(String),

	#[error("pool is at capacity ({0} contexts)")]
	PoolExhausted(usize),

	#[error("no session found for {0}")]
	SessionNotFound(crate::session::SessionId),

	#[error("chromiumoxide error: {0}")]
	Cdp(#[from] chromiumoxide::error::CdpError),

	#[error("session liveness probe failed: {0}")]
	LivenessProbeFailed(String),
}
