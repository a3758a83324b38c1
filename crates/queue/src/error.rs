use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
	#[error("job {0} not found")]
	JobNotFound(Uuid),

	#[error("job {job_id} is in terminal state and cannot be cancelled")]
	AlreadyTerminal { job_id: Uuid },

	#[error("resource allocation denied for job {0}")]
	ResourceDenied(Uuid),

	#[error("snapshot I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("snapshot serialization error: {0}")]
	Serde(#[from] serde_json::Error),
}
