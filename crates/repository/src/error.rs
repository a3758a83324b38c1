use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum RepositoryError {
	#[error("work order {0} not found")]
	WorkOrderNotFound(Uuid),

	#[error("repository backend error: {0}")]
	Backend(String),
}
