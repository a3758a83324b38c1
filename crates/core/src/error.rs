use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Error surface for C4 (driver), C5 (scraper), and C6 (form engine).
/// Messages are deliberately substring-matchable against
/// `automation_recovery::classify` (spec.md §4.7: "by substring matching
/// against a static pattern table").
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("navigation failed: {0}")]
	Navigation(String),

	#[error("element not found: {0}")]
	ElementNotFound(String),

	#[error("timed out waiting for {0}")]
	Timeout(String),

	#[error("login failed: invalid credentials")]
	InvalidCredentials,

	#[error("login failed: transient error: {0}")]
	TransientLogin(String),

	#[error("form submission failed: {0}")]
	FormSubmission(String),

	#[error("scrape failed: {0}")]
	Scraping(String),

	#[error("browser crash: {0}")]
	BrowserCrash(String),

	#[error("runtime error: {0}")]
	Runtime(#[from] automation_runtime::RuntimeError),

	#[error("repository error: {0}")]
	Repository(#[from] automation_repository::RepositoryError),
}
