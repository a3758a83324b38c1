//! Target-Site Driver (C4): the opaque capability set the scraper (C5) and
//! form engine (C6) both build on (spec.md §4.3). Defined as a trait so
//! both consumers are injected a shared interface rather than reaching
//! into each other (SPEC_FULL §9, Design Notes: "reorganize as a DAG by
//! extracting shared interfaces").

mod chromium;

pub use chromium::{ChromiumDriver, DriverConfig};

use async_trait::async_trait;
use chromiumoxide::Page;

use crate::error::Result;

/// The list-view filter applied before scraping (spec.md §4.3: "the list
/// view with the 'no visits completed' filter applied").
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
	pub no_visits_completed: bool,
}

/// Why [`TargetSiteDriver::login`] did not succeed. The distinction between
/// [`InvalidCredentials`](LoginFailureReason::InvalidCredentials) and
/// [`Transient`](LoginFailureReason::Transient) is the correctness concern
/// called out in spec.md §4.3: only a login-page-remaining-after-submit
/// condition is `InvalidCredentials`; every other failure is `Transient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailureReason {
	InvalidCredentials,
	Transient,
}

#[derive(Debug, Clone, Copy)]
pub struct LoginOutcome {
	pub ok: bool,
	pub failure_reason: Option<LoginFailureReason>,
}

impl LoginOutcome {
	pub fn success() -> Self {
		Self { ok: true, failure_reason: None }
	}

	pub fn invalid_credentials() -> Self {
		Self { ok: false, failure_reason: Some(LoginFailureReason::InvalidCredentials) }
	}
}

/// Navigate, authenticate, and interact with the target site (spec.md
/// §4.3). The target-site HTML/DOM contract itself is opaque — this trait
/// names only the capability, not the selectors behind it (spec.md §1).
#[async_trait]
pub trait TargetSiteDriver: Send + Sync {
	/// The underlying page, for C5/C6's own DOM extraction and form-filling
	/// once navigation has landed them somewhere useful.
	fn page(&self) -> &Page;

	async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome>;

	async fn go_to_list(&self, filter: ListFilter) -> Result<()>;

	/// Attempts to switch the list view to 100 rows per page. Returns
	/// `Ok(false)` (not an error) when the control could not be found or
	/// verified — spec.md §4.3: "any failure is logged but is not fatal".
	async fn set_page_size(&self, size: u32) -> Result<bool>;

	async fn go_to_visit(&self, url: &str) -> Result<()>;

	async fn go_to_customer(&self, url: &str) -> Result<()>;
}
