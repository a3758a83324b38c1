//! Target-Site Driver (C4), Scraper (C5), and Form Engine (C6): the
//! browser-automation core built on top of `automation-runtime` sessions.

pub mod driver;
pub mod error;
pub mod form;
pub mod scraper;

pub use driver::{ChromiumDriver, DriverConfig, ListFilter, LoginFailureReason, LoginOutcome, TargetSiteDriver};
pub use error::{CoreError, Result};
pub use form::{run_batch, run_form, BatchItem, BatchOptions, BatchOutcome, FormTemplate};
pub use scraper::{run_scrape, ReconcileStats};
