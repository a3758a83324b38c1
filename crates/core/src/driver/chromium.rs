//! `chromiumoxide`-backed [`TargetSiteDriver`] implementation.
//!
//! Grounded on the teacher's CDP relay (`crates/cli/src/relay.rs`) for the
//! general navigate/evaluate shape and on
//! `cyrup-ai-kodegen-tools-citescrape::web_search::search` /
//! `scottopell-phoenix-ide::tools::browser::tools` for the specific
//! `goto` / `find_element` / `evaluate` / polling-wait idioms against a
//! `chromiumoxide::Page`. The exact selectors below are a reasonable
//! default for a work-management site's login and list views; the DOM
//! contract itself is opaque per spec.md §1, so a real deployment is
//! expected to tune these constants, not the surrounding structure.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use automation_runtime::Session;
use chromiumoxide::Page;

use super::{ListFilter, LoginOutcome, TargetSiteDriver};
use crate::error::{CoreError, Result};

const EMAIL_SELECTOR: &str = "input[type='email'], input[name='email'], input[name='username']";
const PASSWORD_SELECTOR: &str = "input[type='password']";
const SUBMIT_SELECTOR: &str = "button[type='submit'], input[type='submit']";

const VISIT_CONTENT_MARKERS: &str = "table tbody tr, [data-testid='equipment-tab'], .equipment-tab";
const CUSTOMER_CONTENT_MARKERS: &str = "[data-testid='equipment-tab'], .equipment-tab";
const LIST_ROW_MARKER: &str = "table tbody tr, [class*='work-order-row'], [class*='visit-row']";

const CONTENT_WAIT: Duration = Duration::from_secs(8);
const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(150);
const FALLBACK_DELAY: Duration = Duration::from_millis(800);
const POST_SUBMIT_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DriverConfig {
	pub base_url: String,
	pub login_path: String,
	pub list_path: String,
}

impl Default for DriverConfig {
	fn default() -> Self {
		Self {
			base_url: "https://app.example-target-site.com".into(),
			login_path: "/login".into(),
			list_path: "/work-orders".into(),
		}
	}
}

pub struct ChromiumDriver {
	session: Session,
	config: DriverConfig,
}

impl ChromiumDriver {
	pub fn new(session: Session, config: DriverConfig) -> Self {
		Self { session, config }
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.config.base_url, path)
	}

	/// Polls for `selector` up to [`CONTENT_WAIT`], falling back to a short
	/// fixed delay if it never appears (spec.md §4.3: "a short bounded
	/// wait; fall back to a small fixed delay if the marker is absent").
	async fn wait_for_marker(&self, selector: &str) {
		let start = Instant::now();
		loop {
			if self.page().find_element(selector).await.is_ok() {
				return;
			}
			if start.elapsed() >= CONTENT_WAIT {
				tokio::time::sleep(FALLBACK_DELAY).await;
				return;
			}
			tokio::time::sleep(MARKER_POLL_INTERVAL).await;
		}
	}
}

#[async_trait]
impl TargetSiteDriver for ChromiumDriver {
	fn page(&self) -> &Page {
		&self.session.page
	}

	async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
		self.page()
			.goto(self.url(&self.config.login_path))
			.await
			.map_err(|e| CoreError::TransientLogin(e.to_string()))?;
		let _ = tokio::time::timeout(CONTENT_WAIT, self.page().wait_for_navigation()).await;

		let email = self
			.page()
			.find_element(EMAIL_SELECTOR)
			.await
			.map_err(|e| CoreError::TransientLogin(format!("email field: {e}")))?;
		email.click().await.map_err(|e| CoreError::TransientLogin(e.to_string()))?;
		email.type_str(username).await.map_err(|e| CoreError::TransientLogin(e.to_string()))?;

		let password_field = self
			.page()
			.find_element(PASSWORD_SELECTOR)
			.await
			.map_err(|e| CoreError::TransientLogin(format!("password field: {e}")))?;
		password_field.click().await.map_err(|e| CoreError::TransientLogin(e.to_string()))?;
		password_field
			.type_str(password)
			.await
			.map_err(|e| CoreError::TransientLogin(e.to_string()))?;

		let submit = self
			.page()
			.find_element(SUBMIT_SELECTOR)
			.await
			.map_err(|e| CoreError::TransientLogin(format!("submit button: {e}")))?;
		submit.click().await.map_err(|e| CoreError::TransientLogin(e.to_string()))?;

		let _ = tokio::time::timeout(POST_SUBMIT_WAIT, self.page().wait_for_navigation()).await;

		let current_url = self.page().url().await.ok().flatten().unwrap_or_default();
		if current_url.contains(&self.config.login_path) {
			// Still on the login page after a clean submit — the only
			// condition the spec classifies as invalid credentials rather
			// than a transient failure.
			return Ok(LoginOutcome::invalid_credentials());
		}
		Ok(LoginOutcome::success())
	}

	async fn go_to_list(&self, filter: ListFilter) -> Result<()> {
		let mut url = self.url(&self.config.list_path);
		if filter.no_visits_completed {
			url.push_str("?status=no_visits_completed");
		}
		self.page().goto(url).await.map_err(|e| CoreError::Navigation(e.to_string()))?;
		self.wait_for_marker(LIST_ROW_MARKER).await;
		Ok(())
	}

	/// Prioritized sequence per spec.md §4.3: a native `<select>` with a
	/// matching option first, then a custom component opened by clicking
	/// its `Show 25` trigger and selecting `Show 100`. Verified by reading
	/// the control back; never fatal on failure.
	async fn set_page_size(&self, size: u32) -> Result<bool> {
		let script = format!(
			r#"(function() {{
				const size = '{size}';
				for (const sel of document.querySelectorAll('select')) {{
					const opt = Array.from(sel.options).find(o => o.value.includes(size) || o.textContent.includes(size));
					if (opt) {{
						sel.value = opt.value;
						sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
						return sel.value === opt.value;
					}}
				}}
				const isLeaf = el => el.children.length === 0;
				const trigger = Array.from(document.querySelectorAll('*'))
					.find(el => isLeaf(el) && el.textContent.trim() === 'Show 25');
				if (trigger) {{
					trigger.click();
					const option = Array.from(document.querySelectorAll('*'))
						.find(el => isLeaf(el) && el.textContent.trim() === ('Show ' + size));
					if (option) {{
						option.click();
						return true;
					}}
				}}
				return false;
			}})()"#
		);
		let result = self
			.page()
			.evaluate(script)
			.await
			.map_err(|e| CoreError::ElementNotFound(e.to_string()))?;
		Ok(result.into_value::<bool>().unwrap_or(false))
	}

	async fn go_to_visit(&self, url: &str) -> Result<()> {
		self.page().goto(url).await.map_err(|e| CoreError::Navigation(e.to_string()))?;
		self.wait_for_marker(VISIT_CONTENT_MARKERS).await;
		Ok(())
	}

	async fn go_to_customer(&self, url: &str) -> Result<()> {
		self.page().goto(url).await.map_err(|e| CoreError::Navigation(e.to_string()))?;
		self.wait_for_marker(CUSTOMER_CONTENT_MARKERS).await;
		Ok(())
	}
}
