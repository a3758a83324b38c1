//! Process configuration read from the environment (spec.md §6
//! "Environment"). `MASTER_KEY` itself is read directly by
//! `CredentialVault::from_env` — this struct owns everything else.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
	pub bind_host: String,
	pub bind_port: u16,
	pub data_dir: PathBuf,
	pub browser_visible: bool,
	pub max_concurrent_jobs: usize,
	pub dev_mode: bool,
	pub idle_session_ttl: chrono::Duration,
	/// Tokens accepted after an `admin:` prefix, granting `is_admin` for any
	/// `user_id` (spec.md §6's authorization rule). Identity-provider
	/// integration is out of scope (spec.md §1); this is the simplest bearer
	/// scheme that satisfies the rule without one.
	pub admin_tokens: Vec<String>,
}

impl Config {
	pub fn from_env() -> Self {
		Self {
			bind_host: std::env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
			bind_port: std::env::var("BIND_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080),
			data_dir: std::env::var("DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./data")),
			browser_visible: env_bool("BROWSER_VISIBLE", false),
			max_concurrent_jobs: std::env::var("MAX_CONCURRENT_JOBS").ok().and_then(|v| v.parse().ok()).unwrap_or(3),
			dev_mode: env_bool("DEV_MODE", false),
			idle_session_ttl: chrono::Duration::minutes(30),
			admin_tokens: std::env::var("ADMIN_TOKENS")
				.ok()
				.map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
				.unwrap_or_default(),
		}
	}
}

fn env_bool(key: &str, default: bool) -> bool {
	std::env::var(key).ok().map(|v| v.eq_ignore_ascii_case("true") || v == "1").unwrap_or(default)
}
