use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use automation_api::config::Config;
use automation_api::routes;
use automation_api::state::AppState;
use automation_api::ws::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_logging();

	let config = Config::from_env();
	let bind_addr = format!("{}:{}", config.bind_host, config.bind_port);
	let idle_ttl = config.idle_session_ttl;

	let state = AppState::bootstrap(config).await?;

	let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
	let scheduler = state.scheduler.clone();
	tokio::spawn(async move { scheduler.run(shutdown_rx).await });
	spawn_idle_session_sweeper(state.clone(), idle_ttl);

	let app = Router::new()
		.merge(routes::router())
		.route("/automation/ws/{token}", axum::routing::get(ws_handler))
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state);

	let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
	tracing::info!(%bind_addr, "calibration automation engine listening");
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			let _ = tokio::signal::ctrl_c().await;
			tracing::info!("shutdown signal received, draining scheduler");
			let _ = shutdown_tx.send(true);
		})
		.await?;
	Ok(())
}

fn init_logging() {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).json().init();
}

/// Sweeps sessions idle longer than `ttl` (spec.md §4.2 `close_idle`) on a
/// fixed tick, independent of the job-queue's own tick.
fn spawn_idle_session_sweeper(state: AppState, ttl: chrono::Duration) {
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs(60));
		loop {
			interval.tick().await;
			state.browser_pool.close_idle(ttl).await;
		}
	});
}
