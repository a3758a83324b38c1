//! `GET /automation/ws/{token}` (spec.md §6): pushes progress events to a
//! connected client. Grounded on the teacher's `handle_client_socket` /
//! `handle_extension_socket` pair (`crates/cli/src/relay.rs`) — a spawned
//! forwarding task draining an mpsc channel into the socket's write half
//! while the read half is polled in the foreground loop for client frames
//! (here, just pings).

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use automation_protocol::progress::{Phase, ProgressEvent};
use automation_protocol::ws::{WsFrame, WsFrameType};

use crate::auth::parse_token;
use crate::state::AppState;

pub async fn ws_handler(State(state): State<AppState>, Path(token): Path<String>, ws: WebSocketUpgrade) -> axum::response::Response {
	let auth = match parse_token(&state, &token) {
		Ok(auth) => auth,
		Err(err) => return err.into_response(),
	};
	ws.on_upgrade(move |socket| handle_socket(socket, state, auth.user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: uuid::Uuid) {
	let (mut sink, mut stream) = socket.split();
	let (_subscription, mut receiver) = state.bus.subscribe(user_id);

	let forward_task = tokio::spawn(async move {
		loop {
			match receiver.recv().await {
				Ok(event) => {
					let frame = frame_for(&event);
					let Ok(text) = serde_json::to_string(&frame) else { continue };
					if sink.send(Message::Text(text.into())).await.is_err() {
						break;
					}
				}
				Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
					tracing::warn!(%user_id, skipped, "progress subscriber lagged, oldest events dropped");
				}
				Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
			}
		}
	});

	while let Some(msg) = stream.next().await {
		match msg {
			Ok(Message::Close(_)) => break,
			Ok(Message::Ping(_)) | Ok(Message::Text(_)) => {
				// Client pings are ignored or implicitly answered by the
				// transport-level pong; no application-level reply needed
				// beyond what the progress stream already pushes.
			}
			Ok(_) => {}
			Err(_) => break,
		}
	}

	forward_task.abort();
}

/// Best-effort classification of a bus event into the wire frame type set
/// (spec.md §6). `ProgressEvent` itself doesn't carry a job-kind tag, so
/// this infers from phase/error/dispenser-id shape.
fn frame_for(event: &ProgressEvent) -> WsFrame {
	let kind = if event.error.is_some() {
		WsFrameType::AutomationError
	} else if event.phase.0 == Phase::COMPLETION && event.percentage >= 100 {
		WsFrameType::AutomationComplete
	} else if event.phase.0 == Phase::SCRAPING {
		WsFrameType::ScrapingProgress
	} else if event.dispenser_id.is_some() {
		WsFrameType::BatchAutomationProgress
	} else if matches!(
		event.phase.0.as_str(),
		Phase::FORM_DETECTION | Phase::FORM_PREPARATION | Phase::FORM_FILLING | Phase::DISPENSER_AUTOMATION | Phase::VALIDATION
	) {
		WsFrameType::FormAutomationProgress
	} else {
		WsFrameType::AutomationProgress
	};

	WsFrame::new(
		kind,
		serde_json::json!({
			"job_id": event.job_id,
			"phase": event.phase.0,
			"percentage": event.percentage,
			"message": event.message,
			"dispenser_id": event.dispenser_id,
			"error": event.error,
			"timestamp": event.timestamp,
		}),
	)
}
