// OAuth-token ingress (`POST /oauth/connect`, spec §4.6/§6): the one route
// that can mutate the otherwise-frozen backend map after startup.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::backend::AttachOutcome;
use crate::dispatcher::Dispatcher;

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
	pub server_url: String,
	pub token: String,
}

pub async fn handle_connect(
	State(dispatcher): State<Arc<Dispatcher>>,
	body: Result<Json<ConnectRequest>, axum::extract::rejection::JsonRejection>,
) -> (StatusCode, Json<Value>) {
	let Json(request) = match body {
		Ok(body) => body,
		Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))),
	};

	if request.server_url.trim().is_empty() || request.token.trim().is_empty() {
		return (StatusCode::BAD_REQUEST, Json(json!({"error": "server_url and token are required"})));
	}

	match dispatcher.attach_oauth(&request.server_url, &request.token).await {
		Ok(AttachOutcome::Connected) => (StatusCode::OK, Json(json!({"status": "connected"}))),
		Ok(AttachOutcome::AlreadyConnected) => (StatusCode::OK, Json(json!({"status": "already_connected"}))),
		Err(e) => {
			warn!(target: "transport", "oauth attach for '{}' failed: {}", request.server_url, e);
			(StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()})))
		},
	}
}
