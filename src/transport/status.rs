// Liveness + last-activity tracking (`GET /status`). Every MCP-touching
// request bumps the timestamp; the Python original keeps this as a single
// global value rather than per-backend, which this mirrors.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

#[derive(Default)]
pub struct ActivityClock {
	last_activity_unix: AtomicI64,
}

impl ActivityClock {
	pub fn new() -> Arc<Self> {
		let clock = Self { last_activity_unix: AtomicI64::new(Utc::now().timestamp()) };
		Arc::new(clock)
	}

	pub fn bump(&self) {
		self.last_activity_unix.store(Utc::now().timestamp(), Ordering::Relaxed);
	}

	fn last_activity_iso(&self) -> String {
		let secs = self.last_activity_unix.load(Ordering::Relaxed);
		chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now).to_rfc3339()
	}
}

pub async fn handle_status(State(clock): State<Arc<ActivityClock>>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"api_last_activity": clock.last_activity_iso(),
	}))
}
