// `GET /sse` and `POST /messages/`: the legacy HTTP+SSE MCP transport.
//
// rmcp's client SDK dropped its SSE transport in the 0.12 line
// (https://github.com/modelcontextprotocol/rust-sdk/pull/562), and nothing
// in this tree replaces it on the server side either. Rather than
// hand-roll an SSE framing layer with no upstream implementation to check
// it against, these routes identify themselves and point callers at the
// streamable-HTTP endpoint, which carries the same JSON-RPC methods.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

const DEPRECATION_MESSAGE: &str =
	"the sse transport is not served here; connect over streamable-http at /mcp instead";

pub async fn handle_sse_get() -> (StatusCode, Json<Value>) {
	(StatusCode::GONE, Json(json!({"error": DEPRECATION_MESSAGE})))
}

pub async fn handle_messages_post() -> (StatusCode, Json<Value>) {
	(StatusCode::GONE, Json(json!({"error": DEPRECATION_MESSAGE})))
}
