// Protocol transport surface (component C8): the axum app that fronts the
// gateway dispatcher over streamable-HTTP MCP, plus the status and OAuth
// ingress side-channels.

pub mod handler;
pub mod oauth;
pub mod sse;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use tower_http::cors::{Any, CorsLayer};

pub use handler::GatewayHandler;
pub use status::ActivityClock;

use crate::dispatcher::Dispatcher;

/// Builds the gateway's axum `Router`. `allow_origins` enables CORS for the
/// listed origins on every route when non-empty; an empty list leaves CORS
/// unconfigured, matching spec §4.8's "optional CORS preflight".
pub fn build_router(dispatcher: Arc<Dispatcher>, allow_origins: &[String]) -> Router {
	let activity = ActivityClock::new();
	let handler = GatewayHandler::new(dispatcher.clone());

	let streamable_config = StreamableHttpServerConfig { sse_keep_alive: Some(Duration::from_secs(15)), stateful_mode: true };
	let streamable_service =
		StreamableHttpService::new(move || Ok(handler.clone()), Arc::new(LocalSessionManager::default()), streamable_config);

	// Path normalized to `/mcp/` with no redirect (spec §4.8): both routes
	// are handled by the same service instance instead of a 3xx bounce,
	// which would drop the request body on a POST.
	let mcp_route = Router::new()
		.route("/mcp", axum::routing::any({
			let service = streamable_service.clone();
			move |req: Request| {
				let service = service.clone();
				async move { service.handle(req).await }
			}
		}))
		.route("/mcp/", axum::routing::any({
			let service = streamable_service.clone();
			move |req: Request| {
				let service = service.clone();
				async move { service.handle(req).await }
			}
		}))
		.layer(axum::middleware::from_fn_with_state(activity.clone(), bump_activity));

	let sse_route = Router::new()
		.route("/sse", get(sse::handle_sse_get))
		.route("/messages/", post(sse::handle_messages_post))
		.layer(axum::middleware::from_fn_with_state(activity.clone(), bump_activity));

	let status_route = Router::new().route("/status", get(status::handle_status)).with_state(activity);

	let oauth_route = Router::new().route("/oauth/connect", post(oauth::handle_connect)).with_state(dispatcher);

	let mut router = Router::new().merge(mcp_route).merge(sse_route).merge(status_route).merge(oauth_route);

	if !allow_origins.is_empty() {
		let origins: Vec<HeaderValue> = allow_origins.iter().filter_map(|o| o.parse().ok()).collect();
		router = router.layer(CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any));
	}

	router
}

async fn bump_activity(State(clock): State<Arc<ActivityClock>>, request: Request, next: Next) -> Response {
	clock.bump();
	next.run(request).await
}
