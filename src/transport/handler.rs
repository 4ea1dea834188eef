// Bridges the gateway dispatcher (C7) to rmcp's `ServerHandler` trait, the
// seam the streamable-HTTP service below drives per inbound session.

use std::sync::Arc;

use rmcp::model::{
	CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam, ServerCapabilities,
	ServerInfo, Tool as McpTool, ToolsCapability,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ErrorData;
use rmcp::ServerHandler;

use crate::dispatcher::{DispatchError, Dispatcher};
use crate::registry::VirtualTool;

#[derive(Clone)]
pub struct GatewayHandler {
	dispatcher: Arc<Dispatcher>,
}

impl GatewayHandler {
	pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
		Self { dispatcher }
	}
}

fn to_mcp_tool(tool: &VirtualTool) -> McpTool {
	let input_schema = tool.input_schema.as_object().cloned().unwrap_or_default();
	let output_schema = tool
		.output_schema
		.as_ref()
		.map(crate::jsonpath::strip_source_fields)
		.and_then(|v| v.as_object().cloned())
		.map(Arc::new);

	McpTool {
		name: tool.name.clone().into(),
		title: None,
		description: tool.description.clone().map(Into::into),
		input_schema: Arc::new(input_schema),
		output_schema,
		annotations: None,
		icons: None,
		meta: None,
	}
}

/// Maps the dispatcher's error kinds (spec §7) onto a JSON-RPC shape. The
/// first three correspond to conditions the caller can't fix by retrying
/// the same call and are surfaced as protocol-level errors; the backend and
/// bad-input kinds are forwarded as an `isError` tool result, matching how
/// a backend reports its own failures.
fn dispatch_error_to_result(err: DispatchError) -> Result<CallToolResult, ErrorData> {
	match err {
		DispatchError::UnknownTool(_) => Err(ErrorData::invalid_params(err.to_string(), None)),
		DispatchError::DisabledTool(_) => Err(ErrorData::invalid_request(err.to_string(), None)),
		DispatchError::AuthRequired(_) => Err(ErrorData::invalid_request(err.to_string(), None)),
		DispatchError::BackendUnavailable(_) | DispatchError::BackendError(_, _) | DispatchError::BadInput(_, _) => {
			Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
		},
	}
}

impl ServerHandler for GatewayHandler {
	fn get_info(&self) -> ServerInfo {
		ServerInfo {
			capabilities: ServerCapabilities { tools: Some(ToolsCapability::default()), ..Default::default() },
			..Default::default()
		}
	}

	async fn list_tools(
		&self,
		_request: Option<PaginatedRequestParam>,
		_context: RequestContext<RoleServer>,
	) -> Result<ListToolsResult, ErrorData> {
		let tools = self.dispatcher.list_tools().await;
		Ok(ListToolsResult { tools: tools.iter().map(to_mcp_tool).collect(), next_cursor: None })
	}

	async fn call_tool(
		&self,
		request: CallToolRequestParam,
		_context: RequestContext<RoleServer>,
	) -> Result<CallToolResult, ErrorData> {
		match self.dispatcher.call_tool(request.name.as_ref(), request.arguments).await {
			Ok(dispatched) => {
				let content = dispatched.text.into_iter().map(Content::text).collect();
				Ok(CallToolResult { structured_content: dispatched.structured_content, ..CallToolResult::success(content) })
			},
			Err(err) => dispatch_error_to_result(err),
		}
	}
}
