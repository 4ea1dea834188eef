// Client-bridge mode (spec §6): connects to a single remote MCP server and
// re-exposes it over stdio, for use as a subprocess MCP server from tools
// (e.g. Claude Desktop) that only speak stdio. Unlike the gateway, there is
// no virtual-tool layer here: `tools/list` and `tools/call` pass straight
// through to the remote session.

use std::sync::Arc;

use rmcp::model::{
	CallToolRequestParam, CallToolResult, ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo,
	ToolsCapability,
};
use rmcp::service::{RequestContext, RoleClient, RoleServer, RunningService};
use rmcp::transport::streamable_http_client::{StreamableHttpClientTransport, StreamableHttpClientTransportConfig};
use rmcp::{ErrorData, ServerHandler, ServiceExt};

use crate::backend::session::client_info;

#[derive(Clone)]
pub struct BridgeHandler {
	remote: Arc<RunningService<RoleClient, ()>>,
}

impl ServerHandler for BridgeHandler {
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
		let tools = self
			.remote
			.list_all_tools()
			.await
			.map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
		Ok(ListToolsResult { tools, next_cursor: None })
	}

	async fn call_tool(
		&self,
		request: CallToolRequestParam,
		_context: RequestContext<RoleServer>,
	) -> Result<CallToolResult, ErrorData> {
		self.remote.call_tool(request).await.map_err(|e| ErrorData::internal_error(e.to_string(), None))
	}
}

/// Connects to `url` and serves the connection over stdio until the client
/// disconnects. `bearer_token` carries `API_ACCESS_TOKEN`, when set, as an
/// `Authorization` header on the remote connection.
pub async fn run(url: &str, bearer_token: Option<&str>) -> anyhow::Result<()> {
	let mut transport_config = StreamableHttpClientTransportConfig::with_uri(url);
	if let Some(token) = bearer_token {
		transport_config = transport_config.auth_header(format!("Bearer {token}"));
	}
	let transport = StreamableHttpClientTransport::from_config(transport_config);
	let remote = client_info().serve(transport).await?;

	let handler = BridgeHandler { remote: Arc::new(remote) };
	let server = handler.serve(rmcp::transport::io::stdio()).await?;
	server.waiting().await?;
	Ok(())
}
