// Backend session (component C6): one live MCP client connection per
// `ServerConfig`, stdio-spawned or dialed over streamable HTTP.

use rmcp::model::{
	CallToolRequestParam, CallToolResult, ClientCapabilities, ClientInfo, Implementation, ProtocolVersion, Tool,
};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::streamable_http_client::{StreamableHttpClientTransport, StreamableHttpClientTransportConfig};
use rmcp::ServiceExt;
use tokio::process::Command;

use super::error::BackendError;
use crate::registry::{AuthMode, ServerConfig, Transport};

/// A live connection to one backend MCP server, past the `initialize`
/// handshake.
pub struct BackendSession {
	server_id: String,
	config: ServerConfig,
	service: RunningService<RoleClient, ()>,
}

pub(crate) fn client_info() -> ClientInfo {
	ClientInfo {
		meta: None,
		protocol_version: ProtocolVersion::default(),
		capabilities: ClientCapabilities::default(),
		client_info: Implementation {
			name: "mcp-gateway".to_string(),
			title: None,
			version: env!("CARGO_PKG_VERSION").to_string(),
			website_url: None,
			icons: None,
		},
	}
}

impl BackendSession {
	/// Connects to the backend described by `config`. `bearer_token` carries
	/// the OAuth access token for servers with `auth: oauth`; it is ignored
	/// for servers with no auth.
	pub async fn connect(server_id: &str, config: &ServerConfig, bearer_token: Option<&str>) -> Result<Self, BackendError> {
		let service = if let Some(command) = &config.command {
			let mut cmd = Command::new(command);
			cmd.args(&config.args);
			for (key, value) in &config.env {
				cmd.env(key, value);
			}
			let transport = TokioChildProcess::new(cmd)
				.map_err(|source| BackendError::Spawn { server_id: server_id.to_string(), command: command.clone(), source })?;
			client_info()
				.serve(transport)
				.await
				.map_err(|e| BackendError::Initialize { server_id: server_id.to_string(), message: e.to_string() })?
		} else if let Some(url) = &config.url {
			// rmcp's client SDK no longer ships a native SSE transport; both
			// `sse` and `streamablehttp` backends are dialed over streamable
			// HTTP, which every server advertising either transport also
			// understands.
			let _ = config.transport == Transport::Sse;
			let mut transport_config = StreamableHttpClientTransportConfig::with_uri(url.as_str());
			if config.auth == AuthMode::Oauth {
				let token = bearer_token.ok_or_else(|| BackendError::OauthPending { server_id: server_id.to_string() })?;
				transport_config = transport_config.auth_header(format!("Bearer {token}"));
			}
			let transport = StreamableHttpClientTransport::from_config(transport_config);
			client_info().serve(transport).await.map_err(|e| BackendError::Connect {
				server_id: server_id.to_string(),
				url: url.clone(),
				message: e.to_string(),
			})?
		} else {
			return Err(BackendError::NoTransport { server_id: server_id.to_string() });
		};

		Ok(Self { server_id: server_id.to_string(), config: config.clone(), service })
	}

	pub fn server_id(&self) -> &str {
		&self.server_id
	}

	pub fn config(&self) -> &ServerConfig {
		&self.config
	}

	pub async fn list_tools(&self) -> Result<Vec<Tool>, BackendError> {
		self.service
			.list_all_tools()
			.await
			.map_err(|e| BackendError::ListTools { server_id: self.server_id.clone(), message: e.to_string() })
	}

	pub async fn call_tool(
		&self,
		tool_name: &str,
		arguments: Option<serde_json::Map<String, serde_json::Value>>,
	) -> Result<CallToolResult, BackendError> {
		let params = CallToolRequestParam { name: tool_name.to_string().into(), arguments };
		self.service.call_tool(params).await.map_err(|e| BackendError::CallTool {
			server_id: self.server_id.clone(),
			tool: tool_name.to_string(),
			message: e.to_string(),
		})
	}

	/// Cancels the underlying service, terminating a stdio child or closing
	/// the HTTP session.
	pub async fn shutdown(self) -> Result<(), BackendError> {
		self.service
			.cancel()
			.await
			.map_err(|e| BackendError::Shutdown { server_id: self.server_id.clone(), message: e.to_string() })?;
		Ok(())
	}
}
