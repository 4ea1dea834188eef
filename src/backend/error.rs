use thiserror::Error;

/// Failures from spawning, connecting to, or calling a backend MCP server.
/// Per spec §7 these map onto the dispatcher's `backend-unavailable` and
/// `backend-error` kinds; none of them are fatal to the gateway process.
#[derive(Error, Debug)]
pub enum BackendError {
	#[error("server '{server_id}' has no command or url configured")]
	NoTransport { server_id: String },

	#[error("failed to spawn '{command}' for server '{server_id}': {source}")]
	Spawn { server_id: String, command: String, source: std::io::Error },

	#[error("failed to connect to server '{server_id}' at '{url}': {message}")]
	Connect { server_id: String, url: String, message: String },

	#[error("mcp initialize failed for server '{server_id}': {message}")]
	Initialize { server_id: String, message: String },

	#[error("tools/list failed for server '{server_id}': {message}")]
	ListTools { server_id: String, message: String },

	#[error("tools/call '{tool}' failed on server '{server_id}': {message}")]
	CallTool { server_id: String, tool: String, message: String },

	#[error("server '{server_id}' requires oauth and has not been connected yet")]
	OauthPending { server_id: String },

	#[error("unknown server id '{server_id}'")]
	UnknownServer { server_id: String },

	#[error("shutdown of server '{server_id}' failed: {message}")]
	Shutdown { server_id: String, message: String },
}
