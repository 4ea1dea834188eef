// Command-line surface (spec §6). Two run modes share one argument set:
// a bare `http(s)://` URL selects client-bridge mode (expose a remote MCP
// server as a local stdio server); otherwise `--named-server-config` is
// required and the process runs as a gateway.

use clap::{Parser, ValueEnum};

/// MCP Gateway: aggregates backend MCP servers behind one virtual tool
/// surface, or bridges a single remote server to stdio.
#[derive(Parser, Debug)]
#[command(name = "mcp-gateway", version, about)]
pub struct Cli {
	/// URL to connect to for client-bridge mode. Omit when running as a
	/// gateway with `--named-server-config`.
	pub command_or_url: Option<String>,

	/// Path to the JSON registry file. Required for gateway mode.
	#[arg(long, value_name = "FILE_PATH")]
	pub named_server_config: Option<String>,

	#[command(flatten)]
	pub client: ClientArgs,

	#[command(flatten)]
	pub server: ServerArgs,
}

#[derive(clap::Args, Debug)]
pub struct ClientArgs {
	/// Header to pass to the bridged backend, `KEY VALUE`. Repeatable.
	#[arg(short = 'H', long = "headers", num_args = 2, value_names = ["KEY", "VALUE"])]
	pub headers: Vec<String>,

	/// Transport for client-bridge mode.
	#[arg(long, value_enum, default_value_t = ClientTransport::Sse)]
	pub transport: ClientTransport,

	#[arg(long)]
	pub client_id: Option<String>,

	#[arg(long)]
	pub client_secret: Option<String>,

	#[arg(long)]
	pub token_url: Option<String>,

	/// Control SSL verification: omit the value to force verification, pass
	/// `false` to disable, or give a path to a PEM bundle.
	#[arg(long, num_args = 0..=1, default_missing_value = "true")]
	pub verify_ssl: Option<String>,

	/// Disable SSL verification. Alias for `--verify-ssl false`.
	#[arg(long, conflicts_with = "verify_ssl")]
	pub no_verify_ssl: bool,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
	/// Pass through the gateway process's own environment when spawning
	/// stdio backend servers.
	#[arg(long)]
	pub pass_environment: bool,

	#[arg(long, value_enum, default_value_t = LogLevel::Info)]
	pub log_level: LogLevel,

	/// Shorthand for `--log-level debug`; takes precedence if both are set.
	#[arg(long)]
	pub debug: bool,

	#[arg(long, default_value_t = 0)]
	pub port: u16,

	#[arg(long, default_value = "127.0.0.1")]
	pub host: String,

	/// Enable stateless mode for the streamable-HTTP transport.
	#[arg(long)]
	pub stateless: bool,

	/// Allowed CORS origins. Repeatable; default is no CORS.
	#[arg(long, num_args = 1..)]
	pub allow_origin: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ClientTransport {
	Sse,
	Streamablehttp,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
	Debug,
	Info,
	Warning,
	Error,
	Critical,
}

impl LogLevel {
	pub fn as_tracing_level(&self) -> &'static str {
		match self {
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warning => "warn",
			LogLevel::Error => "error",
			LogLevel::Critical => "error",
		}
	}
}

impl Cli {
	/// True when `command_or_url` looks like a remote MCP endpoint rather
	/// than a bare registry path — the same prefix check the original
	/// entry point uses to pick client-bridge mode over gateway mode.
	pub fn is_client_bridge_mode(&self) -> bool {
		self.command_or_url.as_deref().is_some_and(|s| s.starts_with("http://") || s.starts_with("https://"))
	}

	pub fn effective_log_level(&self) -> LogLevel {
		if self.server.debug {
			LogLevel::Debug
		} else {
			self.server.log_level
		}
	}
}
