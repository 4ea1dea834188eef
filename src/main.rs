use std::env;
use std::sync::Arc;

use clap::Parser;
use mcp_gateway::backend::BackendManager;
use mcp_gateway::cli::Cli;
use mcp_gateway::dispatcher::Dispatcher;
use mcp_gateway::{bridge, logging, registry, transport};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	logging::init_tracing(cli.effective_log_level());

	if cli.is_client_bridge_mode() {
		let url = cli.command_or_url.as_deref().expect("checked by is_client_bridge_mode");
		let token = env::var("API_ACCESS_TOKEN").ok();
		bridge::run(url, token.as_deref()).await?;
		return Ok(());
	}

	info!(target: "gateway", "configuring MCP gateway");

	let Some(config_path) = &cli.named_server_config else {
		eprintln!("error: registry file is required; use --named-server-config");
		std::process::exit(2);
	};

	let loaded = match registry::load_from_file(config_path) {
		Ok(loaded) => loaded,
		Err(e) => {
			error!(target: "gateway", "failed to load registry: {}", e);
			std::process::exit(1);
		},
	};

	let mut tools = loaded.tools;
	let backends = BackendManager::startup(&loaded.servers, &mut tools).await;
	let dispatcher = Arc::new(Dispatcher::new(tools, backends));

	let router = transport::build_router(dispatcher.clone(), &cli.server.allow_origin);

	let addr = format!("{}:{}", cli.server.host, cli.server.port);
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	let bound_addr = listener.local_addr()?;
	info!(target: "gateway", "listening on http://{}", bound_addr);
	info!(target: "gateway", "mcp endpoint: http://{}/mcp", bound_addr);

	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

	dispatcher.shutdown().await;
	Ok(())
}

async fn shutdown_signal() {
	tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
	info!(target: "gateway", "shutdown signal received");
}
