// Backend session manager (component C6): owns one session per
// non-oauth `ServerConfig` from startup, and lazily attaches oauth-gated
// servers when a token arrives over the ingress endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::error::BackendError;
use super::session::BackendSession;
use super::validation::validate_backend_tools;
use crate::registry::{AuthMode, ServerConfig, VirtualTool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
	Connected,
	AlreadyConnected,
}

pub struct BackendManager {
	sessions: RwLock<std::collections::HashMap<String, Arc<BackendSession>>>,
	pending_oauth: RwLock<std::collections::HashMap<String, ServerConfig>>,
	/// Insertion order of `sessions`, oldest first, so shutdown can run in
	/// reverse (LIFO: most recently started session is torn down first).
	start_order: RwLock<Vec<String>>,
}

impl BackendManager {
	/// Connects every non-oauth server in `servers` and validates each
	/// one's tools against the live backend. Oauth-gated servers are
	/// recorded as pending and connected later via `attach_oauth`. `tools`
	/// is mutated in place with validation results; once this returns, the
	/// registry is frozen and the gateway is ready to serve.
	pub async fn startup(servers: &BTreeMap<String, ServerConfig>, tools: &mut [VirtualTool]) -> Self {
		let manager = Self {
			sessions: RwLock::new(std::collections::HashMap::new()),
			pending_oauth: RwLock::new(std::collections::HashMap::new()),
			start_order: RwLock::new(Vec::new()),
		};

		for (server_id, config) in servers {
			if config.auth == AuthMode::Oauth {
				info!(target: "backend", "server '{}' requires oauth; deferring connection", server_id);
				manager.pending_oauth.write().await.insert(server_id.clone(), config.clone());
				continue;
			}

			match BackendSession::connect(server_id, config, None).await {
				Ok(session) => {
					if let Ok(backend_tools) = session.list_tools().await {
						let disabled = validate_backend_tools(server_id, tools, &backend_tools);
						if !disabled.is_empty() {
							warn!(target: "backend", "server '{}' disabled tools on validation failure: {:?}", server_id, disabled);
						}
					} else {
						warn!(target: "backend", "server '{}' connected but tools/list failed", server_id);
					}
					manager.sessions.write().await.insert(server_id.clone(), Arc::new(session));
					manager.start_order.write().await.push(server_id.clone());
				},
				Err(e) => {
					error!(target: "backend", "server '{}' failed to start: {}", server_id, e);
				},
			}
		}

		manager
	}

	/// Connects an oauth-gated server once a token is available, idempotent
	/// per spec §4.6 (a repeat call with an already-connected server is a
	/// no-op, not an error). The OAuth ingress endpoint identifies the
	/// backend by `server_url` (spec §6), not by its content-hash id, so
	/// this resolves the id by scanning pending configs for a matching url
	/// before delegating to `attach_oauth`.
	pub async fn attach_oauth_by_url(
		&self,
		server_url: &str,
		token: &str,
		tools: &mut [VirtualTool],
	) -> Result<AttachOutcome, BackendError> {
		let already_active = self
			.sessions
			.read()
			.await
			.values()
			.any(|session| session.config().url.as_deref() == Some(server_url));
		if already_active {
			return Ok(AttachOutcome::AlreadyConnected);
		}

		let server_id = self
			.pending_oauth
			.read()
			.await
			.iter()
			.find(|(_, config)| config.url.as_deref() == Some(server_url))
			.map(|(id, _)| id.clone())
			.ok_or_else(|| BackendError::UnknownServer { server_id: server_url.to_string() })?;

		self.attach_oauth(&server_id, token, tools).await
	}

	/// Connects an oauth-gated server once a token is available, idempotent
	/// per spec §4.6 (a repeat call with an already-connected server is a
	/// no-op, not an error).
	pub async fn attach_oauth(
		&self,
		server_id: &str,
		token: &str,
		tools: &mut [VirtualTool],
	) -> Result<AttachOutcome, BackendError> {
		if self.sessions.read().await.contains_key(server_id) {
			return Ok(AttachOutcome::AlreadyConnected);
		}

		let config = self
			.pending_oauth
			.read()
			.await
			.get(server_id)
			.cloned()
			.ok_or_else(|| BackendError::UnknownServer { server_id: server_id.to_string() })?;

		let session = BackendSession::connect(server_id, &config, Some(token)).await?;
		if let Ok(backend_tools) = session.list_tools().await {
			validate_backend_tools(server_id, tools, &backend_tools);
		}

		self.sessions.write().await.insert(server_id.to_string(), Arc::new(session));
		self.start_order.write().await.push(server_id.to_string());
		self.pending_oauth.write().await.remove(server_id);

		Ok(AttachOutcome::Connected)
	}

	pub async fn session(&self, server_id: &str) -> Option<Arc<BackendSession>> {
		self.sessions.read().await.get(server_id).cloned()
	}

	pub async fn is_pending_oauth(&self, server_id: &str) -> bool {
		self.pending_oauth.read().await.contains_key(server_id)
	}

	/// Tears down every live session in reverse start order.
	pub async fn shutdown(&self) {
		let order = std::mem::take(&mut *self.start_order.write().await);
		let mut sessions = self.sessions.write().await;
		for server_id in order.into_iter().rev() {
			if let Some(session) = sessions.remove(&server_id) {
				match Arc::try_unwrap(session) {
					Ok(session) => {
						if let Err(e) = session.shutdown().await {
							warn!(target: "backend", "error shutting down '{}': {}", server_id, e);
						}
					},
					Err(_) => warn!(target: "backend", "server '{}' still has outstanding references at shutdown", server_id),
				}
			}
		}
	}
}
