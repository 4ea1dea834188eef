// Gateway dispatcher (component C7): routes `tools/list` and
// `tools/call` against the compiled virtual-tool registry, merging
// hidden defaults and running the output transformation pipeline
// (C1-C3) over whatever the backend returned.

use std::collections::HashMap;

use rmcp::model::CallToolResult;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{AttachOutcome, BackendError, BackendManager};
use crate::registry::VirtualTool;
use crate::{json_detect, jsonpath, markdown};

/// The six error kinds from spec §7. None of these are process-fatal;
/// each maps to a JSON-RPC error the transport surface returns to the
/// caller.
#[derive(Error, Debug)]
pub enum DispatchError {
	#[error("unknown tool '{0}'")]
	UnknownTool(String),

	#[error("tool '{0}' is disabled")]
	DisabledTool(String),

	#[error("server '{0}' requires authorization before this tool can be called")]
	AuthRequired(String),

	#[error("backend for tool '{0}' is not available")]
	BackendUnavailable(String),

	#[error("backend error calling '{0}': {1}")]
	BackendError(String, String),

	#[error("bad input for tool '{0}': {1}")]
	BadInput(String, String),
}

/// The gateway's post-transformation view of a tool call result: content
/// text for clients that only read `content`, and structured content for
/// clients that read `structuredContent`.
pub struct DispatchedResult {
	pub text: Option<String>,
	pub structured_content: Option<Value>,
}

pub struct Dispatcher {
	tools: RwLock<Vec<VirtualTool>>,
	index: HashMap<String, usize>,
	backends: BackendManager,
}

impl Dispatcher {
	pub fn new(tools: Vec<VirtualTool>, backends: BackendManager) -> Self {
		let index = tools.iter().enumerate().map(|(i, t)| (t.name.clone(), i)).collect();
		Self { tools: RwLock::new(tools), index, backends }
	}

	/// Virtual tools advertised to clients. Strict-disabled tools stay in
	/// this listing for stable visibility; only `call_tool` refuses them
	/// (spec §4.7).
	pub async fn list_tools(&self) -> Vec<VirtualTool> {
		self.tools.read().await.clone()
	}

	pub async fn call_tool(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<DispatchedResult, DispatchError> {
		let tool = {
			let tools = self.tools.read().await;
			let idx = *self.index.get(name).ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;
			let tool = &tools[idx];
			if tool.is_disabled() {
				return Err(DispatchError::DisabledTool(name.to_string()));
			}
			tool.clone()
		};

		if self.backends.session(&tool.server_id).await.is_none() {
			if self.backends.is_pending_oauth(&tool.server_id).await {
				return Err(DispatchError::AuthRequired(tool.server_id.clone()));
			}
			return Err(DispatchError::BackendUnavailable(tool.server_id.clone()));
		}

		let session = self.backends.session(&tool.server_id).await.expect("checked above");

		let final_args = merge_defaults(arguments.unwrap_or_default(), &tool.defaults);

		debug!(target: "dispatcher", "routing call '{}' -> '{}' (backend '{}')", name, tool.target_name(), tool.server_id);

		let result = session
			.call_tool(tool.target_name(), Some(final_args))
			.await
			.map_err(|e| DispatchError::BackendError(name.to_string(), e.to_string()))?;

		if result.is_error == Some(true) {
			return Err(DispatchError::BackendError(name.to_string(), first_text(&result).unwrap_or_default()));
		}

		Ok(transform_result(&tool, &result))
	}

	/// Connects a pending-oauth server once a token is available, and
	/// re-runs drift validation on its tools against the now-live backend
	/// (spec's "pending oauth backend" lifecycle). `server_url` is the value
	/// a client supplies on the OAuth ingress endpoint, matched against the
	/// `url` of a backend still in the pending map.
	pub async fn attach_oauth(&self, server_url: &str, token: &str) -> Result<AttachOutcome, BackendError> {
		let mut tools = self.tools.write().await;
		self.backends.attach_oauth_by_url(server_url, token, &mut tools).await
	}

	/// Closes every live backend session in reverse start order (spec §5).
	pub async fn shutdown(&self) {
		self.backends.shutdown().await;
	}
}

/// Applies hidden defaults on top of caller-supplied arguments. Defaulted
/// fields are removed from the advertised schema (invariant 3) precisely
/// so a caller cannot know to supply them; this also means a caller
/// cannot override them by guessing the key.
fn merge_defaults(mut args: Map<String, Value>, defaults: &Map<String, Value>) -> Map<String, Value> {
	for (key, value) in defaults {
		args.insert(key.clone(), value.clone());
	}
	args
}

fn first_text(result: &CallToolResult) -> Option<String> {
	result.content.iter().find_map(|c| match &c.raw {
		rmcp::model::RawContent::Text(t) => Some(t.text.clone()),
		_ => None,
	})
}

/// Output transformation pipeline: native structured content wins, else
/// JSON recovered from text (C2), else a configured markdown list parse
/// (C3), else the raw text untouched. A declared `output_schema` then
/// projects whatever content was produced (C1).
fn transform_result(tool: &VirtualTool, result: &CallToolResult) -> DispatchedResult {
	let raw_value = serde_json::to_value(result).unwrap_or(Value::Null);

	let mut content: Option<Value> = result.structured_content.clone();

	if content.is_none() {
		content = json_detect::extract_json_from_tool_result(&raw_value);
	}

	if content.is_none() {
		if let Some(extraction) = &tool.text_extraction {
			if let Some(text) = first_text(result) {
				content = markdown::extract_markdown_list(&text, extraction);
			}
		}
	}

	match content {
		Some(mut value) => {
			if let Some(output_schema) = &tool.output_schema {
				value = jsonpath::project(&value, output_schema);
			}
			let text = serde_json::to_string(&value).ok();
			DispatchedResult { text, structured_content: Some(value) }
		},
		None => DispatchedResult { text: first_text(result), structured_content: None },
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::registry::{ValidationMode, ValidationStatus};

	fn make_tool(name: &str) -> VirtualTool {
		VirtualTool {
			name: name.to_string(),
			description: None,
			input_schema: json!({"type": "object", "properties": {}}),
			server_id: "srv".to_string(),
			original_name: None,
			defaults: Map::new(),
			output_schema: None,
			text_extraction: None,
			source: None,
			expected_schema_hash: None,
			computed_schema_hash: None,
			validation_mode: ValidationMode::Strict,
			validation_status: ValidationStatus::Valid,
			validation_message: None,
			source_version_pin: None,
		}
	}

	#[test]
	fn merge_defaults_always_wins_for_defaulted_keys() {
		let mut defaults = Map::new();
		defaults.insert("api_key".to_string(), json!("fixed"));
		let mut args = Map::new();
		args.insert("api_key".to_string(), json!("attacker-supplied"));
		args.insert("query".to_string(), json!("hello"));

		let merged = merge_defaults(args, &defaults);
		assert_eq!(merged["api_key"], json!("fixed"));
		assert_eq!(merged["query"], json!("hello"));
	}

	#[tokio::test]
	async fn unknown_tool_is_an_error() {
		let tools = vec![make_tool("known")];
		let backends = BackendManager::startup(&Default::default(), &mut Vec::new()).await;
		let dispatcher = Dispatcher::new(tools, backends);
		let err = dispatcher.call_tool("missing", None).await.unwrap_err();
		assert!(matches!(err, DispatchError::UnknownTool(n) if n == "missing"));
	}

	#[tokio::test]
	async fn disabled_tool_is_rejected_before_backend_lookup() {
		let mut tool = make_tool("broken");
		tool.validation_mode = ValidationMode::Strict;
		tool.validation_status = ValidationStatus::Error;
		let dispatcher = Dispatcher::new(vec![tool], BackendManager::startup(&Default::default(), &mut Vec::new()).await);
		let err = dispatcher.call_tool("broken", None).await.unwrap_err();
		assert!(matches!(err, DispatchError::DisabledTool(n) if n == "broken"));
	}

	#[tokio::test]
	async fn unconnected_backend_is_unavailable() {
		let dispatcher =
			Dispatcher::new(vec![make_tool("t")], BackendManager::startup(&Default::default(), &mut Vec::new()).await);
		let err = dispatcher.call_tool("t", None).await.unwrap_err();
		assert!(matches!(err, DispatchError::BackendUnavailable(s) if s == "srv"));
	}

	#[tokio::test]
	async fn list_tools_includes_disabled_but_rejects_calls() {
		let mut ok = make_tool("ok");
		ok.validation_status = ValidationStatus::Valid;
		let mut disabled = make_tool("bad");
		disabled.validation_mode = ValidationMode::Strict;
		disabled.validation_status = ValidationStatus::Error;
		let backends = BackendManager::startup(&Default::default(), &mut Vec::new()).await;
		let dispatcher = Dispatcher::new(vec![ok, disabled], backends);

		let listed: Vec<String> = dispatcher.list_tools().await.into_iter().map(|t| t.name).collect();
		assert_eq!(listed, vec!["ok".to_string(), "bad".to_string()]);

		let err = dispatcher.call_tool("bad", None).await.unwrap_err();
		assert!(matches!(err, DispatchError::DisabledTool(n) if n == "bad"));
	}
}
