// End-to-end scenarios from spec §8 (S1-S6), driven against real registry
// fixture files and the public registry/validation/dispatch pipeline.
// Scenarios that require a live backend connection (S5's successful
// attach) are covered only up to the boundary this crate can exercise
// without a real MCP server to dial: the auth-required rejection before
// attach, and a failed attach against an unreachable url.

use std::collections::BTreeMap;

use mcp_gateway::backend::BackendManager;
use mcp_gateway::dispatcher::{DispatchError, Dispatcher};
use mcp_gateway::jsonpath;
use mcp_gateway::registry::{self, ValidationMode, ValidationStatus};
use serde_json::json;
use tempfile::NamedTempFile;

fn write_registry(json: &serde_json::Value) -> NamedTempFile {
	let file = NamedTempFile::with_suffix(".json").expect("tempfile");
	std::fs::write(file.path(), serde_json::to_string_pretty(json).unwrap()).expect("write fixture");
	file
}

/// S1. Time-server projection: a `source_field` output schema recovers one
/// field from a JSON-in-text backend reply.
#[test]
fn s1_time_server_projection() {
	let backend_text = json!({
		"timezone": "America/Los_Angeles",
		"datetime": "2025-12-23T08:40:38-08:00",
		"day_of_week": "Tuesday",
		"is_dst": false
	})
	.to_string();

	let detected = mcp_gateway::json_detect::detect_json_in_text(&backend_text).expect("json recoverable from text");

	let output_schema = json!({
		"type": "object",
		"properties": {
			"day_of_week": {"type": "string", "source_field": "$.day_of_week"}
		}
	});
	let projected = jsonpath::project(&detected, &output_schema);

	assert_eq!(projected, json!({"day_of_week": "Tuesday"}));
}

/// S2. Hidden defaults are stripped from the advertised schema and merged
/// back in on every call, unconditionally.
#[tokio::test]
async fn s2_defaults_hidden_from_schema_and_injected_on_call() {
	let doc = json!({
		"servers": [{"name": "weather-backend", "stdio": {"command": "weather-cli", "args": []}}],
		"tools": [
			{
				"name": "fetch_forecast",
				"server": "weather-backend",
				"inputSchema": {
					"type": "object",
					"properties": {
						"city": {"type": "string"},
						"api_key": {"type": "string"},
						"station_id": {"type": "string"}
					},
					"required": ["city"]
				}
			},
			{
				"name": "weather",
				"source": "fetch_forecast",
				"defaults": {"api_key": "K", "station_id": "S"}
			}
		]
	});
	let file = write_registry(&doc);
	let loaded = registry::load_from_file(file.path()).expect("registry loads");

	let weather = loaded.tools.iter().find(|t| t.name == "weather").expect("tool present");
	let properties = weather.input_schema.get("properties").and_then(|p| p.as_object()).expect("properties");
	assert!(properties.contains_key("city"));
	assert!(!properties.contains_key("api_key"));
	assert!(!properties.contains_key("station_id"));

	// The actual "injected on call" half of this scenario - that a
	// caller-supplied value for a defaulted key never wins - is exercised
	// directly against `merge_defaults` in `dispatcher.rs`'s own test
	// module, which has access to that private function; this test checks
	// the resolved defaults are exactly what the registry declared.
	assert_eq!(weather.defaults.get("api_key"), Some(&json!("K")));
	assert_eq!(weather.defaults.get("station_id"), Some(&json!("S")));
}

/// S3. Schema drift: strict mode disables the tool for calls, warn mode
/// keeps it callable.
#[test]
fn s3_drift_detection_strict_vs_warn() {
	use rmcp::model::Tool as BackendTool;
	use std::sync::Arc;

	use mcp_gateway::backend::validation::validate_backend_tools;
	use mcp_gateway::registry::VirtualTool;

	fn backend_tool(schema: serde_json::Value) -> BackendTool {
		BackendTool {
			name: "t".to_string().into(),
			title: None,
			description: Some("a tool".to_string().into()),
			input_schema: Arc::new(schema.as_object().unwrap().clone()),
			output_schema: None,
			annotations: None,
			icons: None,
			meta: None,
		}
	}

	fn virtual_tool(mode: ValidationMode) -> VirtualTool {
		VirtualTool {
			name: "t".to_string(),
			description: None,
			input_schema: json!({}),
			server_id: "srv".to_string(),
			original_name: None,
			defaults: serde_json::Map::new(),
			output_schema: None,
			text_extraction: None,
			source: None,
			expected_schema_hash: Some("sha256:aaa".to_string()),
			computed_schema_hash: None,
			validation_mode: mode,
			validation_status: ValidationStatus::Unknown,
			validation_message: None,
			source_version_pin: None,
		}
	}

	let live = backend_tool(json!({"type": "object", "properties": {"a": {"type": "string"}}}));

	let mut strict_tools = vec![virtual_tool(ValidationMode::Strict)];
	validate_backend_tools("srv", &mut strict_tools, std::slice::from_ref(&live));
	assert_eq!(strict_tools[0].validation_status, ValidationStatus::Error);
	assert!(strict_tools[0].is_disabled());

	let mut warn_tools = vec![virtual_tool(ValidationMode::Warn)];
	validate_backend_tools("srv", &mut warn_tools, std::slice::from_ref(&live));
	assert_eq!(warn_tools[0].validation_status, ValidationStatus::Drift);
	assert!(!warn_tools[0].is_disabled());
}

/// S3 continued: a strict-mode-disabled tool is rejected by the dispatcher
/// before any backend lookup.
#[tokio::test]
async fn s3_disabled_tool_rejected_by_dispatcher() {
	use mcp_gateway::registry::VirtualTool;

	let tool = VirtualTool {
		name: "t".to_string(),
		description: None,
		input_schema: json!({}),
		server_id: "srv".to_string(),
		original_name: None,
		defaults: serde_json::Map::new(),
		output_schema: None,
		text_extraction: None,
		source: None,
		expected_schema_hash: None,
		computed_schema_hash: None,
		validation_mode: ValidationMode::Strict,
		validation_status: ValidationStatus::Error,
		validation_message: Some("drift".to_string()),
		source_version_pin: None,
	};

	let backends = BackendManager::startup(&BTreeMap::new(), &mut Vec::new()).await;
	let dispatcher = Dispatcher::new(vec![tool], backends);
	let err = dispatcher.call_tool("t", None).await.unwrap_err();
	assert!(matches!(err, DispatchError::DisabledTool(name) if name == "t"));
}

/// S4. JSONPath wildcard projection over an array of objects.
#[test]
fn s4_wildcard_projection_over_array() {
	let content = json!({"records": [{"docId": "a"}, {"docId": "b"}]});
	let output_schema = json!({
		"type": "object",
		"properties": {
			"ids": {"type": "array", "source_field": "$.records[*].docId"}
		}
	});
	let projected = jsonpath::project(&content, &output_schema);
	assert_eq!(projected, json!({"ids": ["a", "b"]}));
}

/// S5. OAuth lazy attach: the tool is present at startup but uncallable
/// until a token is attached. Connecting against an unreachable url still
/// exercises the pending -> attach-attempt transition.
#[tokio::test]
async fn s5_oauth_tool_requires_attach_before_calls_succeed() {
	let doc = json!({
		"servers": [{"name": "secure-backend", "url": "http://127.0.0.1:0/mcp", "auth": "oauth"}],
		"tools": [{"name": "secure_tool", "server": "secure-backend"}]
	});
	let file = write_registry(&doc);
	let loaded = registry::load_from_file(file.path()).expect("registry loads");
	assert_eq!(loaded.tools.len(), 1);

	let mut tools = loaded.tools;
	let backends = BackendManager::startup(&loaded.servers, &mut tools).await;
	let dispatcher = Dispatcher::new(tools, backends);

	let err = dispatcher.call_tool("secure_tool", None).await.unwrap_err();
	assert!(matches!(err, DispatchError::AuthRequired(server) if server == "secure-backend"));

	let attach_err = dispatcher.attach_oauth("http://127.0.0.1:0/mcp", "a-token").await.unwrap_err();
	assert!(matches!(attach_err, mcp_gateway::backend::BackendError::Connect { .. }));
}

/// S6. A tool whose source root requires a field neither exposed nor
/// defaulted is dropped at load time; the load itself still succeeds.
#[test]
fn s6_coverage_violation_drops_tool_without_failing_load() {
	let doc = json!({
		"servers": [{"name": "srv", "stdio": {"command": "srv-cli", "args": []}}],
		"tools": [
			{
				"name": "root_tool",
				"server": "srv",
				"inputSchema": {
					"type": "object",
					"properties": {"a": {"type": "string"}, "b": {"type": "string"}},
					"required": ["a", "b"]
				}
			},
			{
				"name": "narrowed",
				"source": "root_tool",
				"inputSchema": {"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]}
			}
		]
	});
	let file = write_registry(&doc);
	let loaded = registry::load_from_file(file.path()).expect("load still succeeds");

	assert!(loaded.tools.iter().any(|t| t.name == "root_tool"));
	assert!(!loaded.tools.iter().any(|t| t.name == "narrowed"));
}
