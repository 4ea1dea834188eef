// Tool hashing & drift detection (component C4), applied at backend
// startup: compares each virtual tool's `expectedSchemaHash` against a
// freshly computed hash of the live backend tool it targets.

use std::collections::HashMap;

use rmcp::model::Tool;
use serde_json::Value;

use crate::hash::hash_value;
use crate::registry::{ValidationMode, ValidationStatus, VirtualTool};

/// Canonical hash of a tool as reported live by a backend. Mirrors
/// `VirtualTool::content_hash` but over the backend's own advertised
/// fields, so the two are comparable only when a virtual tool declares an
/// `expectedSchemaHash` captured from the same backend shape.
pub fn backend_tool_hash(tool: &Tool) -> String {
	let mut canonical = serde_json::Map::new();
	canonical.insert("name".into(), Value::String(tool.name.to_string()));
	canonical.insert("description".into(), tool.description.clone().map(|d| Value::String(d.to_string())).unwrap_or(Value::Null));
	canonical.insert("inputSchema".into(), Value::Object((*tool.input_schema).clone()));
	if let Some(title) = &tool.title {
		canonical.insert("displayName".into(), Value::String(title.to_string()));
	}
	if let Some(output_schema) = &tool.output_schema {
		canonical.insert("outputSchema".into(), Value::Object((**output_schema).clone()));
	}
	if let Some(annotations) = &tool.annotations {
		canonical.insert("annotations".into(), serde_json::to_value(annotations).unwrap_or(Value::Null));
	}
	hash_value(&Value::Object(canonical))
}

/// Validates every virtual tool whose `server_id` matches `server_id`
/// against the backend's live tool list, mutating `validation_status` and
/// `validation_message` in place. Returns the names of tools that strict
/// mode disabled, for logging.
pub fn validate_backend_tools(server_id: &str, tools: &mut [VirtualTool], backend_tools: &[Tool]) -> Vec<String> {
	let by_name: HashMap<&str, &Tool> = backend_tools.iter().map(|t| (t.name.as_ref(), t)).collect();
	let mut disabled = Vec::new();

	for tool in tools.iter_mut().filter(|t| t.server_id == server_id) {
		let Some(backend_tool) = by_name.get(tool.target_name()) else {
			apply_outcome(tool, ValidationStatus::Missing, Some(format!("backend no longer advertises '{}'", tool.target_name())));
			if tool.is_disabled() {
				disabled.push(tool.name.clone());
			}
			continue;
		};

		tool.computed_schema_hash = Some(backend_tool_hash(backend_tool));

		match &tool.expected_schema_hash {
			None => apply_outcome(tool, ValidationStatus::Valid, None),
			Some(expected) if tool.computed_schema_hash.as_deref() == Some(expected.as_str()) => {
				apply_outcome(tool, ValidationStatus::Valid, None)
			},
			Some(expected) => {
				let message = format!(
					"schema drift on '{}': expected {}, computed {}",
					tool.target_name(),
					expected,
					tool.computed_schema_hash.as_deref().unwrap_or("?")
				);
				apply_outcome(tool, ValidationStatus::Drift, Some(message));
			},
		}

		if tool.is_disabled() {
			disabled.push(tool.name.clone());
		}
	}

	disabled
}

/// Applies validation-mode policy to a raw status/message pair (spec
/// §4.4 `handle_validation_failure`): `strict` escalates any non-`Valid`
/// status to `Error` (which disables the tool); `warn` keeps the status
/// but records the message; `skip` always reports `valid` regardless of
/// what was actually observed.
fn apply_outcome(tool: &mut VirtualTool, status: ValidationStatus, message: Option<String>) {
	match tool.validation_mode {
		ValidationMode::Skip => {
			tool.validation_status = ValidationStatus::Valid;
			tool.validation_message = None;
		},
		ValidationMode::Warn => {
			tool.validation_status = status;
			tool.validation_message = message;
		},
		ValidationMode::Strict => {
			if status == ValidationStatus::Valid {
				tool.validation_status = ValidationStatus::Valid;
				tool.validation_message = None;
			} else {
				tool.validation_status = ValidationStatus::Error;
				tool.validation_message = message;
			}
		},
	}
}
