// Registry loader (component C5): parses the registry document, resolves
// `source` chains and `$ref` schemas, hides defaulted fields, validates
// coverage (invariant 4), and emits canonical ServerConfigs/VirtualTools.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::RegistryError;
use super::types::{AuthMode, RegistryDocument, ServerConfig, ToolDef, Transport, ValidationMode, VirtualTool};

/// Result of a successful load: deduplicated backend configs keyed by
/// content hash, and the virtual tools that survived all validation.
pub struct LoadedRegistry {
	pub servers: BTreeMap<String, ServerConfig>,
	pub tools: Vec<VirtualTool>,
}

/// Runs the full C5 algorithm over a parsed registry document.
pub fn compile(doc: RegistryDocument) -> Result<LoadedRegistry, RegistryError> {
	let named_servers = build_named_servers(&doc)?;
	let tools_by_name: HashMap<String, &ToolDef> = doc.tools.iter().map(|t| (t.name.clone(), t)).collect();

	let mut servers = BTreeMap::new();
	let mut tools = Vec::new();

	for tool_def in &doc.tools {
		match compile_tool(tool_def, &doc, &named_servers, &tools_by_name)? {
			Some(vt) => {
				let server_config = named_servers
					.get(server_ref_for(tool_def, &tools_by_name)?.as_str())
					.expect("server ref validated during compile_tool")
					.clone();
				servers.entry(server_config.id()).or_insert(server_config);
				tools.push(vt);
			},
			None => continue, // dropped at load time; already logged
		}
	}

	Ok(LoadedRegistry { servers, tools })
}

fn build_named_servers(doc: &RegistryDocument) -> Result<HashMap<String, ServerConfig>, RegistryError> {
	let mut named = HashMap::new();
	for def in &doc.servers {
		if def.name.is_empty() {
			return Err(RegistryError::ServerMissingName);
		}
		let config = ServerConfig {
			command: def.stdio.as_ref().map(|s| s.command.clone()),
			args: def.stdio.as_ref().map(|s| s.args.clone()).unwrap_or_default(),
			url: def.url.clone(),
			transport: def.transport.unwrap_or(Transport::Sse),
			env: def.env.clone(),
			auth: def.auth.unwrap_or(AuthMode::None),
		};
		debug!(target: "registry", "registered server '{}': id={}", def.name, config.id());
		named.insert(def.name.clone(), config);
	}
	Ok(named)
}

/// Walks the `source` chain to the terminal (root, sourceless) tool,
/// detecting cycles. `start` is the name to begin walking from (the
/// immediate `source` of some tool).
fn walk_to_root<'a>(
	virtual_name: &str,
	start: &str,
	tools_by_name: &HashMap<String, &'a ToolDef>,
) -> Result<&'a ToolDef, RegistryError> {
	let mut seen = HashSet::new();
	seen.insert(start.to_string());
	let mut current_name = start.to_string();

	loop {
		let current = *tools_by_name
			.get(&current_name)
			.ok_or_else(|| RegistryError::UnknownSource { name: virtual_name.to_string(), source: current_name.clone() })?;
		match &current.source {
			None => return Ok(current),
			Some(next) => {
				if !seen.insert(next.clone()) {
					return Err(RegistryError::SourceCycle { name: virtual_name.to_string() });
				}
				current_name = next.clone();
			},
		}
	}
}

/// Resolves the registry-local server name a tool ultimately binds to,
/// following its source chain if it has one.
fn server_ref_for(tool_def: &ToolDef, tools_by_name: &HashMap<String, &ToolDef>) -> Result<String, RegistryError> {
	let server_ref = if let Some(source) = &tool_def.source {
		let root = walk_to_root(&tool_def.name, source, tools_by_name)?;
		root.server.clone()
	} else {
		tool_def.server.clone()
	};

	server_ref.ok_or_else(|| RegistryError::NoServerReference { name: tool_def.name.clone() })
}

fn resolve_schema_ref(schema: Value, doc: &RegistryDocument, tool_name: &str) -> Value {
	let Some(r) = schema.get("$ref").and_then(Value::as_str) else {
		return schema;
	};

	if let Some(name) = r.strip_prefix("#/schemas/") {
		return doc.schemas.get(name).cloned().unwrap_or_else(|| {
			warn!(target: "registry", "schema '{}' not found in 'schemas' for tool '{}'", name, tool_name);
			serde_json::json!({})
		});
	}

	if let Some(rest) = r.strip_prefix("#/tools/") {
		if let Some(idx) = rest.split('/').next().and_then(|s| s.parse::<usize>().ok()) {
			if let Some(target) = doc.tools.get(idx) {
				let target_schema = target.input_schema.clone().unwrap_or_else(|| serde_json::json!({}));
				// One further level of indirection, matching the registry's own ref-depth guarantee.
				if let Some(inner) = target_schema.get("$ref").and_then(Value::as_str) {
					if let Some(name) = inner.strip_prefix("#/schemas/") {
						return doc.schemas.get(name).cloned().unwrap_or_else(|| serde_json::json!({}));
					}
				}
				return target_schema;
			}
		}
		warn!(target: "registry", "failed to resolve ref '{}' for tool '{}'", r, tool_name);
	}

	schema
}

fn apply_defaults_hiding(schema: &Value, defaults: &serde_json::Map<String, Value>) -> Value {
	if defaults.is_empty() {
		return schema.clone();
	}
	let mut schema = schema.clone();
	if let Some(obj) = schema.as_object_mut() {
		if let Some(props) = obj.get_mut("properties").and_then(Value::as_object_mut) {
			for key in defaults.keys() {
				props.remove(key);
			}
		}
		let required = obj.get("required").and_then(Value::as_array).cloned().unwrap_or_default();
		let filtered: Vec<Value> =
			required.into_iter().filter(|v| !matches!(v.as_str(), Some(s) if defaults.contains_key(s))).collect();
		obj.insert("required".to_string(), Value::Array(filtered));
	}
	schema
}

fn required_fields(schema: &Value) -> HashSet<String> {
	schema
		.get("required")
		.and_then(Value::as_array)
		.map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
		.unwrap_or_default()
}

fn property_names(schema: &Value) -> HashSet<String> {
	schema
		.get("properties")
		.and_then(Value::as_object)
		.map(|m| m.keys().cloned().collect())
		.unwrap_or_default()
}

fn resolve_original_name(tool_def: &ToolDef, tools_by_name: &HashMap<String, &ToolDef>) -> Option<String> {
	if let Some(explicit) = &tool_def.original_name {
		return Some(explicit.clone());
	}
	let mut current_name = tool_def.source.clone()?;
	loop {
		let current = tools_by_name.get(&current_name)?;
		if let Some(explicit) = &current.original_name {
			return Some(explicit.clone());
		}
		match &current.source {
			Some(next) => current_name = next.clone(),
			None => return Some(current.name.clone()),
		}
	}
}

fn compile_tool(
	tool_def: &ToolDef,
	doc: &RegistryDocument,
	named_servers: &HashMap<String, ServerConfig>,
	tools_by_name: &HashMap<String, &ToolDef>,
) -> Result<Option<VirtualTool>, RegistryError> {
	let server_ref = server_ref_for(tool_def, tools_by_name)?;
	if !named_servers.contains_key(&server_ref) {
		return Err(RegistryError::UnknownServer { name: tool_def.name.clone(), server: server_ref });
	}
	let server_config = &named_servers[&server_ref];

	// Resolve the root source (schema inheritance + coverage base), if any.
	let root = match &tool_def.source {
		Some(source) => Some(walk_to_root(&tool_def.name, source, tools_by_name)?),
		None => None,
	};

	let mut input_schema = match &tool_def.input_schema {
		Some(explicit) => explicit.clone(),
		None => match root {
			Some(root) => root.input_schema.clone().unwrap_or_else(|| serde_json::json!({})),
			None => serde_json::json!({}),
		},
	};
	input_schema = resolve_schema_ref(input_schema, doc, &tool_def.name);

	let source_required_schema = root.map(|root| {
		let raw = root.input_schema.clone().unwrap_or_else(|| serde_json::json!({}));
		resolve_schema_ref(raw, doc, &root.name)
	});

	let input_schema = apply_defaults_hiding(&input_schema, &tool_def.defaults);

	if let Some(source_schema) = &source_required_schema {
		let required = required_fields(source_schema);
		let provided: HashSet<String> =
			property_names(&input_schema).union(&tool_def.defaults.keys().cloned().collect()).cloned().collect();
		let missing: Vec<&String> = required.difference(&provided).collect();
		if !missing.is_empty() {
			warn!(
				target: "registry",
				"virtual tool '{}' is missing required fields from source '{}': {:?}; disabling this tool",
				tool_def.name,
				tool_def.source.as_deref().unwrap_or(""),
				missing
			);
			return Ok(None);
		}
	}

	if let (Some(pin), Some(root)) = (&tool_def.source_version_pin, root) {
		if root.version.as_deref() != Some(pin.as_str()) {
			match tool_def.validation_mode.unwrap_or_default() {
				ValidationMode::Strict => {
					warn!(target: "registry", "tool '{}' source version pin mismatch; disabling", tool_def.name);
					return Ok(None);
				},
				ValidationMode::Warn => {
					warn!(target: "registry", "tool '{}' source version pin mismatch; keeping (warn mode)", tool_def.name);
				},
				ValidationMode::Skip => {},
			}
		}
	}

	let original_name = resolve_original_name(tool_def, tools_by_name);

	info!(target: "registry", "installed virtual tool '{}' -> backend '{}'", tool_def.name, server_ref);

	Ok(Some(VirtualTool {
		name: tool_def.name.clone(),
		description: tool_def.description.clone(),
		input_schema,
		server_id: server_config.id(),
		original_name,
		defaults: tool_def.defaults.clone(),
		output_schema: tool_def.output_schema.clone(),
		text_extraction: tool_def.text_extraction.clone(),
		source: tool_def.source.clone(),
		expected_schema_hash: tool_def.expected_schema_hash.clone(),
		computed_schema_hash: None,
		validation_mode: tool_def.validation_mode.unwrap_or_default(),
		validation_status: super::types::ValidationStatus::Unknown,
		validation_message: None,
		source_version_pin: tool_def.source_version_pin.clone(),
	}))
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::registry::types::ToolDef;

	fn doc_from(value: Value) -> RegistryDocument {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn simple_direct_server_tool() {
		let doc = doc_from(json!({
			"servers": [{"name": "time", "stdio": {"command": "mcp-server-time", "args": []}}],
			"tools": [{
				"name": "get_time",
				"server": "time",
				"inputSchema": {"type": "object", "properties": {"tz": {"type": "string"}}}
			}]
		}));
		let loaded = compile(doc).unwrap();
		assert_eq!(loaded.tools.len(), 1);
		assert_eq!(loaded.servers.len(), 1);
		assert_eq!(loaded.tools[0].target_name(), "get_time");
	}

	#[test]
	fn source_chain_resolves_server_and_schema() {
		let doc = doc_from(json!({
			"servers": [{"name": "backend", "stdio": {"command": "x", "args": []}}],
			"tools": [
				{
					"name": "base_tool",
					"server": "backend",
					"inputSchema": {"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]}
				},
				{
					"name": "derived",
					"source": "base_tool",
					"defaults": {"a": "fixed"}
				}
			]
		}));
		let loaded = compile(doc).unwrap();
		let derived = loaded.tools.iter().find(|t| t.name == "derived").unwrap();
		assert_eq!(derived.target_name(), "base_tool");
		assert!(derived.input_schema.get("properties").unwrap().get("a").is_none());
	}

	#[test]
	fn multi_level_source_chain_original_name_and_defaults() {
		let doc = doc_from(json!({
			"servers": [{"name": "backend", "stdio": {"command": "x", "args": []}}],
			"tools": [
				{
					"name": "base_tool",
					"server": "backend",
					"inputSchema": {
						"type": "object",
						"properties": {"a": {"type": "string"}, "b": {"type": "string"}, "c": {"type": "string"}},
						"required": ["a", "b", "c"]
					}
				},
				{"name": "level1", "source": "base_tool", "defaults": {"a": "A"}},
				{"name": "level2", "source": "level1", "defaults": {"b": "B", "c": "C"}}
			]
		}));
		let loaded = compile(doc).unwrap();
		let level2 = loaded.tools.iter().find(|t| t.name == "level2").unwrap();
		assert_eq!(level2.server_id, loaded.servers.values().next().unwrap().id());
		assert_eq!(level2.target_name(), "base_tool");
	}

	#[test]
	fn cycle_in_source_chain_is_a_load_failure() {
		let doc = doc_from(json!({
			"servers": [{"name": "backend", "stdio": {"command": "x", "args": []}}],
			"tools": [
				{"name": "a", "source": "b"},
				{"name": "b", "source": "a"}
			]
		}));
		assert!(compile(doc).is_err());
	}

	#[test]
	fn coverage_violation_drops_tool_without_failing_load() {
		let doc = doc_from(json!({
			"servers": [{"name": "backend", "stdio": {"command": "x", "args": []}}],
			"tools": [
				{
					"name": "base_tool",
					"server": "backend",
					"inputSchema": {
						"type": "object",
						"properties": {"a": {"type": "string"}, "b": {"type": "string"}},
						"required": ["a", "b"]
					}
				},
				{"name": "incomplete", "source": "base_tool", "inputSchema": {"type": "object", "properties": {"a": {"type": "string"}}}}
			]
		}));
		let loaded = compile(doc).unwrap();
		assert!(loaded.tools.iter().all(|t| t.name != "incomplete"));
	}

	#[test]
	fn schema_ref_resolution() {
		let doc = doc_from(json!({
			"schemas": {"Weather": {"type": "object", "properties": {"city": {"type": "string"}}}},
			"servers": [{"name": "backend", "stdio": {"command": "x", "args": []}}],
			"tools": [
				{"name": "weather", "server": "backend", "inputSchema": {"$ref": "#/schemas/Weather"}}
			]
		}));
		let loaded = compile(doc).unwrap();
		assert_eq!(loaded.tools[0].input_schema["properties"]["city"]["type"], json!("string"));
	}

	#[test]
	fn dedupes_servers_by_content_hash() {
		let doc = doc_from(json!({
			"servers": [
				{"name": "a", "stdio": {"command": "x", "args": []}},
				{"name": "b", "stdio": {"command": "x", "args": []}}
			],
			"tools": [
				{"name": "t1", "server": "a", "inputSchema": {}},
				{"name": "t2", "server": "b", "inputSchema": {}}
			]
		}));
		let loaded = compile(doc).unwrap();
		assert_eq!(loaded.servers.len(), 1);
	}

	#[test]
	fn unknown_server_reference_is_a_load_failure() {
		let doc = doc_from(json!({
			"servers": [],
			"tools": [{"name": "t1", "server": "missing", "inputSchema": {}}]
		}));
		assert!(matches!(compile(doc), Err(RegistryError::UnknownServer { .. })));
	}

	#[test]
	fn tool_def_deserializes_all_recognized_keys() {
		let t: ToolDef = serde_json::from_value(json!({
			"name": "x",
			"description": "d",
			"server": "s",
			"outputSchema": {"properties": {}},
			"originalName": "orig",
			"version": "1",
			"sourceVersionPin": "1",
			"validationMode": "strict",
			"expectedSchemaHash": "sha256:abc"
		}))
		.unwrap();
		assert_eq!(t.original_name.as_deref(), Some("orig"));
		assert_eq!(t.validation_mode, Some(ValidationMode::Strict));
	}
}
