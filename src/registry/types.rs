// Canonical data model (spec §3): ServerConfig, VirtualTool, and the raw
// registry document shape they are compiled from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hash::hash_value;
use crate::markdown::TextExtraction;

/// Transport used to reach a remote backend.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
	#[default]
	Sse,
	#[serde(rename = "streamablehttp", alias = "streamable-http")]
	StreamableHttp,
}

/// Auth mode for a remote backend.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
	#[default]
	None,
	Oauth,
}

/// An immutable, content-addressable backend server description.
///
/// Identity (`id`) is derived from every behavior-affecting field; two
/// configs with identical fields always share an `id`, which is how the
/// loader deduplicates backend sessions.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
	pub command: Option<String>,
	pub args: Vec<String>,
	pub url: Option<String>,
	pub transport: Transport,
	pub env: BTreeMap<String, String>,
	pub auth: AuthMode,
}

impl ServerConfig {
	/// SHA-256 over the canonical serialization of every behavior-affecting
	/// field. `env` is a `BTreeMap` so key order never affects the hash.
	pub fn id(&self) -> String {
		let value = serde_json::json!({
			"command": self.command,
			"args": self.args,
			"url": self.url,
			"transport": self.transport,
			"env": self.env,
			"auth": self.auth,
		});
		hash_value(&value)
	}
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
	Strict,
	Warn,
	#[default]
	Skip,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
	#[default]
	Unknown,
	Valid,
	Drift,
	Missing,
	Error,
}

/// A gateway-advertised tool: a declarative transformation of one backend
/// tool. Everything except the validation-status fields is fixed at load
/// time.
#[derive(Debug, Clone, Serialize)]
pub struct VirtualTool {
	pub name: String,
	pub description: Option<String>,
	pub input_schema: serde_json::Value,
	pub server_id: String,
	pub original_name: Option<String>,
	pub defaults: serde_json::Map<String, serde_json::Value>,
	pub output_schema: Option<serde_json::Value>,
	pub text_extraction: Option<TextExtraction>,
	pub source: Option<String>,
	pub expected_schema_hash: Option<String>,
	pub computed_schema_hash: Option<String>,
	pub validation_mode: ValidationMode,
	pub validation_status: ValidationStatus,
	pub validation_message: Option<String>,
	pub source_version_pin: Option<String>,
}

impl VirtualTool {
	/// Effective backend tool name to invoke: `original_name` if set, else
	/// `name`.
	pub fn target_name(&self) -> &str {
		self.original_name.as_deref().unwrap_or(&self.name)
	}

	/// True once a `strict`-mode validation failure has disabled the tool.
	pub fn is_disabled(&self) -> bool {
		self.validation_mode == ValidationMode::Strict && self.validation_status == ValidationStatus::Error
	}

	/// Canonical hash for drift comparison (spec §4.4). Includes
	/// `source_field` inside `output_schema` because it affects semantics.
	pub fn content_hash(&self) -> String {
		let mut canonical = serde_json::Map::new();
		canonical.insert("name".into(), serde_json::Value::String(self.name.clone()));
		canonical.insert(
			"description".into(),
			self.description.clone().map(serde_json::Value::String).unwrap_or(serde_json::Value::Null),
		);
		canonical.insert("inputSchema".into(), self.input_schema.clone());
		canonical.insert(
			"originalName".into(),
			self.original_name.clone().map(serde_json::Value::String).unwrap_or(serde_json::Value::Null),
		);
		if let Some(source) = &self.source {
			canonical.insert("source".into(), serde_json::Value::String(source.clone()));
		}
		if let Some(output_schema) = &self.output_schema {
			canonical.insert("outputSchema".into(), output_schema.clone());
		}
		if !self.defaults.is_empty() {
			canonical.insert("defaults".into(), serde_json::Value::Object(self.defaults.clone()));
		}
		if let Some(text_extraction) = &self.text_extraction {
			canonical.insert("textExtraction".into(), serde_json::to_value(text_extraction).expect("serializable"));
		}
		hash_value(&serde_json::Value::Object(canonical))
	}
}

// --- Raw registry document (deserialized directly from the JSON file) ---

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegistryDocument {
	#[serde(default)]
	pub schemas: BTreeMap<String, serde_json::Value>,
	#[serde(default)]
	pub servers: Vec<ServerDef>,
	#[serde(default)]
	pub tools: Vec<ToolDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerDef {
	pub name: String,
	#[serde(default)]
	pub stdio: Option<StdioDef>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub transport: Option<Transport>,
	#[serde(default)]
	pub env: BTreeMap<String, String>,
	#[serde(default)]
	pub auth: Option<AuthMode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StdioDef {
	pub command: String,
	#[serde(default)]
	pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolDef {
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub server: Option<String>,
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default, rename = "inputSchema")]
	pub input_schema: Option<serde_json::Value>,
	#[serde(default)]
	pub defaults: serde_json::Map<String, serde_json::Value>,
	#[serde(default, rename = "outputSchema")]
	pub output_schema: Option<serde_json::Value>,
	#[serde(default, rename = "textExtraction")]
	pub text_extraction: Option<TextExtraction>,
	#[serde(default, rename = "originalName")]
	pub original_name: Option<String>,
	#[serde(default)]
	pub version: Option<String>,
	#[serde(default, rename = "sourceVersionPin")]
	pub source_version_pin: Option<String>,
	#[serde(default, rename = "validationMode")]
	pub validation_mode: Option<ValidationMode>,
	#[serde(default, rename = "expectedSchemaHash")]
	pub expected_schema_hash: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn server_config_id_is_stable_under_env_reordering() {
		let mut a = ServerConfig {
			command: Some("echo".into()),
			args: vec!["hi".into()],
			url: None,
			transport: Transport::Sse,
			env: BTreeMap::new(),
			auth: AuthMode::None,
		};
		a.env.insert("B".into(), "2".into());
		a.env.insert("A".into(), "1".into());

		let mut b = a.clone();
		b.env = BTreeMap::new();
		b.env.insert("A".into(), "1".into());
		b.env.insert("B".into(), "2".into());

		assert_eq!(a.id(), b.id());
	}

	#[test]
	fn server_config_id_changes_with_behavior_affecting_fields() {
		let a = ServerConfig {
			command: Some("echo".into()),
			args: vec![],
			url: None,
			transport: Transport::Sse,
			env: BTreeMap::new(),
			auth: AuthMode::None,
		};
		let mut b = a.clone();
		b.command = Some("cat".into());
		assert_ne!(a.id(), b.id());
	}
}
