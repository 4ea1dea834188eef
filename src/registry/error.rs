use thiserror::Error;

/// Errors raised while loading the registry document. Per spec §7 these
/// are fatal: the process does not start if `load` returns an error.
#[derive(Error, Debug)]
pub enum RegistryError {
	#[error("failed to read registry file {path}: {source}")]
	Io { path: String, #[source] source: std::io::Error },

	#[error("failed to parse registry file {path}: {source}")]
	Parse { path: String, #[source] source: serde_json::Error },

	#[error("server definition missing 'name' field")]
	ServerMissingName,

	#[error("tool '{name}' references unknown server '{server}'")]
	UnknownServer { name: String, server: String },

	#[error("tool '{name}' references unknown source '{source}'")]
	UnknownSource { name: String, source: String },

	#[error("tool '{name}' has no server reference and no valid source")]
	NoServerReference { name: String },

	#[error("source chain for tool '{name}' contains a cycle")]
	SourceCycle { name: String },

	#[error("schema '{name}' not found in 'schemas'")]
	UnknownSchemaRef { name: String },
}
