pub mod error;
pub mod loader;
pub mod types;

use std::path::Path;

pub use error::RegistryError;
use fs_err as fs;
pub use loader::{compile, LoadedRegistry};
pub use types::{AuthMode, RegistryDocument, ServerConfig, Transport, ValidationMode, ValidationStatus, VirtualTool};

/// Loads and compiles a registry document from disk. This is the only
/// entry point the rest of the crate needs: parse, then run the full C5
/// algorithm.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<LoadedRegistry, RegistryError> {
	let path = path.as_ref();
	let raw = fs::read_to_string(path).map_err(|source| RegistryError::Io { path: path.display().to_string(), source })?;
	let doc: RegistryDocument =
		serde_json::from_str(&raw).map_err(|source| RegistryError::Parse { path: path.display().to_string(), source })?;
	compile(doc)
}
