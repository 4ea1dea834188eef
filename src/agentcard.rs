// AgentCard file store (spec §6, §4.9): an optional, self-contained
// persistence layer with no effect on the gateway's hard core (C1-C8).
// Layout mirrors a content-addressable-by-name-and-version tree:
// `root/<name>/<version>.json`.

use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// A dependency entry in an agent's lineage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Dependency {
	pub id: String,
	pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Lineage {
	#[serde(default)]
	pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
	pub provider: String,
	pub model: String,
	#[serde(default)]
	pub config: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Environment {
	#[serde(default)]
	pub container_image: Option<String>,
	#[serde(default)]
	pub env_vars: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Runtime {
	#[serde(default)]
	pub llm: Option<LlmConfig>,
	#[serde(default)]
	pub environment: Option<Environment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvalPack {
	pub name: String,
	pub runner: String,
	pub data_source: String,
	#[serde(default)]
	pub runner_source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Evaluation {
	#[serde(default)]
	pub eval_packs: Vec<EvalPack>,
}

/// An extended A2A AgentCard: the base A2A fields plus `created_at`,
/// `lineage`, `runtime`, and `evaluation`. The base fields that don't
/// affect storage semantics (`capabilities`, `skills`, the default I/O mode
/// lists) are carried as opaque JSON rather than re-modeled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
	pub name: String,
	pub version: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub capabilities: serde_json::Value,
	#[serde(default)]
	pub skills: serde_json::Value,
	#[serde(default, rename = "defaultInputModes")]
	pub default_input_modes: Vec<String>,
	#[serde(default, rename = "defaultOutputModes")]
	pub default_output_modes: Vec<String>,
	pub created_at: chrono::DateTime<chrono::Utc>,
	#[serde(default)]
	pub lineage: Option<Lineage>,
	#[serde(default)]
	pub runtime: Option<Runtime>,
	#[serde(default)]
	pub evaluation: Option<Evaluation>,
}

#[derive(Error, Debug)]
pub enum AgentCardError {
	#[error("failed to read agent card {path}: {source}")]
	Io { path: String, #[source] source: std::io::Error },

	#[error("failed to parse agent card {path}: {source}")]
	Parse { path: String, #[source] source: serde_json::Error },
}

/// A file-backed `root/<name>/<version>.json` store.
pub struct AgentCardStore {
	root: PathBuf,
}

impl AgentCardStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	fn card_path(&self, name: &str, version: &str) -> PathBuf {
		self.root.join(name).join(format!("{version}.json"))
	}

	/// Writes `card` to disk, overwriting any existing file at the same
	/// `name`/`version`.
	pub fn save(&self, card: &AgentCard) -> Result<(), AgentCardError> {
		let path = self.card_path(&card.name, &card.version);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).map_err(|source| AgentCardError::Io { path: path.display().to_string(), source })?;
		}
		let body = serde_json::to_string_pretty(card).expect("AgentCard is always serializable");
		fs::write(&path, body).map_err(|source| AgentCardError::Io { path: path.display().to_string(), source })?;
		info!(target: "agentcard", "saved card {}:{} to {}", card.name, card.version, path.display());
		Ok(())
	}

	pub fn get(&self, name: &str, version: &str) -> Result<Option<AgentCard>, AgentCardError> {
		let path = self.card_path(name, version);
		if !path.exists() {
			return Ok(None);
		}
		read_card(&path).map(Some)
	}

	/// Lists every card under the store, optionally restricted to one
	/// agent name. Files that fail to parse are skipped and logged, not
	/// propagated, matching the original's tolerant directory walk.
	pub fn list(&self, name_filter: Option<&str>) -> Result<Vec<AgentCard>, AgentCardError> {
		let dirs: Vec<PathBuf> = match name_filter {
			Some(name) => {
				let dir = self.root.join(name);
				if dir.exists() {
					vec![dir]
				} else {
					Vec::new()
				}
			},
			None => {
				let Ok(entries) = fs::read_dir(&self.root) else {
					return Ok(Vec::new());
				};
				entries
					.filter_map(|e| e.ok())
					.map(|e| e.path())
					.filter(|p| p.is_dir())
					.collect()
			},
		};

		let mut cards = Vec::new();
		for dir in dirs {
			let Ok(entries) = fs::read_dir(&dir) else { continue };
			for entry in entries.filter_map(|e| e.ok()) {
				let path = entry.path();
				if path.extension().and_then(|e| e.to_str()) != Some("json") {
					continue;
				}
				match read_card(&path) {
					Ok(card) => {
						if name_filter.is_some_and(|f| f != card.name) {
							continue;
						}
						cards.push(card);
					},
					Err(e) => warn!(target: "agentcard", "skipping invalid card file {}: {}", path.display(), e),
				}
			}
		}
		Ok(cards)
	}
}

fn read_card(path: &Path) -> Result<AgentCard, AgentCardError> {
	let raw = fs::read_to_string(path).map_err(|source| AgentCardError::Io { path: path.display().to_string(), source })?;
	serde_json::from_str(&raw).map_err(|source| AgentCardError::Parse { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
	use tempfile::tempdir;

	use super::*;

	fn make_card(name: &str, version: &str) -> AgentCard {
		AgentCard {
			name: name.to_string(),
			version: version.to_string(),
			description: Some("a test agent".to_string()),
			url: None,
			capabilities: serde_json::json!({}),
			skills: serde_json::json!([]),
			default_input_modes: vec!["text".to_string()],
			default_output_modes: vec!["text".to_string()],
			created_at: chrono::Utc::now(),
			lineage: None,
			runtime: None,
			evaluation: None,
		}
	}

	#[test]
	fn save_then_get_round_trips() {
		let dir = tempdir().unwrap();
		let store = AgentCardStore::new(dir.path());
		let card = make_card("writer", "1.0.0");
		store.save(&card).unwrap();

		let loaded = store.get("writer", "1.0.0").unwrap().unwrap();
		assert_eq!(loaded.name, "writer");
		assert_eq!(loaded.version, "1.0.0");
	}

	#[test]
	fn get_missing_card_is_none() {
		let dir = tempdir().unwrap();
		let store = AgentCardStore::new(dir.path());
		assert!(store.get("nobody", "1.0.0").unwrap().is_none());
	}

	#[test]
	fn save_overwrites_existing_version() {
		let dir = tempdir().unwrap();
		let store = AgentCardStore::new(dir.path());
		let mut card = make_card("writer", "1.0.0");
		store.save(&card).unwrap();
		card.description = Some("updated".to_string());
		store.save(&card).unwrap();

		let loaded = store.get("writer", "1.0.0").unwrap().unwrap();
		assert_eq!(loaded.description.as_deref(), Some("updated"));
	}

	#[test]
	fn list_filters_by_name() {
		let dir = tempdir().unwrap();
		let store = AgentCardStore::new(dir.path());
		store.save(&make_card("writer", "1.0.0")).unwrap();
		store.save(&make_card("writer", "2.0.0")).unwrap();
		store.save(&make_card("reader", "1.0.0")).unwrap();

		let writer_cards = store.list(Some("writer")).unwrap();
		assert_eq!(writer_cards.len(), 2);

		let all_cards = store.list(None).unwrap();
		assert_eq!(all_cards.len(), 3);
	}

	#[test]
	fn list_skips_invalid_json_files() {
		let dir = tempdir().unwrap();
		let store = AgentCardStore::new(dir.path());
		store.save(&make_card("writer", "1.0.0")).unwrap();
		fs::create_dir_all(dir.path().join("writer")).unwrap();
		fs::write(dir.path().join("writer").join("broken.json"), "not json").unwrap();

		let cards = store.list(Some("writer")).unwrap();
		assert_eq!(cards.len(), 1);
	}
}
