// Markdown list parser (component C3): regex-driven extraction of
// numbered or bulleted lists into structured records.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One field's extraction rule within a list item.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FieldPattern {
	pub regex: String,
	#[serde(default)]
	pub required: bool,
	#[serde(rename = "type", default)]
	pub value_type: Option<String>,
	#[serde(default)]
	pub transform: Option<String>,
	#[serde(default)]
	pub multiline: bool,
}

/// The `textExtraction` config attached to a virtual tool.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TextExtraction {
	pub parser: ListParser,
	#[serde(default)]
	pub list_field: Option<String>,
	pub item_patterns: BTreeMap<String, FieldPattern>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListParser {
	MarkdownNumberedList,
	MarkdownBulletList,
}

/// Splits `text` on numbered-list markers (`1. `, `2. `, ...) and extracts
/// `item_patterns` from each segment. Items missing a `required` field are
/// dropped.
pub fn parse_numbered_list(text: &str, item_patterns: &BTreeMap<String, FieldPattern>) -> Vec<Map<String, Value>> {
	let splitter = Regex::new(r"(?:^|\n)\d+\.\s+").expect("static regex");
	parse_list(text, &splitter, item_patterns)
}

/// Splits `text` on bullet markers (`- ` or `* `) and extracts
/// `item_patterns` from each segment.
pub fn parse_bullet_list(text: &str, item_patterns: &BTreeMap<String, FieldPattern>) -> Vec<Map<String, Value>> {
	let splitter = Regex::new(r"(?:^|\n)[-*]\s+").expect("static regex");
	parse_list(text, &splitter, item_patterns)
}

fn parse_list(text: &str, splitter: &Regex, item_patterns: &BTreeMap<String, FieldPattern>) -> Vec<Map<String, Value>> {
	if text.is_empty() || item_patterns.is_empty() {
		return Vec::new();
	}

	let mut results = Vec::new();
	for item_text in splitter.split(text) {
		let item_text = item_text.trim();
		if item_text.is_empty() {
			continue;
		}

		let item_data = extract_fields(item_text, item_patterns);
		let has_required = item_patterns
			.iter()
			.filter(|(_, cfg)| cfg.required)
			.all(|(name, _)| item_data.contains_key(name));

		if has_required && !item_data.is_empty() {
			results.push(item_data);
		}
	}
	results
}

fn extract_fields(item_text: &str, patterns: &BTreeMap<String, FieldPattern>) -> Map<String, Value> {
	let mut item_data = Map::new();

	for (field_name, cfg) in patterns {
		let Ok(re) = RegexBuilder::new(&cfg.regex).multi_line(cfg.multiline).build() else {
			continue;
		};

		if cfg.multiline {
			let matches: Vec<String> = re
				.captures_iter(item_text)
				.map(|c| c.get(1).or_else(|| c.get(0)).map(|m| m.as_str().to_string()).unwrap_or_default())
				.collect();
			if !matches.is_empty() {
				let joined = matches.join("\n");
				item_data.insert(field_name.clone(), transform_value(&joined, cfg));
			}
		} else if let Some(caps) = re.captures(item_text) {
			let value = caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str()).unwrap_or("");
			item_data.insert(field_name.clone(), transform_value(value, cfg));
		}
	}

	item_data
}

fn transform_value(raw: &str, cfg: &FieldPattern) -> Value {
	let transformed = match cfg.transform.as_deref() {
		Some("remove_commas") => raw.replace(',', ""),
		Some("lowercase") => raw.to_lowercase(),
		Some("uppercase") => raw.to_uppercase(),
		Some("strip") => raw.trim().to_string(),
		_ => raw.to_string(),
	};

	match cfg.value_type.as_deref() {
		Some("integer") => Value::from(transformed.parse::<i64>().unwrap_or(0)),
		Some("number") => serde_json::Number::from_f64(transformed.parse::<f64>().unwrap_or(0.0))
			.map(Value::Number)
			.unwrap_or_else(|| Value::from(0)),
		Some("boolean") => {
			let lowered = transformed.to_lowercase();
			Value::Bool(matches!(lowered.as_str(), "true" | "yes" | "1" | "on"))
		},
		_ => Value::String(transformed),
	}
}

/// High-level entry point matching `VirtualTool.text_extraction`: parses
/// the configured list form and optionally wraps the result under
/// `list_field`. Returns `None` if nothing matched.
pub fn extract_markdown_list(text: &str, config: &TextExtraction) -> Option<Value> {
	if config.item_patterns.is_empty() {
		return None;
	}

	let results = match config.parser {
		ListParser::MarkdownBulletList => parse_bullet_list(text, &config.item_patterns),
		ListParser::MarkdownNumberedList => parse_numbered_list(text, &config.item_patterns),
	};

	if results.is_empty() {
		return None;
	}

	let array = Value::Array(results.into_iter().map(Value::Object).collect());
	match &config.list_field {
		Some(field) => {
			let mut wrapper = Map::new();
			wrapper.insert(field.clone(), array);
			Some(Value::Object(wrapper))
		},
		None => Some(array),
	}
}
