// JSONPath evaluation and output-schema projection (component C1).
//
// `extract` supports the subset the registry format guarantees: `$`, dot
// fields, integer indices, and the `[*]` wildcard. Anything richer that
// `serde_json_path` happens to accept is tolerated, but a parse failure is
// treated as a data error (null), never a panic — the wildcard/non-wildcard
// split below is purely textual, matching the source behavior of checking
// for a literal `[*]` substring in the path rather than inspecting the
// parsed query shape.

use serde_json::{Map, Value};
use serde_json_path::JsonPath;

/// Evaluates `path` against `data`. Returns `Value::Null` on a parse error
/// or when nothing matches. Paths containing `[*]` always return an array
/// (missing slots are suppressed, never null-padded); otherwise the single
/// matched value is returned.
pub fn extract(data: &Value, path: &str) -> Value {
	if path.is_empty() {
		return Value::Null;
	}
	let Ok(query) = JsonPath::parse(path) else {
		return Value::Null;
	};
	let nodes = query.query(data);
	let is_wildcard = path.contains("[*]");

	if is_wildcard {
		Value::Array(nodes.all().into_iter().cloned().collect())
	} else {
		match nodes.len() {
			0 => Value::Null,
			1 => nodes.first().cloned().unwrap_or(Value::Null),
			_ => Value::Array(nodes.all().into_iter().cloned().collect()),
		}
	}
}

/// Projects `content` through `output_schema`, per-property, using
/// `source_field` JSONPath annotations where present and passthrough
/// otherwise. Fields whose `source_field` resolves to nothing are omitted,
/// never written as null.
pub fn project(content: &Value, output_schema: &Value) -> Value {
	let Some(properties) = output_schema.get("properties").and_then(Value::as_object) else {
		return content.clone();
	};

	let mut result = Map::new();
	for (name, field_schema) in properties {
		let Some(field_schema) = field_schema.as_object() else {
			continue;
		};

		let Some(source_field) = field_schema.get("source_field").and_then(Value::as_str) else {
			if let Some(value) = content.get(name) {
				result.insert(name.clone(), value.clone());
			}
			continue;
		};

		if let Some(nested_props) = nested_item_properties(field_schema) {
			let extracted = extract(content, source_field);
			if let Value::Array(elements) = extracted {
				let projected: Vec<Value> = elements.iter().map(|e| project_element(e, nested_props)).collect();
				result.insert(name.clone(), Value::Array(projected));
			}
			// missing / non-array source → field omitted entirely
		} else {
			let value = extract(content, source_field);
			if !value.is_null() {
				result.insert(name.clone(), value);
			}
		}
	}

	Value::Object(result)
}

fn nested_item_properties(field_schema: &Map<String, Value>) -> Option<&Map<String, Value>> {
	let items = field_schema.get("items")?.as_object()?;
	if items.get("type").and_then(Value::as_str) != Some("object") {
		return None;
	}
	items.get("properties")?.as_object()
}

fn project_element(element: &Value, properties: &Map<String, Value>) -> Value {
	if !element.is_object() {
		return Value::Object(Map::new());
	}
	let mut result = Map::new();
	for (name, field_schema) in properties {
		let Some(field_schema) = field_schema.as_object() else {
			continue;
		};
		if let Some(source_field) = field_schema.get("source_field").and_then(Value::as_str) {
			let value = extract(element, source_field);
			result.insert(name.clone(), value);
		} else if let Some(value) = element.get(name) {
			result.insert(name.clone(), value.clone());
		}
	}
	Value::Object(result)
}

/// Deep-copies `schema` with every `source_field` key removed, at every
/// depth (including inside `items`). This is the schema shown to the LLM.
pub fn strip_source_fields(schema: &Value) -> Value {
	match schema {
		Value::Object(map) => {
			let mut out = Map::new();
			for (k, v) in map {
				if k == "source_field" {
					continue;
				}
				out.insert(k.clone(), strip_source_fields(v));
			}
			Value::Object(out)
		},
		Value::Array(items) => Value::Array(items.iter().map(strip_source_fields).collect()),
		other => other.clone(),
	}
}
