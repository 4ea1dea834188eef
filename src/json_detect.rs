// JSON-in-text detection (component C2): recovers a JSON object or array
// embedded in otherwise free-form tool-response text.

use regex::RegexBuilder;
use serde_json::Value;

/// Attempts, in order: whole-string parse, per-line balanced extraction,
/// then a small set of common prefix patterns. Never panics; returns
/// `None` rather than surfacing a parse error, since a miss here is a data
/// condition, not a fault.
pub fn detect_json_in_text(text: &str) -> Option<Value> {
	let text = text.trim();
	if text.is_empty() {
		return None;
	}

	if let Ok(value) = serde_json::from_str(text) {
		return Some(value);
	}

	for (offset, _) in line_starts_with_bracket(text) {
		let candidate = &text[offset..];
		if let Ok(value) = serde_json::from_str(candidate) {
			return Some(value);
		}
		if let Some(extracted) = extract_balanced_json(candidate) {
			if let Ok(value) = serde_json::from_str(&extracted) {
				return Some(value);
			}
		}
	}

	for pattern in PREFIX_PATTERNS {
		let re = RegexBuilder::new(pattern)
			.case_insensitive(true)
			.dot_matches_new_line(true)
			.build()
			.expect("prefix patterns are valid regexes");
		if let Some(caps) = re.captures(text) {
			let candidate = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
			if candidate.starts_with('{') || candidate.starts_with('[') {
				if let Ok(value) = serde_json::from_str(candidate) {
					return Some(value);
				}
				if let Some(extracted) = extract_balanced_json(candidate) {
					if let Ok(value) = serde_json::from_str(&extracted) {
						return Some(value);
					}
				}
			}
		}
	}

	None
}

const PREFIX_PATTERNS: &[&str] = &[
	r"(?:contents?|response|data|result|output)(?:\s+of[^:]*)?:\s*(.+)",
	r"here\s+is\s+(?:the\s+)?(?:raw\s+)?(?:content|data|response):\s*(.+)",
];

/// Byte offsets of lines whose first non-space character is `{` or `[`.
fn line_starts_with_bracket(text: &str) -> Vec<(usize, char)> {
	let mut out = Vec::new();
	let mut offset = 0usize;
	for line in text.split_inclusive('\n') {
		let trimmed_start = line.len() - line.trim_start().len();
		if let Some(c) = line.trim_start().chars().next() {
			if c == '{' || c == '[' {
				out.push((offset + trimmed_start, c));
			}
		}
		offset += line.len();
	}
	out
}

/// Extracts a balanced `{...}` or `[...]` prefix from `text`, honoring
/// string literals and escapes. Returns the shortest such prefix, or
/// `None` if the brackets never balance.
fn extract_balanced_json(text: &str) -> Option<String> {
	let mut chars = text.char_indices();
	let (_, open) = chars.next()?;
	let close = match open {
		'{' => '}',
		'[' => ']',
		_ => return None,
	};

	let mut depth = 0i32;
	let mut in_string = false;
	let mut escape_next = false;

	for (idx, ch) in text.char_indices() {
		if escape_next {
			escape_next = false;
			continue;
		}
		match ch {
			'\\' => escape_next = true,
			'"' => in_string = !in_string,
			c if !in_string && c == open => depth += 1,
			c if !in_string && c == close => {
				depth -= 1;
				if depth == 0 {
					return Some(text[..idx + ch.len_utf8()].to_string());
				}
			},
			_ => {},
		}
	}

	None
}

/// Applies detection to `r.content[0].text` when that content item is of
/// type `text`. Mirrors the MCP tool-result shape: `{content: [...]}`.
pub fn extract_json_from_tool_result(tool_result: &Value) -> Option<Value> {
	let content = tool_result.get("content")?.as_array()?;
	let first = content.first()?.as_object()?;
	if first.get("type").and_then(Value::as_str) != Some("text") {
		return None;
	}
	let text = first.get("text").and_then(Value::as_str)?;
	detect_json_in_text(text)
}
