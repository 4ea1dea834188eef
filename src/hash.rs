// Canonical JSON hashing shared by server identity and tool drift detection.
//
// Every content hash in this crate is `sha256:<hex>` over a canonical JSON
// serialization: sorted object keys, no whitespace. serde_json's `Value`
// already sorts map keys when the `preserve_order` feature is off for
// comparison purposes, but since we enable `preserve_order` elsewhere for
// readable registry errors, canonicalization here is explicit rather than
// relying on a cargo feature flag.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serializes a `Value` with sorted keys and no insignificant whitespace,
/// then returns `sha256:<hex>` of the UTF-8 bytes.
pub fn hash_value(value: &Value) -> String {
	let canonical = canonicalize(value);
	let mut hasher = Sha256::new();
	hasher.update(canonical.as_bytes());
	format!("sha256:{:x}", hasher.finalize())
}

/// Canonical (sorted-key, whitespace-free) JSON text for `value`.
pub fn canonicalize(value: &Value) -> String {
	let sorted = sort_keys(value);
	serde_json::to_string(&sorted).expect("Value serialization is infallible")
}

fn sort_keys(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let sorted: BTreeMap<String, Value> =
				map.iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect();
			let mut out = serde_json::Map::new();
			for (k, v) in sorted {
				out.insert(k, v);
			}
			Value::Object(out)
		},
		Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
		other => other.clone(),
	}
}
