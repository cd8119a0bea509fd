//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Reference-preserving JSON strategy.
//!
//! Plain JSON cannot express that two positions in a tree hold the *same*
//! node. [`JsonRefs`] writes the first occurrence of every array or object in
//! full and every later occurrence as a marker pointing back at it:
//!
//! ```text
//! {"o1":{"n":123},"o1_list":[{"$ref":"$.o1"},{"$ref":"$.o1"}]}
//! ```
//!
//! Paths start at `$` and append `.key` for identifier-like keys,
//! `["any key"]` for everything else and `[index]` for array items. An object
//! whose only key is `$ref` or `$escape` is written as `{"$escape": {...}}` so
//! it is never mistaken for a marker.
//!
//! The decoder rebuilds one shared node per path, so every marker resolves to
//! the very node built for its target.

use std::collections::HashMap;

use serde_json::Value as Json;

use crate::Value;
use crate::serialization::{DeserializationError, SerializationError, Strategy};
use crate::value::Map;

const REF_KEY: &str = "$ref";
const ESCAPE_KEY: &str = "$escape";

/// Reference-preserving JSON strategy.
///
/// The wire form is a [`Value::String`] holding the JSON text.
///
/// # Examples
///
/// ```rust
/// use pubsub_rpc::serialization::{JsonRefs, Strategy};
/// use pubsub_rpc::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let shared = Value::from(serde_json::json!({"n": 123}));
/// let value = Value::array(vec![shared.clone(), shared]);
///
/// let decoded = JsonRefs.decode(JsonRefs.encode(value)?)?;
/// let items = decoded.as_array().unwrap();
/// assert!(Value::same_node(&items[0], &items[1]));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonRefs;

impl Strategy for JsonRefs {
    fn encode(&self, value: Value) -> Result<Value, SerializationError> {
        let mut seen = HashMap::new();
        let json = encode_node(&value, "$".to_owned(), &mut seen);
        Ok(Value::String(serde_json::to_string(&json)?))
    }

    fn decode(&self, wire: Value) -> Result<Value, DeserializationError> {
        let Some(text) = wire.as_str() else {
            return Err(DeserializationError::new(format!(
                "json-refs payload must be a string, got {}",
                wire.kind()
            )));
        };
        let json: Json = serde_json::from_str(text)?;
        let mut built = HashMap::new();
        decode_node(json, "$".to_owned(), &mut built)
    }

    fn name(&self) -> &'static str {
        "json-refs"
    }
}

/// Appends the segment for an object key to `path`.
fn key_path(path: &str, key: &str) -> String {
    let mut chars = key.chars();
    let identifier = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if identifier {
        format!("{path}.{key}")
    } else {
        // serde_json quoting cannot fail for a plain string
        let quoted = serde_json::to_string(key).unwrap_or_default();
        format!("{path}[{quoted}]")
    }
}

fn looks_like_marker(entries: &serde_json::Map<String, Json>) -> bool {
    entries.len() == 1 && (entries.contains_key(REF_KEY) || entries.contains_key(ESCAPE_KEY))
}

fn encode_node(value: &Value, path: String, seen: &mut HashMap<usize, String>) -> Json {
    if let Some(addr) = value.node_addr() {
        if let Some(target) = seen.get(&addr) {
            let mut marker = serde_json::Map::new();
            marker.insert(REF_KEY.to_owned(), Json::String(target.clone()));
            return Json::Object(marker);
        }
        seen.insert(addr, path.clone());
    }

    match value {
        Value::Array(items) => Json::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| encode_node(item, format!("{path}[{i}]"), seen))
                .collect(),
        ),
        Value::Object(entries) => {
            let mut object = serde_json::Map::new();
            for (key, child) in entries.iter() {
                let child = encode_node(child, key_path(&path, key), seen);
                object.insert(key.clone(), child);
            }
            if looks_like_marker(&object) {
                let mut escaped = serde_json::Map::new();
                escaped.insert(ESCAPE_KEY.to_owned(), Json::Object(object));
                Json::Object(escaped)
            } else {
                Json::Object(object)
            }
        }
        scalar => scalar.to_json(),
    }
}

fn decode_node(
    json: Json,
    path: String,
    built: &mut HashMap<String, Value>,
) -> Result<Value, DeserializationError> {
    match json {
        Json::Array(items) => {
            let mut decoded = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                decoded.push(decode_node(item, format!("{path}[{i}]"), built)?);
            }
            let node = Value::array(decoded);
            built.insert(path, node.clone());
            Ok(node)
        }
        Json::Object(mut entries) => {
            if looks_like_marker(&entries) {
                if let Some(target) = entries.remove(REF_KEY) {
                    let Json::String(target) = target else {
                        return Err(DeserializationError::new(format!(
                            "reference marker at {path} is not a string"
                        )));
                    };
                    return built.get(&target).cloned().ok_or_else(|| {
                        DeserializationError::new(format!(
                            "reference at {path} points to unknown path {target}"
                        ))
                    });
                }
                if let Some(Json::Object(inner)) = entries.remove(ESCAPE_KEY) {
                    return decode_object(inner, path, built);
                }
                return Err(DeserializationError::new(format!(
                    "escape marker at {path} does not wrap an object"
                )));
            }
            decode_object(entries, path, built)
        }
        scalar => Ok(Value::from(scalar)),
    }
}

fn decode_object(
    entries: serde_json::Map<String, Json>,
    path: String,
    built: &mut HashMap<String, Value>,
) -> Result<Value, DeserializationError> {
    let mut decoded = Map::new();
    for (key, child) in entries {
        let child = decode_node(child, key_path(&path, &key), built)?;
        decoded.insert(key, child);
    }
    let node = Value::object(decoded);
    built.insert(path, node.clone());
    Ok(node)
}
