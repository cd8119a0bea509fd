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

//! Dynamic payload values.
//!
//! Everything that crosses an event channel (envelopes, action arguments,
//! emitted data) is a [`Value`]. The model mirrors JSON with one addition,
//! [`Value::Bytes`], for binary wire formats.
//!
//! # Node identity
//!
//! Arrays and objects are reference counted. Cloning a value shares the node
//! instead of copying it, and [`Value::same_node`] tells whether two values
//! point at the same node. This is what lets the passthrough strategy hand the
//! caller the very object the provider emitted, and what the reference
//! preserving strategy restores after a round trip.
//!
//! ```rust
//! use pubsub_rpc::Value;
//!
//! let shared = Value::from(serde_json::json!({"n": 123}));
//! let list = Value::array(vec![shared.clone(), shared.clone()]);
//!
//! let items = list.as_array().unwrap();
//! assert!(Value::same_node(&items[0], &items[1]));
//! assert!(Value::same_node(&items[0], &shared));
//! ```

mod serde_impl;

use crate::serialization::{DeserializationError, SerializationError};
use bytes::Bytes;
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Object node contents.
pub type Map = BTreeMap<String, Value>;

/// A dynamic payload value.
///
/// Equality (`==`) is deep equality. Use [`Value::same_node`] for identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value. Also used for "void" action results.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A JSON number.
    Number(Number),
    /// A UTF-8 string.
    String(String),
    /// Opaque binary data, produced by binary wire strategies.
    Bytes(Bytes),
    /// A shared array node.
    Array(Arc<Vec<Value>>),
    /// A shared object node.
    Object(Arc<Map>),
}

impl Value {
    /// Creates an array node from its items.
    #[must_use]
    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Arc::new(items))
    }

    /// Creates an object node from its entries.
    #[must_use]
    pub fn object(entries: Map) -> Self {
        Self::Object(Arc::new(entries))
    }

    /// Creates an object node from `(key, value)` pairs.
    ///
    /// ```rust
    /// use pubsub_rpc::Value;
    ///
    /// let v = Value::from_pairs([("uid", Value::from("abc")), ("count", Value::from(3))]);
    /// assert_eq!(v.get("uid").and_then(Value::as_str), Some("abc"));
    /// ```
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Converts any serializable type into a value.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] when `serde` refuses the input, for
    /// example a map with non-string keys.
    pub fn from_serialize<T>(value: &T) -> Result<Self, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        serde_json::to_value(value)
            .map(Self::from)
            .map_err(|e| SerializationError::with_source("value conversion failed", e))
    }

    /// Converts this value into a typed representation.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if the shape does not match `T`.
    pub fn deserialize_into<T>(&self) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_value(self.to_json())
            .map_err(|e| DeserializationError::with_source("value conversion failed", e))
    }

    /// Returns `true` when both values refer to the same array or object node.
    ///
    /// Scalars never share identity, so this is always `false` for them.
    #[must_use]
    pub fn same_node(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address of the shared node, if this is an array or object.
    pub(crate) fn node_addr(&self) -> Option<usize> {
        match self {
            Self::Array(items) => Some(Arc::as_ptr(items) as *const () as usize),
            Self::Object(entries) => Some(Arc::as_ptr(entries) as *const () as usize),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number as `i64` when it fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Returns the number as `u64` when it fits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Returns the number as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the binary contents, if this is [`Value::Bytes`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the array items, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns the object entries, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up `key` when this is an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|entries| entries.get(key))
    }

    /// Deep-copies this value into a `serde_json::Value`.
    ///
    /// Bytes become arrays of numbers, as `serde_json` represents them.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => serde_json::Value::Array(
                b.iter().map(|byte| serde_json::Value::from(*byte)).collect(),
            ),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "<{}>", self.kind()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Self::object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Number(Number::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::array(items)
    }
}

impl From<Map> for Value {
    fn from(entries: Map) -> Self {
        Self::object(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_clone_shares_nodes() {
        let v = Value::from(json!({"a": [1, 2, 3]}));
        let copy = v.clone();
        assert!(Value::same_node(&v, &copy));
        assert_eq!(v, copy);
    }

    #[test]
    fn test_equal_but_distinct_nodes() {
        let a = Value::from(json!({"a": 1}));
        let b = Value::from(json!({"a": 1}));
        assert_eq!(a, b);
        assert!(!Value::same_node(&a, &b));
    }

    #[test]
    fn test_scalars_have_no_identity() {
        let s = Value::from("text");
        assert!(!Value::same_node(&s, &s.clone()));
        assert_eq!(s.node_addr(), None);
    }

    #[test]
    fn test_json_conversion() {
        let original = json!({"name": "w-456", "list": [1, true, null, 2.5]});
        let value = Value::from(original.clone());
        assert_eq!(value.to_json(), original);
        assert_eq!(value.get("name").and_then(Value::as_str), Some("w-456"));
        assert_eq!(value.get("list").and_then(Value::as_array).map(<[Value]>::len), Some(4));
    }

    #[test]
    fn test_typed_round_trip() {
        let value = Value::from_serialize(&Point { x: 3, y: -4 }).unwrap();
        assert_eq!(value.get("x").and_then(Value::as_i64), Some(3));
        let point: Point = value.deserialize_into().unwrap();
        assert_eq!(point, Point { x: 3, y: -4 });
    }

    #[test]
    fn test_typed_mismatch() {
        let value = Value::from("not a point");
        let result: Result<Point, _> = value.deserialize_into();
        assert!(result.is_err());
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert!(Value::from(f64::NAN).is_null());
        assert_eq!(Value::from(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn test_display_is_json() {
        let value = Value::from(json!({"k": [1, "two"]}));
        assert_eq!(value.to_string(), r#"{"k":[1,"two"]}"#);
    }
}
