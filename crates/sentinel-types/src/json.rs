//! A JSON value type that treats numbers as opaque decimal literals.
//!
//! `serde_json::Value` round-trips numbers through `f64` by default, which
//! silently reformats or loses precision for values outside the safe
//! integer range. Audit payloads must be byte-exact on the wire (see
//! the canonicalizer in `sentinel-canon`), so this crate's `JsonValue`
//! carries numbers as their original decimal text and only interprets
//! them when a caller asks for an `f64`/`i64` view.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A JSON-representable value, with numbers kept as exact decimal text.
#[derive(Clone, Debug, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(NumberLiteral),
    String(String),
    Array(Vec<JsonValue>),
    Object(BTreeMap<String, JsonValue>),
}

// `#[derive(Serialize, Deserialize)]` with `#[serde(untagged)]` would try
// `Number(NumberLiteral)` first via `NumberLiteral`'s own (transparent,
// string-backed) impl, which rejects a real JSON number token outright and
// falls through every other variant too — untagged enums cannot dispatch
// on "is this token a JSON number" the way a real JSON value needs. Route
// through `serde_json::Value` instead, which already knows how to tell a
// number from a string; `to_serde_json`/`from_serde_json` do the rest.
impl Serialize for JsonValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_serde_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(JsonValue::from_serde_json(value))
    }
}

/// A number preserved in its original minimal-decimal textual form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumberLiteral(String);

impl NumberLiteral {
    /// Construct from exact decimal text. Does not validate JSON-number
    /// grammar; callers that parse untrusted input should go through
    /// `JsonValue::from_serde_json`, which does validate via `serde_json`.
    pub fn from_raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.0.parse().ok()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl From<i64> for NumberLiteral {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl From<u64> for NumberLiteral {
    fn from(v: u64) -> Self {
        Self(v.to_string())
    }
}

impl From<&str> for NumberLiteral {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<f64> for NumberLiteral {
    fn from(v: f64) -> Self {
        Self(crate::json::minimal_decimal(v))
    }
}

impl fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Format a finite `f64` as the minimal decimal form required by
/// `sentinel-canon`: no leading zeros, no trailing fractional zeros, no
/// exponent for magnitudes within the `f64` integer-safe range.
pub fn minimal_decimal(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value}");
        s
    }
}

impl Default for JsonValue {
    fn default() -> Self {
        JsonValue::Object(BTreeMap::new())
    }
}

impl JsonValue {
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            JsonValue::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Convert from a `serde_json::Value`, preserving number text exactly
    /// when the `arbitrary_precision`-independent path is used (this crate
    /// re-parses via `Number::to_string`, which `serde_json` guarantees is
    /// stable for numbers it produced from text it parsed).
    pub fn from_serde_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => JsonValue::Number(NumberLiteral(n.to_string())),
            serde_json::Value::String(s) => JsonValue::String(s),
            serde_json::Value::Array(a) => {
                JsonValue::Array(a.into_iter().map(JsonValue::from_serde_json).collect())
            }
            serde_json::Value::Object(o) => JsonValue::Object(
                o.into_iter()
                    .map(|(k, v)| (k, JsonValue::from_serde_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to a `serde_json::Value` for callers that need the ecosystem
    /// type (HTTP bodies, sqlx `JSONB` columns). Numeric text that is not
    /// valid JSON-number grammar becomes a string rather than panicking.
    pub fn to_serde_json(&self) -> serde_json::Value {
        match self {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Bool(b) => serde_json::Value::Bool(*b),
            JsonValue::Number(n) => serde_json::from_str::<serde_json::Number>(n.as_str())
                .map(serde_json::Value::Number)
                .unwrap_or_else(|_| serde_json::Value::String(n.as_str().to_string())),
            JsonValue::String(s) => serde_json::Value::String(s.clone()),
            JsonValue::Array(a) => {
                serde_json::Value::Array(a.iter().map(JsonValue::to_serde_json).collect())
            }
            JsonValue::Object(o) => serde_json::Value::Object(
                o.iter()
                    .map(|(k, v)| (k.clone(), v.to_serde_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(v: serde_json::Value) -> Self {
        JsonValue::from_serde_json(v)
    }
}

impl From<JsonValue> for serde_json::Value {
    fn from(v: JsonValue) -> Self {
        v.to_serde_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_round_trips_exact_text() {
        let v = JsonValue::from_serde_json(serde_json::json!(0.1));
        assert_eq!(v, JsonValue::Number(NumberLiteral::from_raw("0.1")));
    }

    #[test]
    fn large_integer_preserves_digits() {
        let raw = "123456789012345678901234567890";
        let parsed: serde_json::Value = serde_json::from_str(raw).unwrap();
        let v = JsonValue::from_serde_json(parsed);
        match &v {
            JsonValue::Number(n) => assert_eq!(n.as_str(), raw),
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn object_keys_preserved_unordered_input() {
        let v = JsonValue::from_serde_json(serde_json::json!({"b": 1, "a": 2}));
        let obj = v.as_object().unwrap();
        let keys: Vec<_> = obj.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
