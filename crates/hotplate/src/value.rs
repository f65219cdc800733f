//! value representation
//!
//! A [Value] is what every snippet resolves to. It contains the following data types
//! - null
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! Objects compare equal regardless of key order. [Value::structural_hash] follows the same rule:
//! object entries are folded with XOR, array elements are folded in order.
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Deserialize, Deserializer, Serializer,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub type Map = IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Text form of a scalar, used when substituting values into strings
    ///
    /// Returns `None` for arrays and objects.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Compact JSON text of this value with object keys sorted
    pub fn to_sorted_json(&self) -> String {
        fn sorted(value: &Value) -> serde_json::Value {
            match value {
                Value::Object(map) => {
                    let mut keys: Vec<_> = map.keys().collect();
                    keys.sort();
                    serde_json::Value::Object(
                        keys.into_iter()
                            .map(|key| (key.clone(), sorted(&map[key])))
                            .collect(),
                    )
                }
                Value::Array(array) => serde_json::Value::Array(array.iter().map(sorted).collect()),
                other => serde_json::Value::from(other.clone()),
            }
        }

        sorted(self).to_string()
    }

    /// Size-bounded debug representation for error messages
    pub fn short_repr(&self) -> String {
        let mut repr = self.to_sorted_json();
        if repr.len() > 200 {
            let mut end = 200;
            while !repr.is_char_boundary(end) {
                end -= 1;
            }
            repr.truncate(end);
        }
        repr
    }

    /// Follow `path` into nested arrays and objects
    ///
    /// Arrays accept integer components or strings holding an integer, objects accept string components.
    /// Returns `None` when any component does not exist or cannot be applied.
    pub fn select(&self, path: &[Value]) -> Option<&Value> {
        path.iter().try_fold(self, |current, component| match (current, component) {
            (Value::Object(map), Value::String(key)) => map.get(key),
            (Value::Array(array), Value::Integer(index)) => {
                usize::try_from(*index).ok().and_then(|index| array.get(index))
            }
            (Value::Array(array), Value::String(index)) => {
                index.parse::<usize>().ok().and_then(|index| array.get(index))
            }
            _ => None,
        })
    }

    /// Hash that ignores object key order but respects array element order
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self {
            Value::Null => 0u8.hash(&mut hasher),
            Value::Boolean(b) => b.hash(&mut hasher),
            Value::Integer(i) => i.hash(&mut hasher),
            Value::Decimal(d) => d.to_bits().hash(&mut hasher),
            Value::String(s) => s.hash(&mut hasher),
            Value::Array(array) => {
                for element in array {
                    hasher.write_u64(element.structural_hash());
                }
            }
            Value::Object(map) => {
                let folded = map.iter().fold(0u64, |acc, (key, value)| {
                    let mut entry = DefaultHasher::new();
                    key.hash(&mut entry);
                    entry.write_u64(value.structural_hash());
                    acc ^ entry.finish()
                });
                hasher.write_u64(folded);
            }
        }
        hasher.finish()
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => b.into(),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(int) => Value::Integer(int),
                // u64 beyond i64::MAX ends up here as well
                None => Value::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(o) => {
                Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => b.into(),
            Value::Integer(i) => i.into(),
            Value::Decimal(d) => serde_json::Number::from_f64(d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => s.into(),
            Value::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            Value::Object(o) => {
                serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Into::into)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn object(entries: &[(&str, Value)]) -> Value {
        Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn object_equality_ignores_key_order() {
        let a = object(&[("one", Value::Integer(1)), ("two", Value::Integer(2))]);
        let b = object(&[("two", Value::Integer(2)), ("one", Value::Integer(1))]);
        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn array_hash_respects_order() {
        let a = Value::from(vec!["x", "y"]);
        let b = Value::from(vec!["y", "x"]);
        assert_ne!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn deserialize_yaml() {
        let value: Value = serde_yaml::from_str("a: 1\nb: [x, 2.5, true, null]").unwrap();
        assert_eq!(
            value,
            object(&[
                ("a", Value::Integer(1)),
                (
                    "b",
                    Value::Array(vec!["x".into(), Value::Decimal(2.5), true.into(), Value::Null])
                )
            ])
        );
    }

    #[test]
    fn sorted_json() {
        let value = object(&[("b", Value::Integer(1)), ("a", vec!["x"].into())]);
        assert_eq!(value.to_sorted_json(), r#"{"a":["x"],"b":1}"#);
    }
}
