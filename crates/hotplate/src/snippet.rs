//! parsed template fragments
//!
//! A [Snippet] has the shape of a [Value] but may contain [Function] nodes at any depth. Snippets are produced by
//! [crate::template::Parser] and are immutable afterwards.
use crate::function::Function;
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Snippet {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    List(Vec<Snippet>),
    Map(IndexMap<String, Snippet>),
    Function(Arc<dyn Function>),
}

impl Snippet {
    /// Render this snippet back to its wire form
    ///
    /// Functions become single-key maps `{name: args}`, macros render their rewritten tree. Parsing the result
    /// again yields an equivalent snippet.
    pub fn to_canonical_json(&self) -> Value {
        match self {
            Snippet::Null => Value::Null,
            Snippet::Boolean(b) => Value::Boolean(*b),
            Snippet::Integer(i) => Value::Integer(*i),
            Snippet::Decimal(d) => Value::Decimal(*d),
            Snippet::String(s) => Value::String(s.clone()),
            Snippet::List(list) => Value::Array(list.iter().map(Snippet::to_canonical_json).collect()),
            Snippet::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_canonical_json()))
                    .collect(),
            ),
            Snippet::Function(function) => function.to_canonical_json(),
        }
    }

    /// `true` when no [Function] node remains anywhere in the tree
    pub fn is_plain(&self) -> bool {
        match self {
            Snippet::Function(_) => false,
            Snippet::List(list) => list.iter().all(Snippet::is_plain),
            Snippet::Map(map) => map.values().all(Snippet::is_plain),
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Snippet::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Snippet::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Snippet>> {
        match self {
            Snippet::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<dyn Function>> {
        match self {
            Snippet::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Snippet::Function(_) => "function",
            Snippet::List(_) => "list",
            Snippet::Map(_) => "map",
            other => other.to_canonical_json().type_name(),
        }
    }
}

impl Default for Snippet {
    fn default() -> Self {
        Snippet::Null
    }
}

/// Snippets compare by their canonical rendering, so functions are equal when their wire forms are.
impl PartialEq for Snippet {
    fn eq(&self, other: &Self) -> bool {
        self.to_canonical_json() == other.to_canonical_json()
    }
}

impl From<Value> for Snippet {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Snippet::Null,
            Value::Boolean(b) => Snippet::Boolean(b),
            Value::Integer(i) => Snippet::Integer(i),
            Value::Decimal(d) => Snippet::Decimal(d),
            Value::String(s) => Snippet::String(s),
            Value::Array(a) => Snippet::List(a.into_iter().map(Into::into).collect()),
            Value::Object(o) => Snippet::Map(o.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<&str> for Snippet {
    fn from(value: &str) -> Self {
        Snippet::String(value.to_string())
    }
}

impl From<Arc<dyn Function>> for Snippet {
    fn from(value: Arc<dyn Function>) -> Self {
        Snippet::Function(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_values_round_trip() {
        let value: Value = serde_yaml::from_str("a: [1, two, {three: 3.5}]\nb: null").unwrap();
        let snippet = Snippet::from(value.clone());
        assert!(snippet.is_plain());
        assert_eq!(snippet.to_canonical_json(), value);
    }
}
