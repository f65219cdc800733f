//! template parameters
use crate::error::{Error, Result};
use crate::stack::StackId;
use crate::template::{Section, Template};
use crate::value::{Map, Value};
use indexmap::IndexMap;

const DEFAULT_REGION: &str = "ap-southeast-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Number,
    CommaDelimitedList,
    Json,
    Boolean,
}

impl ParameterType {
    fn parse(text: &str, hot: bool) -> Option<Self> {
        let kind = if hot {
            match text {
                "string" => ParameterType::String,
                "number" => ParameterType::Number,
                "comma_delimited_list" => ParameterType::CommaDelimitedList,
                "json" => ParameterType::Json,
                "boolean" => ParameterType::Boolean,
                _ => return None,
            }
        } else {
            match text {
                "String" => ParameterType::String,
                "Number" => ParameterType::Number,
                "CommaDelimitedList" => ParameterType::CommaDelimitedList,
                "Json" => ParameterType::Json,
                "Boolean" => ParameterType::Boolean,
                _ => return None,
            }
        };
        Some(kind)
    }

    /// Convert a user supplied or default value to this type
    pub fn convert(self, name: &str, value: &Value) -> Result<Value> {
        let invalid = |expected: &str| {
            Error::invalid(format!(
                "Parameter '{name}' is invalid: value {} is not {expected}",
                value.short_repr()
            ))
        };

        match self {
            ParameterType::String => match value {
                Value::Array(_) | Value::Object(_) => Err(invalid("a string")),
                scalar => Ok(Value::String(scalar.scalar_text().unwrap_or_default())),
            },
            ParameterType::Number => match value {
                Value::Integer(_) | Value::Decimal(_) => Ok(value.clone()),
                Value::String(text) => {
                    let text = text.trim();
                    if let Ok(integer) = text.parse::<i64>() {
                        Ok(Value::Integer(integer))
                    } else if let Ok(decimal) = text.parse::<f64>() {
                        Ok(Value::Decimal(decimal))
                    } else {
                        Err(invalid("a number"))
                    }
                }
                _ => Err(invalid("a number")),
            },
            ParameterType::CommaDelimitedList => match value {
                Value::String(text) if text.is_empty() => Ok(Value::Array(Vec::new())),
                Value::String(text) => Ok(Value::Array(
                    text.split(',').map(|item| item.trim().into()).collect(),
                )),
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.scalar_text().map(Value::String).ok_or_else(|| invalid("a list of strings")))
                    .collect::<Result<_>>()
                    .map(Value::Array),
                _ => Err(invalid("a comma delimited list")),
            },
            ParameterType::Json => match value {
                Value::Array(_) | Value::Object(_) => Ok(value.clone()),
                Value::String(text) if text.trim().is_empty() => Ok(Value::Object(Map::new())),
                Value::String(text) => match serde_json::from_str::<Value>(text) {
                    Ok(parsed @ (Value::Array(_) | Value::Object(_))) => Ok(parsed),
                    _ => Err(invalid("a JSON list or map")),
                },
                _ => Err(invalid("a JSON list or map")),
            },
            ParameterType::Boolean => match value {
                Value::Boolean(_) => Ok(value.clone()),
                Value::Integer(0) => Ok(Value::Boolean(false)),
                Value::Integer(1) => Ok(Value::Boolean(true)),
                Value::String(text) => match text.to_lowercase().as_str() {
                    "true" | "t" | "yes" | "y" | "on" | "1" => Ok(Value::Boolean(true)),
                    "false" | "f" | "no" | "n" | "off" | "0" => Ok(Value::Boolean(false)),
                    _ => Err(invalid("a boolean")),
                },
                _ => Err(invalid("a boolean")),
            },
        }
    }
}

/// A parameter declared in the template
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    pub name: String,
    pub kind: ParameterType,
    pub default: Option<Value>,
}

impl ParameterSchema {
    fn parse(template: &Template, name: &str, raw: &Value) -> Result<Self> {
        let hot = template.version().is_hot();
        let (type_key, default_key) = if hot {
            ("type", "default")
        } else {
            ("Type", "Default")
        };

        let Some(raw) = raw.as_object() else {
            return Err(Error::invalid(format!(
                "Invalid parameter \"{name}\": the schema must be a map"
            )));
        };
        let kind = match raw.get(type_key) {
            Some(Value::String(kind)) => ParameterType::parse(kind, hot).ok_or_else(|| {
                Error::invalid(format!("Invalid type ({kind}) of parameter \"{name}\""))
            })?,
            _ => {
                return Err(Error::invalid(format!(
                    "Missing parameter type for parameter: {name}"
                )))
            }
        };

        let default = raw
            .get(default_key)
            .map(|default| kind.convert(name, default))
            .transpose()?;

        Ok(Self {
            name: name.to_string(),
            kind,
            default,
        })
    }
}

/// Parameter values of one stack
///
/// A declared parameter without a user value or default is missing; reading it fails with
/// [Error::UserParameterMissing] while everything else keeps working.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: IndexMap<String, Option<Value>>,
}

impl Parameters {
    pub fn new(
        template: &Template,
        user: &Map,
        stack_name: &str,
        stack_id: StackId,
    ) -> Result<Self> {
        let mut schemas = IndexMap::new();
        if let Some(declared) = template.section(Section::Parameters)? {
            for (name, raw) in declared {
                schemas.insert(name.clone(), ParameterSchema::parse(template, name, raw)?);
            }
        }

        if let Some(name) = user.keys().find(|name| !schemas.contains_key(*name)) {
            return Err(Error::UnknownParameter(name.clone()));
        }

        let mut values = IndexMap::new();
        for (name, schema) in schemas {
            let value = match user.get(&name) {
                Some(value) => Some(schema.kind.convert(&name, value)?),
                None => schema.default,
            };
            values.insert(name, value);
        }

        let pseudo: [(&str, Value); 3] = if template.version().is_hot() {
            [
                ("OS::stack_name", stack_name.into()),
                ("OS::stack_id", stack_id.to_string().into()),
                ("OS::project_id", "".into()),
            ]
        } else {
            [
                ("AWS::StackName", stack_name.into()),
                (
                    "AWS::StackId",
                    format!("arn:openstack:heat:::stacks/{stack_name}/{stack_id}").into(),
                ),
                ("AWS::Region", DEFAULT_REGION.into()),
            ]
        };
        for (name, value) in pseudo {
            values.insert(name.to_string(), Some(value));
        }

        Ok(Self { values })
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn value(&self, name: &str) -> Result<Value> {
        match self.values.get(name) {
            None => Err(Error::UnknownParameter(name.to_string())),
            Some(None) => Err(Error::UserParameterMissing(name.to_string())),
            Some(Some(value)) => Ok(value.clone()),
        }
    }
}
