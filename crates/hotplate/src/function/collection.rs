//! list and map functions
use crate::error::{Error, Result};
use crate::function::{self, fixed_args, list_args, Call, Function};
use crate::snippet::Snippet;
use crate::stack::Stack;
use crate::template::Parser;
use crate::value::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

fn incorrect(call: &Call, example: &str) -> Error {
    Error::invalid(format!(
        "Incorrect arguments to \"{}\" should be: {example}",
        call.name
    ))
}

/// `Fn::Select`: `[index, collection]`
///
/// Lists are indexed by integer, maps by key. A string collection is decoded as JSON first. Missing entries
/// select an empty string.
#[derive(Debug)]
pub struct Select {
    call: Call,
}

impl Select {
    const EXAMPLE: &'static str = "[index, collection]";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<2>(&call, Self::EXAMPLE)?;
        Ok(Arc::new(Self { call }))
    }
}

impl Function for Select {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let [index, collection] = fixed_args::<2>(&self.call, Self::EXAMPLE)?;
        let index = function::resolve(index, stack)?;
        let mut collection = function::resolve(collection, stack)?;

        if let Value::String(text) = &collection {
            collection = serde_json::from_str(text).map_err(|error| {
                Error::invalid(format!("\"{}\": {error}", self.call.name))
            })?;
        }

        let empty = || Value::String(String::new());
        match collection {
            Value::Object(map) => match index {
                Value::String(key) => Ok(map.get(&key).cloned().unwrap_or_else(empty)),
                _ => Err(Error::invalid(format!(
                    "Index to \"{}\" must be a string",
                    self.call.name
                ))),
            },
            Value::Array(list) => {
                let index = match &index {
                    Value::Integer(index) => Some(*index),
                    Value::String(index) => index.trim().parse::<i64>().ok(),
                    _ => None,
                };
                let Some(index) = index else {
                    return Err(Error::invalid(format!(
                        "Index to \"{}\" must be an integer",
                        self.call.name
                    )));
                };
                let position = if index < 0 {
                    usize::try_from(index.unsigned_abs())
                        .ok()
                        .and_then(|back| list.len().checked_sub(back))
                } else {
                    usize::try_from(index).ok()
                };
                Ok(position
                    .and_then(|position| list.get(position).cloned())
                    .unwrap_or_else(empty))
            }
            Value::Null => Ok(empty()),
            _ => Err(Error::invalid(format!(
                "Arguments to \"{}\" not fully resolved",
                self.call.name
            ))),
        }
    }
}

/// `Fn::MemberListToMap`: `[key_name, value_name, ["member.N.<key_name>=k", "member.N.<value_name>=v", ...]]`
#[derive(Debug)]
pub struct MemberListToMap {
    call: Call,
}

impl MemberListToMap {
    const EXAMPLE: &'static str = "[key_name, value_name, list]";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        match fixed_args::<3>(&call, Self::EXAMPLE)? {
            [Snippet::String(_), Snippet::String(_), _] => Ok(Arc::new(Self { call })),
            _ => Err(incorrect(&call, Self::EXAMPLE)),
        }
    }
}

impl Function for MemberListToMap {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let [key_name, value_name, members] = fixed_args::<3>(&self.call, Self::EXAMPLE)?;
        let (Some(key_name), Some(value_name)) = (key_name.as_str(), value_name.as_str()) else {
            return Err(incorrect(&self.call, Self::EXAMPLE));
        };
        let members = match function::resolve(members, stack)? {
            Value::Array(members) => members,
            _ => {
                return Err(Error::invalid(format!(
                    "Member list must be a list (in \"{}\")",
                    self.call.name
                )))
            }
        };

        let mut entries: BTreeMap<u64, Map> = BTreeMap::new();
        for member in &members {
            let Value::String(member) = member else {
                return Err(Error::invalid(format!(
                    "Member list items must be strings (in \"{}\")",
                    self.call.name
                )));
            };
            let Some((key, value)) = member.split_once('=') else {
                continue;
            };
            let key = key.strip_prefix('.').unwrap_or(key);
            let Some(rest) = key.strip_prefix("member.") else {
                continue;
            };
            let Some((index, field)) = rest.split_once('.') else {
                continue;
            };
            let Ok(index) = index.parse::<u64>() else {
                continue;
            };
            entries
                .entry(index)
                .or_default()
                .insert(field.to_string(), value.into());
        }

        Ok(Value::Object(
            entries
                .into_values()
                .filter_map(|entry| {
                    let key = entry.get(key_name)?.as_str()?.to_string();
                    Some((key, entry.get(value_name)?.clone()))
                })
                .collect(),
        ))
    }
}

/// `repeat`: instantiate a template once per combination of loop values
///
/// ```yaml
/// repeat:
///   for_each:
///     <%port%>: [80, 443]
///   template:
///     port_range_min: <%port%>
/// ```
#[derive(Debug)]
pub struct Repeat {
    call: Call,
    allow_permutations: bool,
}

impl Repeat {
    const EXAMPLE: &'static str = "{for_each: {placeholder: [value, ...]}, template: template}";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Self::build_with(call, false)
    }

    /// Also accepts `permutations: false` to zip the loop values instead of combining them
    pub fn build_with_permutations(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Self::build_with(call, true)
    }

    fn build_with(call: Call, allow_permutations: bool) -> Result<Arc<dyn Function>> {
        let Some(args) = call.args.as_map() else {
            return Err(incorrect(&call, Self::EXAMPLE));
        };
        let allowed = |key: &str| {
            matches!(key, "for_each" | "template") || (allow_permutations && key == "permutations")
        };
        if !args.contains_key("for_each")
            || !args.contains_key("template")
            || args.keys().any(|key| !allowed(key))
        {
            return Err(incorrect(&call, Self::EXAMPLE));
        }
        if !matches!(args["for_each"], Snippet::Map(_) | Snippet::Function(_)) {
            return Err(Error::invalid(format!(
                "The \"for_each\" argument to \"{}\" must contain a map",
                call.name
            )));
        }
        Ok(Arc::new(Self {
            call,
            allow_permutations,
        }))
    }

    fn replace(&self, template: &Value, substitutions: &[(&str, String)]) -> Value {
        let text = |text: &str| {
            substitutions
                .iter()
                .fold(text.to_string(), |text, (placeholder, value)| {
                    text.replace(placeholder, value)
                })
        };
        match template {
            Value::String(s) => Value::String(text(s)),
            Value::Array(list) => Value::Array(
                list.iter()
                    .map(|item| self.replace(item, substitutions))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (text(key), self.replace(value, substitutions)))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }
}

impl Function for Repeat {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let args = self
            .call
            .args
            .as_map()
            .ok_or_else(|| incorrect(&self.call, Self::EXAMPLE))?;
        let Some(for_each) = args.get("for_each") else {
            return Err(incorrect(&self.call, Self::EXAMPLE));
        };
        let Value::Object(for_each) = function::resolve(for_each, stack)? else {
            return Err(Error::invalid(format!(
                "The \"for_each\" argument to \"{}\" must contain a map",
                self.call.name
            )));
        };
        let template = args
            .get("template")
            .map(|template| function::resolve(template, stack))
            .transpose()?
            .unwrap_or_default();
        let permutations = match args.get("permutations") {
            None => true,
            Some(permutations) => match function::resolve(permutations, stack)? {
                Value::Boolean(permutations) => permutations,
                _ => {
                    return Err(Error::invalid(format!(
                        "\"permutations\" should be boolean type for \"{}\" function",
                        self.call.name
                    )))
                }
            },
        };

        let mut loops: Vec<(&str, Vec<String>)> = Vec::with_capacity(for_each.len());
        for (placeholder, values) in &for_each {
            let Value::Array(values) = values else {
                return Err(Error::invalid(format!(
                    "The values of the \"for_each\" argument to \"{}\" must be lists",
                    self.call.name
                )));
            };
            let values = values
                .iter()
                .map(|value| {
                    value.scalar_text().ok_or_else(|| {
                        Error::invalid(format!(
                            "\"{}\" loop values must be strings or numbers, not {}",
                            self.call.name,
                            value.short_repr()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            loops.push((placeholder.as_str(), values));
        }

        let combinations = if permutations || !self.allow_permutations {
            cartesian_product(&loops)
        } else {
            let length = loops.first().map(|(_, values)| values.len()).unwrap_or(0);
            if loops.iter().any(|(_, values)| values.len() != length) {
                return Err(Error::invalid(format!(
                    "For \"{}\" the lists in \"for_each\" must have the same length when \"permutations\" is false",
                    self.call.name
                )));
            }
            (0..length)
                .map(|index| {
                    loops
                        .iter()
                        .map(|(placeholder, values)| (*placeholder, values[index].clone()))
                        .collect()
                })
                .collect()
        };

        Ok(Value::Array(
            combinations
                .iter()
                .map(|substitutions| self.replace(&template, substitutions))
                .collect(),
        ))
    }
}

/// Every combination of one value per loop, first loop varying slowest
fn cartesian_product<'a>(loops: &[(&'a str, Vec<String>)]) -> Vec<Vec<(&'a str, String)>> {
    loops
        .iter()
        .fold(vec![Vec::new()], |combinations, (placeholder, values)| {
            combinations
                .iter()
                .flat_map(|combination| {
                    values.iter().map(move |value| {
                        let mut next = combination.clone();
                        next.push((*placeholder, value.clone()));
                        next
                    })
                })
                .collect()
        })
}

/// `map_merge`: later maps override earlier ones
#[derive(Debug)]
pub struct MapMerge {
    call: Call,
}

impl MapMerge {
    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        list_args(&call, "[{...}, {...}]")?;
        Ok(Arc::new(Self { call }))
    }
}

impl Function for MapMerge {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let mut merged = Map::new();
        for map in list_args(&self.call, "[{...}, {...}]")? {
            match function::resolve(map, stack)? {
                Value::Null => {}
                Value::Object(map) => merged.extend(map),
                other => {
                    return Err(Error::invalid(format!(
                        "Incorrect arguments: Items to merge must be maps. {} is not a map",
                        other.short_repr()
                    )))
                }
            }
        }
        Ok(Value::Object(merged))
    }
}

/// `map_replace`: rename keys and replace values of a map
///
/// ```yaml
/// map_replace:
///   - { k1: v1, k2: v2 }
///   - keys: { k1: K1 }
///     values: { v2: V2 }
/// ```
#[derive(Debug)]
pub struct MapReplace {
    call: Call,
}

impl MapReplace {
    const EXAMPLE: &'static str = "[{...}, {keys: {...}, values: {...}}]";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<2>(&call, Self::EXAMPLE)?;
        Ok(Arc::new(Self { call }))
    }

    fn replacements(&self, replacements: &Map, key: &str) -> Result<Map> {
        match replacements.get(key) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(Error::invalid(format!(
                "\"{}\" {key} must be a map",
                self.call.name
            ))),
        }
    }
}

impl Function for MapReplace {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let [input, replacements] = fixed_args::<2>(&self.call, Self::EXAMPLE)?;
        let input = match function::resolve(input, stack)? {
            Value::Object(input) => input,
            _ => return Err(incorrect(&self.call, Self::EXAMPLE)),
        };
        let replacements = match function::resolve(replacements, stack)? {
            Value::Object(replacements)
                if replacements.keys().all(|key| key == "keys" || key == "values") =>
            {
                replacements
            }
            _ => return Err(incorrect(&self.call, Self::EXAMPLE)),
        };
        let keys = self.replacements(&replacements, "keys")?;
        let values = self.replacements(&replacements, "values")?;

        let mut output = Map::new();
        for (key, value) in &input {
            let renamed = match keys.get(key) {
                None => key.clone(),
                Some(Value::String(renamed)) => {
                    if renamed != key && input.contains_key(renamed) {
                        return Err(Error::invalid(format!(
                            "key replacement {renamed} collides with a key in the input map"
                        )));
                    }
                    renamed.clone()
                }
                Some(other) => {
                    return Err(Error::invalid(format!(
                        "key replacement {} must be a string",
                        other.short_repr()
                    )))
                }
            };
            if output.contains_key(&renamed) {
                return Err(Error::invalid(format!(
                    "key replacement {renamed} collides with a key in the output map"
                )));
            }
            let value = match value {
                Value::String(text) => values.get(text).cloned().unwrap_or_else(|| value.clone()),
                _ => value.clone(),
            };
            output.insert(renamed, value);
        }
        Ok(Value::Object(output))
    }
}

/// `filter`: `[values_to_remove, list]`
#[derive(Debug)]
pub struct Filter {
    call: Call,
}

impl Filter {
    const EXAMPLE: &'static str = "[[value, ...], [value, ...]]";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<2>(&call, Self::EXAMPLE)?;
        Ok(Arc::new(Self { call }))
    }
}

impl Function for Filter {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let [remove, list] = fixed_args::<2>(&self.call, Self::EXAMPLE)?;
        let remove = match function::resolve(remove, stack)? {
            Value::Null => Vec::new(),
            Value::Array(remove) => remove,
            _ => return Err(incorrect(&self.call, Self::EXAMPLE)),
        };
        let Value::Array(list) = function::resolve(list, stack)? else {
            return Err(incorrect(&self.call, Self::EXAMPLE));
        };
        Ok(Value::Array(
            list.into_iter()
                .filter(|item| !remove.contains(item))
                .collect(),
        ))
    }
}

/// `list_concat` / `list_concat_unique`
#[derive(Debug)]
pub struct ListConcat {
    call: Call,
    unique: bool,
}

impl ListConcat {
    const EXAMPLE: &'static str = "[[item, ...], [item, ...], ...]";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        list_args(&call, Self::EXAMPLE)?;
        Ok(Arc::new(Self {
            call,
            unique: false,
        }))
    }

    pub fn build_unique(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        list_args(&call, Self::EXAMPLE)?;
        Ok(Arc::new(Self { call, unique: true }))
    }
}

impl Function for ListConcat {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let mut concatenated: Vec<Value> = Vec::new();
        for list in list_args(&self.call, Self::EXAMPLE)? {
            match function::resolve(list, stack)? {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if !self.unique || !concatenated.contains(&item) {
                            concatenated.push(item);
                        }
                    }
                }
                _ => return Err(incorrect(&self.call, Self::EXAMPLE)),
            }
        }
        Ok(Value::Array(concatenated))
    }
}

/// `contains`: `[value, list]`
#[derive(Debug)]
pub struct Contains {
    call: Call,
}

impl Contains {
    const EXAMPLE: &'static str = "[value, [value1, value2, ...]]";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<2>(&call, Self::EXAMPLE)?;
        Ok(Arc::new(Self { call }))
    }
}

impl Function for Contains {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let [needle, haystack] = fixed_args::<2>(&self.call, Self::EXAMPLE)?;
        let needle = function::resolve(needle, stack)?;
        match function::resolve(haystack, stack)? {
            Value::Array(haystack) => Ok(Value::Boolean(haystack.contains(&needle))),
            other => Err(Error::invalid(format!(
                "\"{}\" can't work with {}, should be a list",
                self.call.name,
                other.short_repr()
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::function;
    use crate::stack::{Stack, StaticResources};
    use crate::value::{Map, Value};
    use pretty_assertions::assert_eq;

    fn value(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn resolve(version: &str, yaml: &str) -> crate::error::Result<Value> {
        let template = crate::template!(&format!("heat_template_version: {version}"));
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template.parse_snippet(stack.id(), &value(yaml))?;
        function::resolve(&snippet, &stack)
    }

    fn pike(yaml: &str) -> crate::error::Result<Value> {
        resolve("2017-09-01", yaml)
    }

    #[test]
    fn select_boundaries() {
        assert_eq!(pike("{ 'Fn::Select': ['1', [x, y, z]] }").unwrap(), Value::from("y"));
        assert_eq!(pike("{ 'Fn::Select': ['0', []] }").unwrap(), Value::from(""));
        assert_eq!(
            pike("{ 'Fn::Select': [missing, { a: 1 }] }").unwrap(),
            Value::from("")
        );
        assert_eq!(
            pike(r#"{ 'Fn::Select': [a, '{"a": 7}'] }"#).unwrap(),
            Value::Integer(7)
        );
        assert!(pike("{ 'Fn::Select': [0, { a: 1 }] }").is_err());
        assert!(pike("{ 'Fn::Select': [a, [x]] }").is_err());
    }

    #[test]
    fn member_list_to_map() {
        let template = crate::template!("AWSTemplateFormatVersion: 2010-09-09");
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template
            .parse_snippet(
                stack.id(),
                &value(
                    "{ 'Fn::MemberListToMap': [Name, Value, ['.member.0.Name=key', '.member.0.Value=door', '.member.1.Name=colour', '.member.1.Value=green']] }",
                ),
            )
            .unwrap();
        assert_eq!(
            function::resolve(&snippet, &stack).unwrap(),
            value("{ key: door, colour: green }")
        );
    }

    #[test]
    fn repeat_permutations() {
        assert_eq!(
            pike("{ repeat: { for_each: { '%a%': [1, 2], '%b%': [x, y] }, template: '%a%-%b%' } }").unwrap(),
            value("['1-x', '1-y', '2-x', '2-y']")
        );
    }

    #[test]
    fn repeat_zip() {
        assert_eq!(
            pike("{ repeat: { for_each: { '%a%': [1, 2], '%b%': [x, y] }, template: { '%b%': '%a%' }, permutations: false } }")
                .unwrap(),
            value("[{ x: '1' }, { y: '2' }]")
        );
        assert!(pike("{ repeat: { for_each: { '%a%': [1], '%b%': [x, y] }, template: a, permutations: false } }").is_err());
        assert!(resolve("2015-04-30", "{ repeat: { for_each: { a: [1] }, template: a, permutations: false } }").is_err());
    }

    #[test]
    fn map_merge() {
        assert_eq!(
            pike("{ map_merge: [{ a: 1, b: 1 }, null, { b: 2 }] }").unwrap(),
            value("{ a: 1, b: 2 }")
        );
        assert!(pike("{ map_merge: [{ a: 1 }, [b]] }").is_err());
    }

    #[test]
    fn map_replace() {
        assert_eq!(
            pike("{ map_replace: [{ k1: v1, k2: v2 }, { keys: { k1: K1 }, values: { v2: V2 } }] }").unwrap(),
            value("{ K1: v1, k2: V2 }")
        );
        assert!(pike("{ map_replace: [{ k1: v1, k2: v2 }, { keys: { k1: k2 } }] }").is_err());
    }

    #[test]
    fn filter_concat_contains() {
        assert_eq!(
            pike("{ filter: [[null, b], [a, null, b, c]] }").unwrap(),
            value("[a, c]")
        );
        assert_eq!(
            pike("{ list_concat: [[a, b], null, [b]] }").unwrap(),
            value("[a, b, b]")
        );
        assert_eq!(
            pike("{ list_concat_unique: [[a, b], [b, c]] }").unwrap(),
            value("[a, b, c]")
        );
        assert_eq!(pike("{ contains: [b, [a, b]] }").unwrap(), Value::Boolean(true));
        assert!(pike("{ contains: [b, text] }").is_err());
    }
}
