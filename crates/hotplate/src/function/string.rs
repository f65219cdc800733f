//! string functions
use crate::error::{Error, Result};
use crate::function::{self, fixed_args, list_args, Call, Function};
use crate::snippet::Snippet;
use crate::stack::Stack;
use crate::template::Parser;
use crate::value::Value;
use std::sync::Arc;

fn type_error(call: &Call, message: impl std::fmt::Display) -> Error {
    Error::invalid(format!("\"{}\": {message}", call.name))
}

fn resolve_string(call: &Call, snippet: &Snippet, stack: &Stack<'_>, what: &str) -> Result<String> {
    match function::resolve(snippet, stack)? {
        Value::String(text) => Ok(text),
        other => Err(type_error(
            call,
            format!("{what} must be a string, not {}", other.short_repr()),
        )),
    }
}

/// `Fn::Join` / `list_join`
///
/// The single list form only joins strings. The multi list form (`list_join` since 2015-10-15) joins any number
/// of lists and encodes maps and lists as JSON.
#[derive(Debug)]
pub struct Join {
    call: Call,
    multiple: bool,
}

impl Join {
    const EXAMPLE: &'static str = "[delimiter, [string, ...]]";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<2>(&call, Self::EXAMPLE)?;
        Ok(Arc::new(Self {
            call,
            multiple: false,
        }))
    }

    pub fn build_multiple(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        if list_args(&call, "[delimiter, [string, ...], ...]")?.len() < 2 {
            return Err(Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: [delimiter, [string, ...], ...]",
                call.name
            )));
        }
        Ok(Arc::new(Self {
            call,
            multiple: true,
        }))
    }

    fn item_text(&self, item: &Value) -> Result<String> {
        match item {
            Value::Null => Ok(String::new()),
            Value::String(text) => Ok(text.clone()),
            Value::Array(_) | Value::Object(_) if self.multiple => Ok(item.to_sorted_json()),
            other if self.multiple => Err(type_error(
                &self.call,
                format!(
                    "Items to join must be string, map or list not {}",
                    other.short_repr()
                ),
            )),
            other => Err(type_error(
                &self.call,
                format!("Items to join must be strings not {}", other.short_repr()),
            )),
        }
    }
}

impl Function for Join {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let args = list_args(&self.call, Self::EXAMPLE)?;
        let Some((delimiter, lists)) = args.split_first() else {
            return Err(Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: {}",
                self.call.name,
                Self::EXAMPLE
            )));
        };
        let delimiter = resolve_string(&self.call, delimiter, stack, "delimiter")?;

        let mut items = Vec::new();
        for list in lists {
            match function::resolve(list, stack)? {
                Value::Null => {}
                Value::Array(list) => {
                    for item in &list {
                        items.push(self.item_text(item)?);
                    }
                }
                _ => return Err(type_error(&self.call, "must operate on a list")),
            }
        }
        Ok(Value::String(items.join(&delimiter)))
    }
}

/// `Fn::Split` / `str_split`
///
/// `str_split` takes an optional index and then returns only that element.
#[derive(Debug)]
pub struct Split {
    call: Call,
}

impl Split {
    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<2>(&call, "[delimiter, string]")?;
        Ok(Arc::new(Self { call }))
    }

    pub fn build_indexed(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        let length = list_args(&call, "[delimiter, string, <index>]")?.len();
        if !(2..=3).contains(&length) {
            return Err(Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: [delimiter, string, <index>]",
                call.name
            )));
        }
        Ok(Arc::new(Self { call }))
    }
}

impl Function for Split {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let args = list_args(&self.call, "[delimiter, string]")?;
        let (delimiter, text, index) = match args {
            [delimiter, text] => (delimiter, text, None),
            [delimiter, text, index] => (delimiter, text, Some(index)),
            _ => {
                return Err(Error::invalid(format!(
                    "Incorrect arguments to \"{}\" should be: [delimiter, string]",
                    self.call.name
                )))
            }
        };
        let delimiter = resolve_string(&self.call, delimiter, stack, "delimiter")?;
        let text = match function::resolve(text, stack)? {
            Value::Null => String::new(),
            Value::String(text) => text,
            other => {
                return Err(type_error(
                    &self.call,
                    format!("can only split strings, not {}", other.short_repr()),
                ))
            }
        };
        if delimiter.is_empty() {
            return Err(type_error(&self.call, "delimiter must not be empty"));
        }

        let parts: Vec<Value> = text.split(delimiter.as_str()).map(Value::from).collect();
        let Some(index) = index else {
            return Ok(Value::Array(parts));
        };

        let index = match function::resolve(index, stack)? {
            Value::Integer(index) => Some(index),
            Value::String(index) => index.parse().ok(),
            _ => None,
        };
        index
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| parts.get(index).cloned())
            .ok_or_else(|| {
                type_error(
                    &self.call,
                    format!("Incorrect index, should be between 0 and {}", parts.len().saturating_sub(1)),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strictness {
    Lenient,
    /// every parameter must occur in the template
    Strict,
    /// additionally no parameter value may be empty
    VeryStrict,
}

/// `Fn::Replace` / `str_replace` and the strict variants
///
/// Placeholders are substituted longest first (ties keep their order), and substituted text is never scanned
/// again for other placeholders.
#[derive(Debug)]
pub struct Replace {
    call: Call,
    hot: bool,
    strictness: Strictness,
}

impl Replace {
    const CFN_EXAMPLE: &'static str = "[{placeholder: value, ...}, template]";
    const HOT_EXAMPLE: &'static str = "{template: string, params: {placeholder: value, ...}}";

    pub fn build_cfn(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<2>(&call, Self::CFN_EXAMPLE)?;
        Ok(Arc::new(Self {
            call,
            hot: false,
            strictness: Strictness::Lenient,
        }))
    }

    pub fn build_hot(parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Self::build_hot_with(parser, call, Strictness::Lenient)
    }

    pub fn build_strict(parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Self::build_hot_with(parser, call, Strictness::Strict)
    }

    pub fn build_very_strict(parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Self::build_hot_with(parser, call, Strictness::VeryStrict)
    }

    fn build_hot_with(
        _parser: &Parser<'_>,
        call: Call,
        strictness: Strictness,
    ) -> Result<Arc<dyn Function>> {
        let valid = match &call.args {
            Snippet::Map(map) => {
                map.len() == 2 && map.contains_key("template") && map.contains_key("params")
            }
            _ => false,
        };
        if !valid {
            return Err(Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: {}",
                call.name,
                Self::HOT_EXAMPLE
            )));
        }
        Ok(Arc::new(Self {
            call,
            hot: true,
            strictness,
        }))
    }

    fn arguments(&self) -> Result<(&Snippet, &Snippet)> {
        let arguments = if self.hot {
            self.call
                .args
                .as_map()
                .and_then(|map| Some((map.get("params")?, map.get("template")?)))
        } else {
            match &self.call.args {
                Snippet::List(list) if list.len() == 2 => Some((&list[0], &list[1])),
                _ => None,
            }
        };
        arguments.ok_or_else(|| {
            Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: {}",
                self.call.name,
                if self.hot {
                    Self::HOT_EXAMPLE
                } else {
                    Self::CFN_EXAMPLE
                }
            ))
        })
    }
}

impl Function for Replace {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let (params, template) = self.arguments()?;
        let template = resolve_string(&self.call, template, stack, "template")?;
        let params = match function::resolve(params, stack)? {
            Value::Object(params) => params,
            other => {
                return Err(type_error(
                    &self.call,
                    format!("parameters must be a mapping, not {}", other.short_repr()),
                ))
            }
        };

        let mut substitutions = Vec::with_capacity(params.len());
        for (placeholder, value) in &params {
            let text = value.scalar_text().ok_or_else(|| {
                type_error(
                    &self.call,
                    format!(
                        "params must be strings or numbers, not {}",
                        value.short_repr()
                    ),
                )
            })?;
            if self.strictness == Strictness::VeryStrict && text.is_empty() {
                return Err(type_error(
                    &self.call,
                    format!("has an empty value for parameter \"{placeholder}\""),
                ));
            }
            if self.strictness != Strictness::Lenient && !template.contains(placeholder.as_str()) {
                return Err(type_error(
                    &self.call,
                    format!("The following params were not found in the template: {placeholder}"),
                ));
            }
            if !placeholder.is_empty() {
                substitutions.push((placeholder.as_str(), text));
            }
        }
        // stable sort keeps the original order for placeholders of equal length
        substitutions.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));

        Ok(Value::String(substitute(&template, &substitutions)))
    }
}

/// Replace the first placeholder, recursing into the pieces between occurrences for the rest
fn substitute(template: &str, substitutions: &[(&str, String)]) -> String {
    let Some(((placeholder, value), rest)) = substitutions.split_first() else {
        return template.to_string();
    };
    template
        .split(placeholder)
        .map(|piece| substitute(piece, rest))
        .collect::<Vec<_>>()
        .join(value)
}

/// `Fn::Base64`: passes its string argument through
#[derive(Debug)]
pub struct Base64 {
    call: Call,
}

impl Base64 {
    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Ok(Arc::new(Self { call }))
    }
}

impl Function for Base64 {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        resolve_string(&self.call, &self.call.args, stack, "argument").map(Value::String)
    }
}

/// `digest`: `[algorithm, value]` hex digest
#[derive(Debug)]
pub struct Digest {
    call: Call,
}

impl Digest {
    const ALGORITHMS: [&'static str; 6] = ["md5", "sha1", "sha224", "sha256", "sha384", "sha512"];

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        let [algorithm, _] = fixed_args::<2>(&call, "[algorithm, value]")?;
        if let Snippet::String(algorithm) = algorithm {
            Self::check_algorithm(&call, algorithm)?;
        }
        Ok(Arc::new(Self { call }))
    }

    fn check_algorithm(call: &Call, algorithm: &str) -> Result<()> {
        if !Self::ALGORITHMS.contains(&algorithm) {
            return Err(Error::invalid(format!(
                "Algorithm must be one of {}, not \"{algorithm}\" (in \"{}\")",
                Self::ALGORITHMS.join(", "),
                call.name
            )));
        }
        Ok(())
    }
}

impl Function for Digest {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        use sha2::Digest as _;

        let [algorithm, value] = fixed_args::<2>(&self.call, "[algorithm, value]")?;
        let algorithm = resolve_string(&self.call, algorithm, stack, "algorithm")?;
        let value = resolve_string(&self.call, value, stack, "value")?;
        Self::check_algorithm(&self.call, &algorithm)?;

        let bytes = value.as_bytes();
        let digest = match algorithm.as_str() {
            "md5" => format!("{:x}", md5::compute(bytes)),
            "sha1" => format!("{:x}", sha1::Sha1::digest(bytes)),
            "sha224" => format!("{:x}", sha2::Sha224::digest(bytes)),
            "sha256" => format!("{:x}", sha2::Sha256::digest(bytes)),
            "sha384" => format!("{:x}", sha2::Sha384::digest(bytes)),
            _ => format!("{:x}", sha2::Sha512::digest(bytes)),
        };
        Ok(Value::String(digest))
    }
}

#[cfg(test)]
mod test {
    use crate::function;
    use crate::stack::{Stack, StaticResources};
    use crate::template::Template;
    use crate::value::{Map, Value};
    use pretty_assertions::assert_eq;

    fn resolve_in(template: &Template, yaml: &str) -> crate::error::Result<Value> {
        let resources = StaticResources::default();
        let stack = Stack::new("test", template, &Map::new(), &resources).unwrap();
        let snippet = template.parse_snippet(stack.id(), &serde_yaml::from_str(yaml).unwrap())?;
        function::resolve(&snippet, &stack)
    }

    fn cfn(yaml: &str) -> crate::error::Result<Value> {
        resolve_in(&crate::template!("AWSTemplateFormatVersion: 2010-09-09"), yaml)
    }

    fn hot(yaml: &str) -> crate::error::Result<Value> {
        resolve_in(&crate::template!("heat_template_version: 2017-09-01"), yaml)
    }

    #[test]
    fn join_boundaries() {
        assert_eq!(cfn("{ 'Fn::Join': [',', []] }").unwrap(), Value::from(""));
        assert_eq!(cfn("{ 'Fn::Join': [',', null] }").unwrap(), Value::from(""));
        assert_eq!(cfn("{ 'Fn::Join': [',', [a, null, c]] }").unwrap(), Value::from("a,,c"));
    }

    #[test]
    fn join_rejects_non_strings() {
        let error = cfn("{ 'Fn::Join': [',', [a, 1]] }").unwrap_err();
        assert_eq!(
            error.to_string(),
            "\"Fn::Join\": Items to join must be strings not 1"
        );
    }

    #[test]
    fn list_join_multiple_lists() {
        assert_eq!(
            hot("{ list_join: ['-', [a, b], [{ k: v }], null] }").unwrap(),
            Value::from(r#"a-b-{"k":"v"}"#)
        );
    }

    #[test]
    fn split() {
        assert_eq!(
            cfn("{ 'Fn::Split': [',', 'a,b,,c'] }").unwrap(),
            Value::from(vec!["a", "b", "", "c"])
        );
        assert_eq!(hot("{ str_split: [',', 'a,b,c', 1] }").unwrap(), Value::from("b"));
        assert!(hot("{ str_split: [',', 'a,b,c', 5] }").is_err());
    }

    #[test]
    fn replace_prefers_longer_placeholders() {
        assert_eq!(
            cfn("{ 'Fn::Replace': [{ '$a': X, '$aa': Y }, '$aa'] }").unwrap(),
            Value::from("Y")
        );
    }

    #[test]
    fn replace_does_not_rescan_substitutions() {
        assert_eq!(
            hot("{ str_replace: { template: 'a-b', params: { a: b, b: c } } }").unwrap(),
            Value::from("b-c")
        );
    }

    #[test]
    fn replace_values() {
        assert_eq!(
            hot("{ str_replace: { template: '$n $x $b', params: { $n: 3, $x: null, $b: true } } }")
                .unwrap(),
            Value::from("3  true")
        );
        assert!(hot("{ str_replace: { template: '$l', params: { $l: [1] } } }").is_err());
    }

    #[test]
    fn strict_replace() {
        assert!(hot("{ str_replace_strict: { template: 'a', params: { b: c } } }").is_err());
        assert_eq!(
            hot("{ str_replace_strict: { template: 'a', params: { a: '' } } }").unwrap(),
            Value::from("")
        );
        assert!(hot("{ str_replace_vstrict: { template: 'a', params: { a: '' } } }").is_err());
    }

    #[test]
    fn base64_passes_through() {
        assert_eq!(cfn("{ 'Fn::Base64': text }").unwrap(), Value::from("text"));
    }

    #[test]
    fn digests() {
        assert_eq!(
            hot("{ digest: [sha256, abc] }").unwrap(),
            Value::from("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(
            hot("{ digest: [md5, abc] }").unwrap(),
            Value::from("900150983cd24fb0d6963f7d28e17f72")
        );
        assert_eq!(
            hot("{ digest: [sha1, abc] }").unwrap(),
            Value::from("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert!(hot("{ digest: [crc32, abc] }").is_err());
    }
}
