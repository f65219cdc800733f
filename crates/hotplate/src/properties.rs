//! resolved view of a resource's properties
use crate::error::{Error, Result};
use crate::function;
use crate::snippet::Snippet;
use crate::stack::Stack;
use crate::translation::Translation;
use crate::value::{Map, Value};
use indexmap::IndexMap;

#[derive(Debug)]
enum Source<'a> {
    Parsed(&'a IndexMap<String, Snippet>),
    Resolved(Map),
}

/// Property reader that resolves functions on access and applies translation rules when given some
///
/// Null values read as absent.
#[derive(Debug)]
pub struct Properties<'a, 's> {
    source: Source<'a>,
    stack: &'a Stack<'s>,
    translation: Option<Translation>,
}

impl<'a, 's> Properties<'a, 's> {
    /// A properties snippet that is a function itself is resolved right away and must produce a map
    pub fn new(properties: Option<&'a Snippet>, stack: &'a Stack<'s>) -> Result<Self> {
        let source = match properties {
            None | Some(Snippet::Null) => Source::Resolved(Map::new()),
            Some(Snippet::Map(map)) => Source::Parsed(map),
            Some(snippet @ Snippet::Function(_)) => match function::resolve(snippet, stack)? {
                Value::Null => Source::Resolved(Map::new()),
                Value::Object(map) => Source::Resolved(map),
                other => {
                    return Err(Error::invalid(format!(
                        "Properties must be a map, not {}",
                        other.type_name()
                    )))
                }
            },
            Some(other) => {
                return Err(Error::invalid(format!(
                    "Properties must be a map, not {}",
                    other.type_name()
                )))
            }
        };
        Ok(Self {
            source,
            stack,
            translation: None,
        })
    }

    pub fn with_translation(mut self, translation: Translation) -> Self {
        self.translation = Some(translation);
        self
    }

    pub fn stack(&self) -> &'a Stack<'s> {
        self.stack
    }

    /// Property names, including the ones only translation rules produce
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match &self.source {
            Source::Parsed(map) => map.keys().cloned().collect(),
            Source::Resolved(map) => map.keys().cloned().collect(),
        };
        if let Some(translation) = &self.translation {
            for target in translation.targets() {
                if !keys.iter().any(|key| key == target) {
                    keys.push(target.to_string());
                }
            }
        }
        keys
    }

    /// Resolved value of `key`, without translation
    pub fn resolve_untranslated(&self, key: &str) -> Result<Option<Value>> {
        let value = match &self.source {
            Source::Parsed(map) => match map.get(key) {
                Some(snippet) => function::resolve(snippet, self.stack)?,
                None => return Ok(None),
            },
            Source::Resolved(map) => match map.get(key) {
                Some(value) => value.clone(),
                None => return Ok(None),
            },
        };
        Ok(Some(value).filter(|value| !value.is_null()))
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        match &self.translation {
            Some(translation) if translation.masks(key) => Ok(None),
            Some(translation) if translation.affects(key) => Ok(translation
                .translate(key, self)?
                .filter(|value| !value.is_null())),
            _ => self.resolve_untranslated(key),
        }
    }

    /// All present properties, resolved and translated
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn resolve_all(&self) -> Result<Map> {
        let mut resolved = Map::new();
        for key in self.keys() {
            if let Some(value) = self.get(&key)? {
                resolved.insert(key, value);
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stack::StaticResources;
    use pretty_assertions::assert_eq;

    #[test]
    fn properties_from_a_function() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            parameters:
              config: { type: json, default: { size: 2, name: null } }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template
            .parse_snippet(stack.id(), &serde_yaml::from_str("{ get_param: config }").unwrap())
            .unwrap();
        let properties = Properties::new(Some(&snippet), &stack).unwrap();
        assert_eq!(properties.get("size").unwrap(), Some(Value::Integer(2)));
        assert_eq!(properties.get("name").unwrap(), None);
        assert_eq!(properties.keys(), vec!["size".to_string(), "name".to_string()]);
    }

    #[test]
    fn properties_must_be_a_map() {
        let template = crate::template!("heat_template_version: 2016-10-14");
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = Snippet::List(vec![]);
        assert!(Properties::new(Some(&snippet), &stack).is_err());
    }
}
