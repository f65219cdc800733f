//! snippet parser
use crate::error::{Breadcrumb, Error, Result};
use crate::function::removed::Unavailable;
use crate::function::{Call, Function};
use crate::snippet::Snippet;
use crate::stack::StackId;
use crate::template::registry::{Entry, Registry};
use crate::template::Template;
use crate::value::Value;
use std::sync::Arc;

/// Turns raw template values into [Snippet]s for one stack generation
///
/// A single-key map whose key is registered for the template's version becomes a function node. Keys known to
/// the template family but not usable here (removed, newer revision, not allowed in the conditions section)
/// become [Unavailable] markers that fail validation. Any other map is plain data.
#[derive(Debug)]
pub struct Parser<'t> {
    template: &'t Template,
    stack: StackId,
    conditions: bool,
    inlining: Vec<String>,
}

impl<'t> Parser<'t> {
    pub fn new(template: &'t Template, stack: StackId) -> Self {
        Self {
            template,
            stack,
            conditions: false,
            inlining: Vec::new(),
        }
    }

    /// Parser for condition definitions, using the condition function registry
    pub fn for_conditions(template: &'t Template, stack: StackId) -> Self {
        Self {
            conditions: true,
            ..Self::new(template, stack)
        }
    }

    pub fn template(&self) -> &'t Template {
        self.template
    }

    pub fn stack(&self) -> StackId {
        self.stack
    }

    /// `true` while parsing condition definitions
    pub fn in_conditions(&self) -> bool {
        self.conditions
    }

    fn registry(&self) -> &'static Registry {
        if self.conditions {
            self.template.version().condition_functions()
        } else {
            self.template.version().functions()
        }
    }

    pub fn parse(&mut self, value: &Value) -> Result<Snippet> {
        self.parse_at(value, &Breadcrumb::default())
    }

    fn parse_at(&mut self, value: &Value, path: &Breadcrumb) -> Result<Snippet> {
        Ok(match value {
            Value::Object(map) => {
                if let (1, Some((name, args))) = (map.len(), map.first()) {
                    if let Some(function) = self.function(name, args, path)? {
                        return Ok(Snippet::Function(function));
                    }
                }
                let mut parsed = indexmap::IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    parsed.insert(key.clone(), self.parse_at(value, &path.key(key))?);
                }
                Snippet::Map(parsed)
            }
            Value::Array(list) => Snippet::List(
                list.iter()
                    .enumerate()
                    .map(|(index, value)| self.parse_at(value, &path.index(index)))
                    .collect::<Result<_>>()?,
            ),
            scalar => Snippet::from(scalar.clone()),
        })
    }

    fn function(
        &mut self,
        name: &str,
        args: &Value,
        path: &Breadcrumb,
    ) -> Result<Option<Arc<dyn Function>>> {
        let path = path.key(name);
        let version = self.template.version();

        let function: Arc<dyn Function> = match self.registry().get(name).copied() {
            Some(Entry::Function(construct)) => {
                let args = self.parse_at(args, &path)?;
                let call = Call::new(self.stack, name.to_string(), args);
                construct(self, call).map_err(|error| error.at(&path))?
            }
            Some(Entry::Macro(construct)) => {
                construct(self, name, args).map_err(|error| error.at(&path))?
            }
            Some(Entry::Removed(replacement)) => {
                let message = match replacement {
                    Some(replacement) => format!(
                        "The function \"{name}\" is not supported in {version}. Use \"{replacement}\" instead."
                    ),
                    None => format!("The function \"{name}\" is not supported in {version}."),
                };
                let args = self.parse_at(args, &path)?;
                Arc::new(Unavailable::new(
                    Call::new(self.stack, name.to_string(), args),
                    message,
                ))
            }
            None => {
                let Some(message) = version.unavailable_function(name, self.conditions) else {
                    return Ok(None);
                };
                let args = self.parse_at(args, &path)?;
                Arc::new(Unavailable::new(
                    Call::new(self.stack, name.to_string(), args),
                    message,
                ))
            }
        };

        tracing::trace!(%path, "parsed function");
        Ok(Some(function))
    }

    /// Parse the definition of condition `name` in place of a reference to it
    ///
    /// Definitions that are themselves condition names are followed. Re-entering a condition that is being
    /// inlined fails with [Error::CircularCondition].
    pub fn inline_condition(&mut self, name: &str) -> Result<Snippet> {
        if self.inlining.iter().any(|inlining| inlining == name) {
            return Err(Error::CircularCondition(name.to_string()));
        }
        let Some(definition) = self.template.condition_definition(name) else {
            return Err(Error::invalid(format!("Invalid condition name \"{name}\"")));
        };

        self.inlining.push(name.to_string());
        let conditions = std::mem::replace(&mut self.conditions, true);
        let parsed = match definition {
            Value::String(next) => self.inline_condition(next),
            definition => self.parse(definition),
        };
        self.conditions = conditions;
        self.inlining.pop();

        parsed
    }
}
