//! named conditions
//!
//! Conditions are evaluated lazily and at most once per [Conditions] instance. A condition that is reached again
//! while it is still being evaluated is circular.
use crate::error::{Breadcrumb, Error, Result};
use crate::function;
use crate::snippet::Snippet;
use crate::stack::Stack;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ConditionState {
    #[default]
    Unresolved,
    InProgress,
    Resolved(bool),
}

#[derive(Debug, Default)]
pub struct Conditions {
    definitions: IndexMap<String, Snippet>,
    states: RefCell<HashMap<String, ConditionState>>,
}

impl Conditions {
    pub fn new(definitions: IndexMap<String, Snippet>) -> Self {
        Self {
            definitions,
            states: RefCell::default(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Whether something guarded by `condition` is enabled
    ///
    /// No condition means enabled. Booleans are taken as they are, strings name a condition, functions are
    /// resolved and must produce one of those two.
    pub fn is_enabled(&self, condition: Option<&Snippet>, stack: &Stack<'_>) -> Result<bool> {
        match condition {
            None | Some(Snippet::Null) => Ok(true),
            Some(Snippet::Boolean(enabled)) => Ok(*enabled),
            Some(Snippet::String(name)) => self.evaluate(name, stack),
            Some(snippet @ Snippet::Function(_)) => match function::resolve(snippet, stack)? {
                Value::Boolean(enabled) => Ok(enabled),
                Value::String(name) => self.evaluate(&name, stack),
                other => Err(Error::InvalidCondition(other.short_repr())),
            },
            Some(other) => Err(Error::InvalidCondition(other.to_canonical_json().short_repr())),
        }
    }

    fn state(&self, name: &str) -> ConditionState {
        self.states.borrow().get(name).copied().unwrap_or_default()
    }

    fn set_state(&self, name: &str, state: ConditionState) {
        self.states.borrow_mut().insert(name.to_string(), state);
    }

    /// Value of condition `name`, memoized
    pub fn evaluate(&self, name: &str, stack: &Stack<'_>) -> Result<bool> {
        let Some(definition) = self.definitions.get(name) else {
            return Err(Error::invalid(format!("Invalid condition name \"{name}\"")));
        };

        match self.state(name) {
            ConditionState::Resolved(enabled) => return Ok(enabled),
            ConditionState::InProgress => return Err(Error::CircularCondition(name.to_string())),
            ConditionState::Unresolved => {}
        }

        self.set_state(name, ConditionState::InProgress);
        let outcome = self.evaluate_definition(name, definition, stack);
        match outcome {
            Ok(enabled) => {
                tracing::debug!(condition = name, enabled, "condition evaluated");
                self.set_state(name, ConditionState::Resolved(enabled));
            }
            Err(_) => self.set_state(name, ConditionState::Unresolved),
        }
        outcome
    }

    fn evaluate_definition(&self, name: &str, definition: &Snippet, stack: &Stack<'_>) -> Result<bool> {
        match definition {
            Snippet::Boolean(enabled) => Ok(*enabled),
            Snippet::String(other) => self.evaluate(other, stack),
            Snippet::Function(_) => match function::resolve(definition, stack)? {
                Value::Boolean(enabled) => Ok(enabled),
                _ => Err(Error::InvalidCondition(name.to_string())),
            },
            _ => Err(Error::InvalidCondition(name.to_string())),
        }
    }

    /// Check every definition, then evaluate it
    ///
    /// Evaluation tolerates parameters without a value, so a template can be validated before all parameters are
    /// known.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn validate(&self, stack: &Stack<'_>) -> Result<()> {
        for (name, definition) in &self.definitions {
            let path = Breadcrumb::root("conditions").key(name);
            match definition {
                Snippet::Boolean(_) | Snippet::Function(_) => {}
                Snippet::String(other) if self.contains(other) => {}
                _ => return Err(Error::InvalidCondition(name.clone()).at(&path)),
            }
            function::validate(definition, stack, &path)?;
        }

        for name in self.definitions.keys() {
            match self.evaluate(name, stack) {
                Ok(_) | Err(Error::UserParameterMissing(_)) => {}
                Err(error) => return Err(error.at(&Breadcrumb::root("conditions").key(name))),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::stack::{Stack, StaticResources};
    use crate::snippet::Snippet;
    use crate::value::Map;
    use pretty_assertions::assert_eq;

    #[test]
    fn circular_references() {
        let template = crate::template! {r#"
            AWSTemplateFormatVersion: 2010-09-09
            Conditions:
              A: { Condition: B }
              B: { Condition: A }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        assert_eq!(
            stack.conditions().evaluate("A", &stack).unwrap_err(),
            Error::CircularCondition("A".into())
        );
        // the failed evaluation leaves no stale state behind
        assert_eq!(
            stack.is_enabled(Some(&Snippet::String("B".into()))).unwrap_err(),
            Error::CircularCondition("B".into())
        );
    }

    #[test]
    fn validation_reports_where_a_cycle_is() {
        let template = crate::template! {r#"
            AWSTemplateFormatVersion: 2010-09-09
            Conditions:
              A: { Condition: B }
              B: { Condition: A }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        assert_eq!(
            stack.conditions().validate(&stack).unwrap_err().to_string(),
            "conditions.A: Circular definition for condition \"A\""
        );
    }

    #[test]
    fn memoized_chain() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            parameters:
              env: { type: string, default: prod }
            conditions:
              is_prod: { equals: [{ get_param: env }, prod] }
              also_prod: is_prod
              not_prod: { not: is_prod }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let conditions = stack.conditions();
        assert!(conditions.evaluate("also_prod", &stack).unwrap());
        assert!(!conditions.evaluate("not_prod", &stack).unwrap());
        assert!(stack.is_enabled(None).unwrap());
        assert!(!stack.is_enabled(Some(&Snippet::Boolean(false))).unwrap());
    }

    #[test]
    fn non_boolean_definition() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            parameters:
              env: { type: string, default: prod }
            conditions:
              broken: { get_param: env }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        assert_eq!(
            stack.conditions().evaluate("broken", &stack).unwrap_err(),
            Error::InvalidCondition("broken".into())
        );
        assert!(stack.validate().is_err());
    }

    #[test]
    fn unknown_name() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        assert!(stack.is_enabled(Some(&Snippet::String("nope".into()))).is_err());
    }

    #[test]
    fn validation_tolerates_missing_parameters() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            parameters:
              env: { type: string }
            conditions:
              is_prod: { equals: [{ get_param: env }, prod] }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        stack.validate().unwrap();
    }
}
