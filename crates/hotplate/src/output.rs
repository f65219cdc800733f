//! output definitions
use crate::error::{Breadcrumb, Result};
use crate::function;
use crate::snippet::Snippet;
use crate::stack::Stack;
use crate::value::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, derive_new::new)]
pub struct OutputDefinition {
    name: String,
    value: Snippet,
    #[new(default)]
    description: Option<String>,
    #[new(default)]
    condition: Option<Snippet>,
}

impl OutputDefinition {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<Snippet>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Snippet {
        &self.value
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn condition(&self) -> Option<&Snippet> {
        self.condition.as_ref()
    }

    pub fn resolve(&self, stack: &Stack<'_>) -> Result<Value> {
        function::resolve(&self.value, stack)
    }

    pub fn validate(&self, stack: &Stack<'_>) -> Result<()> {
        let path = Breadcrumb::root("outputs").key(&self.name).key("value");
        function::validate(&self.value, stack, &path)
    }

    pub fn required_resource_names(&self) -> BTreeSet<String> {
        function::dependencies(&self.value, format!("outputs.{}", self.name))
            .map(|dependency| dependency.resource)
            .collect()
    }
}
