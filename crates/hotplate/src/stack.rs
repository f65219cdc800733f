//! evaluation context
//!
//! A [Stack] is one interpretation of a [Template]: the template plus parameter values, the resources that
//! currently exist, and the conditions evaluated against those parameters. Functions never own their stack.
//! They remember the [StackId] of the generation they were parsed for and receive the [Stack] on every call.
use crate::conditions::Conditions;
use crate::definition::ResourceDefinition;
use crate::error::{Error, Result};
use crate::function;
use crate::output::OutputDefinition;
use crate::snippet::Snippet;
use crate::template::{Parameters, Template};
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle identifying one stack generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(u64);

impl StackId {
    /// Allocate a fresh, process-wide unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live resource as seen by intrinsic functions
pub trait Resource {
    fn name(&self) -> &str;

    /// Value of a reference to this resource (`get_resource`, `Ref`)
    fn ref_id(&self) -> Value;

    /// `false` until the resource has completed an operation that produces attributes
    fn attributes_available(&self) -> bool;

    /// `true` when `name` is declared in the resource's attribute schema
    fn has_attribute(&self, name: &str) -> bool;

    fn attribute(&self, name: &str) -> Result<Value>;

    /// Attribute `name`, projected through `path`
    ///
    /// Missing path components yield [Value::Null].
    fn attribute_path(&self, name: &str, path: &[Value]) -> Result<Value> {
        let value = self.attribute(name)?;
        Ok(value.select(path).cloned().unwrap_or_default())
    }
}

/// The resources of a stack that are currently active
pub trait ResourceContainer {
    fn get(&self, name: &str) -> Option<&dyn Resource>;

    /// The resource whose reference id is `ref_id`, for back-references such as alarm and signal URLs
    fn by_ref_id(&self, ref_id: &Value) -> Option<&dyn Resource>;

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// A resource with a fixed reference id and fixed attribute values
#[derive(Debug, Clone, derive_new::new)]
pub struct StaticResource {
    name: String,
    ref_id: Value,
    #[new(default)]
    attributes: Map,
    #[new(value = "true")]
    available: bool,
}

impl StaticResource {
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Mark the resource as not having produced attributes yet
    pub fn pending(mut self) -> Self {
        self.available = false;
        self
    }
}

impl Resource for StaticResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ref_id(&self) -> Value {
        self.ref_id.clone()
    }

    fn attributes_available(&self) -> bool {
        self.available
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    fn attribute(&self, name: &str) -> Result<Value> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidTemplateAttribute {
                resource: self.name.clone(),
                key: name.to_string(),
            })
    }
}

/// In-memory [ResourceContainer]
///
/// Loaded from a state document of the form
/// ```yaml
/// server:
///   ref_id: 5e1c5cf0
///   attributes:
///     first_address: 10.0.0.4
/// ```
/// `ref_id` defaults to the resource name, `complete: false` marks a resource without attributes.
#[derive(Debug, Clone, Default)]
pub struct StaticResources {
    resources: IndexMap<String, StaticResource>,
}

impl StaticResources {
    pub fn insert(&mut self, resource: StaticResource) {
        self.resources.insert(resource.name.clone(), resource);
    }

    pub fn from_value(state: &Value) -> Result<Self> {
        let mut resources = Self::default();
        let Some(entries) = state.as_object() else {
            if state.is_null() {
                return Ok(resources);
            }
            return Err(Error::invalid("The resource state must be a map"));
        };

        for (name, entry) in entries {
            let entry = match entry {
                Value::Null => Map::new(),
                Value::Object(entry) => entry.clone(),
                _ => {
                    return Err(Error::invalid(format!(
                        "The state of resource \"{name}\" must be a map"
                    )))
                }
            };

            let ref_id = entry
                .get("ref_id")
                .cloned()
                .unwrap_or_else(|| Value::String(name.clone()));
            let mut resource = StaticResource::new(name.clone(), ref_id);
            if let Some(attributes) = entry.get("attributes") {
                let Some(attributes) = attributes.as_object() else {
                    return Err(Error::invalid(format!(
                        "The attributes of resource \"{name}\" must be a map"
                    )));
                };
                resource.attributes = attributes.clone();
            }
            if entry.get("complete") == Some(&Value::Boolean(false)) {
                resource = resource.pending();
            }

            resources.insert(resource);
        }

        Ok(resources)
    }
}

impl ResourceContainer for StaticResources {
    fn get(&self, name: &str) -> Option<&dyn Resource> {
        self.resources.get(name).map(|r| r as &dyn Resource)
    }

    fn by_ref_id(&self, ref_id: &Value) -> Option<&dyn Resource> {
        self.resources
            .values()
            .find(|r| &r.ref_id == ref_id)
            .map(|r| r as &dyn Resource)
    }
}

/// One generation of a template with its parameters and live resources
pub struct Stack<'a> {
    id: StackId,
    name: String,
    template: &'a Template,
    parameters: Parameters,
    resources: &'a dyn ResourceContainer,
    conditions: Conditions,
    parent: Option<ResourceDefinition>,
}

impl<'a> Stack<'a> {
    pub fn new(
        name: impl Into<String>,
        template: &'a Template,
        parameters: &Map,
        resources: &'a dyn ResourceContainer,
    ) -> Result<Self> {
        let id = StackId::next();
        let name = name.into();
        let parameters = Parameters::new(template, parameters, &name, id)?;
        let conditions = template.conditions(id)?;
        tracing::debug!(stack=%name, %id, version=%template.version(), "stack created");

        Ok(Self {
            id,
            name,
            template,
            parameters,
            resources,
            conditions,
            parent: None,
        })
    }

    /// Use `parent` as the resource this stack implements (for `resource_facade`)
    ///
    /// `parent` is expected to be frozen.
    pub fn with_parent(mut self, parent: ResourceDefinition) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn id(&self) -> StackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &'a Template {
        self.template
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn resources(&self) -> &'a dyn ResourceContainer {
        self.resources
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    pub fn parent(&self) -> Option<&ResourceDefinition> {
        self.parent.as_ref()
    }

    pub fn is_enabled(&self, condition: Option<&Snippet>) -> Result<bool> {
        self.conditions.is_enabled(condition, self)
    }

    /// Definitions of all resources whose condition is enabled, in template order
    pub fn resource_definitions(&self) -> Result<IndexMap<String, ResourceDefinition>> {
        let mut enabled = IndexMap::new();
        for (name, definition) in self.template.resource_definitions(self.id)? {
            if self.is_enabled(definition.condition())? {
                enabled.insert(name, definition);
            } else {
                tracing::debug!(resource=%name, "resource disabled by condition");
            }
        }
        Ok(enabled)
    }

    /// Definitions of all outputs whose condition is enabled, in template order
    pub fn outputs(&self) -> Result<IndexMap<String, OutputDefinition>> {
        let mut enabled = IndexMap::new();
        for (name, output) in self.template.outputs(self.id)? {
            if self.is_enabled(output.condition())? {
                enabled.insert(name, output);
            }
        }
        Ok(enabled)
    }

    /// Validate conditions, resources and outputs
    #[tracing::instrument(level = "trace", skip_all, fields(stack = %self.name))]
    pub fn validate(&self) -> Result<()> {
        self.conditions.validate(self)?;
        for definition in self.template.resource_definitions(self.id)?.values() {
            definition.validate(self)?;
        }
        for output in self.template.outputs(self.id)?.values() {
            output.validate(self)?;
        }
        Ok(())
    }

    /// Names each enabled resource requires, by resource
    pub fn dependency_map(&self) -> Result<IndexMap<String, BTreeSet<String>>> {
        let mut requires = IndexMap::new();
        for (name, definition) in self.resource_definitions()? {
            requires.insert(name, definition.required_resource_names()?);
        }
        Ok(requires)
    }

    /// Attributes of `resource_name` consumed by enabled resources and outputs
    pub fn dep_attrs(&self, resource_name: &str) -> Result<BTreeSet<String>> {
        let mut attributes = BTreeSet::new();
        for definition in self.resource_definitions()?.values() {
            for snippet in [definition.properties(), definition.metadata()]
                .into_iter()
                .flatten()
            {
                attributes.extend(function::dep_attrs(snippet, resource_name));
            }
        }
        for output in self.outputs()?.values() {
            attributes.extend(function::dep_attrs(output.value(), resource_name));
        }
        Ok(attributes)
    }
}

impl fmt::Debug for Stack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.template.version())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn state_document() {
        let state: Value = serde_yaml::from_str(
            "server:\n  ref_id: abc\n  attributes:\n    ip: 10.0.0.4\nvolume:\n  complete: false\n",
        )
        .unwrap();
        let resources = StaticResources::from_value(&state).unwrap();

        let server = resources.get("server").unwrap();
        assert_eq!(server.ref_id(), Value::from("abc"));
        assert_eq!(server.attribute("ip").unwrap(), Value::from("10.0.0.4"));

        let volume = resources.get("volume").unwrap();
        assert_eq!(volume.ref_id(), Value::from("volume"));
        assert!(!volume.attributes_available());
        assert!(!resources.contains("network"));
    }

    #[test]
    fn lookup_by_ref_id() {
        let state: Value = serde_yaml::from_str("server: { ref_id: 5e1c5cf0 }
volume: {}
").unwrap();
        let resources = StaticResources::from_value(&state).unwrap();

        assert_eq!(resources.by_ref_id(&"5e1c5cf0".into()).map(|r| r.name()), Some("server"));
        assert_eq!(resources.by_ref_id(&"volume".into()).map(|r| r.name()), Some("volume"));
        assert!(resources.by_ref_id(&"server".into()).is_none());
    }

    #[test]
    fn attribute_path_tolerates_missing_components() {
        let resource = StaticResource::new("server".into(), "abc".into()).with_attribute(
            "addresses",
            Value::Object([("private".to_string(), Value::from(vec!["10.0.0.4"]))].into_iter().collect()),
        );
        assert_eq!(
            resource
                .attribute_path("addresses", &["private".into(), Value::Integer(0)])
                .unwrap(),
            Value::from("10.0.0.4")
        );
        assert_eq!(
            resource
                .attribute_path("addresses", &["public".into(), Value::Integer(0)])
                .unwrap(),
            Value::Null
        );
    }
}
