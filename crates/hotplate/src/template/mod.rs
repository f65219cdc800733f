//! template documents
//!
//! A [Template] is a parsed YAML/JSON document together with the format [Version] it declares and the contents
//! of any files it references through `get_file`. Sections are parsed into snippets on demand, once per stack
//! generation, because every function node is bound to the [StackId] it was parsed for.
use crate::conditions::Conditions;
use crate::definition::{DeletionPolicy, ResourceDefinition};
use crate::error::{Breadcrumb, Error, Result};
use crate::output::OutputDefinition;
use crate::snippet::Snippet;
use crate::stack::StackId;
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::str::FromStr;

mod parameters;
mod parser;
pub mod registry;
mod version;

pub use parameters::{ParameterSchema, ParameterType, Parameters};
pub use parser::Parser;
pub use version::{CfnVersion, HotVersion, Version};

/// Top level sections, named independently of the format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Description,
    Parameters,
    Mappings,
    Conditions,
    Resources,
    Outputs,
}

impl Section {
    pub fn key(self, version: Version) -> Option<&'static str> {
        match (self, version.is_hot()) {
            (Section::Description, true) => Some("description"),
            (Section::Description, false) => Some("Description"),
            (Section::Parameters, true) => Some("parameters"),
            (Section::Parameters, false) => Some("Parameters"),
            (Section::Mappings, true) => None,
            (Section::Mappings, false) => Some("Mappings"),
            (Section::Conditions, true) => Some("conditions"),
            (Section::Conditions, false) => Some("Conditions"),
            (Section::Resources, true) => Some("resources"),
            (Section::Resources, false) => Some("Resources"),
            (Section::Outputs, true) => Some("outputs"),
            (Section::Outputs, false) => Some("Outputs"),
        }
    }
}

/// Keys of a resource definition in one template format
struct ResourceKeys {
    kind: &'static str,
    properties: &'static str,
    metadata: &'static str,
    depends_on: &'static str,
    deletion_policy: &'static str,
    update_policy: &'static str,
    description: &'static str,
    external_id: Option<&'static str>,
    condition: Option<&'static str>,
}

impl ResourceKeys {
    fn for_version(version: Version) -> Self {
        if version.is_hot() {
            let newton = version.hot_since(HotVersion::V2016_10_14);
            Self {
                kind: "type",
                properties: "properties",
                metadata: "metadata",
                depends_on: "depends_on",
                deletion_policy: "deletion_policy",
                update_policy: "update_policy",
                description: "description",
                external_id: newton.then_some("external_id"),
                condition: newton.then_some("condition"),
            }
        } else {
            Self {
                kind: "Type",
                properties: "Properties",
                metadata: "Metadata",
                depends_on: "DependsOn",
                deletion_policy: "DeletionPolicy",
                update_policy: "UpdatePolicy",
                description: "Description",
                external_id: None,
                condition: Some("Condition"),
            }
        }
    }

    fn all(&self) -> impl Iterator<Item = &'static str> {
        [
            Some(self.kind),
            Some(self.properties),
            Some(self.metadata),
            Some(self.depends_on),
            Some(self.deletion_policy),
            Some(self.update_policy),
            Some(self.description),
            self.external_id,
            self.condition,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    version: Version,
    document: Map,
    files: IndexMap<String, String>,
}

impl Template {
    pub fn new(document: Value) -> Result<Self> {
        let Value::Object(document) = document else {
            return Err(Error::invalid("The template must be a map"));
        };
        let version = Version::detect(&document)?;

        let sections = version.sections();
        if let Some(key) = document.keys().find(|key| !sections.contains(&key.as_str())) {
            return Err(Error::invalid(format!(
                "The template section is invalid: {key}"
            )));
        }

        let template = Self {
            version,
            document,
            files: IndexMap::new(),
        };
        for section in [
            Section::Parameters,
            Section::Mappings,
            Section::Conditions,
            Section::Resources,
            Section::Outputs,
        ] {
            template.section(section)?;
        }

        tracing::debug!(%version, "template loaded");
        Ok(template)
    }

    /// Provide file contents for `get_file`, keyed by the name used in the template
    pub fn with_files(mut self, files: IndexMap<String, String>) -> Self {
        self.files = files;
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn document(&self) -> &Map {
        &self.document
    }

    /// A map-valued section; a missing or `null` section is empty
    pub fn section(&self, section: Section) -> Result<Option<&Map>> {
        let Some(key) = section.key(self.version) else {
            return Ok(None);
        };
        match self.document.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(Error::invalid(format!(
                "The section \"{key}\" must be a map, not a {}",
                other.type_name()
            ))),
        }
    }

    fn entries(&self, section: Section) -> impl Iterator<Item = (&String, &Value)> {
        self.section(section)
            .ok()
            .flatten()
            .into_iter()
            .flat_map(|map| map.iter())
    }

    pub fn description(&self) -> Option<&str> {
        let key = Section::Description.key(self.version)?;
        self.document.get(key).and_then(Value::as_str)
    }

    /// Names of all resources in the template, regardless of their condition
    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.entries(Section::Resources).map(|(name, _)| name.as_str())
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resource_names().any(|resource| resource == name)
    }

    /// Raw definition of condition `name`
    pub fn condition_definition(&self, name: &str) -> Option<&Value> {
        self.entries(Section::Conditions)
            .find(|(condition, _)| *condition == name)
            .map(|(_, definition)| definition)
    }

    pub fn has_condition(&self, name: &str) -> bool {
        self.condition_definition(name).is_some()
    }

    pub fn mapping(&self, name: &str) -> Option<&Value> {
        self.entries(Section::Mappings)
            .find(|(mapping, _)| *mapping == name)
            .map(|(_, mapping)| mapping)
    }

    pub fn file(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Parse `value` into a snippet bound to stack generation `stack`
    pub fn parse_snippet(&self, stack: StackId, value: &Value) -> Result<Snippet> {
        Parser::new(self, stack).parse(value)
    }

    /// Parse the conditions section
    pub fn conditions(&self, stack: StackId) -> Result<Conditions> {
        let mut definitions = IndexMap::new();
        for (name, definition) in self.entries(Section::Conditions) {
            let path = Breadcrumb::root("conditions").key(name);
            let snippet = Parser::for_conditions(self, stack)
                .parse(definition)
                .map_err(|error| error.at(&path))?;
            definitions.insert(name.clone(), snippet);
        }
        Ok(Conditions::new(definitions))
    }

    /// Parse all resource definitions, in template order
    #[tracing::instrument(level = "trace", skip_all, fields(%stack))]
    pub fn resource_definitions(
        &self,
        stack: StackId,
    ) -> Result<IndexMap<String, ResourceDefinition>> {
        let mut definitions = IndexMap::new();
        for (name, raw) in self.entries(Section::Resources) {
            let definition = self.resource_definition(stack, name, raw)?;
            definitions.insert(name.clone(), definition);
        }
        Ok(definitions)
    }

    fn resource_definition(
        &self,
        stack: StackId,
        name: &str,
        raw: &Value,
    ) -> Result<ResourceDefinition> {
        let path = Breadcrumb::root("resources").key(name);
        let keys = ResourceKeys::for_version(self.version);

        let Some(raw) = raw.as_object() else {
            return Err(Error::invalid(format!(
                "Resource {name} is not a valid resource definition"
            ))
            .at(&path));
        };
        if let Some(key) = raw.keys().find(|key| !keys.all().any(|k| k == key.as_str())) {
            return Err(Error::invalid(format!(
                "\"{key}\" is not a valid keyword inside a resource definition"
            ))
            .at(&path));
        }

        let resource_type = match raw.get(keys.kind) {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            Some(_) => {
                return Err(Error::invalid(format!(
                    "Resource {name} \"{}\" must be a string",
                    keys.kind
                ))
                .at(&path))
            }
            None => {
                return Err(Error::invalid(format!(
                    "Resource {name} is missing \"{}\"",
                    keys.kind
                ))
                .at(&path))
            }
        };

        let mut parser = Parser::new(self, stack);
        let mut section = |key: &str, expect_map: bool| -> Result<Option<Snippet>> {
            let Some(value) = raw.get(key).filter(|value| !value.is_null()) else {
                return Ok(None);
            };
            let path = path.key(key);
            let snippet = parser.parse(value).map_err(|error| error.at(&path))?;
            if expect_map && !matches!(snippet, Snippet::Map(_) | Snippet::Function(_)) {
                return Err(Error::invalid(format!(
                    "\"{key}\" must be a map, not a {}",
                    snippet.type_name()
                ))
                .at(&path));
            }
            Ok(Some(snippet))
        };

        let properties = section(keys.properties, true)?;
        let metadata = section(keys.metadata, true)?;
        let update_policy = section(keys.update_policy, true)?;
        let external_id = match keys.external_id {
            Some(key) => section(key, false)?,
            None => None,
        };

        let depends_on = match raw.get(keys.depends_on) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(dependency)) => vec![dependency.clone()],
            Some(Value::Array(dependencies)) => dependencies
                .iter()
                .map(|dependency| {
                    dependency.as_str().map(str::to_string).ok_or_else(|| {
                        Error::invalid(format!(
                            "\"{}\" must be a list of strings",
                            keys.depends_on
                        ))
                    })
                })
                .collect::<Result<_>>()
                .map_err(|error| error.at(&path))?,
            Some(_) => {
                return Err(Error::invalid(format!(
                    "\"{}\" must be a string or a list of strings",
                    keys.depends_on
                ))
                .at(&path))
            }
        };

        let deletion_policy = match raw.get(keys.deletion_policy) {
            None | Some(Value::Null) => None,
            Some(Value::String(policy)) => Some(
                DeletionPolicy::parse(policy, self.version.hot_since(HotVersion::V2016_10_14))
                    .ok_or_else(|| {
                        Error::invalid(format!("Invalid deletion policy \"{policy}\"")).at(&path)
                    })?,
            ),
            Some(other) => {
                return Err(Error::invalid(format!(
                    "Invalid deletion policy \"{}\"",
                    other.short_repr()
                ))
                .at(&path))
            }
        };

        let description = match raw.get(keys.description) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(description)) => description.clone(),
            Some(_) => {
                return Err(Error::invalid(format!(
                    "\"{}\" must be a string",
                    keys.description
                ))
                .at(&path))
            }
        };

        let condition = match keys.condition.and_then(|key| raw.get(key).map(|value| (key, value))) {
            None | Some((_, Value::Null)) => None,
            Some((key, value)) => Some(self.parse_condition_reference(stack, value, &path.key(key))?),
        };

        let mut definition = ResourceDefinition::new(name.to_string(), resource_type)
            .with_depends_on(depends_on)
            .with_description(description);
        if let Some(properties) = properties {
            definition = definition.with_properties(properties);
        }
        if let Some(metadata) = metadata {
            definition = definition.with_metadata(metadata);
        }
        if let Some(update_policy) = update_policy {
            definition = definition.with_update_policy(update_policy);
        }
        if let Some(policy) = deletion_policy {
            definition = definition.with_deletion_policy(policy);
        }
        if let Some(external_id) = external_id {
            definition = definition.with_external_id(external_id);
        }
        if let Some(condition) = condition {
            definition = definition.with_condition(condition);
        }

        tracing::trace!(resource = name, "parsed resource definition");
        Ok(definition)
    }

    /// A `condition` attached to a resource or an output: a boolean, a condition name or a condition function
    fn parse_condition_reference(
        &self,
        stack: StackId,
        value: &Value,
        path: &Breadcrumb,
    ) -> Result<Snippet> {
        match value {
            Value::Boolean(enabled) => Ok(Snippet::Boolean(*enabled)),
            Value::String(name) if self.has_condition(name) => Ok(Snippet::String(name.clone())),
            Value::String(name) => {
                Err(Error::invalid(format!("Invalid condition \"{name}\"")).at(path))
            }
            Value::Object(_) if self.version.hot_since(HotVersion::V2017_09_01) => {
                let snippet = Parser::for_conditions(self, stack)
                    .parse(value)
                    .map_err(|error| error.at(path))?;
                if !matches!(snippet, Snippet::Function(_)) {
                    return Err(Error::invalid("Invalid condition: expected a condition function").at(path));
                }
                Ok(snippet)
            }
            other => Err(Error::invalid(format!(
                "Invalid condition \"{}\"",
                other.short_repr()
            ))
            .at(path)),
        }
    }

    /// Parse all output definitions, in template order
    pub fn outputs(&self, stack: StackId) -> Result<IndexMap<String, OutputDefinition>> {
        let (value_key, description_key, condition_key) = if self.version.is_hot() {
            let condition = self
                .version
                .hot_since(HotVersion::V2016_10_14)
                .then_some("condition");
            ("value", "description", condition)
        } else {
            ("Value", "Description", Some("Condition"))
        };

        let mut outputs = IndexMap::new();
        for (name, raw) in self.entries(Section::Outputs) {
            let path = Breadcrumb::root("outputs").key(name);
            let Some(raw) = raw.as_object() else {
                return Err(Error::invalid("Outputs must be maps").at(&path));
            };
            let allowed = [Some(value_key), Some(description_key), condition_key];
            if let Some(key) = raw.keys().find(|key| !allowed.contains(&Some(key.as_str()))) {
                return Err(Error::invalid(format!(
                    "\"{key}\" is not a valid keyword inside an output definition"
                ))
                .at(&path));
            }

            let value = match raw.get(value_key) {
                Some(value) => self
                    .parse_snippet(stack, value)
                    .map_err(|error| error.at(&path.key(value_key)))?,
                None => Snippet::Null,
            };
            let mut output = OutputDefinition::new(name.clone(), value);
            if let Some(description) = raw.get(description_key).and_then(Value::as_str) {
                output = output.with_description(description);
            }
            if let Some(condition) = condition_key
                .and_then(|key| raw.get(key).map(|value| (key, value)))
                .filter(|(_, value)| !value.is_null())
            {
                let (key, value) = condition;
                output = output
                    .with_condition(self.parse_condition_reference(stack, value, &path.key(key))?);
            }
            outputs.insert(name.clone(), output);
        }
        Ok(outputs)
    }
}

impl FromStr for Template {
    type Err = Error;

    /// Parse a YAML (or JSON) template document
    fn from_str(s: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(s)
            .map_err(|error| Error::invalid(format!("Unable to parse template: {error}")))?;
        Self::new(document)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_section() {
        let error = "heat_template_version: 2015-04-30\nconditions: {}\n"
            .parse::<Template>()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "The template section is invalid: conditions"
        );
    }

    #[test]
    fn resource_keys_per_format() {
        let template = crate::template! {r#"
            AWSTemplateFormatVersion: 2010-09-09
            Resources:
              server:
                Type: OS::Nova::Server
                Properties: { flavor: m1.small }
                DependsOn: volume
              volume:
                Type: OS::Cinder::Volume
        "#};
        let definitions = template.resource_definitions(StackId::next()).unwrap();
        assert_eq!(definitions["server"].resource_type(), "OS::Nova::Server");
        assert_eq!(definitions["server"].depends_on(), ["volume".to_string()]);
        assert_eq!(definitions["volume"].properties(), None);
    }

    #[test]
    fn invalid_resource_keyword() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
            resources:
              server:
                type: OS::Nova::Server
                condition: never
        "#};
        let error = template.resource_definitions(StackId::next()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "resources.server: \"condition\" is not a valid keyword inside a resource definition"
        );
    }

    #[test]
    fn lowercase_deletion_policy() {
        let newton = crate::template! {r#"
            heat_template_version: newton
            resources:
              volume: { type: OS::Cinder::Volume, deletion_policy: retain }
        "#};
        let definitions = newton.resource_definitions(StackId::next()).unwrap();
        assert_eq!(definitions["volume"].deletion_policy(), DeletionPolicy::Retain);

        let liberty = crate::template! {r#"
            heat_template_version: 2015-10-15
            resources:
              volume: { type: OS::Cinder::Volume, deletion_policy: retain }
        "#};
        assert!(liberty.resource_definitions(StackId::next()).is_err());
    }

    #[test]
    fn outputs() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            conditions:
              never: false
            outputs:
              address:
                description: the address
                value: { get_attr: [server, first_address] }
                condition: never
        "#};
        let outputs = template.outputs(StackId::next()).unwrap();
        let address = &outputs["address"];
        assert_eq!(address.description(), Some("the address"));
        assert_eq!(address.condition(), Some(&Snippet::String("never".into())));
    }
}
