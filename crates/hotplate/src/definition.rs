//! resource definitions
//!
//! A [ResourceDefinition] is the parsed form of one entry of the resources section. Definitions compare and hash
//! by their HOT rendering ([ResourceDefinition::render_hot]), which leaves out the name and the description, so
//! the same resource under two names is the same definition.
use crate::error::{Breadcrumb, Error, Result};
use crate::function;
use crate::properties::Properties;
use crate::snippet::Snippet;
use crate::stack::{Resource, Stack};
use crate::translation::Translation;
use crate::value::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeletionPolicy {
    #[default]
    Delete,
    Retain,
    Snapshot,
}

impl DeletionPolicy {
    /// Parse a policy name, optionally accepting the lowercase spelling
    pub fn parse(text: &str, allow_lowercase: bool) -> Option<Self> {
        match text {
            "Delete" => Some(DeletionPolicy::Delete),
            "Retain" => Some(DeletionPolicy::Retain),
            "Snapshot" => Some(DeletionPolicy::Snapshot),
            "delete" if allow_lowercase => Some(DeletionPolicy::Delete),
            "retain" if allow_lowercase => Some(DeletionPolicy::Retain),
            "snapshot" if allow_lowercase => Some(DeletionPolicy::Snapshot),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeletionPolicy::Delete => "Delete",
            DeletionPolicy::Retain => "Retain",
            DeletionPolicy::Snapshot => "Snapshot",
        }
    }
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, derive_new::new)]
pub struct ResourceDefinition {
    name: String,
    resource_type: String,
    #[new(default)]
    properties: Option<Snippet>,
    #[new(default)]
    metadata: Option<Snippet>,
    #[new(default)]
    depends_on: Vec<String>,
    #[new(default)]
    deletion_policy: Option<DeletionPolicy>,
    #[new(default)]
    update_policy: Option<Snippet>,
    #[new(default)]
    description: String,
    #[new(default)]
    external_id: Option<Snippet>,
    #[new(default)]
    condition: Option<Snippet>,
    #[new(default)]
    frozen: bool,
}

/// Replacement values for [ResourceDefinition::freeze]
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub properties: Option<Value>,
    pub metadata: Option<Value>,
    pub depends_on: Option<Vec<String>>,
    pub deletion_policy: Option<DeletionPolicy>,
    pub update_policy: Option<Value>,
    pub description: Option<String>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.properties.is_none()
            && self.metadata.is_none()
            && self.depends_on.is_none()
            && self.deletion_policy.is_none()
            && self.update_policy.is_none()
            && self.description.is_none()
    }
}

impl ResourceDefinition {
    pub fn with_properties(mut self, properties: impl Into<Snippet>) -> Self {
        self.properties = Some(properties.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<Snippet>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Ignored for external resources, which are always retained
    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        if self.external_id.is_none() {
            self.deletion_policy = Some(policy);
        }
        self
    }

    pub fn with_update_policy(mut self, update_policy: impl Into<Snippet>) -> Self {
        self.update_policy = Some(update_policy.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<Snippet>) -> Self {
        self.external_id = Some(external_id.into());
        self.deletion_policy = Some(DeletionPolicy::Retain);
        self
    }

    pub fn with_condition(mut self, condition: impl Into<Snippet>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn properties(&self) -> Option<&Snippet> {
        self.properties.as_ref()
    }

    pub fn metadata(&self) -> Option<&Snippet> {
        self.metadata.as_ref()
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn deletion_policy(&self) -> DeletionPolicy {
        self.deletion_policy.unwrap_or_default()
    }

    pub fn update_policy(&self) -> Option<&Snippet> {
        self.update_policy.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn external_id(&self) -> Option<&Snippet> {
        self.external_id.as_ref()
    }

    pub fn condition(&self) -> Option<&Snippet> {
        self.condition.as_ref()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// A copy with every function resolved, with `overrides` applied
    ///
    /// Freezing a frozen definition without overrides borrows it unchanged.
    #[tracing::instrument(level = "trace", skip_all, fields(resource = %self.name))]
    pub fn freeze<'d>(&'d self, stack: &Stack<'_>, overrides: Overrides) -> Result<Cow<'d, Self>> {
        if self.frozen && overrides.is_empty() {
            return Ok(Cow::Borrowed(self));
        }

        let frozen = |snippet: &Option<Snippet>| -> Result<Option<Snippet>> {
            snippet
                .as_ref()
                .map(|snippet| function::resolve(snippet, stack).map(Snippet::from))
                .transpose()
        };

        let mut definition = Self {
            name: self.name.clone(),
            resource_type: self.resource_type.clone(),
            properties: match overrides.properties {
                Some(properties) => Some(properties.into()),
                None => frozen(&self.properties)?,
            },
            metadata: match overrides.metadata {
                Some(metadata) => Some(metadata.into()),
                None => frozen(&self.metadata)?,
            },
            depends_on: overrides.depends_on.unwrap_or_else(|| self.depends_on.clone()),
            deletion_policy: self.deletion_policy,
            update_policy: match overrides.update_policy {
                Some(update_policy) => Some(update_policy.into()),
                None => frozen(&self.update_policy)?,
            },
            description: overrides
                .description
                .unwrap_or_else(|| self.description.clone()),
            external_id: frozen(&self.external_id)?,
            condition: frozen(&self.condition)?,
            frozen: true,
        };
        if let Some(policy) = overrides.deletion_policy {
            definition = definition.with_deletion_policy(policy);
        }

        Ok(Cow::Owned(definition))
    }

    /// Interpret the raw fields of this definition again, for `stack`
    ///
    /// The condition is dropped, it only has a meaning in the stack that evaluated it.
    pub fn reparse(&self, stack: &Stack<'_>) -> Result<Self> {
        let template = stack.template();
        let reparsed = |snippet: &Option<Snippet>| -> Result<Option<Snippet>> {
            snippet
                .as_ref()
                .map(|snippet| template.parse_snippet(stack.id(), &snippet.to_canonical_json()))
                .transpose()
        };

        Ok(Self {
            name: self.name.clone(),
            resource_type: self.resource_type.clone(),
            properties: reparsed(&self.properties)?,
            metadata: reparsed(&self.metadata)?,
            depends_on: self.depends_on.clone(),
            deletion_policy: self.deletion_policy,
            update_policy: reparsed(&self.update_policy)?,
            description: self.description.clone(),
            external_id: reparsed(&self.external_id)?,
            condition: None,
            frozen: false,
        })
    }

    /// Names of all resources this one requires: explicit `depends_on` plus references in properties and metadata
    pub fn required_resource_names(&self) -> Result<BTreeSet<String>> {
        if let Some(external_id) = &self.external_id {
            if !self.depends_on.is_empty() {
                let external_id = external_id.to_canonical_json();
                return Err(Error::InvalidExternalResourceDependency {
                    resource_type: self.resource_type.clone(),
                    external_id: external_id
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| external_id.short_repr()),
                });
            }
        }

        let mut names: BTreeSet<String> = self.depends_on.iter().cloned().collect();
        for (section, snippet) in [("properties", &self.properties), ("metadata", &self.metadata)] {
            if let Some(snippet) = snippet {
                let path = format!("{}.{section}", self.name);
                names.extend(function::dependencies(snippet, path).map(|dependency| dependency.resource));
            }
        }
        Ok(names)
    }

    /// The live resources this one requires
    ///
    /// Resources that exist in the template but not in the stack (disabled by a condition) are skipped.
    pub fn dependencies<'s>(&self, stack: &Stack<'s>) -> Result<Vec<&'s dyn Resource>> {
        let mut resources = Vec::new();
        for name in self.required_resource_names()? {
            match stack.resources().get(&name) {
                Some(resource) => resources.push(resource),
                None if stack.template().has_resource(&name) => {
                    tracing::trace!(resource = %self.name, dependency = %name, "skipping inactive dependency");
                }
                None => {
                    return Err(Error::InvalidTemplateReference {
                        resource: name,
                        key: self.name.clone(),
                    })
                }
            }
        }
        Ok(resources)
    }

    /// Validate every section of this definition
    pub fn validate(&self, stack: &Stack<'_>) -> Result<()> {
        let path = Breadcrumb::root("resources").key(&self.name);
        for (section, snippet) in [
            ("properties", &self.properties),
            ("metadata", &self.metadata),
            ("update_policy", &self.update_policy),
            ("external_id", &self.external_id),
        ] {
            if let Some(snippet) = snippet {
                function::validate(snippet, stack, &path.key(section))?;
            }
        }

        for dependency in &self.depends_on {
            if !stack.template().has_resource(dependency) {
                return Err(Error::InvalidTemplateReference {
                    resource: dependency.clone(),
                    key: self.name.clone(),
                });
            }
        }

        if let Some(Snippet::String(condition)) = &self.condition {
            if !stack.conditions().contains(condition) {
                return Err(Error::invalid(format!("Invalid condition \"{condition}\"")).at(&path));
            }
        }

        self.required_resource_names().map_err(|error| error.at(&path))?;
        Ok(())
    }

    /// Property view of this definition, optionally with translation rules applied on read
    pub fn properties_view<'a, 's>(
        &'a self,
        stack: &'a Stack<'s>,
        translation: Option<Translation>,
    ) -> Result<Properties<'a, 's>> {
        let properties = Properties::new(self.properties.as_ref(), stack)?;
        Ok(match translation {
            Some(translation) => properties.with_translation(translation),
            None => properties,
        })
    }

    /// The definition in HOT wire form, without name and description
    pub fn render_hot(&self) -> Value {
        let mut rendered = Map::new();
        rendered.insert("type".into(), self.resource_type.clone().into());
        for (key, snippet) in [
            ("properties", &self.properties),
            ("metadata", &self.metadata),
        ] {
            if let Some(snippet) = snippet {
                rendered.insert(key.into(), snippet.to_canonical_json());
            }
        }
        if !self.depends_on.is_empty() {
            rendered.insert("depends_on".into(), self.depends_on.clone().into());
        }
        if let Some(policy) = self.deletion_policy {
            rendered.insert("deletion_policy".into(), policy.as_str().into());
        }
        for (key, snippet) in [
            ("update_policy", &self.update_policy),
            ("external_id", &self.external_id),
            ("condition", &self.condition),
        ] {
            if let Some(snippet) = snippet {
                rendered.insert(key.into(), snippet.to_canonical_json());
            }
        }
        Value::Object(rendered)
    }
}

impl PartialEq for ResourceDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.render_hot() == other.render_hot()
    }
}

impl Eq for ResourceDefinition {}

impl Hash for ResourceDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.render_hot().structural_hash());
    }
}

/// Changes between two versions of a resource definition, compared unresolved
#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct Diff<'a> {
    old: &'a ResourceDefinition,
    new: &'a ResourceDefinition,
}

impl Diff<'_> {
    pub fn properties_changed(&self) -> bool {
        self.old.properties != self.new.properties
    }

    pub fn metadata_changed(&self) -> bool {
        self.old.metadata != self.new.metadata
    }

    pub fn update_policy_changed(&self) -> bool {
        self.old.update_policy != self.new.update_policy
    }

    pub fn is_changed(&self) -> bool {
        self.properties_changed() || self.metadata_changed() || self.update_policy_changed()
    }
}

/// `new - old` describes what changed from `old` to `new`
impl<'a> std::ops::Sub for &'a ResourceDefinition {
    type Output = Diff<'a>;

    fn sub(self, previous: Self) -> Diff<'a> {
        Diff::new(previous, self)
    }
}
