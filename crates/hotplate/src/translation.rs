//! declarative property translation
//!
//! A [TranslationRule] migrates one property path of a resource: appending to a list ([RuleKind::Add]), moving
//! a value from a deprecated property ([RuleKind::Replace]), mapping a name to a backend id through a
//! [ClientPlugin] ([RuleKind::Resolve]) or dropping a property ([RuleKind::Delete]).
//!
//! Rules are grouped by their canonical path, the path with list indexes removed, so one rule applies to every
//! element of a list. When a property is read all rules below it run in [RuleKind] order.
//!
//! Translation works on resolved values and never changes the parsed definition. Values a [RuleKind::Replace]
//! moved away are hidden from [crate::properties::Properties] readers.
use crate::error::{Error, Result};
use crate::properties::Properties;
use crate::value::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Rule kinds, in the order they are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKind {
    Add = 0,
    Replace = 1,
    Resolve = 2,
    Delete = 3,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleKind::Add => "Add",
            RuleKind::Replace => "Replace",
            RuleKind::Resolve => "Resolve",
            RuleKind::Delete => "Delete",
        })
    }
}

/// Looks up backend entities by name, e.g. a network id from its name
///
/// Implementations should be idempotent; results are cached per translated property.
pub trait ClientPlugin {
    fn name(&self) -> &str;

    fn find(&self, finder: &str, entity: Option<&str>, value: &Value) -> Result<Value>;
}

#[derive(Clone, derive_new::new)]
pub struct TranslationRule {
    pub path: Vec<String>,
    pub kind: RuleKind,
    #[new(default)]
    pub value: Option<Value>,
    #[new(default)]
    pub value_name: Option<String>,
    #[new(default)]
    pub value_path: Option<Vec<String>>,
    #[new(default)]
    pub client_plugin: Option<Arc<dyn ClientPlugin>>,
    #[new(default)]
    pub finder: Option<String>,
    #[new(default)]
    pub entity: Option<String>,
    #[new(default)]
    pub custom_value_path: Option<Vec<String>>,
}

fn path_of(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

impl TranslationRule {
    /// `path` is dot separated, e.g. `networks.port`
    pub fn add(path: &str) -> Self {
        Self::new(path_of(path), RuleKind::Add)
    }

    pub fn replace(path: &str) -> Self {
        Self::new(path_of(path), RuleKind::Replace)
    }

    pub fn resolve(path: &str, plugin: Arc<dyn ClientPlugin>, finder: impl Into<String>) -> Self {
        Self {
            client_plugin: Some(plugin),
            finder: Some(finder.into()),
            ..Self::new(path_of(path), RuleKind::Resolve)
        }
    }

    pub fn delete(path: &str) -> Self {
        Self::new(path_of(path), RuleKind::Delete)
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Source property next to the target
    pub fn with_value_name(mut self, name: impl Into<String>) -> Self {
        self.value_name = Some(name.into());
        self
    }

    /// Source property as a dot separated path from the top of the properties
    pub fn with_value_path(mut self, path: &str) -> Self {
        self.value_path = Some(path_of(path));
        self
    }

    pub fn with_custom_value_path(mut self, path: &str) -> Self {
        self.custom_value_path = Some(path_of(path));
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// The path without list indexes
    pub fn canonical_path(&self) -> Vec<&str> {
        self.path
            .iter()
            .map(String::as_str)
            .filter(|segment| segment.parse::<usize>().is_err())
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| {
            Err(Error::InvalidTranslationRule(format!(
                "{} rule for \"{}\": {message}",
                self.kind,
                self.path.join(".")
            )))
        };

        if self.canonical_path().is_empty() {
            return invalid("the translation path is empty".into());
        }
        let sources = [
            self.value.is_some(),
            self.value_name.is_some(),
            self.value_path.is_some(),
        ];
        if sources.iter().filter(|set| **set).count() > 1 {
            return invalid("only one of value, value_name and value_path may be set".into());
        }
        let has_source = sources.contains(&true);

        match self.kind {
            RuleKind::Add | RuleKind::Replace if !has_source => {
                invalid("one of value, value_name or value_path is required".into())
            }
            RuleKind::Add => match &self.value {
                None | Some(Value::Array(_)) => Ok(()),
                Some(value) => invalid(format!("value must be a list, not {}", value.short_repr())),
            },
            RuleKind::Resolve if self.client_plugin.is_none() || self.finder.is_none() => {
                invalid("a client plugin and finder are required".into())
            }
            RuleKind::Resolve | RuleKind::Delete if has_source => {
                invalid("no value source may be set".into())
            }
            _ if self.custom_value_path.is_some() && self.value_path.is_none() && self.value_name.is_none() => {
                invalid("custom_value_path needs value_path or value_name".into())
            }
            _ => Ok(()),
        }
    }

    /// Top-level property this rule moves a value out of
    fn moved_property(&self) -> Option<&str> {
        if self.kind != RuleKind::Replace {
            return None;
        }
        match (&self.value_name, &self.value_path) {
            (Some(name), _) if self.path.len() == 1 => Some(name.as_str()),
            (_, Some(path)) if path.len() == 1 => path.first().map(String::as_str),
            _ => None,
        }
    }

    /// Top-level property a nested [RuleKind::Replace] source lives in, when it is not the target's own
    fn nested_source(&self) -> Option<&str> {
        let path = self.value_path.as_ref().filter(|path| path.len() > 1)?;
        let root = path.first()?.as_str();
        (self.kind == RuleKind::Replace && self.canonical_path().first() != Some(&root)).then_some(root)
    }
}

impl fmt::Debug for TranslationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationRule")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("value_name", &self.value_name)
            .field("value_path", &self.value_path)
            .field(
                "client_plugin",
                &self.client_plugin.as_ref().map(|plugin| plugin.name()),
            )
            .field("finder", &self.finder)
            .field("entity", &self.entity)
            .field("custom_value_path", &self.custom_value_path)
            .finish()
    }
}

/// A validated rule set with its per-property cache
pub struct Translation {
    rules: BTreeMap<String, Vec<TranslationRule>>,
    client_resolve: bool,
    cache: RefCell<HashMap<String, Option<Value>>>,
    /// Top-level properties as left behind after nested replace sources were moved out of them
    residue: RefCell<HashMap<String, Option<Value>>>,
    in_progress: RefCell<HashSet<String>>,
}

impl Translation {
    /// `client_resolve: false` skips [RuleKind::Resolve] rules, for passes that must not reach backends
    pub fn new(rules: Vec<TranslationRule>, client_resolve: bool) -> Result<Self> {
        let mut grouped: BTreeMap<String, Vec<TranslationRule>> = BTreeMap::new();
        for rule in rules {
            rule.validate()?;
            grouped
                .entry(rule.canonical_path().join("."))
                .or_default()
                .push(rule);
        }
        for rules in grouped.values_mut() {
            rules.sort_by_key(|rule| rule.kind);
        }
        Ok(Self {
            rules: grouped,
            client_resolve,
            cache: RefCell::default(),
            residue: RefCell::default(),
            in_progress: RefCell::default(),
        })
    }

    pub fn client_resolve(&self) -> bool {
        self.client_resolve
    }

    fn rules_for<'t>(&'t self, key: &'t str) -> impl Iterator<Item = &'t TranslationRule> + 't {
        self.rules
            .values()
            .flatten()
            .filter(move |rule| rule.canonical_path().first() == Some(&key))
    }

    /// `true` if reading top-level property `key` runs any rule, or a rule moves a value out of it
    pub fn affects(&self, key: &str) -> bool {
        self.rules_for(key).next().is_some() || self.moved_from(key).next().is_some()
    }

    /// Top-level properties whose rules move a nested value out of `key`
    fn moved_from<'t>(&'t self, key: &'t str) -> impl Iterator<Item = &'t str> + 't {
        self.rules
            .values()
            .flatten()
            .filter(move |rule| rule.nested_source() == Some(key))
            .filter_map(|rule| rule.canonical_path().first().copied())
    }

    /// `true` if a rule moves the value of top-level property `key` elsewhere
    pub fn masks(&self, key: &str) -> bool {
        self.rules
            .values()
            .flatten()
            .any(|rule| rule.moved_property() == Some(key))
    }

    /// Top-level properties rules write to
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.rules
            .values()
            .flatten()
            .filter(|rule| rule.kind != RuleKind::Delete)
            .filter_map(|rule| rule.canonical_path().first().copied())
    }

    /// The translated value of top-level property `key`
    ///
    /// A parameter without a value anywhere on the way skips translation and reads the property as it is.
    #[tracing::instrument(level = "trace", skip_all, fields(property = key))]
    pub fn translate(&self, key: &str, properties: &Properties<'_, '_>) -> Result<Option<Value>> {
        if let Some(cached) = self.cache.borrow().get(key) {
            return Ok(cached.clone());
        }
        if !self.in_progress.borrow_mut().insert(key.to_string()) {
            return self.load(key, properties);
        }
        let translated = self.translate_uncached(key, properties);
        self.in_progress.borrow_mut().remove(key);
        translated
    }

    fn translate_uncached(&self, key: &str, properties: &Properties<'_, '_>) -> Result<Option<Value>> {
        let movers: Vec<&str> = self.moved_from(key).collect();
        for target in movers {
            self.translate(target, properties)?;
        }

        let translated = match self.apply_all(key, properties) {
            Ok(translated) => translated,
            Err(Error::UserParameterMissing(parameter)) => {
                if self.client_resolve {
                    tracing::warn!(property = key, parameter, "translation skipped, parameter has no value");
                } else {
                    tracing::debug!(property = key, parameter, "translation skipped, parameter has no value");
                }
                return self.load(key, properties);
            }
            Err(error) => return Err(error),
        };

        self.cache
            .borrow_mut()
            .insert(key.to_string(), translated.clone());
        Ok(translated)
    }

    fn apply_all(&self, key: &str, properties: &Properties<'_, '_>) -> Result<Option<Value>> {
        let mut rules: Vec<&TranslationRule> = self.rules_for(key).collect();
        rules.sort_by_key(|rule| rule.kind);

        let mut data = Map::new();
        let load = |name: &str, data: &mut Map| -> Result<()> {
            if !data.contains_key(name) {
                if let Some(value) = self.load(name, properties)? {
                    data.insert(name.to_string(), value);
                }
            }
            Ok(())
        };
        load(key, &mut data)?;
        for rule in &rules {
            if let (Some(name), 1) = (&rule.value_name, rule.path.len()) {
                load(name, &mut data)?;
            }
            if let Some(root) = rule.value_path.as_ref().and_then(|path| path.first()) {
                load(root, &mut data)?;
            }
        }

        for rule in &rules {
            tracing::debug!(property = key, kind = %rule.kind, path = %rule.path.join("."), "applying translation rule");
            self.apply(rule, &mut data)?;
        }

        let mut residue = self.residue.borrow_mut();
        for root in rules.iter().filter_map(|rule| rule.nested_source()) {
            residue.insert(root.to_string(), data.get(root).cloned());
        }
        Ok(data.shift_remove(key))
    }

    /// Untranslated value of `key`, minus what rules of other properties moved out of it
    fn load(&self, key: &str, properties: &Properties<'_, '_>) -> Result<Option<Value>> {
        if let Some(residue) = self.residue.borrow().get(key) {
            return Ok(residue.clone());
        }
        properties.resolve_untranslated(key)
    }

    fn apply(&self, rule: &TranslationRule, data: &mut Map) -> Result<()> {
        let path = rule.canonical_path();
        let target = path.join(".");

        let external = match &rule.value_path {
            Some(value_path) => lookup(data, value_path).map(|value| rule.custom_value(&value)),
            None => None,
        };

        match rule.kind {
            RuleKind::Add => for_each_target(data, &path, &mut |container, key| {
                let source = match (&rule.value, &rule.value_name) {
                    (Some(value), _) => Some(value.clone()),
                    (_, Some(name)) => container.get(name).map(|value| rule.custom_value(value)),
                    _ => external.clone(),
                };
                let Some(source) = source.filter(|source| !source.is_null()) else {
                    return Ok(());
                };
                let mut items = match container.shift_remove(key) {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items,
                    Some(other) => {
                        return Err(Error::InvalidTranslationRule(format!(
                            "Add rule for \"{target}\": {} is not a list",
                            other.short_repr()
                        )))
                    }
                };
                match source {
                    Value::Array(source) => items.extend(source),
                    source => items.push(source),
                }
                container.insert(key.to_string(), Value::Array(items));
                Ok(())
            })?,

            RuleKind::Replace => {
                let mut moved = false;
                for_each_target(data, &path, &mut |container, key| {
                    let (source, source_name) = match (&rule.value, &rule.value_name) {
                        (Some(value), _) => (Some(value.clone()), None),
                        (_, Some(name)) => (
                            container.get(name).map(|value| rule.custom_value(value)),
                            Some(name.clone()),
                        ),
                        _ => (
                            external.clone(),
                            rule.value_path.as_ref().map(|path| path.join(".")),
                        ),
                    };
                    let Some(source) = source.filter(|source| !source.is_null()) else {
                        return Ok(());
                    };
                    let occupied = container.get(key).is_some_and(|value| !value.is_null());
                    if let (true, Some(source_name)) = (occupied, &source_name) {
                        return Err(Error::PropertyConflict {
                            props: vec![target.clone(), source_name.clone()],
                        });
                    }
                    container.insert(key.to_string(), source);
                    if let Some(name) = &rule.value_name {
                        container.shift_remove(name);
                    }
                    moved = true;
                    Ok(())
                })?;
                if let (true, Some(value_path)) = (moved, &rule.value_path) {
                    remove(data, value_path);
                }
            }

            RuleKind::Resolve => {
                if !self.client_resolve {
                    tracing::debug!(path = %target, "client resolution disabled, resolve rule skipped");
                    return Ok(());
                }
                let (Some(plugin), Some(finder)) = (&rule.client_plugin, &rule.finder) else {
                    return Ok(());
                };
                let entity = rule.entity.as_deref();
                for_each_target(data, &path, &mut |container, key| {
                    let Some(value) = container.get_mut(key) else {
                        return Ok(());
                    };
                    let resolved = match &*value {
                        Value::Null => return Ok(()),
                        Value::Array(items) => Value::Array(
                            items
                                .iter()
                                .map(|item| plugin.find(finder, entity, item))
                                .collect::<Result<_>>()?,
                        ),
                        item => plugin.find(finder, entity, item)?,
                    };
                    *value = resolved;
                    Ok(())
                })?;
            }

            RuleKind::Delete => for_each_target(data, &path, &mut |container, key| {
                container.shift_remove(key);
                Ok(())
            })?,
        }
        Ok(())
    }
}

impl TranslationRule {
    fn custom_value(&self, value: &Value) -> Value {
        let Some(custom) = &self.custom_value_path else {
            return value.clone();
        };
        let pick = |value: &Value| lookup_value(value, custom).unwrap_or_default();
        match value {
            Value::Array(items) => Value::Array(items.iter().map(pick).collect()),
            value => pick(value),
        }
    }
}

impl fmt::Debug for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translation")
            .field("rules", &self.rules)
            .field("client_resolve", &self.client_resolve)
            .finish_non_exhaustive()
    }
}

/// Run `apply` on the map holding the last segment of `path`, once per list element on the way
fn for_each_target(
    map: &mut Map,
    path: &[&str],
    apply: &mut dyn FnMut(&mut Map, &str) -> Result<()>,
) -> Result<()> {
    match path {
        [] => Ok(()),
        [key] => apply(map, key),
        [key, rest @ ..] => match map.get_mut(*key) {
            Some(Value::Object(inner)) => for_each_target(inner, rest, apply),
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        for_each_target(inner, rest, apply)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        },
    }
}

fn lookup_value(value: &Value, path: &[String]) -> Option<Value> {
    path.iter()
        .try_fold(value, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
            _ => None,
        })
        .cloned()
}

fn lookup(data: &Map, path: &[String]) -> Option<Value> {
    let (first, rest) = path.split_first()?;
    lookup_value(data.get(first)?, rest)
}

fn remove(data: &mut Map, path: &[String]) {
    match path {
        [] => {}
        [key] => {
            data.shift_remove(key);
        }
        [key, rest @ ..] => match data.get_mut(key) {
            Some(Value::Object(inner)) => remove(inner, rest),
            Some(Value::Array(items)) => remove_in_list(items, rest),
            _ => {}
        },
    }
}

fn remove_in_list(items: &mut Vec<Value>, path: &[String]) {
    let Some((index, rest)) = path.split_first() else {
        return;
    };
    let Some(index) = index.parse::<usize>().ok().filter(|index| *index < items.len()) else {
        return;
    };
    if rest.is_empty() {
        items.remove(index);
    } else if let Some(Value::Object(inner)) = items.get_mut(index) {
        remove(inner, rest);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::definition::ResourceDefinition;
    use crate::stack::{Stack, StaticResources};
    use pretty_assertions::assert_eq;

    fn value(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    struct Networks;

    impl ClientPlugin for Networks {
        fn name(&self) -> &str {
            "network"
        }

        fn find(&self, finder: &str, entity: Option<&str>, value: &Value) -> Result<Value> {
            assert_eq!((finder, entity), ("find_resourceid_by_name_or_id", Some("network")));
            match value.as_str() {
                Some("private") => Ok("2e5c-private".into()),
                Some("public") => Ok("9f01-public".into()),
                _ => Err(Error::Finder {
                    plugin: self.name().into(),
                    value: value.short_repr(),
                    message: "not found".into(),
                }),
            }
        }
    }

    fn read<T>(
        properties: &str,
        rules: Vec<TranslationRule>,
        client_resolve: bool,
        read: impl FnOnce(&Properties<'_, '_>) -> Result<T>,
    ) -> Result<T> {
        let template = crate::template!("heat_template_version: 2017-09-01\nparameters:\n  unset: { type: string }");
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let properties = template.parse_snippet(stack.id(), &value(properties)).unwrap();
        let definition =
            ResourceDefinition::new("server".into(), "OS::Nova::Server".into()).with_properties(properties);
        let view = definition.properties_view(&stack, Some(Translation::new(rules, client_resolve)?))?;
        read(&view)
    }

    fn translate(properties: &str, rules: Vec<TranslationRule>, client_resolve: bool) -> Result<Map> {
        read(properties, rules, client_resolve, |properties| properties.resolve_all())
    }

    #[test]
    fn add_appends_from_value_name() {
        let translated = translate(
            "{ networks: [a], extra_networks: [b, c] }",
            vec![TranslationRule::add("networks").with_value_name("extra_networks")],
            true,
        )
        .unwrap();
        assert_eq!(translated["networks"], value("[a, b, c]"));
        assert_eq!(translated["extra_networks"], value("[b, c]"));
    }

    #[test]
    fn replace_runs_before_delete() {
        let translated = translate(
            "{ networks: [{ port_id: p1 }, { port: p2, fixed_ip: 10.0.0.2 }] }",
            vec![
                TranslationRule::delete("networks.port_id"),
                TranslationRule::delete("networks.0.fixed_ip"),
                TranslationRule::replace("networks.port").with_value_name("port_id"),
            ],
            true,
        )
        .unwrap();
        assert_eq!(
            translated["networks"],
            value("[{ port: p1 }, { port: p2 }]")
        );
    }

    #[test]
    fn replace_moves_top_level_properties() {
        let translated = translate(
            "{ flavor_name: m1.small, image: cirros }",
            vec![TranslationRule::replace("flavor").with_value_name("flavor_name")],
            true,
        )
        .unwrap();
        assert_eq!(translated, value("{ image: cirros, flavor: m1.small }").as_object().unwrap().clone());
    }

    #[test]
    fn add_flattens_a_value_path_source() {
        let translated = translate(
            "{ networks: [n0], extra: { networks: [{ uuid: n1 }, { uuid: n2 }] } }",
            vec![TranslationRule::add("networks")
                .with_value_path("extra.networks")
                .with_custom_value_path("uuid")],
            true,
        )
        .unwrap();
        assert_eq!(translated["networks"], value("[n0, n1, n2]"));
        assert_eq!(translated["extra"], value("{ networks: [{ uuid: n1 }, { uuid: n2 }] }"));
    }

    #[test]
    fn replace_removes_a_nested_source() {
        let source = "{ old: { net: n1, keep: k } }";
        let rules = || vec![TranslationRule::replace("network").with_value_path("old.net")];
        assert_eq!(
            translate(source, rules(), true).unwrap(),
            value("{ old: { keep: k }, network: n1 }").as_object().unwrap().clone()
        );

        let (network, old) = read(source, rules(), true, |properties| {
            Ok((properties.get("network")?, properties.get("old")?))
        })
        .unwrap();
        assert_eq!(network, Some(value("n1")));
        assert_eq!(old, Some(value("{ keep: k }")));
    }

    #[test]
    fn replace_with_custom_value_path() {
        let translated = translate(
            "{ config: { networks: [{ id: a }, { id: b }], region: r1 } }",
            vec![TranslationRule::replace("network_ids")
                .with_value_path("config.networks")
                .with_custom_value_path("id")],
            true,
        )
        .unwrap();
        assert_eq!(
            translated,
            value("{ config: { region: r1 }, network_ids: [a, b] }").as_object().unwrap().clone()
        );
    }

    #[test]
    fn replace_within_one_property() {
        let translated = translate(
            "{ server: { flavor_name: m1.small, image: cirros } }",
            vec![TranslationRule::replace("server.flavor").with_value_path("server.flavor_name")],
            true,
        )
        .unwrap();
        assert_eq!(
            translated["server"],
            value("{ image: cirros, flavor: m1.small }")
        );
    }

    #[test]
    fn replace_conflict() {
        let error = translate(
            "{ networks: [{ port_id: p1, port: p2 }] }",
            vec![TranslationRule::replace("networks.port").with_value_name("port_id")],
            true,
        )
        .unwrap_err();
        assert!(matches!(
            &error,
            Error::PropertyConflict { props } if props == &["networks.port".to_string(), "port_id".to_string()]
        ), "{error}");
    }

    #[test]
    fn resolve_uses_the_client_plugin() {
        let rule = || {
            TranslationRule::resolve("networks.network", Arc::new(Networks), "find_resourceid_by_name_or_id")
                .with_entity("network")
        };
        let source = "{ networks: [{ network: private }, { network: public }] }";
        assert_eq!(
            translate(source, vec![rule()], true).unwrap()["networks"],
            value("[{ network: 2e5c-private }, { network: 9f01-public }]")
        );
        assert_eq!(
            translate(source, vec![rule()], false).unwrap()["networks"],
            value(source).as_object().unwrap()["networks"]
        );
    }

    #[test]
    fn missing_parameter_skips_translation() {
        let translated = translate(
            "{ flavor_name: { get_param: unset }, image: cirros }",
            vec![TranslationRule::replace("flavor").with_value_name("flavor_name")],
            false,
        )
        .unwrap();
        assert_eq!(translated, value("{ image: cirros }").as_object().unwrap().clone());
    }

    #[test]
    fn invalid_rules() {
        assert!(TranslationRule::add("networks").validate().is_err());
        assert!(TranslationRule::add("networks").with_value("a").validate().is_err());
        assert!(TranslationRule::replace("a")
            .with_value_name("b")
            .with_value_path("c")
            .validate()
            .is_err());
        assert!(TranslationRule::delete("a").with_value_name("b").validate().is_err());
        assert!(TranslationRule::delete("0").validate().is_err());
        TranslationRule::add("networks").with_value(vec!["a"]).validate().unwrap();
    }
}
