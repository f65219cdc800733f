//! function registries
//!
//! Each template format revision selects one table for resource/output snippets and one for the conditions
//! section. Tables are built once per process (see [super::Version::functions]).
use crate::error::Result;
use crate::function::collection::{
    Contains, Filter, ListConcat, MapMerge, MapReplace, MemberListToMap, Repeat, Select,
};
use crate::function::condition::{And, Condition, Equals, If, Not, Or};
use crate::function::reference::{self, FindInMap, GetAtt, GetFile, GetParam, GetResource, ResourceFacade};
use crate::function::string::{Base64, Digest, Join, Replace, Split};
use crate::function::{Call, Function};
use crate::template::{HotVersion, Parser};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a function from its already parsed arguments
pub type Constructor = fn(&Parser<'_>, Call) -> Result<Arc<dyn Function>>;

/// Builds a function from its raw arguments, parsing them itself
pub type MacroConstructor = fn(&mut Parser<'_>, &str, &Value) -> Result<Arc<dyn Function>>;

#[derive(Clone, Copy)]
pub enum Entry {
    Function(Constructor),
    Macro(MacroConstructor),
    /// no longer available, with an optional replacement to suggest
    Removed(Option<&'static str>),
}

#[derive(Default)]
pub struct Registry {
    entries: HashMap<&'static str, Entry>,
}

impl Registry {
    fn function(mut self, name: &'static str, constructor: Constructor) -> Self {
        self.entries.insert(name, Entry::Function(constructor));
        self
    }

    fn with_macro(mut self, name: &'static str, constructor: MacroConstructor) -> Self {
        self.entries.insert(name, Entry::Macro(constructor));
        self
    }

    fn removed(mut self, name: &'static str, replacement: Option<&'static str>) -> Self {
        self.entries.insert(name, Entry::Removed(replacement));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// `true` if `name` can be used (not removed)
    pub fn contains(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Entry::Function(_) | Entry::Macro(_)))
    }

    /// Names of all usable functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| !matches!(entry, Entry::Removed(_)))
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

pub(crate) fn cfn_functions() -> Registry {
    Registry::default()
        .function("Fn::FindInMap", FindInMap::build)
        .function("Fn::Select", Select::build)
        .function("Fn::Join", Join::build)
        .function("Fn::Split", Split::build)
        .function("Fn::Replace", Replace::build_cfn)
        .function("Fn::Base64", Base64::build)
        .function("Fn::MemberListToMap", MemberListToMap::build)
        .function("Fn::ResourceFacade", ResourceFacade::build)
        .function("Ref", reference::build_ref)
        .function("Fn::GetAtt", GetAtt::build_cfn)
        .function("Fn::If", If::build)
}

pub(crate) fn cfn_condition_functions() -> Registry {
    Registry::default()
        .function("Fn::Equals", Equals::build)
        .function("Ref", GetParam::build)
        .function("Fn::FindInMap", FindInMap::build)
        .with_macro("Fn::Not", Not::build)
        .function("Fn::And", And::build)
        .function("Fn::Or", Or::build)
        .function("Condition", Condition::build)
}

pub(crate) fn hot_functions(version: HotVersion) -> Registry {
    use HotVersion::*;

    if version == V2013_05_23 {
        return Registry::default()
            .function("get_param", GetParam::build)
            .function("get_resource", GetResource::build)
            .function("Ref", reference::build_ref)
            .function("get_attr", GetAtt::build_hot)
            .function("Fn::Select", Select::build)
            .function("Fn::Join", Join::build)
            .function("Fn::Split", Split::build)
            .function("str_replace", Replace::build_hot)
            .function("Fn::Replace", Replace::build_cfn)
            .function("Fn::Base64", Base64::build)
            .function("Fn::MemberListToMap", MemberListToMap::build)
            .function("resource_facade", ResourceFacade::build)
            .function("Fn::ResourceFacade", ResourceFacade::build)
            .function("get_file", GetFile::build);
    }

    let mut registry = Registry::default()
        .function("get_param", GetParam::build)
        .function("get_resource", GetResource::build)
        .function("get_attr", GetAtt::build_hot)
        .function("get_file", GetFile::build)
        .function("list_join", Join::build)
        .function("str_replace", Replace::build_hot)
        .function("resource_facade", ResourceFacade::build)
        .function("Fn::Select", Select::build)
        .removed("Fn::GetAZs", None)
        .removed("Fn::Join", Some("list_join"))
        .removed("Fn::Split", Some("str_split"))
        .removed("Fn::Replace", Some("str_replace"))
        .removed("Fn::Base64", None)
        .removed("Fn::MemberListToMap", None)
        .removed("Fn::ResourceFacade", Some("resource_facade"))
        .removed("Ref", Some("get_resource\" or \"get_param"));

    if version >= V2015_04_30 {
        registry = registry
            .function("digest", Digest::build)
            .function("repeat", Repeat::build);
    }
    if version >= V2015_10_15 {
        registry = registry
            .function("list_join", Join::build_multiple)
            .function("str_split", Split::build_indexed);
    }
    if version >= V2016_04_08 {
        registry = registry.function("map_merge", MapMerge::build);
    }
    if version >= V2016_10_14 {
        registry = registry
            .function("repeat", Repeat::build_with_permutations)
            .function("map_replace", MapReplace::build)
            .function("equals", Equals::build)
            .function("if", If::build)
            .with_macro("not", Not::build)
            .function("and", And::build)
            .function("or", Or::build);
    }
    if version >= V2017_02_24 {
        registry = registry
            .function("filter", Filter::build)
            .function("str_replace_strict", Replace::build_strict);
    }
    if version >= V2017_09_01 {
        registry = registry
            .function("list_concat", ListConcat::build)
            .function("list_concat_unique", ListConcat::build_unique)
            .function("contains", Contains::build)
            .function("str_replace_vstrict", Replace::build_very_strict);
    }

    registry
}

pub(crate) fn hot_condition_functions(version: HotVersion) -> Registry {
    let mut registry = Registry::default();
    if version >= HotVersion::V2016_10_14 {
        registry = registry
            .function("equals", Equals::build)
            .function("get_param", GetParam::build)
            .with_macro("not", Not::build)
            .function("and", And::build)
            .function("or", Or::build);
    }
    if version >= HotVersion::V2017_09_01 {
        registry = registry.function("contains", Contains::build);
    }
    registry
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn removed_functions_keep_their_marker() {
        let registry = hot_functions(HotVersion::V2016_10_14);
        assert!(matches!(registry.get("Fn::Join"), Some(Entry::Removed(Some("list_join")))));
        assert!(!registry.contains("Fn::Join"));
        assert!(registry.contains("list_join"));
    }

    #[test]
    fn condition_functions() {
        assert_eq!(
            hot_condition_functions(HotVersion::V2017_09_01).names(),
            vec!["and", "contains", "equals", "get_param", "not", "or"]
        );
        assert!(hot_condition_functions(HotVersion::V2015_10_15)
            .names()
            .is_empty());
    }
}
