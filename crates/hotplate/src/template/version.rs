//! template format versions
use crate::error::{Error, Result};
use crate::template::registry::{self, Entry, Registry};
use crate::value::Map;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

pub const HOT_VERSION_KEY: &str = "heat_template_version";
pub const AWS_VERSION_KEY: &str = "AWSTemplateFormatVersion";
pub const HEAT_VERSION_KEY: &str = "HeatTemplateFormatVersion";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CfnVersion {
    Aws2010_09_09,
    Heat2012_12_12,
}

/// Revisions of the HOT format, oldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HotVersion {
    V2013_05_23,
    V2014_10_16,
    V2015_04_30,
    V2015_10_15,
    V2016_04_08,
    V2016_10_14,
    V2017_02_24,
    V2017_09_01,
}

impl HotVersion {
    pub const ALL: [HotVersion; 8] = [
        HotVersion::V2013_05_23,
        HotVersion::V2014_10_16,
        HotVersion::V2015_04_30,
        HotVersion::V2015_10_15,
        HotVersion::V2016_04_08,
        HotVersion::V2016_10_14,
        HotVersion::V2017_02_24,
        HotVersion::V2017_09_01,
    ];

    pub fn date(self) -> &'static str {
        match self {
            HotVersion::V2013_05_23 => "2013-05-23",
            HotVersion::V2014_10_16 => "2014-10-16",
            HotVersion::V2015_04_30 => "2015-04-30",
            HotVersion::V2015_10_15 => "2015-10-15",
            HotVersion::V2016_04_08 => "2016-04-08",
            HotVersion::V2016_10_14 => "2016-10-14",
            HotVersion::V2017_02_24 => "2017-02-24",
            HotVersion::V2017_09_01 => "2017-09-01",
        }
    }

    /// Release name accepted in place of the date
    pub fn alias(self) -> Option<&'static str> {
        match self {
            HotVersion::V2016_10_14 => Some("newton"),
            HotVersion::V2017_02_24 => Some("ocata"),
            HotVersion::V2017_09_01 => Some("pike"),
            _ => None,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|version| version.date() == text || version.alias() == Some(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    Cfn(CfnVersion),
    Hot(HotVersion),
}

impl Version {
    pub const ALL: [Version; 10] = [
        Version::Cfn(CfnVersion::Aws2010_09_09),
        Version::Cfn(CfnVersion::Heat2012_12_12),
        Version::Hot(HotVersion::V2013_05_23),
        Version::Hot(HotVersion::V2014_10_16),
        Version::Hot(HotVersion::V2015_04_30),
        Version::Hot(HotVersion::V2015_10_15),
        Version::Hot(HotVersion::V2016_04_08),
        Version::Hot(HotVersion::V2016_10_14),
        Version::Hot(HotVersion::V2017_02_24),
        Version::Hot(HotVersion::V2017_09_01),
    ];

    /// Determine the format from the version key of a template document
    pub fn detect(document: &Map) -> Result<Self> {
        let keys: Vec<_> = [HOT_VERSION_KEY, AWS_VERSION_KEY, HEAT_VERSION_KEY]
            .into_iter()
            .filter(|key| document.contains_key(*key))
            .collect();

        let key = match keys.as_slice() {
            [] => {
                return Err(Error::InvalidTemplateVersion(format!(
                    "Template format version not found (expected one of {HOT_VERSION_KEY}, {AWS_VERSION_KEY}, {HEAT_VERSION_KEY})"
                )))
            }
            [key] => *key,
            _ => {
                return Err(Error::InvalidTemplateVersion(format!(
                    "Ambiguous versions ({})",
                    keys.join(", ")
                )))
            }
        };

        let text = match &document[key] {
            crate::value::Value::String(text) => text.clone(),
            other => other.to_sorted_json(),
        };

        let version = match key {
            HOT_VERSION_KEY => HotVersion::parse(&text).map(Version::Hot),
            AWS_VERSION_KEY => {
                (text == "2010-09-09").then_some(Version::Cfn(CfnVersion::Aws2010_09_09))
            }
            _ => (text == "2012-12-12").then_some(Version::Cfn(CfnVersion::Heat2012_12_12)),
        };

        version.ok_or_else(|| {
            let supported: Vec<_> = Self::ALL.iter().map(ToString::to_string).collect();
            Error::InvalidTemplateVersion(format!(
                "\"{key}: {text}\". Should be one of: {}",
                supported.join(", ")
            ))
        })
    }

    pub fn is_hot(self) -> bool {
        matches!(self, Version::Hot(_))
    }

    /// `true` if this version is HOT and at least `minimum`
    pub fn hot_since(self, minimum: HotVersion) -> bool {
        matches!(self, Version::Hot(version) if version >= minimum)
    }

    pub fn functions(self) -> &'static Registry {
        &registries()[&self].0
    }

    pub fn condition_functions(self) -> &'static Registry {
        &registries()[&self].1
    }

    pub fn supports_conditions(self) -> bool {
        !self.is_hot() || self.hot_since(HotVersion::V2016_10_14)
    }

    /// Top level keys allowed in a template document
    pub fn sections(self) -> &'static [&'static str] {
        match self {
            Version::Cfn(_) => &[
                AWS_VERSION_KEY,
                HEAT_VERSION_KEY,
                "Description",
                "Parameters",
                "Mappings",
                "Conditions",
                "Resources",
                "Outputs",
            ],
            Version::Hot(version) if version >= HotVersion::V2016_10_14 => &[
                HOT_VERSION_KEY,
                "description",
                "parameter_groups",
                "parameters",
                "resources",
                "outputs",
                "conditions",
            ],
            Version::Hot(_) => &[
                HOT_VERSION_KEY,
                "description",
                "parameter_groups",
                "parameters",
                "resources",
                "outputs",
            ],
        }
    }

    /// Explain why `name` cannot be used here, if it is a function known to this template family
    pub(crate) fn unavailable_function(self, name: &str, in_conditions: bool) -> Option<String> {
        if in_conditions && self.functions().contains(name) {
            return Some(format!(
                "The function \"{name}\" is not supported in the conditions section of {self}"
            ));
        }

        let Version::Hot(current) = self else {
            return None;
        };

        let lookup = |version: HotVersion| {
            let version = Version::Hot(version);
            if in_conditions {
                version.condition_functions()
            } else {
                version.functions()
            }
        };

        let first = HotVersion::ALL.into_iter().find(|version| {
            matches!(
                lookup(*version).get(name),
                Some(Entry::Function(_) | Entry::Macro(_))
            )
        })?;

        if first > current {
            Some(format!(
                "The function \"{name}\" is not supported in {self}; it is available from {HOT_VERSION_KEY} {}",
                first.date()
            ))
        } else {
            Some(format!(
                "The function \"{name}\" is not supported in {self}"
            ))
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Cfn(CfnVersion::Aws2010_09_09) => write!(f, "{AWS_VERSION_KEY} 2010-09-09"),
            Version::Cfn(CfnVersion::Heat2012_12_12) => write!(f, "{HEAT_VERSION_KEY} 2012-12-12"),
            Version::Hot(version) => write!(f, "{HOT_VERSION_KEY} {}", version.date()),
        }
    }
}

fn registries() -> &'static HashMap<Version, (Registry, Registry)> {
    static REGISTRIES: OnceLock<HashMap<Version, (Registry, Registry)>> = OnceLock::new();
    REGISTRIES.get_or_init(|| {
        Version::ALL
            .into_iter()
            .map(|version| {
                let tables = match version {
                    Version::Cfn(_) => (registry::cfn_functions(), registry::cfn_condition_functions()),
                    Version::Hot(hot) => (
                        registry::hot_functions(hot),
                        registry::hot_condition_functions(hot),
                    ),
                };
                (version, tables)
            })
            .collect()
    })
}
