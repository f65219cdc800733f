//! # hotplate - orchestration template resolution
//!
//! Parses CloudFormation-style and HOT (Heat Orchestration Template) documents, resolves their intrinsic
//! functions, evaluates conditions, extracts dependencies between resources and applies property translation
//! rules.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `hotplate` works internally.
//!
//! ### Templates and versions
//!
//! A [template::Template] is a YAML or JSON document. Its version key (`heat_template_version`,
//! `AWSTemplateFormatVersion` or `HeatTemplateFormatVersion`) selects a [template::Version], and with it the
//! allowed top-level sections, the keys of a resource definition and the intrinsic functions that exist.
//!
//! ```yaml
//! heat_template_version: 2016-10-14
//! parameters:
//!   flavor: { type: string, default: m1.small }
//! conditions:
//!   large: { equals: [{ get_param: flavor }, m1.large] }
//! resources:
//!   server:
//!     type: OS::Nova::Server
//!     properties:
//!       flavor: { get_param: flavor }
//!   volume:
//!     type: OS::Cinder::Volume
//!     condition: large
//! outputs:
//!   address: { value: { get_attr: [server, first_address] } }
//! ```
//!
//! ### Snippets and functions
//!
//! Raw values ([value::Value]) are parsed into [snippet::Snippet]s by [template::Parser]. Any single-key map
//! whose key names a function of the template's version becomes a function node, everything else stays data.
//!
//! | **raw**                                  | **snippet**                               |
//! |------------------------------------------|-------------------------------------------|
//! | `{ get_param: flavor }`                  | `Function(GetParam)`                      |
//! | `{ list_join: [',', [a, b]] }`           | `Function(Join)` with parsed arguments    |
//! | `{ not_a_function: 1 }`                  | `Map`                                     |
//! | `{ "Fn::Join": ... }` in HOT 2015-04-30  | `Function(Unavailable)`, fails validation |
//!
//! Every function implements [function::Function]. The walkers in [function] ([function::resolve],
//! [function::validate], [function::dependencies], [function::dep_attrs]) visit a snippet tree and dispatch to
//! the function nodes. Dependency extraction never resolves anything.
//!
//! Functions remember the [stack::StackId] they were parsed for. Evaluating them against another stack is an
//! [Error::Invariant].
//!
//! ### Stacks
//!
//! A [stack::Stack] is one generation of a template: user parameters, the live resources (anything that
//! implements [stack::ResourceContainer]) and the template's [conditions::Conditions]. Conditions are evaluated
//! lazily and memoized per stack.
//!
//! ### Resource definitions
//!
//! [definition::ResourceDefinition] bundles the parsed type, properties, metadata, dependencies and policies
//! of one resource. Definitions compare and hash by their canonical rendering, can be frozen into fully
//! resolved copies and diffed against each other.
//!
//! ### Translation
//!
//! [translation::Translation] applies declarative rules while properties are read through
//! [properties::Properties]. See the module documentation for the order in which rules run.
//!
//! ### Example
//!
//! ```
//! use hotplate::stack::{Stack, StaticResources};
//! use hotplate::value::{Map, Value};
//!
//! let template = hotplate::template! {r#"
//!     heat_template_version: 2016-10-14
//!     parameters:
//!       name: { type: string, default: web }
//!     outputs:
//!       greeting:
//!         value: { str_replace: { template: "hello $name", params: { $name: { get_param: name } } } }
//! "#};
//!
//! let resources = StaticResources::default();
//! let stack = Stack::new("demo", &template, &Map::new(), &resources)?;
//! let outputs = stack.outputs()?;
//! assert_eq!(outputs["greeting"].resolve(&stack)?, Value::from("hello web"));
//! # Ok::<(), hotplate::Error>(())
//! ```
pub mod conditions;
pub mod definition;
pub mod error;
pub mod function;
pub mod output;
pub mod properties;
pub mod snippet;
pub mod stack;
pub mod template;
pub mod translation;
#[doc(hidden)]
pub mod util;
pub mod value;

pub use error::{Error, Result};

/// Build a [template::Template] from inline YAML, panicking if it does not parse
///
/// Indentation shared by all lines is removed first.
///
/// ```
/// let template = hotplate::template! {r#"
///     heat_template_version: 2013-05-23
///     resources: {}
/// "#};
/// assert!(template.version().is_hot());
/// ```
#[macro_export]
macro_rules! template {
    { $expr:expr } => {
        <$crate::template::Template as ::std::str::FromStr>::from_str(&$crate::util::dedent($expr))
            .expect("template must parse")
    };
}
