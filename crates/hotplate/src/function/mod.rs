//! intrinsic function framework
//!
//! Every intrinsic function implements [Function]. A function is constructed once, during parsing, from its
//! [Call]: the stack generation it was parsed for, the name it was invoked with and its parsed arguments.
//!
//! The free functions in this module walk a [Snippet] and dispatch to the function nodes they find:
//!
//! | walker             | function node        | map / list               | scalar           |
//! |--------------------|----------------------|--------------------------|------------------|
//! | [resolve]          | [Function::result]   | resolve every value      | value unchanged  |
//! | [validate]         | [Function::validate] | validate every value     | nothing to check |
//! | [dependencies]     | [Function::dependencies] | chain all values     | nothing          |
//! | [dep_attrs]        | [Function::dep_attrs]    | chain all values     | nothing          |
//!
//! Dependency extraction never resolves anything.
use crate::error::{Breadcrumb, Error, Result};
use crate::snippet::Snippet;
use crate::stack::{Stack, StackId};
use crate::value::Value;
use std::fmt;

pub mod collection;
pub mod condition;
pub mod reference;
pub mod removed;
pub mod string;

/// Name, arguments and owning stack generation of a function invocation
#[derive(Debug, Clone, derive_new::new)]
pub struct Call {
    pub stack: StackId,
    pub name: String,
    pub args: Snippet,
}

impl Call {
    /// Fails with [Error::Invariant] when `stack` is not the generation this call was parsed for
    pub fn check_stack(&self, stack: &Stack<'_>) -> Result<()> {
        if self.stack != stack.id() {
            return Err(Error::Invariant(format!(
                "function \"{}\" belongs to stack {} but was evaluated in stack {}",
                self.name,
                self.stack,
                stack.id()
            )));
        }
        Ok(())
    }
}

/// A resource referenced by a snippet, and where it was referenced
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dependency {
    pub resource: String,
    pub path: String,
}

pub type Dependencies<'a> = Box<dyn Iterator<Item = Dependency> + 'a>;
pub type AttrNames<'a> = Box<dyn Iterator<Item = String> + 'a>;
pub type AttrRefs<'a> = Box<dyn Iterator<Item = (String, String)> + 'a>;

pub trait Function: fmt::Debug + Send + Sync {
    fn call(&self) -> &Call;

    fn name(&self) -> &str {
        &self.call().name
    }

    /// Compute the plain value of this function, resolving its arguments first
    fn result(&self, stack: &Stack<'_>) -> Result<Value>;

    /// Check the arguments without resolving the function itself
    fn validate(&self, stack: &Stack<'_>) -> Result<()> {
        validate(&self.call().args, stack, &Breadcrumb::default())
    }

    /// Resources that must exist before this function can be resolved
    fn dependencies(&self, path: String) -> Dependencies<'_> {
        dependencies(&self.call().args, path)
    }

    /// Attributes of `resource_name` this function reads
    fn dep_attrs<'a>(&'a self, resource_name: &'a str) -> AttrNames<'a> {
        dep_attrs(&self.call().args, resource_name)
    }

    /// `(resource, attribute)` pairs this function reads
    fn all_dep_attrs(&self) -> AttrRefs<'_> {
        all_dep_attrs(&self.call().args)
    }

    fn to_canonical_json(&self) -> Value {
        let call = self.call();
        Value::Object([(call.name.clone(), call.args.to_canonical_json())].into_iter().collect())
    }

    /// `true` for functions that read a template parameter
    fn is_parameter_reference(&self) -> bool {
        false
    }
}

/// Resolve all functions in `snippet`
pub fn resolve(snippet: &Snippet, stack: &Stack<'_>) -> Result<Value> {
    match snippet {
        Snippet::Function(function) => {
            function.call().check_stack(stack)?;
            function.result(stack)
        }
        Snippet::Map(map) => map
            .iter()
            .map(|(key, value)| Ok((key.clone(), resolve(value, stack)?)))
            .collect::<Result<_>>()
            .map(Value::Object),
        Snippet::List(list) => list
            .iter()
            .map(|value| resolve(value, stack))
            .collect::<Result<_>>()
            .map(Value::Array),
        scalar => Ok(scalar.to_canonical_json()),
    }
}

/// Validate all functions in `snippet`
///
/// Errors are reported with the breadcrumb to the failing function.
pub fn validate(snippet: &Snippet, stack: &Stack<'_>, path: &Breadcrumb) -> Result<()> {
    match snippet {
        Snippet::Function(function) => {
            function.call().check_stack(stack)?;
            let path = path.key(function.name());
            function.validate(stack).map_err(|error| error.at(&path))
        }
        Snippet::Map(map) => map
            .iter()
            .try_for_each(|(key, value)| validate(value, stack, &path.key(key))),
        Snippet::List(list) => list
            .iter()
            .enumerate()
            .try_for_each(|(index, value)| validate(value, stack, &path.index(index))),
        _ => Ok(()),
    }
}

pub(crate) fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Resources referenced anywhere in `snippet`
pub fn dependencies(snippet: &Snippet, path: String) -> Dependencies<'_> {
    match snippet {
        Snippet::Function(function) => function.dependencies(join_path(&path, function.name())),
        Snippet::Map(map) => Box::new(
            map.iter()
                .flat_map(move |(key, value)| dependencies(value, join_path(&path, key))),
        ),
        Snippet::List(list) => Box::new(
            list.iter()
                .enumerate()
                .flat_map(move |(index, value)| dependencies(value, format!("{path}[{index}]"))),
        ),
        _ => Box::new(std::iter::empty()),
    }
}

/// Attributes of `resource_name` read anywhere in `snippet`
pub fn dep_attrs<'a>(snippet: &'a Snippet, resource_name: &'a str) -> AttrNames<'a> {
    match snippet {
        Snippet::Function(function) => function.dep_attrs(resource_name),
        Snippet::Map(map) => Box::new(
            map.values()
                .flat_map(move |value| dep_attrs(value, resource_name)),
        ),
        Snippet::List(list) => Box::new(
            list.iter()
                .flat_map(move |value| dep_attrs(value, resource_name)),
        ),
        _ => Box::new(std::iter::empty()),
    }
}

/// All `(resource, attribute)` pairs read anywhere in `snippet`
pub fn all_dep_attrs(snippet: &Snippet) -> AttrRefs<'_> {
    match snippet {
        Snippet::Function(function) => function.all_dep_attrs(),
        Snippet::Map(map) => Box::new(map.values().flat_map(all_dep_attrs)),
        Snippet::List(list) => Box::new(list.iter().flat_map(all_dep_attrs)),
        _ => Box::new(std::iter::empty()),
    }
}

/// Ensure a parsed argument is a list, reporting the expected form otherwise
pub(crate) fn list_args<'a>(call: &'a Call, example: &str) -> Result<&'a [Snippet]> {
    match &call.args {
        Snippet::List(list) => Ok(list),
        _ => Err(Error::invalid(format!(
            "Incorrect arguments to \"{}\" should be: {example}",
            call.name
        ))),
    }
}

/// Ensure a parsed argument is a list of exactly `N` items
pub(crate) fn fixed_args<'a, const N: usize>(
    call: &'a Call,
    example: &str,
) -> Result<&'a [Snippet; N]> {
    list_args(call, example)?.try_into().map_err(|_| {
        Error::invalid(format!(
            "Incorrect arguments to \"{}\" should be: {example}",
            call.name
        ))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::function::string::Join;
    use crate::stack::StaticResources;
    use crate::template::Parser;
    use crate::value::Map;

    #[test]
    fn foreign_stack_is_an_invariant_error() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            parameters:
              name: { type: string, default: web }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let foreign = template
            .parse_snippet(StackId::next(), &serde_yaml::from_str("{ get_param: name }").unwrap())
            .unwrap();

        let nested = Snippet::Map([("names".to_string(), Snippet::List(vec![foreign.clone()]))].into_iter().collect());
        let error = validate(&nested, &stack, &Breadcrumb::root("outputs")).unwrap_err();
        assert!(matches!(error, Error::Invariant(_)), "{error}");

        // a function of the right generation does not wrap the error of a foreign argument
        let call = Call::new(
            stack.id(),
            "list_join".into(),
            Snippet::List(vec![Snippet::String(",".into()), Snippet::List(vec![foreign])]),
        );
        let join = Snippet::Function(Join::build_multiple(&Parser::new(&template, stack.id()), call).unwrap());
        let error = validate(&join, &stack, &Breadcrumb::root("outputs")).unwrap_err();
        assert!(matches!(error, Error::Invariant(_)), "{error}");
        assert!(matches!(resolve(&join, &stack).unwrap_err(), Error::Invariant(_)));
    }
}
