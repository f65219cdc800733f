//! references to parameters, resources, attributes, mappings and files
use crate::error::{Error, Result};
use crate::function::{
    self, fixed_args, list_args, AttrNames, AttrRefs, Call, Dependencies, Dependency, Function,
};
use crate::snippet::Snippet;
use crate::stack::Stack;
use crate::template::Parser;
use crate::value::Value;
use std::sync::Arc;

/// `Ref`: a resource when the name is a resource of the template, a parameter otherwise
///
/// Inside the conditions section `Ref` always reads a parameter.
pub fn build_ref(parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
    match &call.args {
        Snippet::String(name) if !parser.in_conditions() && parser.template().has_resource(name) => {
            GetResource::build(parser, call)
        }
        _ => GetParam::build(parser, call),
    }
}

/// `get_param` / parameter `Ref`
///
/// Accepts a parameter name, or a list of a name followed by a path into the parameter value. Path components
/// that do not exist resolve to an empty string.
#[derive(Debug)]
pub struct GetParam {
    call: Call,
}

impl GetParam {
    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        match &call.args {
            Snippet::List(list) if list.is_empty() => Err(Error::invalid(format!(
                "Function \"{}\" must have arguments",
                call.name
            ))),
            Snippet::Map(_) | Snippet::Null => Err(Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: {{\"{}\": name}} or {{\"{}\": [name, path, ...]}}",
                call.name, call.name, call.name
            ))),
            _ => Ok(Arc::new(Self { call })),
        }
    }
}

impl Function for GetParam {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let args = function::resolve(&self.call.args, stack)?;
        let (name, path) = match &args {
            Value::Array(list) => match list.split_first() {
                Some((name, path)) => (name, path),
                None => return Err(Error::invalid("Function \"get_param\" must have arguments")),
            },
            name => (name, &[][..]),
        };
        let Value::String(name) = name else {
            return Err(Error::invalid(format!(
                "Parameter name in \"{}\" must be a string",
                self.call.name
            )));
        };

        let value = stack.parameters().value(name)?;
        if path.is_empty() {
            return Ok(value);
        }
        Ok(value
            .select(path)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())))
    }

    fn validate(&self, stack: &Stack<'_>) -> Result<()> {
        function::validate(&self.call.args, stack, &Default::default())?;
        let name = match &self.call.args {
            Snippet::String(name) => Some(name),
            Snippet::List(list) => match list.first() {
                Some(Snippet::String(name)) => Some(name),
                _ => None,
            },
            _ => None,
        };
        match name {
            Some(name) if !stack.parameters().is_declared(name) => {
                Err(Error::UnknownParameter(name.clone()))
            }
            _ => Ok(()),
        }
    }

    fn is_parameter_reference(&self) -> bool {
        true
    }
}

/// `get_resource` / resource `Ref`: the reference id of a resource
#[derive(Debug)]
pub struct GetResource {
    call: Call,
    resource: String,
}

impl GetResource {
    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        let Snippet::String(resource) = &call.args else {
            return Err(Error::invalid(format!(
                "Argument to \"{}\" must be a resource name",
                call.name
            )));
        };
        Ok(Arc::new(Self {
            resource: resource.clone(),
            call,
        }))
    }
}

impl Function for GetResource {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        Ok(stack
            .resources()
            .get(&self.resource)
            .map(|resource| resource.ref_id())
            .unwrap_or_default())
    }

    fn validate(&self, stack: &Stack<'_>) -> Result<()> {
        if !stack.template().has_resource(&self.resource) {
            return Err(Error::InvalidTemplateReference {
                resource: self.resource.clone(),
                key: self.call.name.clone(),
            });
        }
        Ok(())
    }

    fn dependencies(&self, path: String) -> Dependencies<'_> {
        Box::new(std::iter::once(Dependency {
            resource: self.resource.clone(),
            path,
        }))
    }
}

/// `get_attr` / `Fn::GetAtt`: an attribute of a resource, optionally followed by a path into its value
#[derive(Debug)]
pub struct GetAtt {
    call: Call,
    resource: String,
}

impl GetAtt {
    /// `[resource, attribute]` or `"resource.attribute"`
    pub fn build_cfn(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        const EXAMPLE: &str = "[resource_name, attribute]";
        if let Snippet::String(dotted) = &call.args {
            let Some((resource, attribute)) = dotted.split_once('.') else {
                return Err(Error::invalid(format!(
                    "Incorrect arguments to \"{}\" should be: {EXAMPLE}",
                    call.name
                )));
            };
            let args = Snippet::List(vec![resource.into(), attribute.into()]);
            return Self::from_args(Call::new(call.stack, call.name, args), EXAMPLE);
        }
        fixed_args::<2>(&call, EXAMPLE)?;
        Self::from_args(call, EXAMPLE)
    }

    /// `[resource, attribute, path...]`
    pub fn build_hot(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Self::from_args(call, "[resource_name, attribute, (path), ...]")
    }

    fn from_args(call: Call, example: &str) -> Result<Arc<dyn Function>> {
        let args = list_args(&call, example)?;
        let resource = match args {
            [Snippet::String(resource), _attribute, ..] => resource.clone(),
            _ => {
                return Err(Error::invalid(format!(
                    "Arguments to \"{}\" must be of the form {example}",
                    call.name
                )))
            }
        };
        Ok(Arc::new(Self { call, resource }))
    }

    fn args(&self) -> &[Snippet] {
        match &self.call.args {
            Snippet::List(list) => list,
            _ => &[],
        }
    }

    fn attribute(&self) -> Option<&Snippet> {
        self.args().get(1)
    }

    fn path(&self) -> &[Snippet] {
        self.args().get(2..).unwrap_or_default()
    }
}

impl Function for GetAtt {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let Some(resource) = stack.resources().get(&self.resource) else {
            return Ok(Value::Null);
        };
        if !resource.attributes_available() {
            return Ok(Value::Null);
        }

        let attribute = match self.attribute().map(|a| function::resolve(a, stack)).transpose()? {
            Some(Value::String(attribute)) => attribute,
            other => {
                return Err(Error::invalid(format!(
                    "Attribute name in \"{}\" must be a string, not {}",
                    self.call.name,
                    other.unwrap_or_default().short_repr()
                )))
            }
        };
        let path = self
            .path()
            .iter()
            .map(|component| function::resolve(component, stack))
            .collect::<Result<Vec<_>>>()?;

        resource.attribute_path(&attribute, &path)
    }

    fn validate(&self, stack: &Stack<'_>) -> Result<()> {
        function::validate(&self.call.args, stack, &Default::default())?;
        if !stack.template().has_resource(&self.resource) {
            return Err(Error::InvalidTemplateReference {
                resource: self.resource.clone(),
                key: self.call.name.clone(),
            });
        }
        if let (Some(resource), Some(Snippet::String(attribute))) =
            (stack.resources().get(&self.resource), self.attribute())
        {
            if !resource.has_attribute(attribute) {
                return Err(Error::InvalidTemplateAttribute {
                    resource: self.resource.clone(),
                    key: attribute.clone(),
                });
            }
        }
        Ok(())
    }

    fn dependencies(&self, path: String) -> Dependencies<'_> {
        let own = Dependency {
            resource: self.resource.clone(),
            path: path.clone(),
        };
        Box::new(function::dependencies(&self.call.args, path).chain(std::iter::once(own)))
    }

    fn dep_attrs<'a>(&'a self, resource_name: &'a str) -> AttrNames<'a> {
        let own = match self.attribute() {
            Some(Snippet::String(attribute)) if self.resource == resource_name => {
                Some(attribute.clone())
            }
            _ => None,
        };
        Box::new(function::dep_attrs(&self.call.args, resource_name).chain(own))
    }

    fn all_dep_attrs(&self) -> AttrRefs<'_> {
        let own = match self.attribute() {
            Some(Snippet::String(attribute)) => Some((self.resource.clone(), attribute.clone())),
            _ => None,
        };
        Box::new(function::all_dep_attrs(&self.call.args).chain(own))
    }
}

/// `get_file`: contents of a file shipped with the template
#[derive(Debug)]
pub struct GetFile {
    call: Call,
}

impl GetFile {
    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        if !matches!(call.args, Snippet::String(_)) {
            return Err(Error::invalid(format!(
                "Argument to \"{}\" must be a string",
                call.name
            )));
        }
        Ok(Arc::new(Self { call }))
    }

    fn file_name(&self) -> &str {
        self.call.args.as_str().unwrap_or_default()
    }
}

impl Function for GetFile {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        stack
            .template()
            .file(self.file_name())
            .map(Value::from)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "No content found in the \"files\" section for {} path: {}",
                    self.call.name,
                    self.file_name()
                ))
            })
    }

    fn validate(&self, stack: &Stack<'_>) -> Result<()> {
        self.result(stack).map(|_| ())
    }
}

/// `Fn::FindInMap`: `[mapping, key, value]` looked up in the `Mappings` section
#[derive(Debug)]
pub struct FindInMap {
    call: Call,
}

impl FindInMap {
    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<3>(&call, "[map_name, key, value]")?;
        Ok(Arc::new(Self { call }))
    }
}

impl Function for FindInMap {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let [mapping, key, value] = fixed_args::<3>(&self.call, "[map_name, key, value]")?;
        let mut names = Vec::with_capacity(3);
        for argument in [mapping, key, value] {
            match function::resolve(argument, stack)? {
                Value::String(name) => names.push(name),
                other => {
                    return Err(Error::invalid(format!(
                        "Arguments to \"{}\" must be strings, not {}",
                        self.call.name,
                        other.short_repr()
                    )))
                }
            }
        }

        let Some(map) = stack.template().mapping(&names[0]) else {
            return Err(Error::invalid(format!(
                "Mapping \"{}\" does not exist",
                names[0]
            )));
        };
        let path = [Value::String(names[1].clone()), Value::String(names[2].clone())];
        map.select(&path).cloned().ok_or_else(|| {
            Error::invalid(format!(
                "Mapping \"{}\" has no entry \"{}\".\"{}\"",
                names[0], names[1], names[2]
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FacadeField {
    Metadata,
    DeletionPolicy,
    UpdatePolicy,
}

/// `resource_facade`: a field of the resource a nested stack implements
#[derive(Debug)]
pub struct ResourceFacade {
    call: Call,
    field: FacadeField,
}

impl ResourceFacade {
    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        let field = match call.args.as_str() {
            Some("metadata" | "Metadata") => FacadeField::Metadata,
            Some("deletion_policy" | "DeletionPolicy") => FacadeField::DeletionPolicy,
            Some("update_policy" | "UpdatePolicy") => FacadeField::UpdatePolicy,
            _ => {
                return Err(Error::invalid(format!(
                    "Incorrect arguments to \"{}\" should be one of: metadata, deletion_policy, update_policy",
                    call.name
                )))
            }
        };
        Ok(Arc::new(Self { call, field }))
    }
}

impl Function for ResourceFacade {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let Some(parent) = stack.parent() else {
            return Err(Error::invalid(format!(
                "\"{}\" can only be used in a template that implements a resource",
                self.call.name
            )));
        };
        Ok(match self.field {
            FacadeField::Metadata => parent
                .metadata()
                .map(Snippet::to_canonical_json)
                .unwrap_or_else(|| Value::Object(Default::default())),
            FacadeField::DeletionPolicy => parent.deletion_policy().as_str().into(),
            FacadeField::UpdatePolicy => parent
                .update_policy()
                .map(Snippet::to_canonical_json)
                .unwrap_or_else(|| Value::Object(Default::default())),
        })
    }
}

#[cfg(test)]
mod test {
    use crate::definition::{Overrides, ResourceDefinition, DeletionPolicy};
    use crate::error::Error;
    use crate::function;
    use crate::stack::{Stack, StaticResource, StaticResources};
    use crate::value::{Map, Value};
    use pretty_assertions::assert_eq;

    fn value(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn ref_dispatch() {
        let template = crate::template! {r#"
            AWSTemplateFormatVersion: 2010-09-09
            Parameters:
              Flavor: { Type: String, Default: m1.small }
            Resources:
              Server: { Type: "OS::Nova::Server" }
        "#};
        let mut resources = StaticResources::default();
        resources.insert(StaticResource::new("Server".into(), "5e1c".into()));
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();

        let snippet = template
            .parse_snippet(stack.id(), &value("[{ Ref: Server }, { Ref: Flavor }, { Ref: 'AWS::StackName' }]"))
            .unwrap();
        assert_eq!(
            function::resolve(&snippet, &stack).unwrap(),
            value("[5e1c, m1.small, test]")
        );
        let dependencies: Vec<_> = function::dependencies(&snippet, String::new())
            .map(|dependency| dependency.resource)
            .collect();
        assert_eq!(dependencies, vec!["Server"]);
    }

    #[test]
    fn get_param_path() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
            parameters:
              config: { type: json, default: { servers: [{ name: a }, { name: b }] } }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template
            .parse_snippet(
                stack.id(),
                &value("[{ get_param: [config, servers, 1, name] }, { get_param: [config, missing, 0] }]"),
            )
            .unwrap();
        assert_eq!(function::resolve(&snippet, &stack).unwrap(), value("[b, '']"));
    }

    #[test]
    fn get_param_unknown_fails_validation() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
            outputs:
              out: { value: { get_param: nope } }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        assert_eq!(
            stack.validate().unwrap_err().to_string(),
            "outputs.out.value.get_param: The Parameter (nope) was not defined in template."
        );
    }

    #[test]
    fn get_attr_before_attributes_exist() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
            resources:
              server: { type: OS::Nova::Server }
        "#};
        let mut resources = StaticResources::default();
        resources.insert(
            StaticResource::new("server".into(), "abc".into())
                .with_attribute("networks", value("{ private: [10.0.0.4] }"))
                .pending(),
        );
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template
            .parse_snippet(stack.id(), &value("{ get_attr: [server, networks, private, 0] }"))
            .unwrap();
        assert_eq!(function::resolve(&snippet, &stack).unwrap(), Value::Null);
    }

    #[test]
    fn get_attr_path_and_dep_attrs() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
            resources:
              server: { type: OS::Nova::Server }
        "#};
        let mut resources = StaticResources::default();
        resources.insert(
            StaticResource::new("server".into(), "abc".into())
                .with_attribute("networks", value("{ private: [10.0.0.4] }")),
        );
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template
            .parse_snippet(
                stack.id(),
                &value("[{ get_attr: [server, networks, private, 0] }, { get_attr: [server, networks, public, 0] }]"),
            )
            .unwrap();
        assert_eq!(
            function::resolve(&snippet, &stack).unwrap(),
            value("['10.0.0.4', null]")
        );
        let attributes: Vec<_> = function::dep_attrs(&snippet, "server").collect();
        assert_eq!(attributes, vec!["networks", "networks"]);
        assert_eq!(function::dep_attrs(&snippet, "other").count(), 0);
    }

    #[test]
    fn get_attr_unknown_attribute() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
            resources:
              server: { type: OS::Nova::Server }
            outputs:
              out: { value: { get_attr: [server, nope] } }
        "#};
        let mut resources = StaticResources::default();
        resources.insert(StaticResource::new("server".into(), "abc".into()));
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let outputs = stack.outputs().unwrap();
        let error = outputs["out"].validate(&stack).unwrap_err();
        assert_eq!(
            error,
            Error::InvalidTemplateAttribute {
                resource: "server".into(),
                key: "nope".into()
            }
            .at(&crate::error::Breadcrumb::root("outputs").key("out").key("value").key("get_attr"))
        );
    }

    #[test]
    fn cfn_get_att_dotted() {
        let template = crate::template! {r#"
            AWSTemplateFormatVersion: 2010-09-09
            Resources:
              Server: { Type: "OS::Nova::Server" }
        "#};
        let mut resources = StaticResources::default();
        resources.insert(StaticResource::new("Server".into(), "abc".into()).with_attribute("PublicIp", "1.2.3.4"));
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template
            .parse_snippet(stack.id(), &value("{ 'Fn::GetAtt': Server.PublicIp }"))
            .unwrap();
        assert_eq!(function::resolve(&snippet, &stack).unwrap(), Value::from("1.2.3.4"));
        assert_eq!(
            snippet.to_canonical_json(),
            value("{ 'Fn::GetAtt': [Server, PublicIp] }")
        );
    }

    #[test]
    fn find_in_map() {
        let template = crate::template! {r#"
            AWSTemplateFormatVersion: 2010-09-09
            Mappings:
              Sizes:
                small: { Flavor: m1.small }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template
            .parse_snippet(stack.id(), &value("{ 'Fn::FindInMap': [Sizes, small, Flavor] }"))
            .unwrap();
        assert_eq!(function::resolve(&snippet, &stack).unwrap(), Value::from("m1.small"));

        let missing = template
            .parse_snippet(stack.id(), &value("{ 'Fn::FindInMap': [Sizes, large, Flavor] }"))
            .unwrap();
        assert!(function::resolve(&missing, &stack).is_err());
    }

    #[test]
    fn get_file() {
        let template = crate::template!(
            r#"
            heat_template_version: 2015-04-30
        "#
        );
        let template =
            template.with_files([("setup.sh".to_string(), "#!/bin/sh\n".to_string())].into());
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();

        let found = template
            .parse_snippet(stack.id(), &value("{ get_file: setup.sh }"))
            .unwrap();
        assert_eq!(function::resolve(&found, &stack).unwrap(), Value::from("#!/bin/sh\n"));

        let missing = template
            .parse_snippet(stack.id(), &value("{ get_file: missing.sh }"))
            .unwrap();
        assert!(function::resolve(&missing, &stack).is_err());
    }

    #[test]
    fn resource_facade() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
        "#};
        let resources = StaticResources::default();
        let parent = ResourceDefinition::new("nested".into(), "My::Nested".into())
            .with_metadata(value("{ role: web }"))
            .with_deletion_policy(DeletionPolicy::Snapshot);
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let parent = parent.freeze(&stack, Overrides::default()).unwrap().into_owned();
        let stack = Stack::new("nested", &template, &Map::new(), &resources)
            .unwrap()
            .with_parent(parent);

        let snippet = template
            .parse_snippet(
                stack.id(),
                &value("[{ resource_facade: metadata }, { resource_facade: deletion_policy }, { resource_facade: update_policy }]"),
            )
            .unwrap();
        assert_eq!(
            function::resolve(&snippet, &stack).unwrap(),
            value("[{ role: web }, Snapshot, {}]")
        );
        assert!(template
            .parse_snippet(stack.id(), &value("{ resource_facade: type }"))
            .is_err());
    }
}
