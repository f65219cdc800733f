//! condition functions
//!
//! Boolean operands of `and`, `or` and `if` may be booleans, names of conditions or condition functions; they are
//! evaluated through [Stack::is_enabled] so named conditions share the stack's memo.
use crate::error::{Error, Result};
use crate::function::{self, fixed_args, list_args, Call, Function};
use crate::snippet::Snippet;
use crate::stack::Stack;
use crate::template::Parser;
use crate::value::Value;
use std::sync::Arc;

fn check_condition_name(parser: &Parser<'_>, operand: &Snippet) -> Result<()> {
    match operand {
        Snippet::String(name) if !parser.template().has_condition(name) => {
            Err(Error::invalid(format!("Invalid condition \"{name}\"")))
        }
        _ => Ok(()),
    }
}

/// `equals`: `[value_1, value_2]`
#[derive(Debug)]
pub struct Equals {
    call: Call,
}

impl Equals {
    const EXAMPLE: &'static str = "[value_1, value_2]";

    pub fn build(_parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        fixed_args::<2>(&call, Self::EXAMPLE)?;
        Ok(Arc::new(Self { call }))
    }
}

impl Function for Equals {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let [left, right] = fixed_args::<2>(&self.call, Self::EXAMPLE)?;
        Ok(Value::Boolean(
            function::resolve(left, stack)? == function::resolve(right, stack)?,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

#[derive(Debug)]
struct Boolean {
    call: Call,
    connective: Connective,
}

impl Boolean {
    const EXAMPLE: &'static str = "[condition_1, condition_2, ...]";

    fn build(parser: &Parser<'_>, call: Call, connective: Connective) -> Result<Arc<dyn Function>> {
        let operands = list_args(&call, Self::EXAMPLE)?;
        if operands.len() < 2 {
            return Err(Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: {}",
                call.name,
                Self::EXAMPLE
            )));
        }
        for operand in operands {
            check_condition_name(parser, operand)?;
        }
        Ok(Arc::new(Self { call, connective }))
    }
}

impl Function for Boolean {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let short_circuit = self.connective == Connective::Or;
        for operand in list_args(&self.call, Self::EXAMPLE)? {
            if stack.is_enabled(Some(operand))? == short_circuit {
                return Ok(Value::Boolean(short_circuit));
            }
        }
        Ok(Value::Boolean(!short_circuit))
    }
}

/// `and`: true if every operand is
pub struct And;

impl And {
    pub fn build(parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Boolean::build(parser, call, Connective::And)
    }
}

/// `or`: true if any operand is
pub struct Or;

impl Or {
    pub fn build(parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        Boolean::build(parser, call, Connective::Or)
    }
}

/// `not` / `Fn::Not`
///
/// A condition name given as the operand is replaced by that condition's parsed definition, so the negation
/// carries its own copy of the definition. The CloudFormation form wraps the operand in a one-item list.
#[derive(Debug)]
pub struct Not {
    call: Call,
}

impl Not {
    pub fn build(parser: &mut Parser<'_>, name: &str, args: &Value) -> Result<Arc<dyn Function>> {
        let (operand, list_form) = match args {
            Value::Array(list) if !parser.template().version().is_hot() => match list.as_slice() {
                [operand] => (operand, true),
                _ => {
                    return Err(Error::invalid(format!(
                        "Incorrect arguments to \"{name}\" should be: [condition]"
                    )))
                }
            },
            operand => (operand, false),
        };

        let operand = match operand {
            Value::String(condition) => parser.inline_condition(condition)?,
            operand => parser.parse(operand)?,
        };
        let args = if list_form {
            Snippet::List(vec![operand])
        } else {
            operand
        };
        Ok(Arc::new(Self {
            call: Call::new(parser.stack(), name.to_string(), args),
        }))
    }

    fn operand(&self) -> Option<&Snippet> {
        match &self.call.args {
            Snippet::List(list) => list.first(),
            operand => Some(operand),
        }
    }
}

impl Function for Not {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let Some(operand) = self.operand() else {
            return Err(Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: [condition]",
                self.call.name
            )));
        };
        match function::resolve(operand, stack)? {
            Value::Boolean(value) => Ok(Value::Boolean(!value)),
            other => Err(Error::invalid(format!(
                "The condition value should be boolean, after resolved the value is: {}",
                other.short_repr()
            ))),
        }
    }
}

/// `if` / `Fn::If`: `[condition, value_if_true, value_if_false]`
///
/// Only the selected branch is resolved.
#[derive(Debug)]
pub struct If {
    call: Call,
}

impl If {
    const EXAMPLE: &'static str = "[condition, value_if_true, value_if_false]";

    pub fn build(parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        let [condition, _, _] = fixed_args::<3>(&call, Self::EXAMPLE)?;
        match condition {
            Snippet::String(_) | Snippet::Boolean(_) | Snippet::Function(_) => {
                check_condition_name(parser, condition)?
            }
            _ => {
                return Err(Error::invalid(format!(
                    "Incorrect arguments to \"{}\" should be: {}",
                    call.name,
                    Self::EXAMPLE
                )))
            }
        }
        Ok(Arc::new(Self { call }))
    }
}

impl Function for If {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let [condition, if_true, if_false] = fixed_args::<3>(&self.call, Self::EXAMPLE)?;
        if stack.is_enabled(Some(condition))? {
            function::resolve(if_true, stack)
        } else {
            function::resolve(if_false, stack)
        }
    }
}

/// `Condition`: the value of a named condition
#[derive(Debug)]
pub struct Condition {
    call: Call,
}

impl Condition {
    pub fn build(parser: &Parser<'_>, call: Call) -> Result<Arc<dyn Function>> {
        match &call.args {
            Snippet::String(_) => check_condition_name(parser, &call.args)?,
            _ => {
                return Err(Error::invalid(format!(
                    "Incorrect arguments to \"{}\" should be: condition_name",
                    call.name
                )))
            }
        }
        Ok(Arc::new(Self { call }))
    }
}

impl Function for Condition {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, stack: &Stack<'_>) -> Result<Value> {
        let Some(name) = self.call.args.as_str() else {
            return Err(Error::invalid(format!(
                "Incorrect arguments to \"{}\" should be: condition_name",
                self.call.name
            )));
        };
        stack.conditions().evaluate(name, stack).map(Value::Boolean)
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::function;
    use crate::stack::{Stack, StaticResources};
    use crate::template::Template;
    use crate::value::{Map, Value};
    use pretty_assertions::assert_eq;

    fn evaluate(template: &Template, parameters: &str, condition: &str) -> crate::error::Result<bool> {
        let parameters: Map = serde_yaml::from_str(parameters).unwrap();
        let resources = StaticResources::default();
        let stack = Stack::new("test", template, &parameters, &resources)?;
        stack.conditions().evaluate(condition, &stack)
    }

    #[test]
    fn hot_conditions() {
        let template = crate::template! {r#"
            heat_template_version: 2017-09-01
            parameters:
              env: { type: string, default: test }
              zones: { type: comma_delimited_list, default: "a,b" }
            conditions:
              prod: { equals: [{ get_param: env }, prod] }
              not_prod: { not: prod }
              zoned: { contains: [b, { get_param: zones }] }
              both: { and: [not_prod, zoned] }
              either: { or: [prod, { equals: [1, 2] }] }
        "#};
        assert!(!evaluate(&template, "{}", "prod").unwrap());
        assert!(evaluate(&template, "{}", "not_prod").unwrap());
        assert!(evaluate(&template, "{}", "both").unwrap());
        assert!(!evaluate(&template, "{}", "either").unwrap());
        assert!(evaluate(&template, "{ env: prod }", "either").unwrap());
        assert!(!evaluate(&template, "{ env: prod }", "both").unwrap());
    }

    #[test]
    fn cfn_conditions() {
        let template = crate::template! {r#"
            AWSTemplateFormatVersion: 2010-09-09
            Parameters:
              Env: { Type: String, Default: prod }
            Conditions:
              Prod: { "Fn::Equals": [{ Ref: Env }, prod] }
              Dev: { "Fn::Not": [{ Condition: Prod }] }
              Named: { "Fn::Not": [Prod] }
            Outputs:
              Size:
                Value: { "Fn::If": [Prod, large, small] }
        "#};
        assert!(evaluate(&template, "{}", "Prod").unwrap());
        assert!(!evaluate(&template, "{}", "Dev").unwrap());
        assert!(!evaluate(&template, "{}", "Named").unwrap());

        let resources = StaticResources::default();
        let parameters: Map = serde_yaml::from_str("{ Env: dev }").unwrap();
        let stack = Stack::new("test", &template, &parameters, &resources).unwrap();
        let outputs = stack.outputs().unwrap();
        assert_eq!(outputs["Size"].resolve(&stack).unwrap(), Value::from("small"));
    }

    #[test]
    fn and_needs_two_operands() {
        let template: Template = "heat_template_version: 2016-10-14\nconditions:\n  a: { and: [true] }\n"
            .parse()
            .unwrap();
        let resources = StaticResources::default();
        let error = Stack::new("test", &template, &Map::new(), &resources)
            .err()
            .unwrap()
            .to_string();
        assert!(error.starts_with("conditions.a.and: "), "{error}");
    }

    #[test]
    fn unknown_condition_name() {
        let template: Template = r#"
heat_template_version: 2016-10-14
conditions:
  a: { not: missing }
"#
        .parse()
        .unwrap();
        let resources = StaticResources::default();
        assert!(Stack::new("test", &template, &Map::new(), &resources).is_err());
    }

    #[test]
    fn not_requires_a_boolean() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            parameters:
              flag: { type: string, default: "yes" }
            conditions:
              odd: { not: { get_param: flag } }
        "#};
        assert!(matches!(
            evaluate(&template, "{}", "odd"),
            Err(Error::InvalidTemplate(message)) if message.contains("should be boolean")
        ));
    }

    #[test]
    fn not_inlines_named_conditions() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            conditions:
              base: { equals: [a, a] }
              negated: { not: base }
              twice: { not: { not: base } }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let snippet = template
            .parse_snippet(stack.id(), &serde_yaml::from_str("{ if: [negated, x, y] }").unwrap())
            .unwrap();
        assert_eq!(function::resolve(&snippet, &stack).unwrap(), Value::from("y"));
        assert!(stack.conditions().evaluate("twice", &stack).unwrap());
    }

    #[test]
    fn not_renders_the_inlined_condition() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            conditions:
              base: { equals: [a, a] }
        "#};
        let id = crate::stack::StackId::next();
        let snippet = template
            .parse_snippet(id, &serde_yaml::from_str("{ not: base }").unwrap())
            .unwrap();
        let rewritten: Value = serde_yaml::from_str("{ not: { equals: [a, a] } }").unwrap();
        assert_eq!(snippet.to_canonical_json(), rewritten);
        assert_eq!(
            template.parse_snippet(id, &rewritten).unwrap().to_canonical_json(),
            rewritten
        );
    }

    #[test]
    fn canonical_form_round_trips() {
        let template = crate::template! {r#"
            heat_template_version: 2016-10-14
            conditions:
              base: true
        "#};
        let raw: Value = serde_yaml::from_str(
            "{ if: [base, { not: { equals: [1, 2] } }, { and: [base, { or: [base, false] }] }] }",
        )
        .unwrap();
        let id = crate::stack::StackId::next();
        let snippet = template.parse_snippet(id, &raw).unwrap();
        assert_eq!(snippet.to_canonical_json(), raw);
        let reparsed = template
            .parse_snippet(id, &snippet.to_canonical_json())
            .unwrap();
        assert_eq!(reparsed.to_canonical_json(), raw);
    }
}
