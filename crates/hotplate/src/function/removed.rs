//! markers for functions that cannot be used in a template's version
use crate::error::{Error, Result};
use crate::function::{Call, Function};
use crate::stack::Stack;
use crate::value::Value;

/// Stands in for a function the template's version does not offer
///
/// Parsing succeeds so that the rest of the template can still be inspected; validation and resolution fail with
/// [Error::UnsupportedFunction].
#[derive(Debug, derive_new::new)]
pub struct Unavailable {
    call: Call,
    message: String,
}

impl Function for Unavailable {
    fn call(&self) -> &Call {
        &self.call
    }

    fn result(&self, _stack: &Stack<'_>) -> Result<Value> {
        Err(Error::UnsupportedFunction(self.message.clone()))
    }

    fn validate(&self, _stack: &Stack<'_>) -> Result<()> {
        Err(Error::UnsupportedFunction(self.message.clone()))
    }
}

#[cfg(test)]
mod test {
    use crate::stack::{Stack, StaticResources};
    use crate::value::Map;
    use pretty_assertions::assert_eq;

    #[test]
    fn removed_function_fails_validation() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
            outputs:
              joined: { value: { "Fn::Join": [",", [a, b]] } }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        assert_eq!(
            stack.validate().unwrap_err().to_string(),
            "outputs.joined.value.Fn::Join: The function \"Fn::Join\" is not supported in heat_template_version 2015-04-30. Use \"list_join\" instead."
        );
    }

    #[test]
    fn newer_function_fails_validation() {
        let template = crate::template! {r#"
            heat_template_version: 2015-04-30
            outputs:
              merged: { value: { map_merge: [{ a: 1 }, { b: 2 }] } }
        "#};
        let resources = StaticResources::default();
        let stack = Stack::new("test", &template, &Map::new(), &resources).unwrap();
        let error = stack.validate().unwrap_err().to_string();
        assert!(
            error.ends_with("it is available from heat_template_version 2016-04-08"),
            "{error}"
        );
    }
}
