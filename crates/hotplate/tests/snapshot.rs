//! Snapshot tests
//!
//! Loads each *.yaml template in /tests/templates/ individually, together with the resource state of the same
//! name in /tests/state/ if there is one, and compares the resolved resources and outputs. Templates that fail
//! validation snapshot their error instead.

use hotplate::stack::{Stack, StaticResources};
use hotplate::template::Template;
use hotplate::value::{Map, Value};
use std::path::Path;

fn render(path: &Path) -> hotplate::Result<Value> {
    let source = std::fs::read_to_string(path).unwrap();
    let template: Template = source.parse()?;

    let state_path = path
        .parent()
        .and_then(Path::parent)
        .unwrap()
        .join("state")
        .join(path.file_name().unwrap());
    let resources = match std::fs::read_to_string(&state_path) {
        Ok(state) => StaticResources::from_value(&serde_yaml::from_str(&state).unwrap())?,
        Err(_) => StaticResources::default(),
    };

    let stack = Stack::new("snapshot", &template, &Map::new(), &resources)?;
    stack.validate()?;

    let mut rendered_resources = Map::new();
    for (name, definition) in stack.resource_definitions()? {
        let mut resource = Map::new();
        resource.insert("type".into(), definition.resource_type().into());
        resource.insert(
            "properties".into(),
            Value::Object(definition.properties_view(&stack, None)?.resolve_all()?),
        );
        resource.insert(
            "requires".into(),
            definition
                .required_resource_names()?
                .into_iter()
                .collect::<Vec<_>>()
                .into(),
        );
        rendered_resources.insert(name, Value::Object(resource));
    }

    let mut outputs = Map::new();
    for (name, output) in stack.outputs()? {
        outputs.insert(name, output.resolve(&stack)?);
    }

    let mut rendered = Map::new();
    rendered.insert("resources".into(), Value::Object(rendered_resources));
    rendered.insert("outputs".into(), Value::Object(outputs));
    Ok(Value::Object(rendered))
}

#[test]
fn snapshots() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HOTPLATE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    insta::glob!("templates/*.yaml", |path| {
        let rendered = render(path).unwrap_or_else(|error| {
            Value::Object([("error".to_string(), Value::from(error.to_string()))].into_iter().collect())
        });

        insta::assert_json_snapshot!(rendered);
    });
}
