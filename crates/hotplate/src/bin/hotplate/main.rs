mod cli;

use anyhow::Context;
use hotplate::stack::{Stack, StaticResources};
use hotplate::template::Template;
use hotplate::value::{Map, Value};
use indexmap::IndexMap;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HOTPLATE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Validate(validate_cli) => validate(validate_cli),
        cli::Command::Resolve(resolve_cli) => resolve(resolve_cli),
        cli::Command::Deps(deps_cli) => deps(deps_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

/// Everything a stack is built from
struct Input {
    template: Template,
    parameters: Map,
    resources: StaticResources,
    stack_name: String,
}

impl Input {
    fn stack(&self) -> anyhow::Result<Stack<'_>> {
        Ok(Stack::new(
            self.stack_name.clone(),
            &self.template,
            &self.parameters,
            &self.resources,
        )?)
    }
}

fn read_yaml(path: &std::path::Path) -> anyhow::Result<Value> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&source).with_context(|| format!("Failed to parse {}", path.display()))
}

fn load(input: &cli::InputArgs) -> anyhow::Result<Input> {
    let source = std::fs::read_to_string(&input.template)
        .with_context(|| format!("Failed to read template {}", input.template.display()))?;
    let template: Template = source
        .parse()
        .with_context(|| format!("Invalid template {}", input.template.display()))?;

    let mut files = IndexMap::new();
    for (key, path) in &input.files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file {path} for {key}"))?;
        files.insert(key.clone(), content);
    }
    let template = template.with_files(files);

    let mut parameters = Map::new();
    for path in &input.environments {
        let environment = read_yaml(path)?;
        match environment.as_object().and_then(|env| env.get("parameters")) {
            None | Some(Value::Null) => {}
            Some(Value::Object(values)) => parameters.extend(values.clone()),
            Some(_) => anyhow::bail!("parameters in {} must be a map", path.display()),
        }
    }
    for (key, value) in &input.parameters {
        parameters.insert(key.clone(), value.as_str().into());
    }

    let resources = match &input.state {
        Some(path) => StaticResources::from_value(&read_yaml(path)?)
            .with_context(|| format!("Invalid resource state {}", path.display()))?,
        None => StaticResources::default(),
    };
    tracing::debug!(parameters = parameters.len(), "input loaded");

    Ok(Input {
        template,
        parameters,
        resources,
        stack_name: input.stack_name.clone(),
    })
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

pub fn validate(cli: cli::ValidateCommand) -> anyhow::Result<()> {
    let input = load(&cli.input)?;
    let stack = input.stack()?;
    stack.validate()?;
    println!("{} is valid", input.template.version());
    Ok(())
}

pub fn resolve(cli: cli::ResolveCommand) -> anyhow::Result<()> {
    let input = load(&cli.input)?;
    let stack = input.stack()?;

    let mut resources = Map::new();
    for (name, definition) in stack.resource_definitions()? {
        let properties = definition
            .properties_view(&stack, None)?
            .resolve_all()
            .with_context(|| format!("Failed to resolve properties of {name}"))?;
        let mut resolved = Map::new();
        resolved.insert("type".into(), definition.resource_type().into());
        resolved.insert("properties".into(), Value::Object(properties));
        resources.insert(name, Value::Object(resolved));
    }

    let mut outputs = Map::new();
    for (name, definition) in stack.outputs()? {
        let value = definition
            .resolve(&stack)
            .with_context(|| format!("Failed to resolve output {name}"))?;
        outputs.insert(name, value);
    }

    let mut document = Map::new();
    document.insert("resources".into(), Value::Object(resources));
    document.insert("outputs".into(), Value::Object(outputs));
    output(&cli.output, &Value::Object(document))
}

pub fn deps(cli: cli::DepsCommand) -> anyhow::Result<()> {
    let input = load(&cli.input)?;
    let stack = input.stack()?;

    let mut document = Map::new();
    for (name, requires) in stack.dependency_map()? {
        let dep_attrs = stack.dep_attrs(&name)?;
        let mut entry = Map::new();
        entry.insert("requires".into(), requires.into_iter().collect::<Vec<_>>().into());
        entry.insert("dep_attrs".into(), dep_attrs.into_iter().collect::<Vec<_>>().into());
        document.insert(name, Value::Object(entry));
    }
    output(&cli.output, &Value::Object(document))
}
