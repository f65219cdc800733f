//! hotplate cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; hotplate ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse and validate a template
    Validate(ValidateCommand),

    /// Print the resolved properties of all enabled resources and the resolved outputs
    #[command(alias = "eval")]
    Resolve(ResolveCommand),

    /// Print the resources each resource requires and the attributes consumed from it
    Deps(DepsCommand),
}

#[derive(Parser, Debug)]
pub struct ValidateCommand {
    #[clap(flatten)]
    pub input: InputArgs,
}

#[derive(Parser, Debug)]
pub struct ResolveCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct DepsCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Template file (YAML or JSON)
    #[clap(short = 't', long = "template")]
    pub template: PathBuf,

    /// Environment file with a `parameters` map
    ///
    /// Can be specified multiple times, later files win.
    #[clap(short = 'e', long = "environment")]
    pub environments: Vec<PathBuf>,

    /// Parameter value as key=value, overrides environment files
    #[clap(short = 'P', long = "parameter", value_parser = parse_key_value)]
    pub parameters: Vec<(String, String)>,

    /// Resource state: a map of resource name to { ref_id, attributes, complete }
    #[clap(short = 's', long = "state")]
    pub state: Option<PathBuf>,

    /// File made available to get_file as key=path
    #[clap(long = "file", value_parser = parse_key_value)]
    pub files: Vec<(String, String)>,

    /// Stack name used for pseudo parameters
    #[clap(long = "stack-name", default_value = "hotplate")]
    pub stack_name: String,
}

fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{arg}'"))
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
