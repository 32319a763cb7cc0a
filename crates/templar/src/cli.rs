//! Command-line entry points.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Serialize;
use thiserror::Error;

use crate::app::export::{ExportFormat, ExportOptions, Exporter};
use crate::app::store::{DEFAULT_BUFFER, ParameterStore};
use crate::app::template::{Template, placeholder};
use crate::domain::model::{Parameter, Selection};
use crate::domain::position::{Position, char_len};
use crate::infra::config::Config;
use crate::infra::logging::{self, LogTarget};
use crate::ui::app::UiApp;

#[derive(Debug, Parser)]
#[command(
    name = "templar",
    author,
    version,
    about = "Mark parts of a snippet as parameters and turn it into a shell-script template",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// File loaded into the interactive builder. Defaults to a built-in sample.
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a template without opening the interactive builder.
    Generate(GenerateArgs),
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// File whose contents become the buffer.
    pub file: PathBuf,

    /// Character range to parameterize, optionally joining an existing parameter.
    #[arg(short, long = "select", value_name = "START..END[=PARAM]")]
    pub selections: Vec<SelectionSpec>,

    /// Script name shown in the usage line.
    #[arg(long)]
    pub script_name: Option<String>,

    /// Print the template and parameters as JSON.
    #[arg(long)]
    pub json: bool,

    /// Also write the rendered export to this path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export format used with --output.
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Copy the generated script to the clipboard.
    #[arg(long)]
    pub copy: bool,
}

/// A `START..END[=PARAM]` selection given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSpec {
    pub position: Position,
    pub parameter: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionParseError {
    #[error("selection '{0}' must look like START..END or START..END=PARAM")]
    MissingSeparator(String),
    #[error("'{0}' is not a valid character offset")]
    InvalidOffset(String),
    #[error("'{0}' is not a valid parameter index")]
    InvalidParameter(String),
    #[error("selection {start}..{end} is empty")]
    EmptyRange { start: usize, end: usize },
}

impl FromStr for SelectionSpec {
    type Err = SelectionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (range, parameter) = match value.split_once('=') {
            Some((range, parameter)) => {
                let parameter = parameter.trim();
                let index = parameter
                    .parse::<usize>()
                    .map_err(|_| SelectionParseError::InvalidParameter(parameter.to_string()))?;
                (range, Some(index))
            }
            None => (value, None),
        };

        let (start, end) = range
            .split_once("..")
            .ok_or_else(|| SelectionParseError::MissingSeparator(value.to_string()))?;
        let offset = |raw: &str| {
            raw.trim()
                .parse::<usize>()
                .map_err(|_| SelectionParseError::InvalidOffset(raw.trim().to_string()))
        };
        let (start, end) = (offset(start)?, offset(end)?);
        if start >= end {
            return Err(SelectionParseError::EmptyRange { start, end });
        }

        Ok(Self {
            position: Position::new(start, end),
            parameter,
        })
    }
}

impl fmt::Display for SelectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.position.start, self.position.end)?;
        if let Some(parameter) = self.parameter {
            write!(f, "={parameter}")?;
        }
        Ok(())
    }
}

/// Dispatch the parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Generate(args)) => {
            logging::init(LogTarget::Stderr)?;
            let config = Config::load()?;
            generate(&args, &config)
        }
        Some(Command::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "templar", &mut io::stdout());
            Ok(())
        }
        None => {
            logging::init(LogTarget::File(logging::default_log_path()))?;
            let config = Config::load()?;
            let buffer = match &cli.file {
                Some(path) => read_buffer(path)?,
                None => DEFAULT_BUFFER.to_owned(),
            };
            UiApp::new(config, buffer)?.run()
        }
    }
}

fn generate(args: &GenerateArgs, config: &Config) -> Result<()> {
    let buffer = read_buffer(&args.file)?;
    let store = apply_selections(buffer, &args.selections, config)?;
    let script_name = args
        .script_name
        .clone()
        .unwrap_or_else(|| config.defaults.script_name().to_owned());
    let template = store.generate(&script_name);

    if args.json {
        let report = GenerateReport::new(&template, store.parameters());
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize template")?
        );
    } else {
        println!("{}", template.script);
        println!("{}", template.usage);
    }

    if args.output.is_some() || args.copy {
        let mut options = match args.format {
            Some(format) => ExportOptions::for_format(format, config),
            None => ExportOptions::from_config(config),
        };
        options.output_path = args.output.clone();
        options.copy_to_clipboard = args.copy;
        Exporter::new()?.export(&template, store.parameters(), &options)?;
    }
    Ok(())
}

/// Build a store over `buffer` and confirm each selection in order.
pub fn apply_selections(
    buffer: String,
    selections: &[SelectionSpec],
    config: &Config,
) -> Result<ParameterStore> {
    let mut store = ParameterStore::with_colors(buffer, config.palette.allocator());
    let len = char_len(store.buffer());
    for spec in selections {
        if spec.position.end > len {
            bail!("selection {spec} extends past the end of the buffer ({len} characters)");
        }
        if !store.is_offerable(&spec.position) {
            bail!("selection {spec} overlaps an existing selection");
        }
        store.set_pending_selection(spec.position);
        store
            .confirm_selection(spec.parameter)
            .with_context(|| format!("failed to apply selection {spec}"))?;
    }
    Ok(store)
}

fn read_buffer(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[derive(Debug, Serialize)]
struct GenerateReport<'a> {
    script: &'a str,
    usage: &'a str,
    parameters: Vec<ReportParameter<'a>>,
}

#[derive(Debug, Serialize)]
struct ReportParameter<'a> {
    placeholder: String,
    color: String,
    selections: &'a [Selection],
}

impl<'a> GenerateReport<'a> {
    fn new(template: &'a Template, parameters: &'a [Parameter]) -> Self {
        Self {
            script: &template.script,
            usage: &template.usage,
            parameters: parameters
                .iter()
                .enumerate()
                .map(|(index, parameter)| ReportParameter {
                    placeholder: placeholder(index),
                    color: parameter.color.to_string(),
                    selections: &parameter.selections,
                })
                .collect(),
        }
    }
}
