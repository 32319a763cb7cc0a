//! Export of generated templates to script files and reports.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::app::template::{Template, placeholder};
use crate::domain::model::Parameter;
use crate::infra::clipboard::{Clipboard, ClipboardBackend};
use crate::infra::config::Config;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Executable POSIX shell script.
    Script,
    /// Markdown report listing parameters, script, and usage.
    Markdown,
}

impl ExportFormat {
    /// Return a stable identifier for templates and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Script => "script",
            ExportFormat::Markdown => "markdown",
        }
    }

    /// Recommended file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Script => "sh",
            ExportFormat::Markdown => "md",
        }
    }

    /// Name of the built-in template rendering this format.
    pub fn default_template(&self) -> &'static str {
        match self {
            ExportFormat::Script => SHELL_SCRIPT_TEMPLATE_NAME,
            ExportFormat::Markdown => MARKDOWN_TEMPLATE_NAME,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportFormatParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "script" | "sh" | "shell" => Ok(ExportFormat::Script),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => Err(ExportFormatParseError::UnknownFormat(other.to_string())),
        }
    }
}

/// Error returned when parsing an [`ExportFormat`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ExportFormatParseError {
    #[error("unknown export format '{0}'")]
    UnknownFormat(String),
}

/// Runtime options controlling export behavior.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub template: String,
    pub output_path: Option<PathBuf>,
    pub copy_to_clipboard: bool,
}

impl ExportOptions {
    /// Build options from configuration defaults, including a configured template override.
    pub fn from_config(config: &Config) -> Self {
        let format = config
            .defaults
            .export_format()
            .parse::<ExportFormat>()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to script export format");
                ExportFormat::Script
            });
        let mut options = Self::for_format(format, config);
        if let Some(template) = config.export.template() {
            options.template = template;
        }
        options
    }

    /// Options for an explicitly chosen `format`, always rendered with its built-in template.
    pub fn for_format(format: ExportFormat, config: &Config) -> Self {
        Self {
            format,
            template: format.default_template().to_owned(),
            output_path: None,
            copy_to_clipboard: config.export.copy_to_clipboard(),
        }
    }

    /// Timestamped file name inside `directory` for this format.
    pub fn timestamped_path(&self, directory: &Path) -> Result<PathBuf> {
        let timestamp = OffsetDateTime::now_utc().format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))?;
        Ok(directory.join(format!(
            "template-{timestamp}.{}",
            self.format.extension()
        )))
    }
}

/// Result of an export operation.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub rendered: String,
    pub output_path: Option<PathBuf>,
    pub copied_to_clipboard: bool,
}

/// Responsible for rendering templates into artifacts and writing them out.
pub struct Exporter {
    env: Environment<'static>,
    clipboard: Mutex<Box<dyn ClipboardBackend>>,
}

impl Exporter {
    /// Create a new exporter backed by the system clipboard.
    pub fn new() -> Result<Self> {
        Self::with_clipboard(Clipboard::new())
    }

    /// Create an exporter that copies through `clipboard`.
    pub fn with_clipboard(clipboard: impl ClipboardBackend + 'static) -> Result<Self> {
        Ok(Self {
            env: default_environment()?,
            clipboard: Mutex::new(Box::new(clipboard)),
        })
    }

    /// Render the generated template using the supplied options.
    pub fn render(
        &self,
        template: &Template,
        parameters: &[Parameter],
        options: &ExportOptions,
    ) -> Result<String> {
        let context = build_template_context(template, parameters, options)?;
        self.render_with_template(&context, &options.template)
    }

    /// Render the template and persist/copy outputs based on options.
    pub fn export(
        &self,
        template: &Template,
        parameters: &[Parameter],
        options: &ExportOptions,
    ) -> Result<ExportResult> {
        let rendered = self.render(template, parameters, options)?;

        if let Some(path) = &options.output_path {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create export directory: {}", parent.display())
                })?;
            }
            fs::write(path, &rendered)
                .with_context(|| format!("failed to write export output to {}", path.display()))?;
            tracing::info!(path = %path.display(), format = options.format.as_str(), "exported template");
        }

        if options.copy_to_clipboard {
            self.copy_to_clipboard(&template.script)
                .context("failed to copy script to clipboard")?;
        }

        Ok(ExportResult {
            rendered,
            output_path: options.output_path.clone(),
            copied_to_clipboard: options.copy_to_clipboard,
        })
    }

    /// Copy raw text (usually the generated script) to the clipboard.
    pub fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        self.clipboard
            .lock()
            .map_err(|_| anyhow!("clipboard lock poisoned"))?
            .copy(text)
    }

    fn render_with_template(
        &self,
        context: &TemplateContext,
        template_name: &str,
    ) -> Result<String> {
        if let Ok(template) = self.env.get_template(template_name) {
            return template
                .render(context)
                .map_err(|err| anyhow!("failed to render template '{template_name}': {err}"));
        }

        let template_path = Path::new(template_name);
        if template_path.exists() {
            let source = fs::read_to_string(template_path).with_context(|| {
                format!(
                    "failed to load template from path {}",
                    template_path.display()
                )
            })?;
            let mut env = configured_environment();
            env.add_template("external", &source)
                .map_err(|err| anyhow!("invalid template '{}': {err}", template_name))?;
            return env
                .get_template("external")
                .and_then(|template| template.render(context))
                .map_err(|err| anyhow!("failed to render template '{template_name}': {err}"));
        }

        Err(anyhow!(
            "template '{}' not found (built-in or filesystem)",
            template_name
        ))
    }
}

const SHELL_SCRIPT_TEMPLATE_NAME: &str = "shell_script";
const MARKDOWN_TEMPLATE_NAME: &str = "markdown_report";

fn configured_environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env
}

fn default_environment() -> Result<Environment<'static>> {
    let mut env = configured_environment();
    env.add_template(SHELL_SCRIPT_TEMPLATE_NAME, DEFAULT_SCRIPT_TEMPLATE)
        .map_err(|err| anyhow!("failed to register default script template: {err}"))?;
    env.add_template(MARKDOWN_TEMPLATE_NAME, DEFAULT_MARKDOWN_TEMPLATE)
        .map_err(|err| anyhow!("failed to register default markdown template: {err}"))?;
    Ok(env)
}

fn build_template_context(
    template: &Template,
    parameters: &[Parameter],
    options: &ExportOptions,
) -> Result<TemplateContext> {
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format export timestamp")?;

    let parameters = parameters
        .iter()
        .enumerate()
        .map(|(index, parameter)| TemplateParameter {
            index,
            placeholder: placeholder(index),
            color: parameter.color.to_string(),
            selections: parameter
                .selections
                .iter()
                .map(|selection| table_cell(&selection.text))
                .collect(),
        })
        .collect();

    Ok(TemplateContext {
        generated_at,
        format: options.format.as_str().to_string(),
        script: template.script.clone(),
        usage: template.usage.clone(),
        parameter_count: template.parameter_count,
        parameters,
    })
}

/// Keep a selection on one Markdown table row.
fn table_cell(text: &str) -> String {
    let text = text.replace('|', "\\|").replace('\n', "⏎");
    let longest_run = text
        .split(|ch| ch != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);
    // Code spans strip one space from each side when the content touches a backtick.
    let pad = if text.starts_with('`') || text.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{fence}{pad}{text}{pad}{fence}")
}

#[derive(Serialize)]
struct TemplateContext {
    generated_at: String,
    format: String,
    script: String,
    usage: String,
    parameter_count: usize,
    parameters: Vec<TemplateParameter>,
}

#[derive(Serialize)]
struct TemplateParameter {
    index: usize,
    placeholder: String,
    color: String,
    selections: Vec<String>,
}

const DEFAULT_SCRIPT_TEMPLATE: &str = r#"#!/bin/sh
# Generated by templar at {{ generated_at }}
# Usage: {{ usage }}
{{ script }}
"#;

const DEFAULT_MARKDOWN_TEMPLATE: &str = r#"# Script Template

Generated at: {{ generated_at }}

## Parameters

{% if parameters %}
| Placeholder | Color | Selections |
| --- | --- | --- |
{% for parameter in parameters %}
| `{{ parameter.placeholder }}` | {{ parameter.color }} | {{ parameter.selections | join(", ") }} |
{% endfor %}
{% else %}
_No parameters._
{% endif %}

## Script

```sh
{{ script }}
```

## Usage

```sh
{{ usage }}
```
"#;
