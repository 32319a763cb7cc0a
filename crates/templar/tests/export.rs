use std::fs;

use templar::app::export::{ExportFormat, ExportOptions, Exporter};
use templar::cli::{SelectionSpec, apply_selections};
use templar::infra::clipboard::MemoryClipboard;
use templar::infra::config::Config;

fn specs(raw: &[&str]) -> Vec<SelectionSpec> {
    raw.iter()
        .map(|spec| spec.parse().expect("valid selection"))
        .collect()
}

#[test]
fn exports_markdown_report_with_palette_colors() {
    let config = Config::builtin().unwrap();
    let store = apply_selections(
        "curl -H \"Authorization: token\" https://example.com".into(),
        &specs(&["24..29", "31..50"]),
        &config,
    )
    .unwrap();
    let template = store.generate(config.defaults.script_name());

    let temp_dir = tempfile::tempdir().unwrap();
    let output_path = temp_dir.path().join("report.md");
    let mut options = ExportOptions::for_format(ExportFormat::Markdown, &config);
    options.output_path = Some(output_path.clone());

    let exporter = Exporter::with_clipboard(MemoryClipboard::new()).unwrap();
    let result = exporter
        .export(&template, store.parameters(), &options)
        .unwrap();

    let first_color = config.palette.colors[0].to_string();
    assert!(result.rendered.contains(&format!("| `${{0}}` | {first_color} | `token` |")));
    assert!(result.rendered.contains("`https://example.com`"));
    assert!(result.rendered.contains("sh ./script $0 $1"));
    assert!(!result.copied_to_clipboard);

    let written = fs::read_to_string(output_path).unwrap();
    assert_eq!(written, result.rendered);
}

#[test]
fn exported_script_is_runnable_shape() {
    let config = Config::builtin().unwrap();
    let store = apply_selections("echo foo".into(), &specs(&["5..8"]), &config).unwrap();
    let template = store.generate("./greet.sh");

    let clipboard = MemoryClipboard::new();
    let exporter = Exporter::with_clipboard(clipboard.clone()).unwrap();
    let mut options = ExportOptions::for_format(ExportFormat::Script, &config);
    options.copy_to_clipboard = true;

    let result = exporter
        .export(&template, store.parameters(), &options)
        .unwrap();
    assert!(result.rendered.starts_with("#!/bin/sh\n"));
    assert!(result.rendered.contains("# Usage: sh ./greet.sh $0\n"));
    assert!(result.rendered.contains("printf \"echo ${0}\"\n"));
    assert_eq!(clipboard.contents().as_deref(), Some("printf \"echo ${0}\""));
}

#[test]
fn explicit_format_ignores_configured_template() {
    let config: Config = toml::from_str("[export]\ntemplate = \"markdown_report\"\n").unwrap();
    let store = apply_selections("echo foo".into(), &specs(&["5..8"]), &config).unwrap();
    let template = store.generate(config.defaults.script_name());
    let exporter = Exporter::with_clipboard(MemoryClipboard::new()).unwrap();

    let explicit = ExportOptions::for_format(ExportFormat::Script, &config);
    let result = exporter
        .export(&template, store.parameters(), &explicit)
        .unwrap();
    assert!(result.rendered.starts_with("#!/bin/sh"));

    let configured = ExportOptions::from_config(&config);
    assert_eq!(configured.format, ExportFormat::Script);
    assert_eq!(configured.template, "markdown_report");
}
