//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::app::template::DEFAULT_SCRIPT_NAME;
use crate::domain::color::{Color, ColorAllocator};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".templar/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub export: Export,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Defaults {
    #[serde(default)]
    script_name: Option<String>,
    #[serde(default)]
    export_format: Option<String>,
}

impl Defaults {
    /// Script name shown in usage lines.
    pub fn script_name(&self) -> &str {
        self.script_name.as_deref().unwrap_or(DEFAULT_SCRIPT_NAME)
    }

    pub fn export_format(&self) -> &str {
        self.export_format.as_deref().unwrap_or("script")
    }
}

/// Colors assigned to new parameters, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Palette {
    #[serde(default)]
    pub colors: Vec<Color>,
}

impl Palette {
    /// Allocator that walks this palette before generating colors.
    pub fn allocator(&self) -> ColorAllocator {
        ColorAllocator::new(self.colors.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Export {
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    directory: Option<String>,
    #[serde(default)]
    copy_to_clipboard: Option<bool>,
}

impl Export {
    fn default_directory() -> &'static str {
        ".templar/exports"
    }

    /// Explicitly configured template, if any. Formats fall back to their built-in template.
    pub fn template(&self) -> Option<String> {
        self.template.clone()
    }

    pub fn directory(&self) -> PathBuf {
        PathBuf::from(
            self.directory
                .as_deref()
                .unwrap_or(Self::default_directory()),
        )
    }

    pub fn copy_to_clipboard(&self) -> bool {
        self.copy_to_clipboard.unwrap_or(false)
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    script_name: Option<String>,
    export_format: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            script_name: env::var("TEMPLAR_SCRIPT_NAME").ok(),
            export_format: env::var("TEMPLAR_EXPORT_FORMAT").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(script_name: &str, export_format: &str) -> Self {
        Self {
            script_name: Some(script_name.to_owned()),
            export_format: Some(export_format.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    /// Configuration built from the embedded defaults only.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(&DEFAULT_CONFIG)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::builtin()?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading global config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            palette: merge_palette(self.palette, other.palette),
            export: merge_export(self.export, other.export),
        }
    }
}

fn merge_defaults(mut base: Defaults, overlay: Defaults) -> Defaults {
    if let Some(value) = overlay.script_name {
        base.script_name = Some(value);
    }
    if let Some(value) = overlay.export_format {
        base.export_format = Some(value);
    }
    base
}

// Palette order is meaningful, so a non-empty overlay replaces the base outright.
fn merge_palette(base: Palette, overlay: Palette) -> Palette {
    if overlay.colors.is_empty() {
        base
    } else {
        overlay
    }
}

fn merge_export(mut base: Export, overlay: Export) -> Export {
    if let Some(value) = overlay.template {
        base.template = Some(value);
    }
    if let Some(value) = overlay.directory {
        base.directory = Some(value);
    }
    if let Some(value) = overlay.copy_to_clipboard {
        base.copy_to_clipboard = Some(value);
    }
    base
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("templar/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(script_name) = env.script_name {
        config.defaults.script_name = Some(script_name);
    }
    if let Some(export_format) = env.export_format {
        config.defaults.export_format = Some(export_format);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, EnvOverrides::default())
            .expect("load default config");
        assert_eq!(config.defaults.script_name(), "./script");
        assert_eq!(config.defaults.export_format(), "script");
        assert_eq!(config.palette.colors.len(), 8);
        assert_eq!(config.palette.colors[0], Color::rgb(0xF4, 0xA2, 0x61));
        assert_eq!(config.export.directory(), PathBuf::from(".templar/exports"));
        assert!(!config.export.copy_to_clipboard());
        assert!(config.export.template().is_none());
    }

    #[test]
    fn merge_global_and_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r##"
[defaults]
script_name = "./deploy.sh"
[palette]
colors = ["#FFFFFF"]
"##,
        )?;

        let workspace_dir = temp.path().join("repo");
        fs::create_dir_all(workspace_dir.join(".templar"))?;
        fs::create_dir_all(workspace_dir.join(".git"))?;
        fs::write(
            workspace_dir.join(".templar/config.toml"),
            r#"
[defaults]
export_format = "markdown"
[export]
copy_to_clipboard = true
"#,
        )?;

        let global_path = Some(global);
        let workspace_path = Some(workspace_dir.join(".templar/config.toml"));

        let config =
            Config::load_with_layers(global_path, workspace_path, EnvOverrides::default())?;

        assert_eq!(config.defaults.script_name(), "./deploy.sh");
        assert_eq!(config.defaults.export_format(), "markdown");
        assert_eq!(config.palette.colors, vec![Color::rgb(255, 255, 255)]);
        assert!(config.export.copy_to_clipboard());
        assert_eq!(config.export.directory(), PathBuf::from(".templar/exports"));

        Ok(())
    }

    #[test]
    fn workspace_can_restore_builtin_values_over_global() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("global.toml");
        fs::write(
            &global,
            "[defaults]\nscript_name = \"./deploy.sh\"\nexport_format = \"markdown\"\n",
        )?;
        let workspace = temp.path().join("workspace.toml");
        fs::write(
            &workspace,
            "[defaults]\nscript_name = \"./script\"\nexport_format = \"script\"\n",
        )?;

        let config =
            Config::load_with_layers(Some(global), Some(workspace), EnvOverrides::default())?;
        assert_eq!(config.defaults.script_name(), "./script");
        assert_eq!(config.defaults.export_format(), "script");
        Ok(())
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let overrides = EnvOverrides::for_tests("./run.sh", "markdown");
        let config = Config::load_with_layers(None, None, overrides)?;
        assert_eq!(config.defaults.script_name(), "./run.sh");
        assert_eq!(config.defaults.export_format(), "markdown");
        Ok(())
    }

    #[test]
    fn invalid_config_returns_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("broken.toml");
        fs::write(&file, "this is not toml")?;
        assert!(Config::from_file(&file).is_err());

        fs::write(&file, "[palette]\ncolors = [\"red\"]\n")?;
        assert!(Config::from_file(&file).is_err());
        Ok(())
    }

    #[test]
    fn palette_allocator_starts_with_configured_colors() -> Result<()> {
        let config = Config::builtin()?;
        let mut allocator = config.palette.allocator();
        assert_eq!(allocator.next_color(), config.palette.colors[0]);
        Ok(())
    }
}
