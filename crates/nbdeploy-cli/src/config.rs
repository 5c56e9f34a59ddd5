//! Configuration file support for nbdeploy CLI
//!
//! Loads settings from `_nbdeploy.toml`, looked up next to the notebook.

use anyhow::{Context, Result};
use nbdeploy_core::{ToolCommand, ToolCommands};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "_nbdeploy.toml";

/// Schema URL for the configuration file
pub const SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/nbdeploy/nbdeploy/main/crates/nbdeploy-cli/schema/nbdeploy.schema.json";

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Site link configuration
    #[serde(skip_serializing_if = "SiteConfig::is_empty")]
    pub site: SiteConfig,
    /// External tool commands
    #[serde(skip_serializing_if = "ToolsConfig::is_empty")]
    pub tools: ToolsConfig,
    /// Formula image regeneration
    #[serde(skip_serializing_if = "FormulasConfig::is_empty")]
    pub formulas: FormulasConfig,
}

/// Site link configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL template prepended to asset links, emitted verbatim
    /// (default: "{{ site.baseurl }}")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Public path of the image directory (default: the image directory argument)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url_path: Option<String>,
}

impl SiteConfig {
    fn is_empty(&self) -> bool {
        self.base_url.is_none() && self.image_url_path.is_none()
    }
}

/// External tool commands, each given as a program followed by leading arguments
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct ToolsConfig {
    /// Notebook converter, run as `<converter> nbconvert --to markdown <notebook>`
    /// (default: ["jupyter"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converter: Option<Vec<String>>,
    /// Typesetter, run as `<typesetter> <file>.tex`
    /// (default: ["pdflatex", "-interaction=nonstopmode", "-halt-on-error"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typesetter: Option<Vec<String>>,
    /// Rasterizer, run as `<rasterizer> -density <dpi> <file>.pdf <file>.png`
    /// (default: ["convert"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rasterizer: Option<Vec<String>>,
}

impl ToolsConfig {
    fn is_empty(&self) -> bool {
        self.converter.is_none() && self.typesetter.is_none() && self.rasterizer.is_none()
    }

    /// Resolve configured commands, falling back to the defaults
    pub fn to_commands(&self) -> Result<ToolCommands> {
        let defaults = ToolCommands::default();
        Ok(ToolCommands {
            converter: resolve_command("tools.converter", &self.converter, defaults.converter)?,
            typesetter: resolve_command("tools.typesetter", &self.typesetter, defaults.typesetter)?,
            rasterizer: resolve_command("tools.rasterizer", &self.rasterizer, defaults.rasterizer)?,
        })
    }
}

fn resolve_command(
    field: &str,
    configured: &Option<Vec<String>>,
    default: ToolCommand,
) -> Result<ToolCommand> {
    match configured {
        Some(cmd) => ToolCommand::from_slice(cmd)
            .with_context(|| format!("`{field}` must name a program, got an empty list")),
        None => Ok(default),
    }
}

/// Formula image regeneration configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct FormulasConfig {
    /// Regenerate images from `.tex` files next to the notebook (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Rasterization density in DPI (default: 300)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
}

impl FormulasConfig {
    fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.dpi.is_none()
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Try to load configuration from a directory (looks for `_nbdeploy.toml`)
    ///
    /// Returns `Ok(None)` if the config file doesn't exist.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate JSON schema for the configuration
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Generate JSON schema as a string
    pub fn json_schema_string() -> Result<String> {
        let schema = Self::json_schema();
        serde_json::to_string_pretty(&schema).context("Failed to serialize JSON schema")
    }

    /// Serialize configuration to TOML string with schema directive
    pub fn to_toml_with_schema(&self) -> Result<String> {
        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        Ok(format!("#:schema {}\n\n{}", SCHEMA_URL, toml_content))
    }

    /// Create a sample configuration with the built-in defaults for init command
    pub fn sample() -> Self {
        Config {
            site: SiteConfig {
                base_url: Some(nbdeploy_core::DEFAULT_BASE_URL.to_string()),
                image_url_path: None, // defaults to the image directory argument
            },
            tools: ToolsConfig {
                converter: Some(vec!["jupyter".to_string()]),
                typesetter: Some(vec![
                    "pdflatex".to_string(),
                    "-interaction=nonstopmode".to_string(),
                    "-halt-on-error".to_string(),
                ]),
                rasterizer: Some(vec!["convert".to_string()]),
            },
            formulas: FormulasConfig {
                enabled: Some(true),
                dpi: Some(nbdeploy_core::formula::DEFAULT_DPI),
            },
        }
    }
}
