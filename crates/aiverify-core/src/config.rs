//! Portal configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// An external command: program plus leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Configuration for the plugin registry and its validators.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct PortalConfig {
    /// Directory holding one subdirectory per installed plugin.
    #[builder(default = "default_plugin_root()")]
    #[serde(default = "default_plugin_root")]
    pub plugin_root: PathBuf,

    /// Registry store connection URL.
    #[builder(default = "default_redis_url()")]
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Gids of plugins shipped by default.
    #[builder(default = "default_stock_plugins()")]
    #[serde(default = "default_stock_plugins")]
    pub stock_plugins: Vec<String>,

    /// Interpreter used to syntax-check algorithm scripts.
    #[builder(default = "default_python()")]
    #[serde(default = "default_python")]
    pub python_executable: PathBuf,

    /// Checker script passed to the interpreter (None = `-m py_compile`).
    #[builder(default)]
    #[serde(default)]
    pub python_checker_script: Option<PathBuf>,

    /// MDX compiler command; the file path is appended as last argument.
    #[builder(default)]
    #[serde(default)]
    pub mdx_compiler: Option<CommandSpec>,

    /// Upper bound for each external content check.
    #[builder(default = "30_000")]
    #[serde(default = "default_timeout_ms")]
    pub content_check_timeout_ms: u64,
}

fn default_plugin_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aiverify")
        .join("plugins")
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_python() -> PathBuf {
    PathBuf::from("python3")
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_stock_plugins() -> Vec<String> {
    [
        "aiverify.stock.decorators",
        "aiverify.stock.process-checklist",
        "aiverify.stock.reports",
        "aiverify.stock.fairness-metrics-toolbox-for-classification",
        "aiverify.stock.fairness-metrics-toolbox-for-regression",
        "aiverify.stock.accumulated-local-effect",
        "aiverify.stock.partial-dependence-plot",
        "aiverify.stock.shap-toolbox",
        "aiverify.stock.robustness-toolbox",
        "aiverify.stock.image-corruption-toolbox",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl PortalConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.plugin_root {
            if root.as_os_str().is_empty() {
                return Err("Plugin root cannot be empty".to_string());
            }
        }
        if self.content_check_timeout_ms == Some(0) {
            return Err("Content check timeout must be positive".to_string());
        }
        Ok(())
    }
}

impl PortalConfig {
    /// Create a new config builder.
    pub fn builder() -> PortalConfigBuilder {
        PortalConfigBuilder::default()
    }

    /// Create a config with defaults and the given plugin root.
    pub fn new(plugin_root: impl Into<PathBuf>) -> Self {
        Self {
            plugin_root: plugin_root.into(),
            redis_url: default_redis_url(),
            stock_plugins: default_stock_plugins(),
            python_executable: default_python(),
            python_checker_script: None,
            mdx_compiler: None,
            content_check_timeout_ms: default_timeout_ms(),
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.plugin_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                message: "plugin_root cannot be empty".to_string(),
            });
        }
        if self.content_check_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "content_check_timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Check if a plugin gid is on the stock allowlist.
    pub fn is_stock(&self, gid: &str) -> bool {
        self.stock_plugins.iter().any(|s| s == gid)
    }

    /// Timeout for each external content check.
    pub fn content_check_timeout(&self) -> Duration {
        Duration::from_millis(self.content_check_timeout_ms)
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::new(default_plugin_root())
    }
}
