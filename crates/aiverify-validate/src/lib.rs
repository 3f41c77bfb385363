//! Validation of staged AI Verify plugin directories.
//!
//! [`PluginValidator::validate`] checks a plugin directory before anything
//! is written to the registry:
//!
//! - `plugin.meta.json` and every component metadata file against the
//!   embedded schemas ([`PluginSchemas`]),
//! - required sibling files per component kind,
//! - widget mock-data paths staying inside the plugin directory,
//! - MDX content and algorithm scripts through the external content
//!   validators ([`MdxCompiler`], [`PythonChecker`]), run as bounded
//!   subprocesses.
//!
//! # Example
//!
//! ```rust,no_run
//! use aiverify_core::PortalConfig;
//! use aiverify_validate::PluginValidator;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PortalConfig::new("/srv/aiverify/plugins");
//! let validator = PluginValidator::from_config(&config, CancellationToken::new())?;
//! let meta = validator.validate("/tmp/staging/my-plugin".as_ref()).await?;
//! println!("valid plugin {}", meta.gid);
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod discover;
pub mod paths;
mod process;
mod schema;
mod schemas;
mod validator;

pub use content::{
    CommandMdxCompiler, CommandPythonChecker, CompiledMdx, MdxCompiler, PythonChecker, ReadableMdx,
};
pub use process::{run_bounded, ProcessError};
pub use schema::{Schema, SchemaViolation};
pub use schemas::PluginSchemas;
pub use validator::PluginValidator;
