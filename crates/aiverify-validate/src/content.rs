//! External content validators: MDX compilation and Python syntax checks.
//!
//! Both are black boxes to the registry. Any failure is reduced to a message
//! that the plugin validator attaches to the owning component.

use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use aiverify_core::{CommandSpec, PortalConfig};

use crate::process::run_bounded;

/// Type alias for boxed futures returned by content validators.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Output of a successful MDX compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledMdx {
    pub code: String,
}

/// Compiles MDX content files.
pub trait MdxCompiler: Send + Sync {
    fn compile<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<CompiledMdx, String>>;
}

/// Checks Python scripts for syntax errors.
pub trait PythonChecker: Send + Sync {
    fn check<'a>(&'a self, script: &'a Path) -> BoxFuture<'a, Result<(), String>>;
}

/// MDX "compiler" that only requires the file to be readable UTF-8.
///
/// Used when no external compiler is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadableMdx;

impl MdxCompiler for ReadableMdx {
    fn compile<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<CompiledMdx, String>> {
        Box::pin(async move {
            let code = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            Ok(CompiledMdx { code })
        })
    }
}

/// MDX compiler run as an external command with the file path appended.
#[derive(Debug, Clone)]
pub struct CommandMdxCompiler {
    command: CommandSpec,
    timeout: Duration,
    cancel: CancellationToken,
}

impl CommandMdxCompiler {
    pub fn new(command: CommandSpec, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            command,
            timeout,
            cancel,
        }
    }
}

impl MdxCompiler for CommandMdxCompiler {
    fn compile<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<CompiledMdx, String>> {
        Box::pin(async move {
            let mut args: Vec<&OsStr> = self.command.args.iter().map(OsStr::new).collect();
            args.push(path.as_os_str());
            let output = run_bounded(self.command.program.as_os_str(), args, self.timeout, &self.cancel)
                .await
                .map_err(|e| format!("MDX compile failed: {e}"))?;
            Ok(CompiledMdx {
                code: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        })
    }
}

/// Python syntax check through an interpreter subprocess.
///
/// Runs `interpreter checker_script script`, or `interpreter -m py_compile
/// script` when no checker script is configured.
#[derive(Debug, Clone)]
pub struct CommandPythonChecker {
    interpreter: PathBuf,
    checker_script: Option<PathBuf>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl CommandPythonChecker {
    pub fn new(
        interpreter: impl Into<PathBuf>,
        checker_script: Option<PathBuf>,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            checker_script,
            timeout,
            cancel,
        }
    }
}

impl PythonChecker for CommandPythonChecker {
    fn check<'a>(&'a self, script: &'a Path) -> BoxFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut args: Vec<&OsStr> = match &self.checker_script {
                Some(checker) => vec![checker.as_os_str()],
                None => vec![OsStr::new("-m"), OsStr::new("py_compile")],
            };
            args.push(script.as_os_str());
            run_bounded(self.interpreter.as_os_str(), args, self.timeout, &self.cancel)
                .await
                .map(|_| ())
                .map_err(|e| format!("Python syntax check failed: {e}"))
        })
    }
}

/// Build both content validators from portal configuration.
pub fn from_config(
    config: &PortalConfig,
    cancel: CancellationToken,
) -> (Box<dyn MdxCompiler>, Box<dyn PythonChecker>) {
    let timeout = config.content_check_timeout();
    let mdx: Box<dyn MdxCompiler> = match &config.mdx_compiler {
        Some(command) => Box::new(CommandMdxCompiler::new(command.clone(), timeout, cancel.clone())),
        None => Box::new(ReadableMdx),
    };
    let python = Box::new(CommandPythonChecker::new(
        config.python_executable.clone(),
        config.python_checker_script.clone(),
        timeout,
        cancel,
    ));
    (mdx, python)
}
