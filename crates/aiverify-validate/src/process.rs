//! Bounded subprocess execution for external content checks.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Failure of a bounded subprocess.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Run a command to completion within `timeout`.
///
/// The child is killed when the timeout elapses or `cancel` fires. A
/// non-zero exit is reported as [`ProcessError::Failed`] carrying trimmed
/// stderr (or stdout when stderr is empty).
pub async fn run_bounded<I, S>(
    program: &OsStr,
    args: I,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Output, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: PathBuf::from(program),
            source,
        })?;

    // Dropping the wait future drops the child, which kills it.
    let output = tokio::select! {
        result = child.wait_with_output() => result.map_err(|source| ProcessError::Spawn {
            program: PathBuf::from(program),
            source,
        })?,
        _ = tokio::time::sleep(timeout) => return Err(ProcessError::Timeout { after: timeout }),
        _ = cancel.cancelled() => return Err(ProcessError::Cancelled),
    };

    if !output.status.success() {
        let status = output
            .status
            .code()
            .map(|c| format!("code {c}"))
            .unwrap_or_else(|| "signal".into());
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        return Err(ProcessError::Failed {
            status,
            stderr: detail,
        });
    }
    Ok(output)
}
