//! `tokio::process::Command` extension for uniform stdout/stderr handling.
//!
//! Ported from `gnosis_vpn-lib::shell_command_ext`: one helper that runs a
//! command, logs non-empty stderr on success as a warning, and turns a
//! non-zero exit into a typed error with stdout/stderr preserved for the
//! caller to inspect.

use std::process::Output;

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("command exited with code {code:?}: {stderr}")]
    NonZeroExit {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn stderr(&self) -> &str {
        match self {
            Error::NonZeroExit { stderr, .. } => stderr,
            Error::Io(_) => "",
        }
    }
}

pub async fn run_stdout(cmd: &mut Command) -> Result<String, Error> {
    let cmd_debug = format!("{cmd:?}");
    let output = cmd.output().await?;
    stdout_from_output(&cmd_debug, output)
}

pub fn stdout_from_output(cmd_debug: &str, output: Output) -> Result<String, Error> {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if output.status.success() {
        if !stderr.is_empty() {
            tracing::warn!(cmd = cmd_debug, %stderr, "non-empty stderr on successful command");
        }
        Ok(stdout)
    } else {
        tracing::error!(cmd = cmd_debug, status = ?output.status.code(), %stdout, %stderr, "command failed");
        Err(Error::NonZeroExit {
            code: output.status.code(),
            stdout,
            stderr,
        })
    }
}
