//! Auxiliary command execution

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Captured result of an auxiliary command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Run a command with piped stdio, feeding it `input` when given.
///
/// The environment is inherited. Output is decoded lossily: the OpenSSH
/// tools emit ASCII, and a mangled byte in a diagnostic beats an error.
pub fn run_command<S: AsRef<str>>(argv: &[S], input: Option<&[u8]>) -> Result<CommandOutput> {
    let argv: Vec<&str> = argv.iter().map(AsRef::as_ref).collect();
    debug!(command = %argv.join(" "), "executing command");

    let mut child = Command::new(argv[0])
        .args(&argv[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::io(argv[0], e))?;

    if let Some(input) = input
        && let Some(mut stdin) = child.stdin.take()
    {
        stdin.write_all(input).map_err(|e| Error::io(argv[0], e))?;
        // Dropping stdin closes the pipe so the child sees EOF.
    }

    let output = child.wait_with_output().map_err(|e| Error::io(argv[0], e))?;
    Ok(CommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Like [`run_command`], but a nonzero exit only logs a warning.
///
/// Returns the exit status so callers can still branch on it.
pub fn run_command_warn_if_fails<S: AsRef<str>>(
    argv: &[S],
    action: &str,
    input: Option<&[u8]>,
) -> Result<i32> {
    let output = run_command(argv, input)?;
    if !output.success() {
        warn!(
            action,
            status = output.status,
            stderr = %output.stderr,
            "operation failed"
        );
    }
    Ok(output.status)
}
