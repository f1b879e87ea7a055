//! Error types for ssh-harness

use std::path::PathBuf;

/// Result type for ssh-harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while provisioning or running the daemon
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The environment is missing pieces the daemon needs; one line per
    /// problem so a test runner can report (or skip on) all of them at
    /// once
    #[error("Preconditions not met:\n  - {}", failures.join("\n  - "))]
    Preconditions { failures: Vec<String> },

    #[error("{program} failed with status {status}:\n==STDOUT==\n{stdout}\n==STDERR==\n{stderr}")]
    CommandFailed {
        program: String,
        status: i32,
        stdout: String,
        stderr: String,
    },

    #[error("sshd is not starting or crashing at startup (no pidfile at {pidfile})")]
    DaemonNotStarting { pidfile: PathBuf },

    #[error("ssh-keyscan found no host keys over IPv4 or IPv6")]
    KeyscanFailed,

    #[error("No home directory for the current user")]
    NoHomeDirectory,

    #[error("Failed to parse harness config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Error from the backup/edit layer
    #[error(transparent)]
    Fs(#[from] harness_fs::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
