//! Key generation through ssh-keygen

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::process::run_command;
use crate::{Error, Result};

/// Comment embedded in every generated key.
const KEY_COMMENT: &str = "Weak key generated for test purposes only *DO NOT DISSEMINATE*";

/// Key algorithms the harness generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Ecdsa,
    Ed25519,
}

impl KeyType {
    /// Algorithm name as ssh-keygen spells it.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::Ecdsa => "ecdsa",
            Self::Ed25519 => "ed25519",
        }
    }

    /// Smallest key size ssh-keygen still accepts, to keep test start-up
    /// cheap. Ed25519 keys have a fixed size.
    pub fn bits(self) -> Option<&'static str> {
        match self {
            Self::Rsa => Some("1024"),
            Self::Ecdsa => Some("256"),
            Self::Ed25519 => None,
        }
    }

    /// Guess the type from a key file name.
    pub fn guess(file_name: &str) -> Self {
        let lowered = file_name.to_lowercase();
        if lowered.contains("ed25519") {
            Self::Ed25519
        } else if lowered.contains("ecdsa") {
            Self::Ecdsa
        } else {
            Self::Rsa
        }
    }
}

/// Generate one passphrase-less keypair, replacing any stale one.
///
/// The private key ends up mode 0400 so sshd's strict-modes check accepts
/// it.
pub fn generate_keypair(keygen_bin: &Path, key_type: KeyType, key_file: &Path) -> Result<()> {
    if key_file.is_file() {
        fs::remove_file(key_file).map_err(|e| Error::io(key_file, e))?;
    }

    let keygen = keygen_bin.display().to_string();
    let key_path = key_file.display().to_string();
    let mut argv = vec![keygen.as_str(), "-t", key_type.name()];
    if let Some(bits) = key_type.bits() {
        argv.extend(["-b", bits]);
    }
    argv.extend(["-N", "", "-f", key_path.as_str(), "-C", KEY_COMMENT]);

    debug!(key = %key_file.display(), algorithm = key_type.name(), "generating keypair");
    let output = run_command(&argv, None)?;
    if !output.success() {
        return Err(Error::CommandFailed {
            program: keygen,
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    restrict_key_mode(key_file)
}

#[cfg(unix)]
fn restrict_key_mode(key_file: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(key_file, fs::Permissions::from_mode(0o400))
        .map_err(|e| Error::io(key_file, e))
}

#[cfg(not(unix))]
fn restrict_key_mode(_key_file: &Path) -> Result<()> {
    Ok(())
}
