//! Disposable OpenSSH daemon provisioning
//!
//! Sets up everything an SSH-dependent client test needs (host and user
//! keys, an sshd configuration, `authorized_keys`, patched
//! `known_hosts`/`config` files), starts the daemon, and tears the whole
//! thing down afterwards, restoring any user file it touched.

pub mod config;
pub mod error;
pub mod harness;
pub mod keys;
pub mod process;

pub use config::{AuthMethod, HarnessConfig, HarnessPaths};
pub use error::{Error, Result};
pub use harness::SshHarness;
pub use keys::KeyType;
pub use process::{CommandOutput, run_command, run_command_warn_if_fails};
