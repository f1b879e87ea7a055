//! vcs-ssh: grant SSH access to a selected set of VCS repositories
//!
//! Intended as the forced command in `~/.ssh/authorized_keys`, see
//! sshd(8):
//!
//! ```text
//! command="vcs-ssh --read-write ~/repo1 --read-only ~/repo2" ssh-ed25519 AAAA...
//! ```
//!
//! (probably together with these other useful options:
//! no-port-forwarding,no-X11-forwarding,no-agent-forwarding)
//!
//! This allows pull/push over ssh from/to the repositories given as
//! arguments. The requested command arrives in `SSH_ORIGINAL_COMMAND`;
//! it is matched against the fixed shapes the git, mercurial, bazaar and
//! subversion clients produce for their server sides, and relayed when
//! the repository is on the allow list.

mod cli;
mod dispatch;
mod error;
mod handlers;
mod paths;

use std::env;
use std::process;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{AccessRules, Cli};
use error::Result;

fn main() {
    // stderr is the SSH client's "remote:" channel, so logging stays
    // quiet unless RUST_LOG asks for more.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match run() {
        Ok(status) => process::exit(status),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let rules = AccessRules::from_cli(cli)?;
    let original = env::var("SSH_ORIGINAL_COMMAND").unwrap_or_else(|_| "?".to_string());
    dispatch::dispatch(&original, &rules)
}
