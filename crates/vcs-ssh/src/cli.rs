//! Command line definition and access rules

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::{CliError, Result};
use crate::paths::normalize_repo_path;

/// Share multiple vcs repositories of different kinds on a single user
/// account, via ssh.
#[derive(Debug, Parser)]
#[command(name = "vcs-ssh", version, about)]
pub struct Cli {
    /// More repository directories, accessible in r/w mode
    #[arg(value_name = "DIR")]
    pub more_rw_dirs: Vec<String>,

    /// Path to repository directories, to which grant read-only access
    #[arg(long = "read-only", value_name = "DIR", num_args = 1..)]
    pub read_only: Vec<String>,

    /// Path to repository directories, to which grant access in r/w mode
    #[arg(long = "read-write", value_name = "DIR", num_args = 1..)]
    pub read_write: Vec<String>,

    /// Load additional allow lists from a TOML file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Allow lists as they appear in a `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileRules {
    read_only: Vec<String>,
    read_write: Vec<String>,
}

/// Normalized repository allow lists.
#[derive(Debug, Default, Clone)]
pub struct AccessRules {
    pub read_write: Vec<PathBuf>,
    pub read_only: Vec<PathBuf>,
}

impl AccessRules {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let mut rules = Self::default();
        if let Some(path) = &cli.config {
            let content = fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
                path: path.clone(),
                source: e,
            })?;
            let file_rules: FileRules =
                toml::from_str(&content).map_err(|e| CliError::ConfigParse {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            rules.add(&file_rules.read_write, &file_rules.read_only);
        }
        rules.add(&cli.read_write, &cli.read_only);
        rules.add(&cli.more_rw_dirs, &[]);
        Ok(rules)
    }

    fn add(&mut self, read_write: &[String], read_only: &[String]) {
        self.read_write
            .extend(read_write.iter().map(|dir| normalize_repo_path(dir)));
        self.read_only
            .extend(read_only.iter().map(|dir| normalize_repo_path(dir)));
    }

    pub fn is_read_write(&self, repo: &Path) -> bool {
        self.read_write.iter().any(|dir| dir == repo)
    }

    pub fn is_read_only(&self, repo: &Path) -> bool {
        self.read_only.iter().any(|dir| dir == repo)
    }

    pub fn is_known(&self, repo: &Path) -> bool {
        self.is_read_write(repo) || self.is_read_only(repo)
    }
}
