//! VCS-specific session handlers

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::cli::AccessRules;
use crate::error::{CliError, Result};
use crate::paths::normalize_repo_path;

/// Exit status when the requested server-side command is not installed.
const MISSING_COMMAND_STATUS: i32 = 254;
/// Exit status for every rejection.
const REJECTED_STATUS: i32 = 255;

/// Refuse a push into a read-only repository.
pub fn rejectpush() -> i32 {
    eprintln!(
        "remote: \u{1b}[1;41mYou only have read only access to this \
         repository\u{1b}[0m: you cannot push anything into it !"
    );
    REJECTED_STATUS
}

pub fn rejectrepo(repo: &Path) -> i32 {
    warn!(repo = %repo.display(), "illegal repository");
    eprintln!("Illegal repository \"{}\"", repo.display());
    REJECTED_STATUS
}

pub fn rejectcommand(command: &str, extra: Option<&str>) -> i32 {
    match extra {
        Some(extra) => eprintln!("remote: Illegal command \"{command}\": {extra}"),
        None => eprintln!("remote: Illegal command \"{command}\""),
    }
    REJECTED_STATUS
}

pub fn warn_no_access_control(vcs_name: &str) {
    eprintln!("remote: Warning: using {vcs_name}: no access control enforced!");
}

/// Serve a `git-upload-pack` / `git-receive-pack` request.
pub fn git_handle(cmdargv: &[String], rules: &AccessRules) -> Result<i32> {
    if let Some(status) = ensure_command(&cmdargv[0]) {
        return Ok(status);
    }

    let repo = normalize_repo_path(&cmdargv[1]);
    if !rules.is_known(&repo) {
        return Ok(rejectrepo(&repo));
    }
    if rules.is_read_only(&repo) && cmdargv[0] == "git-receive-pack" {
        return Ok(rejectpush());
    }

    let argv = vec![cmdargv[0].clone(), repo.display().to_string()];
    pipe_dispatch(&argv)
}

/// Serve an `hg -R <repo> serve --stdio` request.
pub fn hg_handle(cmdargv: &[String], rules: &AccessRules) -> Result<i32> {
    if let Some(status) = ensure_command("hg") {
        return Ok(status);
    }

    let repo = normalize_repo_path(&cmdargv[2]);
    let mut argv = vec![
        "hg".to_string(),
        "-R".to_string(),
        repo.display().to_string(),
        "serve".to_string(),
        "--stdio".to_string(),
    ];
    if rules.is_read_only(&repo) {
        // hg aborts the incoming change when a pre-change hook exits
        // nonzero; `false` does exactly that, so pulls work and pushes
        // fail server-side.
        for hook in [
            "hooks.prechangegroup.vcs-ssh=false",
            "hooks.prepushkey.vcs-ssh=false",
        ] {
            argv.push("--config".to_string());
            argv.push(hook.to_string());
        }
    } else if !rules.is_read_write(&repo) {
        return Ok(rejectrepo(&repo));
    }

    pipe_dispatch(&argv)
}

/// Relay a `bzr serve` request unchanged.
pub fn bzr_handle(cmdargv: &[String]) -> Result<i32> {
    if let Some(status) = ensure_command("bzr") {
        return Ok(status);
    }
    pipe_dispatch(cmdargv)
}

/// Relay an `svnserve -t` request unchanged.
pub fn svn_handle(cmdargv: &[String]) -> Result<i32> {
    if let Some(status) = ensure_command("svnserve") {
        return Ok(status);
    }
    pipe_dispatch(cmdargv)
}

/// Relay the command with stdio inherited, which is the SSH channel.
pub fn pipe_dispatch(argv: &[String]) -> Result<i32> {
    debug!(command = %argv.join(" "), "dispatching via a pipe");
    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .map_err(|e| CliError::Spawn {
            program: argv[0].clone(),
            source: e,
        })?;
    Ok(status.code().unwrap_or(REJECTED_STATUS))
}

/// Feedback that is much nicer than a raw spawn failure when the
/// server-side command is missing.
fn ensure_command(program: &str) -> Option<i32> {
    if find_in_path(program).is_some() {
        return None;
    }
    eprintln!(
        "The command required to fulfill your request has not been found on this system."
    );
    Some(MISSING_COMMAND_STATUS)
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
