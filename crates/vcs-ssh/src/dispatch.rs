//! SSH_ORIGINAL_COMMAND parsing and routing

use tracing::{debug, info};

use crate::cli::AccessRules;
use crate::error::Result;
use crate::handlers;

/// Which server-side handler a command line maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Mercurial,
    Git,
    Bazaar,
    Subversion,
    Unknown,
}

/// Match the exact command shapes the four VCS clients produce.
///
/// Anything looser would turn the wrapper into a shell, so unknown
/// variations are rejected rather than guessed at.
pub fn route(original: &str, cmdargv: &[String]) -> Route {
    let words: Vec<&str> = cmdargv.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["hg", "-R", _, "serve", "--stdio"] => Route::Mercurial,
        [command, _] if *command == "git-upload-pack" || *command == "git-receive-pack" => {
            Route::Git
        }
        ["bzr", "serve", "--inet", "--directory=/", "--allow-writes"] => Route::Bazaar,
        _ if original == "svnserve -t" => Route::Subversion,
        _ => Route::Unknown,
    }
}

/// Handle one SSH session; the returned status becomes the process exit
/// status.
pub fn dispatch(original: &str, rules: &AccessRules) -> Result<i32> {
    info!(command = original, "vcs-ssh started");
    debug!(
        read_only = ?rules.read_only,
        read_write = ?rules.read_write,
        "accessible repositories"
    );

    let cmdargv = match split_command(original) {
        Ok(argv) => argv,
        Err(reason) => return Ok(handlers::rejectcommand(original, Some(&reason))),
    };

    let status = match route(original, &cmdargv) {
        Route::Mercurial => handlers::hg_handle(&cmdargv, rules)?,
        Route::Git => handlers::git_handle(&cmdargv, rules)?,
        Route::Bazaar => {
            handlers::warn_no_access_control("Bazaar");
            handlers::bzr_handle(&cmdargv)?
        }
        Route::Subversion => {
            handlers::warn_no_access_control("Subversion");
            handlers::svn_handle(&cmdargv)?
        }
        Route::Unknown => handlers::rejectcommand(original, None),
    };

    info!(status, "vcs-ssh exiting");
    Ok(status)
}

/// Split a command line with shell quoting rules.
///
/// Whitespace separates words; single quotes preserve everything up to
/// the closing quote; double quotes honor backslash escapes for the
/// characters the shell would; a bare backslash escapes the next
/// character. Unbalanced quoting is an error, reported verbatim in the
/// rejection message.
pub fn split_command(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return Err("No closing quotation".to_string()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => {
                                if !matches!(escaped, '"' | '\\' | '$' | '`') {
                                    current.push('\\');
                                }
                                current.push(escaped);
                            }
                            None => return Err("No escaped character".to_string()),
                        },
                        Some(inner) => current.push(inner),
                        None => return Err("No closing quotation".to_string()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err("No escaped character".to_string()),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
