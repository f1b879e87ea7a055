//! Repository path normalization

use std::env;
use std::path::{Component, Path, PathBuf};

/// Expand a leading `~`, make the path absolute against the current
/// directory, and resolve `.`/`..` lexically.
///
/// Normalization is purely lexical: an unknown repository must still
/// normalize so the rejection message can show what was actually looked
/// up. `~user` forms are left alone; the wrapper only ever serves one
/// account.
pub fn normalize_repo_path(raw: &str) -> PathBuf {
    let expanded = expand_user(raw);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    };
    normalize_components(&absolute)
}

fn expand_user(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

fn normalize_components(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // `/..` stays `/`; the path is absolute by now.
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
