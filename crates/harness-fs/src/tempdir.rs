//! Throwaway working directories

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use tracing::warn;

use crate::{Error, Result};

/// A pristine temporary directory the process can step into.
///
/// [`ThrowawayDir::enter`] changes the working directory and hands back a
/// guard; dropping the guard steps back to wherever the process was
/// before. The directory itself, and everything left inside it, is
/// removed when the `ThrowawayDir` is dropped.
pub struct ThrowawayDir {
    dir: TempDir,
}

impl ThrowawayDir {
    /// Create a throwaway directory under the system temp location.
    pub fn new() -> Result<Self> {
        Self::with_prefix("throw-")
    }

    /// Create a throwaway directory with a custom name prefix.
    pub fn with_prefix(prefix: &str) -> Result<Self> {
        let dir = Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| Error::io(env::temp_dir(), e))?;
        Ok(Self { dir })
    }

    /// Create a throwaway directory under `parent`, creating `parent`
    /// first when needed.
    ///
    /// The parent is canonicalized so the path stays valid (and safe to
    /// delete) after the working directory changes.
    pub fn in_dir(parent: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let parent = parent.as_ref();
        if !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let parent = parent.canonicalize().map_err(|e| Error::io(parent, e))?;
        let dir = Builder::new()
            .prefix(prefix)
            .tempdir_in(&parent)
            .map_err(|e| Error::io(&parent, e))?;
        Ok(Self { dir })
    }

    /// Path of the temporary directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Step into the directory until the returned guard drops.
    pub fn enter(&self) -> Result<DirGuard> {
        let oldpwd = env::current_dir().map_err(|e| Error::io(self.path(), e))?;
        env::set_current_dir(self.path()).map_err(|e| Error::io(self.path(), e))?;
        Ok(DirGuard { oldpwd })
    }
}

/// Guard returned by [`ThrowawayDir::enter`]; restores the previous
/// working directory on drop.
pub struct DirGuard {
    oldpwd: PathBuf,
}

impl DirGuard {
    /// The working directory the process will return to.
    pub fn old_path(&self) -> &Path {
        &self.oldpwd
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.oldpwd) {
            warn!(oldpwd = %self.oldpwd.display(), error = %e, "could not step back");
        }
    }
}
