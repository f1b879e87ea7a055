//! Backup, edit, restore
//!
//! A [`BackupRegistry`] hands out [`BackupEdit`] sessions. The caller
//! writes to a scratch copy of the target file; committing the scope moves
//! the scratch copy onto the target (atomically where the platform allows),
//! and [`BackupEdit::restore`] later puts the pre-edit state back, using a
//! backup snapshot taken when the scope was entered. Sessions are grouped
//! by a context name so teardown code can restore a whole batch at once.
//!
//! # Example
//!
//! ```no_run
//! use harness_fs::{BackupRegistry, EditMode};
//! use std::io::Write;
//!
//! let registry = BackupRegistry::new();
//! registry.with_edit("ssh_harness", "/home/me/.ssh/config", EditMode::Append, |f| {
//!     writeln!(f, "Host test-harness")
//! })?;
//!
//! // ... run against the patched config ...
//!
//! registry.clear_context("ssh_harness")?;
//! # Ok::<(), harness_fs::Error>(())
//! ```

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::io::replace_file;
use crate::{Error, Result};

/// Default suffix for the backup copy. The edit copy gets `new-<suffix>`.
const DEFAULT_SUFFIX: &str = "backup";

/// How the edit copy is opened, mirroring `fopen`-style modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// Keep the existing content, write at the end (`a`).
    Append,
    /// Start from an empty file (`w`).
    Truncate,
    /// Keep the existing content, rewrite in place (`r+`).
    Update,
    /// Rejected at construction: backing a file up to do nothing with it
    /// makes no sense (`r`).
    ReadOnly,
}

impl EditMode {
    /// Whether the edit copy is seeded with the target's current content.
    fn keeps_content(self) -> bool {
        matches!(self, Self::Append | Self::Update)
    }
}

/// Restore bookkeeping held by the registry for one active edit.
#[derive(Debug)]
struct RestorePoint {
    token: u64,
    edit_path: PathBuf,
    backup_path: PathBuf,
    /// None until the scope is entered.
    have_backup: Option<bool>,
}

type ContextMap = HashMap<String, HashMap<PathBuf, RestorePoint>>;

/// Registry of active edits, partitioned by context name.
///
/// One registry instance is owned by whichever component orchestrates the
/// backups; there is no process-global state. The interior mutex makes the
/// registry safe to share, though the surrounding code is single-threaded.
#[derive(Debug, Default)]
pub struct BackupRegistry {
    contexts: Mutex<ContextMap>,
    next_token: AtomicU64,
}

impl BackupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ContextMap> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open an edit session for `path` under `context` with the default
    /// backup suffix.
    pub fn edit(
        &self,
        context: &str,
        path: impl Into<PathBuf>,
        mode: EditMode,
    ) -> Result<BackupEdit<'_>> {
        self.edit_with_suffix(context, path, mode, DEFAULT_SUFFIX)
    }

    /// Open an edit session with an explicit backup suffix.
    ///
    /// Registration happens before any file I/O so that a second attempt
    /// to back up the same file is caught early with
    /// [`Error::AlreadyBackedUp`].
    pub fn edit_with_suffix(
        &self,
        context: &str,
        path: impl Into<PathBuf>,
        mode: EditMode,
        suffix: &str,
    ) -> Result<BackupEdit<'_>> {
        let target: PathBuf = path.into();
        if mode == EditMode::ReadOnly {
            return Err(Error::InvalidMode { path: target });
        }

        let edit_path = suffixed(&target, &format!("new-{suffix}"));
        let backup_path = suffixed(&target, suffix);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        {
            let mut contexts = self.lock();
            let entries = contexts.entry(context.to_string()).or_default();
            if entries.contains_key(&target) {
                return Err(Error::AlreadyBackedUp {
                    context: context.to_string(),
                    path: target,
                });
            }
            entries.insert(
                target.clone(),
                RestorePoint {
                    token,
                    edit_path: edit_path.clone(),
                    backup_path: backup_path.clone(),
                    have_backup: None,
                },
            );
        }

        // The caller expects the existing content, so seed the edit copy.
        if mode.keeps_content() && target.is_file() {
            if let Err(e) = fs::copy(&target, &edit_path) {
                self.forget(context, &target, token);
                return Err(Error::io(&edit_path, e));
            }
        }

        let file = match open_edit_file(&edit_path, mode) {
            Ok(f) => f,
            Err(e) => {
                self.forget(context, &target, token);
                return Err(e);
            }
        };

        debug!(context, target = %target.display(), ?mode, "edit session opened");
        Ok(BackupEdit {
            registry: self,
            context: context.to_string(),
            target,
            edit_path,
            backup_path,
            file: Some(file),
            token,
            entered: false,
            restored: false,
        })
    }

    /// Run `body` inside a fully managed edit scope.
    ///
    /// The scope is entered, `body` runs with the writer, and the edit is
    /// committed onto the target no matter how `body` ends; an error from
    /// `body` propagates only after that cleanup has run.
    pub fn with_edit<T, F>(
        &self,
        context: &str,
        path: impl Into<PathBuf>,
        mode: EditMode,
        body: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut EditScope<'_, '_>) -> io::Result<T>,
    {
        let mut edit = self.edit(context, path, mode)?;
        let mut scope = edit.enter()?;
        let outcome = body(&mut scope);
        let committed = scope.commit();
        let target = edit.target().to_path_buf();
        let value = outcome.map_err(|e| Error::io(target, e))?;
        committed?;
        Ok(value)
    }

    /// Restore exactly the edit registered at (context, path).
    ///
    /// Fails with [`Error::NotRegistered`] when nothing is registered
    /// there.
    pub fn clear(&self, context: &str, path: impl AsRef<Path>) -> Result<()> {
        let target = path.as_ref().to_path_buf();
        let point = self
            .lock()
            .get_mut(context)
            .and_then(|entries| entries.remove(&target));
        match point {
            Some(point) => restore_files(&target, &point),
            None => Err(Error::NotRegistered {
                context: context.to_string(),
                path: target,
            }),
        }
    }

    /// Restore every edit registered under `context`, in unspecified
    /// order. Unknown contexts are a no-op.
    ///
    /// All entries are attempted even when one fails; the first failure is
    /// returned afterwards.
    pub fn clear_context(&self, context: &str) -> Result<()> {
        let Some(entries) = self.lock().remove(context) else {
            return Ok(());
        };

        let mut first_error = None;
        for (target, point) in entries {
            if let Err(e) = restore_files(&target, &point) {
                warn!(context, target = %target.display(), error = %e, "restore failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Whether an edit is currently registered at (context, path).
    pub fn is_registered(&self, context: &str, path: impl AsRef<Path>) -> bool {
        self.lock()
            .get(context)
            .is_some_and(|entries| entries.contains_key(path.as_ref()))
    }

    /// Record the entered state for an active edit.
    fn mark_entered(
        &self,
        context: &str,
        target: &Path,
        token: u64,
        have_backup: bool,
    ) -> Result<()> {
        let mut contexts = self.lock();
        match contexts
            .get_mut(context)
            .and_then(|entries| entries.get_mut(target))
        {
            Some(point) if point.token == token => {
                point.have_backup = Some(have_backup);
                Ok(())
            }
            _ => Err(Error::NotRegistered {
                context: context.to_string(),
                path: target.to_path_buf(),
            }),
        }
    }

    /// Restore on behalf of one specific editor.
    ///
    /// A missing entry means a bulk `clear_context` already restored it:
    /// that is the idempotent no-op case. An entry held by a different
    /// editor is an internal consistency error.
    fn clear_token(&self, context: &str, target: &Path, token: u64) -> Result<()> {
        let point = {
            let mut contexts = self.lock();
            let Some(entries) = contexts.get_mut(context) else {
                return Ok(());
            };
            match entries.get(target) {
                None => return Ok(()),
                Some(point) if point.token != token => {
                    return Err(Error::NotRegistered {
                        context: context.to_string(),
                        path: target.to_path_buf(),
                    });
                }
                Some(_) => entries.remove(target),
            }
        };
        match point {
            Some(point) => restore_files(target, &point),
            None => Ok(()),
        }
    }

    /// Drop a registration that never became usable (construction failed).
    fn forget(&self, context: &str, target: &Path, token: u64) {
        let mut contexts = self.lock();
        if let Some(entries) = contexts.get_mut(context)
            && entries.get(target).is_some_and(|p| p.token == token)
        {
            entries.remove(target);
        }
    }
}

/// Put the pre-edit state back for one restore point.
fn restore_files(target: &Path, point: &RestorePoint) -> Result<()> {
    // A still-pending edit copy is scratch state; it never survives
    // restore.
    if point.edit_path.is_file() {
        fs::remove_file(&point.edit_path).map_err(|e| Error::io(&point.edit_path, e))?;
    }
    match point.have_backup {
        Some(true) => replace_file(&point.backup_path, target),
        Some(false) => fs::remove_file(target).map_err(|e| Error::io(target, e)),
        // The scope was never entered: the target has not been touched.
        None => Ok(()),
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn open_edit_file(path: &Path, mode: EditMode) -> Result<File> {
    let mut options = OpenOptions::new();
    match mode {
        EditMode::Append => options.append(true).create(true),
        EditMode::Truncate => options.write(true).create(true).truncate(true),
        EditMode::Update => options.read(true).write(true).create(true),
        EditMode::ReadOnly => {
            return Err(Error::InvalidMode {
                path: path.to_path_buf(),
            });
        }
    };
    options.open(path).map_err(|e| Error::io(path, e))
}

/// One in-flight edit of one file.
///
/// Writes go to the edit copy (`target.new-<suffix>`); committing the
/// scope moves the copy onto the target. [`BackupEdit::enter`] snapshots
/// the pre-edit state first so [`BackupEdit::restore`] can put it back.
#[derive(Debug)]
pub struct BackupEdit<'r> {
    registry: &'r BackupRegistry,
    context: String,
    target: PathBuf,
    edit_path: PathBuf,
    backup_path: PathBuf,
    file: Option<File>,
    token: u64,
    entered: bool,
    restored: bool,
}

impl<'r> BackupEdit<'r> {
    /// The file being edited, from the caller's perspective.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The scratch copy the scope actually writes to.
    pub fn edit_path(&self) -> &Path {
        &self.edit_path
    }

    /// The snapshot of the pre-edit content, present only while a backup
    /// exists.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Enter the edit scope: snapshot the target (when it exists) and hand
    /// out the writer.
    ///
    /// Scope objects are single-use; a second call fails with
    /// [`Error::IllegalReuse`] and leaves all files untouched.
    pub fn enter(&mut self) -> Result<EditScope<'_, 'r>> {
        if self.entered {
            return Err(Error::IllegalReuse {
                path: self.target.clone(),
            });
        }
        self.entered = true;

        let have_backup = self.target.is_file();
        if have_backup {
            fs::copy(&self.target, &self.backup_path)
                .map_err(|e| Error::io(&self.backup_path, e))?;
        }
        self.registry
            .mark_entered(&self.context, &self.target, self.token, have_backup)?;

        debug!(target = %self.target.display(), have_backup, "edit scope entered");
        Ok(EditScope {
            edit: self,
            committed: false,
        })
    }

    /// Restore the target to its pre-edit state and deregister.
    ///
    /// Idempotent: a second call (or a call after a bulk
    /// [`BackupRegistry::clear_context`] already restored this entry) is a
    /// no-op. If the target pre-existed it is put back from the backup;
    /// otherwise it is removed. A never-entered edit only discards its
    /// scratch copy.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        // Close our handle before the files shuffle underneath it.
        self.file.take();
        self.registry
            .clear_token(&self.context, &self.target, self.token)?;
        self.restored = true;
        debug!(target = %self.target.display(), "edit restored");
        Ok(())
    }
}

/// Active edit scope handed out by [`BackupEdit::enter`].
///
/// Implements [`Write`] (and [`Read`], for [`EditMode::Update`] sessions)
/// against the edit copy. Dropping the scope commits it best-effort;
/// [`EditScope::commit`] does the same with error propagation and should
/// be preferred.
#[derive(Debug)]
pub struct EditScope<'a, 'r> {
    edit: &'a mut BackupEdit<'r>,
    committed: bool,
}

impl EditScope<'_, '_> {
    /// Close the edit handle and move the edit copy onto the target.
    pub fn commit(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.committed {
            return Ok(());
        }
        self.committed = true;
        // The handle must be closed before the move on platforms that
        // lock open files.
        self.edit.file.take();
        replace_file(&self.edit.edit_path, &self.edit.target)
    }
}

impl Drop for EditScope<'_, '_> {
    fn drop(&mut self) {
        if !self.committed
            && let Err(e) = self.finish()
        {
            // Leave the edit copy in place for inspection rather than
            // discard data.
            warn!(
                target = %self.edit.target.display(),
                error = %e,
                "commit on scope exit failed"
            );
        }
    }
}

impl Write for EditScope<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.edit.file.as_mut() {
            Some(f) => f.write(buf),
            None => Err(closed_handle()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.edit.file.as_mut() {
            Some(f) => f.flush(),
            None => Err(closed_handle()),
        }
    }
}

impl Read for EditScope<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.edit.file.as_mut() {
            Some(f) => f.read(buf),
            None => Err(closed_handle()),
        }
    }
}

fn closed_handle() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "edit scope already closed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_truncate_on_absent_target() {
        // Scenario A: write mode against a file that does not exist yet.
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Truncate).unwrap();
        let edit_path = edit.edit_path().to_path_buf();
        let mut scope = edit.enter().unwrap();
        scope.write_all(b"hello").unwrap();
        scope.commit().unwrap();

        assert!(!edit_path.exists());
        assert_eq!(read(&target), "hello");

        edit.restore().unwrap();
        assert!(!target.exists());
        assert!(!registry.is_registered("ctx", &target));
    }

    #[test]
    fn test_append_with_backup() {
        // Scenario B: append to an existing file, then roll it back.
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Append).unwrap();
        assert_eq!(read(edit.edit_path()), "abc");
        let backup_path = edit.backup_path().to_path_buf();

        let mut scope = edit.enter().unwrap();
        assert_eq!(read(&backup_path), "abc");
        scope.write_all(b".").unwrap();
        scope.commit().unwrap();

        assert_eq!(read(&target), "abc.");
        assert_eq!(read(&backup_path), "abc");

        edit.restore().unwrap();
        assert_eq!(read(&target), "abc");
        assert!(!backup_path.exists());
    }

    #[test]
    fn test_reentry_is_rejected() {
        // Scenario C: scopes are single-use.
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Append).unwrap();
        let scope = edit.enter().unwrap();
        scope.commit().unwrap();

        let err = edit.enter().unwrap_err();
        assert!(matches!(err, Error::IllegalReuse { .. }));
        // File state is unchanged from just before the second attempt.
        assert_eq!(read(&target), "abc");
        assert_eq!(read(edit.backup_path()), "abc");
    }

    #[test]
    fn test_clear_context_restores_everything() {
        // Scenario D: one originally-existing file, one originally-absent.
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("existing");
        let absent = temp.path().join("absent");
        fs::write(&existing, "original").unwrap();
        let registry = BackupRegistry::new();

        registry
            .with_edit("ctx", &existing, EditMode::Append, |f| f.write_all(b"+more"))
            .unwrap();
        registry
            .with_edit("ctx", &absent, EditMode::Truncate, |f| f.write_all(b"fresh"))
            .unwrap();
        assert_eq!(read(&existing), "original+more");
        assert_eq!(read(&absent), "fresh");

        registry.clear_context("ctx").unwrap();

        assert_eq!(read(&existing), "original");
        assert!(!absent.exists());
        assert!(!registry.is_registered("ctx", &existing));
        assert!(!registry.is_registered("ctx", &absent));
    }

    #[test]
    fn test_clear_context_unknown_is_noop() {
        let registry = BackupRegistry::new();
        registry.clear_context("never-seen").unwrap();
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let mut first = registry.edit("ctx", &target, EditMode::Append).unwrap();
        let scope = first.enter().unwrap();
        scope.commit().unwrap();

        let err = registry.edit("ctx", &target, EditMode::Append).unwrap_err();
        assert!(matches!(err, Error::AlreadyBackedUp { .. }));
        // The first editor's backup is undisturbed.
        assert_eq!(read(first.backup_path()), "abc");

        // The same path in another context is fine.
        registry.edit("other", &target, EditMode::Append).unwrap();
    }

    #[test]
    fn test_restore_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Append).unwrap();
        let mut scope = edit.enter().unwrap();
        scope.write_all(b"X").unwrap();
        scope.commit().unwrap();

        edit.restore().unwrap();
        edit.restore().unwrap();
        assert_eq!(read(&target), "abc");
    }

    #[test]
    fn test_restore_after_clear_context_is_noop() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Append).unwrap();
        let scope = edit.enter().unwrap();
        scope.commit().unwrap();

        registry.clear_context("ctx").unwrap();
        edit.restore().unwrap();
        assert_eq!(read(&target), "abc");
    }

    #[test]
    fn test_read_only_mode_is_rejected() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        let registry = BackupRegistry::new();

        let err = registry.edit("ctx", &target, EditMode::ReadOnly).unwrap_err();
        assert!(matches!(err, Error::InvalidMode { .. }));
        assert!(!registry.is_registered("ctx", &target));
    }

    #[rstest]
    #[case(EditMode::Append, "abc")]
    #[case(EditMode::Update, "abc")]
    #[case(EditMode::Truncate, "")]
    fn test_edit_copy_seeding(#[case] mode: EditMode, #[case] expected: &str) {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let edit = registry.edit("ctx", &target, mode).unwrap();
        assert_eq!(read(edit.edit_path()), expected);
    }

    #[test]
    fn test_update_seeds_edit_copy() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Update).unwrap();
        let mut scope = edit.enter().unwrap();
        let mut content = String::new();
        scope.read_to_string(&mut content).unwrap();
        assert_eq!(content, "abc");
    }

    #[test]
    fn test_update_on_absent_target_is_empty() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        let registry = BackupRegistry::new();

        let edit = registry.edit("ctx", &target, EditMode::Update).unwrap();
        assert_eq!(read(edit.edit_path()), "");
    }

    #[test]
    fn test_with_edit_commits_before_propagating_body_error() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        let registry = BackupRegistry::new();

        let err = registry
            .with_edit("ctx", &target, EditMode::Truncate, |f| {
                f.write_all(b"partial")?;
                Err::<(), _>(io::Error::other("body failed"))
            })
            .unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        // Cleanup ran anyway: the edit copy replaced the target.
        assert_eq!(read(&target), "partial");
        assert!(registry.is_registered("ctx", &target));

        registry.clear("ctx", &target).unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn test_drop_commits_unfinished_scope() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Truncate).unwrap();
        {
            let mut scope = edit.enter().unwrap();
            scope.write_all(b"dropped").unwrap();
            // Early exit path: no explicit commit.
        }
        assert_eq!(read(&target), "dropped");
        assert!(!edit.edit_path().exists());
    }

    #[test]
    fn test_restore_before_enter_discards_scratch() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Append).unwrap();
        let edit_path = edit.edit_path().to_path_buf();
        assert!(edit_path.exists());

        edit.restore().unwrap();

        assert!(!edit_path.exists());
        assert_eq!(read(&target), "abc");
        assert!(!registry.is_registered("ctx", &target));
    }

    #[test]
    fn test_clear_unknown_path_fails() {
        let registry = BackupRegistry::new();
        let err = registry.clear("ctx", "/no/such/file").unwrap_err();
        assert!(matches!(err, Error::NotRegistered { .. }));
    }

    #[test]
    fn test_custom_suffix_paths() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        let registry = BackupRegistry::new();

        let edit = registry
            .edit_with_suffix("ctx", &target, EditMode::Truncate, "orig")
            .unwrap();
        assert_eq!(edit.backup_path(), temp.path().join("target.orig"));
        assert_eq!(edit.edit_path(), temp.path().join("target.new-orig"));
    }

    #[test]
    fn test_restore_after_commit_leaves_no_scratch_files() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "abc").unwrap();
        let registry = BackupRegistry::new();

        let mut edit = registry.edit("ctx", &target, EditMode::Append).unwrap();
        {
            let mut scope = edit.enter().unwrap();
            scope.write_all(b"junk").unwrap();
            scope.commit().unwrap();
        }
        edit.restore().unwrap();

        assert!(!edit.edit_path().exists());
        assert!(!edit.backup_path().exists());
        assert_eq!(read(&target), "abc");
    }
}
