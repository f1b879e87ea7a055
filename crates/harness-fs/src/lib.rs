//! Reversible filesystem operations for the SSH test harness
//!
//! Provides edit sessions that back a file up before touching it and can
//! put it back afterwards, plus throwaway working directories and atomic
//! write helpers.

pub mod edit;
pub mod error;
pub mod io;
pub mod tempdir;

pub use edit::{BackupEdit, BackupRegistry, EditMode, EditScope};
pub use error::{Error, Result};
pub use tempdir::{DirGuard, ThrowawayDir};
