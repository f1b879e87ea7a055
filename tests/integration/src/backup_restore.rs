//! Cross-crate backup/edit/restore flows, driven the way the harness
//! drives them during a test run.

use std::fs;
use std::io::Write;
use std::path::Path;

use harness_fs::{BackupRegistry, EditMode, ThrowawayDir};
use harness_test_utils::TestTree;
use pretty_assertions::assert_eq;

#[test]
fn teardown_restores_every_patched_user_file() {
    let tree = TestTree::new();
    let config = tree.write_file(".ssh/config", "Host existing\n");
    let known_hosts = tree.path(".ssh/known_hosts");
    let registry = BackupRegistry::new();

    // Setup patches one existing file and creates one from scratch.
    registry
        .with_edit("ssh_harness", &config, EditMode::Append, |f| {
            writeln!(f, "Host test-harness")?;
            writeln!(f, "\tPort 2200")
        })
        .unwrap();
    registry
        .with_edit("ssh_harness", &known_hosts, EditMode::Append, |f| {
            writeln!(f, "|1|hash= ssh-ed25519 AAAA")
        })
        .unwrap();

    assert_eq!(
        tree.read_file(".ssh/config"),
        "Host existing\nHost test-harness\n\tPort 2200\n"
    );
    tree.assert_file_exists(".ssh/known_hosts");

    // Teardown restores the lot in one call.
    registry.clear_context("ssh_harness").unwrap();

    assert_eq!(tree.read_file(".ssh/config"), "Host existing\n");
    tree.assert_file_absent(".ssh/known_hosts");
    assert!(!registry.is_registered("ssh_harness", &config));
}

#[test]
fn contexts_are_restored_independently() {
    let tree = TestTree::new();
    let first = tree.write_file("first", "1");
    let second = tree.write_file("second", "2");
    let registry = BackupRegistry::new();

    registry
        .with_edit("ctx-a", &first, EditMode::Append, |f| f.write_all(b"+a"))
        .unwrap();
    registry
        .with_edit("ctx-b", &second, EditMode::Append, |f| f.write_all(b"+b"))
        .unwrap();

    registry.clear_context("ctx-a").unwrap();

    assert_eq!(tree.read_file("first"), "1");
    // The other context's edit is still in effect.
    assert_eq!(tree.read_file("second"), "2+b");

    registry.clear_context("ctx-b").unwrap();
    assert_eq!(tree.read_file("second"), "2");
}

#[test]
fn edits_survive_until_explicitly_restored() {
    let tree = TestTree::new();
    let target = tree.write_file("notes", "before");
    let registry = BackupRegistry::new();

    registry
        .with_edit("ctx", &target, EditMode::Truncate, |f| f.write_all(b"after"))
        .unwrap();

    // No scratch files linger next to the target.
    assert_eq!(tree.read_file("notes"), "after");
    tree.assert_file_absent("notes.new-backup");
    tree.assert_file_exists("notes.backup");

    registry.clear("ctx", &target).unwrap();
    assert_eq!(tree.read_file("notes"), "before");
    tree.assert_file_absent("notes.backup");
}

#[test]
fn relative_edits_inside_a_throwaway_dir() {
    // The other tests in this file use absolute paths only, so changing
    // the working directory here cannot disturb them.
    let dir = ThrowawayDir::new().unwrap();
    let registry = BackupRegistry::new();

    let _guard = dir.enter().unwrap();
    registry
        .with_edit("scratch", "notes.txt", EditMode::Truncate, |f| {
            f.write_all(b"scratch content")
        })
        .unwrap();
    assert_eq!(fs::read_to_string("notes.txt").unwrap(), "scratch content");

    registry.clear_context("scratch").unwrap();
    assert!(!Path::new("notes.txt").exists());
}
