//! Harness provisioning against a scratch `~/.ssh`, plus an opt-in
//! round trip against a live daemon.
//!
//! Provisioning tests skip (by returning early with a note) when the
//! OpenSSH client tools are not installed; the live-daemon test is
//! `#[ignore]`d because it additionally needs `sshd` and `git`.

use std::path::Path;
use std::process::Command;

use harness_test_utils::{TestTree, git};
use ssh_harness::{HarnessConfig, SshHarness};

fn scratch_config(tree: &TestTree) -> HarnessConfig {
    HarnessConfig {
        base_dir: tree.path("sshd"),
        ssh_home: Some(tree.path("dot-ssh")),
        update_ssh_config: true,
        ..HarnessConfig::default()
    }
}

fn keygen_available(config: &HarnessConfig) -> bool {
    if config.ssh_keygen_bin.is_file() {
        return true;
    }
    eprintln!(
        "skipping: {} not installed",
        config.ssh_keygen_bin.display()
    );
    false
}

#[test]
fn provision_generates_fixtures_and_teardown_removes_them() {
    let tree = TestTree::new();
    let config = scratch_config(&tree);
    if !keygen_available(&config) {
        return;
    }

    let mut harness = SshHarness::new(config).unwrap();
    harness.provision().unwrap();

    for relative in [
        "sshd/sshd_config",
        "sshd/host_ssh_rsa_key",
        "sshd/host_ssh_rsa_key.pub",
        "sshd/host_ssh_ecdsa_key",
        "sshd/host_ssh_ed25519_key",
        "sshd/id_rsa",
        "sshd/id_rsa.pub",
        "sshd/authorized_keys",
    ] {
        tree.assert_file_exists(relative);
    }

    // The authorized_keys entry is the generated user public key.
    let public_key = tree.read_file("sshd/id_rsa.pub");
    assert_eq!(tree.read_file("sshd/authorized_keys"), public_key);

    let rendered = tree.read_file("sshd/sshd_config");
    assert!(rendered.contains("Port 2200"));
    assert!(rendered.contains("PubkeyAuthentication yes"));

    harness.teardown().unwrap();
    for relative in [
        "sshd/sshd_config",
        "sshd/host_ssh_rsa_key",
        "sshd/host_ssh_rsa_key.pub",
        "sshd/id_rsa",
        "sshd/authorized_keys",
    ] {
        tree.assert_file_absent(relative);
    }
}

#[test]
fn provision_writes_and_teardown_restores_environment_file() {
    let tree = TestTree::new();
    let mut config = scratch_config(&tree);
    config.environment_file = true;
    config
        .environment
        .insert("VCS_SSH_TEST".into(), "1".into());
    if !keygen_available(&config) {
        return;
    }

    let mut harness = SshHarness::new(config).unwrap();
    harness.provision().unwrap();

    assert_eq!(tree.read_file("dot-ssh/environment"), "VCS_SSH_TEST=1\n");

    harness.teardown().unwrap();
    // It did not exist before provisioning, so restoring means removal.
    tree.assert_file_absent("dot-ssh/environment");
}

#[test]
fn provision_reports_missing_tools_as_preconditions() {
    let tree = TestTree::new();
    let config = HarnessConfig {
        sshd_bin: tree.path("missing/sshd"),
        ssh_keygen_bin: tree.path("missing/ssh-keygen"),
        ssh_keyscan_bin: tree.path("missing/ssh-keyscan"),
        ..scratch_config(&tree)
    };

    let mut harness = SshHarness::new(config).unwrap();
    let err = harness.provision().unwrap_err();
    assert!(matches!(err, ssh_harness::Error::Preconditions { .. }));
}

/// Full round trip: start the daemon, clone a repository through it.
#[test]
#[ignore = "requires a local OpenSSH installation (sshd, ssh-keygen, ssh-keyscan) and git"]
fn clone_through_live_daemon() {
    let tree = TestTree::new();
    let config = HarnessConfig {
        // High port to dodge anything else a developer machine runs.
        port: 2230,
        update_ssh_config: false,
        ..scratch_config(&tree)
    };
    let user_key = tree.path("sshd/id_rsa");
    let known_hosts = tree.path("dot-ssh/known_hosts");

    let upstream = tree.path("upstream");
    std::fs::create_dir_all(&upstream).unwrap();
    git::seeded_repo(&upstream);

    let mut harness = SshHarness::new(config).unwrap();
    harness.setup().unwrap();
    assert!(harness.running());
    tree.assert_file_exists("sshd/sshd.pid");
    tree.assert_file_exists("dot-ssh/known_hosts");

    let clone_dir = tree.path("clone");
    let status = Command::new("git")
        .arg("clone")
        .arg(format!("ssh://localhost:2230{}", upstream.display()))
        .arg(&clone_dir)
        .env("GIT_SSH_COMMAND", ssh_command(&user_key, &known_hosts))
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git clone failed: {status}");
    assert!(clone_dir.join("README").is_file());

    harness.teardown().unwrap();
    tree.assert_file_absent("sshd/sshd.pid");
    tree.assert_file_absent("dot-ssh/known_hosts");
}

fn ssh_command(user_key: &Path, known_hosts: &Path) -> String {
    format!(
        "ssh -F none -o IdentitiesOnly=yes -o StrictHostKeyChecking=yes \
         -o UserKnownHostsFile={} -i {}",
        known_hosts.display(),
        user_key.display()
    )
}
