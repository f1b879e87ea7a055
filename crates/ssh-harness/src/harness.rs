//! Daemon provisioning and teardown

use std::ffi::OsString;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use backoff::ExponentialBackoff;
use harness_fs::{BackupRegistry, EditMode, io as atomic_io};
use tracing::{debug, info, warn};

use crate::config::{authorized_keys_line, render_sshd_config, ssh_config_block};
use crate::keys::generate_keypair;
use crate::process::run_command;
use crate::{Error, HarnessConfig, HarnessPaths, Result};

/// Most permissive mode a directory on the path to a private key may
/// have before sshd's strict-modes check (and plain prudence) object:
/// rwxr-xr-x plus the sticky bit.
#[cfg(unix)]
const DIR_MODE_MASK: u32 = 0o1755;

/// A disposable OpenSSH daemon instance.
///
/// [`SshHarness::setup`] provisions keys and configuration under the base
/// directory, starts `sshd`, and patches the user's
/// `known_hosts`/`config` files through a [`BackupRegistry`];
/// [`SshHarness::teardown`] stops the daemon, deletes every generated
/// file, and restores the patched ones. Dropping a harness that is still
/// up tears it down best-effort.
pub struct SshHarness {
    config: HarnessConfig,
    paths: HarnessPaths,
    registry: BackupRegistry,
    sshd: Option<Child>,
    /// Directory modes tightened during setup, restored on teardown.
    tightened_modes: Vec<(PathBuf, u32)>,
}

impl SshHarness {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let paths = HarnessPaths::new(&config)?;
        Ok(Self {
            config,
            paths,
            registry: BackupRegistry::new(),
            sshd: None,
            tightened_modes: Vec::new(),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(HarnessConfig::default())
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn paths(&self) -> &HarnessPaths {
        &self.paths
    }

    pub fn registry(&self) -> &BackupRegistry {
        &self.registry
    }

    /// Whether the daemon has been started and not yet stopped.
    pub fn running(&self) -> bool {
        self.sshd.is_some()
    }

    /// Provision everything and start the daemon.
    pub fn setup(&mut self) -> Result<()> {
        self.provision()?;
        self.start()
    }

    /// Generate every fixture file the daemon needs, without starting it.
    pub fn provision(&mut self) -> Result<()> {
        self.preconditions()?;

        let rendered = render_sshd_config(&self.config, &self.paths);
        debug!(config = %self.paths.sshd_config.display(), "writing sshd configuration");
        atomic_io::write_atomic(&self.paths.sshd_config, rendered.as_bytes())?;

        self.protect_key_dirs();

        for (key_type, key_file) in self.paths.key_files() {
            generate_keypair(&self.config.ssh_keygen_bin, key_type, key_file)?;
        }

        self.write_authorized_keys()?;
        self.write_environment_file()?;

        info!(base_dir = %self.config.base_dir.display(), "harness provisioned");
        Ok(())
    }

    /// Start the daemon and patch the user files that make it reachable
    /// without prompts.
    pub fn start(&mut self) -> Result<()> {
        let child = Command::new(&self.config.sshd_bin)
            .arg("-D")
            .arg("-4")
            .arg("-f")
            .arg(&self.paths.sshd_config)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| Error::io(&self.config.sshd_bin, e))?;
        self.sshd = Some(child);
        debug!(port = self.config.port, "sshd spawned, waiting for pidfile");

        if let Err(e) = self.wait_for_pidfile() {
            self.stop_daemon();
            return Err(e);
        }

        if self.config.update_ssh_config {
            self.update_ssh_config()?;
        }
        // ssh-keyscan needs the daemon up, so this comes last.
        self.update_known_hosts()?;

        info!(
            address = %self.config.bind_address,
            port = self.config.port,
            "sshd ready"
        );
        Ok(())
    }

    /// Stop the daemon, delete the generated files, and restore every
    /// user file touched during setup.
    pub fn teardown(&mut self) -> Result<()> {
        self.stop_daemon();

        for file in self.paths.cleanup_files() {
            delete_file(file);
        }
        for (_, key_file) in self.paths.key_files() {
            delete_file(&pub_sibling(key_file));
        }

        let restored = self.registry.clear_context(&self.config.context);
        self.restore_modes();
        restored?;

        info!("harness torn down");
        Ok(())
    }

    fn stop_daemon(&mut self) {
        if let Some(mut child) = self.sshd.take() {
            debug!("stopping sshd");
            if let Err(e) = child.kill() {
                warn!(error = %e, "could not kill sshd");
            }
            let _ = child.wait();
        }
    }

    /// Check everything the daemon needs before touching the filesystem.
    ///
    /// Failures are collected rather than reported one at a time so a
    /// test runner can skip with a complete picture.
    fn preconditions(&self) -> Result<()> {
        let mut failures = Vec::new();

        let ssh_dir = self.config.ssh_dir()?;
        for dir in [&ssh_dir, &self.config.base_dir] {
            if let Err(e) = create_private_dir(dir) {
                failures.push(format!("cannot create directory {}: {e}", dir.display()));
            }
        }

        for program in [
            &self.config.sshd_bin,
            &self.config.ssh_keygen_bin,
            &self.config.ssh_keyscan_bin,
        ] {
            if let Some(problem) = check_program(program) {
                failures.push(problem);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Preconditions { failures })
        }
    }

    fn write_authorized_keys(&self) -> Result<()> {
        let pub_key_path = pub_sibling(&self.paths.user_key);
        let public_key =
            fs::read_to_string(&pub_key_path).map_err(|e| Error::io(&pub_key_path, e))?;
        let line = authorized_keys_line(&self.config, &public_key);
        debug!(path = %self.paths.authorized_keys.display(), "writing authorized_keys");
        atomic_io::write_atomic(&self.paths.authorized_keys, line.as_bytes())?;
        Ok(())
    }

    fn write_environment_file(&self) -> Result<()> {
        if !self.config.environment_file || self.config.environment.is_empty() {
            return Ok(());
        }
        self.registry.with_edit(
            &self.config.context,
            &self.paths.ssh_environment,
            EditMode::Truncate,
            |f| {
                for (key, value) in &self.config.environment {
                    writeln!(f, "{key}={value}")?;
                }
                Ok(())
            },
        )?;
        Ok(())
    }

    fn wait_for_pidfile(&self) -> Result<()> {
        let pidfile = &self.paths.sshd_pidfile;
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(1),
            max_elapsed_time: Some(Duration::from_secs(6)),
            ..ExponentialBackoff::default()
        };
        backoff::retry(policy, || {
            if pidfile.is_file() {
                Ok(())
            } else {
                Err(backoff::Error::transient(()))
            }
        })
        .map_err(|_| Error::DaemonNotStarting {
            pidfile: pidfile.clone(),
        })
    }

    fn update_ssh_config(&self) -> Result<()> {
        let block = ssh_config_block(&self.config, &self.paths);
        debug!(path = %self.paths.ssh_config.display(), "appending host entry");
        self.registry.with_edit(
            &self.config.context,
            &self.paths.ssh_config,
            EditMode::Append,
            |f| f.write_all(block.as_bytes()),
        )?;
        Ok(())
    }

    /// Append the daemon's hashed host keys to the user's known_hosts so
    /// no host-key validation prompt can hang an unattended run.
    fn update_known_hosts(&self) -> Result<()> {
        let keyscan = self.config.ssh_keyscan_bin.display().to_string();
        let port = self.config.port.to_string();

        // IPv4 and IPv6 are scanned separately because ssh-keyscan fails
        // outright when either address family is unavailable.
        let mut scans = Vec::new();
        for ip_version in ["-4", "-6"] {
            let argv = [
                keyscan.as_str(),
                "-H",
                ip_version,
                "-p",
                port.as_str(),
                "-t",
                "rsa,ecdsa,ed25519",
                self.config.bind_address.as_str(),
            ];
            let output = run_command(&argv, None)?;
            // ssh-keyscan exits 0 on connection failure but prints
            // nothing, so the output length is checked too.
            if output.success() && !output.stdout.is_empty() {
                scans.push(output.stdout);
            } else {
                debug!(
                    ip_version,
                    status = output.status,
                    stderr = %output.stderr,
                    "keyscan produced nothing"
                );
            }
        }
        if scans.is_empty() {
            return Err(Error::KeyscanFailed);
        }

        self.registry.with_edit(
            &self.config.context,
            &self.paths.known_hosts,
            EditMode::Append,
            |f| {
                for scan in &scans {
                    f.write_all(scan.as_bytes())?;
                }
                Ok(())
            },
        )?;
        Ok(())
    }

    /// Tighten over-permissive directories along the path to the private
    /// keys, recording their previous modes. Directories that cannot be
    /// changed are left alone with a warning; privilege escalation is not
    /// this crate's business.
    #[cfg(unix)]
    fn protect_key_dirs(&mut self) {
        use std::os::unix::fs::PermissionsExt;

        let Ok(base) = self.config.base_dir.canonicalize() else {
            return;
        };
        for dir in base.ancestors() {
            let Ok(metadata) = fs::metadata(dir) else {
                continue;
            };
            let mode = metadata.permissions().mode() & 0o7777;
            if mode & !DIR_MODE_MASK == 0 {
                continue;
            }
            let restricted = fs::Permissions::from_mode(mode & DIR_MODE_MASK);
            match fs::set_permissions(dir, restricted) {
                Ok(()) => self.tightened_modes.push((dir.to_path_buf(), mode)),
                Err(e) => warn!(dir = %dir.display(), error = %e, "could not tighten mode"),
            }
        }
    }

    #[cfg(not(unix))]
    fn protect_key_dirs(&mut self) {}

    #[cfg(unix)]
    fn restore_modes(&mut self) {
        use std::os::unix::fs::PermissionsExt;

        for (dir, mode) in std::mem::take(&mut self.tightened_modes) {
            debug!(dir = %dir.display(), mode = format!("{mode:o}"), "restoring mode");
            if let Err(e) = fs::set_permissions(&dir, fs::Permissions::from_mode(mode)) {
                warn!(dir = %dir.display(), error = %e, "could not restore mode");
            }
        }
    }

    #[cfg(not(unix))]
    fn restore_modes(&mut self) {}
}

impl Drop for SshHarness {
    fn drop(&mut self) {
        if self.sshd.is_some() {
            if let Err(e) = self.teardown() {
                warn!(error = %e, "teardown on drop failed");
            }
        }
    }
}

fn delete_file(file: &Path) {
    if file.is_file() {
        match fs::remove_file(file) {
            Ok(()) => debug!(file = %file.display(), "file removed"),
            Err(e) => warn!(file = %file.display(), error = %e, "could not remove file"),
        }
    }
}

/// `<key>.pub`, the public half of a keypair.
fn pub_sibling(key_file: &Path) -> PathBuf {
    let mut name = OsString::from(key_file.as_os_str());
    name.push(".pub");
    PathBuf::from(name)
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(dir)?.permissions().mode() & 0o777;
        if mode & 0o700 != 0o700 {
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }
    }
    Ok(())
}

/// None when the program is usable, otherwise a description of why not.
fn check_program(path: &Path) -> Option<String> {
    if !path.is_file() {
        return Some(format!("program not found: {}", path.display()));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match fs::metadata(path) {
            Ok(metadata) if metadata.permissions().mode() & 0o111 == 0 => {
                return Some(format!("program is not executable: {}", path.display()));
            }
            Err(e) => return Some(format!("cannot stat {}: {e}", path.display())),
            Ok(_) => {}
        }
    }
    None
}
