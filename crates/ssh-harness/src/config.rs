//! Harness configuration and derived file layout

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Authentication methods the daemon will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    Password,
    PubKey,
    Any,
}

impl AuthMethod {
    /// (password_auth, pubkey_auth) toggles for the sshd configuration.
    pub fn toggles(self) -> (bool, bool) {
        match self {
            Self::Password => (true, false),
            Self::PubKey => (false, true),
            Self::Any => (true, true),
        }
    }
}

/// Everything configurable about the disposable daemon.
///
/// The defaults match a Debian OpenSSH installation listening on a
/// loopback-only high port. A TOML file with any subset of the fields can
/// override them via [`HarnessConfig::from_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Address the daemon listens on; loopback for test insulation.
    pub bind_address: String,
    pub port: u16,
    pub sshd_bin: PathBuf,
    pub ssh_keygen_bin: PathBuf,
    pub ssh_keyscan_bin: PathBuf,
    /// Directory receiving every generated fixture file.
    pub base_dir: PathBuf,
    pub auth: AuthMethod,
    /// Host alias written to the user's ssh config.
    pub ssh_config_host_name: String,
    pub update_ssh_config: bool,
    /// Environment variables the daemon sets for incoming sessions.
    /// Non-empty implies `PermitUserEnvironment yes`.
    pub environment: BTreeMap<String, String>,
    /// Write the variables to `~/.ssh/environment` instead of
    /// `environment="…"` authorized_keys options.
    pub environment_file: bool,
    /// Extra options prepended to the authorized_keys entry, verbatim.
    pub authorized_key_options: Option<String>,
    /// Backup-context name under which user files are patched.
    pub context: String,
    /// Directory used as `~/.ssh`; defaults to the real one. Tests point
    /// this at a scratch directory to keep the user's files out of play.
    pub ssh_home: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost".into(),
            port: 2200,
            sshd_bin: "/usr/sbin/sshd".into(),
            ssh_keygen_bin: "/usr/bin/ssh-keygen".into(),
            ssh_keyscan_bin: "/usr/bin/ssh-keyscan".into(),
            base_dir: PathBuf::from("tests/tmp/sshd"),
            auth: AuthMethod::PubKey,
            ssh_config_host_name: "test-harness".into(),
            update_ssh_config: true,
            environment: BTreeMap::new(),
            environment_file: false,
            authorized_key_options: None,
            context: "ssh_harness".into(),
            ssh_home: None,
        }
    }
}

impl HarnessConfig {
    /// Load overrides from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The `~/.ssh` directory this configuration operates on.
    pub fn ssh_dir(&self) -> Result<PathBuf> {
        match &self.ssh_home {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".ssh"))
                .ok_or(Error::NoHomeDirectory),
        }
    }
}

/// File locations derived from a [`HarnessConfig`].
#[derive(Debug, Clone)]
pub struct HarnessPaths {
    pub host_rsa_key: PathBuf,
    pub host_ecdsa_key: PathBuf,
    pub host_ed25519_key: PathBuf,
    pub user_key: PathBuf,
    pub authorized_keys: PathBuf,
    pub sshd_config: PathBuf,
    pub sshd_pidfile: PathBuf,
    /// User-level files patched through the backup registry.
    pub known_hosts: PathBuf,
    pub ssh_config: PathBuf,
    pub ssh_environment: PathBuf,
}

impl HarnessPaths {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let base = &config.base_dir;
        let ssh_dir = config.ssh_dir()?;
        Ok(Self {
            host_rsa_key: base.join("host_ssh_rsa_key"),
            host_ecdsa_key: base.join("host_ssh_ecdsa_key"),
            host_ed25519_key: base.join("host_ssh_ed25519_key"),
            user_key: base.join("id_rsa"),
            authorized_keys: base.join("authorized_keys"),
            sshd_config: base.join("sshd_config"),
            sshd_pidfile: base.join("sshd.pid"),
            known_hosts: ssh_dir.join("known_hosts"),
            ssh_config: ssh_dir.join("config"),
            ssh_environment: ssh_dir.join("environment"),
        })
    }

    /// The keypairs to generate, host keys first.
    pub fn key_files(&self) -> [(crate::KeyType, &Path); 4] {
        use crate::KeyType;
        [
            (KeyType::Rsa, &self.host_rsa_key),
            (KeyType::Ecdsa, &self.host_ecdsa_key),
            (KeyType::Ed25519, &self.host_ed25519_key),
            (KeyType::Rsa, &self.user_key),
        ]
    }

    /// Generated files removed on teardown. The pidfile is included:
    /// sshd would remove it on a graceful exit, but the hard kill used
    /// here does not give it the chance.
    pub fn cleanup_files(&self) -> Vec<&Path> {
        vec![
            &self.host_rsa_key,
            &self.host_ecdsa_key,
            &self.host_ed25519_key,
            &self.user_key,
            &self.authorized_keys,
            &self.sshd_config,
            &self.sshd_pidfile,
        ]
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Render the sshd configuration file for this harness instance.
pub fn render_sshd_config(config: &HarnessConfig, paths: &HarnessPaths) -> String {
    let (password_auth, pubkey_auth) = config.auth.toggles();
    format!(
        "\
# ssh-harness generated configuration file
Port {port}
ListenAddress {address}
HostKey {host_rsa_key}
HostKey {host_ecdsa_key}
HostKey {host_ed25519_key}

SyslogFacility AUTH
LogLevel VERBOSE

PidFile {pidfile}
LoginGraceTime 120
PermitRootLogin yes
StrictModes yes

PubkeyAuthentication {pubkey_auth}
AuthorizedKeysFile {authorized_keys}
PermitUserEnvironment {permit_environment}

IgnoreRhosts yes
HostbasedAuthentication no

PermitEmptyPasswords no
KbdInteractiveAuthentication no
PasswordAuthentication {password_auth}

GSSAPIAuthentication no

X11Forwarding yes
X11DisplayOffset 10
PrintMotd no
PrintLastLog no
TCPKeepAlive yes
Banner none
AcceptEnv LANG LC_*

# No sftp subsystem: enabling it can keep sshd from opening a session.
UsePAM no
",
        port = config.port,
        address = config.bind_address,
        host_rsa_key = paths.host_rsa_key.display(),
        host_ecdsa_key = paths.host_ecdsa_key.display(),
        host_ed25519_key = paths.host_ed25519_key.display(),
        pidfile = paths.sshd_pidfile.display(),
        pubkey_auth = yes_no(pubkey_auth),
        authorized_keys = paths.authorized_keys.display(),
        permit_environment = yes_no(!config.environment.is_empty()),
        password_auth = yes_no(password_auth),
    )
}

/// Build the single authorized_keys line for the user key.
///
/// Environment variables configured without an environment file become
/// `environment="…"` options, folded into any caller-supplied options.
pub fn authorized_keys_line(config: &HarnessConfig, public_key: &str) -> String {
    let mut options: Vec<String> = Vec::new();
    if let Some(extra) = &config.authorized_key_options {
        options.push(extra.clone());
    }
    if !config.environment_file {
        options.extend(
            config
                .environment
                .iter()
                .map(|(k, v)| format!("environment=\"{k}={v}\"")),
        );
    }

    let key = public_key.trim_end();
    if options.is_empty() {
        format!("{key}\n")
    } else {
        format!("{} {key}\n", options.join(","))
    }
}

/// The `Host` block appended to the user's ssh config.
pub fn ssh_config_block(config: &HarnessConfig, paths: &HarnessPaths) -> String {
    format!(
        "\nHost {name}\n\
         \tHostName {address}\n\
         \tPort {port}\n\
         \tIdentityFile {identity}\n",
        name = config.ssh_config_host_name,
        address = config.bind_address,
        port = config.port,
        identity = paths.user_key.display(),
    )
}
