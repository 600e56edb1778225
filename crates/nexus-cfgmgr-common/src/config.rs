//! Settings for the port configuration manager.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `NEXUS_`-prefixed environment variables (`__` separates nested keys, so
//! `NEXUS_SSH__PORT=830` sets `ssh.port`).
//!
//! ```toml
//! dry_run = false
//!
//! [ssh]
//! port = 22
//! strict_host_key_checking = true
//! reply_timeout_secs = 60
//!
//! [clear]
//! ignore = ["no spanning-tree bpduguard enable"]
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CfgMgrError, CfgMgrResult};
use crate::transport::DEFAULT_SSH_PORT;

/// Environment variable prefix for settings overrides.
pub const ENV_PREFIX: &str = "NEXUS_";

/// Negated interface lines that `clear` must never send.
///
/// NX-OS on the 3172 rejects `no spanning-tree bpduguard enable` on an
/// interface that inherits the global default.
pub const DEFAULT_IGNORE_CLEAR: &[&str] = &["no spanning-tree bpduguard enable"];

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Compute and log command batches without contacting any switch.
    pub dry_run: bool,

    /// Management session settings.
    pub ssh: SshSettings,

    /// Interface clear settings.
    pub clear: ClearSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dry_run: false,
            ssh: SshSettings::default(),
            clear: ClearSettings::default(),
        }
    }
}

/// Management session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    /// Management port on the switch.
    pub port: u16,
    /// Path to the ssh client.
    pub binary: String,
    /// Path to sshpass, used when a password is supplied.
    pub sshpass_binary: String,
    /// Verify switch host keys against known_hosts.
    pub strict_host_key_checking: bool,
    /// Upper bound on the wait for a single device reply.
    pub reply_timeout_secs: u64,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            binary: "ssh".to_string(),
            sshpass_binary: "sshpass".to_string(),
            strict_host_key_checking: true,
            reply_timeout_secs: 60,
        }
    }
}

impl SshSettings {
    /// Returns the reply timeout as a `Duration`.
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}

/// Interface clear settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearSettings {
    /// Negated lines dropped from clear batches.
    pub ignore: Vec<String>,
}

impl Default for ClearSettings {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_IGNORE_CLEAR.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Loads settings from defaults, an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> CfgMgrResult<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extracts and validates settings from an assembled figment.
    pub fn from_figment(figment: Figment) -> CfgMgrResult<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> CfgMgrResult<()> {
        if self.ssh.port == 0 {
            return Err(CfgMgrError::invalid_config("ssh.port", "must be non-zero"));
        }
        if self.ssh.binary.trim().is_empty() {
            return Err(CfgMgrError::invalid_config("ssh.binary", "must not be empty"));
        }
        if self.ssh.reply_timeout_secs == 0 {
            return Err(CfgMgrError::invalid_config(
                "ssh.reply_timeout_secs",
                "must be at least 1",
            ));
        }
        if let Some(entry) = self.clear.ignore.iter().find(|e| e.trim().is_empty()) {
            return Err(CfgMgrError::invalid_config(
                "clear.ignore",
                format!("blank entry {:?}", entry),
            ));
        }
        Ok(())
    }
}
