//! ssh subprocess transport

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::process::Command;
use tracing::debug;

use nexus_cfgmgr_common::config::SshSettings;
use nexus_cfgmgr_common::{
    Session, SwitchTarget, Transport, TransportError, TransportFactory, TransportResult,
};

use crate::session::NetconfSession;

/// Environment variable sshpass reads the password from
const SSHPASS_ENV: &str = "SSHPASS";

/// Opens NETCONF sessions by running `ssh -s <user>@<host> netconf`
///
/// Password logins need the `sshpass` binary (`ssh.sshpass_binary`) on the
/// host at runtime. Without a password ssh runs in batch mode and relies on
/// keys or an agent.
#[derive(Debug, Clone)]
pub struct NetconfTransport {
    settings: SshSettings,
}

impl NetconfTransport {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }

    /// ssh arguments for `target`
    ///
    /// The password never appears here; it reaches sshpass via the
    /// environment.
    pub fn ssh_args(&self, target: &SwitchTarget) -> Vec<String> {
        let strict = if self.settings.strict_host_key_checking {
            "yes"
        } else {
            "no"
        };
        let mut args = vec![
            "-p".to_string(),
            target.port.to_string(),
            "-o".to_string(),
            format!("StrictHostKeyChecking={}", strict),
        ];
        if target.password.expose_secret().is_empty() {
            args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
        }
        args.extend([
            "-s".to_string(),
            format!("{}@{}", target.username, target.host),
            "netconf".to_string(),
        ]);
        args
    }

    /// Binary that gets spawned for `target`
    fn program(&self, target: &SwitchTarget) -> &str {
        if target.password.expose_secret().is_empty() {
            &self.settings.binary
        } else {
            &self.settings.sshpass_binary
        }
    }

    fn command(&self, target: &SwitchTarget) -> Command {
        let password = target.password.expose_secret();
        let mut cmd = if password.is_empty() {
            Command::new(&self.settings.binary)
        } else {
            let mut cmd = Command::new(&self.settings.sshpass_binary);
            cmd.arg("-e")
                .arg(&self.settings.binary)
                .env(SSHPASS_ENV, password);
            cmd
        };
        cmd.args(self.ssh_args(target))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transport for NetconfTransport {
    async fn connect(&self, target: &SwitchTarget) -> TransportResult<Box<dyn Session>> {
        debug!(
            host = %target.host,
            port = target.port,
            user = %target.username,
            "Starting NETCONF subsystem"
        );
        let child = self.command(target).spawn().map_err(|e| {
            TransportError::Connect(format!("failed to start {}: {}", self.program(target), e))
        })?;

        let session =
            NetconfSession::establish(&target.host, child, self.settings.reply_timeout()).await?;
        Ok(Box::new(session))
    }
}

/// Builds [`NetconfTransport`]s from SSH settings
#[derive(Debug, Clone)]
pub struct NetconfTransportFactory {
    settings: SshSettings,
}

impl NetconfTransportFactory {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }
}

impl TransportFactory for NetconfTransportFactory {
    fn create(&self) -> TransportResult<Arc<dyn Transport>> {
        if self.settings.binary.trim().is_empty() {
            return Err(TransportError::Connect("no ssh client configured".to_string()));
        }
        Ok(Arc::new(NetconfTransport::new(self.settings.clone())))
    }
}
