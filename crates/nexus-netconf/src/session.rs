//! NETCONF session over an ssh subprocess

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::time::timeout;
use tracing::{debug, warn};

use nexus_cfgmgr_common::{Response, Session, TransportError, TransportResult};

use crate::framing::{write_frame, FrameReader};
use crate::stderr::StderrLog;
use crate::xml;

/// How long to wait for ssh to exit after close-session
const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a failed handshake waits for ssh to finish its error output
const DIAGNOSTICS_TIMEOUT: Duration = Duration::from_secs(1);

/// One NETCONF session
///
/// The ssh child is killed if the session is dropped without being closed.
pub struct NetconfSession {
    host: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<StderrLog>,
    reader: FrameReader<ChildStdout>,
    next_message_id: u64,
    reply_timeout: Duration,
    session_id: Option<String>,
    closed: bool,
}

impl NetconfSession {
    /// Exchanges hellos on a freshly spawned ssh child
    pub(crate) async fn establish(
        host: &str,
        mut child: Child,
        reply_timeout: Duration,
    ) -> TransportResult<Self> {
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Connect("ssh stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .map(|stderr| StderrLog::spawn(host, stderr));

        let mut session = Self {
            host: host.to_string(),
            child,
            stdin,
            stderr,
            reader: FrameReader::new(stdout),
            next_message_id: 1,
            reply_timeout,
            session_id: None,
            closed: false,
        };

        match session.handshake().await {
            Ok(()) => Ok(session),
            Err(e) => Err(session.connect_failure(e).await),
        }
    }

    async fn handshake(&mut self) -> TransportResult<()> {
        let hello = xml::parse_hello(&self.read_reply().await?)?;
        debug!(
            host = %self.host,
            session_id = ?hello.session_id,
            "NETCONF session established"
        );
        self.session_id = hello.session_id;
        self.send(&xml::client_hello()).await
    }

    /// Folds whatever ssh printed to stderr into the handshake error
    async fn connect_failure(&mut self, err: TransportError) -> TransportError {
        let diagnostics = match self.stderr.as_mut() {
            Some(stderr) => stderr.collect(DIAGNOSTICS_TIMEOUT).await,
            None => String::new(),
        };
        if diagnostics.is_empty() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Connect(format!("{} ({})", err, diagnostics))
        }
    }

    async fn send(&mut self, message: &str) -> TransportResult<()> {
        let stdin = self.stdin.as_mut().ok_or(TransportError::Closed)?;
        write_frame(stdin, message).await
    }

    async fn read_reply(&mut self) -> TransportResult<String> {
        timeout(self.reply_timeout, self.reader.read_frame())
            .await
            .map_err(|_| TransportError::Timeout(self.reply_timeout))?
    }

    fn message_id(&mut self) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }

    async fn wait_for_exit(&mut self) -> TransportResult<()> {
        match timeout(EXIT_TIMEOUT, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(TransportError::Protocol(format!("ssh exited with {}", status)))
                }
            }
            Err(_) => {
                warn!(host = %self.host, "ssh did not exit after close-session, killing it");
                self.child.kill().await?;
                Err(TransportError::Timeout(EXIT_TIMEOUT))
            }
        }
    }
}

#[async_trait]
impl Session for NetconfSession {
    async fn execute(&mut self, commands: &[String]) -> TransportResult<Response> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let id = self.message_id();
        self.send(&xml::exec_command(id, commands)).await?;
        xml::parse_reply(&self.read_reply().await?)
    }

    async fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.closed = true;
        debug!(host = %self.host, session_id = ?self.session_id, "Closing NETCONF session");

        let id = self.message_id();
        let sent = self.send(&xml::close_session(id)).await;
        if sent.is_ok() {
            if let Err(e) = self.read_reply().await {
                debug!(host = %self.host, error = %e, "No reply to close-session");
            }
        }
        // EOF on stdin lets ssh exit
        self.stdin = None;

        let exited = self.wait_for_exit().await;
        sent.and(exited)
    }
}
