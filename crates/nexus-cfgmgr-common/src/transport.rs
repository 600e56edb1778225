//! Transport abstractions for switch management sessions.
//!
//! The executor never talks to a device directly. It is handed a
//! [`TransportFactory`] at construction, builds the [`Transport`] from it on
//! first use, and opens one [`Session`] per command batch.
//!
//! # Example
//!
//! ```ignore
//! use nexus_cfgmgr_common::transport::{Session, SwitchTarget, Transport};
//!
//! async fn run(transport: &dyn Transport, target: &SwitchTarget) -> TransportResult<()> {
//!     let mut session = transport.connect(target).await?;
//!     let reply = session.execute(&["show version".to_string()]).await?;
//!     println!("{}", reply.payload().unwrap_or_default());
//!     session.close().await
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::error::{CfgMgrError, CfgMgrResult};

/// Default SSH port for switch management sessions.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The session could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Reading from or writing to the session failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer sent something the transport could not interpret.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The device answered with an RPC error.
    #[error("Device rejected request ({tag}): {message}")]
    Rpc {
        /// The error tag reported by the device.
        tag: String,
        /// The error message reported by the device.
        message: String,
    },

    /// No reply arrived in time.
    #[error("Timed out after {0:?} waiting for reply")]
    Timeout(Duration),

    /// The session was used after it had been closed.
    #[error("Session already closed")]
    Closed,
}

/// Connection parameters for one switch.
pub struct SwitchTarget {
    /// Management address of the switch.
    pub host: String,
    /// Management port (SSH).
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: SecretString,
}

impl SwitchTarget {
    /// Creates a target on the default SSH port.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Overrides the management port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Debug for SwitchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// One child element of a device reply envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyElement {
    /// Local element name (e.g. `data`, `ok`).
    pub name: String,
    /// Concatenated text content of the element.
    pub text: String,
}

impl ReplyElement {
    /// Creates a reply element.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Structured reply returned by a session for one command batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    elements: Vec<ReplyElement>,
}

impl Response {
    /// Creates a response from its envelope elements.
    pub fn new(elements: Vec<ReplyElement>) -> Self {
        Self { elements }
    }

    /// Creates a response holding a single `data` element.
    pub fn with_data(text: impl Into<String>) -> Self {
        Self::new(vec![ReplyElement::new("data", text)])
    }

    /// Returns the envelope elements in document order.
    pub fn elements(&self) -> &[ReplyElement] {
        &self.elements
    }

    /// Returns the text of the single payload element.
    ///
    /// Replies with zero or several elements are rejected rather than
    /// picking one of them.
    pub fn payload(&self) -> CfgMgrResult<&str> {
        match self.elements.as_slice() {
            [only] => Ok(only.text.as_str()),
            other => Err(CfgMgrError::parse(format!(
                "expected exactly 1 reply element, found {}",
                other.len()
            ))),
        }
    }
}

/// Builds the transport client for a driver.
///
/// Called at most once per executor, on the first batch that reaches a
/// device.
pub trait TransportFactory: Send + Sync {
    /// Creates the transport client.
    fn create(&self) -> TransportResult<Arc<dyn Transport>>;
}

/// Opens management sessions to switches.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a session to `target`.
    async fn connect(&self, target: &SwitchTarget) -> TransportResult<Box<dyn Session>>;
}

/// An open management session.
///
/// Implementations must release their resources when dropped, even if
/// [`Session::close`] was never called.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Session: Send {
    /// Sends the whole batch as one unit and returns the device reply.
    async fn execute(&mut self, commands: &[String]) -> TransportResult<Response>;

    /// Closes the session.
    async fn close(&mut self) -> TransportResult<()>;
}
