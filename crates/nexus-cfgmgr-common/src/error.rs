//! Error types for switch-port configuration operations.
//!
//! This module defines the error types used throughout the nexus cfgmgr
//! crates. All errors implement `std::error::Error` via `thiserror`.

use std::fmt;

use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for cfgmgr operations.
pub type CfgMgrResult<T> = Result<T, CfgMgrError>;

/// Point in the session lifecycle at which a transport failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStage {
    /// Building the transport client (first use of a driver).
    Init,
    /// Opening the management session.
    Connect,
    /// Running the command batch.
    Execute,
    /// Closing the management session.
    Close,
}

impl TransportStage {
    /// Returns the stage name as used in log records.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportStage::Init => "init",
            TransportStage::Connect => "connect",
            TransportStage::Execute => "execute",
            TransportStage::Close => "close",
        }
    }
}

impl fmt::Display for TransportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while configuring a switch port.
#[derive(Debug, Error)]
pub enum CfgMgrError {
    /// The device reply envelope could not be interpreted.
    #[error("Cannot parse command response: {message}")]
    Parse {
        /// What was wrong with the reply.
        message: String,
    },

    /// Connecting to, talking to, or disconnecting from the switch failed.
    ///
    /// `source` is the primary failure. When the batch itself failed and the
    /// session close failed afterwards, the close failure is kept in
    /// `cleanup` instead of replacing the primary error.
    #[error("Switch {host}: {stage} failed: {source}")]
    Transport {
        /// The switch management address.
        host: String,
        /// Where in the session lifecycle the failure happened.
        stage: TransportStage,
        /// The underlying transport error.
        #[source]
        source: TransportError,
        /// Secondary failure while closing the session, if any.
        cleanup: Option<TransportError>,
    },

    /// A port field failed validation; raised before any session is opened.
    #[error("Invalid port {field}: {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// A settings value failed validation.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The setting that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Settings could not be loaded.
    #[error("Configuration loading failed: {0}")]
    Config(Box<figment::Error>),

    /// The negation batch of a clear failed after the interface was read.
    ///
    /// The device may be left partially cleared.
    #[error("Clear of interface {interface} did not complete: {source}")]
    ClearIncomplete {
        /// The interface being cleared.
        interface: String,
        /// The failure of the apply phase.
        #[source]
        source: Box<CfgMgrError>,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl From<figment::Error> for CfgMgrError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CfgMgrError {
    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a transport error without a cleanup failure.
    pub fn transport(host: impl Into<String>, stage: TransportStage, source: TransportError) -> Self {
        Self::Transport {
            host: host.into(),
            stage,
            source,
            cleanup: None,
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the transport stage for transport errors.
    pub fn stage(&self) -> Option<TransportStage> {
        match self {
            CfgMgrError::Transport { stage, .. } => Some(*stage),
            CfgMgrError::ClearIncomplete { source, .. } => source.stage(),
            _ => None,
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    ///
    /// Only failures to open a session qualify: once a batch has been sent
    /// its effect on the device is unknown.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CfgMgrError::Transport {
                stage: TransportStage::Connect,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CfgMgrError::validation("vlan_id", "4095 is outside 1..=4094");
        assert_eq!(
            err.to_string(),
            "Invalid port vlan_id: 4095 is outside 1..=4094"
        );
    }

    #[test]
    fn test_transport_error_display() {
        let err = CfgMgrError::transport(
            "10.0.0.1",
            TransportStage::Connect,
            TransportError::Connect("Connection refused".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Switch 10.0.0.1: connect failed: Connection failed: Connection refused"
        );
    }

    #[test]
    fn test_parse_error() {
        let err = CfgMgrError::parse("expected 1 reply element, found 2");
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_clear_incomplete_keeps_stage() {
        let inner = CfgMgrError::transport(
            "sw1",
            TransportStage::Execute,
            TransportError::Protocol("eof".to_string()),
        );
        let err = CfgMgrError::ClearIncomplete {
            interface: "1/20".to_string(),
            source: Box::new(inner),
        };
        assert_eq!(err.stage(), Some(TransportStage::Execute));
        assert!(err.to_string().contains("1/20"));
    }

    #[test]
    fn test_is_retryable() {
        let connect = CfgMgrError::transport(
            "sw1",
            TransportStage::Connect,
            TransportError::Connect("timeout".to_string()),
        );
        let execute = CfgMgrError::transport(
            "sw1",
            TransportStage::Execute,
            TransportError::Protocol("eof".to_string()),
        );
        assert!(connect.is_retryable());
        assert!(!execute.is_retryable());
        assert!(!CfgMgrError::internal("bug").is_retryable());
    }
}
