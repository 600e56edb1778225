//! Common infrastructure for the Nexus switch-port configuration manager.
//!
//! This crate provides the pieces shared by the port manager and its
//! transports:
//!
//! - [`transport`]: Transport/session traits and the device reply envelope
//! - [`SessionExecutor`]: Connect → execute → close for one command batch
//! - [`Port`]: The port record handed to the driver
//! - [`config`]: Layered settings (defaults, TOML file, environment)
//! - [`error`]: Error types for cfgmgr operations
//!
//! # Architecture
//!
//! A port operation follows this pattern:
//!
//! 1. Synthesize an ordered batch of NX-OS configuration commands
//! 2. Hand the batch to the [`SessionExecutor`], which opens one session,
//!    sends the batch as a unit and always closes the session
//! 3. Interpret the reply envelope (only `show` replies carry payload)
//!
//! # Example
//!
//! ```ignore
//! use nexus_cfgmgr_common::{config::Settings, SessionExecutor, SwitchTarget};
//!
//! let settings = Settings::load(None)?;
//! let executor = SessionExecutor::new(factory, settings.dry_run);
//! let target = SwitchTarget::new("10.0.0.1", "admin", "secret");
//! executor.run(&target, &["configure terminal".to_string()]).await?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod port;
pub mod transport;

// Re-export commonly used items at crate root
pub use config::{Settings, DEFAULT_IGNORE_CLEAR};
pub use error::{CfgMgrError, CfgMgrResult, TransportStage};
pub use executor::SessionExecutor;
pub use port::Port;
pub use transport::{
    ReplyElement, Response, Session, SwitchTarget, Transport, TransportError, TransportFactory,
    TransportResult, DEFAULT_SSH_PORT,
};
