//! nexus-portmgr - Switch-port configuration manager for Cisco Nexus switches
//!
//! Provisions, re-VLANs, tears down and resets physical switch ports by
//! synthesizing NX-OS configuration batches and running each one in a single
//! management session.

mod commands;
mod driver;
mod filter;
mod negate;
mod port_file;
mod types;

pub use commands::*;
pub use driver::{NexusDriver, NexusDriverBuilder, Operation};
pub use filter::*;
pub use negate::{IgnoreList, NegationEngine};
pub use port_file::PortFile;
pub use types::*;

pub use nexus_cfgmgr_common::{CfgMgrError, CfgMgrResult, Port, Settings};
