//! NETCONF-over-SSH transport for Cisco Nexus switches
//!
//! Implements the cfgmgr transport traits on top of the system ssh client:
//! each session is an `ssh -s netconf` subprocess speaking NETCONF 1.0 with
//! `]]>]]>` framing. Command batches are sent as a single NX-OS
//! `exec-command` RPC.

mod framing;
mod session;
mod stderr;
mod transport;
pub mod xml;

pub use framing::{write_frame, FrameReader, EOM};
pub use session::NetconfSession;
pub use transport::{NetconfTransport, NetconfTransportFactory};
