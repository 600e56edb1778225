//! Test infrastructure for the Nexus switch-port configuration manager
//!
//! Provides:
//! - An in-memory switch that records every batch it is sent
//! - Scripted session outcomes (replies, connect/execute/close failures)
//! - Port and device-reply fixtures
//! - Batch verification helpers

pub mod fixtures;
mod fake_switch;
mod verification;

pub use fake_switch::{FakeSwitch, FakeSwitchFactory, SessionScript};
pub use fixtures::*;
pub use verification::*;
