//! The port record handed to the driver.
//!
//! A [`Port`] is plain data owned by the caller. Field validation happens in
//! the port manager when commands are synthesized, never here.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::transport::SwitchTarget;

/// One attachment point to provision on a switch.
pub struct Port {
    /// Physical interface identifier (e.g. `1/20`).
    pub interface: String,
    /// Opaque tenant/host identifier, written into interface descriptions.
    pub hardware_id: String,
    /// VLAN to attach; required for create/attach/detach/delete.
    pub vlan_id: Option<u16>,
    /// Host IP for the static source binding.
    pub ip: Option<String>,
    /// Host MAC for the static source binding.
    pub mac_address: Option<String>,
    /// Trunk (port-channel) instead of access-port configuration.
    pub trunked: bool,
    /// Switch management address.
    pub switch_host: String,
    /// Switch login user.
    pub switch_username: String,
    /// Switch login password.
    pub switch_password: SecretString,
}

impl Port {
    /// Creates an access port record with no VLAN or binding.
    pub fn new(
        interface: impl Into<String>,
        hardware_id: impl Into<String>,
        switch_host: impl Into<String>,
        switch_username: impl Into<String>,
        switch_password: impl Into<String>,
    ) -> Self {
        Self {
            interface: interface.into(),
            hardware_id: hardware_id.into(),
            vlan_id: None,
            ip: None,
            mac_address: None,
            trunked: false,
            switch_host: switch_host.into(),
            switch_username: switch_username.into(),
            switch_password: SecretString::from(switch_password.into()),
        }
    }

    /// Sets the VLAN.
    pub fn with_vlan(mut self, vlan_id: u16) -> Self {
        self.vlan_id = Some(vlan_id);
        self
    }

    /// Sets the static binding address pair.
    pub fn with_binding(mut self, ip: impl Into<String>, mac_address: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self.mac_address = Some(mac_address.into());
        self
    }

    /// Selects trunk or access configuration.
    pub fn with_trunked(mut self, trunked: bool) -> Self {
        self.trunked = trunked;
        self
    }

    /// Builds the connection parameters for this port's switch.
    pub fn target(&self, ssh_port: u16) -> SwitchTarget {
        SwitchTarget::new(
            self.switch_host.as_str(),
            self.switch_username.as_str(),
            self.switch_password.expose_secret().to_owned(),
        )
        .with_port(ssh_port)
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("interface", &self.interface)
            .field("hardware_id", &self.hardware_id)
            .field("vlan_id", &self.vlan_id)
            .field("ip", &self.ip)
            .field("mac_address", &self.mac_address)
            .field("trunked", &self.trunked)
            .field("switch_host", &self.switch_host)
            .field("switch_username", &self.switch_username)
            .field("switch_password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_builder() {
        let port = Port::new("1/20", "host-42", "10.0.0.1", "admin", "secret")
            .with_vlan(100)
            .with_binding("10.1.1.5", "00:11:22:33:44:55")
            .with_trunked(true);

        assert_eq!(port.vlan_id, Some(100));
        assert_eq!(port.ip.as_deref(), Some("10.1.1.5"));
        assert!(port.trunked);
    }

    #[test]
    fn test_target_carries_credentials() {
        let port = Port::new("1/20", "host-42", "10.0.0.1", "admin", "secret");
        let target = port.target(830);

        assert_eq!(target.host, "10.0.0.1");
        assert_eq!(target.port, 830);
        assert_eq!(target.username, "admin");
        assert_eq!(target.password.expose_secret(), "secret");
    }

    #[test]
    fn test_debug_redacts_password() {
        let port = Port::new("1/20", "host-42", "10.0.0.1", "admin", "secret");
        assert!(!format!("{:?}", port).contains("secret"));
    }
}
