//! Test fixtures for common port and device-reply patterns

/// Common port fixtures
pub mod port_fixtures {
    use nexus_cfgmgr_common::Port;

    /// Switch management address used by every fixture
    pub const SWITCH_HOST: &str = "10.0.0.1";

    /// Access port on `interface` carrying `vlan_id`
    pub fn access_port(interface: &str, vlan_id: u16) -> Port {
        Port::new(interface, "host-42", SWITCH_HOST, "admin", "secret").with_vlan(vlan_id)
    }

    /// Trunked port on `interface` carrying `vlan_id`
    pub fn trunk_port(interface: &str, vlan_id: u16) -> Port {
        access_port(interface, vlan_id).with_trunked(true)
    }

    /// Access port with a static IP source binding
    pub fn bound_access_port(interface: &str, vlan_id: u16) -> Port {
        access_port(interface, vlan_id).with_binding("10.1.1.5", "00:11:22:33:44:55")
    }

    /// Port without a VLAN, as handed to `show` and `clear`
    pub fn bare_port(interface: &str) -> Port {
        Port::new(interface, "host-42", SWITCH_HOST, "admin", "secret")
    }
}

/// Canned device replies
pub mod reply_fixtures {
    use nexus_cfgmgr_common::{ReplyElement, Response};

    /// `show running-config interface` output for a provisioned access port
    pub const ACCESS_RUNNING_CONFIG: &str = "\
!Command: show running-config interface Ethernet1/20
!Time: Mon Mar  3 17:02:11 2014

version 6.0(2)U2(1)

interface Ethernet1/20
  description host-42
  switchport access vlan 100
  spanning-tree port type edge
  spanning-tree bpduguard enable
";

    /// `show running-config interface` output for an unconfigured port
    pub const EMPTY_RUNNING_CONFIG: &str = "\
!Command: show running-config interface Ethernet1/20
!Time: Mon Mar  3 17:02:11 2014

version 6.0(2)U2(1)

interface Ethernet1/20

";

    pub fn access_running_config() -> Response {
        Response::with_data(ACCESS_RUNNING_CONFIG)
    }

    pub fn empty_running_config() -> Response {
        Response::with_data(EMPTY_RUNNING_CONFIG)
    }

    /// Bare `<ok/>` reply to a configuration batch
    pub fn ok() -> Response {
        Response::new(vec![ReplyElement::new("ok", "")])
    }

    /// Reply with two payload elements, which no filter accepts
    pub fn ambiguous() -> Response {
        Response::new(vec![
            ReplyElement::new("data", "description a"),
            ReplyElement::new("data", "description b"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_fixtures() {
        let port = port_fixtures::trunk_port("1/20", 100);
        assert!(port.trunked);
        assert_eq!(port.vlan_id, Some(100));
        assert_eq!(port.switch_host, port_fixtures::SWITCH_HOST);

        assert!(port_fixtures::bare_port("1/20").vlan_id.is_none());
        assert!(port_fixtures::bound_access_port("1/20", 100).ip.is_some());
    }

    #[test]
    fn test_reply_fixtures() {
        assert!(reply_fixtures::access_running_config()
            .payload()
            .unwrap()
            .contains("switchport access vlan 100"));
        assert!(reply_fixtures::ok().payload().unwrap().is_empty());
        assert!(reply_fixtures::ambiguous().payload().is_err());
    }
}
