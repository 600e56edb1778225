//! NX-OS command builders for port operations
//!
//! Every builder validates the port before producing anything, so a batch is
//! either complete or an error. No builder touches the network.

use nexus_cfgmgr_common::{CfgMgrResult, Port};

use crate::types::{Interface, InterfaceKind, PortExt, SourceBinding, VlanId};

/// Enter global configuration mode
pub const CONFIGURE_TERMINAL: &str = "configure terminal";

/// Administratively disable an interface
pub const SHUTDOWN: &str = "shutdown";

/// Administratively enable an interface
pub const NO_SHUTDOWN: &str = "no shutdown";

/// Prefix that negates a configuration line
pub const NEGATE_PREFIX: &str = "no ";

/// Build the show command for one interface context
pub fn show_interface_configuration(kind: InterfaceKind, interface: &Interface) -> Vec<String> {
    vec![format!(
        "show running-config interface {}",
        interface.context_name(kind)
    )]
}

/// Build the batch that enters an interface context
pub fn configure_interface(kind: InterfaceKind, interface: &Interface) -> Vec<String> {
    vec![
        CONFIGURE_TERMINAL.to_string(),
        format!("interface {}", interface.context_name(kind)),
    ]
}

/// Build the port-channel deletion command
///
/// NX-OS accepts this for a port-channel that does not exist.
pub fn delete_port_channel_interface(interface: &Interface) -> Vec<String> {
    vec![format!("no interface {}", interface.port_channel_name())]
}

/// Build the static IP source binding line
pub fn build_source_binding_cmd(
    binding: &SourceBinding,
    vlan: VlanId,
    context: &str,
) -> String {
    format!(
        "ip source binding {} {} vlan {} interface {}",
        binding.ip, binding.mac, vlan, context
    )
}

/// Validated fields every port batch needs
struct PortPlan {
    interface: Interface,
    vlan: VlanId,
    binding: Option<SourceBinding>,
    trunked: bool,
}

impl PortPlan {
    fn new(port: &Port) -> CfgMgrResult<Self> {
        Ok(Self {
            interface: port.interface_id()?,
            vlan: port.vlan()?,
            binding: port.source_binding()?,
            trunked: port.trunked,
        })
    }

    /// Context the VLAN and binding are applied to
    fn context(&self) -> String {
        if self.trunked {
            self.interface.port_channel_name()
        } else {
            self.interface.ethernet_name()
        }
    }

    fn binding_cmd(&self) -> Option<String> {
        self.binding
            .as_ref()
            .map(|b| build_source_binding_cmd(b, self.vlan, &self.context()))
    }
}

/// Build the batch that provisions a port
pub fn create_port(port: &Port) -> CfgMgrResult<Vec<String>> {
    let plan = PortPlan::new(port)?;
    let description = format!("description {}", port.description()?);
    let vlan = plan.vlan;

    let mut cmds = vec![CONFIGURE_TERMINAL.to_string()];
    cmds.extend(plan.binding_cmd());

    if plan.trunked {
        let channel = plan.interface.port_channel_id();
        cmds.extend([
            format!("interface {}", plan.interface.port_channel_name()),
            description.clone(),
            "switchport mode trunk".to_string(),
            format!("switchport trunk allowed vlan {}", vlan),
            "spanning-tree port type edge trunk".to_string(),
            NO_SHUTDOWN.to_string(),
            format!("interface {}", plan.interface.ethernet_name()),
            description,
            "switchport mode trunk".to_string(),
            format!("switchport trunk allowed vlan {}", vlan),
            format!("channel-group {} mode active", channel),
            NO_SHUTDOWN.to_string(),
        ]);
    } else {
        cmds.extend([
            format!("interface {}", plan.interface.ethernet_name()),
            description,
            "switchport mode access".to_string(),
            format!("switchport access vlan {}", vlan),
            "spanning-tree port type edge".to_string(),
            "spanning-tree bpduguard enable".to_string(),
            NO_SHUTDOWN.to_string(),
        ]);
    }

    Ok(cmds)
}

/// Build the batch that attaches the port's VLAN
///
/// Access ports carry a single VLAN, so attaching replaces it.
pub fn add_vlan(port: &Port) -> CfgMgrResult<Vec<String>> {
    let plan = PortPlan::new(port)?;

    let mut cmds = vec![CONFIGURE_TERMINAL.to_string()];
    cmds.extend(plan.binding_cmd());
    cmds.push(format!("interface {}", plan.context()));
    if plan.trunked {
        cmds.push(format!("switchport trunk allowed vlan add {}", plan.vlan));
    } else {
        cmds.push(format!("switchport access vlan {}", plan.vlan));
    }

    Ok(cmds)
}

/// Build the batch that detaches the port's VLAN
pub fn remove_vlan(port: &Port) -> CfgMgrResult<Vec<String>> {
    let plan = PortPlan::new(port)?;

    let mut cmds = vec![CONFIGURE_TERMINAL.to_string()];
    cmds.extend(plan.binding_cmd().map(|b| format!("{}{}", NEGATE_PREFIX, b)));
    cmds.push(format!("interface {}", plan.context()));
    if plan.trunked {
        cmds.push(format!("switchport trunk allowed vlan remove {}", plan.vlan));
    } else {
        cmds.push(format!("no switchport access vlan {}", plan.vlan));
    }

    Ok(cmds)
}

/// Build the batch that tears a port down once its VLAN is detached
pub fn remove_port(port: &Port) -> CfgMgrResult<Vec<String>> {
    let interface = port.interface_id()?;

    let mut cmds = vec![CONFIGURE_TERMINAL.to_string()];
    if port.trunked {
        cmds.extend(delete_port_channel_interface(&interface));
    }
    cmds.push(format!("interface {}", interface.ethernet_name()));
    cmds.push("no description".to_string());
    if port.trunked {
        cmds.push("no switchport trunk allowed vlan".to_string());
        cmds.push("no switchport mode trunk".to_string());
    }
    cmds.push(SHUTDOWN.to_string());

    Ok(cmds)
}

/// Build the full delete plan: VLAN detach followed by teardown
pub fn delete_port(port: &Port) -> CfgMgrResult<Vec<String>> {
    let mut cmds = remove_vlan(port)?;
    cmds.extend(remove_port(port)?);
    Ok(cmds)
}

/// Build the batch that resets an interface
///
/// `negations` are the negated lines of the interface's current running
/// configuration.
pub fn clear_interface(interface: &Interface, negations: Vec<String>) -> Vec<String> {
    let mut cmds = configure_interface(InterfaceKind::Ethernet, interface);
    cmds.extend(negations);
    cmds.push(SHUTDOWN.to_string());
    cmds.extend(delete_port_channel_interface(interface));
    cmds
}
