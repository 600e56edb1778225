//! Type definitions for the port manager

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use nexus_cfgmgr_common::{CfgMgrError, CfgMgrResult, Port};

/// Lowest usable VLAN ID
pub const VLAN_ID_MIN: u16 = 1;

/// Highest usable VLAN ID (4095 is reserved)
pub const VLAN_ID_MAX: u16 = 4094;

/// Highest port-channel number NX-OS accepts
pub const PORT_CHANNEL_ID_MAX: u16 = 4096;

/// Longest description NX-OS accepts on an interface
pub const DESCRIPTION_MAX_LEN: usize = 254;

/// Matches `1/20`, `Ethernet1/20`, `ethernet 1/20`, `eth1/20`
static INTERFACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(?:ethernet|eth)?\s*(\d{1,2})/(\d{1,2})$").expect("Invalid regex pattern")
});

/// Matches colon, dash and dotted MAC notations
static MAC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i)(?:[0-9a-f]{2}(?::[0-9a-f]{2}){5}|[0-9a-f]{2}(?:-[0-9a-f]{2}){5}|[0-9a-f]{4}(?:\.[0-9a-f]{4}){2})$",
    )
    .expect("Invalid regex pattern")
});

/// Validated VLAN ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VlanId(u16);

impl VlanId {
    /// Validate a raw VLAN ID
    pub fn new(id: u16) -> CfgMgrResult<Self> {
        if (VLAN_ID_MIN..=VLAN_ID_MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(CfgMgrError::validation(
                "vlan_id",
                format!("{} is outside {}..={}", id, VLAN_ID_MIN, VLAN_ID_MAX),
            ))
        }
    }

    /// Raw VLAN ID
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interface command-context kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Physical ethernet interface
    #[default]
    Ethernet,
    /// Logical port-channel interface
    PortChannel,
}

impl InterfaceKind {
    /// Keyword used in NX-OS commands
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceKind::Ethernet => "ethernet",
            InterfaceKind::PortChannel => "port-channel",
        }
    }
}

impl FromStr for InterfaceKind {
    type Err = CfgMgrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethernet" | "eth" => Ok(InterfaceKind::Ethernet),
            "port-channel" | "portchannel" | "po" => Ok(InterfaceKind::PortChannel),
            other => Err(CfgMgrError::validation(
                "interface kind",
                format!("unknown kind '{}'", other),
            )),
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical interface `slot/port`
///
/// Every physical interface owns one port-channel, numbered
/// `slot * 100 + port`, so the mapping can be walked in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interface {
    slot: u8,
    port: u8,
}

impl Interface {
    /// Build an interface from its slot and port numbers
    pub fn new(slot: u8, port: u8) -> CfgMgrResult<Self> {
        let interface = Self { slot, port };
        if slot == 0 || port == 0 || slot > 99 || port > 99 {
            return Err(CfgMgrError::validation(
                "interface",
                format!("{} must have slot and port in 1..=99", interface),
            ));
        }
        if interface.port_channel_id() > PORT_CHANNEL_ID_MAX {
            return Err(CfgMgrError::validation(
                "interface",
                format!(
                    "{} maps to port-channel {} (max {})",
                    interface,
                    interface.port_channel_id(),
                    PORT_CHANNEL_ID_MAX
                ),
            ));
        }
        Ok(interface)
    }

    /// Recover the physical interface owning a port-channel
    pub fn from_port_channel(id: u16) -> CfgMgrResult<Self> {
        let slot = u8::try_from(id / 100).map_err(|_| {
            CfgMgrError::validation("port-channel", format!("{} is out of range", id))
        })?;
        // id % 100 < 100 always fits
        Self::new(slot, (id % 100) as u8)
    }

    /// Port-channel number owned by this interface
    pub fn port_channel_id(&self) -> u16 {
        u16::from(self.slot) * 100 + u16::from(self.port)
    }

    /// Ethernet command-context name, e.g. `ethernet 1/20`
    pub fn ethernet_name(&self) -> String {
        format!("{} {}", InterfaceKind::Ethernet.as_str(), self)
    }

    /// Port-channel command-context name, e.g. `port-channel 120`
    pub fn port_channel_name(&self) -> String {
        format!(
            "{} {}",
            InterfaceKind::PortChannel.as_str(),
            self.port_channel_id()
        )
    }

    /// Command-context name for `kind`
    pub fn context_name(&self, kind: InterfaceKind) -> String {
        match kind {
            InterfaceKind::Ethernet => self.ethernet_name(),
            InterfaceKind::PortChannel => self.port_channel_name(),
        }
    }
}

impl FromStr for Interface {
    type Err = CfgMgrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = INTERFACE_RE.captures(s.trim()).ok_or_else(|| {
            CfgMgrError::validation(
                "interface",
                format!("'{}' is not a slot/port identifier", s),
            )
        })?;
        // Both groups are one or two digits
        let slot = caps[1].parse::<u8>().unwrap_or(0);
        let port = caps[2].parse::<u8>().unwrap_or(0);
        Self::new(slot, port)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.slot, self.port)
    }
}

/// MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Raw octets
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// NX-OS dotted notation, e.g. `0011.2233.4455`
    pub fn to_nxos(&self) -> String {
        let o = self.0;
        format!(
            "{:02x}{:02x}.{:02x}{:02x}.{:02x}{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = CfgMgrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !MAC_RE.is_match(s) {
            return Err(CfgMgrError::validation(
                "mac_address",
                format!("'{}' is not a MAC address", s),
            ));
        }

        let digits: Vec<u8> = s
            .chars()
            .filter_map(|c| c.to_digit(16))
            .map(|d| d as u8)
            .collect();
        let mut octets = [0u8; 6];
        for (octet, pair) in octets.iter_mut().zip(digits.chunks(2)) {
            *octet = (pair[0] << 4) | pair[1];
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_nxos())
    }
}

/// Static IP source binding for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceBinding {
    /// Host address
    pub ip: IpAddr,
    /// Host MAC
    pub mac: MacAddress,
}

/// Validated views of [`Port`] fields
///
/// All checks run before any command is built, so an invalid port never
/// reaches a switch.
pub trait PortExt {
    /// Parsed physical interface
    fn interface_id(&self) -> CfgMgrResult<Interface>;

    /// Required, range-checked VLAN
    fn vlan(&self) -> CfgMgrResult<VlanId>;

    /// Binding, present only when both IP and MAC are set
    fn source_binding(&self) -> CfgMgrResult<Option<SourceBinding>>;

    /// Interface description derived from the hardware ID
    fn description(&self) -> CfgMgrResult<&str>;
}

impl PortExt for Port {
    fn interface_id(&self) -> CfgMgrResult<Interface> {
        self.interface.parse()
    }

    fn vlan(&self) -> CfgMgrResult<VlanId> {
        match self.vlan_id {
            Some(id) => VlanId::new(id),
            None => Err(CfgMgrError::validation("vlan_id", "required for this operation")),
        }
    }

    fn source_binding(&self) -> CfgMgrResult<Option<SourceBinding>> {
        let (ip, mac) = match (self.ip.as_deref(), self.mac_address.as_deref()) {
            (Some(ip), Some(mac)) => (ip, mac),
            _ => return Ok(None),
        };
        let ip = ip.trim().parse::<IpAddr>().map_err(|_| {
            CfgMgrError::validation("ip", format!("'{}' is not an IP address", ip))
        })?;
        let mac = mac.parse::<MacAddress>()?;
        Ok(Some(SourceBinding { ip, mac }))
    }

    fn description(&self) -> CfgMgrResult<&str> {
        let id = self.hardware_id.trim();
        if id.is_empty() {
            return Err(CfgMgrError::validation("hardware_id", "must not be empty"));
        }
        if id.chars().any(char::is_control) {
            return Err(CfgMgrError::validation(
                "hardware_id",
                "must not contain control characters",
            ));
        }
        if id.len() > DESCRIPTION_MAX_LEN {
            return Err(CfgMgrError::validation(
                "hardware_id",
                format!("longer than {} characters", DESCRIPTION_MAX_LEN),
            ));
        }
        Ok(id)
    }
}
