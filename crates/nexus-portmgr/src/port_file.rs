//! Port records read from TOML/JSON files
//!
//! A [`PortFile`] is the on-disk and command-line shape of a [`Port`]: every
//! field is optional so command-line flags can be layered over a file.
//!
//! ```toml
//! interface = "1/20"
//! hardware_id = "host-42"
//! vlan_id = 100
//! trunked = true
//! switch_host = "10.0.0.1"
//! switch_username = "admin"
//! ```

use std::path::Path;

use figment::{
    providers::{Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use nexus_cfgmgr_common::{CfgMgrError, CfgMgrResult, Port};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trunked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_password: Option<String>,
}

impl PortFile {
    /// Layers `overrides` over the file at `path`, if any
    ///
    /// Files ending in `.json` are read as JSON, anything else as TOML.
    pub fn resolve(path: Option<&Path>, overrides: &PortFile) -> CfgMgrResult<Port> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            if !path.exists() {
                return Err(CfgMgrError::invalid_config(
                    "port file",
                    format!("{} does not exist", path.display()),
                ));
            }
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        let merged: PortFile = figment.merge(Serialized::defaults(overrides)).extract()?;
        merged.into_port()
    }

    /// Converts into a [`Port`], requiring the interface and switch login
    pub fn into_port(self) -> CfgMgrResult<Port> {
        let interface = required(self.interface, "interface")?;
        let switch_host = required(self.switch_host, "switch_host")?;
        let switch_username = required(self.switch_username, "switch_username")?;

        let mut port = Port::new(
            interface,
            self.hardware_id.unwrap_or_default(),
            switch_host,
            switch_username,
            self.switch_password.unwrap_or_default(),
        )
        .with_trunked(self.trunked.unwrap_or(false));
        port.vlan_id = self.vlan_id;
        port.ip = self.ip;
        port.mac_address = self.mac_address;
        Ok(port)
    }
}

fn required(value: Option<String>, field: &str) -> CfgMgrResult<String> {
    value.ok_or_else(|| CfgMgrError::validation(field, "is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_resolve_toml_file() {
        let file = write_file(
            ".toml",
            r#"
            interface = "1/20"
            hardware_id = "host-42"
            vlan_id = 100
            trunked = true
            switch_host = "10.0.0.1"
            switch_username = "admin"
            switch_password = "secret"
            "#,
        );

        let port = PortFile::resolve(Some(file.path()), &PortFile::default()).unwrap();
        assert_eq!(port.interface, "1/20");
        assert_eq!(port.vlan_id, Some(100));
        assert!(port.trunked);
        assert!(!format!("{:?}", port).contains("secret"));
    }

    #[test]
    fn test_resolve_json_file_with_overrides() {
        let file = write_file(
            ".json",
            r#"{"interface": "1/20", "vlan_id": 100, "switch_host": "10.0.0.1", "switch_username": "admin"}"#,
        );
        let overrides = PortFile {
            vlan_id: Some(200),
            ip: Some("10.1.1.5".to_string()),
            ..PortFile::default()
        };

        let port = PortFile::resolve(Some(file.path()), &overrides).unwrap();
        assert_eq!(port.vlan_id, Some(200));
        assert_eq!(port.ip.as_deref(), Some("10.1.1.5"));
        assert_eq!(port.switch_host, "10.0.0.1");
        assert!(!port.trunked);
    }

    #[test]
    fn test_resolve_flags_only() {
        let flags = PortFile {
            interface: Some("eth1/5".to_string()),
            switch_host: Some("sw1".to_string()),
            switch_username: Some("admin".to_string()),
            ..PortFile::default()
        };
        let port = PortFile::resolve(None, &flags).unwrap();
        assert_eq!(port.interface, "eth1/5");
        assert_eq!(port.hardware_id, "");
    }

    #[test]
    fn test_missing_required_fields() {
        let err = PortFile::default().into_port().unwrap_err();
        assert!(err.to_string().contains("interface"));

        let err = PortFile::resolve(Some(Path::new("/nonexistent/port.toml")), &PortFile::default())
            .unwrap_err();
        assert!(matches!(err, CfgMgrError::InvalidConfig { .. }));
    }
}
