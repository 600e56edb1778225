//! Running-configuration reply filtering

use nexus_cfgmgr_common::{CfgMgrResult, Response};

/// Line prefixes that carry no interface configuration
const SKIPPED_PREFIXES: &[&str] = &["!", "version ", "interface"];

/// Extract the configuration lines from a `show running-config` reply
///
/// The reply must hold exactly one payload element.
pub fn interface_config(response: &Response) -> CfgMgrResult<Vec<String>> {
    Ok(config_lines(response.payload()?))
}

/// Filter a running-configuration dump down to its configuration lines
///
/// Lines are trimmed; blank lines, comments, the version banner and the
/// interface header are dropped. Order is preserved.
pub fn config_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !SKIPPED_PREFIXES.iter().any(|p| line.starts_with(p)))
        .map(str::to_string)
        .collect()
}
