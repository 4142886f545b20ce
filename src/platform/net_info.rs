//! Default-gateway and default-interface detection.
//!
//! Grounded in the teacher's `utils::sys_route`, which shells out to the
//! platform's routing tool via `std::process::Command` rather than
//! linking a netlink/routing-table crate.

use std::process::Command;

use crate::error::VpnError;

/// Returns the IPv4 address of the current default gateway.
#[cfg(target_os = "linux")]
pub fn get_default_gw_ip() -> Result<String, VpnError> {
    let output = Command::new("ip")
        .args(["route", "show", "default"])
        .output()
        .map_err(|e| VpnError::ConfigError(format!("failed to run ip route: {}", e)))?;
    parse_gw_from_ip_route(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(target_os = "macos")]
pub fn get_default_gw_ip() -> Result<String, VpnError> {
    let output = Command::new("route")
        .args(["-n", "get", "default"])
        .output()
        .map_err(|e| VpnError::ConfigError(format!("failed to run route get default: {}", e)))?;
    parse_gw_from_route_get(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn get_default_gw_ip() -> Result<String, VpnError> {
    Err(VpnError::ConfigError("default gateway detection not supported on this platform".into()))
}

/// Returns the name of the network interface carrying the default route.
#[cfg(target_os = "linux")]
pub fn get_default_ext_if_name() -> Result<String, VpnError> {
    let output = Command::new("ip")
        .args(["route", "show", "default"])
        .output()
        .map_err(|e| VpnError::ConfigError(format!("failed to run ip route: {}", e)))?;
    parse_dev_from_ip_route(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(target_os = "macos")]
pub fn get_default_ext_if_name() -> Result<String, VpnError> {
    let output = Command::new("route")
        .args(["-n", "get", "default"])
        .output()
        .map_err(|e| VpnError::ConfigError(format!("failed to run route get default: {}", e)))?;
    parse_iface_from_route_get(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn get_default_ext_if_name() -> Result<String, VpnError> {
    Err(VpnError::ConfigError("default interface detection not supported on this platform".into()))
}

#[cfg(target_os = "linux")]
fn parse_gw_from_ip_route(text: &str) -> Result<String, VpnError> {
    text.split_whitespace()
        .zip(text.split_whitespace().skip(1))
        .find(|(word, _)| *word == "via")
        .map(|(_, ip)| ip.to_string())
        .ok_or_else(|| VpnError::ConfigError("no default route found".into()))
}

#[cfg(target_os = "linux")]
fn parse_dev_from_ip_route(text: &str) -> Result<String, VpnError> {
    text.split_whitespace()
        .zip(text.split_whitespace().skip(1))
        .find(|(word, _)| *word == "dev")
        .map(|(_, dev)| dev.to_string())
        .ok_or_else(|| VpnError::ConfigError("no default route found".into()))
}

#[cfg(target_os = "macos")]
fn parse_gw_from_route_get(text: &str) -> Result<String, VpnError> {
    for line in text.lines() {
        if let Some(rest) = line.trim().strip_prefix("gateway:") {
            return Ok(rest.trim().to_string());
        }
    }
    Err(VpnError::ConfigError("no default gateway found".into()))
}

#[cfg(target_os = "macos")]
fn parse_iface_from_route_get(text: &str) -> Result<String, VpnError> {
    for line in text.lines() {
        if let Some(rest) = line.trim().strip_prefix("interface:") {
            return Ok(rest.trim().to_string());
        }
    }
    Err(VpnError::ConfigError("no default interface found".into()))
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn parses_gateway_and_device_from_ip_route_output() {
        let sample = "default via 192.168.1.1 dev eth0 proto dhcp metric 100\n";
        assert_eq!(parse_gw_from_ip_route(sample).unwrap(), "192.168.1.1");
        assert_eq!(parse_dev_from_ip_route(sample).unwrap(), "eth0");
    }
}
