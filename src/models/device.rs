//! Connected device representation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, UnpinnerError};

/// Connection state as reported by `host:devices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    /// Online and ready for commands
    Device,
    /// Known to the server but not responding
    Offline,
    /// Connected but the host key was not accepted on the device
    Unauthorized,
    /// Recovery mode
    Recovery,
    /// Bootloader / fastboot mode
    Bootloader,
    /// Any state this tool does not know about
    Unknown(String),
}

impl DeviceState {
    /// Whether the device can accept shell and sync services
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Device)
    }
}

impl FromStr for DeviceState {
    type Err = UnpinnerError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "device" => Self::Device,
            "offline" => Self::Offline,
            "unauthorized" => Self::Unauthorized,
            "recovery" => Self::Recovery,
            "bootloader" => Self::Bootloader,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Offline => write!(f, "offline"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Recovery => write!(f, "recovery"),
            Self::Bootloader => write!(f, "bootloader"),
            Self::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// One row of the ADB server's device list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device serial number
    pub serial: String,
    /// Connection state
    pub state: DeviceState,
}

impl DeviceInfo {
    /// Parse a single `serial\tstate` line from `host:devices`
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let serial = parts.next()?.to_string();
        let state = parts.next()?.parse().ok()?;
        Some(Self { serial, state })
    }

    /// Parse the full `host:devices` payload
    pub fn parse_list(payload: &str) -> Vec<Self> {
        payload.lines().filter_map(Self::parse_line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let payload = "emulator-5554\tdevice\nRF8M33XXXXX\tunauthorized\n";
        let devices = DeviceInfo::parse_list(payload);

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert_eq!(devices[0].state, DeviceState::Device);
        assert_eq!(devices[1].state, DeviceState::Unauthorized);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let payload = "emulator-5554\tdevice\n\njunk\n";
        let devices = DeviceInfo::parse_list(payload);
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn test_unknown_state_round_trip() {
        let state: DeviceState = "sideload".parse().unwrap();
        assert_eq!(state, DeviceState::Unknown("sideload".into()));
        assert_eq!(state.to_string(), "sideload");
        assert!(!state.is_online());
    }
}
