use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use super::hub::DeviceId;
use super::hub::DeviceKind;
use super::retry::RetryPolicy;

fn default_tries() -> u32 {
    3
}

fn default_sleep() -> u64 {
    3
}

/// Configuration for the ICS-2000 integration
#[derive(Debug, Clone, Deserialize)]
pub struct Ics2000Config {
    /// MAC address of the hub
    pub mac: String,

    /// Account email used to authenticate with the hub
    pub email: String,

    /// Account password
    pub password: String,

    /// How many times each RF command is sent (default: 3)
    #[serde(default = "default_tries")]
    pub tries: u32,

    /// Seconds between repeated RF commands (default: 3)
    #[serde(default = "default_sleep")]
    pub sleep: u64,

    /// Devices paired with the hub
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
}

impl Ics2000Config {
    /// Retry policy for RF switches and dimmers
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.tries, Duration::from_secs(self.sleep))
    }

    pub fn validate(&self) -> Result<(), Ics2000ConfigError> {
        if self.mac.trim().is_empty() {
            return Err(Ics2000ConfigError::Empty("mac"));
        }
        if self.email.trim().is_empty() {
            return Err(Ics2000ConfigError::Empty("email"));
        }
        if self.tries == 0 {
            return Err(Ics2000ConfigError::ZeroTries);
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.id) {
                return Err(Ics2000ConfigError::DuplicateDevice(device.id));
            }
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Ics2000ConfigError {
    #[error("integrations.ics2000.{0} must not be empty")]
    Empty(&'static str),

    #[error("integrations.ics2000.tries must be at least 1")]
    ZeroTries,

    #[error("integrations.ics2000.devices: duplicate device id {0}")]
    DuplicateDevice(DeviceId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let toml = r#"
            mac = "00:11:22:33:44:55"
            email = "user@example.com"
            password = "secret"
        "#;

        let config: Ics2000Config = toml::from_str(toml).unwrap();
        assert_eq!(config.tries, 3);
        assert_eq!(config.sleep, 3);
        assert!(config.devices.is_empty());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_devices() {
        let toml = r#"
            mac = "00:11:22:33:44:55"
            email = "user@example.com"
            password = "secret"
            tries = 5
            sleep = 1

            [[devices]]
            id = 12
            name = "Hallway"
            kind = "dimmer"

            [[devices]]
            id = 40
            name = "Desk"
            kind = "zigbee_lamp"
        "#;

        let config: Ics2000Config = toml::from_str(toml).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].id, DeviceId(12));
        assert_eq!(config.devices[1].kind, DeviceKind::ZigbeeLamp);
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(5, Duration::from_secs(1))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_tries() {
        let toml = r#"
            mac = "00:11:22:33:44:55"
            email = "user@example.com"
            password = "secret"
            tries = 0
        "#;

        let config: Ics2000Config = toml::from_str(toml).unwrap();
        assert_eq!(config.validate(), Err(Ics2000ConfigError::ZeroTries));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let toml = r#"
            mac = "00:11:22:33:44:55"
            email = "user@example.com"
            password = "secret"

            [[devices]]
            id = 3
            name = "A"
            kind = "switch"

            [[devices]]
            id = 3
            name = "B"
            kind = "dimmer"
        "#;

        let config: Ics2000Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err, Ics2000ConfigError::DuplicateDevice(DeviceId(3)));
        assert_eq!(
            err.to_string(),
            "integrations.ics2000.devices: duplicate device id 3"
        );
    }

    #[test]
    fn test_validate_rejects_empty_mac() {
        let toml = r#"
            mac = " "
            email = "user@example.com"
            password = "secret"
        "#;

        let config: Ics2000Config = toml::from_str(toml).unwrap();
        assert_eq!(config.validate(), Err(Ics2000ConfigError::Empty("mac")));
    }
}
