use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use tracing::info;

use super::config::Ics2000Config;

/// Identifier the hub assigns to a paired device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of device as reported by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    /// RF on/off switch or plug
    Switch,
    /// RF dimmer (brightness 1-15 on the wire)
    Dimmer,
    /// Zigbee lamp with brightness and color temperature
    ZigbeeLamp,
    /// RF sunshade / screen motor
    Sunshade,
}

/// A device paired with the hub.
///
/// Immutable after discovery; entities keep a copy and address the hub by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, id {})", self.name, self.kind, self.id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Could not connect to hub: {0}")]
    Connection(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("Hub I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for an ICS-2000 style hub.
///
/// All commands are fire-and-forget: `Ok(())` means the hub accepted the
/// command, not that the device received it. Implementations are shared by
/// every worker across all devices and must tolerate concurrent calls.
#[async_trait]
pub trait Hub: Send + Sync {
    /// Establish the hub session.
    async fn connect(&self) -> Result<(), HubError>;

    /// Devices currently paired with the hub.
    async fn devices(&self) -> Result<Vec<Device>, HubError>;

    async fn turn_on(&self, device: DeviceId) -> Result<(), HubError>;

    async fn turn_off(&self, device: DeviceId) -> Result<(), HubError>;

    /// Dim an RF device, `level` in 1..=15
    async fn dim(&self, device: DeviceId, level: u8) -> Result<(), HubError>;

    async fn zigbee_on(&self, device: DeviceId) -> Result<(), HubError>;

    async fn zigbee_off(&self, device: DeviceId) -> Result<(), HubError>;

    async fn zigbee_dim(&self, device: DeviceId, level: u8) -> Result<(), HubError>;

    async fn zigbee_color_temp(&self, device: DeviceId, value: u16) -> Result<(), HubError>;

    async fn open(&self, device: DeviceId) -> Result<(), HubError>;

    async fn close(&self, device: DeviceId) -> Result<(), HubError>;

    async fn stop(&self, device: DeviceId) -> Result<(), HubError>;
}

/// Hub bundled with the daemon.
///
/// The device inventory comes from configuration and commands are written to
/// the log instead of the radio. Useful for running the daemon and API without
/// hardware attached.
pub struct LoopbackHub {
    mac: String,
    inventory: HashMap<DeviceId, Device>,
    connected: AtomicBool,
    commands_sent: AtomicU64,
}

impl LoopbackHub {
    pub fn new(config: &Ics2000Config) -> Self {
        let inventory = config
            .devices
            .iter()
            .map(|d| {
                let device = Device {
                    id: d.id,
                    name: d.name.clone(),
                    kind: d.kind,
                };
                (d.id, device)
            })
            .collect();

        Self {
            mac: config.mac.clone(),
            inventory,
            connected: AtomicBool::new(false),
            commands_sent: AtomicU64::new(0),
        }
    }

    /// Number of commands accepted since startup
    #[cfg(test)]
    fn commands_sent(&self) -> u64 {
        self.commands_sent.load(Ordering::Relaxed)
    }

    fn send(&self, device: DeviceId, command: fmt::Arguments<'_>) -> Result<(), HubError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(HubError::Connection("hub session not established".to_string()));
        }
        let target = self
            .inventory
            .get(&device)
            .ok_or(HubError::UnknownDevice(device))?;

        let sent = self.commands_sent.fetch_add(1, Ordering::Relaxed) + 1;
        info!(hub = %self.mac, sent, "{} -> {}", target, command);
        Ok(())
    }
}

#[async_trait]
impl Hub for LoopbackHub {
    async fn connect(&self) -> Result<(), HubError> {
        if self.mac.trim().is_empty() {
            return Err(HubError::Connection("no hub MAC address configured".to_string()));
        }
        self.connected.store(true, Ordering::Release);
        info!("Connected to loopback hub {}", self.mac);
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, HubError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(HubError::Connection("hub session not established".to_string()));
        }
        let mut devices: Vec<Device> = self.inventory.values().cloned().collect();
        devices.sort_by_key(|d| d.id);
        Ok(devices)
    }

    async fn turn_on(&self, device: DeviceId) -> Result<(), HubError> {
        self.send(device, format_args!("on"))
    }

    async fn turn_off(&self, device: DeviceId) -> Result<(), HubError> {
        self.send(device, format_args!("off"))
    }

    async fn dim(&self, device: DeviceId, level: u8) -> Result<(), HubError> {
        self.send(device, format_args!("dim {}", level))
    }

    async fn zigbee_on(&self, device: DeviceId) -> Result<(), HubError> {
        self.send(device, format_args!("zigbee on"))
    }

    async fn zigbee_off(&self, device: DeviceId) -> Result<(), HubError> {
        self.send(device, format_args!("zigbee off"))
    }

    async fn zigbee_dim(&self, device: DeviceId, level: u8) -> Result<(), HubError> {
        self.send(device, format_args!("zigbee dim {}", level))
    }

    async fn zigbee_color_temp(&self, device: DeviceId, value: u16) -> Result<(), HubError> {
        self.send(device, format_args!("zigbee color temp {}", value))
    }

    async fn open(&self, device: DeviceId) -> Result<(), HubError> {
        self.send(device, format_args!("open"))
    }

    async fn close(&self, device: DeviceId) -> Result<(), HubError> {
        self.send(device, format_args!("close"))
    }

    async fn stop(&self, device: DeviceId) -> Result<(), HubError> {
        self.send(device, format_args!("stop"))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::ics2000::config::DeviceConfig;

    fn config(mac: &str) -> Ics2000Config {
        Ics2000Config {
            mac: mac.to_string(),
            email: "user@example.com".to_string(),
            password: "secret".to_string(),
            tries: 3,
            sleep: 3,
            devices: vec![
                DeviceConfig {
                    id: DeviceId(7),
                    name: "Porch".to_string(),
                    kind: DeviceKind::Switch,
                },
                DeviceConfig {
                    id: DeviceId(2),
                    name: "Desk lamp".to_string(),
                    kind: DeviceKind::ZigbeeLamp,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_loopback_requires_connection() {
        let hub = LoopbackHub::new(&config("00:11:22:33:44:55"));
        assert!(matches!(hub.devices().await, Err(HubError::Connection(_))));
        assert!(matches!(
            hub.turn_on(DeviceId(7)).await,
            Err(HubError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_loopback_connect_fails_without_mac() {
        let hub = LoopbackHub::new(&config(""));
        assert!(matches!(hub.connect().await, Err(HubError::Connection(_))));
    }

    #[tokio::test]
    async fn test_loopback_lists_devices_sorted() {
        let hub = LoopbackHub::new(&config("00:11:22:33:44:55"));
        hub.connect().await.unwrap();

        let devices = hub.devices().await.unwrap();
        let ids: Vec<_> = devices.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DeviceId(2), DeviceId(7)]);
        assert_eq!(devices[0].kind, DeviceKind::ZigbeeLamp);
    }

    #[tokio::test]
    async fn test_loopback_counts_commands() {
        let hub = LoopbackHub::new(&config("00:11:22:33:44:55"));
        hub.connect().await.unwrap();

        hub.turn_on(DeviceId(7)).await.unwrap();
        hub.dim(DeviceId(7), 4).await.unwrap();
        assert!(matches!(
            hub.turn_off(DeviceId(99)).await,
            Err(HubError::UnknownDevice(DeviceId(99)))
        ));
        assert_eq!(hub.commands_sent(), 2);
    }
}
