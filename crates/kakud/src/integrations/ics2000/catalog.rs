use std::fmt;

use super::guard::ActionClass;
use super::hub::DeviceId;
use super::hub::DeviceKind;
use super::hub::Hub;
use super::hub::HubError;
use super::retry::RetryPolicy;
use crate::engine::CoverCommand;

/// Highest brightness level an RF dimmer accepts
pub const RF_MAX_LEVEL: u8 = 15;

/// Host brightness steps per RF dimmer level (255 / 15)
const RF_LEVEL_STEP: u8 = 17;

/// A single command the hub can send, with its wire parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubOperation {
    TurnOn,
    TurnOff,
    /// RF dim, `level` in 1..=15
    Dim { level: u8 },
    ZigbeeOn,
    ZigbeeOff,
    /// Zigbee dim, host brightness passed through unchanged
    ZigbeeDim { level: u8 },
    ZigbeeColorTemp { value: u16 },
    Open,
    Close,
    Stop,
}

impl HubOperation {
    pub fn name(&self) -> &'static str {
        match self {
            HubOperation::TurnOn => "turn_on",
            HubOperation::TurnOff => "turn_off",
            HubOperation::Dim { .. } => "dim",
            HubOperation::ZigbeeOn => "zigbee_on",
            HubOperation::ZigbeeOff => "zigbee_off",
            HubOperation::ZigbeeDim { .. } => "zigbee_dim",
            HubOperation::ZigbeeColorTemp { .. } => "zigbee_color_temp",
            HubOperation::Open => "open",
            HubOperation::Close => "close",
            HubOperation::Stop => "stop",
        }
    }

    /// The exclusion class a worker running this operation claims
    pub fn action_class(&self) -> ActionClass {
        match self {
            HubOperation::TurnOn | HubOperation::ZigbeeOn => ActionClass::On,
            HubOperation::TurnOff | HubOperation::ZigbeeOff => ActionClass::Off,
            HubOperation::Dim { .. } | HubOperation::ZigbeeDim { .. } => ActionClass::Dim,
            HubOperation::ZigbeeColorTemp { .. } => ActionClass::ChangeTemperature,
            HubOperation::Open => ActionClass::Open,
            HubOperation::Close => ActionClass::Close,
            HubOperation::Stop => ActionClass::Stop,
        }
    }

    /// Send this operation to `device` through `hub`
    pub async fn invoke(&self, hub: &dyn Hub, device: DeviceId) -> Result<(), HubError> {
        match *self {
            HubOperation::TurnOn => hub.turn_on(device).await,
            HubOperation::TurnOff => hub.turn_off(device).await,
            HubOperation::Dim { level } => hub.dim(device, level).await,
            HubOperation::ZigbeeOn => hub.zigbee_on(device).await,
            HubOperation::ZigbeeOff => hub.zigbee_off(device).await,
            HubOperation::ZigbeeDim { level } => hub.zigbee_dim(device, level).await,
            HubOperation::ZigbeeColorTemp { value } => hub.zigbee_color_temp(device, value).await,
            HubOperation::Open => hub.open(device).await,
            HubOperation::Close => hub.close(device).await,
            HubOperation::Stop => hub.stop(device).await,
        }
    }
}

impl fmt::Display for HubOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubOperation::Dim { level } | HubOperation::ZigbeeDim { level } => {
                write!(f, "{}({})", self.name(), level)
            }
            HubOperation::ZigbeeColorTemp { value } => write!(f, "{}({})", self.name(), value),
            _ => f.write_str(self.name()),
        }
    }
}

/// Which hub operations each device kind accepts, and how request
/// parameters are converted for the wire.
pub struct DeviceCommandCatalog;

impl DeviceCommandCatalog {
    /// Names of the operations available for `kind`
    pub fn operations(kind: DeviceKind) -> &'static [&'static str] {
        match kind {
            DeviceKind::Switch | DeviceKind::Dimmer => &["turn_on", "turn_off", "dim"],
            DeviceKind::ZigbeeLamp => &["zigbee_on", "zigbee_off", "zigbee_dim", "zigbee_color_temp"],
            DeviceKind::Sunshade => &["open", "close", "stop"],
        }
    }

    pub fn supports(kind: DeviceKind, operation: &HubOperation) -> bool {
        Self::operations(kind).contains(&operation.name())
    }

    pub fn turn_on(kind: DeviceKind) -> Option<HubOperation> {
        match kind {
            DeviceKind::Switch | DeviceKind::Dimmer => Some(HubOperation::TurnOn),
            DeviceKind::ZigbeeLamp => Some(HubOperation::ZigbeeOn),
            DeviceKind::Sunshade => None,
        }
    }

    pub fn turn_off(kind: DeviceKind) -> Option<HubOperation> {
        match kind {
            DeviceKind::Switch | DeviceKind::Dimmer => Some(HubOperation::TurnOff),
            DeviceKind::ZigbeeLamp => Some(HubOperation::ZigbeeOff),
            DeviceKind::Sunshade => None,
        }
    }

    /// Dim to a host brightness (0-255)
    pub fn dim(kind: DeviceKind, brightness: u8) -> Option<HubOperation> {
        match kind {
            DeviceKind::Switch | DeviceKind::Dimmer => Some(HubOperation::Dim {
                level: rf_dim_level(brightness),
            }),
            DeviceKind::ZigbeeLamp => Some(HubOperation::ZigbeeDim { level: brightness }),
            DeviceKind::Sunshade => None,
        }
    }

    pub fn color_temp(kind: DeviceKind, value: u16) -> Option<HubOperation> {
        match kind {
            DeviceKind::ZigbeeLamp => Some(HubOperation::ZigbeeColorTemp { value }),
            _ => None,
        }
    }

    pub fn cover(kind: DeviceKind, command: CoverCommand) -> Option<HubOperation> {
        match (kind, command) {
            (DeviceKind::Sunshade, CoverCommand::Open) => Some(HubOperation::Open),
            (DeviceKind::Sunshade, CoverCommand::Close) => Some(HubOperation::Close),
            (DeviceKind::Sunshade, CoverCommand::Stop) => Some(HubOperation::Stop),
            _ => None,
        }
    }

    /// Retry policy for `kind`; only RF lights use the configured one
    pub fn retry_policy(kind: DeviceKind, configured: RetryPolicy) -> RetryPolicy {
        match kind {
            DeviceKind::Switch | DeviceKind::Dimmer => configured,
            DeviceKind::ZigbeeLamp | DeviceKind::Sunshade => RetryPolicy::single_attempt(),
        }
    }
}

/// Convert host brightness (0-255) to an RF dimmer level (1-15).
///
/// `ceil(brightness / 17)`, with 0 clamped up to the lowest level so a dim
/// never leaves the device's accepted range.
pub fn rf_dim_level(brightness: u8) -> u8 {
    brightness.div_ceil(RF_LEVEL_STEP).clamp(1, RF_MAX_LEVEL)
}
