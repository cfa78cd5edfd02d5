use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use strum::Display;

/// Assumed state of a light entity.
///
/// Updated as soon as a command is dispatched, without waiting for the device.
/// `on` is `None` until the first command is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LightState {
    pub on: Option<bool>,

    /// Brightness level (0-255), if known.
    pub brightness: Option<u8>,

    /// Color temperature in device units, Zigbee lamps only.
    pub color_temp: Option<u16>,
}

/// Parameters of a turn-on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LightRequest {
    /// Brightness level (0-255)
    #[serde(default)]
    pub brightness: Option<u8>,

    #[serde(default)]
    pub color_temp: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CoverCommand {
    Open,
    Close,
    Stop,
}

/// State of a cover entity. Covers report no position, only what was last sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverState {
    pub last_command: Option<CoverCommand>,
}

/// Centralized snapshot of the entire engine state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct State {
    pub lights: HashMap<String, LightState>,
    pub covers: HashMap<String, CoverState>,
}
