//! Type-safe message system for kakud
//!
//! Messages are split by direction to enforce correct usage at compile time:
//! - `FromIntegrationMessage`: Events from integrations to the engine
//! - `ToIntegrationMessage`: Commands from the engine to integrations

use super::state::CoverCommand;
use super::state::CoverState;
use super::state::LightRequest;
use super::state::LightState;

/// Messages FROM integrations TO the engine (events/state updates)
#[derive(Debug, Clone)]
pub enum FromIntegrationMessage {
    /// An entity was discovered and registered
    EntityDiscovered {
        entity_id: String,
        integration_name: String,
    },

    /// A light's assumed state changed
    LightStateChanged { entity_id: String, state: LightState },

    /// A cover was sent a command
    CoverStateChanged { entity_id: String, state: CoverState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
    TurnOn(LightRequest),
    TurnOff,
}

/// Messages FROM the engine TO integrations (commands)
#[derive(Debug, Clone)]
pub enum ToIntegrationMessage {
    LightCommand {
        entity_id: String,
        command: LightCommand,
    },

    CoverCommand {
        entity_id: String,
        command: CoverCommand,
    },
}

impl ToIntegrationMessage {
    /// Entity the command is addressed to
    pub fn entity_id(&self) -> &str {
        match self {
            ToIntegrationMessage::LightCommand { entity_id, .. }
            | ToIntegrationMessage::CoverCommand { entity_id, .. } => entity_id,
        }
    }
}
