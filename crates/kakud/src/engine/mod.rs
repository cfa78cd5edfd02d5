mod engine;
mod entity;
mod integration;
mod message;
pub mod state;

pub use engine::Engine;
pub use engine::EngineError;
pub use entity::Dispatch;
pub use entity::Entity;
pub use entity::LightEntity;
pub use integration::FromIntegrationSender;
pub use integration::Integration;
pub use integration::IntegrationContext;
pub use integration::IntegrationError;
pub use integration::IntegrationFactoryResult;
pub use integration::REGISTRY as INTEGRATION_REGISTRY;
pub use message::FromIntegrationMessage;
pub use message::LightCommand;
pub use message::ToIntegrationMessage;
pub use state::CoverCommand;
pub use state::CoverState;
pub use state::LightRequest;
pub use state::LightState;
pub use state::State;
