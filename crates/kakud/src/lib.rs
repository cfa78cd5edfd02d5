pub mod api;
pub mod config;
pub mod engine;
pub mod integrations;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use engine::CoverCommand;
pub use engine::CoverState;
pub use engine::Engine;
pub use engine::LightCommand;
pub use engine::LightRequest;
pub use engine::LightState;
pub use engine::State;
