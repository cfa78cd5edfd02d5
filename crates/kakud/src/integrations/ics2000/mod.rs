//! KlikAanKlikUit ICS-2000 hub integration.
//!
//! RF commands are unacknowledged, so each one is resent according to a
//! [`RetryPolicy`] while a [`ConcurrencyGuard`] keeps at most one command
//! sequence per device in flight.

pub mod catalog;
mod config;
pub mod cover;
pub mod guard;
pub mod hub;
// Private module - allowed by clippy.toml allow-private-module-inception
#[allow(clippy::module_inception)]
mod ics2000;
pub mod light;
pub mod retry;
mod worker;

use std::sync::Arc;

pub use catalog::DeviceCommandCatalog;
pub use config::DeviceConfig;
pub use config::Ics2000Config;
pub use config::Ics2000ConfigError;
pub use guard::ConcurrencyGuard;
pub use hub::Hub;
pub use hub::LoopbackHub;
pub use ics2000::CommandError;
pub use ics2000::Ics2000Integration;
use linkme::distributed_slice;
pub use retry::RetryPolicy;

use crate::engine;

#[distributed_slice(engine::INTEGRATION_REGISTRY)]
fn init_ics2000(ctx: &engine::IntegrationContext) -> engine::IntegrationFactoryResult {
    let config = if let Some(c) = &ctx.config.integrations.ics2000 {
        c
    } else {
        return Ok(None);
    };

    let hub: Arc<dyn Hub> = Arc::new(LoopbackHub::new(config));
    Ok(Some(Box::new(Ics2000Integration::new(hub, config))))
}
