use std::error::Error;

use async_trait::async_trait;
use linkme::distributed_slice;
use tokio::sync::mpsc;

use super::message::FromIntegrationMessage;
use super::message::ToIntegrationMessage;
use crate::config::Config;

/// Events and state reports flowing to the engine. Bounded, so a chatty
/// integration is slowed down rather than growing the queue.
pub type FromIntegrationSender = mpsc::Sender<FromIntegrationMessage>;
pub type FromIntegrationReceiver = mpsc::Receiver<FromIntegrationMessage>;

/// Commands flowing to an integration. Unbounded so that routing a command
/// never blocks the caller (HTTP handlers included).
pub type ToIntegrationSender = mpsc::UnboundedSender<ToIntegrationMessage>;

/// Errors crossing the integration boundary
pub type IntegrationError = Box<dyn Error + Send>;

/// `Ok(None)` when the integration is not configured
pub type IntegrationFactoryResult = anyhow::Result<Option<Box<dyn Integration>>>;

/// What a factory gets to look at when deciding whether to build its integration
pub struct IntegrationContext<'a> {
    pub config: &'a Config,
}

pub type IntegrationFactory = fn(&IntegrationContext) -> IntegrationFactoryResult;

/// Every integration compiled into the binary registers a factory here.
#[distributed_slice]
pub static REGISTRY: [IntegrationFactory];

/// A source of entities, driven by the engine from its own task.
///
/// `setup` runs once; afterwards `handle_message` is called for every command
/// addressed to one of the integration's entities, one at a time.
#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;

    /// Connect to the backing system and announce entities through `tx`.
    ///
    /// An error here stops the integration; none of its entities are routed.
    async fn setup(&mut self, tx: FromIntegrationSender) -> Result<(), IntegrationError>;

    /// Act on a command for one of this integration's entities
    async fn handle_message(&mut self, msg: ToIntegrationMessage) -> Result<(), IntegrationError>;

    /// Called once the engine drops its command channel
    async fn shutdown(&mut self) -> Result<(), IntegrationError>;
}
