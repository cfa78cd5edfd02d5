use tokio::task::JoinHandle;

use super::state::LightRequest;
use super::state::LightState;

/// Outcome of a command request on an entity.
#[derive(Debug)]
pub enum Dispatch {
    /// A command for the device was still in flight; nothing was sent.
    Dropped,

    /// One worker per hub operation was started.
    Spawned(Vec<JoinHandle<()>>),
}

impl Dispatch {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Dispatch::Dropped)
    }

    pub fn worker_count(&self) -> usize {
        match self {
            Dispatch::Dropped => 0,
            Dispatch::Spawned(handles) => handles.len(),
        }
    }

    /// Wait for every spawned worker to finish
    pub async fn join(self) {
        if let Dispatch::Spawned(handles) = self {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!("Worker task failed: {}", e);
                }
            }
        }
    }
}

/// Base trait that all entities must implement
pub trait Entity: Send + Sync {
    /// Display name of the entity
    fn name(&self) -> &str;

    /// Return the platform type of this entity (e.g. "light", "cover")
    fn platform(&self) -> &'static str;
}

/// A light that can be switched and dimmed.
///
/// Request methods return as soon as the command workers are spawned; the
/// readable state reflects the request immediately.
pub trait LightEntity: Entity {
    fn is_on(&self) -> Option<bool>;

    fn brightness(&self) -> Option<u8>;

    fn color_temp(&self) -> Option<u16> {
        None
    }

    fn request_on(&mut self, request: LightRequest) -> Dispatch;

    fn request_off(&mut self) -> Dispatch;

    fn state(&self) -> LightState {
        LightState {
            on: self.is_on(),
            brightness: self.brightness(),
            color_temp: self.color_temp(),
        }
    }
}
