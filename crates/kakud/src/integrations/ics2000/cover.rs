use std::sync::Arc;

use tracing::info;
use tracing::warn;

use super::catalog::DeviceCommandCatalog;
use super::guard::ConcurrencyGuard;
use super::hub::Device;
use super::hub::Hub;
use super::retry::RetryPolicy;
use super::worker::spawn_worker;
use crate::engine::CoverCommand;
use crate::engine::CoverState;
use crate::engine::Dispatch;
use crate::engine::Entity;

/// RF sunshade. Commands are sent once and the motor reports no position.
pub struct Sunshade {
    device: Device,
    hub: Arc<dyn Hub>,
    guard: ConcurrencyGuard,
    policy: RetryPolicy,
    assumed: CoverState,
}

impl Sunshade {
    pub fn new(device: Device, hub: Arc<dyn Hub>, guard: ConcurrencyGuard) -> Self {
        let policy = DeviceCommandCatalog::retry_policy(device.kind, RetryPolicy::single_attempt());
        Self {
            device,
            hub,
            guard,
            policy,
            assumed: CoverState::default(),
        }
    }

    pub fn state(&self) -> CoverState {
        self.assumed
    }

    pub fn request(&mut self, command: CoverCommand) -> Dispatch {
        let Some(operation) = DeviceCommandCatalog::cover(self.device.kind, command) else {
            warn!("{} does not support {}", self.device, command);
            return Dispatch::Dropped;
        };

        let class = operation.action_class();
        let Some(claim) = self
            .guard
            .try_admit(self.device.id, &[class])
            .and_then(|mut admission| admission.take(class))
        else {
            info!("{} is busy, dropping {}", self.device, command);
            return Dispatch::Dropped;
        };

        let handle = spawn_worker(
            Arc::clone(&self.hub),
            self.device.id,
            operation,
            self.policy,
            claim,
        );
        self.assumed.last_command = Some(command);
        Dispatch::Spawned(vec![handle])
    }
}

impl Entity for Sunshade {
    fn name(&self) -> &str {
        &self.device.name
    }

    fn platform(&self) -> &'static str {
        "cover"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::integrations::ics2000::catalog::HubOperation;
    use crate::integrations::ics2000::hub::DeviceId;
    use crate::integrations::ics2000::hub::DeviceKind;
    use crate::integrations::ics2000::hub::mock::MockHub;

    fn sunshade(hub: &Arc<MockHub>) -> Sunshade {
        let device = Device {
            id: DeviceId(30),
            name: "Terrace screen".to_string(),
            kind: DeviceKind::Sunshade,
        };
        Sunshade::new(device, hub.clone(), ConcurrencyGuard::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_sends_single_command() {
        let hub = Arc::new(MockHub::new());
        let mut cover = sunshade(&hub);

        cover.request(CoverCommand::Open).join().await;

        assert_eq!(hub.operations(), vec![(DeviceId(30), HubOperation::Open)]);
        assert_eq!(cover.state().last_command, Some(CoverCommand::Open));
        assert_eq!(cover.platform(), "cover");
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_in_flight_drops_next() {
        let hub = Arc::new(MockHub {
            latency: Duration::from_millis(500),
            ..MockHub::default()
        });
        let mut cover = sunshade(&hub);

        let close = cover.request(CoverCommand::Close);
        assert!(cover.request(CoverCommand::Stop).is_dropped());
        assert_eq!(cover.state().last_command, Some(CoverCommand::Close));

        close.join().await;
        assert!(!cover.request(CoverCommand::Stop).is_dropped());
    }
}
