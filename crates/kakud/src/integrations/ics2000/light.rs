//! Light entities backed by hub devices.
//!
//! Both variants keep an assumed-success state: it is updated synchronously
//! with the request, after the workers are spawned, and never rolled back when
//! a command fails.

use std::sync::Arc;

use tracing::info;
use tracing::warn;

use super::catalog::DeviceCommandCatalog;
use super::catalog::HubOperation;
use super::guard::ConcurrencyGuard;
use super::hub::Device;
use super::hub::Hub;
use super::retry::RetryPolicy;
use super::worker::spawn_worker;
use crate::engine::Dispatch;
use crate::engine::Entity;
use crate::engine::LightEntity;
use crate::engine::LightRequest;
use crate::engine::LightState;

/// Brightness assumed for an RF light turned on without a level
pub const FULL_BRIGHTNESS: u8 = 255;

/// Shared plumbing for spawning the workers of one request.
struct Dispatcher {
    device: Device,
    hub: Arc<dyn Hub>,
    guard: ConcurrencyGuard,
    policy: RetryPolicy,
}

impl Dispatcher {
    /// Admit `operations` as one request and spawn a worker per claimed operation.
    ///
    /// The request is dropped when the device is busy or cannot perform one
    /// of the operations.
    fn dispatch(&self, operations: &[HubOperation]) -> Dispatch {
        let kind = self.device.kind;
        if let Some(op) = operations
            .iter()
            .find(|op| !DeviceCommandCatalog::supports(kind, op))
        {
            return self.unsupported(op.name());
        }

        let classes: Vec<_> = operations.iter().map(|op| op.action_class()).collect();
        let Some(mut admission) = self.guard.try_admit(self.device.id, &classes) else {
            info!("{} is busy, dropping request", self.device);
            return Dispatch::Dropped;
        };

        let handles = operations
            .iter()
            .filter_map(|&operation| {
                let claim = admission.take(operation.action_class())?;
                Some(spawn_worker(
                    Arc::clone(&self.hub),
                    self.device.id,
                    operation,
                    self.policy,
                    claim,
                ))
            })
            .collect();

        Dispatch::Spawned(handles)
    }

    fn unsupported(&self, what: &str) -> Dispatch {
        warn!("{} does not support {}", self.device, what);
        Dispatch::Dropped
    }
}

/// RF switch or dimmer.
///
/// Turning on an off light sends only the on command; the level is applied by
/// a later request once the light is on.
pub struct RfLight {
    dispatcher: Dispatcher,
    assumed: LightState,
}

impl RfLight {
    pub fn new(
        device: Device,
        hub: Arc<dyn Hub>,
        guard: ConcurrencyGuard,
        configured: RetryPolicy,
    ) -> Self {
        let policy = DeviceCommandCatalog::retry_policy(device.kind, configured);
        Self {
            dispatcher: Dispatcher {
                device,
                hub,
                guard,
                policy,
            },
            assumed: LightState::default(),
        }
    }
}

impl Entity for RfLight {
    fn name(&self) -> &str {
        &self.dispatcher.device.name
    }

    fn platform(&self) -> &'static str {
        "light"
    }
}

impl LightEntity for RfLight {
    fn is_on(&self) -> Option<bool> {
        self.assumed.on
    }

    fn brightness(&self) -> Option<u8> {
        self.assumed.brightness
    }

    fn request_on(&mut self, request: LightRequest) -> Dispatch {
        let kind = self.dispatcher.device.kind;
        let brightness = request.brightness.unwrap_or(FULL_BRIGHTNESS);

        let operation = if self.assumed.on == Some(true) {
            DeviceCommandCatalog::dim(kind, brightness)
        } else {
            DeviceCommandCatalog::turn_on(kind)
        };
        let Some(operation) = operation else {
            return self.dispatcher.unsupported("turn on");
        };

        let dispatch = self.dispatcher.dispatch(&[operation]);
        if !dispatch.is_dropped() {
            self.assumed.brightness = Some(brightness);
            self.assumed.on = Some(true);
        }
        dispatch
    }

    fn request_off(&mut self) -> Dispatch {
        let Some(operation) = DeviceCommandCatalog::turn_off(self.dispatcher.device.kind) else {
            return self.dispatcher.unsupported("turn off");
        };

        let dispatch = self.dispatcher.dispatch(&[operation]);
        if !dispatch.is_dropped() {
            self.assumed.on = Some(false);
        }
        dispatch
    }
}

/// Zigbee lamp with brightness and color temperature.
///
/// Every command is a single attempt. On, dim and color temperature go out as
/// independent workers that may complete in any order.
pub struct ZigbeeLight {
    dispatcher: Dispatcher,
    assumed: LightState,
}

impl ZigbeeLight {
    pub fn new(device: Device, hub: Arc<dyn Hub>, guard: ConcurrencyGuard) -> Self {
        let policy = DeviceCommandCatalog::retry_policy(device.kind, RetryPolicy::single_attempt());
        Self {
            dispatcher: Dispatcher {
                device,
                hub,
                guard,
                policy,
            },
            assumed: LightState::default(),
        }
    }
}

impl Entity for ZigbeeLight {
    fn name(&self) -> &str {
        &self.dispatcher.device.name
    }

    fn platform(&self) -> &'static str {
        "light"
    }
}

impl LightEntity for ZigbeeLight {
    fn is_on(&self) -> Option<bool> {
        self.assumed.on
    }

    fn brightness(&self) -> Option<u8> {
        self.assumed.brightness
    }

    fn color_temp(&self) -> Option<u16> {
        self.assumed.color_temp
    }

    fn request_on(&mut self, request: LightRequest) -> Dispatch {
        let kind = self.dispatcher.device.kind;

        let mut operations = Vec::with_capacity(3);
        if self.assumed.on != Some(true) {
            operations.extend(DeviceCommandCatalog::turn_on(kind));
        }
        if let Some(brightness) = request.brightness {
            operations.extend(DeviceCommandCatalog::dim(kind, brightness));
        }
        if let Some(value) = request.color_temp {
            operations.extend(DeviceCommandCatalog::color_temp(kind, value));
        }

        let dispatch = self.dispatcher.dispatch(&operations);
        if !dispatch.is_dropped() {
            self.assumed.on = Some(true);
            self.assumed.brightness = request.brightness;
            self.assumed.color_temp = request.color_temp;
        }
        dispatch
    }

    fn request_off(&mut self) -> Dispatch {
        let Some(operation) = DeviceCommandCatalog::turn_off(self.dispatcher.device.kind) else {
            return self.dispatcher.unsupported("turn off");
        };

        let dispatch = self.dispatcher.dispatch(&[operation]);
        if !dispatch.is_dropped() {
            self.assumed.on = Some(false);
        }
        dispatch
    }
}
