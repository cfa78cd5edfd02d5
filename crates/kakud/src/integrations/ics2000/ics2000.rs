use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::DeviceCommandCatalog;
use super::Ics2000Config;
use super::cover::Sunshade;
use super::guard::ConcurrencyGuard;
use super::hub::Device;
use super::hub::DeviceKind;
use super::hub::Hub;
use super::light::RfLight;
use super::light::ZigbeeLight;
use super::retry::RetryPolicy;
use crate::engine::CoverCommand;
use crate::engine::Dispatch;
use crate::engine::Entity;
use crate::engine::FromIntegrationMessage;
use crate::engine::FromIntegrationSender;
use crate::engine::Integration;
use crate::engine::IntegrationError;
use crate::engine::LightCommand;
use crate::engine::LightEntity;
use crate::engine::ToIntegrationMessage;

const INTEGRATION_NAME: &str = "ics2000";

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Light not found: {0}")]
    UnknownLight(String),

    #[error("Cover not found: {0}")]
    UnknownCover(String),
}

/// ICS-2000 integration for kakud
///
/// Connects to the hub, registers one entity per paired device and turns
/// engine commands into hub workers.
pub struct Ics2000Integration {
    hub: Arc<dyn Hub>,
    policy: RetryPolicy,
    guard: ConcurrencyGuard,
    lights: HashMap<String, Box<dyn LightEntity>>,
    covers: HashMap<String, Sunshade>,
    to_engine: Option<FromIntegrationSender>,
}

impl Ics2000Integration {
    pub fn new(hub: Arc<dyn Hub>, config: &Ics2000Config) -> Self {
        Self::with_policy(hub, config.retry_policy())
    }

    pub fn with_policy(hub: Arc<dyn Hub>, policy: RetryPolicy) -> Self {
        Self {
            hub,
            policy,
            guard: ConcurrencyGuard::new(),
            lights: HashMap::new(),
            covers: HashMap::new(),
            to_engine: None,
        }
    }

    /// Build entities for the discovered devices and return their ids
    fn add_devices(&mut self, devices: Vec<Device>) -> Vec<String> {
        let mut entity_ids = Vec::with_capacity(devices.len());
        let mut zigbee = 0;

        for device in devices {
            let platform = match device.kind {
                DeviceKind::Sunshade => "cover",
                _ => "light",
            };
            let entity_id = self.unique_entity_id(platform, &device);
            info!(
                "Discovered {} as {} [{}]",
                device,
                entity_id,
                DeviceCommandCatalog::operations(device.kind).join(", ")
            );

            let hub = Arc::clone(&self.hub);
            let guard = self.guard.clone();
            match device.kind {
                DeviceKind::Switch | DeviceKind::Dimmer => {
                    let light = RfLight::new(device, hub, guard, self.policy);
                    self.lights.insert(entity_id.clone(), Box::new(light));
                }
                DeviceKind::ZigbeeLamp => {
                    zigbee += 1;
                    let light = ZigbeeLight::new(device, hub, guard);
                    self.lights.insert(entity_id.clone(), Box::new(light));
                }
                DeviceKind::Sunshade => {
                    let cover = Sunshade::new(device, hub, guard);
                    self.covers.insert(entity_id.clone(), cover);
                }
            }
            entity_ids.push(entity_id);
        }

        info!(
            "Added {} lights ({} Zigbee) and {} covers",
            self.lights.len(),
            zigbee,
            self.covers.len()
        );

        entity_ids
    }

    /// `<platform>.<slug>`, suffixed with the device id (and a counter if
    /// needed) until it is not taken by any light or cover
    fn unique_entity_id(&self, platform: &str, device: &Device) -> String {
        let taken = |id: &str| self.lights.contains_key(id) || self.covers.contains_key(id);

        let slug = match slugify(&device.name) {
            s if s.is_empty() => device.id.to_string(),
            s => s,
        };
        let base = format!("{}.{}", platform, slug);
        if !taken(&base) {
            return base;
        }

        let mut candidate = format!("{}_{}", base, device.id);
        let mut n = 2;
        while taken(&candidate) {
            candidate = format!("{}_{}_{}", base, device.id, n);
            n += 1;
        }
        candidate
    }

    async fn report(&self, msg: FromIntegrationMessage) {
        let Some(tx) = &self.to_engine else {
            return;
        };
        if let Err(e) = tx.send(msg).await {
            warn!("Failed to send message to engine: {}", e);
        }
    }

    async fn report_light(&self, entity_id: &str) {
        if let Some(light) = self.lights.get(entity_id) {
            self.report(FromIntegrationMessage::LightStateChanged {
                entity_id: entity_id.to_string(),
                state: light.state(),
            })
            .await;
        }
    }

    async fn report_cover(&self, entity_id: &str) {
        if let Some(cover) = self.covers.get(entity_id) {
            self.report(FromIntegrationMessage::CoverStateChanged {
                entity_id: entity_id.to_string(),
                state: cover.state(),
            })
            .await;
        }
    }

    /// Dispatch a light command; state is reported unless the request was dropped
    pub async fn handle_light_command(
        &mut self,
        entity_id: &str,
        command: LightCommand,
    ) -> Result<Dispatch, CommandError> {
        let light = self
            .lights
            .get_mut(entity_id)
            .ok_or_else(|| CommandError::UnknownLight(entity_id.to_string()))?;

        info!("Handling {:?} for {} ({})", command, entity_id, light.name());
        let dispatch = match command {
            LightCommand::TurnOn(request) => light.request_on(request),
            LightCommand::TurnOff => light.request_off(),
        };

        if !dispatch.is_dropped() {
            self.report_light(entity_id).await;
        }
        Ok(dispatch)
    }

    pub async fn handle_cover_command(
        &mut self,
        entity_id: &str,
        command: CoverCommand,
    ) -> Result<Dispatch, CommandError> {
        let cover = self
            .covers
            .get_mut(entity_id)
            .ok_or_else(|| CommandError::UnknownCover(entity_id.to_string()))?;

        info!("Handling {} for {} ({})", command, entity_id, cover.name());
        let dispatch = cover.request(command);

        if !dispatch.is_dropped() {
            self.report_cover(entity_id).await;
        }
        Ok(dispatch)
    }
}

/// Lowercase alphanumerics, everything else collapsed to single underscores
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

#[async_trait]
impl Integration for Ics2000Integration {
    fn name(&self) -> &str {
        INTEGRATION_NAME
    }

    async fn setup(&mut self, tx: FromIntegrationSender) -> Result<(), IntegrationError> {
        self.to_engine = Some(tx);

        if let Err(e) = self.hub.connect().await {
            error!("Could not connect to ICS2000 hub: {}", e);
            return Err(Box::new(e));
        }
        info!("Connected to ICS2000 hub");

        let devices = self
            .hub
            .devices()
            .await
            .map_err(|e| Box::new(e) as IntegrationError)?;
        let entity_ids = self.add_devices(devices);

        for entity_id in &entity_ids {
            self.report(FromIntegrationMessage::EntityDiscovered {
                entity_id: entity_id.clone(),
                integration_name: INTEGRATION_NAME.to_string(),
            })
            .await;
            self.report_light(entity_id).await;
            self.report_cover(entity_id).await;
        }

        info!("ICS2000 integration ready to handle commands");
        Ok(())
    }

    async fn handle_message(&mut self, msg: ToIntegrationMessage) -> Result<(), IntegrationError> {
        let result = match msg {
            ToIntegrationMessage::LightCommand { entity_id, command } => {
                self.handle_light_command(&entity_id, command).await
            }
            ToIntegrationMessage::CoverCommand { entity_id, command } => {
                self.handle_cover_command(&entity_id, command).await
            }
        };
        // Workers run detached; only routing errors are reported
        result
            .map(|_| ())
            .map_err(|e| Box::new(e) as IntegrationError)
    }

    async fn shutdown(&mut self) -> Result<(), IntegrationError> {
        info!(
            "ICS2000 integration shutting down, {} workers still live",
            self.guard.live_keys().len()
        );
        Ok(())
    }
}
