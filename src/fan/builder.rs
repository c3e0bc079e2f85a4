// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan builder.

use std::sync::Arc;

use crate::capabilities::CapabilityConfig;
use crate::config::FanConfig;
use crate::error::Result;
use crate::event::{EntityId, EventBus};
use crate::fan::MqttFan;
use crate::protocol::Transport;
use crate::template::{SimpleRenderer, TemplateRenderer};

/// Builder for [`MqttFan`].
///
/// # Examples
///
/// ```
/// use fanbind::config::FanConfig;
/// use fanbind::event::{EntityId, EventBus};
/// use fanbind::fan::MqttFan;
/// use fanbind::protocol::MemoryTransport;
///
/// let (transport, _inbound) = MemoryTransport::new();
/// let bus = EventBus::new();
/// let id = EntityId::new();
///
/// let fan = MqttFan::builder(FanConfig::new("fan/set"), transport)
///     .with_event_bus(bus.clone())
///     .with_entity_id(id)
///     .build()
///     .unwrap();
/// assert_eq!(fan.entity_id(), id);
/// ```
#[derive(Debug)]
pub struct FanBuilder<T: Transport> {
    config: FanConfig,
    transport: T,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    events: Option<EventBus>,
    entity_id: Option<EntityId>,
}

impl<T: Transport> FanBuilder<T> {
    pub(crate) fn new(config: FanConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            renderer: None,
            events: None,
            entity_id: None,
        }
    }

    /// Uses a custom template renderer instead of [`SimpleRenderer`].
    ///
    /// The renderer evaluates every command and value template of the fan.
    /// Use this to plug in a full template engine when `{{ value }}` and
    /// `{{ value_json... }}` lookups are not enough.
    ///
    /// # Arguments
    ///
    /// * `renderer` - Renderer shared with other fans if needed
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Publishes events on a shared bus instead of a private one.
    ///
    /// Hosts managing many fans usually hand the same bus to each of them
    /// and tell events apart by [`FanEvent::entity_id`](crate::event::FanEvent::entity_id).
    ///
    /// # Arguments
    ///
    /// * `events` - Bus to publish state changes and reconfigurations on
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Uses a fixed entity identifier.
    ///
    /// Without one a random identifier is generated. A fixed identifier keeps
    /// events of a fan recognizable across restarts of the host.
    ///
    /// # Arguments
    ///
    /// * `entity_id` - Identifier carried in every event of this fan
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: EntityId) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    /// Validates the configuration and creates the fan.
    ///
    /// The fan is not subscribed yet; call
    /// [`subscribe_topics`](MqttFan::subscribe_topics) or hand it to a
    /// [`FanRuntime`](super::FanRuntime).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration
    /// is invalid.
    pub fn build(self) -> Result<MqttFan<T>> {
        let caps = CapabilityConfig::configure(&self.config)?;
        let entity_id = self.entity_id.unwrap_or_default();
        tracing::debug!(
            entity = %entity_id,
            name = %caps.name(),
            features = caps.features().bits(),
            "Fan configured"
        );

        Ok(MqttFan::from_parts(
            entity_id,
            self.config,
            caps,
            self.transport,
            self.renderer.unwrap_or_else(|| Arc::new(SimpleRenderer)),
            self.events.unwrap_or_default(),
        ))
    }
}
