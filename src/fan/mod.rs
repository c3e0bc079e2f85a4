// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fan entity.
//!
//! [`MqttFan`] owns the believed [`FanState`] of one fan. Inbound messages
//! are decoded by the reconciler and applied with
//! [`handle_message`](MqttFan::handle_message); host commands are published
//! through the dispatcher and, on optimistic channels, echoed into the state
//! once the publish succeeded. Every accepted change is announced on the
//! fan's [`EventBus`].
//!
//! All methods take `&mut self`: one owner drives the fan, so message
//! handling and commands never interleave. [`FanRuntime`] provides such an
//! owner as a tokio task with a cloneable [`FanHandle`].
//!
//! # Examples
//!
//! ```
//! use fanbind::config::FanConfig;
//! use fanbind::fan::MqttFan;
//! use fanbind::protocol::MemoryTransport;
//! use fanbind::types::Percentage;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fanbind::Result<()> {
//! let config = FanConfig::new("fan/set")
//!     .with_state_topic("fan/state")
//!     .with_percentage_topics("fan/speed/set", None);
//! let (transport, mut inbound) = MemoryTransport::new();
//!
//! let mut fan = MqttFan::builder(config, transport.clone()).build()?;
//! fan.subscribe_topics().await?;
//!
//! // Percentage has no state topic: the command is echoed locally.
//! fan.set_percentage(Percentage::new(42)?).await?;
//! assert_eq!(fan.state().percentage(), Some(Percentage::new(42)?));
//!
//! // Power is confirmed by the device.
//! fan.turn_on(None, None).await?;
//! assert_eq!(fan.state().is_on(), None);
//! transport.inject("fan/state", "ON").await;
//! let message = inbound.recv().await.unwrap();
//! fan.handle_message(&message);
//! assert_eq!(fan.state().is_on(), Some(true));
//! # Ok(())
//! # }
//! ```

mod builder;
mod runtime;

pub use builder::FanBuilder;
pub use runtime::{FanHandle, FanRuntime, FanSnapshot};

use std::sync::Arc;

use crate::capabilities::{CapabilityConfig, FanFeatures};
use crate::config::FanConfig;
use crate::dispatcher::{Dispatcher, PreparedCommand};
use crate::error::Result;
use crate::event::{EntityId, EventBus, FanEvent};
use crate::protocol::{InboundMessage, Transport};
use crate::reconciler::{SubscriptionSet, reconcile};
use crate::state::{FanState, StateChange};
use crate::template::TemplateRenderer;
use crate::types::Percentage;

/// A fan bound to MQTT topics.
#[derive(Debug)]
pub struct MqttFan<T: Transport> {
    entity_id: EntityId,
    config: FanConfig,
    caps: CapabilityConfig,
    state: FanState,
    transport: T,
    renderer: Arc<dyn TemplateRenderer>,
    events: EventBus,
    subscriptions: SubscriptionSet,
}

impl<T: Transport> MqttFan<T> {
    /// Creates a builder.
    #[must_use]
    pub fn builder(config: FanConfig, transport: T) -> FanBuilder<T> {
        FanBuilder::new(config, transport)
    }

    pub(crate) fn from_parts(
        entity_id: EntityId,
        config: FanConfig,
        caps: CapabilityConfig,
        transport: T,
        renderer: Arc<dyn TemplateRenderer>,
        events: EventBus,
    ) -> Self {
        Self {
            entity_id,
            config,
            caps,
            state: FanState::new(),
            transport,
            renderer,
            events,
            subscriptions: SubscriptionSet::empty(),
        }
    }

    /// Entity identifier carried in every event.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.caps.name()
    }

    /// Current believed state.
    #[must_use]
    pub fn state(&self) -> &FanState {
        &self.state
    }

    /// The raw configuration in use.
    #[must_use]
    pub fn config(&self) -> &FanConfig {
        &self.config
    }

    /// The interpreted capability configuration.
    #[must_use]
    pub fn capability_config(&self) -> &CapabilityConfig {
        &self.caps
    }

    /// Supported-feature bitset.
    #[must_use]
    pub fn supported_features(&self) -> FanFeatures {
        self.caps.features()
    }

    /// Whether the host should treat the state as assumed.
    ///
    /// True when at least one channel is optimistic.
    #[must_use]
    pub fn assumed_state(&self) -> bool {
        self.caps.any_optimistic()
    }

    /// Number of speeds the fan supports.
    #[must_use]
    pub fn speed_count(&self) -> u8 {
        self.caps.speed_count()
    }

    /// Percentage covered by one speed step.
    #[must_use]
    pub fn percentage_step(&self) -> f64 {
        self.caps.percentage_step()
    }

    /// Configured preset modes.
    #[must_use]
    pub fn preset_modes(&self) -> &[String] {
        self.caps.preset_modes()
    }

    /// Current subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }

    /// The bus this fan publishes events on.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// The transport in use.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Subscribes to every configured state topic.
    ///
    /// Existing subscriptions are torn down first. Once every topic is
    /// subscribed, channels with feedback get their subscription defaults:
    /// percentage and preset mode become unknown, oscillation becomes off.
    ///
    /// # Errors
    ///
    /// Returns error if a subscription request fails. Topics subscribed
    /// before the failure are unsubscribed again and the state is left
    /// untouched.
    pub async fn subscribe_topics(&mut self) -> Result<()> {
        self.unsubscribe_topics().await;

        let subscriptions = SubscriptionSet::build(&self.caps);
        self.subscribe_all(&subscriptions).await?;
        self.activate(subscriptions);
        Ok(())
    }

    /// Unsubscribes from every current topic.
    ///
    /// Failures are logged; the set is cleared regardless.
    pub async fn unsubscribe_topics(&mut self) {
        let subscriptions = std::mem::take(&mut self.subscriptions);
        self.unsubscribe_all(&subscriptions).await;
    }

    /// Replaces the configuration.
    ///
    /// The new configuration is validated first; on error nothing changes.
    /// Otherwise the current subscriptions are torn down and the new ones
    /// established. Only then are the configuration and the state replaced
    /// and one [`FanEvent::Reconfigured`] published.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or subscribing fails.
    /// After a failed subscribe the previous subscriptions are restored and
    /// the fan keeps its previous configuration and state.
    pub async fn reconfigure(&mut self, config: FanConfig) -> Result<()> {
        let caps = CapabilityConfig::configure(&config)?;
        let subscriptions = SubscriptionSet::build(&caps);

        let previous = std::mem::take(&mut self.subscriptions);
        self.unsubscribe_all(&previous).await;

        if let Err(e) = self.subscribe_all(&subscriptions).await {
            tracing::warn!(
                entity = %self.entity_id,
                error = %e,
                "Reconfiguration failed, restoring previous subscriptions"
            );
            match self.subscribe_all(&previous).await {
                Ok(()) => self.subscriptions = previous,
                Err(restore) => tracing::error!(
                    entity = %self.entity_id,
                    error = %restore,
                    "Failed to restore previous subscriptions"
                ),
            }
            return Err(e);
        }

        self.config = config;
        self.caps = caps;
        self.state = FanState::new();
        self.activate(subscriptions);

        tracing::info!(
            entity = %self.entity_id,
            name = %self.caps.name(),
            topics = self.subscriptions.len(),
            "Fan reconfigured"
        );
        self.events.publish(FanEvent::Reconfigured {
            entity_id: self.entity_id,
            state: self.state.clone(),
        });
        Ok(())
    }

    /// Applies an inbound message.
    ///
    /// Returns the number of accepted changes; each one was announced.
    pub fn handle_message(&mut self, message: &InboundMessage) -> usize {
        if !self.subscriptions.matches(&message.topic) {
            tracing::trace!(
                entity = %self.entity_id,
                topic = %message.topic,
                "Ignoring message on unsubscribed topic"
            );
            return 0;
        }
        let changes = reconcile(
            message,
            &self.subscriptions,
            &self.caps,
            self.renderer.as_ref(),
        );
        let count = changes.len();
        for change in changes {
            self.apply(change);
        }
        count
    }

    /// Turns the fan on, optionally setting a percentage and a preset mode.
    ///
    /// Every command is prepared before anything is published, so an
    /// unknown preset mode or a missing capability fails without side
    /// effects. The power command is published first, then the percentage,
    /// then the preset mode. Power is echoed last, if optimistic.
    ///
    /// # Errors
    ///
    /// Returns the first failure. Commands published before it stay sent
    /// and their optimistic echoes, power included, are applied.
    pub async fn turn_on(
        &mut self,
        percentage: Option<Percentage>,
        preset_mode: Option<&str>,
    ) -> Result<()> {
        let dispatcher = self.dispatcher();
        let power = dispatcher.power(true)?;
        let nested = [
            percentage.map(|p| dispatcher.percentage(p)).transpose()?,
            preset_mode.map(|m| dispatcher.preset_mode(m)).transpose()?,
        ];

        let power_echo = power.send(&self.transport).await?;
        let mut result = Ok(());
        for command in nested.into_iter().flatten() {
            match command.send(&self.transport).await {
                Ok(Some(change)) => self.apply(change),
                Ok(None) => {}
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        if let Some(change) = power_echo {
            self.apply(change);
        }
        result
    }

    /// Turns the fan off.
    ///
    /// # Errors
    ///
    /// Returns error if rendering or publishing fails.
    pub async fn turn_off(&mut self) -> Result<()> {
        let command = self.dispatcher().power(false)?;
        self.execute(command).await
    }

    /// Sets the speed percentage.
    ///
    /// # Errors
    ///
    /// Returns error if the fan has no percentage capability, or rendering
    /// or publishing fails.
    pub async fn set_percentage(&mut self, percentage: Percentage) -> Result<()> {
        let command = self.dispatcher().percentage(percentage)?;
        self.execute(command).await
    }

    /// Selects a preset mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPresetMode`](crate::Error::InvalidPresetMode)
    /// without publishing if `mode` is not configured. Otherwise returns
    /// error if rendering or publishing fails.
    pub async fn set_preset_mode(&mut self, mode: &str) -> Result<()> {
        let command = self.dispatcher().preset_mode(mode)?;
        self.execute(command).await
    }

    /// Switches oscillation.
    ///
    /// # Errors
    ///
    /// Returns error if the fan has no oscillation capability, or rendering
    /// or publishing fails.
    pub async fn set_oscillating(&mut self, oscillating: bool) -> Result<()> {
        let command = self.dispatcher().oscillation(oscillating)?;
        self.execute(command).await
    }

    async fn subscribe_all(&self, subscriptions: &SubscriptionSet) -> Result<()> {
        let topics: Vec<&str> = subscriptions.topics().collect();
        for (done, topic) in topics.iter().enumerate() {
            tracing::debug!(entity = %self.entity_id, topic = %topic, "Subscribing to state topic");
            if let Err(e) = self.transport.subscribe(topic, subscriptions.qos()).await {
                for subscribed in &topics[..done] {
                    if let Err(e) = self.transport.unsubscribe(subscribed).await {
                        tracing::warn!(topic = %subscribed, error = %e, "Failed to unsubscribe");
                    }
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn unsubscribe_all(&self, subscriptions: &SubscriptionSet) {
        for topic in subscriptions.topics() {
            if let Err(e) = self.transport.unsubscribe(topic).await {
                tracing::warn!(
                    entity = %self.entity_id,
                    topic = %topic,
                    error = %e,
                    "Failed to unsubscribe"
                );
            }
        }
    }

    fn activate(&mut self, subscriptions: SubscriptionSet) {
        for change in subscriptions.initial_state() {
            self.state.apply(&change);
        }
        self.subscriptions = subscriptions;
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.caps, self.renderer.as_ref())
    }

    async fn execute(&mut self, command: PreparedCommand) -> Result<()> {
        if let Some(change) = command.send(&self.transport).await? {
            self.apply(change);
        }
        Ok(())
    }

    fn apply(&mut self, change: StateChange) {
        self.state.apply(&change);
        tracing::debug!(entity = %self.entity_id, ?change, "Fan state changed");
        self.events.publish(FanEvent::StateChanged {
            entity_id: self.entity_id,
            change,
            state: self.state.clone(),
        });
    }
}
