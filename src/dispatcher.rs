// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound command construction.
//!
//! A [`Dispatcher`] turns a fan operation into a [`PreparedCommand`]: the
//! message to publish on the channel's command topic, and the state change
//! to echo locally once the publish succeeded. The echo is only present for
//! optimistic channels.
//!
//! # Examples
//!
//! ```
//! use fanbind::capabilities::CapabilityConfig;
//! use fanbind::config::FanConfig;
//! use fanbind::dispatcher::Dispatcher;
//! use fanbind::state::StateChange;
//! use fanbind::template::SimpleRenderer;
//! use fanbind::types::Percentage;
//!
//! let config = FanConfig::new("fan/set")
//!     .with_percentage_topics("fan/speed/set", None)
//!     .with_speed_range(1, 3);
//! let caps = CapabilityConfig::configure(&config).unwrap();
//! let dispatcher = Dispatcher::new(&caps, &SimpleRenderer);
//!
//! let command = dispatcher.percentage(Percentage::new(50).unwrap()).unwrap();
//! assert_eq!(command.message.topic, "fan/speed/set");
//! assert_eq!(command.message.payload, "2");
//! assert_eq!(
//!     command.echo,
//!     Some(StateChange::Percentage(Some(Percentage::new(50).unwrap())))
//! );
//! ```

use crate::capabilities::{CapabilityConfig, Channel};
use crate::error::{Error, Result};
use crate::protocol::{OutboundMessage, Transport};
use crate::state::StateChange;
use crate::template::TemplateRenderer;
use crate::types::Percentage;

/// A command ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    /// Channel the command belongs to.
    pub channel: Channel,
    /// Message to publish.
    pub message: OutboundMessage,
    /// Local state change to apply after a successful publish.
    pub echo: Option<StateChange>,
}

impl PreparedCommand {
    /// Publishes the command.
    ///
    /// Returns the echo to apply, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the transport rejects the publish. No
    /// echo is returned in that case.
    pub async fn send<T: Transport>(self, transport: &T) -> Result<Option<StateChange>> {
        tracing::debug!(
            channel = %self.channel,
            topic = %self.message.topic,
            payload = %self.message.payload,
            "Dispatching command"
        );
        transport.publish(&self.message).await?;
        Ok(self.echo)
    }
}

/// Builds commands from a capability configuration.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    caps: &'a CapabilityConfig,
    renderer: &'a dyn TemplateRenderer,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(caps: &'a CapabilityConfig, renderer: &'a dyn TemplateRenderer) -> Self {
        Self { caps, renderer }
    }

    /// Power on or off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if the command template fails.
    pub fn power(&self, on: bool) -> Result<PreparedCommand> {
        let payloads = self.caps.payloads();
        let literal = if on { &payloads.on } else { &payloads.off };
        self.prepare(Channel::Power, literal, StateChange::Power(Some(on)))
    }

    /// Sets the speed percentage.
    ///
    /// The percentage is remapped into the device's speed range, rounding up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityNotSupported`] without a percentage command
    /// topic, or [`Error::Template`] if the command template fails.
    pub fn percentage(&self, percentage: Percentage) -> Result<PreparedCommand> {
        let native = self.caps.speed_range().from_percentage(percentage);
        self.prepare(
            Channel::Percentage,
            &native.to_string(),
            StateChange::Percentage(Some(percentage)),
        )
    }

    /// Selects a preset mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPresetMode`] if `mode` is not configured,
    /// [`Error::CapabilityNotSupported`] without a preset mode command topic,
    /// or [`Error::Template`] if the command template fails.
    pub fn preset_mode(&self, mode: &str) -> Result<PreparedCommand> {
        let modes = self.caps.preset_modes();
        if !modes.iter().any(|m| m == mode) {
            return Err(Error::InvalidPresetMode {
                mode: mode.to_string(),
                allowed: modes.to_vec(),
            });
        }
        self.prepare(
            Channel::PresetMode,
            mode,
            StateChange::PresetMode(Some(mode.to_string())),
        )
    }

    /// Switches oscillation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityNotSupported`] without an oscillation
    /// command topic, or [`Error::Template`] if the command template fails.
    pub fn oscillation(&self, oscillating: bool) -> Result<PreparedCommand> {
        let payloads = self.caps.payloads();
        let literal = if oscillating {
            &payloads.oscillate_on
        } else {
            &payloads.oscillate_off
        };
        self.prepare(
            Channel::Oscillation,
            literal,
            StateChange::Oscillating(Some(oscillating)),
        )
    }

    fn prepare(&self, channel: Channel, value: &str, echo: StateChange) -> Result<PreparedCommand> {
        let topic = self
            .caps
            .topics(channel)
            .command
            .clone()
            .ok_or(Error::CapabilityNotSupported(channel.as_str()))?;
        let payload = self
            .caps
            .templates()
            .command(channel)
            .render(self.renderer, value)?;

        Ok(PreparedCommand {
            channel,
            message: OutboundMessage {
                topic,
                payload,
                qos: self.caps.qos(),
                retain: self.caps.retain(),
            },
            echo: self.caps.is_optimistic(channel).then_some(echo),
        })
    }
}
