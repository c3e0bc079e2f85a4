// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw fan configuration.
//!
//! [`FanConfig`] mirrors the options a fan is described with in discovery
//! payloads or configuration files. It is plain data: nothing is validated
//! here. [`CapabilityConfig::configure`](crate::capabilities::CapabilityConfig::configure)
//! turns it into the immutable capability set the fan runs on.
//!
//! # Examples
//!
//! ```
//! use fanbind::config::FanConfig;
//!
//! let config = FanConfig::new("bedroom/fan/set")
//!     .with_state_topic("bedroom/fan/state")
//!     .with_percentage_topics("bedroom/fan/speed/set", Some("bedroom/fan/speed"))
//!     .with_speed_range(1, 3);
//!
//! assert_eq!(config.speed_range_max, 3);
//! ```

use serde::Deserialize;

use crate::types::{Qos, SpeedRange};

/// Default entity name.
pub const DEFAULT_NAME: &str = "MQTT Fan";
/// Default payload for "on".
pub const DEFAULT_PAYLOAD_ON: &str = "ON";
/// Default payload for "off".
pub const DEFAULT_PAYLOAD_OFF: &str = "OFF";
/// Default payload for "oscillation on".
pub const DEFAULT_PAYLOAD_OSCILLATION_ON: &str = "oscillate_on";
/// Default payload for "oscillation off".
pub const DEFAULT_PAYLOAD_OSCILLATION_OFF: &str = "oscillate_off";
/// Default reset payload for percentage and preset mode.
pub const DEFAULT_PAYLOAD_RESET: &str = "None";
/// Default payload encoding.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Configuration of a single MQTT fan.
///
/// Field names follow the discovery payload keys so a configuration can be
/// deserialized straight from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
// Independent on/off options straight from the configuration surface.
#[allow(clippy::struct_excessive_bools)]
pub struct FanConfig {
    /// Entity name.
    pub name: String,
    /// Never trust state topics; echo every command locally.
    pub optimistic: bool,
    /// QoS used for publishing and subscribing.
    pub qos: Qos,
    /// Retain flag used for publishing.
    pub retain: bool,
    /// Payload encoding (`"utf-8"` or `""` for raw bytes).
    pub encoding: String,

    /// Power state topic.
    pub state_topic: Option<String>,
    /// Power command topic.
    pub command_topic: Option<String>,
    /// Template applied to the power command payload.
    pub command_template: Option<String>,
    /// Template applied to inbound power state payloads.
    pub state_value_template: Option<String>,

    /// Percentage state topic.
    pub percentage_state_topic: Option<String>,
    /// Percentage command topic.
    pub percentage_command_topic: Option<String>,
    /// Template applied to the native speed before publishing.
    pub percentage_command_template: Option<String>,
    /// Template applied to inbound percentage payloads.
    pub percentage_value_template: Option<String>,

    /// Preset mode state topic.
    pub preset_mode_state_topic: Option<String>,
    /// Preset mode command topic.
    pub preset_mode_command_topic: Option<String>,
    /// Template applied to the preset mode before publishing.
    pub preset_mode_command_template: Option<String>,
    /// Template applied to inbound preset mode payloads.
    pub preset_mode_value_template: Option<String>,
    /// Allowed preset modes.
    pub preset_modes: Vec<String>,

    /// Oscillation state topic.
    pub oscillation_state_topic: Option<String>,
    /// Oscillation command topic.
    pub oscillation_command_topic: Option<String>,
    /// Template applied to the oscillation payload before publishing.
    pub oscillation_command_template: Option<String>,
    /// Template applied to inbound oscillation payloads.
    pub oscillation_value_template: Option<String>,

    /// Lowest device-native speed.
    pub speed_range_min: i64,
    /// Highest device-native speed.
    pub speed_range_max: i64,

    /// Payload meaning "on".
    pub payload_on: String,
    /// Payload meaning "off".
    pub payload_off: String,
    /// Payload meaning "oscillating".
    pub payload_oscillation_on: String,
    /// Payload meaning "not oscillating".
    pub payload_oscillation_off: String,
    /// Payload that resets the percentage to unknown.
    pub payload_reset_percentage: String,
    /// Payload that resets the preset mode to unknown.
    pub payload_reset_preset_mode: String,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            optimistic: false,
            qos: Qos::default(),
            retain: false,
            encoding: DEFAULT_ENCODING.to_string(),
            state_topic: None,
            command_topic: None,
            command_template: None,
            state_value_template: None,
            percentage_state_topic: None,
            percentage_command_topic: None,
            percentage_command_template: None,
            percentage_value_template: None,
            preset_mode_state_topic: None,
            preset_mode_command_topic: None,
            preset_mode_command_template: None,
            preset_mode_value_template: None,
            preset_modes: Vec::new(),
            oscillation_state_topic: None,
            oscillation_command_topic: None,
            oscillation_command_template: None,
            oscillation_value_template: None,
            speed_range_min: SpeedRange::DEFAULT_MIN,
            speed_range_max: SpeedRange::DEFAULT_MAX,
            payload_on: DEFAULT_PAYLOAD_ON.to_string(),
            payload_off: DEFAULT_PAYLOAD_OFF.to_string(),
            payload_oscillation_on: DEFAULT_PAYLOAD_OSCILLATION_ON.to_string(),
            payload_oscillation_off: DEFAULT_PAYLOAD_OSCILLATION_OFF.to_string(),
            payload_reset_percentage: DEFAULT_PAYLOAD_RESET.to_string(),
            payload_reset_preset_mode: DEFAULT_PAYLOAD_RESET.to_string(),
        }
    }
}

impl FanConfig {
    /// Creates a configuration with only the power command topic set.
    #[must_use]
    pub fn new(command_topic: impl Into<String>) -> Self {
        Self {
            command_topic: Some(command_topic.into()),
            ..Self::default()
        }
    }

    /// Parses a JSON configuration (discovery payload form).
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the entity name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the power state topic.
    #[must_use]
    pub fn with_state_topic(mut self, topic: impl Into<String>) -> Self {
        self.state_topic = Some(topic.into());
        self
    }

    /// Enables the percentage capability.
    #[must_use]
    pub fn with_percentage_topics(
        mut self,
        command_topic: impl Into<String>,
        state_topic: Option<&str>,
    ) -> Self {
        self.percentage_command_topic = Some(command_topic.into());
        self.percentage_state_topic = state_topic.map(ToString::to_string);
        self
    }

    /// Enables the preset mode capability with the given modes.
    #[must_use]
    pub fn with_preset_modes<I, S>(
        mut self,
        command_topic: impl Into<String>,
        state_topic: Option<&str>,
        modes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preset_mode_command_topic = Some(command_topic.into());
        self.preset_mode_state_topic = state_topic.map(ToString::to_string);
        self.preset_modes = modes.into_iter().map(Into::into).collect();
        self
    }

    /// Enables the oscillation capability.
    #[must_use]
    pub fn with_oscillation_topics(
        mut self,
        command_topic: impl Into<String>,
        state_topic: Option<&str>,
    ) -> Self {
        self.oscillation_command_topic = Some(command_topic.into());
        self.oscillation_state_topic = state_topic.map(ToString::to_string);
        self
    }

    /// Sets the device-native speed range.
    #[must_use]
    pub fn with_speed_range(mut self, min: i64, max: i64) -> Self {
        self.speed_range_min = min;
        self.speed_range_max = max;
        self
    }

    /// Forces every channel into optimistic mode.
    #[must_use]
    pub fn with_optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = optimistic;
        self
    }

    /// Sets QoS and retain flag used for every publish.
    #[must_use]
    pub fn with_delivery(mut self, qos: Qos, retain: bool) -> Self {
        self.qos = qos;
        self.retain = retain;
        self
    }
}
