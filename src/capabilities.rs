// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan capability configuration.
//!
//! A fan has up to four channels: power, percentage, preset mode and
//! oscillation. Power is always present; the other three are enabled by
//! configuring their command topic. Each channel may also have a state topic.
//! A channel without a state topic (or any channel when the fan is
//! configured as optimistic) keeps its own state: commands are echoed into
//! local state right after they are published.
//!
//! [`CapabilityConfig::configure`] interprets a [`FanConfig`] once and yields
//! an immutable description the reconciler, the dispatcher and the entity all
//! read from. A reconfiguration builds a new one from scratch.
//!
//! # Examples
//!
//! ```
//! use fanbind::capabilities::{CapabilityConfig, Channel, FanCapability, FanFeatures};
//! use fanbind::config::FanConfig;
//!
//! let config = FanConfig::new("fan/set")
//!     .with_state_topic("fan/state")
//!     .with_percentage_topics("fan/speed/set", None)
//!     .with_speed_range(1, 3);
//!
//! let caps = CapabilityConfig::configure(&config).unwrap();
//! assert!(caps.capabilities().contains(FanCapability::Percentage));
//! assert!(!caps.capabilities().contains(FanCapability::Oscillation));
//! assert_eq!(caps.features(), FanFeatures::SET_SPEED);
//! assert_eq!(caps.speed_count(), 3);
//!
//! // No percentage state topic, so percentage commands are echoed locally.
//! assert!(caps.is_optimistic(Channel::Percentage));
//! assert!(!caps.is_optimistic(Channel::Power));
//! ```

use std::fmt;
use std::ops::BitOr;

use crate::config::FanConfig;
use crate::error::ConfigError;
use crate::template::{ChannelTemplates, CommandTemplate, ValueTemplate};
use crate::types::{Encoding, Qos, SpeedRange};

/// Speed count reported when the percentage capability is not enabled.
pub const DEFAULT_SPEED_COUNT: u8 = 100;

/// One independently configured part of a fan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// On/off.
    Power,
    /// Speed percentage.
    Percentage,
    /// Named preset mode.
    PresetMode,
    /// Oscillation on/off.
    Oscillation,
}

impl Channel {
    /// All channels in dispatch order.
    pub const ALL: [Self; 4] = [
        Self::Power,
        Self::Percentage,
        Self::PresetMode,
        Self::Oscillation,
    ];

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Percentage => "percentage",
            Self::PresetMode => "preset_mode",
            Self::Oscillation => "oscillation",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value per [`Channel`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap<T> {
    /// Power channel value.
    pub power: T,
    /// Percentage channel value.
    pub percentage: T,
    /// Preset mode channel value.
    pub preset_mode: T,
    /// Oscillation channel value.
    pub oscillation: T,
}

impl<T> ChannelMap<T> {
    /// Returns the value for a channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> &T {
        match channel {
            Channel::Power => &self.power,
            Channel::Percentage => &self.percentage,
            Channel::PresetMode => &self.preset_mode,
            Channel::Oscillation => &self.oscillation,
        }
    }
}

/// Optional fan capabilities; power control is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanCapability {
    /// Speed can be set as a percentage.
    Percentage,
    /// A named preset mode can be selected.
    PresetMode,
    /// Oscillation can be switched.
    Oscillation,
}

impl FanCapability {
    const fn bit(self) -> u8 {
        match self {
            Self::Percentage => 0b001,
            Self::PresetMode => 0b010,
            Self::Oscillation => 0b100,
        }
    }

    /// The channel that carries this capability.
    #[must_use]
    pub const fn channel(self) -> Channel {
        match self {
            Self::Percentage => Channel::Percentage,
            Self::PresetMode => Channel::PresetMode,
            Self::Oscillation => Channel::Oscillation,
        }
    }
}

/// Set of enabled [`FanCapability`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns a copy of the set with `capability` added.
    #[must_use]
    pub const fn with(self, capability: FanCapability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Returns whether `capability` is enabled.
    #[must_use]
    pub const fn contains(&self, capability: FanCapability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Returns whether no optional capability is enabled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the enabled capabilities.
    pub fn iter(&self) -> impl Iterator<Item = FanCapability> + '_ {
        [
            FanCapability::Percentage,
            FanCapability::PresetMode,
            FanCapability::Oscillation,
        ]
        .into_iter()
        .filter(|cap| self.contains(*cap))
    }
}

impl FromIterator<FanCapability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = FanCapability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// Supported-feature bitset as understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FanFeatures(u32);

impl FanFeatures {
    /// No optional features.
    pub const NONE: Self = Self(0);
    /// Speed can be set.
    pub const SET_SPEED: Self = Self(1);
    /// Oscillation can be switched.
    pub const OSCILLATE: Self = Self(2);
    /// Preset modes are available.
    pub const PRESET_MODE: Self = Self(8);

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns whether all bits of `other` are set.
    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FanFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<CapabilitySet> for FanFeatures {
    fn from(set: CapabilitySet) -> Self {
        set.iter().fold(Self::NONE, |acc, cap| {
            acc | match cap {
                FanCapability::Percentage => Self::SET_SPEED,
                FanCapability::PresetMode => Self::PRESET_MODE,
                FanCapability::Oscillation => Self::OSCILLATE,
            }
        })
    }
}

/// State and command topics of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTopics {
    /// Topic the device reports state on.
    pub state: Option<String>,
    /// Topic commands are published to.
    pub command: Option<String>,
}

/// Payload vocabulary used to encode commands and decode state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadLiterals {
    /// Power on.
    pub on: String,
    /// Power off.
    pub off: String,
    /// Oscillation on.
    pub oscillate_on: String,
    /// Oscillation off.
    pub oscillate_off: String,
    /// Resets the percentage to unknown.
    pub percentage_reset: String,
    /// Resets the preset mode to unknown.
    pub preset_reset: String,
}

/// Immutable capability set derived from a [`FanConfig`].
#[derive(Debug, Clone)]
pub struct CapabilityConfig {
    name: String,
    speed_range: SpeedRange,
    speed_count: u8,
    capabilities: CapabilitySet,
    preset_modes: Vec<String>,
    topics: ChannelMap<ChannelTopics>,
    payloads: PayloadLiterals,
    optimism: ChannelMap<bool>,
    templates: ChannelTemplates,
    qos: Qos,
    retain: bool,
    encoding: Encoding,
}

impl CapabilityConfig {
    /// Interprets a raw configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when:
    /// - the speed range is not a positive, non-empty interval
    /// - the preset reset payload is one of the preset modes
    /// - a preset command topic has no preset modes, or the reverse
    /// - no power command topic is set
    /// - the encoding is not supported
    pub fn configure(config: &FanConfig) -> Result<Self, ConfigError> {
        let speed_range = SpeedRange::new(config.speed_range_min, config.speed_range_max)?;
        let encoding = Encoding::parse(&config.encoding)?;

        if config.command_topic.is_none() {
            return Err(ConfigError::MissingCommandTopic);
        }

        let has_preset_topic = config.preset_mode_command_topic.is_some();
        match (has_preset_topic, config.preset_modes.is_empty()) {
            (true, true) => return Err(ConfigError::MissingPresetModes),
            (false, false) => return Err(ConfigError::MissingPresetModeCommandTopic),
            _ => {}
        }
        if config
            .preset_modes
            .contains(&config.payload_reset_preset_mode)
        {
            return Err(ConfigError::ResetPayloadIsPresetMode(
                config.payload_reset_preset_mode.clone(),
            ));
        }

        let mut capabilities = CapabilitySet::empty();
        if config.percentage_command_topic.is_some() {
            capabilities = capabilities.with(FanCapability::Percentage);
        }
        if has_preset_topic {
            capabilities = capabilities.with(FanCapability::PresetMode);
        }
        if config.oscillation_command_topic.is_some() {
            capabilities = capabilities.with(FanCapability::Oscillation);
        }

        let speed_count = if capabilities.contains(FanCapability::Percentage) {
            speed_range.speed_count()
        } else {
            DEFAULT_SPEED_COUNT
        };

        let topics = ChannelMap {
            power: ChannelTopics {
                state: config.state_topic.clone(),
                command: config.command_topic.clone(),
            },
            percentage: ChannelTopics {
                state: config.percentage_state_topic.clone(),
                command: config.percentage_command_topic.clone(),
            },
            preset_mode: ChannelTopics {
                state: config.preset_mode_state_topic.clone(),
                command: config.preset_mode_command_topic.clone(),
            },
            oscillation: ChannelTopics {
                state: config.oscillation_state_topic.clone(),
                command: config.oscillation_command_topic.clone(),
            },
        };

        let optimistic = config.optimistic;
        let optimism = ChannelMap {
            power: optimistic || topics.power.state.is_none(),
            percentage: optimistic || topics.percentage.state.is_none(),
            preset_mode: optimistic || topics.preset_mode.state.is_none(),
            oscillation: optimistic || topics.oscillation.state.is_none(),
        };

        let templates = ChannelTemplates {
            command: ChannelMap {
                power: CommandTemplate::new(config.command_template.clone()),
                percentage: CommandTemplate::new(config.percentage_command_template.clone()),
                preset_mode: CommandTemplate::new(config.preset_mode_command_template.clone()),
                oscillation: CommandTemplate::new(config.oscillation_command_template.clone()),
            },
            value: ChannelMap {
                power: ValueTemplate::new(config.state_value_template.clone()),
                percentage: ValueTemplate::new(config.percentage_value_template.clone()),
                preset_mode: ValueTemplate::new(config.preset_mode_value_template.clone()),
                oscillation: ValueTemplate::new(config.oscillation_value_template.clone()),
            },
        };

        let preset_modes = if has_preset_topic {
            config.preset_modes.clone()
        } else {
            Vec::new()
        };

        Ok(Self {
            name: config.name.clone(),
            speed_range,
            speed_count,
            capabilities,
            preset_modes,
            topics,
            payloads: PayloadLiterals {
                on: config.payload_on.clone(),
                off: config.payload_off.clone(),
                oscillate_on: config.payload_oscillation_on.clone(),
                oscillate_off: config.payload_oscillation_off.clone(),
                percentage_reset: config.payload_reset_percentage.clone(),
                preset_reset: config.payload_reset_preset_mode.clone(),
            },
            optimism,
            templates,
            qos: config.qos,
            retain: config.retain,
            encoding,
        })
    }

    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device-native speed range.
    #[must_use]
    pub const fn speed_range(&self) -> SpeedRange {
        self.speed_range
    }

    /// Number of speeds exposed to the host.
    #[must_use]
    pub const fn speed_count(&self) -> u8 {
        self.speed_count
    }

    /// Percentage covered by one speed step.
    #[must_use]
    pub fn percentage_step(&self) -> f64 {
        100.0 / f64::from(self.speed_count)
    }

    /// Enabled optional capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// Supported-feature bitset for the host.
    #[must_use]
    pub fn features(&self) -> FanFeatures {
        self.capabilities.into()
    }

    /// Configured preset modes, empty unless preset modes are enabled.
    #[must_use]
    pub fn preset_modes(&self) -> &[String] {
        &self.preset_modes
    }

    /// Topics of a channel.
    #[must_use]
    pub fn topics(&self, channel: Channel) -> &ChannelTopics {
        self.topics.get(channel)
    }

    /// Payload vocabulary.
    #[must_use]
    pub const fn payloads(&self) -> &PayloadLiterals {
        &self.payloads
    }

    /// Whether a channel echoes commands into local state.
    #[must_use]
    pub fn is_optimistic(&self, channel: Channel) -> bool {
        *self.optimism.get(channel)
    }

    /// Whether any channel is optimistic.
    #[must_use]
    pub fn any_optimistic(&self) -> bool {
        Channel::ALL.iter().any(|c| self.is_optimistic(*c))
    }

    /// Command and value templates.
    #[must_use]
    pub const fn templates(&self) -> &ChannelTemplates {
        &self.templates
    }

    /// QoS for publishing and subscribing.
    #[must_use]
    pub const fn qos(&self) -> Qos {
        self.qos
    }

    /// Retain flag for publishing.
    #[must_use]
    pub const fn retain(&self) -> bool {
        self.retain
    }

    /// Inbound payload encoding.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> FanConfig {
        FanConfig::new("fan/set")
            .with_state_topic("fan/state")
            .with_percentage_topics("fan/speed/set", Some("fan/speed"))
            .with_preset_modes("fan/preset/set", Some("fan/preset"), ["eco", "auto"])
            .with_oscillation_topics("fan/osc/set", Some("fan/osc"))
    }

    #[test]
    fn power_only_fan() {
        let caps = CapabilityConfig::configure(&FanConfig::new("fan/set")).unwrap();
        assert!(caps.capabilities().is_empty());
        assert_eq!(caps.features(), FanFeatures::NONE);
        assert_eq!(caps.speed_count(), DEFAULT_SPEED_COUNT);
        assert!(caps.preset_modes().is_empty());
        assert!(caps.is_optimistic(Channel::Power));
    }

    #[test]
    fn full_fan_features() {
        let caps = CapabilityConfig::configure(&full_config()).unwrap();
        let features = caps.features();
        assert!(features.contains(FanFeatures::SET_SPEED));
        assert!(features.contains(FanFeatures::PRESET_MODE));
        assert!(features.contains(FanFeatures::OSCILLATE));
        assert_eq!(features.bits(), 11);
        assert_eq!(caps.capabilities().iter().count(), 3);
    }

    #[test]
    fn optimism_follows_state_topics() {
        let caps = CapabilityConfig::configure(&full_config()).unwrap();
        for channel in Channel::ALL {
            assert!(!caps.is_optimistic(channel), "{channel} should not be optimistic");
        }
        assert!(!caps.any_optimistic());

        let config = FanConfig::new("fan/set")
            .with_state_topic("fan/state")
            .with_oscillation_topics("fan/osc/set", None);
        let caps = CapabilityConfig::configure(&config).unwrap();
        assert!(!caps.is_optimistic(Channel::Power));
        assert!(caps.is_optimistic(Channel::Oscillation));
        assert!(caps.any_optimistic());
    }

    #[test]
    fn global_optimistic_overrides_state_topics() {
        let caps = CapabilityConfig::configure(&full_config().with_optimistic(true)).unwrap();
        for channel in Channel::ALL {
            assert!(caps.is_optimistic(channel));
        }
    }

    #[test]
    fn speed_count_depends_on_percentage_capability() {
        let config = FanConfig::new("fan/set").with_speed_range(1, 5);
        let caps = CapabilityConfig::configure(&config).unwrap();
        assert_eq!(caps.speed_count(), 100);

        let config = config.with_percentage_topics("fan/speed/set", None);
        let caps = CapabilityConfig::configure(&config).unwrap();
        assert_eq!(caps.speed_count(), 5);
        assert!((caps.percentage_step() - 20.0).abs() < f64::EPSILON);

        let config = config.with_speed_range(1, 1000);
        let caps = CapabilityConfig::configure(&config).unwrap();
        assert_eq!(caps.speed_count(), 100);
    }

    #[test]
    fn invalid_speed_range_is_rejected() {
        let err = CapabilityConfig::configure(&full_config().with_speed_range(0, 10)).unwrap_err();
        assert_eq!(err, ConfigError::SpeedRangeMinNotPositive(0));

        let err = CapabilityConfig::configure(&full_config().with_speed_range(10, 10)).unwrap_err();
        assert_eq!(err, ConfigError::SpeedRangeEmpty { min: 10, max: 10 });
    }

    #[test]
    fn reset_payload_must_not_be_a_preset_mode() {
        let config = FanConfig::new("fan/set").with_preset_modes(
            "fan/preset/set",
            None,
            ["eco", "None"],
        );
        let err = CapabilityConfig::configure(&config).unwrap_err();
        assert_eq!(err, ConfigError::ResetPayloadIsPresetMode("None".to_string()));
    }

    #[test]
    fn preset_topic_and_modes_go_together() {
        let mut config = FanConfig::new("fan/set");
        config.preset_mode_command_topic = Some("fan/preset/set".to_string());
        assert_eq!(
            CapabilityConfig::configure(&config).unwrap_err(),
            ConfigError::MissingPresetModes
        );

        let mut config = FanConfig::new("fan/set");
        config.preset_modes = vec!["eco".to_string()];
        assert_eq!(
            CapabilityConfig::configure(&config).unwrap_err(),
            ConfigError::MissingPresetModeCommandTopic
        );
    }

    #[test]
    fn command_topic_is_required() {
        assert_eq!(
            CapabilityConfig::configure(&FanConfig::default()).unwrap_err(),
            ConfigError::MissingCommandTopic
        );
    }

    #[test]
    fn unsupported_encoding_is_rejected() {
        let mut config = FanConfig::new("fan/set");
        config.encoding = "utf-16".to_string();
        assert_eq!(
            CapabilityConfig::configure(&config).unwrap_err(),
            ConfigError::UnsupportedEncoding("utf-16".to_string())
        );
    }

    #[test]
    fn capability_set_from_iter() {
        let set: CapabilitySet = [FanCapability::Oscillation, FanCapability::Percentage]
            .into_iter()
            .collect();
        assert!(set.contains(FanCapability::Oscillation));
        assert!(!set.contains(FanCapability::PresetMode));
        assert_eq!(
            FanFeatures::from(set),
            FanFeatures::SET_SPEED | FanFeatures::OSCILLATE
        );
    }
}
