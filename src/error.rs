// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `fanbind` library.
//!
//! Failures fall into a few groups: configuration that cannot be turned into
//! a capability set, values outside their allowed range, transport failures
//! while publishing or subscribing, and template rendering problems.
//!
//! Inbound payloads that cannot be applied are described by
//! [`DecodeRejection`]. Those are logged and dropped by the reconciler; they
//! never reach a caller.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The fan configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A value was outside its allowed range.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Publishing or subscribing failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A command template could not be rendered.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The requested preset mode is not one of the configured modes.
    #[error("preset mode '{mode}' is not valid, expected one of {allowed:?}")]
    InvalidPresetMode {
        /// The rejected mode.
        mode: String,
        /// The configured preset modes.
        allowed: Vec<String>,
    },

    /// The fan does not support the requested capability.
    #[error("fan does not support {0}")]
    CapabilityNotSupported(&'static str),
}

/// Errors raised while interpreting a fan configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `speed_range_min` must be greater than zero.
    #[error("speed_range_min must be > 0, got {0}")]
    SpeedRangeMinNotPositive(i64),

    /// `speed_range_max` must be greater than `speed_range_min`.
    #[error("speed_range_max must be > speed_range_min, got {min}..{max}")]
    SpeedRangeEmpty {
        /// Configured minimum.
        min: i64,
        /// Configured maximum.
        max: i64,
    },

    /// The preset reset payload collides with a preset mode name.
    #[error("preset_modes must not contain payload_reset_preset_mode '{0}'")]
    ResetPayloadIsPresetMode(String),

    /// A preset mode command topic was configured without any preset modes.
    #[error("preset_mode_command_topic requires a non-empty preset_modes list")]
    MissingPresetModes,

    /// Preset modes were configured without a preset mode command topic.
    #[error("preset_modes requires preset_mode_command_topic")]
    MissingPresetModeCommandTopic,

    /// A command topic is required for the power channel.
    #[error("command_topic is required")]
    MissingCommandTopic,

    /// The configured payload encoding is not supported.
    #[error("unsupported encoding '{0}', expected 'utf-8' or an empty string")]
    UnsupportedEncoding(String),

    /// The QoS level is not 0, 1 or 2.
    #[error("invalid qos level {0}")]
    InvalidQos(u8),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },
}

/// Errors related to protocol communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Publishing was refused by the transport.
    #[error("publish to '{topic}' failed: {reason}")]
    PublishFailed {
        /// Destination topic.
        topic: String,
        /// Transport supplied reason.
        reason: String,
    },

    /// Subscribing was refused by the transport.
    #[error("subscribe to '{topic}' failed: {reason}")]
    SubscribeFailed {
        /// Topic filter.
        topic: String,
        /// Transport supplied reason.
        reason: String,
    },

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors raised by a [`TemplateRenderer`](crate::template::TemplateRenderer).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template text could not be parsed.
    #[error("invalid template '{template}': {message}")]
    Syntax {
        /// Template source.
        template: String,
        /// What went wrong.
        message: String,
    },

    /// The template referenced `value_json` but the value is not JSON.
    #[error("value is not valid JSON: {0}")]
    NotJson(String),

    /// A `value_json` path did not resolve.
    #[error("'{0}' is undefined")]
    Undefined(String),
}

/// Reasons an inbound payload was dropped without changing state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeRejection {
    /// The payload is not an integer.
    #[error("'{0}' is not a valid speed within the speed range")]
    NotAnInteger(String),

    /// The remapped percentage is outside `[0, 100]`.
    #[error("'{payload}' is not a valid speed within the speed range ({percentage}%)")]
    PercentageOutOfRange {
        /// Rendered payload.
        payload: String,
        /// Remapped percentage.
        percentage: i64,
    },

    /// The payload is not one of the configured preset modes.
    #[error("'{0}' is not a valid preset mode")]
    UnknownPresetMode(String),

    /// The value template failed to render.
    #[error("value template failed: {0}")]
    Template(#[from] TemplateError),

    /// The payload bytes are not valid for the configured encoding.
    #[error("payload is not valid utf-8")]
    InvalidEncoding,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
    }

    #[test]
    fn error_from_config_error() {
        let err: Error = ConfigError::SpeedRangeMinNotPositive(0).into();
        assert!(matches!(
            err,
            Error::Config(ConfigError::SpeedRangeMinNotPositive(0))
        ));
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::SpeedRangeEmpty { min: 5, max: 3 };
        assert_eq!(
            err.to_string(),
            "speed_range_max must be > speed_range_min, got 5..3"
        );
    }

    #[test]
    fn invalid_preset_display() {
        let err = Error::InvalidPresetMode {
            mode: "turbo".to_string(),
            allowed: vec!["eco".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "preset mode 'turbo' is not valid, expected one of [\"eco\"]"
        );
    }

    #[test]
    fn decode_rejection_display() {
        let rejection = DecodeRejection::UnknownPresetMode("turbo".to_string());
        assert_eq!(rejection.to_string(), "'turbo' is not a valid preset mode");
    }
}
