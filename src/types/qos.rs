// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT delivery options shared by every channel of a fan.

use std::fmt;

use crate::error::{ConfigError, DecodeRejection};

/// MQTT quality of service level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Qos {
    /// At most once.
    #[default]
    AtMostOnce,
    /// At least once.
    AtLeastOnce,
    /// Exactly once.
    ExactlyOnce,
}

impl Qos {
    /// Returns the numeric QoS level.
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for Qos {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other)),
        }
    }
}

impl From<Qos> for u8 {
    fn from(value: Qos) -> Self {
        value.as_u8()
    }
}

impl fmt::Display for Qos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(feature = "mqtt")]
impl From<Qos> for rumqttc::QoS {
    fn from(value: Qos) -> Self {
        match value {
            Qos::AtMostOnce => Self::AtMostOnce,
            Qos::AtLeastOnce => Self::AtLeastOnce,
            Qos::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

/// How inbound payload bytes are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Payloads must be valid UTF-8.
    #[default]
    Utf8,
    /// Payloads are passed through as raw bytes, replacing invalid sequences.
    Raw,
}

impl Encoding {
    /// Parses the configuration form of an encoding.
    ///
    /// `"utf-8"` (any case, with or without the dash) selects [`Encoding::Utf8`],
    /// the empty string selects [`Encoding::Raw`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedEncoding`] for anything else.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "" => Ok(Self::Raw),
            _ => Err(ConfigError::UnsupportedEncoding(value.to_string())),
        }
    }

    /// Decodes payload bytes into text.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeRejection::InvalidEncoding`] when UTF-8 is required and
    /// the bytes are not valid UTF-8.
    pub fn decode(&self, payload: &[u8]) -> Result<String, DecodeRejection> {
        match self {
            Self::Utf8 => std::str::from_utf8(payload)
                .map(ToString::to_string)
                .map_err(|_| DecodeRejection::InvalidEncoding),
            Self::Raw => Ok(String::from_utf8_lossy(payload).into_owned()),
        }
    }
}
