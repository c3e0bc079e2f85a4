// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! A [`StateChange`] targets exactly one field of a [`FanState`](super::FanState).
//! `None` resets the field to unknown.

use crate::capabilities::Channel;
use crate::types::Percentage;

/// A change to one field of the fan state.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StateChange {
    /// Power on/off, or unknown.
    Power(Option<bool>),
    /// Speed percentage, or unknown.
    Percentage(Option<Percentage>),
    /// Preset mode, or unknown.
    PresetMode(Option<String>),
    /// Oscillation on/off, or unknown.
    Oscillating(Option<bool>),
}

impl StateChange {
    /// The channel this change belongs to.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        match self {
            Self::Power(_) => Channel::Power,
            Self::Percentage(_) => Channel::Percentage,
            Self::PresetMode(_) => Channel::PresetMode,
            Self::Oscillating(_) => Channel::Oscillation,
        }
    }

    /// Returns `true` if this change resets its field to unknown.
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        match self {
            Self::Power(v) | Self::Oscillating(v) => v.is_none(),
            Self::Percentage(v) => v.is_none(),
            Self::PresetMode(v) => v.is_none(),
        }
    }
}
