// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-channel payload decoders.

use crate::capabilities::{CapabilityConfig, Channel, PayloadLiterals};
use crate::error::DecodeRejection;
use crate::state::StateChange;
use crate::template::TemplateRenderer;
use crate::types::Percentage;

/// Power payload that resets the on/off state to unknown.
pub const PAYLOAD_NONE: &str = "None";

/// Outcome of decoding one payload for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The payload maps to a state change.
    Apply(StateChange),
    /// The rendered payload was empty.
    Empty,
    /// The payload is not a literal the channel reacts to.
    Unrecognized,
    /// The payload was invalid for the channel.
    Rejected(DecodeRejection),
}

/// Decodes a payload received for `channel`.
///
/// The channel's value template is rendered first; the result is then
/// interpreted against the configured payload vocabulary.
pub fn decode(
    channel: Channel,
    payload: &str,
    caps: &CapabilityConfig,
    renderer: &dyn TemplateRenderer,
) -> Decoded {
    let rendered = match caps.templates().value(channel).render(renderer, payload) {
        Ok(rendered) => rendered,
        Err(e) => return Decoded::Rejected(e.into()),
    };

    match channel {
        Channel::Power => decode_power(&rendered, caps.payloads()),
        Channel::Percentage => decode_percentage(&rendered, caps),
        Channel::PresetMode => decode_preset_mode(rendered, caps),
        Channel::Oscillation => decode_oscillation(&rendered, caps.payloads()),
    }
}

fn decode_power(rendered: &str, payloads: &PayloadLiterals) -> Decoded {
    if rendered.is_empty() {
        Decoded::Empty
    } else if rendered == payloads.on {
        Decoded::Apply(StateChange::Power(Some(true)))
    } else if rendered == payloads.off {
        Decoded::Apply(StateChange::Power(Some(false)))
    } else if rendered == PAYLOAD_NONE {
        Decoded::Apply(StateChange::Power(None))
    } else {
        Decoded::Unrecognized
    }
}

fn decode_percentage(rendered: &str, caps: &CapabilityConfig) -> Decoded {
    if rendered.is_empty() {
        return Decoded::Empty;
    }
    if rendered == caps.payloads().percentage_reset {
        return Decoded::Apply(StateChange::Percentage(None));
    }

    let Ok(native) = rendered.trim().parse::<i64>() else {
        return Decoded::Rejected(DecodeRejection::NotAnInteger(rendered.to_string()));
    };
    let percentage = caps.speed_range().to_percentage(native);
    match Percentage::try_from(percentage) {
        Ok(p) => Decoded::Apply(StateChange::Percentage(Some(p))),
        Err(_) => Decoded::Rejected(DecodeRejection::PercentageOutOfRange {
            payload: rendered.to_string(),
            percentage,
        }),
    }
}

// The reset literal wins over the empty check so an empty reset literal
// still clears the mode.
fn decode_preset_mode(rendered: String, caps: &CapabilityConfig) -> Decoded {
    if rendered == caps.payloads().preset_reset {
        return Decoded::Apply(StateChange::PresetMode(None));
    }
    if rendered.is_empty() {
        return Decoded::Empty;
    }
    if !caps.preset_modes().contains(&rendered) {
        return Decoded::Rejected(DecodeRejection::UnknownPresetMode(rendered));
    }
    Decoded::Apply(StateChange::PresetMode(Some(rendered)))
}

fn decode_oscillation(rendered: &str, payloads: &PayloadLiterals) -> Decoded {
    if rendered.is_empty() {
        Decoded::Empty
    } else if rendered == payloads.oscillate_on {
        Decoded::Apply(StateChange::Oscillating(Some(true)))
    } else if rendered == payloads.oscillate_off {
        Decoded::Apply(StateChange::Oscillating(Some(false)))
    } else {
        Decoded::Unrecognized
    }
}
