// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound message handling.
//!
//! [`SubscriptionSet`] routes a message topic to the channels bound to it and
//! [`decode`] turns the payload into a [`StateChange`] for one channel.
//! [`reconcile`] ties both together and applies the logging policy:
//!
//! - empty payloads are ignored and logged at debug level
//! - unrecognized power or oscillation literals are ignored silently
//! - invalid percentages, unknown preset modes, template failures and
//!   undecodable bytes are dropped with a warning
//!
//! None of these affect later messages.

mod decode;
mod subscriptions;

pub use decode::{Decoded, PAYLOAD_NONE, decode};
pub use subscriptions::{Subscription, SubscriptionSet};

use crate::capabilities::CapabilityConfig;
use crate::protocol::InboundMessage;
use crate::state::StateChange;
use crate::template::TemplateRenderer;

/// Decodes an inbound message for every channel bound to its topic.
///
/// Returns the accepted changes in channel order. Messages on topics outside
/// `subscriptions` yield nothing.
pub fn reconcile(
    message: &InboundMessage,
    subscriptions: &SubscriptionSet,
    caps: &CapabilityConfig,
    renderer: &dyn TemplateRenderer,
) -> Vec<StateChange> {
    let channels = subscriptions.channels_for(&message.topic);
    if channels.is_empty() {
        return Vec::new();
    }

    let payload = match subscriptions.encoding().decode(&message.payload) {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!(
                topic = %message.topic,
                bytes = message.payload.len(),
                "Dropping message: {rejection}"
            );
            return Vec::new();
        }
    };

    let mut changes = Vec::with_capacity(channels.len());
    for channel in channels {
        match decode(channel, &payload, caps, renderer) {
            Decoded::Apply(change) => changes.push(change),
            Decoded::Empty => {
                tracing::debug!(
                    topic = %message.topic,
                    channel = %channel,
                    "Ignoring empty payload"
                );
            }
            Decoded::Unrecognized => {}
            Decoded::Rejected(rejection) => {
                tracing::warn!(
                    topic = %message.topic,
                    channel = %channel,
                    payload = %payload,
                    "Dropping payload: {rejection}"
                );
            }
        }
    }
    changes
}
