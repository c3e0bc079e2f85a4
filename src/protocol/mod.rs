// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish/subscribe transport for fan entities.
//!
//! The fan only needs three things from its transport: publish a payload,
//! subscribe to a topic and unsubscribe from it. Inbound messages arrive on
//! an `mpsc` receiver handed out when the transport is created.
//!
//! # Transports
//!
//! - [`MqttTransport`]: `rumqttc` based connection to a real broker
//! - [`MemoryTransport`]: in-process transport that records every publish,
//!   used for tests and simulations

#[cfg(feature = "mqtt")]
mod mqtt;
mod memory;
mod topic;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttTransport, MqttTransportBuilder};
pub use memory::MemoryTransport;
pub use topic::topic_matches;
pub(crate) use topic::FilterTable;

use std::future::Future;

use crate::error::ProtocolError;
use crate::types::Qos;

/// Default capacity of the inbound message channel.
pub const DEFAULT_INBOUND_CAPACITY: usize = 64;

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

impl InboundMessage {
    /// Creates an inbound message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// A message to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination topic.
    pub topic: String,
    /// Rendered payload.
    pub payload: String,
    /// Delivery guarantee.
    pub qos: Qos,
    /// Whether the broker should retain the message.
    pub retain: bool,
}

/// Publish/subscribe capability consumed by fan entities.
///
/// Implementations must be cheap to share; the fan runtime calls them from a
/// single task and awaits each call before handling the next event.
pub trait Transport: Send + Sync + 'static {
    /// Publishes a message.
    ///
    /// Completes once the transport accepted the message for delivery.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the transport refuses the message.
    fn publish(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Subscribes to a topic filter.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the subscription request fails.
    fn subscribe(
        &self,
        topic: &str,
        qos: Qos,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Unsubscribes from a topic filter.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the unsubscribe request fails.
    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}
