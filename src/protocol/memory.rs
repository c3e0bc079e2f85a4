// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process transport.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::ProtocolError;
use crate::protocol::{
    DEFAULT_INBOUND_CAPACITY, FilterTable, InboundMessage, OutboundMessage, Transport,
};
use crate::types::Qos;

#[derive(Debug, Default)]
struct MemoryInner {
    published: Vec<OutboundMessage>,
    subscriptions: FilterTable,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    fail_publish: bool,
    fail_subscribe: Option<String>,
}

/// Transport that keeps everything in memory.
///
/// Published messages are recorded instead of sent, and messages injected
/// with [`inject`](Self::inject) are delivered to the inbound receiver when
/// they match a current subscription, like a broker would. Subscriptions
/// are reference counted the same way as on [`MqttTransport`](super::MqttTransport),
/// so several fans can share one transport.
///
/// Failures can be switched on with [`set_fail_publish`](Self::set_fail_publish)
/// and [`set_fail_subscribe`](Self::set_fail_subscribe).
///
/// # Examples
///
/// ```
/// use fanbind::protocol::{MemoryTransport, OutboundMessage, Transport};
/// use fanbind::types::Qos;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (transport, mut inbound) = MemoryTransport::new();
///
/// transport.subscribe("fan/state", Qos::AtMostOnce).await.unwrap();
/// assert!(transport.inject("fan/state", "ON").await);
/// assert_eq!(inbound.recv().await.unwrap().payload, b"ON");
///
/// let message = OutboundMessage {
///     topic: "fan/set".to_string(),
///     payload: "OFF".to_string(),
///     qos: Qos::AtMostOnce,
///     retain: false,
/// };
/// transport.publish(&message).await.unwrap();
/// assert_eq!(transport.published(), vec![message]);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryInner>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

impl MemoryTransport {
    /// Creates a transport and the receiver for its inbound messages.
    ///
    /// The receiver buffers up to [`DEFAULT_INBOUND_CAPACITY`] messages;
    /// [`inject`](Self::inject) waits while it is full.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<InboundMessage>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(DEFAULT_INBOUND_CAPACITY);
        let transport = Self {
            inner: Arc::new(Mutex::new(MemoryInner::default())),
            inbound_tx,
        };
        (transport, inbound_rx)
    }

    /// Delivers a message if it matches a current subscription.
    ///
    /// # Arguments
    ///
    /// * `topic` - Concrete topic the message arrives on (no wildcards)
    /// * `payload` - Raw payload bytes
    ///
    /// Returns `true` if the message was delivered, `false` if no filter
    /// matches or the receiver was dropped.
    pub async fn inject(&self, topic: &str, payload: impl Into<Vec<u8>>) -> bool {
        let subscribed = self.inner.lock().subscriptions.matches(topic);
        if !subscribed {
            tracing::trace!(topic = %topic, "Dropping message without subscriber");
            return false;
        }
        self.inbound_tx
            .send(InboundMessage::new(topic, payload))
            .await
            .is_ok()
    }

    /// Returns every message published so far.
    #[must_use]
    pub fn published(&self) -> Vec<OutboundMessage> {
        self.inner.lock().published.clone()
    }

    /// Returns and forgets every message published so far.
    ///
    /// Useful to assert on the commands of one step only:
    ///
    /// ```
    /// use fanbind::config::FanConfig;
    /// use fanbind::fan::MqttFan;
    /// use fanbind::protocol::MemoryTransport;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> fanbind::Result<()> {
    /// let (transport, _inbound) = MemoryTransport::new();
    /// let mut fan = MqttFan::builder(FanConfig::new("fan/set"), transport.clone()).build()?;
    ///
    /// fan.turn_on(None, None).await?;
    /// assert_eq!(transport.take_published().len(), 1);
    ///
    /// fan.turn_off().await?;
    /// let published = transport.take_published();
    /// assert_eq!(published[0].payload, "OFF");
    /// # Ok(())
    /// # }
    /// ```
    pub fn take_published(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.inner.lock().published)
    }

    /// Returns the current subscriptions, sorted.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner
            .lock()
            .subscriptions
            .filters()
            .map(ToString::to_string)
            .collect()
    }

    /// Number of subscribe and unsubscribe calls made so far.
    #[must_use]
    pub fn subscription_calls(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        (inner.subscribe_calls, inner.unsubscribe_calls)
    }

    /// Makes every following publish fail until reset.
    ///
    /// Failed publishes are not recorded.
    pub fn set_fail_publish(&self, fail: bool) {
        self.inner.lock().fail_publish = fail;
    }

    /// Makes subscribing to `filter` fail until reset with `None`.
    ///
    /// # Arguments
    ///
    /// * `filter` - Topic filter to refuse, compared literally
    ///
    /// # Examples
    ///
    /// ```
    /// use fanbind::protocol::{MemoryTransport, Transport};
    /// use fanbind::types::Qos;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let (transport, _inbound) = MemoryTransport::new();
    /// transport.set_fail_subscribe(Some("fan/state"));
    ///
    /// assert!(transport.subscribe("fan/state", Qos::AtMostOnce).await.is_err());
    /// assert!(transport.subscribe("fan/speed", Qos::AtMostOnce).await.is_ok());
    /// assert_eq!(transport.subscriptions(), ["fan/speed"]);
    /// # }
    /// ```
    pub fn set_fail_subscribe(&self, filter: Option<&str>) {
        self.inner.lock().fail_subscribe = filter.map(ToString::to_string);
    }
}

impl Transport for MemoryTransport {
    async fn publish(&self, message: &OutboundMessage) -> Result<(), ProtocolError> {
        let mut inner = self.inner.lock();
        if inner.fail_publish {
            return Err(ProtocolError::PublishFailed {
                topic: message.topic.clone(),
                reason: "publishing disabled".to_string(),
            });
        }
        inner.published.push(message.clone());
        Ok(())
    }

    async fn subscribe(&self, topic: &str, _qos: Qos) -> Result<(), ProtocolError> {
        let mut inner = self.inner.lock();
        inner.subscribe_calls += 1;
        if inner.fail_subscribe.as_deref() == Some(topic) {
            return Err(ProtocolError::SubscribeFailed {
                topic: topic.to_string(),
                reason: "subscribing disabled".to_string(),
            });
        }
        inner.subscriptions.acquire(topic);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), ProtocolError> {
        let mut inner = self.inner.lock();
        inner.unsubscribe_calls += 1;
        inner.subscriptions.release(topic);
        Ok(())
    }
}
