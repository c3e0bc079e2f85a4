// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport backed by `rumqttc`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use tokio::sync::{mpsc, oneshot};

use crate::error::ProtocolError;
use crate::protocol::{
    DEFAULT_INBOUND_CAPACITY, FilterTable, InboundMessage, OutboundMessage, Transport,
};
use crate::types::Qos;

/// Counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct MqttInner {
    client: AsyncClient,
    filters: RwLock<FilterTable>,
    connected: AtomicBool,
}

/// Connection to an MQTT broker.
///
/// Messages arriving on any subscribed filter are forwarded to the inbound
/// receiver returned by [`MqttTransportBuilder::build`].
///
/// # Examples
///
/// ```ignore
/// use fanbind::protocol::MqttTransport;
///
/// let (transport, inbound) = MqttTransport::builder()
///     .broker("mqtt://192.168.1.50:1883")
///     .credentials("user", "password")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MqttTransport {
    inner: Arc<MqttInner>,
}

impl MqttTransport {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> MqttTransportBuilder {
        MqttTransportBuilder::default()
    }

    /// Returns whether the broker connection is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the active subscription filters, sorted.
    ///
    /// A filter subscribed by several fans is listed once and stays active
    /// until each of them unsubscribed.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner
            .filters
            .read()
            .filters()
            .map(ToString::to_string)
            .collect()
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        self.inner.client.disconnect().await?;
        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }
}

impl Transport for MqttTransport {
    async fn publish(&self, message: &OutboundMessage) -> Result<(), ProtocolError> {
        tracing::debug!(
            topic = %message.topic,
            payload = %message.payload,
            qos = message.qos.as_u8(),
            retain = message.retain,
            "Publishing MQTT message"
        );

        self.inner
            .client
            .publish(
                message.topic.as_str(),
                message.qos.into(),
                message.retain,
                message.payload.clone().into_bytes(),
            )
            .await
            .map_err(|e| ProtocolError::PublishFailed {
                topic: message.topic.clone(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), ProtocolError> {
        tracing::debug!(topic = %topic, qos = qos.as_u8(), "Subscribing");
        self.inner.client.subscribe(topic, qos.into()).await?;
        self.inner.filters.write().acquire(topic);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), ProtocolError> {
        if !self.inner.filters.write().release(topic) {
            tracing::debug!(topic = %topic, "Filter still in use, keeping broker subscription");
            return Ok(());
        }
        tracing::debug!(topic = %topic, "Unsubscribing");
        self.inner.client.unsubscribe(topic).await?;
        Ok(())
    }
}

/// Builder for [`MqttTransport`].
#[derive(Debug, Default)]
pub struct MqttTransportBuilder {
    broker: Option<String>,
    username: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
    keep_alive: Option<Duration>,
    connection_timeout: Option<Duration>,
    inbound_capacity: Option<usize>,
}

impl MqttTransportBuilder {
    /// Sets the broker URL (`mqtt://host:port`, `tcp://host:port` or `host`).
    #[must_use]
    pub fn broker(mut self, broker: impl Into<String>) -> Self {
        self.broker = Some(broker.into());
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets a custom client ID.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.keep_alive = Some(duration);
        self
    }

    /// Sets how long to wait for the broker to acknowledge the connection.
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.connection_timeout = Some(duration);
        self
    }

    /// Sets the capacity of the inbound message channel.
    #[must_use]
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = Some(capacity);
        self
    }

    /// Connects to the broker.
    ///
    /// Returns the transport and the receiver for inbound messages.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the broker URL is missing or invalid
    /// - the connection is not acknowledged before the timeout
    pub async fn build(
        self,
    ) -> Result<(MqttTransport, mpsc::Receiver<InboundMessage>), ProtocolError> {
        let broker = self
            .broker
            .ok_or_else(|| ProtocolError::InvalidAddress("broker is required".to_string()))?;
        let (host, port) = parse_mqtt_url(&broker)?;

        let client_id = self.client_id.unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("fanbind_{}_{}", std::process::id(), counter)
        });

        let mut mqtt_options = MqttOptions::new(&client_id, &host, port);
        mqtt_options.set_keep_alive(self.keep_alive.unwrap_or(DEFAULT_KEEP_ALIVE));
        mqtt_options.set_clean_session(true);

        if let (Some(username), Some(password)) = (self.username, self.password) {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let (inbound_tx, inbound_rx) =
            mpsc::channel(self.inbound_capacity.unwrap_or(DEFAULT_INBOUND_CAPACITY));

        let transport = MqttTransport {
            inner: Arc::new(MqttInner {
                client,
                filters: RwLock::new(FilterTable::default()),
                connected: AtomicBool::new(false),
            }),
        };

        let (connack_tx, connack_rx) = oneshot::channel();
        let events_transport = transport.clone();
        tokio::spawn(async move {
            handle_mqtt_events(event_loop, events_transport, inbound_tx, connack_tx).await;
        });

        let timeout = self.connection_timeout.unwrap_or(DEFAULT_CONNECTION_TIMEOUT);
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                tracing::info!(host = %host, port = %port, "Connected to MQTT broker");
                Ok((transport, inbound_rx))
            }
            Ok(Err(_)) => Err(ProtocolError::ConnectionFailed(
                "MQTT event loop terminated unexpectedly".to_string(),
            )),
            Err(_) => Err(ProtocolError::ConnectionFailed(format!(
                "MQTT connection timeout after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

/// Parses an MQTT URL into host and port.
fn parse_mqtt_url(url: &str) -> Result<(String, u16), ProtocolError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| ProtocolError::InvalidAddress(format!("Invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), 1883)
    };

    if host.is_empty() {
        return Err(ProtocolError::InvalidAddress(
            "broker host is empty".to_string(),
        ));
    }

    Ok((host, port))
}

/// Drives the `rumqttc` event loop and forwards subscribed publishes.
async fn handle_mqtt_events(
    mut event_loop: EventLoop,
    transport: MqttTransport,
    inbound_tx: mpsc::Sender<InboundMessage>,
    connack_tx: oneshot::Sender<()>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT connected");
                transport.inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let topic = publish.topic.clone();
                let subscribed = transport.inner.filters.read().matches(&topic);
                if !subscribed {
                    tracing::trace!(topic = %topic, "Ignoring unsubscribed MQTT message");
                    continue;
                }
                tracing::debug!(
                    topic = %topic,
                    bytes = publish.payload.len(),
                    "MQTT message received"
                );
                let message = InboundMessage::new(topic, publish.payload.to_vec());
                if inbound_tx.send(message).await.is_err() {
                    tracing::debug!("Inbound receiver dropped, stopping MQTT event loop");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                transport.inner.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT event loop error");
                transport.inner.connected.store(false, Ordering::Release);
                break;
            }
        }
    }
}
