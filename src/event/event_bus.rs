// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event bus for broadcasting fan events.

use tokio::sync::broadcast;

use super::FanEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcasts fan events to any number of subscribers.
///
/// Every subscriber gets its own copy of each event. Clones of a bus share
/// the same channel, so several fans can publish on one bus.
///
/// # Capacity
///
/// Publishing never blocks. A subscriber that falls more than the channel
/// capacity (default 256) behind loses the oldest events and sees
/// `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use fanbind::event::{EntityId, EventBus, FanEvent};
/// use fanbind::state::{FanState, StateChange};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// let entity_id = EntityId::new();
/// bus.publish(FanEvent::StateChanged {
///     entity_id,
///     change: StateChange::Power(Some(true)),
///     state: FanState::new(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.entity_id(), entity_id);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FanEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus with a custom capacity.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events buffered for a subscriber
    ///   before the oldest are dropped
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to fan events.
    ///
    /// The receiver sees every event published after this call, not the
    /// ones before it.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FanEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event to all subscribers.
    ///
    /// Without subscribers the event is discarded. A slow subscriber whose
    /// buffer is full loses its oldest event instead of blocking the caller.
    pub fn publish(&self, event: FanEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
