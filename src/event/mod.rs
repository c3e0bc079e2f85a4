// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State-change notifications for the host.
//!
//! Every accepted state transition of a fan, whether decoded from an inbound
//! message or echoed after an optimistic command, produces exactly one
//! [`FanEvent::StateChanged`] on the fan's [`EventBus`].
//!
//! # Examples
//!
//! ```
//! use fanbind::event::{EntityId, EventBus, FanEvent};
//! use fanbind::state::{FanState, StateChange};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! let entity_id = EntityId::new();
//! bus.publish(FanEvent::StateChanged {
//!     entity_id,
//!     change: StateChange::Power(Some(true)),
//!     state: FanState::new(),
//! });
//!
//! assert_eq!(rx.try_recv().unwrap().entity_id(), entity_id);
//! ```

mod entity_id;
mod event_bus;
mod fan_event;

pub use entity_id::EntityId;
pub use event_bus::EventBus;
pub use fan_event::FanEvent;
