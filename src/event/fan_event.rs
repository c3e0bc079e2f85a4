// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan event types.

use crate::state::{FanState, StateChange};

use super::EntityId;

/// Events emitted by a fan entity.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FanEvent {
    /// One field of the fan state was set.
    ///
    /// Emitted for every accepted transition, including resets to unknown
    /// and values equal to the previous one.
    StateChanged {
        /// The fan that changed.
        entity_id: EntityId,
        /// The applied change.
        change: StateChange,
        /// Full state after the change.
        state: FanState,
    },

    /// The fan was reconfigured and its state reset.
    Reconfigured {
        /// The reconfigured fan.
        entity_id: EntityId,
        /// State after the reset and subscription defaults.
        state: FanState,
    },
}

impl FanEvent {
    /// Returns the entity this event belongs to.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::StateChanged { entity_id, .. } | Self::Reconfigured { entity_id, .. } => {
                *entity_id
            }
        }
    }

    /// Returns the fan state carried by the event.
    #[must_use]
    pub fn state(&self) -> &FanState {
        match self {
            Self::StateChanged { state, .. } | Self::Reconfigured { state, .. } => state,
        }
    }

    /// Returns the change, if this is a state change.
    #[must_use]
    pub fn change(&self) -> Option<&StateChange> {
        match self {
            Self::StateChanged { change, .. } => Some(change),
            Self::Reconfigured { .. } => None,
        }
    }
}
