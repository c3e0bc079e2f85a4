// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan state types.
//!
//! [`FanState`] holds what the fan is believed to be doing, [`StateChange`]
//! is one field update produced by the reconciler or by an optimistic echo
//! of a command.
//!
//! # Examples
//!
//! ```
//! use fanbind::state::{FanState, StateChange};
//!
//! let mut state = FanState::new();
//! state.apply(&StateChange::Oscillating(Some(true)));
//! assert_eq!(state.oscillating(), Some(true));
//! ```

mod fan_state;
mod state_change;

pub use fan_state::FanState;
pub use state_change::StateChange;
