// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Believed state of a fan.

use crate::types::Percentage;

use super::StateChange;

/// What the fan is believed to be doing.
///
/// Every field is optional: `None` means unknown, either because nothing has
/// been reported yet or because the device sent a reset payload.
///
/// # Examples
///
/// ```
/// use fanbind::state::{FanState, StateChange};
///
/// let mut state = FanState::new();
/// assert_eq!(state.is_on(), None);
///
/// state.apply(&StateChange::Power(Some(true)));
/// assert_eq!(state.is_on(), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FanState {
    is_on: Option<bool>,
    percentage: Option<Percentage>,
    preset_mode: Option<String>,
    oscillating: Option<bool>,
}

impl FanState {
    /// Creates a state where everything is unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the fan is on.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.is_on
    }

    /// Current speed percentage.
    #[must_use]
    pub fn percentage(&self) -> Option<Percentage> {
        self.percentage
    }

    /// Current preset mode.
    #[must_use]
    pub fn preset_mode(&self) -> Option<&str> {
        self.preset_mode.as_deref()
    }

    /// Whether the fan oscillates.
    #[must_use]
    pub fn oscillating(&self) -> Option<bool> {
        self.oscillating
    }

    /// Applies a change.
    ///
    /// Returns `true` if the state actually changed. Callers notify the host
    /// for every accepted change regardless of the return value.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match change {
            StateChange::Power(value) => replace(&mut self.is_on, *value),
            StateChange::Percentage(value) => replace(&mut self.percentage, *value),
            StateChange::PresetMode(value) => replace(&mut self.preset_mode, value.clone()),
            StateChange::Oscillating(value) => replace(&mut self.oscillating, *value),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: Option<T>) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_unknown() {
        let state = FanState::new();
        assert_eq!(state.is_on(), None);
        assert_eq!(state.percentage(), None);
        assert_eq!(state.preset_mode(), None);
        assert_eq!(state.oscillating(), None);
    }

    #[test]
    fn apply_reports_changes() {
        let mut state = FanState::new();
        let change = StateChange::Percentage(Some(Percentage::new(40).unwrap()));

        assert!(state.apply(&change));
        assert!(!state.apply(&change));
        assert_eq!(state.percentage().map(|p| p.value()), Some(40));
    }

    #[test]
    fn apply_reset() {
        let mut state = FanState::new();
        state.apply(&StateChange::PresetMode(Some("eco".to_string())));
        assert_eq!(state.preset_mode(), Some("eco"));

        assert!(state.apply(&StateChange::PresetMode(None)));
        assert_eq!(state.preset_mode(), None);
    }

    #[test]
    fn fields_are_independent() {
        let mut state = FanState::new();
        state.apply(&StateChange::Power(Some(false)));
        state.apply(&StateChange::Oscillating(Some(true)));
        state.apply(&StateChange::Percentage(Some(Percentage::MAX)));

        assert_eq!(state.is_on(), Some(false));
        assert_eq!(state.oscillating(), Some(true));
        assert_eq!(state.percentage(), Some(Percentage::MAX));
        assert_eq!(state.preset_mode(), None);
    }
}
