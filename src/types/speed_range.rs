// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device-native speed range and percentage remapping.
//!
//! A fan reports and accepts speeds as integers in its own range, for example
//! `1..=3` for a three-step fan or `0..=255` for a PWM controller with a
//! non-zero minimum. [`SpeedRange`] converts between that range and the
//! host's `0..=100` percentage scale.
//!
//! The conversion is linear over the number of integer states in the range:
//!
//! ```text
//! states  = max - min + 1
//! native  = ceil(states * percentage / 100) + (min - 1)
//! percent = floor((native - (min - 1)) * 100 / states)
//! ```
//!
//! Ceiling rounding on the way out and floor rounding on the way in means a
//! round trip can overshoot the original percentage by less than one speed
//! step, never undershoot it.

use std::fmt;

use crate::error::ConfigError;
use crate::types::Percentage;

/// Inclusive device-native speed range with `0 < min < max`.
///
/// # Examples
///
/// ```
/// use fanbind::types::{Percentage, SpeedRange};
///
/// let range = SpeedRange::new(1, 100).unwrap();
/// assert_eq!(range.from_percentage(Percentage::new(42).unwrap()), 42);
/// assert_eq!(range.to_percentage(42), 42);
///
/// assert!(SpeedRange::new(0, 10).is_err());
/// assert!(SpeedRange::new(5, 5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeedRange {
    min: i64,
    max: i64,
}

impl SpeedRange {
    /// Default lower bound.
    pub const DEFAULT_MIN: i64 = 1;

    /// Default upper bound.
    pub const DEFAULT_MAX: i64 = 100;

    /// Creates a speed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SpeedRangeMinNotPositive`] if `min <= 0` and
    /// [`ConfigError::SpeedRangeEmpty`] if `min >= max`.
    pub fn new(min: i64, max: i64) -> Result<Self, ConfigError> {
        if min <= 0 {
            return Err(ConfigError::SpeedRangeMinNotPositive(min));
        }
        if min >= max {
            return Err(ConfigError::SpeedRangeEmpty { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower bound.
    #[must_use]
    pub const fn min(&self) -> i64 {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub const fn max(&self) -> i64 {
        self.max
    }

    /// Number of integer speeds in the range.
    #[must_use]
    pub const fn states(&self) -> i64 {
        self.max - self.min + 1
    }

    const fn offset(&self) -> i64 {
        self.min - 1
    }

    /// Converts a percentage into a device-native speed, rounding up.
    #[must_use]
    pub fn from_percentage(&self, percentage: Percentage) -> i64 {
        let scaled = i128::from(self.states()) * i128::from(percentage.value());
        // ceil for a non-negative numerator
        let native = (scaled + 99) / 100 + i128::from(self.offset());
        saturate(native)
    }

    /// Converts a device-native speed into a percentage, rounding down.
    ///
    /// The result is not clamped; a value outside the range yields a
    /// percentage outside `0..=100`, which callers are expected to reject.
    #[must_use]
    pub fn to_percentage(&self, native: i64) -> i64 {
        let shifted = (i128::from(native) - i128::from(self.offset())) * 100;
        saturate(shifted.div_euclid(i128::from(self.states())))
    }

    /// Number of distinct speeds exposed to the host, capped at 100.
    #[must_use]
    pub fn speed_count(&self) -> u8 {
        u8::try_from(self.states().min(100)).unwrap_or(100)
    }
}

impl Default for SpeedRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

impl fmt::Display for SpeedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(v: u8) -> Percentage {
        Percentage::new(v).unwrap()
    }

    #[test]
    fn valid_ranges_are_accepted() {
        for (min, max) in [(1, 2), (1, 100), (3, 7), (50, 255), (1, 1000)] {
            let range = SpeedRange::new(min, max).unwrap();
            assert_eq!(range.min(), min);
            assert_eq!(range.max(), max);
        }
    }

    #[test]
    fn non_positive_min_is_rejected() {
        assert_eq!(
            SpeedRange::new(0, 10),
            Err(ConfigError::SpeedRangeMinNotPositive(0))
        );
        assert_eq!(
            SpeedRange::new(-4, 10),
            Err(ConfigError::SpeedRangeMinNotPositive(-4))
        );
    }

    #[test]
    fn empty_or_inverted_range_is_rejected() {
        assert_eq!(
            SpeedRange::new(5, 5),
            Err(ConfigError::SpeedRangeEmpty { min: 5, max: 5 })
        );
        assert_eq!(
            SpeedRange::new(9, 2),
            Err(ConfigError::SpeedRangeEmpty { min: 9, max: 2 })
        );
    }

    #[test]
    fn identity_for_one_to_hundred() {
        let range = SpeedRange::new(1, 100).unwrap();
        for p in 0..=100 {
            assert_eq!(range.from_percentage(pct(p)), i64::from(p));
            assert_eq!(range.to_percentage(i64::from(p)), i64::from(p));
        }
    }

    #[test]
    fn three_speed_fan() {
        let range = SpeedRange::new(1, 3).unwrap();
        assert_eq!(range.from_percentage(pct(0)), 0);
        assert_eq!(range.from_percentage(pct(33)), 1);
        assert_eq!(range.from_percentage(pct(34)), 2);
        assert_eq!(range.from_percentage(pct(66)), 2);
        assert_eq!(range.from_percentage(pct(67)), 3);
        assert_eq!(range.from_percentage(pct(100)), 3);

        assert_eq!(range.to_percentage(1), 33);
        assert_eq!(range.to_percentage(2), 66);
        assert_eq!(range.to_percentage(3), 100);
    }

    #[test]
    fn out_of_range_native_values_leave_percentage_scale() {
        let range = SpeedRange::new(1, 3).unwrap();
        assert_eq!(range.to_percentage(4), 133);
        assert_eq!(range.to_percentage(-2), -67);
    }

    #[test]
    fn round_trip_error_is_below_one_step() {
        for (min, max) in [(1, 100), (1, 3), (3, 7), (50, 255), (1, 1000), (1, 2)] {
            let range = SpeedRange::new(min, max).unwrap();
            let step = (100 + range.states() - 1) / range.states();
            for p in 0..=100 {
                let back = range.to_percentage(range.from_percentage(pct(p)));
                let error = back - i64::from(p);
                assert!(
                    (0..=step).contains(&error),
                    "range {range}: {p}% came back as {back}%"
                );
            }
        }
    }

    #[test]
    fn speed_count_is_capped() {
        assert_eq!(SpeedRange::new(1, 3).unwrap().speed_count(), 3);
        assert_eq!(SpeedRange::new(1, 100).unwrap().speed_count(), 100);
        assert_eq!(SpeedRange::new(1, 255).unwrap().speed_count(), 100);
    }

    #[test]
    fn huge_native_values_saturate() {
        let range = SpeedRange::new(1, 10).unwrap();
        assert_eq!(range.to_percentage(i64::MAX), i64::MAX);
    }
}
