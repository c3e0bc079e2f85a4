// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT topic filter matching.

use std::collections::BTreeMap;

/// Returns whether `topic` matches the subscription `filter`.
///
/// Supports the single-level (`+`) and multi-level (`#`) wildcards.
///
/// # Examples
///
/// ```
/// use fanbind::protocol::topic_matches;
///
/// assert!(topic_matches("home/+/fan", "home/bedroom/fan"));
/// assert!(topic_matches("home/#", "home/bedroom/fan/speed"));
/// assert!(!topic_matches("home/+/fan", "home/bedroom/light"));
/// ```
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Reference-counted set of subscribed topic filters.
///
/// Several fans may share one transport and subscribe to the same filter.
/// A filter stays active until every subscriber released it.
#[derive(Debug, Default)]
pub(crate) struct FilterTable {
    filters: BTreeMap<String, usize>,
}

impl FilterTable {
    /// Adds a reference to `filter`. Returns `true` if it is new.
    pub(crate) fn acquire(&mut self, filter: &str) -> bool {
        let count = self.filters.entry(filter.to_string()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drops a reference to `filter`.
    ///
    /// Returns `true` when no reference is left, including when the filter
    /// was never acquired.
    pub(crate) fn release(&mut self, filter: &str) -> bool {
        match self.filters.get_mut(filter) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.filters.remove(filter);
                true
            }
            None => true,
        }
    }

    /// Returns whether any active filter matches `topic`.
    pub(crate) fn matches(&self, topic: &str) -> bool {
        self.filters.keys().any(|filter| topic_matches(filter, topic))
    }

    /// Active filters, sorted.
    pub(crate) fn filters(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }
}
