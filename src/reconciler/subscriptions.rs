// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic to channel routing table.

use crate::capabilities::{CapabilityConfig, Channel};
use crate::protocol::topic_matches;
use crate::state::StateChange;
use crate::types::{Encoding, Qos};

/// One subscribed topic and the channels decoding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Topic filter.
    pub topic: String,
    /// Channels bound to the topic, in configuration order.
    pub channels: Vec<Channel>,
}

/// The state topics a fan listens on.
///
/// Built in full from a [`CapabilityConfig`]; a reconfiguration replaces the
/// whole set. Several channels may share a topic, in which case every one of
/// them decodes each message.
///
/// # Examples
///
/// ```
/// use fanbind::capabilities::{CapabilityConfig, Channel};
/// use fanbind::config::FanConfig;
/// use fanbind::reconciler::SubscriptionSet;
///
/// let config = FanConfig::new("fan/set")
///     .with_state_topic("fan/state")
///     .with_oscillation_topics("fan/osc/set", Some("fan/state"));
/// let caps = CapabilityConfig::configure(&config).unwrap();
///
/// let subs = SubscriptionSet::build(&caps);
/// assert_eq!(subs.len(), 1);
/// assert_eq!(
///     subs.channels_for("fan/state"),
///     vec![Channel::Power, Channel::Oscillation]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    entries: Vec<Subscription>,
    qos: Qos,
    encoding: Encoding,
}

impl SubscriptionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the set for every channel with a configured state topic.
    #[must_use]
    pub fn build(caps: &CapabilityConfig) -> Self {
        let mut entries: Vec<Subscription> = Vec::new();

        for channel in Channel::ALL {
            let Some(topic) = caps.topics(channel).state.as_deref() else {
                continue;
            };
            match entries.iter_mut().find(|entry| entry.topic == topic) {
                Some(entry) => entry.channels.push(channel),
                None => entries.push(Subscription {
                    topic: topic.to_string(),
                    channels: vec![channel],
                }),
            }
        }

        Self {
            entries,
            qos: caps.qos(),
            encoding: caps.encoding(),
        }
    }

    /// Subscribed topic filters.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.topic.as_str())
    }

    /// Channels that decode messages arriving on `topic`.
    ///
    /// Wildcard filters are honored. A channel bound through more than one
    /// matching filter appears once.
    #[must_use]
    pub fn channels_for(&self, topic: &str) -> Vec<Channel> {
        let mut channels = Vec::new();
        for entry in self
            .entries
            .iter()
            .filter(|entry| topic_matches(&entry.topic, topic))
        {
            for channel in &entry.channels {
                if !channels.contains(channel) {
                    channels.push(*channel);
                }
            }
        }
        channels
    }

    /// Whether any channel listens on `topic`.
    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| topic_matches(&entry.topic, topic))
    }

    /// Whether `channel` has a subscription.
    #[must_use]
    pub fn has_channel(&self, channel: Channel) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.channels.contains(&channel))
    }

    /// QoS used for every subscription.
    #[must_use]
    pub const fn qos(&self) -> Qos {
        self.qos
    }

    /// Encoding of inbound payloads.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Number of distinct topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// State defaults applied when the subscriptions are set up.
    ///
    /// Percentage and preset mode start unknown and oscillation starts off
    /// for channels that receive feedback. Power has no such default.
    #[must_use]
    pub fn initial_state(&self) -> Vec<StateChange> {
        let mut changes = Vec::new();
        if self.has_channel(Channel::Percentage) {
            changes.push(StateChange::Percentage(None));
        }
        if self.has_channel(Channel::PresetMode) {
            changes.push(StateChange::PresetMode(None));
        }
        if self.has_channel(Channel::Oscillation) {
            changes.push(StateChange::Oscillating(Some(false)));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FanConfig;

    fn build(config: &FanConfig) -> SubscriptionSet {
        SubscriptionSet::build(&CapabilityConfig::configure(config).unwrap())
    }

    #[test]
    fn only_state_topics_are_subscribed() {
        let config = FanConfig::new("fan/set")
            .with_state_topic("fan/state")
            .with_percentage_topics("fan/pct/set", None)
            .with_oscillation_topics("fan/osc/set", Some("fan/osc"));
        let subs = build(&config);

        assert_eq!(subs.topics().collect::<Vec<_>>(), ["fan/state", "fan/osc"]);
        assert!(subs.has_channel(Channel::Power));
        assert!(!subs.has_channel(Channel::Percentage));
        assert_eq!(subs.channels_for("fan/osc"), vec![Channel::Oscillation]);
        assert!(subs.channels_for("fan/other").is_empty());
    }

    #[test]
    fn no_state_topics_means_empty_set() {
        let subs = build(&FanConfig::new("fan/set"));
        assert!(subs.is_empty());
        assert!(subs.initial_state().is_empty());
        assert!(!subs.matches("fan/set"));
    }

    #[test]
    fn wildcard_topics_route() {
        let config = FanConfig::new("fan/set").with_state_topic("fan/+/state");
        let subs = build(&config);
        assert!(subs.matches("fan/bedroom/state"));
        assert_eq!(subs.channels_for("fan/bedroom/state"), vec![Channel::Power]);
    }

    #[test]
    fn initial_state_covers_fed_back_channels() {
        let config = FanConfig::new("fan/set")
            .with_percentage_topics("fan/pct/set", Some("fan/pct"))
            .with_preset_modes("fan/preset/set", Some("fan/preset"), ["eco"])
            .with_oscillation_topics("fan/osc/set", Some("fan/osc"));
        let subs = build(&config);
        assert_eq!(
            subs.initial_state(),
            vec![
                StateChange::Percentage(None),
                StateChange::PresetMode(None),
                StateChange::Oscillating(Some(false)),
            ]
        );
    }

    #[test]
    fn carries_delivery_options() {
        let mut config = FanConfig::new("fan/set")
            .with_state_topic("fan/state")
            .with_delivery(Qos::ExactlyOnce, false);
        config.encoding = String::new();
        let subs = build(&config);
        assert_eq!(subs.qos(), Qos::ExactlyOnce);
        assert_eq!(subs.encoding(), Encoding::Raw);
    }
}
