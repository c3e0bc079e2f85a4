// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end fan behavior over the in-memory transport.

use fanbind::capabilities::CapabilityConfig;
use fanbind::config::FanConfig;
use fanbind::error::{ConfigError, Error};
use fanbind::event::FanEvent;
use fanbind::fan::MqttFan;
use fanbind::protocol::{InboundMessage, MemoryTransport};
use fanbind::types::{Percentage, SpeedRange};
use tokio::sync::broadcast;

fn pct(value: u8) -> Percentage {
    Percentage::new(value).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<FanEvent>) -> Vec<FanEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn subscribed_fan(config: FanConfig) -> (MqttFan<MemoryTransport>, MemoryTransport) {
    let (transport, _inbound) = MemoryTransport::new();
    let mut fan = MqttFan::builder(config, transport.clone()).build().unwrap();
    fan.subscribe_topics().await.unwrap();
    (fan, transport)
}

mod configuration {
    use super::*;

    #[test]
    fn speed_range_must_be_positive_and_non_empty() {
        for (min, max) in [(1, 2), (1, 100), (5, 7), (100, 1000)] {
            let config = FanConfig::new("fan/set").with_speed_range(min, max);
            assert!(CapabilityConfig::configure(&config).is_ok(), "{min}..{max}");
        }
        for (min, max) in [(0, 10), (-3, 10), (5, 5), (7, 5)] {
            let config = FanConfig::new("fan/set").with_speed_range(min, max);
            assert!(
                CapabilityConfig::configure(&config).is_err(),
                "{min}..{max} accepted"
            );
        }
    }

    #[test]
    fn reset_literal_must_not_be_a_preset() {
        let config = FanConfig::new("fan/set").with_preset_modes(
            "fan/preset/set",
            None,
            ["eco", "None"],
        );
        assert_eq!(
            CapabilityConfig::configure(&config).unwrap_err(),
            ConfigError::ResetPayloadIsPresetMode("None".to_string())
        );
    }

    #[test]
    fn discovery_json() {
        let config = FanConfig::from_json(
            r#"{
                "name": "Ceiling",
                "command_topic": "ceiling/set",
                "state_topic": "ceiling/state",
                "percentage_command_topic": "ceiling/speed/set",
                "speed_range_min": 1,
                "speed_range_max": 6,
                "qos": 1
            }"#,
        )
        .unwrap();
        let caps = CapabilityConfig::configure(&config).unwrap();
        assert_eq!(caps.name(), "Ceiling");
        assert_eq!(caps.speed_count(), 6);
    }
}

mod remap {
    use super::*;

    #[test]
    fn round_trip_error_is_bounded() {
        for (min, max) in [(1, 100), (1, 3), (1, 7), (10, 20), (1, 255), (3, 1000)] {
            let range = SpeedRange::new(min, max).unwrap();
            let bound = (100 + range.states() - 1) / range.states();
            for p in 0..=100u8 {
                let native = range.from_percentage(pct(p));
                let back = range.to_percentage(native);
                let error = (i64::from(p) - back).abs();
                assert!(
                    error <= bound,
                    "{p}% -> {native} -> {back}% on {range} (bound {bound})"
                );
            }
        }
    }
}

mod inbound {
    use super::*;

    fn config() -> FanConfig {
        FanConfig::new("fan/set")
            .with_state_topic("fan/state")
            .with_percentage_topics("fan/pct/set", Some("fan/pct"))
            .with_preset_modes("fan/preset/set", Some("fan/preset"), ["eco", "auto"])
            .with_oscillation_topics("fan/osc/set", Some("fan/osc"))
    }

    #[tokio::test]
    async fn duplicate_payloads_notify_twice() {
        let (mut fan, _transport) = subscribed_fan(config()).await;
        let mut rx = fan.event_bus().subscribe();

        fan.handle_message(&InboundMessage::new("fan/pct", "40"));
        let first = fan.state().clone();
        fan.handle_message(&InboundMessage::new("fan/pct", "40"));

        assert_eq!(fan.state(), &first);
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn reset_literals_always_clear_and_notify() {
        let (mut fan, _transport) = subscribed_fan(config()).await;
        fan.handle_message(&InboundMessage::new("fan/pct", "40"));
        fan.handle_message(&InboundMessage::new("fan/preset", "auto"));
        fan.handle_message(&InboundMessage::new("fan/state", "ON"));
        let mut rx = fan.event_bus().subscribe();

        fan.handle_message(&InboundMessage::new("fan/pct", "None"));
        fan.handle_message(&InboundMessage::new("fan/preset", "None"));
        fan.handle_message(&InboundMessage::new("fan/state", "None"));
        // already unknown: still notifies
        fan.handle_message(&InboundMessage::new("fan/preset", "None"));

        assert_eq!(fan.state().percentage(), None);
        assert_eq!(fan.state().preset_mode(), None);
        assert_eq!(fan.state().is_on(), None);
        assert_eq!(drain(&mut rx).len(), 4);
    }

    #[tokio::test]
    async fn bad_percentage_keeps_previous_value() {
        let (mut fan, _transport) =
            subscribed_fan(config().with_speed_range(1, 3)).await;
        fan.handle_message(&InboundMessage::new("fan/pct", "3"));
        assert_eq!(fan.state().percentage(), Some(pct(100)));
        let mut rx = fan.event_bus().subscribe();

        for payload in ["4", "-1", "fast", "2.5"] {
            fan.handle_message(&InboundMessage::new("fan/pct", payload));
            assert_eq!(fan.state().percentage(), Some(pct(100)), "{payload}");
        }
        assert!(drain(&mut rx).is_empty());

        // a bad message does not affect the next one
        fan.handle_message(&InboundMessage::new("fan/pct", "1"));
        assert_eq!(fan.state().percentage(), Some(pct(33)));
    }

    #[tokio::test]
    async fn preset_reset_and_rejection() {
        let (mut fan, _transport) = subscribed_fan(config()).await;
        fan.handle_message(&InboundMessage::new("fan/preset", "eco"));
        let mut rx = fan.event_bus().subscribe();

        fan.handle_message(&InboundMessage::new("fan/preset", "None"));
        assert_eq!(fan.state().preset_mode(), None);
        assert_eq!(drain(&mut rx).len(), 1);

        fan.handle_message(&InboundMessage::new("fan/preset", "turbo"));
        assert_eq!(fan.state().preset_mode(), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn unrecognized_literals_are_silent() {
        let (mut fan, _transport) = subscribed_fan(config()).await;
        let mut rx = fan.event_bus().subscribe();

        fan.handle_message(&InboundMessage::new("fan/state", "maybe"));
        fan.handle_message(&InboundMessage::new("fan/osc", "wobble"));
        fan.handle_message(&InboundMessage::new("fan/state", ""));

        assert_eq!(fan.state().is_on(), None);
        assert_eq!(fan.state().oscillating(), Some(false));
        assert!(drain(&mut rx).is_empty());
    }
}

mod outbound {
    use super::*;

    #[tokio::test]
    async fn optimistic_percentage_scenario() {
        let config = FanConfig::new("fan/set")
            .with_state_topic("fan/state")
            .with_percentage_topics("fan/pct/set", None)
            .with_speed_range(1, 100);
        let (mut fan, transport) = subscribed_fan(config).await;
        let mut rx = fan.event_bus().subscribe();

        fan.set_percentage(pct(42)).await.unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "fan/pct/set");
        assert_eq!(published[0].payload, "42");
        assert_eq!(fan.state().percentage(), Some(pct(42)));
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn confirmed_channels_wait_for_feedback() {
        let config = FanConfig::new("fan/set")
            .with_state_topic("fan/state")
            .with_percentage_topics("fan/pct/set", Some("fan/pct"));
        let (mut fan, _transport) = subscribed_fan(config).await;
        let mut rx = fan.event_bus().subscribe();

        fan.turn_on(Some(pct(60)), None).await.unwrap();
        assert_eq!(fan.state().is_on(), None);
        assert_eq!(fan.state().percentage(), None);
        assert!(drain(&mut rx).is_empty());

        fan.handle_message(&InboundMessage::new("fan/state", "ON"));
        fan.handle_message(&InboundMessage::new("fan/pct", "60"));
        assert_eq!(fan.state().is_on(), Some(true));
        assert_eq!(fan.state().percentage(), Some(pct(60)));
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn invalid_preset_performs_no_publish() {
        let config = FanConfig::new("fan/set").with_preset_modes(
            "fan/preset/set",
            None,
            ["eco", "auto"],
        );
        let (mut fan, transport) = subscribed_fan(config).await;

        let err = fan.set_preset_mode("turbo").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPresetMode { .. }));
        assert!(transport.published().is_empty());
        assert_eq!(fan.state().preset_mode(), None);
    }

    #[tokio::test]
    async fn turn_on_with_unknown_preset_publishes_nothing() {
        let config = FanConfig::new("fan/set")
            .with_percentage_topics("fan/pct/set", None)
            .with_preset_modes("fan/preset/set", None, ["eco"]);
        let (mut fan, transport) = subscribed_fan(config).await;
        let mut rx = fan.event_bus().subscribe();

        let err = fan.turn_on(Some(pct(50)), Some("turbo")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPresetMode { ref mode, .. } if mode == "turbo"));
        assert!(transport.published().is_empty());
        assert_eq!(fan.state().is_on(), None);
        assert_eq!(fan.state().percentage(), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn turn_on_without_percentage_capability_publishes_nothing() {
        let (mut fan, transport) = subscribed_fan(FanConfig::new("fan/set")).await;

        let err = fan.turn_on(Some(pct(50)), None).await.unwrap_err();
        assert!(matches!(err, Error::CapabilityNotSupported("percentage")));
        assert!(transport.published().is_empty());
        assert_eq!(fan.state().is_on(), None);
    }

    #[tokio::test]
    async fn turn_on_orders_nested_commands() {
        let config = FanConfig::new("fan/set")
            .with_percentage_topics("fan/pct/set", None)
            .with_preset_modes("fan/preset/set", None, ["eco"]);
        let (mut fan, transport) = subscribed_fan(config).await;
        let mut rx = fan.event_bus().subscribe();

        fan.turn_on(Some(pct(0)), Some("eco")).await.unwrap();

        let topics: Vec<_> = transport.published().into_iter().map(|m| m.topic).collect();
        assert_eq!(topics, ["fan/set", "fan/pct/set", "fan/preset/set"]);

        let changes: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| e.change().cloned())
            .collect();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[2], fanbind::StateChange::Power(Some(true)));
        assert_eq!(fan.state().percentage(), Some(pct(0)));
    }

    #[tokio::test]
    async fn failed_publish_does_not_echo() {
        let config = FanConfig::new("fan/set").with_oscillation_topics("fan/osc/set", None);
        let (mut fan, transport) = subscribed_fan(config).await;
        let mut rx = fan.event_bus().subscribe();
        transport.set_fail_publish(true);

        assert!(fan.set_oscillating(true).await.is_err());
        assert_eq!(fan.state().oscillating(), None);
        assert!(drain(&mut rx).is_empty());
    }
}
