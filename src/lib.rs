// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `fanbind` - bind a fan entity to MQTT topics.
//!
//! A fan has up to four channels: power, speed percentage, preset mode and
//! oscillation. Each channel publishes commands on its own topic and may
//! report state on another. This library keeps the fan's believed state
//! consistent with both:
//!
//! - channels with a state topic are **confirmed**: state only changes when
//!   the device reports it
//! - channels without one (or every channel, when configured `optimistic`)
//!   are **optimistic**: a command is echoed into local state as soon as it
//!   has been published
//!
//! Percentages are remapped onto the device's native integer speed range,
//! payloads can go through command and value templates, and designated reset
//! literals return a field to unknown.
//!
//! # Modules
//!
//! - [`config`] and [`capabilities`]: raw configuration and its validated
//!   interpretation
//! - [`reconciler`]: inbound payload decoding
//! - [`dispatcher`]: outbound command construction
//! - [`fan`]: the entity and its single-owner runtime
//! - [`protocol`]: the publish/subscribe transport
//! - [`event`]: state-change notifications
//!
//! # Quick Start
//!
//! ```no_run
//! use fanbind::config::FanConfig;
//! use fanbind::fan::{FanRuntime, MqttFan};
//! use fanbind::protocol::MqttTransport;
//! use fanbind::types::Percentage;
//!
//! #[tokio::main]
//! async fn main() -> fanbind::Result<()> {
//!     let (transport, inbound) = MqttTransport::builder()
//!         .broker("mqtt://192.168.1.50:1883")
//!         .build()
//!         .await?;
//!
//!     let config = FanConfig::new("bedroom/fan/set")
//!         .with_state_topic("bedroom/fan/state")
//!         .with_percentage_topics("bedroom/fan/speed/set", Some("bedroom/fan/speed"))
//!         .with_speed_range(1, 3);
//!
//!     let fan = MqttFan::builder(config, transport).build()?;
//!     let (handle, _task) = FanRuntime::start(fan, inbound).await?;
//!
//!     let mut events = handle.subscribe();
//!     handle.turn_on(Some(Percentage::new(66)?), None).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event.state());
//!     }
//!     Ok(())
//! }
//! ```

pub mod capabilities;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod fan;
pub mod protocol;
pub mod reconciler;
pub mod state;
pub mod template;
pub mod types;

pub use capabilities::{CapabilityConfig, Channel, FanCapability, FanFeatures};
pub use config::FanConfig;
pub use error::{
    ConfigError, DecodeRejection, Error, ProtocolError, Result, TemplateError, ValueError,
};
pub use event::{EntityId, EventBus, FanEvent};
pub use fan::{FanBuilder, FanHandle, FanRuntime, FanSnapshot, MqttFan};
pub use protocol::{InboundMessage, MemoryTransport, OutboundMessage, Transport};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttTransport, MqttTransportBuilder};
pub use state::{FanState, StateChange};
pub use types::{Encoding, Percentage, Qos, SpeedRange};
