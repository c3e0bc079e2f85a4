// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-owner task driving a fan.
//!
//! [`FanRuntime::start`] moves an [`MqttFan`] into a tokio task. The task
//! takes inbound messages from the transport and commands from any number of
//! [`FanHandle`]s, and handles them one at a time. A reconfiguration finishes
//! tearing down and rebuilding subscriptions before the next message is
//! looked at, so no message is decoded against a stale configuration.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::capabilities::FanFeatures;
use crate::config::FanConfig;
use crate::error::{Error, ProtocolError, Result};
use crate::event::{EntityId, EventBus, FanEvent};
use crate::fan::MqttFan;
use crate::protocol::{InboundMessage, Transport};
use crate::state::FanState;
use crate::types::Percentage;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

type Reply<T> = oneshot::Sender<Result<T>>;

#[derive(Debug)]
enum FanCommand {
    TurnOn {
        percentage: Option<Percentage>,
        preset_mode: Option<String>,
        reply: Reply<()>,
    },
    TurnOff {
        reply: Reply<()>,
    },
    SetPercentage {
        percentage: Percentage,
        reply: Reply<()>,
    },
    SetPresetMode {
        mode: String,
        reply: Reply<()>,
    },
    SetOscillating {
        oscillating: bool,
        reply: Reply<()>,
    },
    Reconfigure {
        config: Box<FanConfig>,
        reply: Reply<()>,
    },
    Snapshot {
        reply: oneshot::Sender<FanSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Read-only view of a fan for the host.
#[derive(Debug, Clone, PartialEq)]
pub struct FanSnapshot {
    /// Entity identifier.
    pub entity_id: EntityId,
    /// Entity name.
    pub name: String,
    /// Current state.
    pub state: FanState,
    /// Supported-feature bitset.
    pub supported_features: FanFeatures,
    /// Whether any channel is optimistic.
    pub assumed_state: bool,
    /// Number of speeds.
    pub speed_count: u8,
    /// Percentage per speed step.
    pub percentage_step: f64,
    /// Configured preset modes.
    pub preset_modes: Vec<String>,
}

impl<T: Transport> From<&MqttFan<T>> for FanSnapshot {
    fn from(fan: &MqttFan<T>) -> Self {
        Self {
            entity_id: fan.entity_id(),
            name: fan.name().to_string(),
            state: fan.state().clone(),
            supported_features: fan.supported_features(),
            assumed_state: fan.assumed_state(),
            speed_count: fan.speed_count(),
            percentage_step: fan.percentage_step(),
            preset_modes: fan.preset_modes().to_vec(),
        }
    }
}

/// Background task owning one fan.
#[derive(Debug)]
pub struct FanRuntime<T: Transport> {
    fan: MqttFan<T>,
    inbound: mpsc::Receiver<InboundMessage>,
    commands: mpsc::Receiver<FanCommand>,
}

impl<T: Transport> FanRuntime<T> {
    /// Subscribes the fan and spawns its task.
    ///
    /// Returns a handle to control the fan and the task's join handle. The
    /// task ends after [`FanHandle::shutdown`] or once every handle is
    /// dropped, and yields the fan back.
    ///
    /// # Errors
    ///
    /// Returns error if subscribing to the state topics fails.
    pub async fn start(
        mut fan: MqttFan<T>,
        inbound: mpsc::Receiver<InboundMessage>,
    ) -> Result<(FanHandle, JoinHandle<MqttFan<T>>)> {
        fan.subscribe_topics().await?;

        let (command_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = FanHandle {
            entity_id: fan.entity_id(),
            events: fan.event_bus().clone(),
            commands: command_tx,
        };

        tracing::info!(
            entity = %fan.entity_id(),
            name = %fan.name(),
            topics = fan.subscriptions().len(),
            "Fan runtime started"
        );

        let runtime = Self {
            fan,
            inbound,
            commands,
        };
        Ok((handle, tokio::spawn(runtime.run())))
    }

    async fn run(mut self) -> MqttFan<T> {
        let mut inbound_open = true;

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(FanCommand::Shutdown { reply }) => {
                            self.fan.unsubscribe_topics().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(command) => self.execute(command).await,
                        None => {
                            self.fan.unsubscribe_topics().await;
                            break;
                        }
                    }
                }
                message = self.inbound.recv(), if inbound_open => {
                    match message {
                        Some(message) => {
                            self.fan.handle_message(&message);
                        }
                        None => {
                            tracing::warn!(
                                entity = %self.fan.entity_id(),
                                "Inbound message stream closed"
                            );
                            inbound_open = false;
                        }
                    }
                }
            }
        }

        tracing::info!(entity = %self.fan.entity_id(), "Fan runtime stopped");
        self.fan
    }

    async fn execute(&mut self, command: FanCommand) {
        let fan = &mut self.fan;
        match command {
            FanCommand::TurnOn {
                percentage,
                preset_mode,
                reply,
            } => {
                let _ = reply.send(fan.turn_on(percentage, preset_mode.as_deref()).await);
            }
            FanCommand::TurnOff { reply } => {
                let _ = reply.send(fan.turn_off().await);
            }
            FanCommand::SetPercentage { percentage, reply } => {
                let _ = reply.send(fan.set_percentage(percentage).await);
            }
            FanCommand::SetPresetMode { mode, reply } => {
                let _ = reply.send(fan.set_preset_mode(&mode).await);
            }
            FanCommand::SetOscillating { oscillating, reply } => {
                let _ = reply.send(fan.set_oscillating(oscillating).await);
            }
            FanCommand::Reconfigure { config, reply } => {
                let _ = reply.send(fan.reconfigure(*config).await);
            }
            FanCommand::Snapshot { reply } => {
                let _ = reply.send(FanSnapshot::from(&*fan));
            }
            // handled by the run loop
            FanCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }
}

/// Cloneable handle to a running fan.
#[derive(Debug, Clone)]
pub struct FanHandle {
    entity_id: EntityId,
    events: EventBus,
    commands: mpsc::Sender<FanCommand>,
}

impl FanHandle {
    /// Entity identifier of the fan.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Subscribes to the fan's events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FanEvent> {
        self.events.subscribe()
    }

    /// Returns whether the runtime task is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Turns the fan on.
    ///
    /// # Errors
    ///
    /// See [`MqttFan::turn_on`]. Also fails if the runtime stopped.
    pub async fn turn_on(
        &self,
        percentage: Option<Percentage>,
        preset_mode: Option<&str>,
    ) -> Result<()> {
        let preset_mode = preset_mode.map(ToString::to_string);
        self.request(|reply| FanCommand::TurnOn {
            percentage,
            preset_mode,
            reply,
        })
        .await?
    }

    /// Turns the fan off.
    ///
    /// # Errors
    ///
    /// See [`MqttFan::turn_off`]. Also fails if the runtime stopped.
    pub async fn turn_off(&self) -> Result<()> {
        self.request(|reply| FanCommand::TurnOff { reply }).await?
    }

    /// Sets the speed percentage.
    ///
    /// # Errors
    ///
    /// See [`MqttFan::set_percentage`]. Also fails if the runtime stopped.
    pub async fn set_percentage(&self, percentage: Percentage) -> Result<()> {
        self.request(|reply| FanCommand::SetPercentage { percentage, reply })
            .await?
    }

    /// Selects a preset mode.
    ///
    /// # Errors
    ///
    /// See [`MqttFan::set_preset_mode`]. Also fails if the runtime stopped.
    pub async fn set_preset_mode(&self, mode: impl Into<String>) -> Result<()> {
        let mode = mode.into();
        self.request(|reply| FanCommand::SetPresetMode { mode, reply })
            .await?
    }

    /// Switches oscillation.
    ///
    /// # Errors
    ///
    /// See [`MqttFan::set_oscillating`]. Also fails if the runtime stopped.
    pub async fn set_oscillating(&self, oscillating: bool) -> Result<()> {
        self.request(|reply| FanCommand::SetOscillating { oscillating, reply })
            .await?
    }

    /// Replaces the fan configuration.
    ///
    /// # Errors
    ///
    /// See [`MqttFan::reconfigure`]. Also fails if the runtime stopped.
    pub async fn reconfigure(&self, config: FanConfig) -> Result<()> {
        let config = Box::new(config);
        self.request(|reply| FanCommand::Reconfigure { config, reply })
            .await?
    }

    /// Returns a snapshot of the fan.
    ///
    /// # Errors
    ///
    /// Fails if the runtime stopped.
    pub async fn snapshot(&self) -> Result<FanSnapshot> {
        self.request(|reply| FanCommand::Snapshot { reply }).await
    }

    /// Returns the current state.
    ///
    /// # Errors
    ///
    /// Fails if the runtime stopped.
    pub async fn state(&self) -> Result<FanState> {
        Ok(self.snapshot().await?.state)
    }

    /// Stops the runtime after unsubscribing from every topic.
    ///
    /// # Errors
    ///
    /// Fails if the runtime already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| FanCommand::Shutdown { reply }).await
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> FanCommand) -> Result<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| runtime_stopped())?;
        reply_rx.await.map_err(|_| runtime_stopped())
    }
}

fn runtime_stopped() -> Error {
    ProtocolError::ChannelClosed("fan runtime stopped".to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MemoryTransport;
    use std::time::Duration;

    fn config() -> FanConfig {
        FanConfig::new("fan/set")
            .with_state_topic("fan/state")
            .with_preset_modes("fan/preset/set", None, ["eco", "auto"])
    }

    async fn start() -> (FanHandle, JoinHandle<MqttFan<MemoryTransport>>, MemoryTransport) {
        let (transport, inbound) = MemoryTransport::new();
        let fan = MqttFan::builder(config(), transport.clone()).build().unwrap();
        let (handle, task) = FanRuntime::start(fan, inbound).await.unwrap();
        (handle, task, transport)
    }

    async fn next_event(rx: &mut broadcast::Receiver<FanEvent>) -> FanEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn commands_run_in_order() {
        let (handle, _task, transport) = start().await;

        handle.turn_on(None, Some("eco")).await.unwrap();
        handle.turn_off().await.unwrap();

        let payloads: Vec<_> = transport
            .published()
            .into_iter()
            .map(|m| m.payload)
            .collect();
        assert_eq!(payloads, ["ON", "eco", "OFF"]);

        let state = handle.state().await.unwrap();
        assert_eq!(state.preset_mode(), Some("eco"));
        assert_eq!(state.is_on(), None);
    }

    #[tokio::test]
    async fn inbound_messages_reach_the_fan() {
        let (handle, _task, transport) = start().await;
        let mut events = handle.subscribe();

        assert!(transport.inject("fan/state", "ON").await);
        let event = next_event(&mut events).await;
        assert_eq!(event.entity_id(), handle.entity_id());
        assert_eq!(event.state().is_on(), Some(true));
    }

    #[tokio::test]
    async fn errors_are_returned_to_the_caller() {
        let (handle, _task, transport) = start().await;
        let err = handle.set_preset_mode("turbo").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPresetMode { .. }));
        assert!(transport.published().is_empty());
        assert!(handle.is_running());
    }

    #[tokio::test]
    async fn reconfigure_through_handle() {
        let (handle, _task, transport) = start().await;
        let new_config = FanConfig::new("fan/set")
            .with_state_topic("fan/new_state")
            .with_oscillation_topics("fan/osc/set", None);
        handle.reconfigure(new_config).await.unwrap();

        assert_eq!(transport.subscriptions(), ["fan/new_state"]);
        assert!(!transport.inject("fan/state", "ON").await);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.supported_features, FanFeatures::OSCILLATE);
        assert!(snapshot.assumed_state);
        assert!(snapshot.preset_modes.is_empty());
    }

    #[tokio::test]
    async fn shutdown_unsubscribes_and_returns_fan() {
        let (handle, task, transport) = start().await;
        handle.shutdown().await.unwrap();

        let fan = task.await.unwrap();
        assert!(fan.subscriptions().is_empty());
        assert!(transport.subscriptions().is_empty());

        let err = handle.turn_off().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::ChannelClosed(_))
        ));
    }

    #[tokio::test]
    async fn dropping_handles_stops_the_task() {
        let (handle, task, _transport) = start().await;
        drop(handle);
        let fan = task.await.unwrap();
        assert!(fan.subscriptions().is_empty());
    }
}
