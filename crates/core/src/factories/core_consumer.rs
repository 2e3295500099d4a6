//! Consumer is a trackfetch module for fetching the live tracks of a
//! remote producer.
//!
//! It discovers the tracks a producer currently publishes and keeps a
//! bounded window of interests outstanding for each of them.
//!
//! It consists of multiple parts:
//! - Bootstrap resolver that finds the producer's current time partition
//! - Hint tracker that polls the hint object announcing live tracks
//! - Track table holding the fetch window of every known track
//! - Pipeline logic that refills a track's window as items arrive
//!
//! ### Event loop
//!
//! All state is owned by a single task. Every interest is expressed from a
//! short-lived task that awaits the transport outcome and posts it back as
//! an event onto the loop's channel. The loop processes one event at a time
//! to completion, so no locking is needed around the state.
//!
//! ### Failure handling
//!
//! - A track interest that times out is re-expressed unchanged, unless an
//!   item at or above its sequence number has already been accepted.
//! - Stale, duplicate and unknown-track data is dropped.
//! - A hint timeout drops every track. The producer session is assumed to
//!   have ended until a new hint arrives.
//! - A bootstrap timeout is retried after the re-express interval, forever.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    task::{JoinHandle, JoinSet},
};
use trackfetch_api::*;

mod bootstrap;
mod hint;
mod pipeline;
mod state;
mod track_table;

use state::{Command, ConsumerState, Event, RequestKind};

/// CoreConsumer configuration types.
pub mod config {
    use std::time::Duration;

    use trackfetch_api::{Name, NameComponent, TfError, TfResult};

    /// Configuration parameters for [CoreConsumerFactory](super::CoreConsumerFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreConsumerConfig {
        /// Where the transport connects to. Informational for the
        /// in-memory transport. Default: `mem://local`.
        pub transport_endpoint: String,

        /// The producer's root prefix. Default: `/ndn/edu/ucla/remap/opt`.
        pub root_prefix: String,

        /// The producer's space name, appended to the root prefix as one
        /// component. Default: `node0`.
        pub space_name: String,

        /// How many interests to keep outstanding past the last received
        /// item of each track. Default: 3.
        pub pipeline_size: u32,

        /// Wait between a bootstrap timeout and the next bootstrap
        /// interest. Default: 1 s.
        pub initial_reexpress_interval_ms: u32,

        /// Lifetime of the bootstrap interest. Default: 2 s.
        pub initial_lifetime_ms: u32,

        /// Lifetime of track interests. Default: 150 ms.
        pub track_lifetime_ms: u32,

        /// Lifetime of hint interests. Default: 50 s.
        pub hint_lifetime_ms: u32,

        /// Consecutive track timeouts after which a track is dropped until
        /// a later hint announces it again. 0 disables dropping.
        /// Default: 0.
        pub track_timeout_threshold: u32,
    }

    impl Default for CoreConsumerConfig {
        fn default() -> Self {
            Self {
                transport_endpoint: "mem://local".into(),
                root_prefix: "/ndn/edu/ucla/remap/opt".into(),
                space_name: "node0".into(),
                pipeline_size: 3,
                initial_reexpress_interval_ms: 1000,
                initial_lifetime_ms: 2000,
                track_lifetime_ms: 150,
                hint_lifetime_ms: 50_000,
                track_timeout_threshold: 0,
            }
        }
    }

    impl CoreConsumerConfig {
        /// The full producer prefix, `<root_prefix>/<space_name>`.
        pub fn prefix(&self) -> TfResult<Name> {
            Ok(Name::from_str(&self.root_prefix)?
                .append(NameComponent::from_escaped(&self.space_name)?))
        }

        /// Get the bootstrap re-express interval.
        pub fn initial_reexpress_interval(&self) -> Duration {
            Duration::from_millis(self.initial_reexpress_interval_ms as u64)
        }

        /// Get the bootstrap interest lifetime.
        pub fn initial_lifetime(&self) -> Duration {
            Duration::from_millis(self.initial_lifetime_ms as u64)
        }

        /// Get the track interest lifetime.
        pub fn track_lifetime(&self) -> Duration {
            Duration::from_millis(self.track_lifetime_ms as u64)
        }

        /// Get the hint interest lifetime.
        pub fn hint_lifetime(&self) -> Duration {
            Duration::from_millis(self.hint_lifetime_ms as u64)
        }

        /// Check the values make sense together.
        pub fn validate(&self) -> TfResult<()> {
            if self.pipeline_size == 0 {
                return Err(TfError::other("pipelineSize must be at least 1"));
            }
            if self.space_name.is_empty() {
                return Err(TfError::other("spaceName must not be empty"));
            }
            self.prefix()?;
            Ok(())
        }
    }

    /// Module-level configuration for CoreConsumer.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreConsumerModConfig {
        /// CoreConsumer configuration.
        pub core_consumer: CoreConsumerConfig,
    }

    impl trackfetch_api::ModConfig for CoreConsumerModConfig {}
}

pub use config::*;

/// The production consumer module.
#[derive(Debug)]
pub struct CoreConsumerFactory {}

impl CoreConsumerFactory {
    /// Construct a new CoreConsumerFactory.
    pub fn create() -> DynConsumerFactory {
        let out: DynConsumerFactory = Arc::new(Self {});
        out
    }
}

impl ConsumerFactory for CoreConsumerFactory {
    fn default_config(&self, config: &mut Config) -> TfResult<()> {
        config.add_default_module_config(&CoreConsumerModConfig::default())
    }

    fn validate_config(&self, config: &Config) -> TfResult<()> {
        let config: CoreConsumerModConfig = config.get_module_config()?;
        config.core_consumer.validate()
    }

    fn create(
        &self,
        config: &Config,
        transport: DynTransport,
        display: DynDisplayHandler,
    ) -> BoxFut<'static, TfResult<DynConsumer>> {
        let config = config.get_module_config::<CoreConsumerModConfig>();
        Box::pin(async move {
            let config = config?.core_consumer;
            config.validate()?;
            let out: DynConsumer =
                Arc::new(CoreConsumer::new(config, transport, display)?);
            Ok(out)
        })
    }
}

enum LoopMsg {
    Event(Event),
    Status(oneshot::Sender<ConsumerStatus>),
}

type LoopSend = mpsc::UnboundedSender<LoopMsg>;
type LoopRecv = mpsc::UnboundedReceiver<LoopMsg>;

#[derive(Debug)]
struct CoreConsumer {
    loop_send: LoopSend,
    loop_task: JoinHandle<()>,
}

impl Drop for CoreConsumer {
    fn drop(&mut self) {
        self.loop_task.abort();
    }
}

impl CoreConsumer {
    fn new(
        config: CoreConsumerConfig,
        transport: DynTransport,
        display: DynDisplayHandler,
    ) -> TfResult<Self> {
        let state = ConsumerState::new(config)?;
        let (loop_send, loop_recv) = mpsc::unbounded_channel();
        let loop_task = tokio::task::spawn(event_loop(
            state,
            transport,
            display,
            loop_send.clone(),
            loop_recv,
        ));
        Ok(Self {
            loop_send,
            loop_task,
        })
    }
}

impl Consumer for CoreConsumer {
    fn start(&self) {
        if self.loop_send.send(LoopMsg::Event(Event::Start)).is_err() {
            tracing::warn!("consumer event loop has stopped, cannot start");
        }
    }

    fn status(&self) -> BoxFut<'_, TfResult<ConsumerStatus>> {
        Box::pin(async move {
            let (s, r) = oneshot::channel();
            self.loop_send
                .send(LoopMsg::Status(s))
                .map_err(|_| TfError::other("consumer event loop stopped"))?;
            r.await
                .map_err(|_| TfError::other("consumer event loop stopped"))
        })
    }
}

async fn event_loop(
    mut state: ConsumerState,
    transport: DynTransport,
    display: DynDisplayHandler,
    loop_send: LoopSend,
    mut loop_recv: LoopRecv,
) {
    // Outstanding interests. Dropping the set with the loop aborts them.
    let mut in_flight = JoinSet::new();
    let mut commands = Vec::new();

    loop {
        let msg = tokio::select! {
            msg = loop_recv.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {
                continue;
            }
        };

        let event = match msg {
            LoopMsg::Status(s) => {
                let _ = s.send(state.status());
                continue;
            }
            LoopMsg::Event(event) => event,
        };

        state.handle(event, &mut commands);

        for command in commands.drain(..) {
            match command {
                Command::Express { kind, interest } => {
                    in_flight.spawn(express(
                        transport.clone(),
                        loop_send.clone(),
                        kind,
                        interest,
                        None,
                    ));
                }
                Command::ExpressAfter {
                    delay,
                    kind,
                    interest,
                } => {
                    in_flight.spawn(express(
                        transport.clone(),
                        loop_send.clone(),
                        kind,
                        interest,
                        Some(delay),
                    ));
                }
                Command::Display(record) => display.display(record),
            }
        }
    }
}

/// Express one interest and post its outcome back to the event loop.
async fn express(
    transport: DynTransport,
    loop_send: LoopSend,
    kind: RequestKind,
    interest: Interest,
    delay: Option<std::time::Duration>,
) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    tracing::trace!(?kind, name = %interest.name, "expressing interest");
    let outcome = transport.express(interest.clone()).await;

    let _ = loop_send.send(LoopMsg::Event(Event::Outcome {
        kind,
        interest,
        outcome,
    }));
}

#[cfg(test)]
mod test;
