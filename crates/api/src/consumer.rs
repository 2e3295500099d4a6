//! Trackfetch consumer types.

use crate::*;
use std::sync::Arc;

/// A fetched track item, handed to the [DisplayHandler].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    /// The track the item belongs to.
    pub track_id: TrackId,

    /// The sequence number of the item.
    pub seq: u64,

    /// The decoded item payload, exactly as published.
    pub payload: serde_json::Value,
}

/// Receives every accepted track item.
pub trait DisplayHandler: 'static + Send + Sync + std::fmt::Debug {
    /// Called once per accepted (non-stale) track item.
    fn display(&self, record: TrackRecord);
}

/// Trait-object [DisplayHandler].
pub type DynDisplayHandler = Arc<dyn DisplayHandler>;

/// Where a consumer is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerPhase {
    /// Constructed, `start()` not yet called.
    Idle,

    /// Looking for the producer's current time partition.
    Bootstrapping,

    /// Polling hints and fetching tracks under the time partition.
    Running {
        /// The discovered time partition component.
        time_partition: NameComponent,
    },
}

/// Fetch window bookkeeping of one track, as reported by
/// [Consumer::status].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackStatus {
    /// The track.
    pub track_id: TrackId,

    /// Highest accepted sequence number. Right after discovery this is
    /// the start sequence number announced by the hint.
    pub last_received_seq: u64,

    /// Highest requested sequence number.
    pub last_issued_seq: u64,

    /// Timeouts seen since the last accepted item.
    pub timeout_count: u32,
}

/// A point in time view of a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerStatus {
    /// The lifecycle phase.
    pub phase: ConsumerPhase,

    /// The version component of the last accepted hint, if any.
    pub hint_marker: Option<NameComponent>,

    /// Every tracked track, ordered by id.
    pub tracks: Vec<TrackStatus>,
}

/// A track fetch agent.
pub trait Consumer: 'static + Send + Sync + std::fmt::Debug {
    /// Begin bootstrapping. Calling this more than once has no effect.
    fn start(&self);

    /// Report the current state of the agent.
    fn status(&self) -> BoxFut<'_, TfResult<ConsumerStatus>>;
}

/// Trait-object [Consumer].
pub type DynConsumer = Arc<dyn Consumer>;

/// A factory for creating Consumer instances.
pub trait ConsumerFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Add the default module config of this factory.
    fn default_config(&self, config: &mut config::Config) -> TfResult<()>;

    /// Check the config before it is used to create an instance.
    fn validate_config(&self, config: &config::Config) -> TfResult<()>;

    /// Construct a Consumer instance.
    fn create(
        &self,
        config: &config::Config,
        transport: DynTransport,
        display: DynDisplayHandler,
    ) -> BoxFut<'static, TfResult<DynConsumer>>;
}

/// Trait-object [ConsumerFactory].
pub type DynConsumerFactory = Arc<dyn ConsumerFactory>;
