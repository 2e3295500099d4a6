#![deny(missing_docs)]
//! Trackfetch core: a consumer-side fetch agent for live tracks published
//! over a named-data request / response network.
//!
//! The agent finds the producer's current time partition, polls the hint
//! object that announces live tracks, and keeps a bounded window of
//! requests outstanding for every track it knows about.
//!
//! The in-memory transport and producer in [factories] let the agent run
//! without a network, for tests and demos.

use trackfetch_api::*;

pub mod factories;

/// Construct the production consumer factory.
pub fn default_consumer_factory() -> DynConsumerFactory {
    factories::CoreConsumerFactory::create()
}

/// Build a [Config] holding the default configuration of every module of
/// the default consumer factory.
pub fn default_config() -> TfResult<Config> {
    let mut config = Config::default();
    default_consumer_factory().default_config(&mut config)?;
    Ok(config)
}
