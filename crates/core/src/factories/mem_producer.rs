//! A simulated producer publishing live tracks into a [MemTransport].
//!
//! This is NOT a production module. It exists so the consumer can be run
//! and tested without a network.
//!
//! Names published, relative to the configured prefix:
//! - `<time_partition>/tracks/<track_id>/<seq>` with a JSON item payload.
//! - `<time_partition>/track_hint/<version>` with a JSON [Hint] listing
//!   every live track and its current sequence number.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use trackfetch_api::{
    name::{TRACKS_COMPONENT, TRACK_HINT_COMPONENT},
    *,
};

use super::MemTransport;

/// MemProducer configuration types.
pub mod config {
    use std::time::Duration;

    /// Configuration parameters for [MemProducer](super::MemProducer).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct MemProducerConfig {
        /// How often every live track publishes its next item.
        /// Default: 100 ms.
        pub item_interval_ms: u32,

        /// How often a new hint version is published. Default: 1 s.
        pub hint_interval_ms: u32,

        /// Freshness period of published track items. Default: 5 s.
        pub item_freshness_ms: u32,
    }

    impl Default for MemProducerConfig {
        fn default() -> Self {
            Self {
                item_interval_ms: 100,
                hint_interval_ms: 1000,
                item_freshness_ms: 5000,
            }
        }
    }

    impl MemProducerConfig {
        /// Get the item interval.
        pub fn item_interval(&self) -> Duration {
            Duration::from_millis(self.item_interval_ms as u64)
        }

        /// Get the hint interval. Hints are only fresh for this long.
        pub fn hint_interval(&self) -> Duration {
            Duration::from_millis(self.hint_interval_ms as u64)
        }

        /// Get the item freshness period.
        pub fn item_freshness(&self) -> Duration {
            Duration::from_millis(self.item_freshness_ms as u64)
        }
    }
}

pub use config::*;

#[derive(Debug)]
struct Session {
    session: Name,
    tracks: BTreeMap<TrackId, u64>,
    hint_version: u64,
}

impl Session {
    fn publish_items(&mut self, transport: &MemTransport, freshness: Duration) {
        for (track_id, seq) in self.tracks.iter_mut() {
            *seq += 1;
            let payload = serde_json::json!({
                "track": track_id.as_str(),
                "seq": *seq,
            });
            let name = self
                .session
                .clone()
                .append(TRACKS_COMPONENT)
                .append(track_id)
                .append(*seq);
            transport.publish(
                Data::new(name, payload.to_string())
                    .with_freshness_period(freshness),
            );
        }
    }

    fn publish_hint(
        &mut self,
        transport: &MemTransport,
        freshness: Duration,
    ) -> TfResult<()> {
        let hint = Hint {
            tracks: self
                .tracks
                .iter()
                .map(|(id, seq)| TrackHint {
                    id: id.clone(),
                    seq: *seq,
                })
                .collect(),
        };
        self.hint_version += 1;
        let name = self
            .session
            .clone()
            .append(TRACK_HINT_COMPONENT)
            .append(self.hint_version);
        tracing::debug!(
            %name,
            tracks = hint.tracks.len(),
            "publishing hint"
        );
        transport.publish(
            Data::new(name, hint.encode()?).with_freshness_period(freshness),
        );
        Ok(())
    }
}

/// A simulated producer session.
///
/// Dropping it stops publishing. What was already published stays in the
/// transport until it goes stale.
#[derive(Debug)]
pub struct MemProducer {
    session: Arc<Mutex<Session>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for MemProducer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MemProducer {
    /// Start publishing under `<prefix>/<time_partition>`.
    ///
    /// A first hint is published before this returns, so a consumer can
    /// bootstrap right away.
    pub fn create(
        config: MemProducerConfig,
        transport: Arc<MemTransport>,
        prefix: &Name,
        time_partition: NameComponent,
        tracks: impl IntoIterator<Item = TrackId>,
    ) -> TfResult<Self> {
        if config.item_interval_ms == 0 || config.hint_interval_ms == 0 {
            return Err(TfError::other("producer intervals must be non-zero"));
        }

        let mut session = Session {
            session: prefix.clone().append(time_partition),
            tracks: tracks.into_iter().map(|id| (id, 0)).collect(),
            hint_version: 0,
        };
        session.publish_hint(&transport, config.hint_interval())?;

        tracing::info!(session = %session.session, "producer session started");

        let session = Arc::new(Mutex::new(session));
        let task = tokio::task::spawn(publish_task(
            config,
            transport,
            session.clone(),
        ));

        Ok(Self { session, task })
    }

    /// The `<prefix>/<time_partition>` this producer publishes under.
    pub fn session_name(&self) -> Name {
        self.session.lock().unwrap().session.clone()
    }

    /// Start publishing a new track from sequence number 0. The next hint
    /// announces it.
    pub fn add_track(&self, track_id: TrackId) {
        self.session
            .lock()
            .unwrap()
            .tracks
            .entry(track_id)
            .or_insert(0);
    }

    /// Stop publishing a track.
    pub fn remove_track(&self, track_id: &TrackId) {
        self.session.lock().unwrap().tracks.remove(track_id);
    }

    /// The last published sequence number of a track.
    pub fn current_seq(&self, track_id: &TrackId) -> Option<u64> {
        self.session.lock().unwrap().tracks.get(track_id).copied()
    }

    /// The last published hint version.
    pub fn hint_version(&self) -> u64 {
        self.session.lock().unwrap().hint_version
    }
}

async fn publish_task(
    config: MemProducerConfig,
    transport: Arc<MemTransport>,
    session: Arc<Mutex<Session>>,
) {
    let mut items = tokio::time::interval(config.item_interval());
    let mut hints = tokio::time::interval(config.hint_interval());
    items.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    hints.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // the first tick of an interval fires immediately
    hints.tick().await;

    loop {
        tokio::select! {
            _ = items.tick() => {
                session
                    .lock()
                    .unwrap()
                    .publish_items(&transport, config.item_freshness());
            }
            _ = hints.tick() => {
                let res = session
                    .lock()
                    .unwrap()
                    .publish_hint(&transport, config.hint_interval());
                if let Err(err) = res {
                    tracing::error!(?err, "could not publish hint");
                }
            }
        }
    }
}
