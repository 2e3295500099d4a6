//! The consumer state machine.
//!
//! [ConsumerState] owns the track table, the hint tracker and the time
//! partition. It is driven one [Event] at a time and answers with
//! [Command]s for the event loop to carry out. It never touches the
//! transport itself, which keeps every transition synchronous.

use std::time::Duration;

use trackfetch_api::{
    name::{TRACKS_COMPONENT, TRACK_ID_OFFSET, TRACK_SEQ_OFFSET},
    *,
};

use super::{
    bootstrap::BootstrapResolver,
    config::CoreConsumerConfig,
    hint::{HintTracker, HintVerdict},
    pipeline::{self, DataVerdict, TimeoutVerdict},
    track_table::TrackTable,
};

/// The kind of request an interest was expressed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Bootstrap,
    Hint,
    Track,
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    /// Begin bootstrapping.
    Start,

    /// The transport resolved an interest.
    Outcome {
        kind: RequestKind,
        interest: Interest,
        outcome: Outcome,
    },
}

/// Output of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// Express an interest now.
    Express { kind: RequestKind, interest: Interest },

    /// Express an interest once the delay has elapsed.
    ExpressAfter {
        delay: Duration,
        kind: RequestKind,
        interest: Interest,
    },

    /// Hand an accepted track item to the display handler.
    Display(TrackRecord),
}

#[derive(Debug)]
enum Phase {
    Idle,
    Bootstrapping(BootstrapResolver),
    Running {
        time_partition: NameComponent,
        hint: HintTracker,
    },
}

#[derive(Debug)]
pub(crate) struct ConsumerState {
    config: CoreConsumerConfig,
    prefix: Name,
    phase: Phase,
    tracks: TrackTable,
}

impl ConsumerState {
    pub fn new(config: CoreConsumerConfig) -> TfResult<Self> {
        let prefix = config.prefix()?;
        Ok(Self {
            config,
            prefix,
            phase: Phase::Idle,
            tracks: TrackTable::default(),
        })
    }

    pub fn status(&self) -> ConsumerStatus {
        let (phase, hint_marker) = match &self.phase {
            Phase::Idle => (ConsumerPhase::Idle, None),
            Phase::Bootstrapping(_) => (ConsumerPhase::Bootstrapping, None),
            Phase::Running {
                time_partition,
                hint,
            } => (
                ConsumerPhase::Running {
                    time_partition: time_partition.clone(),
                },
                hint.marker().cloned(),
            ),
        };
        ConsumerStatus {
            phase,
            hint_marker,
            tracks: self.tracks.status(),
        }
    }

    /// Process one event to completion.
    pub fn handle(&mut self, event: Event, out: &mut Vec<Command>) {
        match event {
            Event::Start => self.start(out),
            Event::Outcome {
                kind,
                interest,
                outcome,
            } => match (kind, outcome) {
                (RequestKind::Bootstrap, Outcome::Data(data)) => {
                    self.on_bootstrap_data(data, out)
                }
                (RequestKind::Bootstrap, Outcome::Timeout) => {
                    self.on_bootstrap_timeout(out)
                }
                (RequestKind::Hint, Outcome::Data(data)) => {
                    self.on_hint_data(interest, data, out)
                }
                (RequestKind::Hint, Outcome::Timeout) => {
                    self.on_hint_timeout(interest, out)
                }
                (RequestKind::Track, Outcome::Data(data)) => {
                    self.on_track_data(data, out)
                }
                (RequestKind::Track, Outcome::Timeout) => {
                    self.on_track_timeout(interest, out)
                }
            },
        }
    }

    fn start(&mut self, out: &mut Vec<Command>) {
        if !matches!(self.phase, Phase::Idle) {
            tracing::debug!("consumer already started");
            return;
        }

        let resolver = BootstrapResolver::new(
            self.prefix.clone(),
            self.config.initial_lifetime(),
            self.config.initial_reexpress_interval(),
        );
        tracing::info!(prefix = %self.prefix, "bootstrapping consumer");
        out.push(Command::Express {
            kind: RequestKind::Bootstrap,
            interest: resolver.interest(),
        });
        self.phase = Phase::Bootstrapping(resolver);
    }

    fn on_bootstrap_data(&mut self, data: Data, out: &mut Vec<Command>) {
        let Phase::Bootstrapping(resolver) = &self.phase else {
            tracing::debug!(name = %data.name, "late bootstrap data");
            return;
        };

        let Some(time_partition) = resolver.on_data(&data) else {
            return;
        };

        let hint = HintTracker::new(
            &self.prefix,
            time_partition.clone(),
            self.config.hint_lifetime(),
        );
        out.push(Command::Express {
            kind: RequestKind::Hint,
            interest: hint.interest(),
        });
        self.phase = Phase::Running {
            time_partition,
            hint,
        };
    }

    fn on_bootstrap_timeout(&mut self, out: &mut Vec<Command>) {
        let Phase::Bootstrapping(resolver) = &self.phase else {
            return;
        };

        out.push(Command::ExpressAfter {
            delay: resolver.on_timeout(),
            kind: RequestKind::Bootstrap,
            interest: resolver.interest(),
        });
    }

    fn on_hint_data(
        &mut self,
        interest: Interest,
        data: Data,
        out: &mut Vec<Command>,
    ) {
        let Phase::Running {
            time_partition,
            hint,
        } = &mut self.phase
        else {
            return;
        };

        let tracks = match hint.on_data(&data) {
            HintVerdict::Accepted(tracks) => tracks,
            HintVerdict::Duplicate => {
                // keep waiting for a newer version with the same interest
                out.push(Command::Express {
                    kind: RequestKind::Hint,
                    interest,
                });
                return;
            }
            HintVerdict::Malformed => Vec::new(),
        };

        let pipeline_size = self.config.pipeline_size as u64;
        for TrackHint { id, seq } in tracks {
            if seq.checked_add(pipeline_size).is_none() {
                tracing::warn!(
                    track_id = %id,
                    start_seq = seq,
                    "hinted sequence number out of range, ignoring track"
                );
                continue;
            }

            let Some(state) = self.tracks.discover(id.clone()) else {
                continue;
            };

            let range = pipeline::initial_fetch(state, seq, pipeline_size);
            tracing::info!(
                track_id = %id,
                start_seq = seq,
                "fetching new track"
            );
            for seq in range {
                out.push(Command::Express {
                    kind: RequestKind::Track,
                    interest: track_interest(
                        &self.prefix,
                        time_partition,
                        &id,
                        seq,
                        self.config.track_lifetime(),
                    ),
                });
            }
        }

        out.push(Command::Express {
            kind: RequestKind::Hint,
            interest: hint.interest(),
        });
    }

    fn on_hint_timeout(&mut self, interest: Interest, out: &mut Vec<Command>) {
        if !matches!(self.phase, Phase::Running { .. }) {
            return;
        }

        if !self.tracks.is_empty() {
            tracing::warn!(
                name = %interest.name,
                tracks = self.tracks.len(),
                "hint timed out, dropping all tracks"
            );
        }
        self.tracks.clear();

        out.push(Command::Express {
            kind: RequestKind::Hint,
            interest,
        });
    }

    fn on_track_data(&mut self, data: Data, out: &mut Vec<Command>) {
        let Phase::Running { time_partition, .. } = &self.phase else {
            return;
        };

        let Some((track_id, seq)) = parse_track_name(&data.name) else {
            tracing::warn!(name = %data.name, "unexpected track data name");
            return;
        };

        let Some(state) = self.tracks.get_mut(&track_id) else {
            tracing::debug!(%track_id, seq, "data for unknown track");
            return;
        };

        let pipeline_size = self.config.pipeline_size as u64;
        let last_received_seq = state.last_received_seq;
        let issue = match pipeline::on_data(state, seq, pipeline_size) {
            DataVerdict::Stale => {
                tracing::debug!(
                    %track_id,
                    seq,
                    last_received_seq,
                    "track data out of date"
                );
                return;
            }
            DataVerdict::Accepted { issue } => issue,
        };

        for seq in issue.into_iter().flatten() {
            out.push(Command::Express {
                kind: RequestKind::Track,
                interest: track_interest(
                    &self.prefix,
                    time_partition,
                    &track_id,
                    seq,
                    self.config.track_lifetime(),
                ),
            });
        }

        match serde_json::from_slice(&data.content) {
            Ok(payload) => out.push(Command::Display(TrackRecord {
                track_id,
                seq,
                payload,
            })),
            Err(err) => {
                tracing::warn!(?err, %track_id, seq, "undecodable track data");
            }
        }
    }

    fn on_track_timeout(&mut self, interest: Interest, out: &mut Vec<Command>) {
        let Some((track_id, seq)) = parse_track_name(&interest.name) else {
            tracing::warn!(name = %interest.name, "unexpected track interest");
            return;
        };

        let Some(state) = self.tracks.get_mut(&track_id) else {
            tracing::debug!(%track_id, seq, "timeout for unknown track");
            return;
        };

        match pipeline::on_timeout(
            state,
            seq,
            self.config.track_timeout_threshold,
        ) {
            TimeoutVerdict::Reissue => {
                tracing::debug!(name = %interest.name, "re-expressing");
                out.push(Command::Express {
                    kind: RequestKind::Track,
                    interest,
                });
            }
            TimeoutVerdict::Moot => (),
            TimeoutVerdict::Drop => {
                tracing::warn!(
                    %track_id,
                    timeouts = state.timeout_count,
                    "too many timeouts, dropping track"
                );
                self.tracks.remove(&track_id);
            }
        }
    }
}

/// Build the interest for one item of a track.
fn track_interest(
    prefix: &Name,
    time_partition: &NameComponent,
    track_id: &TrackId,
    seq: u64,
    lifetime: Duration,
) -> Interest {
    let name = prefix
        .clone()
        .append(time_partition.clone())
        .append(TRACKS_COMPONENT)
        .append(track_id)
        .append(seq);
    Interest::new(name)
        .with_must_be_fresh(true)
        .with_lifetime(lifetime)
}

/// Read the track id and sequence number at their fixed offsets.
fn parse_track_name(name: &Name) -> Option<(TrackId, u64)> {
    let track_id = TrackId::from_component(name.get(TRACK_ID_OFFSET)?)?;
    let seq = name.get(TRACK_SEQ_OFFSET)?.to_seq()?;
    Some((track_id, seq))
}
