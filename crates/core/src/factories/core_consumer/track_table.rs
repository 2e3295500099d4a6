use std::collections::{hash_map::Entry, HashMap};

use trackfetch_api::{TrackId, TrackStatus};

/// Where a track is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrackPhase {
    /// Announced by a hint, nothing requested yet.
    Discovered,

    /// The initial window has been issued.
    Fetching,
}

/// Fetch window bookkeeping for one track.
///
/// While fetching, the requests for `(last_received_seq, last_issued_seq]`
/// are outstanding (or being re-issued after a timeout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrackState {
    pub phase: TrackPhase,
    pub last_received_seq: u64,
    pub last_issued_seq: u64,
    pub timeout_count: u32,
}

impl TrackState {
    fn new() -> Self {
        Self {
            phase: TrackPhase::Discovered,
            last_received_seq: 0,
            last_issued_seq: 0,
            timeout_count: 0,
        }
    }
}

/// Every track the consumer currently knows about.
#[derive(Debug, Default)]
pub(crate) struct TrackTable {
    tracks: HashMap<TrackId, TrackState>,
}

impl TrackTable {
    /// Insert a fresh [TrackState] for a track that is not yet known.
    /// Returns `None` if the track is already tracked.
    pub fn discover(&mut self, track_id: TrackId) -> Option<&mut TrackState> {
        match self.tracks.entry(track_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(v) => Some(v.insert(TrackState::new())),
        }
    }

    pub fn get_mut(&mut self, track_id: &TrackId) -> Option<&mut TrackState> {
        self.tracks.get_mut(track_id)
    }

    pub fn remove(&mut self, track_id: &TrackId) -> Option<TrackState> {
        self.tracks.remove(track_id)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Report every track, ordered by id.
    pub fn status(&self) -> Vec<TrackStatus> {
        let mut out = self
            .tracks
            .iter()
            .map(|(track_id, s)| TrackStatus {
                track_id: track_id.clone(),
                last_received_seq: s.last_received_seq,
                last_issued_seq: s.last_issued_seq,
                timeout_count: s.timeout_count,
            })
            .collect::<Vec<_>>();
        out.sort_by(|a, b| a.track_id.cmp(&b.track_id));
        out
    }
}
