//! Sliding request window of a single track.
//!
//! The window always extends `pipeline_size` sequence numbers past the
//! highest accepted one, so a lost request delays but never blocks
//! progress: the next accepted item moves the window regardless of which
//! requests below it are still outstanding.

use std::ops::RangeInclusive;

use super::track_table::{TrackPhase, TrackState};

/// What to do with a track data object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DataVerdict {
    /// At or below the highest accepted sequence, drop it.
    Stale,

    /// The window moved. Request the given sequence numbers, if any.
    Accepted { issue: Option<RangeInclusive<u64>> },
}

/// What to do with a timed out track request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeoutVerdict {
    /// Still needed, express the identical interest again.
    Reissue,

    /// A later item was already accepted, let it go.
    Moot,

    /// Too many consecutive timeouts, stop fetching the track.
    Drop,
}

/// Open the window for a newly discovered track, starting right after
/// `start_seq`. Returns the sequence numbers to request.
///
/// Items at or below `start_seq` count as already received: they can only
/// be leftovers from an earlier fetch of a track with the same id.
///
/// Callers must check `start_seq + pipeline_size` fits in a `u64`, the
/// window is clamped at `u64::MAX` otherwise.
pub(crate) fn initial_fetch(
    state: &mut TrackState,
    start_seq: u64,
    pipeline_size: u64,
) -> RangeInclusive<u64> {
    state.phase = TrackPhase::Fetching;
    state.last_received_seq = start_seq;
    state.last_issued_seq = start_seq.saturating_add(pipeline_size);
    state.timeout_count = 0;
    start_seq.saturating_add(1)..=state.last_issued_seq
}

/// Account for a received item with sequence number `seq`.
pub(crate) fn on_data(
    state: &mut TrackState,
    seq: u64,
    pipeline_size: u64,
) -> DataVerdict {
    if state.phase != TrackPhase::Fetching || seq <= state.last_received_seq {
        return DataVerdict::Stale;
    }

    if seq > state.last_issued_seq {
        // never requested
        return DataVerdict::Stale;
    }

    state.last_received_seq = seq;
    state.timeout_count = 0;

    // pipeline_size + seq - last_issued_seq, never negative while the
    // window invariant holds
    let advance = pipeline_size
        .saturating_add(seq)
        .saturating_sub(state.last_issued_seq);
    if advance == 0 {
        return DataVerdict::Accepted { issue: None };
    }

    // advance > 0 means last_issued_seq < u64::MAX
    let start = state.last_issued_seq + 1;
    state.last_issued_seq += advance;
    DataVerdict::Accepted {
        issue: Some(start..=state.last_issued_seq),
    }
}

/// Account for a timed out request for sequence number `seq`.
///
/// A `timeout_threshold` of zero disables dropping tracks.
pub(crate) fn on_timeout(
    state: &mut TrackState,
    seq: u64,
    timeout_threshold: u32,
) -> TimeoutVerdict {
    if state.phase != TrackPhase::Fetching || seq <= state.last_received_seq {
        return TimeoutVerdict::Moot;
    }

    state.timeout_count = state.timeout_count.saturating_add(1);
    if timeout_threshold > 0 && state.timeout_count >= timeout_threshold {
        return TimeoutVerdict::Drop;
    }

    TimeoutVerdict::Reissue
}
