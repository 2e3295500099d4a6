//! A display handler that keeps what it is shown.

use std::sync::Mutex;
use trackfetch_api::*;

/// Records every [TrackRecord] handed to it, in order.
#[derive(Debug, Default)]
pub struct RecordingDisplay(Mutex<Vec<TrackRecord>>);

impl RecordingDisplay {
    /// A copy of the records displayed so far.
    pub fn records(&self) -> Vec<TrackRecord> {
        self.0.lock().unwrap().clone()
    }

    /// The records of one track, in display order.
    pub fn records_of(&self, track_id: &TrackId) -> Vec<TrackRecord> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.track_id == track_id)
            .cloned()
            .collect()
    }
}

impl DisplayHandler for RecordingDisplay {
    fn display(&self, record: TrackRecord) {
        self.0.lock().unwrap().push(record);
    }
}
