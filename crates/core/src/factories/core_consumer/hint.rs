use std::time::Duration;

use trackfetch_api::{name::TRACK_HINT_COMPONENT, *};

/// What a hint response means for the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HintVerdict {
    /// A new hint version. The listed tracks should be fetched if they are
    /// not already.
    Accepted(Vec<TrackHint>),

    /// The version we consumed last time, nothing new.
    Duplicate,

    /// No version component, or undecodable content. Nothing to fetch.
    Malformed,
}

/// Polls the hint object of one time partition.
///
/// Every accepted hint moves the exclusion marker forward, so the next
/// hint interest can only be satisfied by a strictly newer version.
#[derive(Debug)]
pub(crate) struct HintTracker {
    hint_name: Name,
    lifetime: Duration,
    marker: Option<NameComponent>,
}

impl HintTracker {
    pub fn new(
        prefix: &Name,
        time_partition: NameComponent,
        lifetime: Duration,
    ) -> Self {
        Self {
            hint_name: prefix
                .clone()
                .append(time_partition)
                .append(TRACK_HINT_COMPONENT),
            lifetime,
            marker: None,
        }
    }

    /// The version component of the last accepted hint.
    pub fn marker(&self) -> Option<&NameComponent> {
        self.marker.as_ref()
    }

    /// The interest for the next hint version.
    pub fn interest(&self) -> Interest {
        let interest = Interest::new(self.hint_name.clone())
            .with_must_be_fresh(true)
            .with_lifetime(self.lifetime)
            .with_child_selector(ChildSelector::Rightmost);
        match &self.marker {
            None => interest,
            Some(marker) => {
                interest.with_exclude(Exclude::up_to(marker.clone()))
            }
        }
    }

    /// Consume a hint response.
    pub fn on_data(&mut self, data: &Data) -> HintVerdict {
        let version = match data.name.get(self.hint_name.len() as isize) {
            Some(version) if self.hint_name.is_prefix_of(&data.name) => {
                version.clone()
            }
            _ => {
                tracing::warn!(name = %data.name, "hint without version");
                return HintVerdict::Malformed;
            }
        };

        if self.marker.as_ref() == Some(&version) {
            tracing::debug!(%version, "hint version already consumed");
            return HintVerdict::Duplicate;
        }

        // Advance even if the content turns out to be broken, there is
        // no point in fetching the same broken version again.
        self.marker = Some(version);

        match Hint::decode(&data.content) {
            Ok(hint) => {
                tracing::debug!(
                    name = %data.name,
                    tracks = hint.tracks.len(),
                    "hint received"
                );
                HintVerdict::Accepted(hint.tracks)
            }
            Err(err) => {
                tracing::warn!(?err, name = %data.name, "undecodable hint");
                HintVerdict::Malformed
            }
        }
    }
}
