use std::time::Duration;

use trackfetch_api::*;

/// Discovers the time partition component the producer currently
/// publishes under.
///
/// The producer's names look like `<prefix>/<time_partition>/tracks/..`
/// or `<prefix>/<time_partition>/track_hint/..`, so asking for the
/// rightmost child of the bare prefix yields an object of the newest
/// session.
#[derive(Debug)]
pub(crate) struct BootstrapResolver {
    prefix: Name,
    lifetime: Duration,
    reexpress_interval: Duration,
}

impl BootstrapResolver {
    pub fn new(
        prefix: Name,
        lifetime: Duration,
        reexpress_interval: Duration,
    ) -> Self {
        Self {
            prefix,
            lifetime,
            reexpress_interval,
        }
    }

    /// The bootstrap interest.
    pub fn interest(&self) -> Interest {
        Interest::new(self.prefix.clone())
            .with_must_be_fresh(true)
            .with_lifetime(self.lifetime)
            .with_child_selector(ChildSelector::Rightmost)
    }

    /// Extract the time partition from a bootstrap response.
    ///
    /// Returns `None` if the name is too short to hold a time partition
    /// and the component that follows it. The resolver then stays pending
    /// until the outstanding interest times out.
    pub fn on_data(&self, data: &Data) -> Option<NameComponent> {
        if data.name.len() < self.prefix.len() + 2
            || !self.prefix.is_prefix_of(&data.name)
        {
            tracing::warn!(
                name = %data.name,
                "bootstrap interest fetched unexpected data"
            );
            return None;
        }

        let time_partition = data.name.get(self.prefix.len() as isize)?;
        tracing::info!(
            name = %data.name,
            %time_partition,
            "bootstrap data received"
        );
        Some(time_partition.clone())
    }

    /// Handle a bootstrap timeout. Returns how long to wait before
    /// expressing a fresh bootstrap interest.
    pub fn on_timeout(&self) -> Duration {
        tracing::debug!(
            prefix = %self.prefix,
            "bootstrap interest timed out"
        );
        self.reexpress_interval
    }
}
