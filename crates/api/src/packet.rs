//! Interest and data packet types.

use crate::*;
use std::time::Duration;

/// The lifetime of an interest that does not set one explicitly.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

/// Which of several matching data objects a forwarder should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildSelector {
    /// Prefer the canonically smallest matching name.
    #[default]
    Leftmost,

    /// Prefer the canonically largest matching name, i.e. the most recent
    /// one for producers that publish increasing versions.
    Rightmost,
}

/// A named request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    /// The name (or name prefix) being requested.
    pub name: Name,

    /// Only data still inside its freshness period may satisfy this.
    pub must_be_fresh: bool,

    /// How long the transport waits before reporting a timeout.
    pub lifetime: Duration,

    /// Selection preference among multiple matches.
    pub child_selector: ChildSelector,

    /// Components that must not follow `name` in a matching data name.
    pub exclude: Option<Exclude>,
}

impl Interest {
    /// Construct an interest with default selectors.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            must_be_fresh: false,
            lifetime: DEFAULT_INTEREST_LIFETIME,
            child_selector: ChildSelector::default(),
            exclude: None,
        }
    }

    /// Set the must be fresh flag, builder style.
    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    /// Set the lifetime, builder style.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the child selector, builder style.
    pub fn with_child_selector(mut self, child_selector: ChildSelector) -> Self {
        self.child_selector = child_selector;
        self
    }

    /// Set the exclusion filter, builder style.
    pub fn with_exclude(mut self, exclude: Exclude) -> Self {
        self.exclude = Some(exclude);
        self
    }

    /// Returns true if a data object of the given name is acceptable
    /// to this interest, ignoring freshness.
    pub fn matches_name(&self, data_name: &Name) -> bool {
        if !self.name.is_prefix_of(data_name) {
            return false;
        }
        match (&self.exclude, data_name.get(self.name.len() as isize)) {
            (Some(exclude), Some(next)) => !exclude.matches(next),
            _ => true,
        }
    }
}

/// A named data object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    /// The full name of this object.
    pub name: Name,

    /// The opaque content.
    pub content: bytes::Bytes,

    /// How long after publication this object counts as fresh.
    /// `None` means it never goes stale.
    pub freshness_period: Option<Duration>,
}

impl Data {
    /// Construct a data object that never goes stale.
    pub fn new(name: Name, content: impl Into<bytes::Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            freshness_period: None,
        }
    }

    /// Set the freshness period, builder style.
    pub fn with_freshness_period(mut self, period: Duration) -> Self {
        self.freshness_period = Some(period);
        self
    }
}
