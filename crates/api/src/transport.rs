//! Trackfetch transport related types.
//!
//! The transport is the named request / response layer the agent sits on.
//! It is responsible for forwarding an [Interest], for matching it against
//! published [Data], and for enforcing the interest lifetime.

use crate::*;
use std::sync::Arc;

/// The single outcome of one expressed [Interest].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A data object satisfying the interest arrived.
    Data(Data),

    /// The interest lifetime elapsed without a matching data object.
    Timeout,
}

impl Outcome {
    /// Returns true if this outcome is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Outcome::Timeout)
    }
}

/// A named request / response transport.
#[cfg_attr(feature = "mockall", mockall::automock)]
pub trait Transport: 'static + Send + Sync + std::fmt::Debug {
    /// Express an interest.
    ///
    /// Calling this must not block: the interest is handed off to the
    /// transport immediately and the returned future resolves exactly once,
    /// with either a matching data object or a timeout once the interest
    /// lifetime has elapsed. There is no cancellation. Dropping the future
    /// only discards the outcome.
    fn express(&self, interest: Interest) -> BoxFut<'static, Outcome>;
}

/// Trait-object [Transport].
pub type DynTransport = Arc<dyn Transport>;
