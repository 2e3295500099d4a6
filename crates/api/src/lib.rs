#![deny(missing_docs)]
//! Trackfetch API contains the name, packet and transport types, and the
//! consumer module traits with the basic types required to define them.
//!
//! If you want a working agent, please see the trackfetch_core crate.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub mod config;
pub use config::{Config, ModConfig};

mod error;
pub use error::*;

pub mod name;
pub use name::{Exclude, ExcludeEntry, Name, NameComponent};

pub mod packet;
pub use packet::{ChildSelector, Data, Interest};

pub mod transport;
pub use transport::{DynTransport, Outcome, Transport};

pub mod hint;
pub use hint::{Hint, TrackHint, TrackId};

pub mod consumer;
pub use consumer::*;
