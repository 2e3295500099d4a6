//! The in-process stub transport provided by trackfetch.
//!
//! This is NOT a production module. It is for testing and demos only.
//! Producers publish [Data] straight into a shared content store and
//! consumers express interests against it.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};
use tokio::{sync::oneshot, time::Instant};
use trackfetch_api::*;

/// Decides whether an expressed interest is lost on its way.
pub type LossFn = Arc<dyn Fn(&Interest) -> bool + 'static + Send + Sync>;

#[derive(Debug)]
struct Stored {
    data: Data,
    fresh_until: Option<Instant>,
}

impl Stored {
    fn is_fresh(&self, now: Instant) -> bool {
        self.fresh_until.map(|t| now < t).unwrap_or(true)
    }
}

#[derive(Debug)]
struct Pending {
    interest: Interest,
    respond: oneshot::Sender<Data>,
}

#[derive(Debug, Default)]
struct Inner {
    store: BTreeMap<Name, Stored>,
    pending: Vec<Pending>,
    expressed: u64,
}

impl Inner {
    /// Find the stored object best matching the interest.
    fn lookup(&self, interest: &Interest, now: Instant) -> Option<Data> {
        let mut candidates = self
            .store
            .range(interest.name.clone()..)
            .take_while(|(name, _)| interest.name.is_prefix_of(name))
            .filter(|(name, stored)| {
                interest.matches_name(name)
                    && (!interest.must_be_fresh || stored.is_fresh(now))
            })
            .map(|(_, stored)| &stored.data);

        match interest.child_selector {
            ChildSelector::Leftmost => candidates.next().cloned(),
            ChildSelector::Rightmost => candidates.last().cloned(),
        }
    }
}

/// An in-process content store that doubles as a [Transport].
pub struct MemTransport {
    inner: Mutex<Inner>,
    loss: Mutex<Option<LossFn>>,
}

impl std::fmt::Debug for MemTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("MemTransport")
            .field("stored", &inner.store.len())
            .field("pending", &inner.pending.len())
            .finish()
    }
}

impl MemTransport {
    /// Construct a new, empty MemTransport.
    pub fn create() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            loss: Mutex::new(None),
        })
    }

    /// Publish a data object.
    ///
    /// Pending interests the object satisfies are answered right away, and
    /// the object replaces any earlier one of the same name in the store.
    pub fn publish(&self, data: Data) {
        let mut inner = self.inner.lock().unwrap();

        let mut answered = 0;
        for pending in std::mem::take(&mut inner.pending) {
            if pending.respond.is_closed() {
                // timed out
                continue;
            }
            if !pending.interest.matches_name(&data.name) {
                inner.pending.push(pending);
                continue;
            }
            if pending.respond.send(data.clone()).is_ok() {
                answered += 1;
            }
        }

        tracing::trace!(name = %data.name, answered, "published");

        let fresh_until = data.freshness_period.map(|p| Instant::now() + p);
        inner
            .store
            .insert(data.name.clone(), Stored { data, fresh_until });
    }

    /// Drop every stored object under the given prefix.
    pub fn remove_prefix(&self, prefix: &Name) {
        self.inner
            .lock()
            .unwrap()
            .store
            .retain(|name, _| !prefix.is_prefix_of(name));
    }

    /// Install a predicate deciding which interests get lost. A lost
    /// interest simply times out.
    pub fn set_loss<F>(&self, f: F)
    where
        F: Fn(&Interest) -> bool + 'static + Send + Sync,
    {
        *self.loss.lock().unwrap() = Some(Arc::new(f));
    }

    /// Remove the loss predicate.
    pub fn clear_loss(&self) {
        *self.loss.lock().unwrap() = None;
    }

    /// How many interests have been expressed so far.
    pub fn expressed_count(&self) -> u64 {
        self.inner.lock().unwrap().expressed
    }

    /// How many objects are in the store.
    pub fn stored_count(&self) -> usize {
        self.inner.lock().unwrap().store.len()
    }
}

impl Transport for MemTransport {
    fn express(&self, interest: Interest) -> BoxFut<'static, Outcome> {
        let lifetime = interest.lifetime;

        let lost = self
            .loss
            .lock()
            .unwrap()
            .as_ref()
            .map(|f| f(&interest))
            .unwrap_or(false);

        let mut inner = self.inner.lock().unwrap();
        inner.expressed += 1;

        if lost {
            tracing::trace!(name = %interest.name, "interest lost");
            return Box::pin(async move {
                tokio::time::sleep(lifetime).await;
                Outcome::Timeout
            });
        }

        if let Some(data) = inner.lookup(&interest, Instant::now()) {
            return Box::pin(futures::future::ready(Outcome::Data(data)));
        }

        let (respond, recv) = oneshot::channel();
        inner.pending.push(Pending { interest, respond });

        Box::pin(async move {
            match tokio::time::timeout(lifetime, recv).await {
                Ok(Ok(data)) => Outcome::Data(data),
                _ => Outcome::Timeout,
            }
        })
    }
}
