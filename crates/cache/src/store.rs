//! Cache state machine.
//!
//! Entries move `Uninitialized -> Pending -> Fulfilled | Rejected`; an
//! invalidated `Fulfilled` entry goes back to `Pending` while keeping its
//! data. All mutation goes through the transition methods below, and every
//! transition republishes the entry's snapshot on its watch channel.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::watch;

use shelf_http::ApiResult;
use shelf_kernel::{RequestSpec, Tag};

use crate::key::QueryKey;
use crate::snapshot::{QuerySnapshot, QueryStatus};
use crate::tags::TagIndex;

/// A request the store wants performed; hand the result back to [`CacheStore::resolve`].
#[derive(Debug, Clone)]
pub struct Fetch {
    pub key: QueryKey,
    pub request_id: u64,
    pub request: RequestSpec,
}

/// Result of issuing a query.
pub struct Issued {
    pub receiver: watch::Receiver<QuerySnapshot>,
    /// `None` when the entry was served from cache or joined an in-flight request.
    pub fetch: Option<Fetch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueMode {
    /// Serve fulfilled data; only fetch when there is none.
    CacheFirst,
    /// Fetch even when fulfilled data exists.
    Refetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    Evicted,
    /// Entry gained a subscriber or was already removed.
    Retained,
    /// Entry has a request in flight; try again later.
    InFlight,
}

struct CacheEntry {
    request: RequestSpec,
    provides: Vec<Tag>,
    snapshot: QuerySnapshot,
    in_flight: Option<u64>,
    last_applied: u64,
    subscribers: usize,
    idle_generation: u64,
    sender: watch::Sender<QuerySnapshot>,
}

impl CacheEntry {
    fn new(request: RequestSpec, provides: &[Tag]) -> Self {
        let snapshot = QuerySnapshot::uninitialized();
        let (sender, _) = watch::channel(snapshot.clone());
        Self {
            request,
            provides: provides.to_vec(),
            snapshot,
            in_flight: None,
            last_applied: 0,
            subscribers: 0,
            idle_generation: 0,
            sender,
        }
    }

    fn publish(&self) {
        self.sender.send_replace(self.snapshot.clone());
    }
}

#[derive(Default)]
pub struct CacheStore {
    entries: HashMap<QueryKey, CacheEntry>,
    tags: TagIndex,
    last_request_id: u64,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a query: start a request, join the one in flight, or serve cache.
    pub fn issue(
        &mut self,
        key: &QueryKey,
        request: &RequestSpec,
        provides: &[Tag],
        mode: IssueMode,
    ) -> Issued {
        let entry = match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                self.tags.provide(key, provides);
                vacant.insert(CacheEntry::new(request.clone(), provides))
            }
        };

        let should_start = match entry.snapshot.status {
            QueryStatus::Pending => false,
            QueryStatus::Uninitialized | QueryStatus::Rejected => true,
            QueryStatus::Fulfilled => mode == IssueMode::Refetch || entry.snapshot.stale,
        };

        let fetch = should_start.then(|| start(entry, &mut self.last_request_id, key));
        if fetch.is_none() {
            tracing::trace!(query = %key, status = ?entry.snapshot.status, "query served without a new request");
        }

        Issued {
            receiver: entry.sender.subscribe(),
            fetch,
        }
    }

    /// Apply a response. Returns false when the response was discarded.
    pub fn resolve(&mut self, key: &QueryKey, request_id: u64, result: ApiResult<Value>) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            tracing::debug!(query = %key, request_id, "response for evicted entry dropped");
            return false;
        };

        if request_id < entry.last_applied {
            tracing::debug!(
                query = %key,
                request_id,
                last_applied = entry.last_applied,
                "out-of-order response discarded"
            );
            return false;
        }

        let newest = entry.in_flight == Some(request_id);
        match result {
            Ok(value) => {
                entry.last_applied = request_id;
                entry.snapshot.data = Some(Arc::new(value));
                entry.snapshot.fulfilled_at = Some(OffsetDateTime::now_utc());
                if newest {
                    entry.in_flight = None;
                    entry.snapshot.status = QueryStatus::Fulfilled;
                    entry.snapshot.error = None;
                    entry.snapshot.stale = false;
                }
            }
            Err(error) if newest => {
                entry.last_applied = request_id;
                entry.in_flight = None;
                entry.snapshot.status = QueryStatus::Rejected;
                entry.snapshot.error = Some(error);
            }
            Err(error) => {
                // A newer request is still running; its answer decides the state.
                tracing::debug!(query = %key, request_id, error = %error, "superseded request failed");
                return false;
            }
        }

        entry.publish();
        true
    }

    /// Move every fulfilled or pending entry providing one of `tags` to a new request.
    pub fn invalidate(&mut self, tags: &[Tag]) -> Vec<Fetch> {
        let mut fetches = Vec::new();

        for key in self.tags.invalidated_by(tags) {
            let Some(entry) = self.entries.get_mut(&key) else {
                continue;
            };

            match entry.snapshot.status {
                QueryStatus::Fulfilled | QueryStatus::Pending => {
                    entry.snapshot.stale = true;
                    fetches.push(start(entry, &mut self.last_request_id, &key));
                }
                QueryStatus::Uninitialized | QueryStatus::Rejected => {}
            }
        }

        fetches
    }

    pub fn add_subscriber(&mut self, key: &QueryKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.subscribers += 1;
                true
            }
            None => false,
        }
    }

    /// Returns the idle generation to evict at when the last subscriber leaves.
    pub fn remove_subscriber(&mut self, key: &QueryKey) -> Option<u64> {
        let entry = self.entries.get_mut(key)?;
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return None;
        }
        entry.idle_generation += 1;
        Some(entry.idle_generation)
    }

    pub fn evict_if_idle(&mut self, key: &QueryKey, generation: u64) -> Eviction {
        let Some(entry) = self.entries.get(key) else {
            return Eviction::Retained;
        };

        if entry.subscribers > 0 || entry.idle_generation != generation {
            return Eviction::Retained;
        }
        if entry.in_flight.is_some() {
            return Eviction::InFlight;
        }

        if let Some(entry) = self.entries.remove(key) {
            self.tags.forget(key, &entry.provides);
        }
        Eviction::Evicted
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.entries.get(key).map(|entry| entry.snapshot.clone())
    }

    pub fn subscribers(&self, key: &QueryKey) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.subscribers)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; waiters on dropped entries observe a closed channel.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.tags.clear();
    }
}

fn start(entry: &mut CacheEntry, last_request_id: &mut u64, key: &QueryKey) -> Fetch {
    *last_request_id += 1;
    let request_id = *last_request_id;

    entry.in_flight = Some(request_id);
    entry.snapshot.status = QueryStatus::Pending;
    entry.publish();

    tracing::debug!(query = %key, request_id, "request started");

    Fetch {
        key: key.clone(),
        request_id,
        request: entry.request.clone(),
    }
}
