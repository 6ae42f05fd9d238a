//! `SnapshotCache` – the requester's store of the latest snapshot per target.
//!
//! Written from the message-delivery context, read by the compositor every
//! frame; the entry table sits behind a `parking_lot::RwLock`. Snapshots
//! are shared as `Arc<ContainerSnapshot>` so readers never hold the lock
//! while drawing.
//!
//! At most one entry exists per target: an insert replaces, never merges.

use crate::snapshot::ContainerSnapshot;
use crate::types::TargetId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    target: TargetId,
    pub snapshot: Arc<ContainerSnapshot>,
    pub received_at: Instant,
    pub ttl: Duration,
    /// Request sequence the snapshot answered; 0 when inserted unsequenced.
    pub seq: u64,
}

impl CacheEntry {
    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.received_at) >= self.ttl
    }

    /// Life left at `now` (zero once expired).
    pub fn remaining(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.received_at))
    }
}

/// Outcome of [`SnapshotCache::upsert_sequenced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// A response to a newer request is already cached.
    RejectedStale,
}

#[derive(Debug)]
pub struct SnapshotCache {
    ttl: Duration,
    entries: RwLock<HashMap<TargetId, CacheEntry>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store `snapshot` for `target`, replacing any prior entry.
    pub fn upsert(&self, target: TargetId, snapshot: ContainerSnapshot) {
        self.upsert_at(target, snapshot, Instant::now());
    }

    pub fn upsert_at(&self, target: TargetId, snapshot: ContainerSnapshot, now: Instant) {
        self.entries
            .write()
            .insert(target, self.entry(target, snapshot, now, 0));
    }

    /// Like [`upsert_at`](Self::upsert_at) but keeps an entry that answered a
    /// later request, so a response delayed in transit cannot overwrite a
    /// newer one.
    pub fn upsert_sequenced(
        &self,
        target: TargetId,
        seq: u64,
        snapshot: ContainerSnapshot,
        now: Instant,
    ) -> UpsertOutcome {
        let mut entries = self.entries.write();
        let outcome = match entries.get(&target) {
            Some(existing) if existing.seq > seq && !existing.is_expired(now) => {
                return UpsertOutcome::RejectedStale;
            }
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Inserted,
        };
        entries.insert(target, self.entry(target, snapshot, now, seq));
        outcome
    }

    fn entry(
        &self,
        target: TargetId,
        snapshot: ContainerSnapshot,
        now: Instant,
        seq: u64,
    ) -> CacheEntry {
        CacheEntry {
            target,
            snapshot: Arc::new(snapshot),
            received_at: now,
            ttl: self.ttl,
            seq,
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, target: &TargetId) -> Option<Arc<ContainerSnapshot>> {
        self.get_at(target, Instant::now())
    }

    /// Live snapshot for `target`; an expired entry is removed and `None`
    /// returned.
    pub fn get_at(&self, target: &TargetId, now: Instant) -> Option<Arc<ContainerSnapshot>> {
        {
            let entries = self.entries.read();
            match entries.get(target) {
                None => return None,
                Some(e) if !e.is_expired(now) => return Some(e.snapshot.clone()),
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write();
        if entries.get(target).is_some_and(|e| e.is_expired(now)) {
            entries.remove(target);
        }
        None
    }

    /// Read without evicting; expired entries read as `None`.
    pub fn peek_at(&self, target: &TargetId, now: Instant) -> Option<Arc<ContainerSnapshot>> {
        self.entries
            .read()
            .get(target)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.snapshot.clone())
    }

    /// Full entry (metadata included) if still live.
    pub fn entry_at(&self, target: &TargetId, now: Instant) -> Option<CacheEntry> {
        self.entries
            .read()
            .get(target)
            .filter(|e| !e.is_expired(now))
            .cloned()
    }

    /// Live and with more than `margin` of life left.
    pub fn is_fresh(&self, target: &TargetId, now: Instant, margin: Duration) -> bool {
        self.entries
            .read()
            .get(target)
            .is_some_and(|e| e.remaining(now) > margin)
    }

    // ------------------------------------------------------------------
    // Eviction
    // ------------------------------------------------------------------

    /// Drop every expired entry. Returns how many were removed.
    pub fn evict_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// Drop entries for targets nobody is looking at any more.
    pub fn retain_observed<F>(&self, mut observed: F) -> usize
    where
        F: FnMut(&TargetId) -> bool,
    {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|id, _| observed(id));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
