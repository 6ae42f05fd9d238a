//! Query dispatch: turn the resolved target into at most one outbound query
//! per frame.
//!
//! A query is sent only when
//! 1. the target changed, or its cached snapshot is missing / about to expire;
//! 2. no query for that target is still awaiting an answer;
//! 3. the debounce window since the last query (to any target) has passed.
//!
//! Sending is fire-and-forget through a [`QuerySink`]; nothing here waits
//! on the network.

use crate::cache::SnapshotCache;
use crate::config::DispatchConfig;
use crate::protocol::{Envelope, Query};
use crate::types::TargetId;
use crossbeam_channel::Sender;
use log::{debug, trace};
use std::collections::HashMap;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Non-blocking outbound channel towards the authority.
pub trait QuerySink {
    /// Hand off one query. Returns `false` if it was dropped.
    fn send(&self, query: Envelope<Query>) -> bool;
}

impl QuerySink for Sender<Envelope<Query>> {
    fn send(&self, query: Envelope<Query>) -> bool {
        self.try_send(query).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    NoTarget,
    /// Same target as last time and its snapshot is still fresh.
    Cached,
    /// A query for this target is still unanswered.
    InFlight,
    /// Too soon after the previous query.
    Debounced,
    /// The sink refused the query (channel full or closed).
    Dropped,
    Sent { seq: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    seq: u64,
    sent_at: Instant,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct QueryDispatcher<S: QuerySink> {
    config: DispatchConfig,
    requester_id: String,
    sink: S,
    last_target: Option<TargetId>,
    last_sent_at: Option<Instant>,
    next_seq: u64,
    in_flight: HashMap<TargetId, Pending>,
}

impl<S: QuerySink> QueryDispatcher<S> {
    pub fn new(requester_id: impl Into<String>, config: DispatchConfig, sink: S) -> Self {
        Self {
            config,
            requester_id: requester_id.into(),
            sink,
            last_target: None,
            last_sent_at: None,
            next_seq: 1,
            in_flight: HashMap::new(),
        }
    }

    pub fn requester_id(&self) -> &str {
        &self.requester_id
    }

    pub fn last_target(&self) -> Option<TargetId> {
        self.last_target
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Run once per frame with the freshly resolved target.
    pub fn tick(
        &mut self,
        now: Instant,
        target: Option<TargetId>,
        cache: &SnapshotCache,
    ) -> DispatchOutcome {
        let timeout = self.config.request_timeout;
        self.in_flight
            .retain(|_, p| now.saturating_duration_since(p.sent_at) < timeout);

        let Some(target) = target else {
            return DispatchOutcome::NoTarget;
        };

        if self.last_target == Some(target)
            && cache.is_fresh(&target, now, self.config.refresh_margin)
        {
            return DispatchOutcome::Cached;
        }

        if self.in_flight.contains_key(&target) {
            return DispatchOutcome::InFlight;
        }

        if let Some(last) = self.last_sent_at {
            if now.saturating_duration_since(last) < self.config.debounce {
                trace!("Debounced query for {}", target);
                return DispatchOutcome::Debounced;
            }
        }

        let seq = self.next_seq;
        let envelope = Envelope::new(self.requester_id.clone(), seq, Query::for_target(&target));
        if !self.sink.send(envelope) {
            debug!("Query sink refused query for {}", target);
            return DispatchOutcome::Dropped;
        }

        self.next_seq += 1;
        self.last_sent_at = Some(now);
        self.last_target = Some(target);
        self.in_flight.insert(target, Pending { seq, sent_at: now });
        debug!("Sent query #{} for {}", seq, target);
        DispatchOutcome::Sent { seq }
    }

    /// A response for `target` answering query `seq` arrived.
    ///
    /// Clears the in-flight marker if it belongs to that query or an older one.
    pub fn acknowledge(&mut self, target: &TargetId, seq: u64) {
        if self.in_flight.get(target).is_some_and(|p| p.seq <= seq) {
            self.in_flight.remove(target);
        }
    }
}
