//! `ClientSession` – the requester's per-frame loop.
//!
//! ```text
//! frame(now, viewpoint, scene)
//!   → drain responses     (channel → SnapshotCache)
//!   → TargetResolver      (viewpoint → Option<TargetId>)
//!   → QueryDispatcher     (→ outbound channel, fire-and-forget)
//!   → visibility / fade   (bounds cache interest)
//!   → RenderCompositor    (cache → Vec<Overlay>)
//! ```
//!
//! Everything runs on the caller's thread; only the cache is shared with the
//! delivery side.

use crate::cache::{SnapshotCache, UpsertOutcome};
use crate::compositor::{Overlay, RenderCompositor, VisibleTarget};
use crate::config::Settings;
use crate::dispatcher::{DispatchOutcome, QueryDispatcher, QuerySink};
use crate::protocol::{Envelope, Response};
use crate::resolver::{Scene, TargetResolver, Viewpoint};
use crate::types::TargetId;
use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// What happened during one [`ClientSession::frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub target: Option<TargetId>,
    pub dispatch: DispatchOutcome,
    pub responses_applied: usize,
    pub overlays: Vec<Overlay>,
}

pub struct ClientSession<S: QuerySink> {
    settings: Settings,
    resolver: TargetResolver,
    dispatcher: QueryDispatcher<S>,
    cache: Arc<SnapshotCache>,
    compositor: RenderCompositor,
    responses: Receiver<Envelope<Response>>,
    last_seen: HashMap<TargetId, Instant>,
    last_frame: Option<Instant>,
}

impl<S: QuerySink> ClientSession<S> {
    pub fn new(
        requester_id: impl Into<String>,
        settings: &Settings,
        sink: S,
        responses: Receiver<Envelope<Response>>,
    ) -> Self {
        Self {
            settings: settings.clone(),
            resolver: TargetResolver::new(settings.timing.reach),
            dispatcher: QueryDispatcher::new(requester_id, settings.dispatch_config(), sink),
            cache: Arc::new(SnapshotCache::new(settings.snapshot_ttl())),
            compositor: RenderCompositor::new(settings.render_config()),
            responses,
            last_seen: HashMap::new(),
            last_frame: None,
        }
    }

    /// Shared handle for a delivery context that wants to write directly.
    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn dispatcher(&self) -> &QueryDispatcher<S> {
        &self.dispatcher
    }

    pub fn compositor(&self) -> &RenderCompositor {
        &self.compositor
    }

    /// Run one display frame.
    pub fn frame<W: Scene + ?Sized>(
        &mut self,
        now: Instant,
        view: &Viewpoint,
        scene: &W,
    ) -> FrameReport {
        let elapsed = self
            .last_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        self.last_frame = Some(now);

        let responses_applied = self.drain_responses(now);

        let target = if self.settings.overlay_enabled(view.sneaking, view.sprinting) {
            self.resolver.resolve(view, scene)
        } else {
            None
        };

        let dispatch = self.dispatcher.tick(now, target, &self.cache);

        if let Some(id) = target {
            self.last_seen.insert(id, now);
        }
        let fade = self.settings.fade_window();
        self.last_seen
            .retain(|_, seen| now.saturating_duration_since(*seen) <= fade);

        let last_seen = &self.last_seen;
        let dropped = self.cache.retain_observed(|id| last_seen.contains_key(id));
        let expired = self.cache.evict_expired(now);
        if dropped + expired > 0 {
            trace!("Cache sweep: {} unobserved, {} expired", dropped, expired);
        }

        // Oldest first, so the current target is drawn last.
        let mut seen: Vec<(Instant, TargetId)> =
            self.last_seen.iter().map(|(id, at)| (*at, *id)).collect();
        seen.sort_by_key(|(at, _)| *at);
        let visible: Vec<VisibleTarget> = seen
            .into_iter()
            .filter_map(|(_, id)| {
                scene.scene_object(&id).map(|obj| VisibleTarget {
                    id,
                    anchor: obj.bounds.anchor(),
                })
            })
            .collect();

        let overlays = self.compositor.frame(now, elapsed, &visible, &self.cache);

        FrameReport {
            target,
            dispatch,
            responses_applied,
            overlays,
        }
    }

    fn drain_responses(&mut self, now: Instant) -> usize {
        let mut applied = 0;
        loop {
            match self.responses.try_recv() {
                Ok(envelope) => {
                    let seq = envelope.seq;
                    let (target, snapshot) = envelope.payload.into_parts();
                    self.dispatcher.acknowledge(&target, seq);
                    match self.cache.upsert_sequenced(target, seq, snapshot, now) {
                        UpsertOutcome::RejectedStale => {
                            debug!("Ignoring stale response #{} for {}", seq, target)
                        }
                        _ => applied += 1,
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }
}
