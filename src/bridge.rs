//! Requester bridge – Tokio thread connecting to NATS on behalf of the
//! frame loop.
//!
//! ## Threading model
//!
//! ```text
//! Frame thread                   │  Bridge thread (Tokio)
//! ────────────────────────────── │ ─────────────────────────────────────
//! ClientSession::frame           │ publish_queries() task
//!   → dispatcher → queries.send  │   queries.try_recv() → publish_with_reply
//!                                │ run_bridge()
//!   → responses.try_recv()       │   subscribe private reply inbox
//!   → cache.upsert_sequenced     │   → responses.send(Envelope)
//! ```
//!
//! The bridge thread owns the NATS connection and the runtime. The frame
//! thread never touches async code. It only uses `crossbeam_channel`
//! endpoints, and never blocks on them.
//!
//! Replies arrive on an inbox under [`subjects::inbox_prefix`] for this
//! requester; no other client is allowed to subscribe there.

use crate::protocol::{self, subjects, Envelope, Query, Response};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures::StreamExt;
use std::io;
use std::thread;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// NATS endpoint (e.g. "nats://localhost:4222")
    pub endpoint: String,
    /// Identity this requester queries under.
    pub requester_id: String,
    /// How many decoded responses to buffer before dropping.
    pub response_buffer: usize,
    /// How many outbound queries to buffer before the dispatcher sees `Dropped`.
    pub query_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: "nats://localhost:4222".into(),
            requester_id: "requester".into(),
            response_buffer: 256,
            query_buffer: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle (given to the frame thread)
// ---------------------------------------------------------------------------

pub struct BridgeHandle {
    /// Decoded responses addressed to this requester.
    pub responses: Receiver<Envelope<Response>>,
    /// Outbound queries; pass a clone to the dispatcher as its sink.
    pub queries: Sender<Envelope<Query>>,
    _thread: thread::JoinHandle<()>,
}

impl BridgeHandle {
    /// Channel endpoints for a [`ClientSession`](crate::session::ClientSession).
    pub fn channels(&self) -> (Sender<Envelope<Query>>, Receiver<Envelope<Response>>) {
        (self.queries.clone(), self.responses.clone())
    }
}

// ---------------------------------------------------------------------------
// Spawning the bridge thread
// ---------------------------------------------------------------------------

pub fn spawn(config: BridgeConfig) -> io::Result<BridgeHandle> {
    let (response_tx, response_rx) =
        crossbeam_channel::bounded::<Envelope<Response>>(config.response_buffer);
    let (query_tx, query_rx) = crossbeam_channel::bounded::<Envelope<Query>>(config.query_buffer);

    let handle = thread::Builder::new()
        .name("holo-bridge".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("[bridge] Failed to create Tokio runtime: {}", e);
                    return;
                }
            };
            rt.block_on(run_bridge(config, response_tx, query_rx));
        })?;

    Ok(BridgeHandle {
        responses: response_rx,
        queries: query_tx,
        _thread: handle,
    })
}

// ---------------------------------------------------------------------------
// Async bridge implementation
// ---------------------------------------------------------------------------

async fn run_bridge(
    config: BridgeConfig,
    response_tx: Sender<Envelope<Response>>,
    query_rx: Receiver<Envelope<Query>>,
) {
    log::info!(
        "[bridge] Connecting to {} as {}",
        config.endpoint,
        config.requester_id
    );

    if !subjects::is_valid_token(&config.requester_id) {
        log::error!(
            "[bridge] Requester id '{}' cannot be used in a subject",
            config.requester_id
        );
        return;
    }

    let nc = match async_nats::ConnectOptions::new()
        .custom_inbox_prefix(subjects::inbox_prefix(&config.requester_id))
        .connect(config.endpoint.as_str())
        .await
    {
        Ok(c) => c,
        Err(e) => {
            log::error!("[bridge] NATS connect failed: {}", e);
            return;
        }
    };

    let inbox = nc.new_inbox();
    let mut replies = match nc.subscribe(inbox.clone()).await {
        Ok(s) => s,
        Err(e) => {
            log::error!("[bridge] Subscribe failed: {}", e);
            return;
        }
    };

    log::info!("[bridge] Awaiting replies on {}", inbox);

    // Own task, so a reply arriving never interrupts a publish in progress.
    let mut publisher = tokio::spawn(publish_queries(nc.clone(), query_rx, inbox));

    loop {
        tokio::select! {
            msg = replies.next() => {
                let Some(msg) = msg else { break };
                if let Some(envelope) = parse_response(&config.requester_id, &msg.payload) {
                    if response_tx.try_send(envelope).is_err() {
                        log::warn!("[bridge] Response channel full – dropping snapshot");
                    }
                }
            }

            _ = &mut publisher => {
                log::info!("[bridge] Query channel closed");
                break;
            }
        }
    }

    publisher.abort();
    log::info!("[bridge] Disconnected, exiting run loop");
}

/// Publish queued queries until the frame side drops its sender.
async fn publish_queries(nc: async_nats::Client, rx: Receiver<Envelope<Query>>, inbox: String) {
    loop {
        // Yield briefly between batches
        tokio::time::sleep(tokio::time::Duration::from_millis(8)).await;

        loop {
            let query = match rx.try_recv() {
                Ok(q) => q,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            };
            let subject = query.payload.subject(&query.requester);
            match protocol::encode(&query) {
                Ok(bytes) => {
                    if let Err(e) = nc
                        .publish_with_reply(subject.clone(), inbox.clone(), bytes.into())
                        .await
                    {
                        log::warn!("[bridge] Failed to publish to {}: {}", subject, e);
                    }
                }
                Err(e) => log::warn!("[bridge] Failed to encode query: {}", e),
            }
        }
    }
}

/// Decode a response and make sure it is addressed to us.
pub fn parse_response(requester_id: &str, payload: &[u8]) -> Option<Envelope<Response>> {
    match protocol::decode::<Envelope<Response>>(payload) {
        Ok(envelope) if envelope.requester == requester_id => Some(envelope),
        Ok(envelope) => {
            log::debug!(
                "[bridge] Ignoring response addressed to {}",
                envelope.requester
            );
            None
        }
        Err(e) => {
            log::warn!("[bridge] Discarding malformed response: {}", e);
            None
        }
    }
}
