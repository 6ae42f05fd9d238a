//! Bus integration – `QueryBusAgent` answers container queries over NATS.
//!
//! ## Event contract (inbound)
//!
//! | Subject                            | Payload            | Effect                         |
//! |------------------------------------|--------------------|--------------------------------|
//! | `holo.query.<requester>.actor`     | `Envelope<Query>`  | `RequestHandler::handle_bytes` |
//! | `holo.query.<requester>.structure` | `Envelope<Query>`  | `RequestHandler::handle_bytes` |
//!
//! ## Event contract (outbound)
//!
//! The reply goes to the inbound message's reply inbox and nowhere else. A
//! query published without a reply inbox is dropped.
//!
//! Each inbound message is handled on its own Tokio task, so queries from
//! different requesters never wait on one another. Denied, vanished and
//! malformed queries produce no outbound message at all.

use crate::handler::RequestHandler;
use crate::protocol::subjects;
use crate::world::WorldView;
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::StreamExt;
use log::{debug, info, warn};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct QueryBusConfig {
    /// NATS endpoint.
    pub endpoint: String,
    /// Name reported in logs.
    pub agent_id: String,
}

impl Default for QueryBusConfig {
    fn default() -> Self {
        Self {
            endpoint: "nats://localhost:4222".into(),
            agent_id: "holo-authority".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// QueryBusAgent
// ---------------------------------------------------------------------------

/// Wraps a [`RequestHandler`] and drives it from bus messages.
///
/// Call [`QueryBusAgent::run`] inside a Tokio runtime to start the agent.
pub struct QueryBusAgent<W: WorldView + 'static> {
    config: QueryBusConfig,
    handler: RequestHandler<W>,
}

impl<W: WorldView + 'static> Clone for QueryBusAgent<W> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<W: WorldView + 'static> QueryBusAgent<W> {
    pub fn new(config: QueryBusConfig, handler: RequestHandler<W>) -> Self {
        Self { config, handler }
    }

    /// Turn one inbound message into the `(reply inbox, bytes)` to publish.
    pub fn answer(
        &self,
        subject: &str,
        reply: Option<&str>,
        payload: &[u8],
    ) -> Option<(String, Bytes)> {
        let Some(reply) = reply else {
            debug!("Dropping query on {} without a reply inbox", subject);
            return None;
        };
        self.handler
            .handle_bytes(subject, payload)
            .map(|bytes| (reply.to_string(), Bytes::from(bytes)))
    }

    /// Connect, subscribe to every query subject and serve until SIGINT.
    pub async fn run(self) -> Result<()> {
        info!(
            "QueryBusAgent '{}' connecting to {}",
            self.config.agent_id, self.config.endpoint
        );

        let client = async_nats::connect(&self.config.endpoint)
            .await
            .context("Failed to connect query agent to NATS")?;

        let mut queries = client
            .subscribe(subjects::QUERY_ALL)
            .await
            .context("Failed to subscribe to query subjects")?;

        info!("QueryBusAgent active – listening on {}", subjects::QUERY_ALL);

        loop {
            tokio::select! {
                msg = queries.next() => {
                    let Some(msg) = msg else {
                        log::error!("Query subscription closed unexpectedly");
                        break;
                    };
                    let agent = self.clone();
                    let client = client.clone();
                    tokio::spawn(async move {
                        let subject = msg.subject.to_string();
                        let reply = msg.reply.as_ref().map(|r| r.to_string());
                        let answer = agent.answer(&subject, reply.as_deref(), &msg.payload);
                        if let Some((inbox, bytes)) = answer {
                            publish_response(&client, inbox, bytes).await;
                        }
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("QueryBusAgent shutting down (SIGINT)");
                    break;
                }
            }
        }

        if let Err(e) = client.flush().await {
            warn!("Failed to flush pending responses: {}", e);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Publish helper
// ---------------------------------------------------------------------------

/// Errors are logged and swallowed; a failed publish only means the
/// requester sees no update.
async fn publish_response(client: &async_nats::Client, subject: String, payload: Bytes) {
    if let Err(e) = client.publish(subject.clone(), payload).await {
        warn!("Failed to publish to {}: {}", subject, e);
    }
}
