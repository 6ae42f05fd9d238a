//! `holo.*` wire protocol.
//!
//! This module owns **every message that crosses the network boundary**
//! between a requester and the authority.
//!
//! ## Channel namespaces
//!
//! | Subject                            | Direction             | Payload               |
//! |------------------------------------|-----------------------|-----------------------|
//! | `holo.query.<requester>.actor`     | requester → authority | `Envelope<Query>`     |
//! | `holo.query.<requester>.structure` | requester → authority | `Envelope<Query>`     |
//! | request reply inbox                | authority → requester | `Envelope<Response>`  |
//!
//! The requester id in the subject must match the envelope's. Server-side
//! account permissions restrict each requester to publishing under its own
//! `holo.query.<id>` and subscribing under its own [`subjects::inbox_prefix`],
//! so a client can neither query as someone else nor read their replies.
//!
//! ## Design rules
//!
//! 1. Every struct is `Serialize + Deserialize` with snake_case JSON.
//! 2. Every message carries the requester id and the request `seq`; the
//!    authority echoes the `seq` it was asked with.
//! 3. Denied or unanswerable queries get **no** message back.

use crate::error::ProtocolError;
use crate::snapshot::{ContainerSnapshot, Slots, TradeOffer};
use crate::types::{ActorId, BlockPos, TargetId, WorldId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Common envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub requester: String,
    pub seq: u64,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(requester: impl Into<String>, seq: u64, payload: T) -> Self {
        Self {
            requester: requester.into(),
            seq,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries  (requester → authority)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    QueryActor {
        world_id: WorldId,
        target_actor_id: ActorId,
    },
    QueryStructure {
        world_id: WorldId,
        coordinate: BlockPos,
    },
}

impl Query {
    pub fn for_target(target: &TargetId) -> Self {
        match *target {
            TargetId::Actor { world_id, actor_id } => Self::QueryActor {
                world_id,
                target_actor_id: actor_id,
            },
            TargetId::Structure {
                world_id,
                coordinate,
            } => Self::QueryStructure {
                world_id,
                coordinate,
            },
        }
    }

    pub fn target_id(&self) -> TargetId {
        match *self {
            Self::QueryActor {
                world_id,
                target_actor_id,
            } => TargetId::actor(world_id, target_actor_id),
            Self::QueryStructure {
                world_id,
                coordinate,
            } => TargetId::structure(world_id, coordinate),
        }
    }

    /// Last subject token for this query variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QueryActor { .. } => subjects::KIND_ACTOR,
            Self::QueryStructure { .. } => subjects::KIND_STRUCTURE,
        }
    }

    /// Subject `requester` publishes this query on.
    pub fn subject(&self, requester: &str) -> String {
        subjects::query_for(requester, self.kind())
    }
}

// ---------------------------------------------------------------------------
// Responses  (authority → requester)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    PlainSnapshot {
        target_id: TargetId,
        label: String,
        slots: Slots,
    },
    TradeSnapshot {
        target_id: TargetId,
        offers: Vec<TradeOffer>,
        label: String,
    },
}

impl Response {
    pub fn from_snapshot(target_id: TargetId, snapshot: ContainerSnapshot) -> Self {
        match snapshot {
            ContainerSnapshot::Plain { label, slots } => Self::PlainSnapshot {
                target_id,
                label,
                slots,
            },
            ContainerSnapshot::Trade { label, offers } => Self::TradeSnapshot {
                target_id,
                offers,
                label,
            },
        }
    }

    pub fn target_id(&self) -> TargetId {
        match self {
            Self::PlainSnapshot { target_id, .. } | Self::TradeSnapshot { target_id, .. } => {
                *target_id
            }
        }
    }

    pub fn into_parts(self) -> (TargetId, ContainerSnapshot) {
        match self {
            Self::PlainSnapshot {
                target_id,
                label,
                slots,
            } => (target_id, ContainerSnapshot::Plain { label, slots }),
            Self::TradeSnapshot {
                target_id,
                offers,
                label,
            } => (target_id, ContainerSnapshot::Trade { label, offers }),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Decode an inbound query and check the subject it arrived on names both
/// its variant and the requester the envelope claims to be.
pub fn decode_query(subject: &str, payload: &[u8]) -> Result<Envelope<Query>, ProtocolError> {
    let (requester, kind) = subjects::parse_query(subject)
        .ok_or_else(|| ProtocolError::UnknownSubject(subject.to_string()))?;
    let envelope: Envelope<Query> = decode(payload)?;
    if envelope.payload.kind() != kind {
        return Err(ProtocolError::UnknownSubject(subject.to_string()));
    }
    if envelope.requester != requester {
        return Err(ProtocolError::RequesterMismatch {
            subject: requester.to_string(),
            claimed: envelope.requester,
        });
    }
    Ok(envelope)
}

// ---------------------------------------------------------------------------
// Subject helpers
// ---------------------------------------------------------------------------

pub mod subjects {
    pub const QUERY_PREFIX: &str = "holo.query";
    pub const KIND_ACTOR: &str = "actor";
    pub const KIND_STRUCTURE: &str = "structure";

    /// Wildcard the authority subscribes to.
    pub const QUERY_ALL: &str = "holo.query.*.*";

    /// Whether `id` can be used as a single subject token.
    pub fn is_valid_token(id: &str) -> bool {
        !id.is_empty()
            && !id
                .chars()
                .any(|c| c == '.' || c == '*' || c == '>' || c.is_whitespace())
    }

    pub fn query_for(requester: &str, kind: &str) -> String {
        format!("{}.{}.{}", QUERY_PREFIX, requester, kind)
    }

    /// Split `holo.query.<requester>.<kind>` into its requester and kind.
    pub fn parse_query(subject: &str) -> Option<(&str, &str)> {
        let rest = subject.strip_prefix(QUERY_PREFIX)?.strip_prefix('.')?;
        let (requester, kind) = rest.split_once('.')?;
        if !is_valid_token(requester) || !matches!(kind, KIND_ACTOR | KIND_STRUCTURE) {
            return None;
        }
        Some((requester, kind))
    }

    /// Inbox prefix a requester's replies arrive under.
    pub fn inbox_prefix(requester: &str) -> String {
        format!("_INBOX.holo.{}", requester)
    }
}
