//! Error taxonomy.
//!
//! Nothing here is fatal: the authority turns every [`QueryError`] and
//! [`ProtocolError`] into "no response", and the requester treats a missing
//! snapshot as "draw nothing".

use crate::types::TargetId;
use thiserror::Error;

/// Why the authority declined to answer a query.
///
/// Never sent to the requester.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("requester '{0}' is not known to the world")]
    UnknownRequester(String),

    #[error("target {0} no longer exists")]
    TargetVanished(TargetId),

    #[error("target {target} is in world {target_world}, requester is in world {requester_world}")]
    WorldMismatch {
        target: TargetId,
        target_world: i32,
        requester_world: i32,
    },

    #[error("requester '{requester}' may not query {target}")]
    PermissionDenied { requester: String, target: TargetId },

    #[error("target {0} exposes no container")]
    NoContainer(TargetId),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown subject '{0}'")]
    UnknownSubject(String),

    #[error("query on behalf of '{subject}' claims to come from '{claimed}'")]
    RequesterMismatch { subject: String, claimed: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("slot index {0} appears more than once")]
    DuplicateSlot(u32),
}
