//! Authority-side request handling.
//!
//! [`RequestHandler::handle`] answers one query or explains (to the caller,
//! never to the requester) why it will not. Each call reads the world and
//! one settings snapshot and keeps no state between calls, so any number of
//! calls may run concurrently.

use crate::config::SettingsStore;
use crate::error::QueryError;
use crate::permission::{self, PermissionContext};
use crate::protocol::{self, Envelope, Query, Response};
use crate::world::WorldView;
use log::{debug, warn};
use std::sync::Arc;

pub struct RequestHandler<W: WorldView + ?Sized> {
    world: Arc<W>,
    settings: Arc<SettingsStore>,
}

impl<W: WorldView + ?Sized> Clone for RequestHandler<W> {
    fn clone(&self) -> Self {
        Self {
            world: self.world.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<W: WorldView + ?Sized> RequestHandler<W> {
    pub fn new(world: Arc<W>, settings: Arc<SettingsStore>) -> Self {
        Self { world, settings }
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// Answer a decoded query.
    pub fn handle(&self, query: &Envelope<Query>) -> Result<Envelope<Response>, QueryError> {
        let target = query.payload.target_id();

        let requester = self
            .world
            .requester(&query.requester)
            .ok_or_else(|| QueryError::UnknownRequester(query.requester.clone()))?;

        if requester.world_id != target.world_id() {
            return Err(QueryError::WorldMismatch {
                target,
                target_world: target.world_id(),
                requester_world: requester.world_id,
            });
        }

        let object = self
            .world
            .locate(&target)
            .ok_or(QueryError::TargetVanished(target))?;

        let settings = self.settings.snapshot();
        let ctx = PermissionContext::for_requester(&requester, &settings);
        if !permission::allowed(&ctx, &object.type_id) {
            return Err(QueryError::PermissionDenied {
                requester: requester.id,
                target,
            });
        }

        let capability = self
            .world
            .has_container(&object)
            .ok_or(QueryError::NoContainer(target))?;
        let snapshot = self
            .world
            .read_container(&capability)
            .ok_or(QueryError::TargetVanished(target))?;

        Ok(Envelope::new(
            query.requester.clone(),
            query.seq,
            Response::from_snapshot(target, snapshot),
        ))
    }

    /// Wire-level entry point: subject and bytes in, reply bytes out.
    ///
    /// Every failure is logged and yields `None`; nothing is sent back. The
    /// caller delivers the reply to the query's own reply inbox.
    pub fn handle_bytes(&self, subject: &str, payload: &[u8]) -> Option<Vec<u8>> {
        let query = match protocol::decode_query(subject, payload) {
            Ok(q) => q,
            Err(e) => {
                warn!("Discarding message on {}: {}", subject, e);
                return None;
            }
        };

        match self.handle(&query) {
            Ok(response) => match protocol::encode(&response) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("Failed to encode response for {}: {}", query.requester, e);
                    None
                }
            },
            Err(e) => {
                debug!("Dropping query #{} from {}: {}", query.seq, query.requester, e);
                None
            }
        }
    }
}
