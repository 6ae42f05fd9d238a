//! Holographic container overlays.
//!
//! A requester looks at a remote actor or structure, asks the authority for
//! a point-in-time copy of its container, caches the answer briefly and
//! draws it as a rotating overlay above the object. Containers are only ever
//! read, never changed.
//!
//! ## Architecture
//!
//! ```text
//! requester (one frame loop)                      authority
//! ─────────────────────────────────────           ──────────────────────────
//! ClientSession  (session.rs)
//!   ├── TargetResolver   (resolver.rs)
//!   ├── QueryDispatcher  (dispatcher.rs) ──query──▶ QueryBusAgent (bus.rs)
//!   ├── SnapshotCache    (cache.rs)     ◀─snapshot─   └── RequestHandler (handler.rs)
//!   └── RenderCompositor (compositor.rs)                    ├── permission.rs
//!                                                           └── WorldView (world.rs)
//! ```
//!
//! The requester side reaches the network through [`bridge`]; both sides
//! speak the [`protocol`] module's messages.

// Protocol, core types and both pipelines are always available.
pub mod cache;
pub mod compositor;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod permission;
pub mod protocol;
pub mod resolver;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod world;

// Network transports require their features.
#[cfg(feature = "bridge")]
pub mod bridge;
#[cfg(feature = "server")]
pub mod bus;

#[cfg(feature = "bridge")]
pub use bridge::{BridgeConfig, BridgeHandle};
#[cfg(feature = "server")]
pub use bus::{QueryBusAgent, QueryBusConfig};

pub use cache::{CacheEntry, SnapshotCache};
pub use compositor::{Overlay, RenderCompositor, RenderState};
pub use self::config::{Settings, SettingsStore};
pub use dispatcher::{DispatchOutcome, QueryDispatcher, QuerySink};
pub use error::{ProtocolError, QueryError, SnapshotError};
pub use handler::RequestHandler;
pub use permission::PermissionContext;
pub use resolver::{Scene, TargetResolver, Viewpoint};
pub use session::ClientSession;
pub use snapshot::{ContainerSnapshot, SlotEntry, TradeOffer};
pub use types::{BlockPos, ItemStack, TargetId, Vec3};
pub use world::{MemoryWorld, WorldView};
