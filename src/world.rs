//! World collaborator: the authority's view of live objects and requesters,
//! plus [`MemoryWorld`], an in-memory world used by the server binary and
//! the tests.

use crate::resolver::{Bounds, Scene, SceneObject};
use crate::snapshot::{ContainerSnapshot, SnapshotKind, Slots, TradeOffer};
use crate::types::{ActorId, BlockPos, ItemStack, TargetId, Vec3, WorldId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Requesters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Head,
    Chest,
    Legs,
    Feet,
    MainHand,
    OffHand,
    /// Extra worn-item slot (rings, amulets, head trinkets …).
    Accessory(u8),
}

/// Live state of a requester as the authority sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequesterProfile {
    pub id: String,
    pub world_id: WorldId,
    #[serde(default)]
    pub equipment: Vec<(EquipSlot, ItemStack)>,
}

impl RequesterProfile {
    pub fn new(id: impl Into<String>, world_id: WorldId) -> Self {
        Self {
            id: id.into(),
            world_id,
            equipment: Vec::new(),
        }
    }

    pub fn wearing(mut self, slot: EquipSlot, item: ItemStack) -> Self {
        self.equipment.push((slot, item));
        self
    }
}

// ---------------------------------------------------------------------------
// Capability query
// ---------------------------------------------------------------------------

/// A live object resolved from a [`TargetId`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorldObjectRef {
    pub target: TargetId,
    /// Type identifier checked against the ban list, e.g. `"minecraft:chest"`.
    pub type_id: String,
    pub name: String,
}

/// Handle proving an object exposes a container, and of which kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerCapability {
    pub target: TargetId,
    pub kind: SnapshotKind,
}

/// What the request handler needs from the authoritative world.
///
/// Implementations must be safe to call from many handler tasks at once and
/// must never mutate a container while reading it.
pub trait WorldView: Send + Sync {
    fn requester(&self, requester_id: &str) -> Option<RequesterProfile>;

    fn locate(&self, target: &TargetId) -> Option<WorldObjectRef>;

    fn has_container(&self, object: &WorldObjectRef) -> Option<ContainerCapability>;

    /// Copy the container's contents. `None` if the object disappeared since
    /// the capability was obtained.
    fn read_container(&self, capability: &ContainerCapability) -> Option<ContainerSnapshot>;
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerData {
    Slots { slots: Slots },
    Trades { offers: Vec<TradeOffer> },
}

impl ContainerData {
    fn kind(&self) -> SnapshotKind {
        match self {
            Self::Slots { .. } => SnapshotKind::Plain,
            Self::Trades { .. } => SnapshotKind::Trade,
        }
    }

    fn snapshot(&self, name: &str) -> ContainerSnapshot {
        match self {
            Self::Slots { slots } => ContainerSnapshot::Plain {
                label: name.to_string(),
                slots: slots.clone(),
            },
            Self::Trades { offers } => ContainerSnapshot::trade(name, offers.clone()),
        }
    }
}

fn default_radius() -> f32 {
    0.6
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub world_id: WorldId,
    pub actor_id: ActorId,
    pub type_id: String,
    pub name: String,
    pub position: Vec3,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default)]
    pub container: Option<ContainerData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRecord {
    pub world_id: WorldId,
    pub coordinate: BlockPos,
    pub type_id: String,
    pub name: String,
    #[serde(default)]
    pub container: Option<ContainerData>,
}

/// Serialized world used to seed a [`MemoryWorld`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldFixture {
    #[serde(default)]
    pub actors: Vec<ActorRecord>,
    #[serde(default)]
    pub structures: Vec<StructureRecord>,
    #[serde(default)]
    pub requesters: Vec<RequesterProfile>,
}

// ---------------------------------------------------------------------------
// MemoryWorld
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryWorld {
    actors: RwLock<HashMap<(WorldId, ActorId), ActorRecord>>,
    structures: RwLock<HashMap<(WorldId, BlockPos), StructureRecord>>,
    requesters: RwLock<HashMap<String, RequesterProfile>>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: WorldFixture) -> Self {
        let world = Self::new();
        for actor in fixture.actors {
            world.insert_actor(actor);
        }
        for structure in fixture.structures {
            world.insert_structure(structure);
        }
        for requester in fixture.requesters {
            world.insert_requester(requester);
        }
        world
    }

    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self::from_fixture(serde_json::from_slice(payload)?))
    }

    pub fn insert_actor(&self, actor: ActorRecord) {
        self.actors
            .write()
            .insert((actor.world_id, actor.actor_id), actor);
    }

    pub fn insert_structure(&self, structure: StructureRecord) {
        self.structures
            .write()
            .insert((structure.world_id, structure.coordinate), structure);
    }

    pub fn insert_requester(&self, requester: RequesterProfile) {
        self.requesters
            .write()
            .insert(requester.id.clone(), requester);
    }

    /// Destroy an object. Returns whether it existed.
    pub fn remove(&self, target: &TargetId) -> bool {
        match *target {
            TargetId::Actor { world_id, actor_id } => {
                self.actors.write().remove(&(world_id, actor_id)).is_some()
            }
            TargetId::Structure {
                world_id,
                coordinate,
            } => self
                .structures
                .write()
                .remove(&(world_id, coordinate))
                .is_some(),
        }
    }

    /// Replace an object's container contents (world simulation side).
    pub fn set_container(&self, target: &TargetId, container: Option<ContainerData>) -> bool {
        match *target {
            TargetId::Actor { world_id, actor_id } => {
                match self.actors.write().get_mut(&(world_id, actor_id)) {
                    Some(a) => {
                        a.container = container;
                        true
                    }
                    None => false,
                }
            }
            TargetId::Structure {
                world_id,
                coordinate,
            } => match self.structures.write().get_mut(&(world_id, coordinate)) {
                Some(s) => {
                    s.container = container;
                    true
                }
                None => false,
            },
        }
    }

    pub fn object_count(&self) -> usize {
        self.actors.read().len() + self.structures.read().len()
    }
}

impl WorldView for MemoryWorld {
    fn requester(&self, requester_id: &str) -> Option<RequesterProfile> {
        self.requesters.read().get(requester_id).cloned()
    }

    fn locate(&self, target: &TargetId) -> Option<WorldObjectRef> {
        match *target {
            TargetId::Actor { world_id, actor_id } => {
                self.actors
                    .read()
                    .get(&(world_id, actor_id))
                    .map(|a| WorldObjectRef {
                        target: *target,
                        type_id: a.type_id.clone(),
                        name: a.name.clone(),
                    })
            }
            TargetId::Structure {
                world_id,
                coordinate,
            } => self
                .structures
                .read()
                .get(&(world_id, coordinate))
                .map(|s| WorldObjectRef {
                    target: *target,
                    type_id: s.type_id.clone(),
                    name: s.name.clone(),
                }),
        }
    }

    fn has_container(&self, object: &WorldObjectRef) -> Option<ContainerCapability> {
        let kind = match object.target {
            TargetId::Actor { world_id, actor_id } => self
                .actors
                .read()
                .get(&(world_id, actor_id))?
                .container
                .as_ref()?
                .kind(),
            TargetId::Structure {
                world_id,
                coordinate,
            } => self
                .structures
                .read()
                .get(&(world_id, coordinate))?
                .container
                .as_ref()?
                .kind(),
        };
        Some(ContainerCapability {
            target: object.target,
            kind,
        })
    }

    fn read_container(&self, capability: &ContainerCapability) -> Option<ContainerSnapshot> {
        match capability.target {
            TargetId::Actor { world_id, actor_id } => {
                let actors = self.actors.read();
                let actor = actors.get(&(world_id, actor_id))?;
                Some(actor.container.as_ref()?.snapshot(&actor.name))
            }
            TargetId::Structure {
                world_id,
                coordinate,
            } => {
                let structures = self.structures.read();
                let structure = structures.get(&(world_id, coordinate))?;
                Some(structure.container.as_ref()?.snapshot(&structure.name))
            }
        }
    }
}

impl Scene for MemoryWorld {
    fn objects_near(&self, world_id: WorldId, origin: Vec3, radius: f32) -> Vec<SceneObject> {
        let mut out = Vec::new();

        for a in self.actors.read().values() {
            if a.world_id == world_id && a.position.sub(origin).length() <= radius + a.radius {
                out.push(actor_scene_object(a));
            }
        }

        // Half the cube diagonal.
        let block_slack = 0.87;
        for s in self.structures.read().values() {
            if s.world_id == world_id
                && s.coordinate.center().sub(origin).length() <= radius + block_slack
            {
                out.push(structure_scene_object(s));
            }
        }

        out
    }

    fn scene_object(&self, id: &TargetId) -> Option<SceneObject> {
        match *id {
            TargetId::Actor { world_id, actor_id } => self
                .actors
                .read()
                .get(&(world_id, actor_id))
                .map(actor_scene_object),
            TargetId::Structure {
                world_id,
                coordinate,
            } => self
                .structures
                .read()
                .get(&(world_id, coordinate))
                .map(structure_scene_object),
        }
    }
}

fn actor_scene_object(a: &ActorRecord) -> SceneObject {
    SceneObject {
        id: TargetId::actor(a.world_id, a.actor_id),
        bounds: Bounds::Sphere {
            center: a.position,
            radius: a.radius,
        },
        has_container: a.container.is_some(),
    }
}

fn structure_scene_object(s: &StructureRecord) -> SceneObject {
    SceneObject {
        id: TargetId::structure(s.world_id, s.coordinate),
        bounds: Bounds::Block(s.coordinate),
        has_container: s.container.is_some(),
    }
}
