//! Core types shared across all modules.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, other: Vec3) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len <= f32::EPSILON {
            None
        } else {
            Some(self.scale(1.0 / len))
        }
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Block grid
// ---------------------------------------------------------------------------

/// Integer coordinate of a fixed structure (one unit cube per position).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Minimum corner of the unit cube occupied by this position.
    pub fn min_corner(&self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    /// Centre of the unit cube.
    pub fn center(&self) -> Vec3 {
        self.min_corner().add(Vec3::new(0.5, 0.5, 0.5))
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Target identity
// ---------------------------------------------------------------------------

pub type WorldId = i32;
pub type ActorId = u64;

/// Identity of a remote object whose container can be observed.
///
/// Stable for the object's lifetime and never reused within a session, so it
/// doubles as the snapshot cache key.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetId {
    Actor { world_id: WorldId, actor_id: ActorId },
    Structure { world_id: WorldId, coordinate: BlockPos },
}

impl TargetId {
    pub fn actor(world_id: WorldId, actor_id: ActorId) -> Self {
        Self::Actor { world_id, actor_id }
    }

    pub fn structure(world_id: WorldId, coordinate: BlockPos) -> Self {
        Self::Structure {
            world_id,
            coordinate,
        }
    }

    pub fn world_id(&self) -> WorldId {
        match self {
            Self::Actor { world_id, .. } | Self::Structure { world_id, .. } => *world_id,
        }
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Actor { world_id, actor_id } => write!(f, "actor:{}/{}", world_id, actor_id),
            Self::Structure {
                world_id,
                coordinate,
            } => write!(f, "structure:{}/{}", world_id, coordinate),
        }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Descriptor of one item stack as shown in an overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Registry name, e.g. `"minecraft:diamond"`.
    pub item_id: String,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Opaque per-stack data (enchantments, damage …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<serde_json::Value>,
}

impl ItemStack {
    pub fn new(item_id: impl Into<String>, count: u32) -> Self {
        Self {
            item_id: item_id.into(),
            count,
            display_name: None,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: serde_json::Value) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Identity of the item kind ignoring count: id plus tag data.
    ///
    /// Two stacks with equal fingerprints render identically and can be
    /// merged into one sprite.
    pub fn fingerprint(&self) -> String {
        let mut buf = self.item_id.clone().into_bytes();
        if let Some(tag) = &self.tag {
            buf.push(0);
            buf.extend_from_slice(tag.to_string().as_bytes());
        }
        format!("{:x}", md5::compute(&buf))
    }
}
