//! Target resolution: which single container-bearing object is the
//! requester looking at right now?
//!
//! Purely local and non-blocking. Every call re-runs the ray query, so a
//! target is never reused after the view moves off it.

use crate::types::{BlockPos, TargetId, Vec3, WorldId};

// ---------------------------------------------------------------------------
// Scene abstraction
// ---------------------------------------------------------------------------

/// Collision volume used for the ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    /// Mobile actor, approximated by a sphere.
    Sphere { center: Vec3, radius: f32 },
    /// Fixed structure occupying one unit cube.
    Block(BlockPos),
}

impl Bounds {
    /// Point the overlay is anchored to: the top of the volume.
    pub fn anchor(&self) -> Vec3 {
        match *self {
            Bounds::Sphere { center, radius } => center.add(Vec3::new(0.0, radius, 0.0)),
            Bounds::Block(pos) => pos.center().add(Vec3::new(0.0, 0.5, 0.0)),
        }
    }

    /// Distance along the (unit) ray to the first hit, if any.
    pub fn ray_hit(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        match *self {
            Bounds::Sphere { center, radius } => ray_sphere(origin, dir, center, radius),
            Bounds::Block(pos) => {
                let min = pos.min_corner();
                ray_aabb(origin, dir, min, min.add(Vec3::new(1.0, 1.0, 1.0)))
            }
        }
    }
}

/// An object visible to the requester.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: TargetId,
    pub bounds: Bounds,
    /// Result of the capability query: does it expose a container at all?
    pub has_container: bool,
}

/// The requester's local view of the world.
pub trait Scene {
    /// Objects in `world_id` whose volume may lie within `radius` of `origin`.
    fn objects_near(&self, world_id: WorldId, origin: Vec3, radius: f32) -> Vec<SceneObject>;

    /// Current state of a single object, or `None` once it is gone.
    fn scene_object(&self, id: &TargetId) -> Option<SceneObject>;
}

// ---------------------------------------------------------------------------
// Viewpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    pub world_id: WorldId,
    pub eye: Vec3,
    pub aim: Vec3,
    pub sneaking: bool,
    pub sprinting: bool,
}

impl Viewpoint {
    pub fn new(world_id: WorldId, eye: Vec3, aim: Vec3) -> Self {
        Self {
            world_id,
            eye,
            aim,
            sneaking: false,
            sprinting: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct TargetResolver {
    reach: f32,
}

impl TargetResolver {
    pub fn new(reach: f32) -> Self {
        Self {
            reach: reach.max(0.0),
        }
    }

    pub fn reach(&self) -> f32 {
        self.reach
    }

    /// Nearest container-bearing object along the aim ray within reach.
    ///
    /// Objects without a container are skipped entirely; they neither win
    /// nor occlude.
    pub fn resolve<S: Scene + ?Sized>(&self, view: &Viewpoint, scene: &S) -> Option<TargetId> {
        let dir = view.aim.normalized()?;
        scene
            .objects_near(view.world_id, view.eye, self.reach)
            .into_iter()
            .filter(|obj| obj.has_container && obj.id.world_id() == view.world_id)
            .filter_map(|obj| {
                let t = obj.bounds.ray_hit(view.eye, dir)?;
                (t <= self.reach).then_some((t, obj.id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }
}

// ---------------------------------------------------------------------------
// Intersection helpers
// ---------------------------------------------------------------------------

fn ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin.sub(center);
    let b = oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let near = -b - sq;
    let far = -b + sq;
    if far < 0.0 {
        None
    } else if near < 0.0 {
        // Eye inside the sphere.
        Some(0.0)
    } else {
        Some(near)
    }
}

fn ray_aabb(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = 0.0f32;
    let mut t_max = f32::INFINITY;

    for (o, d, lo, hi) in [
        (origin.x, dir.x, min.x, max.x),
        (origin.y, dir.y, min.y, max.y),
        (origin.z, dir.z, min.z, max.z),
    ] {
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (t0, t1) = {
            let a = (lo - o) * inv;
            let b = (hi - o) * inv;
            if a <= b {
                (a, b)
            } else {
                (b, a)
            }
        };
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    Some(t_min)
}
