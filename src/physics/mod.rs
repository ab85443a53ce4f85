//! Physics backend seam: collision layers and the queries delivery needs.
//!
//! The core never does spatial partitioning itself. It asks a
//! [`PhysicsBackend`] for:
//! - overlap queries with trigger/solid discrimination (melee)
//! - sorted ray casts (hitscan, projectile sweeps)
//! - obstacle-only ray casts (wall occlusion during validation)
//!
//! [`CollisionWorld`] is a brute-force in-memory backend used by tests, the
//! ECS plugin and the demo binary.

use bevy::prelude::*;
use bevy_rapier3d::prelude::Group;
use serde::{Deserialize, Serialize};

pub mod world;

pub use world::{Collider, CollisionWorld, Shape};

// ============================================================================
// Collision Layers
// ============================================================================

/// Collision group constants for query filtering.
pub struct PhysicsLayers;

impl PhysicsLayers {
    /// Damageable hitboxes (players, monsters, destructibles)
    pub const HITBOX: Group = Group::GROUP_1;
    /// Walls, floors and any geometry that blocks shots
    pub const OBSTACLE: Group = Group::GROUP_2;
    /// Trigger volumes (aggro range, zones), never struck
    pub const TRIGGER: Group = Group::GROUP_3;

    /// Everything a shot can hit
    pub fn shot_mask() -> Group {
        Self::HITBOX | Self::OBSTACLE
    }
}

/// Stable numeric identity of a networked object
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ObjectId(pub u64);

/// One result of a sorted ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub object: ObjectId,
    pub hitbox_index: u8,
    pub layer: Group,
}

impl RayHit {
    pub fn is_obstacle(&self) -> bool {
        self.layer.intersects(PhysicsLayers::OBSTACLE)
    }
}

/// One result of an overlap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapHit {
    pub object: ObjectId,
    pub hitbox_index: u8,
    pub layer: Group,
    pub is_trigger: bool,
    /// Point on the collider closest to the query centre
    pub closest_point: Vec3,
}

/// Queries the delivery strategies issue against the collision backend.
pub trait PhysicsBackend {
    /// Solid colliders in `mask` overlapping the sphere. Triggers are reported
    /// with `is_trigger = true` so callers can drop them.
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: Group) -> Vec<OverlapHit>;

    /// All colliders in `mask` crossed by the ray, nearest first.
    fn raycast_sorted(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        mask: Group,
    ) -> Vec<RayHit>;

    /// Number of obstacle colliders strictly between `from` and `to`.
    fn count_obstacles(&self, from: Vec3, to: Vec3) -> usize {
        let delta = to - from;
        let length = delta.length();
        let Ok(direction) = Dir3::new(delta) else {
            return 0;
        };
        self.raycast_sorted(from, direction, length, PhysicsLayers::OBSTACLE)
            .iter()
            .filter(|hit| hit.distance < length)
            .count()
    }
}
