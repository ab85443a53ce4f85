//! In-memory collision world.
//!
//! Brute-force over every collider; fine for tests, the plugin arena and the
//! demo, not meant to replace a real broad phase.

use bevy::math::bounding::{Aabb3d, BoundingSphere, RayCast3d};
use bevy::math::Ray3d;
use bevy::prelude::*;
use bevy_rapier3d::prelude::Group;
use serde::{Deserialize, Serialize};

use super::{ObjectId, OverlapHit, PhysicsBackend, PhysicsLayers, RayHit};

/// Collider shape, centred on the collider position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vec3 },
}

impl Shape {
    /// Radius of the sphere enclosing the shape
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Shape::Sphere { radius } => *radius,
            Shape::Cuboid { half_extents } => half_extents.length(),
        }
    }

    /// Point on (or inside) the shape placed at `center` closest to `point`
    pub fn closest_point(&self, center: Vec3, point: Vec3) -> Vec3 {
        match *self {
            Shape::Sphere { radius } => {
                Vec3::from(BoundingSphere::new(center, radius).closest_point(point))
            }
            Shape::Cuboid { half_extents } => {
                Vec3::from(Aabb3d::new(center, half_extents).closest_point(point))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub object: ObjectId,
    pub hitbox_index: u8,
    pub center: Vec3,
    pub shape: Shape,
    pub layer: Group,
    pub is_trigger: bool,
}

impl Collider {
    pub fn hitbox(object: ObjectId, hitbox_index: u8, center: Vec3, shape: Shape) -> Self {
        Self {
            object,
            hitbox_index,
            center,
            shape,
            layer: PhysicsLayers::HITBOX,
            is_trigger: false,
        }
    }

    pub fn obstacle(object: ObjectId, center: Vec3, half_extents: Vec3) -> Self {
        Self {
            object,
            hitbox_index: 0,
            center,
            shape: Shape::Cuboid { half_extents },
            layer: PhysicsLayers::OBSTACLE,
            is_trigger: false,
        }
    }

    pub fn trigger(object: ObjectId, center: Vec3, radius: f32) -> Self {
        Self {
            object,
            hitbox_index: 0,
            center,
            shape: Shape::Sphere { radius },
            layer: PhysicsLayers::TRIGGER,
            is_trigger: true,
        }
    }

    /// Point on (or inside) the collider closest to `point`
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        self.shape.closest_point(self.center, point)
    }

    fn ray_distance(&self, cast: &RayCast3d) -> Option<f32> {
        match self.shape {
            Shape::Sphere { radius } => {
                cast.sphere_intersection_at(&BoundingSphere::new(self.center, radius))
            }
            Shape::Cuboid { half_extents } => {
                cast.aabb_intersection_at(&Aabb3d::new(self.center, half_extents))
            }
        }
    }

    fn surface_normal(&self, point: Vec3) -> Vec3 {
        let local = point - self.center;
        match self.shape {
            Shape::Sphere { .. } => local.normalize_or_zero(),
            Shape::Cuboid { half_extents } => {
                let scaled = local / half_extents.max(Vec3::splat(f32::EPSILON));
                let abs = scaled.abs();
                if abs.x >= abs.y && abs.x >= abs.z {
                    Vec3::X * scaled.x.signum()
                } else if abs.y >= abs.z {
                    Vec3::Y * scaled.y.signum()
                } else {
                    Vec3::Z * scaled.z.signum()
                }
            }
        }
    }
}

/// Flat list of colliders
#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    colliders: Vec<Collider>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collider: Collider) {
        self.colliders.push(collider);
    }

    /// Builder-style insert
    pub fn with(mut self, collider: Collider) -> Self {
        self.insert(collider);
        self
    }

    /// Drop every collider owned by `object` (despawn)
    pub fn remove_object(&mut self, object: ObjectId) {
        self.colliders.retain(|c| c.object != object);
    }

    /// Move every collider owned by `object` by `delta`
    pub fn translate_object(&mut self, object: ObjectId, delta: Vec3) {
        for collider in self.colliders.iter_mut().filter(|c| c.object == object) {
            collider.center += delta;
        }
    }

    pub fn collider(&self, object: ObjectId, hitbox_index: u8) -> Option<&Collider> {
        self.colliders
            .iter()
            .find(|c| c.object == object && c.hitbox_index == hitbox_index)
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl PhysicsBackend for CollisionWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: Group) -> Vec<OverlapHit> {
        self.colliders
            .iter()
            .filter(|c| c.layer.intersects(mask))
            .filter_map(|c| {
                let closest_point = c.closest_point(center);
                (closest_point.distance(center) <= radius).then_some(OverlapHit {
                    object: c.object,
                    hitbox_index: c.hitbox_index,
                    layer: c.layer,
                    is_trigger: c.is_trigger,
                    closest_point,
                })
            })
            .collect()
    }

    fn raycast_sorted(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        mask: Group,
    ) -> Vec<RayHit> {
        if max_distance.is_nan() || max_distance <= 0.0 {
            return Vec::new();
        }
        let cast = RayCast3d::from_ray(Ray3d::new(origin, direction), max_distance);
        let mut hits: Vec<RayHit> = self
            .colliders
            .iter()
            .filter(|c| !c.is_trigger && c.layer.intersects(mask))
            .filter_map(|c| {
                let distance = c.ray_distance(&cast)?;
                let point = origin + direction.as_vec3() * distance;
                Some(RayHit {
                    point,
                    normal: c.surface_normal(point),
                    distance,
                    object: c.object,
                    hitbox_index: c.hitbox_index,
                    layer: c.layer,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}
