//! In-memory combat arena: collision world and target table kept in sync.

use bevy::prelude::*;

use crate::combat::{DamageSink, Side};
use crate::delivery::ResolveWorld;
use crate::net::ClaimSink;
use crate::physics::{Collider, CollisionWorld, ObjectId};
use crate::projectile::ProjectileSpawner;
use crate::target::{TargetState, TargetTable};

#[derive(Resource, Debug, Clone, Default)]
pub struct CombatArena {
    pub physics: CollisionWorld,
    pub targets: TargetTable,
}

impl CombatArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target and one hitbox collider per hitbox definition
    pub fn spawn_target(&mut self, id: ObjectId, state: TargetState) {
        self.physics.remove_object(id);
        for (index, hitbox) in state.hitboxes.iter().enumerate() {
            self.physics.insert(Collider::hitbox(
                id,
                index as u8,
                state.position + hitbox.offset,
                hitbox.shape,
            ));
        }
        self.targets.insert(id, state);
    }

    pub fn add_obstacle(&mut self, id: ObjectId, center: Vec3, half_extents: Vec3) {
        self.physics.insert(Collider::obstacle(id, center, half_extents));
    }

    pub fn despawn(&mut self, id: ObjectId) {
        self.physics.remove_object(id);
        self.targets.remove(id);
    }

    /// Teleport a target, dragging its hitboxes along
    pub fn move_target(&mut self, id: ObjectId, position: Vec3) {
        let Some(state) = self.targets.get_mut(id) else {
            return;
        };
        let delta = position - state.position;
        state.position = position;
        self.physics.translate_object(id, delta);
    }

    /// Borrow the arena as the collaborators of one resolution
    pub fn world<'a>(
        &'a mut self,
        side: Side,
        now_ms: i64,
        damage: &'a mut dyn DamageSink,
        claims: &'a mut dyn ClaimSink,
        projectiles: &'a mut dyn ProjectileSpawner,
    ) -> ResolveWorld<'a> {
        ResolveWorld {
            side,
            now_ms,
            physics: &self.physics,
            targets: &mut self.targets,
            damage,
            claims,
            projectiles,
        }
    }
}
