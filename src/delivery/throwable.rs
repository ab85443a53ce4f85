//! Throwable: arcing projectile with gravity and bounce.
//!
//! Hit claims from throwables are always accepted. Arc, bounce and roll make
//! a cheap server-side re-check unreliable, so the owning client is trusted
//! here. Anything reviewing trust boundaries should start with this file.

use serde::{Deserialize, Serialize};

use super::missile::launch_outcome;
use super::{aim_direction, AttackOutcome, Delivery, ResolveWorld};
use crate::combat::{
    AimTarget, AttackContext, AttackerView, ClaimRejection, HitClaimRecord, HitValidationState,
};
use crate::constants::THROWABLE_GRAVITY;
use crate::physics::PhysicsBackend;
use crate::projectile::{ProjectileLaunch, TemplateRef};
use crate::target::HitboxBounds;

fn default_gravity() -> f32 {
    THROWABLE_GRAVITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowableDelivery {
    pub distance: f32,
    pub throw_speed: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    pub lifetime_ms: i64,
    #[serde(default)]
    pub template: TemplateRef,
}

impl Default for ThrowableDelivery {
    fn default() -> Self {
        Self {
            distance: 15.0,
            throw_speed: 12.0,
            gravity: THROWABLE_GRAVITY,
            lifetime_ms: 3000,
            template: TemplateRef::default(),
        }
    }
}

impl Delivery for ThrowableDelivery {
    fn max_distance(&self) -> f32 {
        self.distance
    }

    fn field_of_view(&self) -> f32 {
        0.0
    }

    fn check_hit(
        &self,
        _ledger: &HitValidationState,
        _claim: &HitClaimRecord,
        _hitbox: &HitboxBounds,
        _physics: &dyn PhysicsBackend,
    ) -> Result<(), ClaimRejection> {
        Ok(())
    }

    fn resolve(
        &self,
        attacker: &AttackerView,
        context: &AttackContext,
        aim: Option<AimTarget>,
        world: &mut ResolveWorld<'_>,
    ) -> AttackOutcome {
        let anchor = self.damage_origin(attacker, context.is_off_hand);
        let direction = aim_direction(&anchor, aim, context.spread_offset());
        let launch = ProjectileLaunch {
            key: context.key(),
            template: self.template,
            origin: anchor.translation,
            direction: direction.as_vec3(),
            speed: self.throw_speed,
            lifetime_ms: self.lifetime_ms,
            lock_target: None,
            gravity: self.gravity,
            radius: 0.0,
            pierce_through_entities: 0,
            launch_timestamp: context.launch_timestamp,
            destination: aim.map(|a| a.point),
        };
        launch_outcome(context, launch, world)
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::*;
    use crate::combat::{AttackPhase, ClaimedHit, DamageDealt, Side, WeaponRef};
    use crate::net::SubmitHitClaim;
    use crate::physics::{CollisionWorld, ObjectId, Shape};
    use crate::target::TargetTable;

    #[test]
    fn test_any_claim_is_plausible() {
        let ctx = AttackContext::new(ObjectId(1), WeaponRef(1), 42).launched_at(1000);
        // absurd: 500 units, backwards in time
        let claim = HitClaimRecord::launch(&ctx, Vec3::ZERO, Vec3::NEG_Z).with_hit(ClaimedHit {
            hit_timestamp: 10,
            hit_object_id: ObjectId(2),
            hitbox_index: 0,
            hit_origin: Vec3::new(0.0, 0.0, -500.0),
            hit_destination: None,
        });
        let hitbox = HitboxBounds {
            center: Vec3::ZERO,
            shape: Shape::Sphere { radius: 0.5 },
        };
        let mut ledger = HitValidationState::new();
        ledger.record(claim.hit_id());
        assert!(ThrowableDelivery::default().is_hit_plausible(
            &ledger,
            &claim,
            &hitbox,
            &CollisionWorld::new()
        ));
    }

    #[test]
    fn test_resolve_spawns_with_gravity() {
        let ctx = AttackContext::new(ObjectId(1), WeaponRef(1), 42);
        let attacker = AttackerView::new(ObjectId(1), Transform::IDENTITY);
        let physics = CollisionWorld::new();
        let mut targets = TargetTable::new();
        let mut dealt: Vec<DamageDealt> = Vec::new();
        let mut claims: Vec<SubmitHitClaim> = Vec::new();
        let mut spawned: Vec<ProjectileLaunch> = Vec::new();
        let mut world = ResolveWorld {
            side: Side::Server,
            now_ms: 0,
            physics: &physics,
            targets: &mut targets,
            damage: &mut dealt,
            claims: &mut claims,
            projectiles: &mut spawned,
        };
        let outcome = ThrowableDelivery::default().resolve(&attacker, &ctx, None, &mut world);
        assert_eq!(outcome.phase, AttackPhase::Detecting);
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].gravity, THROWABLE_GRAVITY);
        assert_eq!(spawned[0].lock_target, None);
    }
}
