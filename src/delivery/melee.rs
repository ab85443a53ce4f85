//! Melee: sphere overlap gated by a horizontal/vertical field of view.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{aim_direction, settle, shot_transform, strikeable, within_field_of_view};
use super::{AttackOutcome, Delivery, ResolveWorld, Strike};
use crate::combat::{
    AimTarget, AttackContext, AttackerView, ClaimRejection, HitClaimRecord, HitValidationState,
};
use crate::constants::MELEE_BACKWARD_OFFSET;
use crate::physics::{PhysicsBackend, PhysicsLayers};
use crate::target::HitboxBounds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeDelivery {
    pub distance: f32,
    /// Full horizontal cone (degrees)
    pub horizontal_fov: f32,
    /// Full vertical cone (degrees)
    pub vertical_fov: f32,
    /// Single-target weapons never cleave
    #[serde(default)]
    pub hit_only_selected_target: bool,
}

impl Default for MeleeDelivery {
    fn default() -> Self {
        Self {
            distance: 2.0,
            horizontal_fov: 90.0,
            vertical_fov: 60.0,
            hit_only_selected_target: false,
        }
    }
}

impl MeleeDelivery {
    /// Candidates in reach and in the cone, nearest first
    pub fn detect(
        &self,
        attacker: &AttackerView,
        context: &AttackContext,
        aim: Option<AimTarget>,
        world: &ResolveWorld<'_>,
    ) -> (Transform, Vec<Strike>) {
        let anchor = self.damage_origin(attacker, context.is_off_hand);
        let direction = aim_direction(&anchor, aim, context.spread_offset());
        let frame = shot_transform(&anchor, direction);
        let origin = frame.translation;
        let center = origin - direction.as_vec3() * MELEE_BACKWARD_OFFSET;

        let mut strikes: Vec<Strike> = Vec::new();
        for overlap in world.physics.overlap_sphere(
            center,
            self.distance + MELEE_BACKWARD_OFFSET,
            PhysicsLayers::HITBOX,
        ) {
            if overlap.is_trigger || strikes.iter().any(|s| s.object == overlap.object) {
                continue;
            }
            if !strikeable(&*world.targets, overlap.object, context.attacker) {
                continue;
            }
            let point = world
                .targets
                .hitbox(overlap.object, overlap.hitbox_index)
                .map(|h| h.closest_point(origin))
                .unwrap_or(overlap.closest_point);
            if !within_field_of_view(&frame, point, self.horizontal_fov, self.vertical_fov) {
                continue;
            }
            strikes.push(Strike {
                object: overlap.object,
                hitbox_index: overlap.hitbox_index,
                point,
                distance: point.distance(origin),
            });
        }
        strikes.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        if self.hit_only_selected_target {
            match aim.and_then(|a| a.object) {
                Some(selected) => strikes.retain(|s| s.object == selected),
                None => strikes.truncate(1),
            }
            strikes.truncate(1);
        }
        (frame, strikes)
    }
}

impl Delivery for MeleeDelivery {
    fn max_distance(&self) -> f32 {
        self.distance
    }

    fn field_of_view(&self) -> f32 {
        self.horizontal_fov
    }

    fn check_hit(
        &self,
        ledger: &HitValidationState,
        claim: &HitClaimRecord,
        _hitbox: &HitboxBounds,
        _physics: &dyn PhysicsBackend,
    ) -> Result<(), ClaimRejection> {
        if self.hit_only_selected_target {
            let count = ledger.count(claim.hit_id());
            if count > 0 {
                return Err(ClaimRejection::AlreadyStruck { count });
            }
        }
        Ok(())
    }

    fn resolve(
        &self,
        attacker: &AttackerView,
        context: &AttackContext,
        aim: Option<AimTarget>,
        world: &mut ResolveWorld<'_>,
    ) -> AttackOutcome {
        let (frame, strikes) = self.detect(attacker, context, aim, world);
        settle(
            context,
            strikes,
            frame.translation,
            frame.forward().as_vec3(),
            world,
        )
    }
}
