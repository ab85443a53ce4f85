//! Hitscan: one sorted ray with a pierce budget.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{aim_direction, check_impact_on_hitbox, settle, strikeable};
use super::{AttackOutcome, Delivery, ResolveWorld, Strike};
use crate::combat::{
    AimTarget, AttackContext, AttackerView, ClaimRejection, HitClaimRecord, HitValidationState,
    VisitedSet,
};
use crate::physics::{ObjectId, PhysicsBackend, PhysicsLayers, RayHit};
use crate::target::{HitboxBounds, TargetRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaycastDelivery {
    pub distance: f32,
    /// Obstacles or targets the shot may pass through before stopping
    #[serde(default)]
    pub pierce_through_entities: u8,
}

impl Default for RaycastDelivery {
    fn default() -> Self {
        Self {
            distance: 30.0,
            pierce_through_entities: 0,
        }
    }
}

impl RaycastDelivery {
    /// Walk sorted ray hits, spending the pierce budget on obstacles and
    /// struck targets. Ineligible hitboxes are passed through for free.
    pub fn collect_strikes(
        &self,
        hits: &[RayHit],
        targets: &dyn TargetRegistry,
        attacker: ObjectId,
    ) -> Vec<Strike> {
        let mut pierce_left = self.pierce_through_entities;
        let mut seen = VisitedSet::new();
        let mut strikes = Vec::new();

        for hit in hits {
            if hit.is_obstacle() {
                if pierce_left == 0 {
                    trace!(object = ?hit.object, "ray stopped by obstacle");
                    break;
                }
                pierce_left -= 1;
                continue;
            }
            if seen.contains(hit.object) || !strikeable(targets, hit.object, attacker) {
                continue;
            }
            seen.insert(hit.object);
            strikes.push(Strike {
                object: hit.object,
                hitbox_index: hit.hitbox_index,
                point: hit.point,
                distance: hit.distance,
            });
            if pierce_left == 0 {
                break;
            }
            pierce_left -= 1;
        }
        strikes
    }
}

impl Delivery for RaycastDelivery {
    fn max_distance(&self) -> f32 {
        self.distance
    }

    fn field_of_view(&self) -> f32 {
        0.0
    }

    fn check_hit(
        &self,
        ledger: &HitValidationState,
        claim: &HitClaimRecord,
        hitbox: &HitboxBounds,
        physics: &dyn PhysicsBackend,
    ) -> Result<(), ClaimRejection> {
        let hit = claim.claimed_hit()?;
        let budget = self.pierce_through_entities;

        check_impact_on_hitbox(hit.hit_origin, hitbox, 0.0)?;

        let distance = claim.origin.distance(hit.hit_origin);
        let limit = self.distance + hitbox.bounding_radius();
        if distance > limit {
            return Err(ClaimRejection::OutOfRange { distance, limit });
        }

        let obstacles = physics.count_obstacles(claim.origin, hit.hit_origin);
        if obstacles > usize::from(budget) {
            return Err(ClaimRejection::ObstaclesExceedPierce { obstacles, budget });
        }

        let count = ledger.count(claim.hit_id());
        if count > u32::from(budget) {
            return Err(ClaimRejection::HitCountExceedsPierce { count, budget });
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
        let anchor = self.damage_origin(attacker, context.is_off_hand);
        let direction = aim_direction(&anchor, aim, context.spread_offset());
        let origin = anchor.translation;

        let hits = world.physics.raycast_sorted(
            origin,
            direction,
            self.distance,
            PhysicsLayers::shot_mask(),
        );
        let strikes = self.collect_strikes(&hits, &*world.targets, context.attacker);
        settle(context, strikes, origin, direction.as_vec3(), world)
    }
}
