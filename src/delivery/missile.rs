//! Missile: launch geometry, projectile hand-off and the speed/distance
//! plausibility check for the eventual hit claim.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{aim_direction, check_impact_on_hitbox, shot_transform, within_field_of_view};
use super::{AttackOutcome, Delivery, ResolveWorld};
use crate::combat::{
    AimTarget, AttackContext, AttackPhase, AttackRole, AttackerView, ClaimRejection,
    HitClaimRecord, HitValidationState,
};
use crate::constants::{
    DESTINATION_ALIGNMENT_THRESHOLD, MISSILE_SPEED_RATIO_SLACK, MISSILE_SPEED_TOLERANCE,
    MS_PER_SECOND,
};
use crate::physics::PhysicsBackend;
use crate::projectile::{ProjectileLaunch, TemplateRef};
use crate::target::HitboxBounds;

/// How the spawned missile sweeps for collisions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MissileHitDetection {
    #[default]
    Raycast,
    SphereCast { radius: f32 },
    BoxCast { half_extent: f32 },
}

impl MissileHitDetection {
    /// Extra reach the sweep adds around the missile centre
    pub fn radius(&self) -> f32 {
        match *self {
            MissileHitDetection::Raycast => 0.0,
            MissileHitDetection::SphereCast { radius } => radius,
            MissileHitDetection::BoxCast { half_extent } => half_extent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissileDelivery {
    /// Maximum travel distance
    pub distance: f32,
    /// Units per second
    pub speed: f32,
    #[serde(default)]
    pub hit_detection: MissileHitDetection,
    /// Splash radius around the destination
    #[serde(default)]
    pub explode_distance: Option<f32>,
    #[serde(default)]
    pub pierce_through_entities: u8,
    #[serde(default)]
    pub lock_target: bool,
    /// Full cone (degrees) in which a selected target can be locked
    pub lock_fov: f32,
    #[serde(default)]
    pub template: TemplateRef,
}

impl Default for MissileDelivery {
    fn default() -> Self {
        Self {
            distance: 40.0,
            speed: 30.0,
            hit_detection: MissileHitDetection::Raycast,
            explode_distance: None,
            pierce_through_entities: 0,
            lock_target: false,
            lock_fov: 60.0,
            template: TemplateRef::default(),
        }
    }
}

impl MissileDelivery {
    pub fn lifetime_ms(&self) -> i64 {
        ((self.distance / self.speed) * MS_PER_SECOND).ceil() as i64
    }

    /// Distance used for the range and speed checks.
    ///
    /// A missile that curved towards a locked destination is measured from
    /// the destination when it struck close to it along the launch heading.
    pub fn effective_distance(claim: &HitClaimRecord, hit_origin: Vec3, destination: Option<Vec3>) -> f32 {
        let dist = hit_origin.distance(claim.origin);
        let Some(destination) = destination else {
            return dist;
        };
        let dist_from_dest = hit_origin.distance(destination);
        let dir_from_dest = (hit_origin - destination).normalize_or_zero();
        let heading = claim.direction.normalize_or_zero();
        if dist_from_dest < dist && heading.dot(dir_from_dest) > DESTINATION_ALIGNMENT_THRESHOLD {
            dist_from_dest
        } else {
            dist
        }
    }
}

impl Delivery for MissileDelivery {
    fn max_distance(&self) -> f32 {
        self.distance
    }

    fn field_of_view(&self) -> f32 {
        self.lock_fov
    }

    fn check_hit(
        &self,
        ledger: &HitValidationState,
        claim: &HitClaimRecord,
        hitbox: &HitboxBounds,
        _physics: &dyn PhysicsBackend,
    ) -> Result<(), ClaimRejection> {
        let hit = claim.claimed_hit()?;
        let target_radius = hitbox.bounding_radius();

        let elapsed_ms = claim.elapsed_ms().unwrap_or(0);
        if elapsed_ms <= 0 {
            return Err(ClaimRejection::NonPositiveElapsed { elapsed_ms });
        }

        check_impact_on_hitbox(hit.hit_origin, hitbox, self.hit_detection.radius())?;

        let effective = Self::effective_distance(claim, hit.hit_origin, hit.hit_destination);
        let limit = self.distance + target_radius + self.hit_detection.radius();
        if effective > limit {
            return Err(ClaimRejection::OutOfRange {
                distance: effective,
                limit,
            });
        }

        if let (Some(explode), Some(destination)) = (self.explode_distance, hit.hit_destination) {
            let distance = hit.hit_origin.distance(destination);
            let limit = explode + target_radius;
            if distance > limit {
                return Err(ClaimRejection::OutsideSplash { distance, limit });
            }
        }

        let count = ledger.count(claim.hit_id());
        if count > u32::from(self.pierce_through_entities) {
            return Err(ClaimRejection::HitCountExceedsPierce {
                count,
                budget: self.pierce_through_entities,
            });
        }

        let implied_speed = f64::from(effective) * f64::from(MS_PER_SECOND) / elapsed_ms as f64;
        let ratio = implied_speed / f64::from(self.speed);
        // NaN fails this comparison too
        if !(ratio <= MISSILE_SPEED_TOLERANCE + MISSILE_SPEED_RATIO_SLACK) {
            return Err(ClaimRejection::TooFast {
                ratio: ratio as f32,
            });
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
        let frame = shot_transform(&anchor, direction);

        let lock_target = aim
            .filter(|_| self.lock_target)
            .and_then(|a| a.object.map(|object| (object, a.point)))
            .filter(|(object, point)| {
                *object != context.attacker
                    && within_field_of_view(&frame, *point, self.lock_fov, self.lock_fov)
            })
            .map(|(object, _)| object);

        let launch = ProjectileLaunch {
            key: context.key(),
            template: self.template,
            origin: anchor.translation,
            direction: direction.as_vec3(),
            speed: self.speed,
            lifetime_ms: self.lifetime_ms(),
            lock_target,
            gravity: 0.0,
            radius: self.hit_detection.radius(),
            pierce_through_entities: self.pierce_through_entities,
            launch_timestamp: context.launch_timestamp,
            destination: aim.map(|a| a.point),
        };
        launch_outcome(context, launch, world)
    }
}

/// Spawn the projectile and report the phase it leaves the attack in
pub(crate) fn launch_outcome(
    context: &AttackContext,
    launch: ProjectileLaunch,
    world: &mut ResolveWorld<'_>,
) -> AttackOutcome {
    let role = context.hit_authority.role(world.side);
    let mut outcome = AttackOutcome::new(role, launch.origin, launch.direction);
    outcome.projectile = Some(world.projectiles.spawn(launch));
    outcome.phase = match role {
        AttackRole::DetectAndCommit | AttackRole::DetectAndClaim => AttackPhase::Detecting,
        AttackRole::ValidateClaims => AttackPhase::AwaitingRemoteValidation,
        AttackRole::Observe => AttackPhase::Resolved,
    };
    outcome
}
