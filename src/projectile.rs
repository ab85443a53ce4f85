//! Projectile hand-off and flight.
//!
//! Missile and throwable `resolve` only compute launch geometry and hand a
//! [`ProjectileLaunch`] to the spawner. The spawned entity is stepped every
//! tick by [`ProjectileFlight::step`]; an impact re-enters the core through
//! [`ProjectileFlight::settle_impact`] as an independent event.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::combat::{
    apply_once, AttackContext, AttackKey, AttackRole, ClaimedHit, DamagePayload, HitClaimRecord,
    VisitedSet,
};
use crate::constants::MISSILE_TURN_RATE;
use crate::delivery::{strikeable, ResolveWorld};
use crate::net::SubmitHitClaim;
use crate::physics::{ObjectId, PhysicsBackend, PhysicsLayers};
use crate::target::TargetRegistry;

/// Velocity kept after a throwable bounces off an obstacle
pub const BOUNCE_DECAY: f32 = 0.6;

/// Nudge off a surface after a bounce so the next sweep starts outside it
const SURFACE_EPSILON: f32 = 0.01;

/// Damage-entity template (visual prefab) reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TemplateRef(pub u32);

/// Handle returned by the spawner for a launched projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileHandle(pub u64);

/// Everything the spawned entity needs to fly on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileLaunch {
    pub key: AttackKey,
    pub template: TemplateRef,
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub lifetime_ms: i64,
    pub lock_target: Option<ObjectId>,
    /// Downward acceleration, 0 for missiles
    pub gravity: f32,
    /// Sweep radius (sphere/box cast); 0 is a plain ray
    pub radius: f32,
    pub pierce_through_entities: u8,
    pub launch_timestamp: i64,
    /// Intended target point, echoed in claims as `hit_destination`
    pub destination: Option<Vec3>,
}

/// Asset/pool collaborator
pub trait ProjectileSpawner {
    fn spawn(&mut self, launch: ProjectileLaunch) -> ProjectileHandle;
}

impl ProjectileSpawner for Vec<ProjectileLaunch> {
    fn spawn(&mut self, launch: ProjectileLaunch) -> ProjectileHandle {
        self.push(launch);
        ProjectileHandle(self.len() as u64 - 1)
    }
}

/// Collision reported by a flying projectile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileImpact {
    pub key: AttackKey,
    pub object: ObjectId,
    pub hitbox_index: u8,
    pub point: Vec3,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightEvent {
    InFlight,
    Impact(ProjectileImpact),
    Blocked { point: Vec3 },
    Expired,
}

/// What settling an impact did on this side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactOutcome {
    Committed,
    Duplicate,
    Claimed,
    Ignored,
}

// ============================================================================
// Flight
// ============================================================================

#[derive(Debug, Clone)]
pub struct ProjectileFlight {
    pub launch: ProjectileLaunch,
    pub position: Vec3,
    pub velocity: Vec3,
    pub age_ms: i64,
    pierce_left: u8,
    struck: VisitedSet,
    /// Per-lifetime dedup for damage committed by this side
    damaged: VisitedSet,
    finished: bool,
}

impl ProjectileFlight {
    pub fn new(launch: ProjectileLaunch) -> Self {
        let velocity = launch.direction.normalize_or_zero() * launch.speed;
        Self {
            position: launch.origin,
            velocity,
            age_ms: 0,
            pierce_left: launch.pierce_through_entities,
            struck: VisitedSet::new(),
            damaged: VisitedSet::new(),
            finished: false,
            launch,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn now_ms(&self) -> i64 {
        self.launch.launch_timestamp + self.age_ms
    }

    /// Advance by `dt_ms`, sweeping against hitboxes and obstacles.
    pub fn step(
        &mut self,
        dt_ms: i64,
        physics: &dyn PhysicsBackend,
        targets: &dyn TargetRegistry,
    ) -> FlightEvent {
        if self.finished {
            return FlightEvent::Expired;
        }
        if dt_ms <= 0 {
            return FlightEvent::InFlight;
        }
        if self.age_ms >= self.launch.lifetime_ms {
            self.finished = true;
            return FlightEvent::Expired;
        }
        let dt = dt_ms as f32 / 1000.0;

        self.steer(dt, targets);
        self.velocity.y -= self.launch.gravity * dt;

        let displacement = self.velocity * dt;
        let length = displacement.length();
        let Ok(direction) = Dir3::new(displacement) else {
            self.age_ms += dt_ms;
            return FlightEvent::InFlight;
        };

        let hits = physics.raycast_sorted(
            self.position,
            direction,
            length + self.launch.radius,
            PhysicsLayers::shot_mask(),
        );
        for hit in hits {
            let along = (hit.distance - self.launch.radius).max(0.0);
            let elapsed = ((along / length) * dt_ms as f32).round() as i64;

            if hit.is_obstacle() {
                if self.launch.gravity > 0.0 {
                    let reflected = self.velocity - 2.0 * self.velocity.dot(hit.normal) * hit.normal;
                    self.velocity = reflected * BOUNCE_DECAY;
                    self.position = hit.point + hit.normal * SURFACE_EPSILON;
                    self.age_ms += dt_ms;
                    trace!(key = ?self.launch.key, "throwable bounced");
                    return FlightEvent::InFlight;
                }
                self.finished = true;
                return FlightEvent::Blocked { point: hit.point };
            }
            if self.struck.contains(hit.object)
                || !strikeable(targets, hit.object, self.launch.key.attacker)
            {
                continue;
            }
            self.struck.insert(hit.object);
            self.position = hit.point;
            self.age_ms += elapsed;
            if self.pierce_left == 0 {
                self.finished = true;
            } else {
                self.pierce_left -= 1;
            }
            return FlightEvent::Impact(ProjectileImpact {
                key: self.launch.key,
                object: hit.object,
                hitbox_index: hit.hitbox_index,
                point: hit.point,
                timestamp_ms: self.now_ms(),
            });
        }

        self.position += displacement;
        self.age_ms += dt_ms;
        FlightEvent::InFlight
    }

    /// Bounded turn towards the locked target
    fn steer(&mut self, dt: f32, targets: &dyn TargetRegistry) {
        let Some(lock) = self.launch.lock_target else {
            return;
        };
        let Some(target) = targets.target(lock).filter(|t| t.alive) else {
            return;
        };
        let speed = self.velocity.length();
        let current = self.velocity.normalize_or_zero();
        let desired = (target.position - self.position).normalize_or_zero();
        if current == Vec3::ZERO || desired == Vec3::ZERO {
            return;
        }
        let max_turn = MISSILE_TURN_RATE * dt;
        let angle = current.angle_between(desired);
        let heading = if angle <= max_turn {
            desired
        } else {
            let axis = current.cross(desired).normalize_or_zero();
            if axis == Vec3::ZERO {
                current
            } else {
                Quat::from_axis_angle(axis, max_turn) * current
            }
        };
        self.velocity = heading * speed;
    }

    /// Act on an impact by role: commit on the authoritative side, forward a
    /// claim carrying the launch destination from the owning client.
    pub fn settle_impact(
        &mut self,
        context: &AttackContext,
        impact: &ProjectileImpact,
        world: &mut ResolveWorld<'_>,
    ) -> ImpactOutcome {
        match context.hit_authority.role(world.side) {
            AttackRole::DetectAndCommit => {
                let payload =
                    DamagePayload::roll(context, impact.object, impact.point, impact.hitbox_index);
                if apply_once(
                    &mut self.damaged,
                    impact.object,
                    &payload,
                    &mut *world.targets,
                    &mut *world.damage,
                ) {
                    ImpactOutcome::Committed
                } else {
                    ImpactOutcome::Duplicate
                }
            }
            AttackRole::DetectAndClaim => {
                let claim = self.claim_for(context, impact);
                world.claims.submit(SubmitHitClaim {
                    attacker: context.attacker,
                    claim,
                });
                debug!(key = ?impact.key, object = ?impact.object, "projectile hit claimed");
                ImpactOutcome::Claimed
            }
            AttackRole::ValidateClaims | AttackRole::Observe => ImpactOutcome::Ignored,
        }
    }

    /// Hit claim for an impact of this projectile
    pub fn claim_for(&self, context: &AttackContext, impact: &ProjectileImpact) -> HitClaimRecord {
        let mut record =
            HitClaimRecord::launch(context, self.launch.origin, self.launch.direction);
        record.launch_timestamp = self.launch.launch_timestamp;
        record.with_hit(ClaimedHit {
            hit_timestamp: impact.timestamp_ms,
            hit_object_id: impact.object,
            hitbox_index: impact.hitbox_index,
            hit_origin: impact.point,
            hit_destination: self.launch.destination,
        })
    }
}
