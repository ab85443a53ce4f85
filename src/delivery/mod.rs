//! Delivery strategies: how an attack travels and what it can hit.
//!
//! The variant set is closed. [`DeliveryStrategy`] wraps the four variants
//! and dispatches the shared [`Delivery`] contract with an exhaustive match,
//! so adding a variant is a compile error everywhere validation cares.
//!
//! Every `resolve` follows the same two steps:
//! 1. detection (enumerate every candidate for this pass)
//! 2. [`settle`]: commit damage, forward claims, or do nothing, by role
//!
//! Damage is never applied while candidates are still being enumerated.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::{
    AimTarget, AttackContext, AttackPhase, AttackRole, AttackerView, ClaimRejection, ClaimedHit,
    DamageApplier, DamagePayload, DamageSink, HitClaimRecord, HitValidationState, Side, VisitedSet,
};
use crate::constants::{FOV_TOLERANCE_DEGREES, IMPACT_SURFACE_TOLERANCE};
use crate::net::{ClaimSink, SubmitHitClaim};
use crate::physics::{ObjectId, PhysicsBackend};
use crate::projectile::{ProjectileHandle, ProjectileSpawner};
use crate::spread::SpreadOffset;
use crate::target::{HitboxBounds, TargetRegistry};

pub mod melee;
pub mod missile;
pub mod raycast;
pub mod throwable;

pub use melee::MeleeDelivery;
pub use missile::{MissileDelivery, MissileHitDetection};
pub use raycast::RaycastDelivery;
pub use throwable::ThrowableDelivery;

// ============================================================================
// Shared contract
// ============================================================================

pub trait Delivery {
    /// Where the attack leaves the attacker, oriented with the attacker
    fn damage_origin(&self, attacker: &AttackerView, is_off_hand: bool) -> Transform {
        attacker.anchor(is_off_hand)
    }

    fn max_distance(&self) -> f32;

    /// Full cone angle in degrees
    fn field_of_view(&self) -> f32;

    /// Anti-cheat judgement of one claim, with the reason when it fails
    fn check_hit(
        &self,
        ledger: &HitValidationState,
        claim: &HitClaimRecord,
        hitbox: &HitboxBounds,
        physics: &dyn PhysicsBackend,
    ) -> Result<(), ClaimRejection>;

    fn is_hit_plausible(
        &self,
        ledger: &HitValidationState,
        claim: &HitClaimRecord,
        hitbox: &HitboxBounds,
        physics: &dyn PhysicsBackend,
    ) -> bool {
        self.check_hit(ledger, claim, hitbox, physics).is_ok()
    }

    fn resolve(
        &self,
        attacker: &AttackerView,
        context: &AttackContext,
        aim: Option<AimTarget>,
        world: &mut ResolveWorld<'_>,
    ) -> AttackOutcome;
}

/// Tagged delivery variant, as stored in the weapon catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeliveryStrategy {
    Melee(MeleeDelivery),
    Raycast(RaycastDelivery),
    Missile(MissileDelivery),
    Throwable(ThrowableDelivery),
}

impl DeliveryStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryStrategy::Melee(_) => "melee",
            DeliveryStrategy::Raycast(_) => "raycast",
            DeliveryStrategy::Missile(_) => "missile",
            DeliveryStrategy::Throwable(_) => "throwable",
        }
    }

    /// Sanity check of the tuning values
    pub fn validate(&self) -> Result<(), String> {
        let finite_positive = |name: &str, v: f32| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(format!("{name} must be finite and > 0, got {v}"))
            }
        };
        let fov = |name: &str, v: f32| {
            if v.is_finite() && v > 0.0 && v <= 360.0 {
                Ok(())
            } else {
                Err(format!("{name} must be in (0, 360], got {v}"))
            }
        };
        match self {
            DeliveryStrategy::Melee(m) => {
                finite_positive("distance", m.distance)?;
                fov("horizontal_fov", m.horizontal_fov)?;
                fov("vertical_fov", m.vertical_fov)
            }
            DeliveryStrategy::Raycast(r) => finite_positive("distance", r.distance),
            DeliveryStrategy::Missile(m) => {
                finite_positive("distance", m.distance)?;
                finite_positive("speed", m.speed)?;
                if let Some(explode) = m.explode_distance {
                    if !(explode.is_finite() && explode >= 0.0) {
                        return Err(format!("explode_distance must be >= 0, got {explode}"));
                    }
                }
                let radius = m.hit_detection.radius();
                if !(radius.is_finite() && radius >= 0.0) {
                    return Err(format!("hit detection radius must be >= 0, got {radius}"));
                }
                fov("lock_fov", m.lock_fov)
            }
            DeliveryStrategy::Throwable(t) => {
                finite_positive("distance", t.distance)?;
                finite_positive("throw_speed", t.throw_speed)?;
                if !(t.gravity.is_finite() && t.gravity >= 0.0) {
                    return Err(format!("gravity must be >= 0, got {}", t.gravity));
                }
                if t.lifetime_ms <= 0 {
                    return Err(format!("lifetime_ms must be > 0, got {}", t.lifetime_ms));
                }
                Ok(())
            }
        }
    }
}

impl Delivery for DeliveryStrategy {
    fn damage_origin(&self, attacker: &AttackerView, is_off_hand: bool) -> Transform {
        match self {
            DeliveryStrategy::Melee(d) => d.damage_origin(attacker, is_off_hand),
            DeliveryStrategy::Raycast(d) => d.damage_origin(attacker, is_off_hand),
            DeliveryStrategy::Missile(d) => d.damage_origin(attacker, is_off_hand),
            DeliveryStrategy::Throwable(d) => d.damage_origin(attacker, is_off_hand),
        }
    }

    fn max_distance(&self) -> f32 {
        match self {
            DeliveryStrategy::Melee(d) => d.max_distance(),
            DeliveryStrategy::Raycast(d) => d.max_distance(),
            DeliveryStrategy::Missile(d) => d.max_distance(),
            DeliveryStrategy::Throwable(d) => d.max_distance(),
        }
    }

    fn field_of_view(&self) -> f32 {
        match self {
            DeliveryStrategy::Melee(d) => d.field_of_view(),
            DeliveryStrategy::Raycast(d) => d.field_of_view(),
            DeliveryStrategy::Missile(d) => d.field_of_view(),
            DeliveryStrategy::Throwable(d) => d.field_of_view(),
        }
    }

    fn check_hit(
        &self,
        ledger: &HitValidationState,
        claim: &HitClaimRecord,
        hitbox: &HitboxBounds,
        physics: &dyn PhysicsBackend,
    ) -> Result<(), ClaimRejection> {
        match self {
            DeliveryStrategy::Melee(d) => d.check_hit(ledger, claim, hitbox, physics),
            DeliveryStrategy::Raycast(d) => d.check_hit(ledger, claim, hitbox, physics),
            DeliveryStrategy::Missile(d) => d.check_hit(ledger, claim, hitbox, physics),
            DeliveryStrategy::Throwable(d) => d.check_hit(ledger, claim, hitbox, physics),
        }
    }

    fn resolve(
        &self,
        attacker: &AttackerView,
        context: &AttackContext,
        aim: Option<AimTarget>,
        world: &mut ResolveWorld<'_>,
    ) -> AttackOutcome {
        match self {
            DeliveryStrategy::Melee(d) => d.resolve(attacker, context, aim, world),
            DeliveryStrategy::Raycast(d) => d.resolve(attacker, context, aim, world),
            DeliveryStrategy::Missile(d) => d.resolve(attacker, context, aim, world),
            DeliveryStrategy::Throwable(d) => d.resolve(attacker, context, aim, world),
        }
    }
}

// ============================================================================
// Resolution plumbing
// ============================================================================

/// Collaborators one resolution talks to
pub struct ResolveWorld<'a> {
    pub side: Side,
    /// Local clock, stamped on outgoing claims
    pub now_ms: i64,
    pub physics: &'a dyn PhysicsBackend,
    pub targets: &'a mut dyn TargetRegistry,
    pub damage: &'a mut dyn DamageSink,
    pub claims: &'a mut dyn ClaimSink,
    pub projectiles: &'a mut dyn ProjectileSpawner,
}

/// One detected candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strike {
    pub object: ObjectId,
    pub hitbox_index: u8,
    pub point: Vec3,
    pub distance: f32,
}

/// What one `resolve` call did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub role: AttackRole,
    pub phase: AttackPhase,
    pub origin: Vec3,
    pub direction: Vec3,
    /// Every candidate found in the detection pass, nearest first
    pub strikes: Vec<Strike>,
    /// Targets damaged by this side
    pub damaged: Vec<ObjectId>,
    pub claims_sent: usize,
    pub projectile: Option<ProjectileHandle>,
}

impl AttackOutcome {
    fn new(role: AttackRole, origin: Vec3, direction: Vec3) -> Self {
        Self {
            role,
            phase: AttackPhase::Launched,
            origin,
            direction,
            strikes: Vec::new(),
            damaged: Vec::new(),
            claims_sent: 0,
            projectile: None,
        }
    }
}

/// Aim direction from `origin`: towards the aim point when there is one,
/// else the origin's forward, then turned by the spread offset
/// (yaw `dx`, pitch `dy`, degrees).
pub fn aim_direction(origin: &Transform, aim: Option<AimTarget>, offset: SpreadOffset) -> Dir3 {
    let base = aim
        .and_then(|a| Dir3::new(a.point - origin.translation).ok())
        .unwrap_or_else(|| origin.forward());
    if offset.dx == 0.0 && offset.dy == 0.0 {
        return base;
    }
    let facing = Transform::IDENTITY.looking_to(base, Vec3::Y).rotation;
    let turn = Quat::from_euler(
        EulerRot::YXZ,
        offset.dx.to_radians(),
        offset.dy.to_radians(),
        0.0,
    );
    Dir3::new(facing * turn * Vec3::NEG_Z).unwrap_or(base)
}

/// Shot frame: origin position, facing the aim direction
pub fn shot_transform(origin: &Transform, direction: Dir3) -> Transform {
    Transform::from_translation(origin.translation).looking_to(direction, Vec3::Y)
}

/// Horizontal / vertical angle test of `point` in `frame`'s local space.
/// FOVs are full cone angles in degrees.
pub fn within_field_of_view(
    frame: &Transform,
    point: Vec3,
    horizontal_fov: f32,
    vertical_fov: f32,
) -> bool {
    let local = frame.rotation.inverse() * (point - frame.translation);
    if local.length_squared() <= f32::EPSILON {
        return true;
    }
    let forward = -local.z;
    let horizontal = local.x.atan2(forward).to_degrees().abs();
    let vertical = local
        .y
        .atan2(local.x.hypot(forward))
        .to_degrees()
        .abs();
    horizontal <= horizontal_fov * 0.5 + FOV_TOLERANCE_DEGREES
        && vertical <= vertical_fov * 0.5 + FOV_TOLERANCE_DEGREES
}

/// The claimed impact must lie on the struck hitbox, give or take
/// [`IMPACT_SURFACE_TOLERANCE`] plus `reach`.
pub(crate) fn check_impact_on_hitbox(
    hit_origin: Vec3,
    hitbox: &HitboxBounds,
    reach: f32,
) -> Result<(), ClaimRejection> {
    let distance = hitbox.closest_point(hit_origin).distance(hit_origin);
    let limit = IMPACT_SURFACE_TOLERANCE + reach;
    if distance > limit {
        return Err(ClaimRejection::ImpactOffTarget { distance, limit });
    }
    Ok(())
}

/// Alive, damageable by `attacker`, and not the attacker itself
pub(crate) fn strikeable(targets: &dyn TargetRegistry, object: ObjectId, attacker: ObjectId) -> bool {
    object != attacker
        && targets.target(object).is_some_and(|t| t.alive)
        && targets.can_receive_damage_from(object, attacker)
}

/// Act on a finished detection pass according to this side's role.
pub fn settle(
    context: &AttackContext,
    strikes: Vec<Strike>,
    origin: Vec3,
    direction: Vec3,
    world: &mut ResolveWorld<'_>,
) -> AttackOutcome {
    let role = context.hit_authority.role(world.side);
    let mut outcome = AttackOutcome::new(role, origin, direction);

    match role {
        AttackRole::DetectAndCommit => {
            outcome.phase = AttackPhase::Detecting;
            let mut visited = VisitedSet::new();
            let mut applier = DamageApplier::new(&mut *world.targets, &mut *world.damage, true);
            for strike in &strikes {
                let payload =
                    DamagePayload::roll(context, strike.object, strike.point, strike.hitbox_index);
                if applier.apply_once(&mut visited, strike.object, &payload) {
                    outcome.damaged.push(strike.object);
                }
            }
            outcome.phase = AttackPhase::Resolved;
        }
        AttackRole::DetectAndClaim => {
            outcome.phase = AttackPhase::Detecting;
            let launch = HitClaimRecord::launch(context, origin, direction);
            for strike in &strikes {
                let claim = launch.with_hit(ClaimedHit {
                    hit_timestamp: world.now_ms,
                    hit_object_id: strike.object,
                    hitbox_index: strike.hitbox_index,
                    hit_origin: strike.point,
                    hit_destination: None,
                });
                world.claims.submit(SubmitHitClaim {
                    attacker: context.attacker,
                    claim,
                });
                outcome.claims_sent += 1;
            }
            outcome.phase = if outcome.claims_sent > 0 {
                AttackPhase::AwaitingRemoteValidation
            } else {
                AttackPhase::Resolved
            };
        }
        AttackRole::ValidateClaims => {
            outcome.phase = AttackPhase::AwaitingRemoteValidation;
        }
        AttackRole::Observe => {
            outcome.phase = AttackPhase::Resolved;
        }
    }

    debug!(
        attacker = ?context.attacker,
        ?role,
        candidates = strikes.len(),
        damaged = outcome.damaged.len(),
        claims = outcome.claims_sent,
        "attack resolved"
    );
    outcome.strikes = strikes;
    outcome
}
