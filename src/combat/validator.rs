//! Server-side hit validator.
//!
//! Re-derives what it can from a claim and the delivery strategy's rules.
//! Rejections are dropped silently (a `debug!` line, nothing more): false
//! negatives under packet loss are acceptable, false positives are not.

use tracing::debug;

use super::claim::{ClaimRejection, HitClaimRecord, HitId, HitValidationState};
use super::damage::{DamageDealt, DamagePayload, DamageSink, VisitedSet};
use super::{apply_once, AttackContext};
use crate::delivery::{Delivery, DeliveryStrategy};
use crate::physics::{ObjectId, PhysicsBackend};
use crate::target::{HitboxBounds, TargetRegistry};

/// Result of feeding one claim through the validator
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimVerdict {
    /// Plausible and damage committed
    Accepted(DamageDealt),
    /// Plausible, but the target was already damaged by this attack
    Duplicate(ObjectId),
    /// Implausible or malformed, dropped
    Rejected(ClaimRejection),
}

impl ClaimVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ClaimVerdict::Accepted(_))
    }
}

/// A claim that passed every check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedHit {
    pub hit_id: HitId,
    pub target: ObjectId,
    pub hitbox: HitboxBounds,
}

pub struct HitValidator<'a> {
    physics: &'a dyn PhysicsBackend,
}

impl<'a> HitValidator<'a> {
    pub fn new(physics: &'a dyn PhysicsBackend) -> Self {
        Self { physics }
    }

    /// Plausibility judgement only; touches no state.
    pub fn judge(
        &self,
        strategy: &DeliveryStrategy,
        ledger: &HitValidationState,
        instigator: ObjectId,
        claim: &HitClaimRecord,
        targets: &dyn TargetRegistry,
    ) -> Result<ValidatedHit, ClaimRejection> {
        let hit = claim.claimed_hit()?;
        let target = hit.hit_object_id;

        let info = targets
            .target(target)
            .ok_or(ClaimRejection::UnknownTarget(target))?;
        if !info.alive {
            return Err(ClaimRejection::TargetDead(target));
        }
        if !targets.can_receive_damage_from(target, instigator) {
            return Err(ClaimRejection::TargetImmune(target));
        }
        let hitbox = targets
            .hitbox(target, hit.hitbox_index)
            .ok_or(ClaimRejection::UnknownHitbox {
                target,
                index: hit.hitbox_index,
            })?;

        strategy.check_hit(ledger, claim, &hitbox, self.physics)?;

        Ok(ValidatedHit {
            hit_id: claim.hit_id(),
            target,
            hitbox,
        })
    }

    /// Judge, bump the ledger on acceptance, then apply damage at most once.
    #[allow(clippy::too_many_arguments)]
    pub fn validate(
        &self,
        strategy: &DeliveryStrategy,
        context: &AttackContext,
        ledger: &mut HitValidationState,
        visited: &mut VisitedSet,
        claim: &HitClaimRecord,
        targets: &mut dyn TargetRegistry,
        sink: &mut dyn DamageSink,
    ) -> ClaimVerdict {
        let validated = match self.judge(strategy, ledger, context.attacker, claim, &*targets) {
            Ok(v) => v,
            Err(reason) => {
                debug!(attacker = ?context.attacker, %reason, "hit claim rejected");
                return ClaimVerdict::Rejected(reason);
            }
        };
        ledger.record(validated.hit_id);

        let hit_point = claim
            .hit
            .map(|h| h.hit_origin)
            .unwrap_or(validated.hitbox.center);
        let hitbox_index = claim.hit.map(|h| h.hitbox_index).unwrap_or(0);
        let payload = DamagePayload::roll(context, validated.target, hit_point, hitbox_index);

        let mut dealt = Vec::with_capacity(1);
        if apply_once(visited, validated.target, &payload, targets, &mut dealt) {
            if let Some(event) = dealt.pop() {
                sink.damage_dealt(event.clone());
                return ClaimVerdict::Accepted(event);
            }
        }
        ClaimVerdict::Duplicate(validated.target)
    }
}
