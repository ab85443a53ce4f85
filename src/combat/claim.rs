//! Hit claim records and the per-attack validation ledger.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

use super::AttackContext;
use crate::physics::ObjectId;

/// Stable identifier of one logical hit event (one sub-shot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitId(pub u64);

impl HitId {
    /// Deterministic hash of the sub-shot triple
    pub fn derive(simulate_seed: i32, trigger_index: u8, spread_index: u8) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(simulate_seed.to_le_bytes());
        hasher.update([trigger_index, spread_index]);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(bytes))
    }
}

/// Hit part of a claim, filled once a candidate hit is detected
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClaimedHit {
    pub hit_timestamp: i64,
    pub hit_object_id: ObjectId,
    pub hitbox_index: u8,
    /// Claimed point of impact
    pub hit_origin: Vec3,
    /// Projectile's intended target point (missiles)
    pub hit_destination: Option<Vec3>,
}

/// Wire payload describing one candidate hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitClaimRecord {
    pub simulate_seed: i32,
    pub trigger_index: u8,
    pub spread_index: u8,
    pub launch_timestamp: i64,
    pub origin: Vec3,
    pub direction: Vec3,
    pub hit: Option<ClaimedHit>,
}

impl HitClaimRecord {
    /// Record created when the attack fires
    pub fn launch(context: &AttackContext, origin: Vec3, direction: Vec3) -> Self {
        Self {
            simulate_seed: context.simulate_seed,
            trigger_index: context.trigger_index,
            spread_index: context.spread_index,
            launch_timestamp: context.launch_timestamp,
            origin,
            direction,
            hit: None,
        }
    }

    /// Copy of this record carrying a confirmed hit
    pub fn with_hit(&self, hit: ClaimedHit) -> Self {
        Self {
            hit: Some(hit),
            ..self.clone()
        }
    }

    pub fn hit_id(&self) -> HitId {
        HitId::derive(self.simulate_seed, self.trigger_index, self.spread_index)
    }

    /// The claimed hit, if the record is well formed
    pub fn claimed_hit(&self) -> Result<&ClaimedHit, ClaimRejection> {
        let hit = self.hit.as_ref().ok_or(ClaimRejection::MissingHit)?;
        let finite = self.origin.is_finite()
            && self.direction.is_finite()
            && hit.hit_origin.is_finite()
            && hit.hit_destination.map_or(true, |d| d.is_finite());
        if !finite {
            return Err(ClaimRejection::NonFinite);
        }
        Ok(hit)
    }

    pub fn elapsed_ms(&self) -> Option<i64> {
        self.hit
            .as_ref()
            .and_then(|h| h.hit_timestamp.checked_sub(self.launch_timestamp))
    }
}

/// Why a claim was dropped. Never surfaces as a failure; the only visible
/// effect of a rejection is the missing damage event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClaimRejection {
    #[error("claim carries no hit")]
    MissingHit,
    #[error("claim geometry is not finite")]
    NonFinite,
    #[error("non-positive flight time: {elapsed_ms}ms")]
    NonPositiveElapsed { elapsed_ms: i64 },
    #[error("no open attack session for claim")]
    UnknownSession,
    #[error("unknown target {0:?}")]
    UnknownTarget(ObjectId),
    #[error("target {0:?} is dead")]
    TargetDead(ObjectId),
    #[error("target {0:?} cannot be damaged by this attacker")]
    TargetImmune(ObjectId),
    #[error("target {target:?} has no hitbox {index}")]
    UnknownHitbox { target: ObjectId, index: u8 },
    #[error("single-target attack already struck ({count} hits)")]
    AlreadyStruck { count: u32 },
    #[error("{obstacles} obstacles between origin and impact, pierce budget {budget}")]
    ObstaclesExceedPierce { obstacles: usize, budget: u8 },
    #[error("hit count {count} exceeds pierce budget {budget}")]
    HitCountExceedsPierce { count: u32, budget: u8 },
    #[error("claimed impact {distance:.2} from the hitbox, limit {limit:.2}")]
    ImpactOffTarget { distance: f32, limit: f32 },
    #[error("travel distance {distance:.2} exceeds limit {limit:.2}")]
    OutOfRange { distance: f32, limit: f32 },
    #[error("impact {distance:.2} from destination exceeds splash limit {limit:.2}")]
    OutsideSplash { distance: f32, limit: f32 },
    #[error("implied speed ratio {ratio:.3} over tolerance")]
    TooFast { ratio: f32 },
}

/// Per-attack count of accepted hits per hit identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitValidationState {
    counts: HashMap<HitId, u32>,
}

impl HitValidationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted hits so far (zero when unseen)
    pub fn count(&self, id: HitId) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Bump after an accepted hit, returns the new count
    pub fn record(&mut self, id: HitId) -> u32 {
        let count = self.counts.entry(id).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::WeaponRef;

    fn claim() -> HitClaimRecord {
        let ctx = AttackContext::new(ObjectId(1), WeaponRef(1), 42).launched_at(1000);
        HitClaimRecord::launch(&ctx, Vec3::ZERO, Vec3::NEG_Z)
    }

    fn hit(ts: i64, at: Vec3) -> ClaimedHit {
        ClaimedHit {
            hit_timestamp: ts,
            hit_object_id: ObjectId(2),
            hitbox_index: 0,
            hit_origin: at,
            hit_destination: None,
        }
    }

    #[test]
    fn test_hit_id_deterministic_and_distinct() {
        assert_eq!(HitId::derive(42, 0, 0), HitId::derive(42, 0, 0));
        assert_ne!(HitId::derive(42, 0, 0), HitId::derive(42, 0, 1));
        assert_ne!(HitId::derive(42, 1, 0), HitId::derive(42, 0, 1));
        assert_ne!(HitId::derive(42, 0, 0), HitId::derive(43, 0, 0));
    }

    #[test]
    fn test_launch_record_has_no_hit() {
        let c = claim();
        assert_eq!(c.launch_timestamp, 1000);
        assert_eq!(c.claimed_hit(), Err(ClaimRejection::MissingHit));
        assert_eq!(c.elapsed_ms(), None);
    }

    #[test]
    fn test_with_hit_keeps_launch_data() {
        let c = claim().with_hit(hit(1500, Vec3::new(0.0, 0.0, -15.0)));
        assert_eq!(c.elapsed_ms(), Some(500));
        assert_eq!(c.hit_id(), HitId::derive(42, 0, 0));
        assert!(c.claimed_hit().is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        let c = claim().with_hit(hit(1500, Vec3::new(f32::NAN, 0.0, 0.0)));
        assert_eq!(c.claimed_hit(), Err(ClaimRejection::NonFinite));

        let mut bad_dest = hit(1500, Vec3::ZERO);
        bad_dest.hit_destination = Some(Vec3::splat(f32::INFINITY));
        assert_eq!(
            claim().with_hit(bad_dest).claimed_hit(),
            Err(ClaimRejection::NonFinite)
        );
    }

    #[test]
    fn test_ledger_counts() {
        let mut ledger = HitValidationState::new();
        let id = HitId::derive(1, 0, 0);
        assert_eq!(ledger.count(id), 0);
        assert_eq!(ledger.record(id), 1);
        assert_eq!(ledger.record(id), 2);
        assert_eq!(ledger.count(id), 2);
        assert_eq!(ledger.count(HitId::derive(1, 0, 1)), 0);
        ledger.reset();
        assert!(ledger.is_empty());
    }
}
