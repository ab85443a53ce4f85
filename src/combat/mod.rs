//! Attack data model shared by every delivery strategy.
//!
//! ## Flow
//! ```text
//! AttackContext ─→ Delivery::resolve() ─┬→ DetectAndCommit: detect → apply_once → DamageDealt
//!                                       ├→ DetectAndClaim:  detect → SubmitHitClaim (fire-and-forget)
//!                                       └→ ValidateClaims:  AttackSession ← SubmitHitClaim
//!                                                             └→ HitValidator → ledger → apply_once
//! ```

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::physics::ObjectId;
use crate::spread::{spread_in_cone, SpreadCone, SpreadOffset};

pub mod claim;
pub mod damage;
pub mod session;
pub mod validator;

pub use claim::{ClaimRejection, ClaimedHit, HitClaimRecord, HitId, HitValidationState};
pub use damage::{apply_once, DamageApplier, DamageDealt, DamagePayload, DamageSink, VisitedSet};
pub use session::{AttackKey, AttackSession, AttackSessions};
pub use validator::{ClaimVerdict, HitValidator};

// ============================================================================
// References
// ============================================================================

/// Weapon definition id (see `WeaponCatalog`)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct WeaponRef(pub u32);

/// Skill id when the attack comes from a skill rather than a basic swing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillRef(pub u32);

/// Damage type key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageKind {
    Physical,
    Fire,
    Ice,
    Lightning,
    Poison,
}

/// Inclusive damage range for one damage kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageRange {
    pub min: f32,
    pub max: f32,
}

impl DamageRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn fixed(amount: f32) -> Self {
        Self::new(amount, amount)
    }

    /// Interpolate with `unit` in [0, 1). Swapped bounds are tolerated.
    pub fn roll(&self, unit: f32) -> f32 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        lo + (hi - lo) * unit.clamp(0.0, 1.0)
    }
}

pub type DamageAmounts = BTreeMap<DamageKind, DamageRange>;

// ============================================================================
// Authority
// ============================================================================

/// Which machine is running this code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Server,
    Client,
}

/// Who performs hit detection for an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HitAuthority {
    /// Server-owned attacker (monsters, NPCs): server detects and commits
    #[default]
    Server,
    /// Player attacker: owning client detects, server validates and commits
    OwningClient,
}

/// What this side does for one attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackRole {
    /// Detect locally and apply damage directly
    DetectAndCommit,
    /// Detect locally, forward each candidate as a hit claim
    DetectAndClaim,
    /// Wait for hit claims and validate them
    ValidateClaims,
    /// Effects only
    Observe,
}

impl HitAuthority {
    pub fn role(self, side: Side) -> AttackRole {
        match (self, side) {
            (HitAuthority::Server, Side::Server) => AttackRole::DetectAndCommit,
            (HitAuthority::Server, Side::Client) => AttackRole::Observe,
            (HitAuthority::OwningClient, Side::Client) => AttackRole::DetectAndClaim,
            (HitAuthority::OwningClient, Side::Server) => AttackRole::ValidateClaims,
        }
    }
}

// ============================================================================
// Attack lifecycle
// ============================================================================

/// Per-attack state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPhase {
    Launched,
    Detecting,
    AwaitingRemoteValidation,
    Resolved,
}

impl AttackPhase {
    pub fn can_transition_to(self, next: AttackPhase) -> bool {
        use AttackPhase::*;
        matches!(
            (self, next),
            (Launched, Detecting)
                | (Launched, AwaitingRemoteValidation)
                | (Launched, Resolved)
                | (Detecting, Resolved)
                | (Detecting, AwaitingRemoteValidation)
                | (AwaitingRemoteValidation, Resolved)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == AttackPhase::Resolved
    }
}

// ============================================================================
// Attack context
// ============================================================================

/// Immutable data for one attack resolution (one sub-shot).
///
/// `(simulate_seed, trigger_index, spread_index)` is the only input to the
/// spread offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackContext {
    pub attacker: ObjectId,
    pub weapon: WeaponRef,
    pub skill: Option<SkillRef>,
    pub level: u16,
    pub damage_amounts: DamageAmounts,
    pub simulate_seed: i32,
    pub trigger_index: u8,
    pub spread_index: u8,
    pub spread_cone: SpreadCone,
    pub is_off_hand: bool,
    pub hit_authority: HitAuthority,
    /// Milliseconds, stamped when the attack fires
    pub launch_timestamp: i64,
}

impl AttackContext {
    pub fn new(attacker: ObjectId, weapon: WeaponRef, simulate_seed: i32) -> Self {
        Self {
            attacker,
            weapon,
            skill: None,
            level: 1,
            damage_amounts: DamageAmounts::new(),
            simulate_seed,
            trigger_index: 0,
            spread_index: 0,
            spread_cone: SpreadCone::NONE,
            is_off_hand: false,
            hit_authority: HitAuthority::Server,
            launch_timestamp: 0,
        }
    }

    pub fn with_damage(mut self, kind: DamageKind, range: DamageRange) -> Self {
        self.damage_amounts.insert(kind, range);
        self
    }

    pub fn with_indices(mut self, trigger_index: u8, spread_index: u8) -> Self {
        self.trigger_index = trigger_index;
        self.spread_index = spread_index;
        self
    }

    pub fn with_spread(mut self, cone: SpreadCone) -> Self {
        self.spread_cone = cone;
        self
    }

    pub fn with_authority(mut self, authority: HitAuthority) -> Self {
        self.hit_authority = authority;
        self
    }

    pub fn launched_at(mut self, timestamp_ms: i64) -> Self {
        self.launch_timestamp = timestamp_ms;
        self
    }

    pub fn spread_offset(&self) -> SpreadOffset {
        spread_in_cone(
            self.simulate_seed,
            self.trigger_index,
            self.spread_index,
            self.spread_cone,
        )
    }

    pub fn key(&self) -> AttackKey {
        AttackKey {
            attacker: self.attacker,
            simulate_seed: self.simulate_seed,
            trigger_index: self.trigger_index,
            spread_index: self.spread_index,
        }
    }

    pub fn hit_id(&self) -> HitId {
        HitId::derive(self.simulate_seed, self.trigger_index, self.spread_index)
    }
}

// ============================================================================
// Attacker
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    FirstPerson,
    #[default]
    ThirdPerson,
}

/// What the delivery strategies need to know about the attacker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackerView {
    pub id: ObjectId,
    pub transform: Transform,
    pub view_mode: ViewMode,
    /// Local-space anchors
    pub eye_offset: Vec3,
    pub main_hand_offset: Vec3,
    pub off_hand_offset: Vec3,
}

impl AttackerView {
    /// Attacker with every anchor at its pivot
    pub fn new(id: ObjectId, transform: Transform) -> Self {
        Self {
            id,
            transform,
            view_mode: ViewMode::ThirdPerson,
            eye_offset: Vec3::ZERO,
            main_hand_offset: Vec3::ZERO,
            off_hand_offset: Vec3::ZERO,
        }
    }

    pub fn with_eye(mut self, offset: Vec3) -> Self {
        self.eye_offset = offset;
        self
    }

    pub fn with_hands(mut self, main_hand: Vec3, off_hand: Vec3) -> Self {
        self.main_hand_offset = main_hand;
        self.off_hand_offset = off_hand;
        self
    }

    pub fn with_view(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }

    /// First person shoots from the eye, third person from the weapon hand
    pub fn anchor(&self, is_off_hand: bool) -> Transform {
        let local = match (self.view_mode, is_off_hand) {
            (ViewMode::FirstPerson, _) => self.eye_offset,
            (ViewMode::ThirdPerson, false) => self.main_hand_offset,
            (ViewMode::ThirdPerson, true) => self.off_hand_offset,
        };
        Transform::from_translation(self.transform.transform_point(local))
            .with_rotation(self.transform.rotation)
    }
}

/// Aim point, plus the pre-selected / locked target if any
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimTarget {
    pub point: Vec3,
    pub object: Option<ObjectId>,
}

impl AimTarget {
    pub fn point(point: Vec3) -> Self {
        Self {
            point,
            object: None,
        }
    }

    pub fn object(object: ObjectId, point: Vec3) -> Self {
        Self {
            point,
            object: Some(object),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles() {
        assert_eq!(
            HitAuthority::Server.role(Side::Server),
            AttackRole::DetectAndCommit
        );
        assert_eq!(HitAuthority::Server.role(Side::Client), AttackRole::Observe);
        assert_eq!(
            HitAuthority::OwningClient.role(Side::Client),
            AttackRole::DetectAndClaim
        );
        assert_eq!(
            HitAuthority::OwningClient.role(Side::Server),
            AttackRole::ValidateClaims
        );
    }

    #[test]
    fn test_phase_transitions() {
        use AttackPhase::*;
        assert!(Launched.can_transition_to(Detecting));
        assert!(Launched.can_transition_to(AwaitingRemoteValidation));
        assert!(AwaitingRemoteValidation.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(Detecting));
        assert!(!AwaitingRemoteValidation.can_transition_to(Detecting));
        assert!(Resolved.is_terminal());
    }

    #[test]
    fn test_damage_range_roll() {
        let r = DamageRange::new(10.0, 20.0);
        assert_eq!(r.roll(0.0), 10.0);
        assert!((r.roll(0.5) - 15.0).abs() < f32::EPSILON);
        let swapped = DamageRange::new(20.0, 10.0);
        assert_eq!(swapped.roll(0.0), 10.0);
        assert_eq!(DamageRange::fixed(7.0).roll(0.9), 7.0);
    }

    #[test]
    fn test_anchor_by_view_and_hand() {
        let attacker = AttackerView::new(ObjectId(1), Transform::from_xyz(10.0, 0.0, 0.0))
            .with_eye(Vec3::new(0.0, 1.6, 0.0))
            .with_hands(Vec3::new(0.4, 1.2, 0.0), Vec3::new(-0.4, 1.2, 0.0));

        assert_eq!(
            attacker.anchor(false).translation,
            Vec3::new(10.4, 1.2, 0.0)
        );
        assert_eq!(attacker.anchor(true).translation, Vec3::new(9.6, 1.2, 0.0));

        let fp = attacker.with_view(ViewMode::FirstPerson);
        assert_eq!(fp.anchor(true).translation, Vec3::new(10.0, 1.6, 0.0));
    }

    #[test]
    fn test_context_spread_is_seeded() {
        let ctx = AttackContext::new(ObjectId(1), WeaponRef(1), 42)
            .with_indices(1, 2)
            .with_spread(SpreadCone::new(3.0, 3.0));
        assert_eq!(ctx.spread_offset(), ctx.clone().spread_offset());
        assert_eq!(ctx.key().spread_index, 2);
    }
}
