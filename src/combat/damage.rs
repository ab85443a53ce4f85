//! At-most-once damage application.
//!
//! The visited set is attack-scoped: built for one resolution (or one
//! projectile lifetime / one authoritative session) and dropped with it.

use std::collections::HashSet;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{AttackContext, DamageKind, SkillRef, WeaponRef};
use crate::constants::LEVEL_DAMAGE_STEP;
use crate::physics::ObjectId;
use crate::spread::spread_rng;
use crate::target::TargetRegistry;

/// Append-only set of object ids already damaged by this attack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet {
    ids: HashSet<ObjectId>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns false when `id` was already present
    pub fn insert(&mut self, id: ObjectId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.ids.iter()
    }
}

/// Damage handed to the entity layer for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamagePayload {
    pub instigator: ObjectId,
    pub weapon: WeaponRef,
    pub skill: Option<SkillRef>,
    pub level: u16,
    /// Rolled amount per damage kind, before target modifiers
    pub amounts: Vec<(DamageKind, f32)>,
    pub hit_point: Vec3,
    pub hitbox_index: u8,
}

impl DamagePayload {
    /// Deterministic roll of the context's damage ranges for one target.
    pub fn roll(context: &AttackContext, target: ObjectId, hit_point: Vec3, hitbox_index: u8) -> Self {
        // Fold the high half in so ids differing only above bit 31 roll apart
        let folded = (target.0 ^ (target.0 >> 32)) as i32;
        let mut rng = spread_rng(
            context.simulate_seed ^ folded,
            context.trigger_index,
            context.spread_index,
        );
        let level_scale = 1.0 + f32::from(context.level.saturating_sub(1)) * LEVEL_DAMAGE_STEP;
        let amounts = context
            .damage_amounts
            .iter()
            .map(|(kind, range)| {
                let unit: f32 = rng.gen();
                (*kind, range.roll(unit) * level_scale)
            })
            .collect();

        Self {
            instigator: context.attacker,
            weapon: context.weapon,
            skill: context.skill,
            level: context.level,
            amounts,
            hit_point,
            hitbox_index,
        }
    }

    pub fn total(&self) -> f32 {
        self.amounts.iter().map(|(_, amount)| amount).sum()
    }
}

/// Hand-off to reward/loot, buff and VFX collaborators
#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageDealt {
    pub target: ObjectId,
    pub instigator: ObjectId,
    /// Final amount after target modifiers
    pub amount: f32,
    pub weapon: WeaponRef,
    pub skill: Option<SkillRef>,
    pub hit_point: Vec3,
    pub killed: bool,
}

pub trait DamageSink {
    fn damage_dealt(&mut self, dealt: DamageDealt);
}

impl DamageSink for Vec<DamageDealt> {
    fn damage_dealt(&mut self, dealt: DamageDealt) {
        self.push(dealt);
    }
}

/// Apply `payload` to `target` unless it is already in `visited`.
///
/// Missing or dead targets are skipped and left out of the set. Returns true
/// only when damage was committed.
pub fn apply_once(
    visited: &mut VisitedSet,
    target: ObjectId,
    payload: &DamagePayload,
    registry: &mut dyn TargetRegistry,
    sink: &mut dyn DamageSink,
) -> bool {
    if visited.contains(target) {
        trace!(?target, "already damaged by this attack");
        return false;
    }
    match registry.target(target) {
        Some(info) if info.alive => {}
        _ => {
            trace!(?target, "target missing or dead, skipped");
            return false;
        }
    }
    visited.insert(target);

    let Some(receipt) = registry.receive_damage(target, payload) else {
        return false;
    };
    debug!(
        ?target,
        instigator = ?payload.instigator,
        amount = receipt.amount,
        killed = receipt.killed,
        "damage applied"
    );
    sink.damage_dealt(DamageDealt {
        target,
        instigator: payload.instigator,
        amount: receipt.amount,
        weapon: payload.weapon,
        skill: payload.skill,
        hit_point: payload.hit_point,
        killed: receipt.killed,
    });
    true
}

/// [`apply_once`] behind an authority gate.
///
/// Only the side that commits damage may mutate targets; everywhere else
/// `apply_once` is a no-op that leaves the visited set untouched.
pub struct DamageApplier<'a> {
    registry: &'a mut dyn TargetRegistry,
    sink: &'a mut dyn DamageSink,
    authoritative: bool,
}

impl<'a> DamageApplier<'a> {
    pub fn new(
        registry: &'a mut dyn TargetRegistry,
        sink: &'a mut dyn DamageSink,
        authoritative: bool,
    ) -> Self {
        Self {
            registry,
            sink,
            authoritative,
        }
    }

    pub fn apply_once(
        &mut self,
        visited: &mut VisitedSet,
        target: ObjectId,
        payload: &DamagePayload,
    ) -> bool {
        if !self.authoritative {
            return false;
        }
        apply_once(visited, target, payload, &mut *self.registry, &mut *self.sink)
    }
}
