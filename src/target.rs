//! Target / hitbox collaborator.
//!
//! Faction, duel and ally rules plus armor/resistance maths belong to the
//! entity layer. The core only calls through [`TargetRegistry`].

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::damage::DamagePayload;
use crate::combat::DamageKind;
use crate::physics::{ObjectId, Shape};

/// Liveness and position of a damageable object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub id: ObjectId,
    pub position: Vec3,
    pub alive: bool,
}

/// World-space bounds of one hitbox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitboxBounds {
    pub center: Vec3,
    pub shape: Shape,
}

impl HitboxBounds {
    pub fn bounding_radius(&self) -> f32 {
        self.shape.bounding_radius()
    }

    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        self.shape.closest_point(self.center, point)
    }
}

/// What the entity layer reports back after damage was subtracted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageReceipt {
    pub amount: f32,
    pub killed: bool,
}

pub trait TargetRegistry {
    fn target(&self, id: ObjectId) -> Option<TargetInfo>;

    fn hitbox(&self, id: ObjectId, hitbox_index: u8) -> Option<HitboxBounds>;

    /// Opaque faction/duel/ally predicate
    fn can_receive_damage_from(&self, target: ObjectId, instigator: ObjectId) -> bool;

    /// Apply resistance/armor modifiers and subtract health.
    /// `None` when the target vanished in the meantime.
    fn receive_damage(&mut self, target: ObjectId, payload: &DamagePayload)
        -> Option<DamageReceipt>;
}

// ============================================================================
// In-memory registry
// ============================================================================

/// Hitbox relative to the owning target's position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitboxDef {
    pub offset: Vec3,
    pub shape: Shape,
}

impl HitboxDef {
    pub fn sphere(radius: f32) -> Self {
        Self {
            offset: Vec3::ZERO,
            shape: Shape::Sphere { radius },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetState {
    pub position: Vec3,
    pub hitboxes: Vec<HitboxDef>,
    pub health: f32,
    pub max_health: f32,
    /// Flat reduction after resistances
    pub armor: f32,
    /// Fraction of each damage kind ignored (0.0 - 1.0)
    pub resistances: HashMap<DamageKind, f32>,
    pub faction: u32,
}

impl TargetState {
    pub fn new(position: Vec3, max_health: f32, faction: u32) -> Self {
        Self {
            position,
            hitboxes: vec![HitboxDef::sphere(0.5)],
            health: max_health,
            max_health,
            armor: 0.0,
            resistances: HashMap::new(),
            faction,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Resistance per kind, then flat armor, never below zero
    pub fn mitigate(&self, payload: &DamagePayload) -> f32 {
        let raw: f32 = payload
            .amounts
            .iter()
            .map(|(kind, amount)| {
                let resist = self
                    .resistances
                    .get(kind)
                    .copied()
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0);
                amount * (1.0 - resist)
            })
            .sum();
        (raw - self.armor).max(0.0)
    }
}

/// Simple table of damageable objects keyed by id
#[derive(Debug, Clone, Default)]
pub struct TargetTable {
    targets: HashMap<ObjectId, TargetState>,
}

impl TargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ObjectId, state: TargetState) {
        self.targets.insert(id, state);
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<TargetState> {
        self.targets.remove(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&TargetState> {
        self.targets.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut TargetState> {
        self.targets.get_mut(&id)
    }

    pub fn health(&self, id: ObjectId) -> Option<f32> {
        self.targets.get(&id).map(|t| t.health)
    }
}

impl TargetRegistry for TargetTable {
    fn target(&self, id: ObjectId) -> Option<TargetInfo> {
        self.targets.get(&id).map(|t| TargetInfo {
            id,
            position: t.position,
            alive: t.is_alive(),
        })
    }

    fn hitbox(&self, id: ObjectId, hitbox_index: u8) -> Option<HitboxBounds> {
        let target = self.targets.get(&id)?;
        let def = target.hitboxes.get(hitbox_index as usize)?;
        Some(HitboxBounds {
            center: target.position + def.offset,
            shape: def.shape,
        })
    }

    fn can_receive_damage_from(&self, target: ObjectId, instigator: ObjectId) -> bool {
        if target == instigator {
            return false;
        }
        match (self.targets.get(&target), self.targets.get(&instigator)) {
            (Some(t), Some(i)) => t.faction != i.faction,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn receive_damage(
        &mut self,
        target: ObjectId,
        payload: &DamagePayload,
    ) -> Option<DamageReceipt> {
        let state = self.targets.get_mut(&target)?;
        if !state.is_alive() {
            return None;
        }
        let amount = state.mitigate(payload).min(state.health);
        state.health -= amount;
        Some(DamageReceipt {
            amount,
            killed: !state.is_alive(),
        })
    }
}
