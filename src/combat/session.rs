//! Attack sessions on the authoritative side.
//!
//! One session per sub-shot that the server expects claims for. The session
//! owns the ledger and visited set for that attack, so nothing leaks between
//! two attacks of the same attacker.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::claim::{ClaimRejection, HitClaimRecord, HitValidationState};
use super::damage::{DamageSink, VisitedSet};
use super::validator::{ClaimVerdict, HitValidator};
use super::{AttackContext, AttackPhase};
use crate::delivery::DeliveryStrategy;
use crate::net::SubmitHitClaim;
use crate::physics::{ObjectId, PhysicsBackend};
use crate::target::TargetRegistry;

/// Identifies one sub-shot of one attacker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackKey {
    pub attacker: ObjectId,
    pub simulate_seed: i32,
    pub trigger_index: u8,
    pub spread_index: u8,
}

impl AttackKey {
    pub fn for_claim(attacker: ObjectId, claim: &HitClaimRecord) -> Self {
        Self {
            attacker,
            simulate_seed: claim.simulate_seed,
            trigger_index: claim.trigger_index,
            spread_index: claim.spread_index,
        }
    }
}

/// Per-attack state owned by the authoritative side
#[derive(Debug, Clone)]
pub struct AttackSession {
    pub context: AttackContext,
    pub strategy: DeliveryStrategy,
    ledger: HitValidationState,
    visited: VisitedSet,
    phase: AttackPhase,
    pub opened_at_ms: i64,
}

impl AttackSession {
    pub fn open(context: AttackContext, strategy: DeliveryStrategy, now_ms: i64) -> Self {
        Self {
            context,
            strategy,
            ledger: HitValidationState::new(),
            visited: VisitedSet::new(),
            phase: AttackPhase::AwaitingRemoteValidation,
            opened_at_ms: now_ms,
        }
    }

    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    pub fn ledger(&self) -> &HitValidationState {
        &self.ledger
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Validate one claim against this attack and commit it if plausible
    pub fn submit_claim(
        &mut self,
        claim: &HitClaimRecord,
        physics: &dyn PhysicsBackend,
        targets: &mut dyn TargetRegistry,
        sink: &mut dyn DamageSink,
    ) -> ClaimVerdict {
        if self.phase.is_terminal() {
            return ClaimVerdict::Rejected(ClaimRejection::UnknownSession);
        }
        HitValidator::new(physics).validate(
            &self.strategy,
            &self.context,
            &mut self.ledger,
            &mut self.visited,
            claim,
            targets,
            sink,
        )
    }

    /// Stop accepting claims
    pub fn resolve(&mut self) {
        if self.phase.can_transition_to(AttackPhase::Resolved) {
            self.phase = AttackPhase::Resolved;
        }
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.opened_at_ms)
    }
}

/// Open sessions keyed by sub-shot
#[derive(Resource, Debug, Default)]
pub struct AttackSessions {
    sessions: HashMap<AttackKey, AttackSession>,
}

impl AttackSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start expecting claims for `context`. Reopening a key replaces the
    /// previous session and its ledger. `now_ms` must come from the same
    /// clock later passed to [`AttackSessions::expire`].
    pub fn open(
        &mut self,
        context: AttackContext,
        strategy: DeliveryStrategy,
        now_ms: i64,
    ) -> AttackKey {
        let key = context.key();
        trace!(?key, "attack session opened");
        self.sessions
            .insert(key, AttackSession::open(context, strategy, now_ms));
        key
    }

    pub fn get(&self, key: &AttackKey) -> Option<&AttackSession> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &AttackKey) -> Option<&mut AttackSession> {
        self.sessions.get_mut(key)
    }

    pub fn close(&mut self, key: &AttackKey) -> Option<AttackSession> {
        let mut session = self.sessions.remove(key)?;
        session.resolve();
        trace!(?key, hits = session.visited.len(), "attack session closed");
        Some(session)
    }

    /// Route an incoming claim to its session. Claims for attacks the server
    /// never saw launch are dropped.
    pub fn route(
        &mut self,
        event: &SubmitHitClaim,
        physics: &dyn PhysicsBackend,
        targets: &mut dyn TargetRegistry,
        sink: &mut dyn DamageSink,
    ) -> ClaimVerdict {
        let key = AttackKey::for_claim(event.attacker, &event.claim);
        match self.sessions.get_mut(&key) {
            Some(session) => session.submit_claim(&event.claim, physics, targets, sink),
            None => {
                debug!(?key, "hit claim for unknown attack dropped");
                ClaimVerdict::Rejected(ClaimRejection::UnknownSession)
            }
        }
    }

    /// Drop sessions older than `ttl_ms`; returns how many were dropped
    pub fn expire(&mut self, now_ms: i64, ttl_ms: i64) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.age_ms(now_ms) <= ttl_ms);
        let dropped = before - self.sessions.len();
        if dropped > 0 {
            trace!(dropped, "expired attack sessions");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
