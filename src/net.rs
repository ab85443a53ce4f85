//! Outbound hit-claim message.
//!
//! One-way and unacknowledged: the detecting side sends a claim and never
//! hears back. Damage shows up later through normal state sync.

use std::sync::mpsc::Sender;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::combat::{AttackContext, HitClaimRecord};
use crate::delivery::DeliveryStrategy;
use crate::physics::ObjectId;

/// A client-detected attack fired; the server expects claims for it
#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackLaunched {
    pub context: AttackContext,
    pub strategy: DeliveryStrategy,
}

#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitHitClaim {
    pub attacker: ObjectId,
    pub claim: HitClaimRecord,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode hit claim: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode hit claim: {0}")]
    Decode(#[source] bincode::Error),
}

impl SubmitHitClaim {
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        bincode::serialize(self).map_err(WireError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        bincode::deserialize(bytes).map_err(WireError::Decode)
    }
}

/// Fire-and-forget outlet for claims
pub trait ClaimSink {
    fn submit(&mut self, claim: SubmitHitClaim);
}

impl ClaimSink for Vec<SubmitHitClaim> {
    fn submit(&mut self, claim: SubmitHitClaim) {
        self.push(claim);
    }
}

impl ClaimSink for Sender<SubmitHitClaim> {
    fn submit(&mut self, claim: SubmitHitClaim) {
        // A closed channel is a lost packet
        if self.send(claim).is_err() {
            debug!("claim channel closed, hit claim dropped");
        }
    }
}
