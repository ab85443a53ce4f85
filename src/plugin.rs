//! ECS integration for the authoritative side.
//!
//! An [`AttackLaunched`] event opens the attack's session. Incoming
//! [`SubmitHitClaim`] events are routed to their session, validated against
//! the [`CombatArena`] and turned into [`DamageDealt`] events. Sessions past
//! the configured TTL are dropped every frame.
//!
//! Session age is measured on the server's own [`Time`], never on the
//! client-stamped launch timestamp.

use bevy::prelude::*;
use tracing::trace;

use crate::arena::CombatArena;
use crate::combat::{AttackRole, AttackSessions, DamageDealt, Side};
use crate::config::CoreConfig;
use crate::logging::LoggingPlugin;
use crate::net::{AttackLaunched, SubmitHitClaim};

#[derive(Default)]
pub struct HitValidationPlugin {
    pub config: CoreConfig,
}

impl Plugin for HitValidationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone());
        if !app.is_plugin_added::<LoggingPlugin>() {
            app.add_plugins(LoggingPlugin);
        }
        app.add_event::<AttackLaunched>()
            .add_event::<SubmitHitClaim>()
            .add_event::<DamageDealt>()
            .init_resource::<Time>()
            .init_resource::<AttackSessions>()
            .init_resource::<CombatArena>()
            .add_systems(
                Update,
                (open_launched_sessions, process_hit_claims, expire_sessions).chain(),
            );
    }
}

fn session_clock_ms(time: &Time) -> i64 {
    time.elapsed().as_millis() as i64
}

/// Open a session for every client-detected attack announced this frame
pub fn open_launched_sessions(
    mut launches: EventReader<AttackLaunched>,
    time: Res<Time>,
    mut sessions: ResMut<AttackSessions>,
) {
    let now_ms = session_clock_ms(&time);
    for launch in launches.read() {
        if launch.context.hit_authority.role(Side::Server) != AttackRole::ValidateClaims {
            trace!(attacker = ?launch.context.attacker, "server-detected attack, no session");
            continue;
        }
        sessions.open(launch.context.clone(), launch.strategy.clone(), now_ms);
    }
}

/// Drain claims received this frame
pub fn process_hit_claims(
    mut claims: EventReader<SubmitHitClaim>,
    mut sessions: ResMut<AttackSessions>,
    mut arena: ResMut<CombatArena>,
    mut dealt: EventWriter<DamageDealt>,
) {
    let arena = &mut *arena;
    let mut events: Vec<DamageDealt> = Vec::new();
    for claim in claims.read() {
        sessions.route(claim, &arena.physics, &mut arena.targets, &mut events);
    }
    if !events.is_empty() {
        dealt.send_batch(events);
    }
}

pub fn expire_sessions(
    time: Res<Time>,
    config: Res<CoreConfig>,
    mut sessions: ResMut<AttackSessions>,
) {
    sessions.expire(session_clock_ms(&time), config.session_ttl_ms);
}
