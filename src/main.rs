//! Headless demo: resolves a pierce-through hitscan shot on the server and
//! replays the missile lag scenario through the validator, printing JSON.

use anyhow::{anyhow, Context, Result};
use bevy::prelude::*;
use serde_json::json;

use damage_core::arena::CombatArena;
use damage_core::combat::{
    AttackContext, AttackSessions, AttackerView, ClaimedHit, DamageDealt, DamageKind, DamageRange,
    HitAuthority, HitClaimRecord, Side, WeaponRef,
};
use damage_core::config::{CoreConfig, WeaponCatalog};
use damage_core::delivery::{Delivery, DeliveryStrategy, RaycastDelivery};
use damage_core::logging::init_tracing;
use damage_core::net::SubmitHitClaim;
use damage_core::physics::ObjectId;
use damage_core::projectile::ProjectileLaunch;
use damage_core::target::TargetState;

const RIFLE: WeaponRef = WeaponRef(2);
const FIRE_BOLT: WeaponRef = WeaponRef(3);

fn main() -> Result<()> {
    let config = CoreConfig::default();
    init_tracing(&config.tracing);

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/weapons.ron".to_string());
    let catalog = WeaponCatalog::load(&path).with_context(|| format!("loading {path}"))?;

    let hitscan = hitscan_scenario(&catalog)?;
    let lag = missile_lag_scenario(&catalog)?;

    let report = json!({ "hitscan": hitscan, "missile_lag": lag });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Two targets at 5 and 8 along the ray, a third at 25 beyond range
fn hitscan_scenario(catalog: &WeaponCatalog) -> Result<serde_json::Value> {
    let strategy = catalog
        .delivery(RIFLE)
        .cloned()
        .unwrap_or(DeliveryStrategy::Raycast(RaycastDelivery {
            distance: 20.0,
            pierce_through_entities: 1,
        }));

    let mut arena = CombatArena::new();
    for (id, z) in [(2, -5.5), (3, -8.5), (4, -25.5)] {
        arena.spawn_target(ObjectId(id), TargetState::new(Vec3::new(0.0, 0.0, z), 100.0, 2));
    }

    let attacker = AttackerView::new(ObjectId(1), Transform::IDENTITY);
    let context = AttackContext::new(ObjectId(1), RIFLE, 42)
        .with_damage(DamageKind::Physical, DamageRange::new(10.0, 14.0));

    let mut dealt: Vec<DamageDealt> = Vec::new();
    let mut claims: Vec<SubmitHitClaim> = Vec::new();
    let mut projectiles: Vec<ProjectileLaunch> = Vec::new();
    let outcome = {
        let mut world = arena.world(Side::Server, 0, &mut dealt, &mut claims, &mut projectiles);
        strategy.resolve(&attacker, &context, None, &mut world)
    };

    Ok(json!({
        "weapon": strategy.name(),
        "damaged": outcome.damaged,
        "events": dealt,
        "health": ([2u64, 3, 4]
            .iter()
            .map(|id| arena.targets.health(ObjectId(*id)))
            .collect::<Vec<_>>()),
    }))
}

/// 15 units at 30 u/s: on time at 0.5 s, too fast at 0.4 s
fn missile_lag_scenario(catalog: &WeaponCatalog) -> Result<serde_json::Value> {
    let strategy = catalog
        .delivery(FIRE_BOLT)
        .cloned()
        .ok_or_else(|| anyhow!("weapon {FIRE_BOLT:?} missing from catalog"))?;

    let mut arena = CombatArena::new();
    arena.spawn_target(
        ObjectId(2),
        TargetState::new(Vec3::new(0.0, 0.0, -15.5), 100.0, 2),
    );
    let mut sessions = AttackSessions::new();
    let mut verdicts = Vec::new();

    for (seed, hit_timestamp) in [(7, 1500), (8, 1400)] {
        let context = AttackContext::new(ObjectId(1), FIRE_BOLT, seed)
            .with_damage(DamageKind::Fire, DamageRange::fixed(20.0))
            .with_authority(HitAuthority::OwningClient)
            .launched_at(1000);
        sessions.open(context.clone(), strategy.clone(), 1000);

        let claim = HitClaimRecord::launch(&context, Vec3::ZERO, Vec3::NEG_Z).with_hit(ClaimedHit {
            hit_timestamp,
            hit_object_id: ObjectId(2),
            hitbox_index: 0,
            hit_origin: Vec3::new(0.0, 0.0, -15.0),
            hit_destination: None,
        });
        let mut dealt: Vec<DamageDealt> = Vec::new();
        let verdict = sessions.route(
            &SubmitHitClaim {
                attacker: ObjectId(1),
                claim,
            },
            &arena.physics,
            &mut arena.targets,
            &mut dealt,
        );
        verdicts.push(json!({
            "hit_timestamp": hit_timestamp,
            "accepted": verdict.is_accepted(),
            "verdict": format!("{verdict:?}"),
        }));
    }
    Ok(json!(verdicts))
}
