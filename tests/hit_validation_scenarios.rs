//! Cross-module combat scenarios
//!
//! Each test drives the public API the way a server or client tick would:
//! resolve an attack, ship claims, validate them in a session, and check
//! who lost health.

use bevy::prelude::*;

use damage_core::arena::CombatArena;
use damage_core::combat::{
    apply_once, AimTarget, AttackContext, AttackPhase, AttackSessions, AttackerView, ClaimRejection,
    ClaimVerdict, ClaimedHit, DamageDealt, DamageKind, DamagePayload, DamageRange, HitAuthority,
    HitClaimRecord, Side, VisitedSet, WeaponRef,
};
use damage_core::config::WeaponCatalog;
use damage_core::delivery::{
    AttackOutcome, Delivery, DeliveryStrategy, MeleeDelivery, MissileDelivery, RaycastDelivery,
};
use damage_core::net::SubmitHitClaim;
use damage_core::physics::ObjectId;
use damage_core::projectile::{FlightEvent, ProjectileFlight, ProjectileLaunch};
use damage_core::spread::spread;
use damage_core::target::TargetState;

const ATTACKER: ObjectId = ObjectId(1);

// ============================================================
// Helpers
// ============================================================

fn context(seed: i32) -> AttackContext {
    AttackContext::new(ATTACKER, WeaponRef(1), seed)
        .with_damage(DamageKind::Physical, DamageRange::fixed(10.0))
}

fn arena_with(targets: &[(u64, Vec3)]) -> CombatArena {
    let mut arena = CombatArena::new();
    for &(id, pos) in targets {
        arena.spawn_target(ObjectId(id), TargetState::new(pos, 100.0, 2));
    }
    arena
}

struct Tick {
    outcome: AttackOutcome,
    dealt: Vec<DamageDealt>,
    claims: Vec<SubmitHitClaim>,
    projectiles: Vec<ProjectileLaunch>,
}

fn resolve(
    arena: &mut CombatArena,
    strategy: &DeliveryStrategy,
    context: &AttackContext,
    side: Side,
    now_ms: i64,
    aim: Option<AimTarget>,
) -> Tick {
    let attacker = AttackerView::new(ATTACKER, Transform::IDENTITY);
    let mut dealt: Vec<DamageDealt> = Vec::new();
    let mut claims: Vec<SubmitHitClaim> = Vec::new();
    let mut projectiles: Vec<ProjectileLaunch> = Vec::new();
    let outcome = {
        let mut world = arena.world(side, now_ms, &mut dealt, &mut claims, &mut projectiles);
        strategy.resolve(&attacker, context, aim, &mut world)
    };
    Tick {
        outcome,
        dealt,
        claims,
        projectiles,
    }
}

fn claim(context: &AttackContext, hit_z: f32, hit_timestamp: i64) -> SubmitHitClaim {
    SubmitHitClaim {
        attacker: context.attacker,
        claim: HitClaimRecord::launch(context, Vec3::ZERO, Vec3::NEG_Z).with_hit(ClaimedHit {
            hit_timestamp,
            hit_object_id: ObjectId(2),
            hitbox_index: 0,
            hit_origin: Vec3::new(0.0, 0.0, hit_z),
            hit_destination: None,
        }),
    }
}

fn route(
    sessions: &mut AttackSessions,
    arena: &mut CombatArena,
    event: &SubmitHitClaim,
) -> ClaimVerdict {
    let mut dealt: Vec<DamageDealt> = Vec::new();
    sessions.route(event, &arena.physics, &mut arena.targets, &mut dealt)
}

// ============================================================
// Determinism
// ============================================================

#[test]
fn test_client_and_server_spread_agree() {
    for seed in [-1_000_000, -1, 0, 42, i32::MAX] {
        for trigger in 0..3u8 {
            for sub in 0..8u8 {
                let client = spread(seed, trigger, sub, 6.0, 3.0);
                let server = spread(seed, trigger, sub, 6.0, 3.0);
                assert_eq!(client.dx.to_bits(), server.dx.to_bits());
                assert_eq!(client.dy.to_bits(), server.dy.to_bits());
            }
        }
    }
}

// ============================================================
// Idempotence
// ============================================================

#[test]
fn test_apply_once_twice_damages_once() {
    let mut arena = arena_with(&[(2, Vec3::new(0.0, 0.0, -5.0))]);
    let payload = DamagePayload::roll(&context(42), ObjectId(2), Vec3::ZERO, 0);
    let mut visited = VisitedSet::new();
    let mut dealt: Vec<DamageDealt> = Vec::new();

    assert!(apply_once(&mut visited, ObjectId(2), &payload, &mut arena.targets, &mut dealt));
    assert!(!apply_once(&mut visited, ObjectId(2), &payload, &mut arena.targets, &mut dealt));
    assert_eq!(dealt.len(), 1);
    assert_eq!(arena.targets.health(ObjectId(2)), Some(90.0));
}

// ============================================================
// Pierce budget
// ============================================================

#[test]
fn test_pierce_budget_obstacle_boundary() {
    let n = 2u8;
    let strategy = DeliveryStrategy::Raycast(RaycastDelivery {
        distance: 30.0,
        pierce_through_entities: n,
    });

    for (walls, accepted) in [(n, true), (n + 1, false)] {
        let mut arena = arena_with(&[(2, Vec3::new(0.0, 0.0, -10.5))]);
        for i in 0..walls {
            arena.add_obstacle(
                ObjectId(100 + u64::from(i)),
                Vec3::new(0.0, 0.0, -2.0 - 2.0 * f32::from(i)),
                Vec3::new(2.0, 2.0, 0.1),
            );
        }
        let ctx = context(42).with_authority(HitAuthority::OwningClient);
        let mut sessions = AttackSessions::new();
        sessions.open(ctx.clone(), strategy.clone(), 0);

        let verdict = route(&mut sessions, &mut arena, &claim(&ctx, -10.0, 5));
        assert_eq!(verdict.is_accepted(), accepted, "{walls} walls");
        if !accepted {
            assert_eq!(
                verdict,
                ClaimVerdict::Rejected(ClaimRejection::ObstaclesExceedPierce {
                    obstacles: usize::from(n + 1),
                    budget: n
                })
            );
        }
    }
}

// ============================================================
// Speed tolerance
// ============================================================

#[test]
fn test_speed_tolerance_boundary() {
    let strategy = DeliveryStrategy::Missile(MissileDelivery {
        distance: 100.0,
        speed: 30.0,
        ..MissileDelivery::default()
    });
    // 1.05 x 30 = 31.5 u/s, 1.051 x 30 = 31.53 u/s, both over 1 s
    for (seed, hit_z, accepted) in [(1, -31.5, true), (2, -31.53, false)] {
        let mut arena = arena_with(&[(2, Vec3::new(0.0, 0.0, hit_z - 0.5))]);
        let ctx = context(seed)
            .with_authority(HitAuthority::OwningClient)
            .launched_at(1000);
        let mut sessions = AttackSessions::new();
        sessions.open(ctx.clone(), strategy.clone(), 1000);
        let verdict = route(&mut sessions, &mut arena, &claim(&ctx, hit_z, 2000));
        assert_eq!(verdict.is_accepted(), accepted, "hit at {hit_z}: {verdict:?}");
    }
}

// ============================================================
// Melee FOV gating
// ============================================================

#[test]
fn test_melee_fov_boundary() {
    let strategy = DeliveryStrategy::Melee(MeleeDelivery {
        distance: 5.0,
        horizontal_fov: 120.0,
        vertical_fov: 90.0,
        hit_only_selected_target: false,
    });
    let at = |deg: f32| {
        let r = deg.to_radians();
        Vec3::new(-r.sin() * 3.0, 0.0, -r.cos() * 3.0)
    };
    let mut arena = arena_with(&[(2, at(60.0)), (3, at(61.0))]);
    let tick = resolve(&mut arena, &strategy, &context(42), Side::Server, 0, None);

    assert_eq!(tick.outcome.damaged, vec![ObjectId(2)]);
    assert_eq!(arena.targets.health(ObjectId(3)), Some(100.0));
}

// ============================================================
// Single-target lock
// ============================================================

#[test]
fn test_single_target_lock_one_event() {
    let strategy = DeliveryStrategy::Melee(MeleeDelivery {
        distance: 3.0,
        horizontal_fov: 120.0,
        vertical_fov: 90.0,
        hit_only_selected_target: true,
    });
    let mut arena = arena_with(&[
        (2, Vec3::new(0.0, 0.0, -1.5)),
        (3, Vec3::new(0.5, 0.0, -2.0)),
        (4, Vec3::new(-0.5, 0.0, -2.0)),
    ]);
    let aim = AimTarget::object(ObjectId(4), Vec3::new(-0.5, 0.0, -2.0));
    let tick = resolve(&mut arena, &strategy, &context(42), Side::Server, 0, Some(aim));

    assert_eq!(tick.outcome.strikes.len(), 1);
    assert_eq!(tick.dealt.len(), 1);
    assert_eq!(tick.dealt[0].target, ObjectId(4));
}

#[test]
fn test_single_target_lock_rejects_second_claim() {
    let strategy = DeliveryStrategy::Melee(MeleeDelivery {
        hit_only_selected_target: true,
        ..MeleeDelivery::default()
    });
    let mut arena = arena_with(&[(2, Vec3::new(0.0, 0.0, -1.5))]);
    let ctx = context(42).with_authority(HitAuthority::OwningClient);
    let mut sessions = AttackSessions::new();
    sessions.open(ctx.clone(), strategy, 0);

    assert!(route(&mut sessions, &mut arena, &claim(&ctx, -1.0, 5)).is_accepted());
    assert_eq!(
        route(&mut sessions, &mut arena, &claim(&ctx, -1.0, 6)),
        ClaimVerdict::Rejected(ClaimRejection::AlreadyStruck { count: 1 })
    );
    assert_eq!(arena.targets.health(ObjectId(2)), Some(90.0));
}

// ============================================================
// End-to-end hitscan
// ============================================================

#[test]
fn test_raycast_pierces_first_target_not_beyond_range() {
    let strategy = DeliveryStrategy::Raycast(RaycastDelivery {
        distance: 20.0,
        pierce_through_entities: 1,
    });
    // surfaces at 5, 8 and 25 along the ray
    let mut arena = arena_with(&[
        (2, Vec3::new(0.0, 0.0, -5.5)),
        (3, Vec3::new(0.0, 0.0, -8.5)),
        (4, Vec3::new(0.0, 0.0, -25.5)),
    ]);
    let tick = resolve(&mut arena, &strategy, &context(42), Side::Server, 0, None);

    assert_eq!(tick.outcome.damaged, vec![ObjectId(2), ObjectId(3)]);
    assert_eq!(tick.outcome.phase, AttackPhase::Resolved);
    assert_eq!(arena.targets.health(ObjectId(2)), Some(90.0));
    assert_eq!(arena.targets.health(ObjectId(3)), Some(90.0));
    assert_eq!(arena.targets.health(ObjectId(4)), Some(100.0));
}

#[test]
fn test_client_detected_raycast_validated_on_server() {
    let strategy = DeliveryStrategy::Raycast(RaycastDelivery {
        distance: 20.0,
        pierce_through_entities: 1,
    });
    let targets = [
        (2, Vec3::new(0.0, 0.0, -5.5)),
        (3, Vec3::new(0.0, 0.0, -8.5)),
    ];
    let ctx = context(42)
        .with_authority(HitAuthority::OwningClient)
        .launched_at(1000);

    // client: detect and claim, no damage
    let mut client = arena_with(&targets);
    let tick = resolve(&mut client, &strategy, &ctx, Side::Client, 1016, None);
    assert!(tick.dealt.is_empty());
    assert_eq!(tick.claims.len(), 2);
    assert_eq!(tick.outcome.phase, AttackPhase::AwaitingRemoteValidation);

    // server: session opened on launch, claims validated
    let mut server = arena_with(&targets);
    let server_tick = resolve(&mut server, &strategy, &ctx, Side::Server, 1000, None);
    assert_eq!(server_tick.outcome.phase, AttackPhase::AwaitingRemoteValidation);
    assert!(server_tick.dealt.is_empty());

    let mut sessions = AttackSessions::new();
    let key = sessions.open(ctx.clone(), strategy.clone(), 1000);
    for event in &tick.claims {
        assert!(route(&mut sessions, &mut server, event).is_accepted());
    }
    // replayed packet
    assert_eq!(
        route(&mut sessions, &mut server, &tick.claims[0]),
        ClaimVerdict::Rejected(ClaimRejection::HitCountExceedsPierce {
            count: 2,
            budget: 1
        })
    );
    assert_eq!(server.targets.health(ObjectId(2)), Some(90.0));
    assert_eq!(server.targets.health(ObjectId(3)), Some(90.0));
    assert!(sessions.close(&key).is_some());
}

#[test]
fn test_wall_hack_claim_rejected() {
    let strategy = DeliveryStrategy::Raycast(RaycastDelivery {
        distance: 20.0,
        pierce_through_entities: 0,
    });
    let mut arena = arena_with(&[(2, Vec3::new(0.0, 0.0, -6.5))]);
    arena.add_obstacle(ObjectId(100), Vec3::new(0.0, 0.0, -3.0), Vec3::new(2.0, 2.0, 0.1));
    let ctx = context(42).with_authority(HitAuthority::OwningClient);

    let mut sessions = AttackSessions::new();
    sessions.open(ctx.clone(), strategy, 0);
    let verdict = route(&mut sessions, &mut arena, &claim(&ctx, -6.0, 5));
    assert!(matches!(
        verdict,
        ClaimVerdict::Rejected(ClaimRejection::ObstaclesExceedPierce { .. })
    ));
    assert_eq!(arena.targets.health(ObjectId(2)), Some(100.0));
}

#[test]
fn test_impact_claimed_in_front_of_wall_rejected() {
    let strategy = DeliveryStrategy::Raycast(RaycastDelivery {
        distance: 20.0,
        pierce_through_entities: 0,
    });
    let mut arena = arena_with(&[(2, Vec3::new(0.0, 0.0, -10.5))]);
    arena.add_obstacle(ObjectId(100), Vec3::new(0.0, 0.0, -5.0), Vec3::new(2.0, 2.0, 0.1));
    let ctx = context(42).with_authority(HitAuthority::OwningClient);

    let mut sessions = AttackSessions::new();
    sessions.open(ctx.clone(), strategy, 0);
    // Short segment from the muzzle never reaches the wall
    let verdict = route(&mut sessions, &mut arena, &claim(&ctx, -1.0, 5));
    assert!(matches!(
        verdict,
        ClaimVerdict::Rejected(ClaimRejection::ImpactOffTarget { .. })
    ));
    assert_eq!(arena.targets.health(ObjectId(2)), Some(100.0));
}

#[test]
fn test_missile_impact_far_from_target_rejected() {
    let strategy = DeliveryStrategy::Missile(MissileDelivery {
        distance: 40.0,
        speed: 30.0,
        ..MissileDelivery::default()
    });
    let mut arena = arena_with(&[(2, Vec3::new(0.0, 0.0, -300.0))]);
    let ctx = context(7)
        .with_authority(HitAuthority::OwningClient)
        .launched_at(1000);

    let mut sessions = AttackSessions::new();
    sessions.open(ctx.clone(), strategy, 1000);
    let verdict = route(&mut sessions, &mut arena, &claim(&ctx, -1.0, 1500));
    assert!(matches!(
        verdict,
        ClaimVerdict::Rejected(ClaimRejection::ImpactOffTarget { .. })
    ));
    assert_eq!(arena.targets.health(ObjectId(2)), Some(100.0));
}

// ============================================================
// Missile lag
// ============================================================

#[test]
fn test_missile_lag_scenario() {
    let strategy = DeliveryStrategy::Missile(MissileDelivery {
        distance: 20.0,
        speed: 30.0,
        ..MissileDelivery::default()
    });
    for (seed, hit_timestamp, accepted) in [(1, 1500, true), (2, 1400, false)] {
        let mut arena = arena_with(&[(2, Vec3::new(0.0, 0.0, -15.5))]);
        let ctx = context(seed)
            .with_authority(HitAuthority::OwningClient)
            .launched_at(1000);
        let mut sessions = AttackSessions::new();
        sessions.open(ctx.clone(), strategy.clone(), 1000);
        let verdict = route(&mut sessions, &mut arena, &claim(&ctx, -15.0, hit_timestamp));
        assert_eq!(verdict.is_accepted(), accepted, "{hit_timestamp}: {verdict:?}");
    }
}

#[test]
fn test_missile_flight_claim_passes_validation() {
    let strategy = DeliveryStrategy::Missile(MissileDelivery {
        distance: 40.0,
        speed: 30.0,
        ..MissileDelivery::default()
    });
    let targets = [(2, Vec3::new(0.0, 0.0, -12.5))];
    let ctx = context(9)
        .with_authority(HitAuthority::OwningClient)
        .launched_at(5000);

    let mut client = arena_with(&targets);
    let aim = AimTarget::object(ObjectId(2), Vec3::new(0.0, 0.0, -12.5));
    let tick = resolve(&mut client, &strategy, &ctx, Side::Client, 5000, Some(aim));
    assert_eq!(tick.projectiles.len(), 1);

    let mut flight = ProjectileFlight::new(tick.projectiles[0].clone());
    let impact = loop {
        match flight.step(16, &client.physics, &client.targets) {
            FlightEvent::InFlight => continue,
            FlightEvent::Impact(impact) => break impact,
            other => panic!("missile never arrived: {other:?}"),
        }
    };

    let mut claims: Vec<SubmitHitClaim> = Vec::new();
    let mut dealt: Vec<DamageDealt> = Vec::new();
    let mut spawned: Vec<ProjectileLaunch> = Vec::new();
    {
        let mut world = client.world(Side::Client, impact.timestamp_ms, &mut dealt, &mut claims, &mut spawned);
        flight.settle_impact(&ctx, &impact, &mut world);
    }
    assert_eq!(claims.len(), 1);
    assert!(dealt.is_empty());

    let mut server = arena_with(&targets);
    let mut sessions = AttackSessions::new();
    sessions.open(ctx.clone(), strategy, 5000);
    let verdict = route(&mut sessions, &mut server, &claims[0]);
    assert!(verdict.is_accepted(), "{verdict:?}");
    assert_eq!(server.targets.health(ObjectId(2)), Some(90.0));
}

// ============================================================
// Shipped catalog
// ============================================================

#[test]
fn test_shipped_catalog_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/weapons.ron");
    let catalog = WeaponCatalog::load(path).unwrap();
    assert!(catalog.len() >= 4);
    for entry in catalog.iter() {
        assert!(entry.delivery.validate().is_ok(), "{}", entry.name);
        assert!(entry.delivery.max_distance() > 0.0);
    }
}
