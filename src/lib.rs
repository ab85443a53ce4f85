//! Tower Game - Damage Delivery & Hit Validation Core
//!
//! Deterministic combat resolution shared by client and server:
//! - Seeded spread generator (bit-identical on every machine)
//! - Delivery strategies: melee overlap, hitscan with pierce, missile, throwable
//! - Hit claims sent fire-and-forget from the detecting side
//! - Server-side plausibility checks (walls, pierce budget, speed tolerance)
//! - At-most-once damage per target per attack
//! - Bevy plugin routing claims to attack sessions

pub mod arena;
pub mod combat;
pub mod config;
pub mod constants;
pub mod delivery;
pub mod logging;
pub mod net;
pub mod physics;
pub mod plugin;
pub mod projectile;
pub mod spread;
pub mod target;

pub use combat::{AttackContext, AttackerView, AimTarget, DamageDealt, HitClaimRecord};
pub use delivery::{Delivery, DeliveryStrategy};
pub use plugin::HitValidationPlugin;
