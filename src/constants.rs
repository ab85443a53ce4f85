//! Centralized tuning constants for damage delivery and hit validation.
//!
//! Values that change acceptance behaviour live here so client and server
//! builds read the same numbers. Per-weapon parameters come from the weapon
//! catalog instead (see `config`).

// =====================================================
// Spread
// =====================================================

/// Stride mixed into the spread stream seed:
/// `seed + (trigger + 1) * (spread + 1) * SPREAD_SEED_STRIDE`
pub const SPREAD_SEED_STRIDE: i64 = 16;

// =====================================================
// Missile validation
// =====================================================

/// Maximum ratio of implied speed to declared missile speed (5% jitter slack)
pub const MISSILE_SPEED_TOLERANCE: f64 = 1.05;

/// Rounding slack on the speed ratio. Covers the f32 error in a claimed
/// impact point that lies exactly on the tolerance boundary.
pub const MISSILE_SPEED_RATIO_SLACK: f64 = 4.0 * f32::EPSILON as f64;

/// Minimum alignment between the launch direction and the direction from the
/// locked destination to the impact before the destination distance is used.
///
/// Tuned value carried over from live balancing; it has no derivation and
/// changing it changes which curved missile hits are accepted.
pub const DESTINATION_ALIGNMENT_THRESHOLD: f32 = 0.75;

/// Milliseconds per second, used when turning elapsed ms into speed
pub const MS_PER_SECOND: f32 = 1000.0;

// =====================================================
// Impact
// =====================================================

/// How far a claimed impact point may sit from the struck hitbox's surface
/// (units). Missiles add their sweep radius on top.
pub const IMPACT_SURFACE_TOLERANCE: f32 = 0.25;

// =====================================================
// Melee
// =====================================================

/// Overlap sphere is pulled back along the swing by this much so targets
/// hugging the attacker are still caught
pub const MELEE_BACKWARD_OFFSET: f32 = 0.5;

/// Float slack (degrees) on the field-of-view boundary test
pub const FOV_TOLERANCE_DEGREES: f32 = 1e-3;

// =====================================================
// Damage
// =====================================================

/// Per-level damage scale: final = roll * (1 + (level - 1) * LEVEL_DAMAGE_STEP)
pub const LEVEL_DAMAGE_STEP: f32 = 0.1;

// =====================================================
// Sessions
// =====================================================

/// Default lifetime of an authoritative attack session before it is dropped
pub const DEFAULT_SESSION_TTL_MS: i64 = 10_000;

// =====================================================
// Projectiles
// =====================================================

/// Default gravity applied to throwables (units/s^2, downward)
pub const THROWABLE_GRAVITY: f32 = 9.81;

/// Homing turn rate for missiles locked on a target (radians/s)
pub const MISSILE_TURN_RATE: f32 = std::f32::consts::PI;
