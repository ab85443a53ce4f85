//! Deterministic spread generator.
//!
//! Client and server both derive the aim offset of a sub-shot from the same
//! `(simulate_seed, trigger_index, spread_index)` triple. The seed combination
//! is pure integer arithmetic and the stream is Xoshiro256++, so the offset is
//! bit-identical on every machine that runs it.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::constants::SPREAD_SEED_STRIDE;

/// Maximum spread on each axis (degrees of yaw / pitch)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadCone {
    pub max_x: f32,
    pub max_y: f32,
}

impl SpreadCone {
    pub const NONE: Self = Self {
        max_x: 0.0,
        max_y: 0.0,
    };

    pub fn new(max_x: f32, max_y: f32) -> Self {
        Self { max_x, max_y }
    }
}

/// Offset produced for one sub-shot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadOffset {
    pub dx: f32,
    pub dy: f32,
}

/// Integer seed of the spread stream for one sub-shot.
pub fn spread_stream_seed(simulate_seed: i32, trigger_index: u8, spread_index: u8) -> u64 {
    let step =
        (i64::from(trigger_index) + 1) * (i64::from(spread_index) + 1) * SPREAD_SEED_STRIDE;
    i64::from(simulate_seed).wrapping_add(step) as u64
}

/// Seeded stream for one sub-shot. Also used for the damage roll.
pub fn spread_rng(simulate_seed: i32, trigger_index: u8, spread_index: u8) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(spread_stream_seed(
        simulate_seed,
        trigger_index,
        spread_index,
    ))
}

/// Spread offset in `[-max, max]` on both axes.
///
/// Both draws always happen, so `dy` never depends on `max_x`.
pub fn spread(
    simulate_seed: i32,
    trigger_index: u8,
    spread_index: u8,
    max_offset_x: f32,
    max_offset_y: f32,
) -> SpreadOffset {
    let mut rng = spread_rng(simulate_seed, trigger_index, spread_index);
    let dx = sample_axis(&mut rng, max_offset_x);
    let dy = sample_axis(&mut rng, max_offset_y);
    SpreadOffset { dx, dy }
}

/// Convenience wrapper over [`spread`] taking a cone
pub fn spread_in_cone(
    simulate_seed: i32,
    trigger_index: u8,
    spread_index: u8,
    cone: SpreadCone,
) -> SpreadOffset {
    spread(
        simulate_seed,
        trigger_index,
        spread_index,
        cone.max_x,
        cone.max_y,
    )
}

fn sample_axis(rng: &mut Xoshiro256PlusPlus, max: f32) -> f32 {
    let max = if max.is_finite() { max.abs() } else { 0.0 };
    let unit: f32 = rng.gen();
    (unit * 2.0 - 1.0) * max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_combination_is_integer_only() {
        assert_eq!(spread_stream_seed(42, 0, 0), 42 + 16);
        assert_eq!(spread_stream_seed(42, 1, 2), 42 + 2 * 3 * 16);
        assert_eq!(spread_stream_seed(0, 255, 255), 256 * 256 * 16);
    }

    #[test]
    fn test_negative_seed_wraps() {
        // -16 + 16 = 0
        assert_eq!(spread_stream_seed(-16, 0, 0), 0);
        assert_eq!(spread_stream_seed(-17, 0, 0), u64::MAX);
    }

    #[test]
    fn test_client_and_server_agree() {
        let client = spread(42, 3, 7, 4.0, 2.0);
        let server = spread(42, 3, 7, 4.0, 2.0);
        assert_eq!(client.dx.to_bits(), server.dx.to_bits());
        assert_eq!(client.dy.to_bits(), server.dy.to_bits());
    }

    #[test]
    fn test_offsets_within_cone() {
        for seed in 0..200 {
            let o = spread(seed, (seed % 4) as u8, (seed % 9) as u8, 3.0, 1.5);
            assert!(o.dx.abs() <= 3.0, "dx {} out of cone", o.dx);
            assert!(o.dy.abs() <= 1.5, "dy {} out of cone", o.dy);
        }
    }

    #[test]
    fn test_sub_shots_differ() {
        let a = spread(42, 0, 0, 5.0, 5.0);
        let b = spread(42, 0, 1, 5.0, 5.0);
        assert_ne!(a, b, "pellets of one trigger must not share an offset");
    }

    #[test]
    fn test_zero_and_invalid_cone() {
        let o = spread(42, 0, 0, 0.0, 0.0);
        assert_eq!(o, SpreadOffset::default());

        let o = spread(42, 0, 0, f32::NAN, f32::INFINITY);
        assert_eq!(o, SpreadOffset::default());
    }

    #[test]
    fn test_y_axis_independent_of_x_max() {
        let a = spread(9, 1, 1, 0.0, 2.0);
        let b = spread(9, 1, 1, 10.0, 2.0);
        assert_eq!(a.dy.to_bits(), b.dy.to_bits());
    }

    #[test]
    fn test_negative_max_treated_as_magnitude() {
        let a = spread(5, 0, 0, -2.0, -2.0);
        let b = spread(5, 0, 0, 2.0, 2.0);
        assert_eq!(a, b);
    }
}
