//! Small numeric helpers shared by the matcher, upscaler and applicator.

/// Clamps `value` into `[lo, hi]`; an empty range collapses onto its midpoint.
pub(crate) fn clamp_i32(value: i32, lo: i32, hi: i32) -> i32 {
    if lo > hi {
        return lo + (hi - lo) / 2;
    }
    value.clamp(lo, hi)
}

/// Half-width of a square patch window.
#[inline]
pub(crate) fn patch_radius(patch_size: usize) -> i32 {
    (patch_size / 2) as i32
}

/// Derives a per-stage seed so each level and direction draws its own stream.
pub(crate) fn mix_seed(seed: u64, stage: u64) -> u64 {
    let mut z = seed ^ stage.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::{clamp_i32, mix_seed, patch_radius};

    #[test]
    fn clamp_collapses_empty_range() {
        assert_eq!(clamp_i32(7, 2, 5), 5);
        assert_eq!(clamp_i32(-3, 2, 5), 2);
        assert_eq!(clamp_i32(0, 3, 1), 2);
    }

    #[test]
    fn patch_radius_floors() {
        assert_eq!(patch_radius(1), 0);
        assert_eq!(patch_radius(5), 2);
        assert_eq!(patch_radius(7), 3);
    }

    #[test]
    fn mix_seed_separates_stages() {
        assert_ne!(mix_seed(0, 1), mix_seed(0, 2));
        assert_eq!(mix_seed(42, 3), mix_seed(42, 3));
    }
}
