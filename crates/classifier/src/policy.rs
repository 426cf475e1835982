//! Confidence policy

use aicc_config::ConfidenceThresholds;
use aicc_core::Tier;

/// Map a top-1 probability to a tier.
///
/// A if `p >= threshold_a`, B if `threshold_b_low <= p < threshold_a`,
/// C otherwise. Thresholds are assumed valid (`0 < b_low < a < 1`).
pub fn classify_tier(p: f32, threshold_a: f32, threshold_b_low: f32) -> Tier {
    if p >= threshold_a {
        Tier::A
    } else if p >= threshold_b_low {
        Tier::B
    } else {
        Tier::C
    }
}

/// Tier policy bound to validated thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    thresholds: ConfidenceThresholds,
}

impl ConfidencePolicy {
    pub fn new(thresholds: ConfidenceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn tier(&self, p: f32) -> Tier {
        classify_tier(
            p,
            self.thresholds.threshold_a,
            self.thresholds.threshold_b_low,
        )
    }

    pub fn thresholds(&self) -> ConfidenceThresholds {
        self.thresholds
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self::new(ConfidenceThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_boundaries() {
        assert_eq!(classify_tier(0.85, 0.85, 0.5), Tier::A);
        assert_eq!(classify_tier(0.95, 0.85, 0.5), Tier::A);
        assert_eq!(classify_tier(0.849, 0.85, 0.5), Tier::B);
        assert_eq!(classify_tier(0.5, 0.85, 0.5), Tier::B);
        assert_eq!(classify_tier(0.499, 0.85, 0.5), Tier::C);
        assert_eq!(classify_tier(0.0, 0.85, 0.5), Tier::C);
        assert_eq!(classify_tier(1.0, 0.85, 0.5), Tier::A);
    }

    #[test]
    fn test_policy_uses_thresholds() {
        let policy = ConfidencePolicy::new(ConfidenceThresholds::new(0.9, 0.4).unwrap());
        assert_eq!(policy.tier(0.55), Tier::B);
        assert_eq!(policy.tier(0.39), Tier::C);
        assert_eq!(policy.tier(0.9), Tier::A);
    }

    #[test]
    fn test_tier_monotonic_in_probability() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..10_000 {
            let b_low: f32 = rng.gen_range(0.01..0.98);
            let a: f32 = rng.gen_range((b_low + 0.001)..0.999);
            let p1: f32 = rng.gen_range(0.0..=1.0);
            let p2: f32 = rng.gen_range(0.0..=1.0);
            let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };

            let t_lo = classify_tier(lo, a, b_low);
            let t_hi = classify_tier(hi, a, b_low);
            assert!(
                t_hi >= t_lo,
                "tier({}) = {} < tier({}) = {} for a={} b_low={}",
                hi,
                t_hi,
                lo,
                t_lo,
                a,
                b_low
            );
        }
    }
}
