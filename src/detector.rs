//! The contract every motif detector implements, plus the universal
//! length-aware score normalization shared by all of them.

use crate::motif::Motif;
use crate::taxonomy::{self, MotifClass};

/// Static description of one detection pattern, carried for provenance
/// and surfaced through `MotifDetector::patterns`.
#[derive(Debug, Clone)]
pub struct PatternInfo {
    pub pattern: &'static str,
    pub id: &'static str,
    pub name: &'static str,
    pub subclass: &'static str,
    pub min_len: usize,
    pub score_tag: &'static str,
    pub min_score: f64,
    pub reference: &'static str,
}

#[derive(Debug, Clone)]
pub struct PatternGroup {
    pub name: &'static str,
    pub patterns: Vec<PatternInfo>,
}

/// How raw scores map onto the universal 1-3 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Linear interpolation over the raw range, weighted by the length
    /// factor `min(1, length / cap)`.
    Linear,
    /// log10 interpolation over `[max(1, r_min), r_max]` for cumulative
    /// scores spanning orders of magnitude, same length factor.
    Log10,
    /// Raw score is already mechanistic on the 1-3 scale; clamp and round
    /// only.
    Identity,
}

/// Round to two decimals, the resolution of the normalized scale.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Universal length-aware normalization.
///
/// 1. Clamp `raw` into `[r_min, r_max]` and interpolate to `s_raw`
///    (1 when the range is degenerate).
/// 2. Length factor `f_len = min(1, length / cap)`.
/// 3. `score = 1 + 2 * min(1, s_raw * f_len)`, rounded to two decimals.
pub fn normalize_score(
    raw: f64,
    length: usize,
    bounds: (f64, f64),
    cap: usize,
    method: Normalization,
) -> f64 {
    let (r_min, r_max) = bounds;
    let s_raw = match method {
        Normalization::Identity => {
            return round2(raw.clamp(1.0, 3.0));
        }
        Normalization::Linear => {
            if r_max <= r_min {
                1.0
            } else {
                (raw.clamp(r_min, r_max) - r_min) / (r_max - r_min)
            }
        }
        Normalization::Log10 => {
            let lo = r_min.max(1.0).log10();
            let hi = r_max.max(1.0).log10();
            if hi <= lo {
                1.0
            } else {
                (raw.clamp(r_min, r_max).max(1.0).log10() - lo) / (hi - lo)
            }
        }
    };
    let f_len = if cap == 0 {
        1.0
    } else {
        (length as f64 / cap as f64).min(1.0)
    };
    round2(1.0 + 2.0 * (s_raw * f_len).min(1.0))
}

/// Interface implemented by all nine detectors. Detectors own only
/// immutable state (compiled patterns, lookup tables) so a single
/// instance can serve concurrent calls.
pub trait MotifDetector: Send + Sync {
    fn class(&self) -> MotifClass;

    fn patterns(&self) -> Vec<PatternGroup>;

    /// Scan `seq` (uppercase ACGTN bytes) and return motifs with 1-based
    /// coordinates local to `seq`.
    fn detect(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif>;

    /// Model-native raw score bounds for a motif of `length` bp of the
    /// given subclass; feeds the normalizer.
    fn raw_score_bounds(&self, subclass: &str, length: usize) -> (f64, f64);

    fn normalization(&self, _subclass: &str) -> Normalization {
        Normalization::Linear
    }

    fn length_cap(&self, subclass: Option<&str>) -> usize {
        taxonomy::length_cap(self.class(), subclass)
    }

    /// Normalize a raw score for emission.
    fn normalize(&self, raw: f64, length: usize, subclass: &str) -> f64 {
        normalize_score(
            raw,
            length,
            self.raw_score_bounds(subclass, length),
            self.length_cap(Some(subclass)),
            self.normalization(subclass),
        )
    }
}

#[cfg(test)]
mod test {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn linear_interpolation_with_length_factor() {
        // Mid-range raw at half the cap: 0.5 * 0.5 = 0.25 -> 1.5
        let score = normalize_score(0.5, 50, (0.0, 1.0), 100, Normalization::Linear);
        assert_float_eq!(score, 1.5, abs <= 1e-9);
        // Saturated raw and length
        let score = normalize_score(5.0, 500, (0.0, 1.0), 100, Normalization::Linear);
        assert_float_eq!(score, 3.0, abs <= 1e-9);
        // Below range
        let score = normalize_score(-1.0, 100, (0.0, 1.0), 100, Normalization::Linear);
        assert_float_eq!(score, 1.0, abs <= 1e-9);
    }

    #[test]
    fn degenerate_range_uses_full_raw_fraction() {
        let score = normalize_score(7.0, 100, (2.0, 2.0), 100, Normalization::Linear);
        assert_float_eq!(score, 3.0, abs <= 1e-9);
    }

    #[test]
    fn log10_interpolation() {
        // Halfway in log space between 1 and 100 is 10.
        let score = normalize_score(10.0, 200, (1.0, 100.0), 200, Normalization::Log10);
        assert_float_eq!(score, 2.0, abs <= 1e-9);
    }

    #[test]
    fn identity_clamps_and_rounds() {
        assert_float_eq!(
            normalize_score(2.347, 10, (1.0, 3.0), 100, Normalization::Identity),
            2.35,
            abs <= 1e-9
        );
        assert_float_eq!(
            normalize_score(4.2, 10, (1.0, 3.0), 100, Normalization::Identity),
            3.0,
            abs <= 1e-9
        );
        assert_float_eq!(
            normalize_score(0.2, 10, (1.0, 3.0), 100, Normalization::Identity),
            1.0,
            abs <= 1e-9
        );
    }

    #[test]
    fn scores_always_land_in_band() {
        for raw in [-10.0, 0.0, 0.3, 1.0, 7.5, 1e6] {
            for len in [1usize, 10, 120, 5000] {
                for method in [Normalization::Linear, Normalization::Log10] {
                    let s = normalize_score(raw, len, (0.5, 4.0), 120, method);
                    assert!((1.0..=3.0).contains(&s), "raw={raw} len={len} s={s}");
                }
            }
        }
    }
}
