//! Triplex detector: H-DNA mirror repeats with mechanistic
//! Frank-Kamenetskii scoring, plus sticky DNA (GAA/TTC) tracts with
//! piecewise copy-number scoring. The two subclasses may coexist on the
//! same span; overlaps are only removed within a subclass.

use fnv::FnvHashMap;
use regex::bytes::Regex;

use crate::detector::{round3, MotifDetector, Normalization, PatternGroup, PatternInfo};
use crate::motif::{Motif, Strand};
use crate::seq_utils::gc_content;
use crate::taxonomy::MotifClass;

const MIN_ARM: usize = 10;
const MAX_ARM: usize = 100;
const MAX_LOOP: usize = 8;
const PURITY_THRESHOLD: f64 = 0.90;
const SEED_SIZE: usize = 6;
const SCORE_THRESHOLD: f64 = 0.25;

// Frank-Kamenetskii 1995 weighting of the mirror-repeat score.
const H_REF_ARM: f64 = 35.0;
const H_LOOP_ALPHA: f64 = 0.4;
const H_WEIGHT_L: f64 = 0.35;
const H_WEIGHT_H: f64 = 0.20;
const H_WEIGHT_P: f64 = 0.30;
const H_WEIGHT_I: f64 = 0.15;
const H_PURITY_MIN: f64 = 0.8;
const H_PURITY_RANGE: f64 = 0.2;

// Sakamoto 1999 FRDA copy-number bands.
const STICKY_REPLICATION_MIN: usize = 20;
const STICKY_STABLE_MIN: usize = 40;
const STICKY_PATHOGENIC_MIN: usize = 60;
const STICKY_WEAK_SCALE: f64 = 0.015;
const STICKY_REPLICATION_BASE: f64 = 1.3;
const STICKY_REPLICATION_SCALE: f64 = 0.03;
const STICKY_STABLE_BASE: f64 = 2.0;
const STICKY_STABLE_SCALE: f64 = 0.02;
const STICKY_PATHOGENIC_BASE: f64 = 2.6;
const STICKY_PATHOGENIC_SCALE: f64 = 0.01;

#[derive(Debug)]
struct MirrorHit {
    start: usize,
    end: usize,
    arm_len: usize,
    loop_len: usize,
    purity: f64,
    interruptions: usize,
    score: f64,
}

#[derive(Debug)]
struct StickyHit {
    start: usize,
    end: usize,
    unit: &'static str,
    pattern_id: &'static str,
    copies: usize,
    score: f64,
    replication: bool,
    sticky: bool,
    pathogenic: bool,
}

pub struct TriplexDetector {
    sticky_patterns: Vec<(Regex, &'static str, &'static str)>,
}

impl Default for TriplexDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TriplexDetector {
    pub fn new() -> Self {
        let sticky_patterns = [
            (r"(?:GAA){4,}", "TRX_STICKY_GAA", "GAA"),
            (r"(?:TTC){4,}", "TRX_STICKY_TTC", "TTC"),
        ]
        .iter()
        .map(|(p, id, unit)| {
            (Regex::new(p).expect("hard-coded sticky pattern"), *id, *unit)
        })
        .collect();
        TriplexDetector { sticky_patterns }
    }

    /// Mechanistic H-DNA score on the 1-3 scale: log-saturated arm term,
    /// exponential loop decay, purity excess, interruption damping.
    fn score_mirror(arm_len: usize, loop_len: usize, purity: f64, interruptions: usize) -> f64 {
        let l = ((arm_len.max(1) as f64).ln() / H_REF_ARM.ln()).min(1.0);
        let h = (-H_LOOP_ALPHA * loop_len as f64).exp();
        let p = if purity >= H_PURITY_MIN {
            ((purity - H_PURITY_MIN) / H_PURITY_RANGE).max(0.0)
        } else {
            0.0
        };
        let i = 1.0 / (1.0 + interruptions as f64);
        let raw = H_WEIGHT_L * l + H_WEIGHT_H * h + H_WEIGHT_P * p + H_WEIGHT_I * i;
        round3(1.0 + 2.0 * raw.min(1.0))
    }

    fn find_mirror_repeats(&self, seq: &[u8]) -> Vec<MirrorHit> {
        let n = seq.len();
        if n < SEED_SIZE {
            return Vec::new();
        }
        let mut index: FnvHashMap<[u8; SEED_SIZE], Vec<usize>> = FnvHashMap::default();
        for i in 0..=n - SEED_SIZE {
            let key: [u8; SEED_SIZE] =
                seq[i..i + SEED_SIZE].try_into().expect("seed window");
            index.entry(key).or_default().push(i);
        }

        let mut hits = Vec::new();
        for i in 0..=n - SEED_SIZE {
            let mut mirror: [u8; SEED_SIZE] =
                seq[i..i + SEED_SIZE].try_into().expect("seed window");
            mirror.reverse();
            let positions = match index.get(&mirror) {
                Some(p) => p,
                None => continue,
            };
            // Positions are sorted; only j within the loop window matter.
            let lo = positions.partition_point(|&j| j < i + SEED_SIZE);
            for &j in &positions[lo..] {
                if j > i + SEED_SIZE + MAX_LOOP {
                    break;
                }
                let loop_len = j - (i + SEED_SIZE);
                let right_start = j;
                let mut left_start = i;
                let mut arm_len = SEED_SIZE;
                while left_start > 0
                    && right_start + arm_len < n
                    && seq[left_start - 1] == seq[right_start + arm_len]
                    && arm_len < MAX_ARM
                {
                    left_start -= 1;
                    arm_len += 1;
                }
                if arm_len < MIN_ARM {
                    continue;
                }

                let left = &seq[left_start..left_start + arm_len];
                let purines = left.iter().filter(|&&b| b == b'A' || b == b'G').count();
                let pyrimidines =
                    left.iter().filter(|&&b| b == b'C' || b == b'T').count();
                let purine_frac = purines as f64 / arm_len as f64;
                let pyr_frac = pyrimidines as f64 / arm_len as f64;
                let purity = purine_frac.max(pyr_frac);
                if purity < PURITY_THRESHOLD {
                    continue;
                }
                let interruptions = if purine_frac > pyr_frac {
                    arm_len - purines
                } else {
                    arm_len - pyrimidines
                };
                hits.push(MirrorHit {
                    start: left_start,
                    end: right_start + arm_len,
                    arm_len,
                    loop_len,
                    purity,
                    interruptions,
                    score: Self::score_mirror(arm_len, loop_len, purity, interruptions),
                });
            }
        }
        hits.sort_by(|a, b| {
            b.arm_len
                .cmp(&a.arm_len)
                .then(a.loop_len.cmp(&b.loop_len))
                .then(a.start.cmp(&b.start))
        });
        hits
    }

    fn score_sticky(copies: usize) -> (f64, bool, bool, bool) {
        if copies < STICKY_REPLICATION_MIN {
            (
                (1.0 + STICKY_WEAK_SCALE * copies as f64).min(3.0),
                false,
                false,
                false,
            )
        } else if copies < STICKY_STABLE_MIN {
            (
                (STICKY_REPLICATION_BASE
                    + STICKY_REPLICATION_SCALE * (copies - STICKY_REPLICATION_MIN) as f64)
                    .min(3.0),
                true,
                false,
                false,
            )
        } else if copies < STICKY_PATHOGENIC_MIN {
            (
                (STICKY_STABLE_BASE
                    + STICKY_STABLE_SCALE * (copies - STICKY_STABLE_MIN) as f64)
                    .min(3.0),
                false,
                true,
                false,
            )
        } else {
            (
                (STICKY_PATHOGENIC_BASE
                    + STICKY_PATHOGENIC_SCALE * (copies - STICKY_PATHOGENIC_MIN) as f64)
                    .min(3.0),
                false,
                false,
                true,
            )
        }
    }

    fn find_sticky(&self, seq: &[u8]) -> Vec<StickyHit> {
        let mut hits = Vec::new();
        for (re, pattern_id, unit) in &self.sticky_patterns {
            for m in re.find_iter(seq) {
                let copies = (m.end() - m.start()) / 3;
                let (score, replication, sticky, pathogenic) = Self::score_sticky(copies);
                hits.push(StickyHit {
                    start: m.start(),
                    end: m.end(),
                    unit,
                    pattern_id,
                    copies,
                    score: round3(score),
                    replication,
                    sticky,
                    pathogenic,
                });
            }
        }
        hits.sort_by(|a, b| (b.end - b.start).cmp(&(a.end - a.start)).then(a.start.cmp(&b.start)));
        hits
    }
}

impl MotifDetector for TriplexDetector {
    fn class(&self) -> MotifClass {
        MotifClass::Triplex
    }

    fn patterns(&self) -> Vec<PatternGroup> {
        vec![
            PatternGroup {
                name: "mirror_triplex",
                patterns: vec![PatternInfo {
                    pattern: "",
                    id: "TRX_MIRROR",
                    name: "Mirror repeat triplex",
                    subclass: "Triplex",
                    min_len: MIN_ARM,
                    score_tag: "structural_triplex_score",
                    min_score: SCORE_THRESHOLD,
                    reference: "Frank-Kamenetskii 1995",
                }],
            },
            PatternGroup {
                name: "sticky_dna",
                patterns: vec![
                    PatternInfo {
                        pattern: r"(?:GAA){4,}",
                        id: "TRX_STICKY_GAA",
                        name: "GAA repeat",
                        subclass: "Sticky DNA",
                        min_len: 12,
                        score_tag: "sticky_dna_score",
                        min_score: 0.95,
                        reference: "Sakamoto 1999",
                    },
                    PatternInfo {
                        pattern: r"(?:TTC){4,}",
                        id: "TRX_STICKY_TTC",
                        name: "TTC repeat",
                        subclass: "Sticky DNA",
                        min_len: 12,
                        score_tag: "sticky_dna_score",
                        min_score: 0.95,
                        reference: "Sakamoto 1999",
                    },
                ],
            },
        ]
    }

    fn raw_score_bounds(&self, _subclass: &str, _length: usize) -> (f64, f64) {
        (1.0, 3.0)
    }

    fn normalization(&self, _subclass: &str) -> Normalization {
        Normalization::Identity
    }

    fn detect(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
        let n = seq.len();
        let mut motifs = Vec::new();

        // Mirror repeats: greedy acceptance on a per-subclass used mask.
        let mut mirror_used = vec![false; n];
        for hit in self.find_mirror_repeats(seq) {
            if seq[hit.start..hit.end].is_empty()
                || mirror_used[hit.start..hit.end].iter().any(|&u| u)
            {
                continue;
            }
            mirror_used[hit.start..hit.end]
                .iter_mut()
                .for_each(|u| *u = true);
            let score = self.normalize(hit.score, hit.end - hit.start, "Triplex");
            let mut motif = Motif::from_span(
                seq,
                sequence_name,
                MotifClass::Triplex,
                "Triplex",
                (hit.start, hit.end),
                hit.score,
                score,
                Strand::plus(),
                "Triplex_seed_mirror_detection",
                "TRX_MIRROR",
            );
            motif.set_attr("Arm_Length", hit.arm_len);
            motif.set_attr("Loop_Length", hit.loop_len);
            motif.set_attr("Purity", round3(hit.purity));
            motif.set_attr("Interruptions", hit.interruptions);
            motif.set_attr("GC_Content", round3(gc_content(&seq[hit.start..hit.end])));
            motif.set_attr("Type_Of_Repeat", "Mirror repeat (inverted)");
            motif.set_attr(
                "Criterion",
                format!(
                    "Mirror repeat: arm>={MIN_ARM}bp, loop<={MAX_LOOP}bp; arm_length={}bp, loop_length={}bp; Pu/Py purity={:.1}% >={:.0}%",
                    hit.arm_len,
                    hit.loop_len,
                    hit.purity * 100.0,
                    PURITY_THRESHOLD * 100.0
                ),
            );
            motif.set_attr(
                "Disease_Relevance",
                if hit.arm_len >= 50 {
                    "PKD1-like structure (polycystic kidney disease associated)"
                } else if hit.arm_len >= 30 {
                    "Long mirror repeat - genomic instability risk, chromosomal rearrangement"
                } else {
                    "H-DNA formation potential (transcription, replication regulation)"
                },
            );
            motif.set_attr(
                "Regions_Involved",
                format!(
                    "Left arm ({}bp) - Loop ({}bp) - Right arm ({}bp mirror)",
                    hit.arm_len, hit.loop_len, hit.arm_len
                ),
            );
            motifs.push(motif);
        }

        // Sticky DNA tracks its own used mask; coexistence with mirror
        // repeats is intentional.
        let mut sticky_used = vec![false; n];
        for hit in self.find_sticky(seq) {
            if sticky_used[hit.start..hit.end].iter().any(|&u| u) {
                continue;
            }
            sticky_used[hit.start..hit.end]
                .iter_mut()
                .for_each(|u| *u = true);
            let score = self.normalize(hit.score, hit.end - hit.start, "Sticky DNA");
            let mut motif = Motif::from_span(
                seq,
                sequence_name,
                MotifClass::Triplex,
                "Sticky DNA",
                (hit.start, hit.end),
                hit.score,
                score,
                Strand::plus(),
                "Sticky_DNA_detection",
                hit.pattern_id,
            );
            motif.set_attr("Repeat_Unit", hit.unit);
            motif.set_attr("Copy_Number", hit.copies);
            motif.set_attr("Type_Of_Repeat", format!("Trinucleotide ({})", hit.unit));
            motif.set_attr("Replication_Blockage_Range", hit.replication);
            motif.set_attr("Sticky_Threshold_Range", hit.sticky);
            motif.set_attr("Pathogenic_Range", hit.pathogenic);
            motif.set_attr("Arm_Length", crate::motif::AttrValue::Na);
            motif.set_attr("Loop_Length", crate::motif::AttrValue::Na);
            motif.set_attr("GC_Content", round3(gc_content(&seq[hit.start..hit.end])));
            motif.set_attr(
                "Criterion",
                format!(
                    "GAA/TTC trinucleotide repeat >=4 copies; n={} copies detected",
                    hit.copies
                ),
            );
            motif.set_attr(
                "Disease_Relevance",
                Self::sticky_disease_relevance(hit.copies),
            );
            motif.set_attr(
                "Regions_Involved",
                format!("{} trinucleotide repeat x {} copies", hit.unit, hit.copies),
            );
            motifs.push(motif);
        }

        motifs.sort_by_key(|m| m.start);
        motifs
    }
}

impl TriplexDetector {
    fn sticky_disease_relevance(copies: usize) -> String {
        if copies >= 66 {
            format!("Friedreich ataxia (FRDA): pathogenic n>=66, detected n={copies}")
        } else if copies >= 40 {
            format!("Friedreich ataxia risk: intermediate n={copies} (normal <33)")
        } else if copies >= 20 {
            format!("Replication stress: n={copies} may cause polymerase stalling")
        } else {
            format!("Weak triplex potential: n={copies}")
        }
    }
}

#[cfg(test)]
mod test {
    use float_eq::assert_float_eq;
    use pretty_assertions::assert_eq;

    use super::*;

    fn detector() -> TriplexDetector {
        TriplexDetector::new()
    }

    #[test]
    fn sticky_gaa_six_copies() {
        let motifs = detector().detect(b"GAAGAAGAAGAAGAAGAA", "gaa");
        let m = motifs
            .iter()
            .find(|m| m.subclass == "Sticky DNA")
            .expect("sticky motif");
        assert_eq!(m.class, MotifClass::Triplex);
        assert_eq!(m.attr("Copy_Number").unwrap().as_i64(), Some(6));
        assert_eq!(
            m.attr("Replication_Blockage_Range").unwrap().as_bool(),
            Some(false)
        );
        assert!(m.score >= 1.0 && m.score <= 1.3, "score={}", m.score);
        assert_float_eq!(m.raw_score, 1.09, abs <= 1e-9);
    }

    #[test]
    fn sticky_bands_escalate() {
        let (weak, ..) = TriplexDetector::score_sticky(6);
        let (replication, r, _, _) = TriplexDetector::score_sticky(25);
        let (stable, _, s, _) = TriplexDetector::score_sticky(45);
        let (pathogenic, _, _, p) = TriplexDetector::score_sticky(70);
        assert!(weak < replication && replication < stable && stable < pathogenic);
        assert!(r && s && p);
        assert!(pathogenic <= 3.0);
    }

    #[test]
    fn mirror_repeat_with_high_purity() {
        // Pure purine arm, reversed on the other side of a short loop.
        let arm = b"AAGAAAGGAAGA";
        let mut seq = arm.to_vec();
        seq.extend_from_slice(b"CCC");
        let mut rev = arm.to_vec();
        rev.reverse();
        seq.extend_from_slice(&rev);
        let motifs = detector().detect(&seq, "mirror");
        let m = motifs
            .iter()
            .find(|m| m.subclass == "Triplex")
            .expect("mirror motif");
        assert!(m.attr("Arm_Length").unwrap().as_i64().unwrap() >= 10);
        assert!(m.attr("Purity").unwrap().as_f64().unwrap() >= 0.9);
        assert!(m.score >= 1.0 && m.score <= 3.0);
    }

    #[test]
    fn low_purity_mirrors_are_rejected() {
        // Mixed-composition arm fails the 90% purine/pyrimidine gate.
        let arm = b"ACGTACGTACGT";
        let mut seq = arm.to_vec();
        seq.extend_from_slice(b"AA");
        let mut rev = arm.to_vec();
        rev.reverse();
        seq.extend_from_slice(&rev);
        let motifs = detector().detect(&seq, "mixed");
        assert!(motifs.iter().all(|m| m.subclass != "Triplex"));
    }

    #[test]
    fn empty_sequence() {
        assert!(detector().detect(b"", "empty").is_empty());
    }
}
