//! Cruciform detector: inverted repeats stable enough to extrude a
//! hairpin, found by encoded 6-mer seed pairing and filtered on
//! nearest-neighbor stem energetics.

use crate::detector::{round3, MotifDetector, Normalization, PatternGroup, PatternInfo};
use crate::motif::{AttrValue, Motif, Strand};
use crate::seq_utils::{complement, gc_content, revcomp};
use crate::tables::nn_energy;
use crate::taxonomy::MotifClass;

const MIN_ARM: usize = 8;
const MAX_ARM: usize = 50;
const MAX_LOOP: usize = 12;
const SEED_SIZE: usize = 6;
const DELTA_G_THRESHOLD: f64 = -5.0;
const SCORE_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone)]
struct InvertedRepeat {
    left_start: usize,
    left_end: usize,
    right_start: usize,
    right_end: usize,
    arm_len: usize,
    loop_len: usize,
    mismatches: usize,
    delta_g: f64,
    score: f64,
}

pub struct CruciformDetector {
    max_mismatches: usize,
}

impl Default for CruciformDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CruciformDetector {
    pub fn new() -> Self {
        CruciformDetector { max_mismatches: 0 }
    }

    /// Exact 4-base codes for every 6-mer window: `fwd[i]` encodes
    /// seq[i..i+6] big-endian, `rc[i]` encodes its reverse complement.
    /// A seed pair (i, j) is valid when rc[i] == fwd[j]. Windows touching
    /// ambiguous bases encode to None.
    fn window_codes(seq: &[u8]) -> (Vec<Option<u16>>, Vec<Option<u16>>) {
        let n = seq.len();
        if n < SEED_SIZE {
            return (Vec::new(), Vec::new());
        }
        let num = n - SEED_SIZE + 1;
        let mut fwd = vec![None; num];
        let mut rc = vec![None; num];
        for i in 0..num {
            let mut f: u16 = 0;
            let mut r: u16 = 0;
            let mut ok = true;
            for j in 0..SEED_SIZE {
                let code = match seq[i + j] {
                    b'A' => 0u16,
                    b'C' => 1,
                    b'G' => 2,
                    b'T' => 3,
                    _ => {
                        ok = false;
                        break;
                    }
                };
                f = f * 4 + code;
                // revcomp reverses position order and complements (3 - code)
                r += (3 - code) * 4u16.pow(j as u32);
            }
            if ok {
                fwd[i] = Some(f);
                rc[i] = Some(r);
            }
        }
        (fwd, rc)
    }

    fn loop_penalty(loop_len: usize) -> f64 {
        if loop_len == 0 {
            4.0
        } else {
            1.75 + 0.6 * (loop_len as f64).ln()
        }
    }

    fn stem_delta_g(stem: &[u8]) -> f64 {
        stem.windows(2).map(nn_energy).sum()
    }

    fn find_inverted_repeats(&self, seq: &[u8]) -> Vec<InvertedRepeat> {
        let n = seq.len();
        let (fwd, rc) = Self::window_codes(seq);
        if fwd.is_empty() {
            return Vec::new();
        }
        let num = fwd.len();
        let mut hits = Vec::new();

        // One sweep per loop offset: all (i, i + SEED + d) pairs at once.
        for d in 0..=MAX_LOOP {
            let j_offset = SEED_SIZE + d;
            if j_offset >= num {
                break;
            }
            for i in 0..num - j_offset {
                let (a, b) = (rc[i], fwd[i + j_offset]);
                let (a, b) = match (a, b) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };
                if a != b {
                    continue;
                }

                let right_start = i + j_offset;
                let loop_len = d;
                let mut left_start = i;
                let mut arm_len = SEED_SIZE;
                let mut mismatches = 0usize;

                while left_start > 0 && right_start + arm_len < n && arm_len < MAX_ARM {
                    if seq[left_start - 1] != complement(seq[right_start + arm_len]) {
                        mismatches += 1;
                        if mismatches > self.max_mismatches {
                            break;
                        }
                    }
                    left_start -= 1;
                    arm_len += 1;
                }

                if arm_len < MIN_ARM {
                    continue;
                }

                let left_end = left_start + arm_len;
                let delta_g = Self::stem_delta_g(&seq[left_start..left_end])
                    + Self::loop_penalty(loop_len);
                if delta_g > DELTA_G_THRESHOLD {
                    continue;
                }
                let score = (-delta_g / 20.0).clamp(0.0, 1.0);
                hits.push(InvertedRepeat {
                    left_start,
                    left_end,
                    right_start,
                    right_end: right_start + arm_len,
                    arm_len,
                    loop_len,
                    mismatches,
                    delta_g,
                    score,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.left_start.cmp(&b.left_start))
                .then(b.arm_len.cmp(&a.arm_len))
        });
        hits
    }

    fn remove_overlaps(hits: Vec<InvertedRepeat>) -> Vec<InvertedRepeat> {
        let mut selected: Vec<InvertedRepeat> = Vec::new();
        for hit in hits {
            let overlaps = selected.iter().any(|s| {
                !(hit.right_end <= s.left_start || hit.left_start >= s.right_end)
            });
            if !overlaps {
                selected.push(hit);
            }
        }
        selected.sort_by_key(|h| h.left_start);
        selected
    }
}

impl MotifDetector for CruciformDetector {
    fn class(&self) -> MotifClass {
        MotifClass::Cruciform
    }

    fn patterns(&self) -> Vec<PatternGroup> {
        vec![PatternGroup {
            name: "inverted_repeats",
            patterns: vec![PatternInfo {
                pattern: "",
                id: "CRU_IR",
                name: "Thermodynamic palindrome",
                subclass: "Cruciform forming IRs",
                min_len: 2 * MIN_ARM,
                score_tag: "cruciform_stability",
                min_score: SCORE_THRESHOLD,
                reference: "Lilley 2000; SantaLucia 1998",
            }],
        }]
    }

    fn raw_score_bounds(&self, _subclass: &str, _length: usize) -> (f64, f64) {
        (SCORE_THRESHOLD, 1.0)
    }

    fn normalization(&self, _subclass: &str) -> Normalization {
        Normalization::Linear
    }

    fn detect(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
        let hits = self.find_inverted_repeats(seq);
        let filtered: Vec<InvertedRepeat> = hits
            .into_iter()
            .filter(|h| h.score > SCORE_THRESHOLD)
            .collect();
        let selected = Self::remove_overlaps(filtered);

        selected
            .into_iter()
            .enumerate()
            .map(|(i, hit)| {
                let span = (hit.left_start, hit.right_end);
                let score = self.normalize(
                    hit.score,
                    hit.right_end - hit.left_start,
                    "Cruciform forming IRs",
                );
                let pattern_id = format!("CRU_{}", i + 1);
                let mut motif = Motif::from_span(
                    seq,
                    sequence_name,
                    MotifClass::Cruciform,
                    "Cruciform forming IRs",
                    span,
                    round3(hit.score),
                    score,
                    Strand::plus(),
                    "Cruciform_detection",
                    &pattern_id,
                );
                let left = &seq[hit.left_start..hit.left_end];
                let right = &seq[hit.right_start..hit.right_end];
                let loop_seq = &seq[hit.left_end..hit.right_start];
                motif.set_attr("Left_Arm", String::from_utf8_lossy(left).into_owned());
                motif.set_attr("Right_Arm", String::from_utf8_lossy(right).into_owned());
                motif.set_attr(
                    "Right_Arm_RC",
                    String::from_utf8_lossy(&revcomp(right)).into_owned(),
                );
                motif.set_attr(
                    "Loop_Seq",
                    String::from_utf8_lossy(loop_seq).into_owned(),
                );
                motif.set_attr("Arm_Length", hit.arm_len);
                motif.set_attr("Stem_Length", hit.arm_len);
                motif.set_attr("Loop_Length", hit.loop_len);
                motif.set_attr("Mismatches", hit.mismatches);
                motif.set_attr(
                    "Match_Fraction",
                    round3((hit.arm_len - hit.mismatches) as f64 / hit.arm_len as f64),
                );
                motif.set_attr("DeltaG", round3(hit.delta_g));
                motif.set_attr("GC_Content", round3(gc_content(&seq[hit.left_start..hit.right_end])));
                motif.set_attr("GC_Left_Arm", round3(gc_content(left)));
                motif.set_attr("GC_Right_Arm", round3(gc_content(right)));
                motif.set_attr(
                    "GC_Loop",
                    if loop_seq.is_empty() {
                        AttrValue::Na
                    } else {
                        AttrValue::Float(round3(gc_content(loop_seq)))
                    },
                );
                motif.set_attr("Type_Of_Repeat", "Inverted repeat (palindromic mirror)");
                motif.set_attr(
                    "Criterion",
                    format!(
                        "Inverted repeat: arm>={MIN_ARM}bp, loop<={MAX_LOOP}bp; arm_length={}bp, loop_length={}bp; dG={:.2} kcal/mol",
                        hit.arm_len, hit.loop_len, hit.delta_g
                    ),
                );
                motif.set_attr(
                    "Disease_Relevance",
                    Self::disease_relevance(hit.arm_len, hit.delta_g, gc_content(&seq[hit.left_start..hit.right_end])),
                );
                motif.set_attr(
                    "Regions_Involved",
                    format!(
                        "Left arm ({}bp) - Loop ({}bp) - Right arm ({}bp mirror)",
                        hit.arm_len, hit.loop_len, hit.arm_len
                    ),
                );
                motif
            })
            .collect()
    }
}

impl CruciformDetector {
    fn disease_relevance(arm_len: usize, delta_g: f64, gc: f64) -> String {
        let mut notes: Vec<String> = Vec::new();
        if delta_g < -10.0 {
            notes.push(format!(
                "Highly stable cruciform (dG={delta_g:.1}) - DNA breakage, genomic instability"
            ));
        }
        if arm_len >= 30 {
            notes.push("Long palindrome - chromosomal translocations, deletions".to_string());
        }
        if gc < 40.0 {
            notes.push(
                "AT-rich palindrome - replication fork stalling, fragile sites".to_string(),
            );
        }
        notes.push(
            "Cruciform formation - recombination hotspot, transcription regulation, replication origin"
                .to_string(),
        );
        notes.join("; ")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn detector() -> CruciformDetector {
        CruciformDetector::new()
    }

    #[test]
    fn perfect_inverted_repeat_with_loop() {
        // 18 bp arm + 5 bp loop + reverse complement of the arm.
        let arm = b"GCATGCATGCATGCATGC";
        let mut seq = arm.to_vec();
        seq.extend_from_slice(b"TTTTT");
        seq.extend_from_slice(&revcomp(arm));
        let motifs = detector().detect(&seq, "ir");
        assert!(!motifs.is_empty());
        let m = &motifs[0];
        assert_eq!(m.subclass, "Cruciform forming IRs");
        let arm_len = m.attr("Arm_Length").unwrap().as_i64().unwrap();
        assert!(arm_len >= 18, "arm_len={arm_len}");
        assert_eq!(m.attr("Loop_Length").unwrap().as_i64(), Some(5));
        assert!(m.attr("DeltaG").unwrap().as_f64().unwrap() < -5.0);
    }

    #[test]
    fn unstable_short_hairpins_are_rejected() {
        // Arms below MIN_ARM never qualify.
        let motifs = detector().detect(b"GCATGCTTTTTAGCATGC", "short");
        assert!(motifs.is_empty());
    }

    #[test]
    fn random_sequence_is_quiet() {
        let motifs = detector().detect(b"ACGTACGTACGTACGTACGTACGTACGT", "rand");
        // Self-similar but no long revcomp arms within the loop bound.
        assert!(motifs.is_empty() || motifs[0].attr("DeltaG").unwrap().as_f64().unwrap() < -5.0);
    }

    #[test]
    fn accepted_repeats_do_not_overlap() {
        let arm1 = b"GGGCCCATAGGCAATT";
        let mut seq = arm1.to_vec();
        seq.extend_from_slice(b"AAA");
        seq.extend_from_slice(&revcomp(arm1));
        seq.extend_from_slice(b"TTTTTTTTTT");
        let arm2 = b"CCGGTTAACCGGAATT";
        seq.extend_from_slice(arm2);
        seq.extend_from_slice(b"CC");
        seq.extend_from_slice(&revcomp(arm2));
        let motifs = detector().detect(&seq, "two");
        for (i, a) in motifs.iter().enumerate() {
            for b in motifs.iter().skip(i + 1) {
                assert_eq!(a.overlap_len(b), 0);
            }
        }
    }

    #[test]
    fn loop_penalty_shape() {
        use float_eq::assert_float_eq;
        assert_float_eq!(CruciformDetector::loop_penalty(0), 4.0, abs <= 1e-12);
        assert_float_eq!(
            CruciformDetector::loop_penalty(1),
            1.75,
            abs <= 1e-9
        );
        assert!(CruciformDetector::loop_penalty(10) > CruciformDetector::loop_penalty(2));
    }
}
