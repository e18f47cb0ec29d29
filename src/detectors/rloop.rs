//! R-loop detector implementing the quantitative RLFS model: a G-rich
//! RNA-invasion zone (RIZ), a fixed linker, and a windowed search for the
//! best downstream extension zone (REZ). Both strands are scanned.

use regex::bytes::Regex;

use crate::detector::{round2, round3, MotifDetector, Normalization, PatternGroup, PatternInfo};
use crate::motif::{Motif, Strand};
use crate::seq_utils::{g_prefix_sums, gc_content, revcomp};
use crate::taxonomy::MotifClass;

const MIN_PERC_G_RIZ: f64 = 50.0;
const NUM_LINKER: usize = 50;
const WINDOW_STEP: usize = 100;
const END_STEP: usize = 50;
const MAX_LENGTH_REZ: usize = 2000;
const MIN_PERC_G_REZ: f64 = 40.0;
const QUALITY_THRESHOLD: f64 = 0.4;

const SUBCLASS: &str = "R-loop formation sites";

#[derive(Debug, Clone)]
struct Rez {
    start: usize,
    end: usize,
    perc_g: f64,
}

#[derive(Debug, Clone)]
struct RlfsAnnotation {
    model: &'static str,
    riz_start: usize,
    riz_end: usize,
    riz_perc_g: f64,
    rez: Option<Rez>,
}

impl RlfsAnnotation {
    fn total_span(&self) -> (usize, usize) {
        match &self.rez {
            Some(rez) => (self.riz_start, rez.end),
            None => (self.riz_start, self.riz_end),
        }
    }
}

pub struct RLoopDetector {
    models: Vec<(&'static str, Regex)>,
}

impl Default for RLoopDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl RLoopDetector {
    pub fn new() -> Self {
        let models = vec![
            (
                "qmrlfs_model_1",
                Regex::new(r"G{3,}[ATCG]{1,10}?G{3,}(?:[ATCG]{1,10}?G{3,}){1,}?")
                    .expect("hard-coded RLFS pattern"),
            ),
            (
                "qmrlfs_model_2",
                Regex::new(r"G{4,}(?:[ATCG]{1,10}?G{4,}){1,}?")
                    .expect("hard-coded RLFS pattern"),
            ),
        ];
        RLoopDetector { models }
    }

    fn percent_g(prefix: &[u32], start: usize, end: usize) -> f64 {
        if end <= start {
            return 0.0;
        }
        let g = (prefix[end] - prefix[start]) as f64;
        g / (end - start) as f64 * 100.0
    }

    /// Best REZ downstream of a RIZ: skip the linker, then slide window
    /// starts (100 bp step); any start whose 100 bp seed reaches 40 %G is
    /// expanded over 50 bp end steps, maximizing %G x length. The shared
    /// prefix-sum makes each window a subtraction.
    fn find_rez(prefix: &[u32], seq_len: usize, riz_end: usize) -> Option<Rez> {
        let search_start = riz_end + NUM_LINKER;
        if search_start >= seq_len {
            return None;
        }
        let max_end = seq_len.min(riz_end + MAX_LENGTH_REZ);
        let mut best: Option<Rez> = None;
        let mut best_score = 0.0f64;

        let mut start = search_start;
        while start < max_end {
            let seed_end = (start + 100).min(seq_len);
            if seed_end > start
                && Self::percent_g(prefix, start, seed_end) >= MIN_PERC_G_REZ
            {
                let mut end = start + END_STEP;
                while end < max_end {
                    let perc_g = Self::percent_g(prefix, start, end);
                    if perc_g >= MIN_PERC_G_REZ {
                        let score = perc_g * (end - start) as f64 / 100.0;
                        if score > best_score {
                            best_score = score;
                            best = Some(Rez {
                                start,
                                end,
                                perc_g: round2(perc_g),
                            });
                        }
                    }
                    end += END_STEP;
                }
            }
            start += WINDOW_STEP;
        }
        best
    }

    /// RIZ+REZ annotations on one strand. The G prefix-sum is computed
    /// once here and threaded through every REZ search.
    fn annotate(&self, seq: &[u8]) -> Vec<RlfsAnnotation> {
        let prefix = g_prefix_sums(seq);
        let mut results = Vec::new();
        for (model, re) in &self.models {
            for m in re.find_iter(seq) {
                let riz_perc_g = Self::percent_g(&prefix, m.start(), m.end());
                if riz_perc_g < MIN_PERC_G_RIZ {
                    continue;
                }
                results.push(RlfsAnnotation {
                    model,
                    riz_start: m.start(),
                    riz_end: m.end(),
                    riz_perc_g: round2(riz_perc_g),
                    rez: Self::find_rez(&prefix, seq.len(), m.end()),
                });
            }
        }
        results
    }
}

impl MotifDetector for RLoopDetector {
    fn class(&self) -> MotifClass {
        MotifClass::RLoop
    }

    fn patterns(&self) -> Vec<PatternGroup> {
        vec![
            PatternGroup {
                name: "qmrlfs_model_1",
                patterns: vec![PatternInfo {
                    pattern: r"G{3,}[ATCG]{1,10}?G{3,}(?:[ATCG]{1,10}?G{3,}){1,}?",
                    id: "RLOOP_M1",
                    name: "QmRLFS Model 1",
                    subclass: SUBCLASS,
                    min_len: 12,
                    score_tag: "qmrlfs_score",
                    min_score: QUALITY_THRESHOLD,
                    reference: "Jenjaroenpun 2016",
                }],
            },
            PatternGroup {
                name: "qmrlfs_model_2",
                patterns: vec![PatternInfo {
                    pattern: r"G{4,}(?:[ATCG]{1,10}?G{4,}){1,}?",
                    id: "RLOOP_M2",
                    name: "QmRLFS Model 2",
                    subclass: SUBCLASS,
                    min_len: 8,
                    score_tag: "qmrlfs_score",
                    min_score: QUALITY_THRESHOLD,
                    reference: "Jenjaroenpun 2016",
                }],
            },
        ]
    }

    fn raw_score_bounds(&self, _subclass: &str, _length: usize) -> (f64, f64) {
        (QUALITY_THRESHOLD, 1.0)
    }

    fn normalization(&self, _subclass: &str) -> Normalization {
        Normalization::Linear
    }

    fn detect(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
        let n = seq.len();
        let rc = revcomp(seq);
        let mut motifs = Vec::new();

        for (strand, target) in [(Strand::plus(), seq), (Strand::minus(), rc.as_slice())] {
            for (i, ann) in self.annotate(target).into_iter().enumerate() {
                let (local_start, local_end) = ann.total_span();
                let (start, end) = if strand.is_minus_strand() {
                    (n - local_end, n - local_start)
                } else {
                    (local_start, local_end)
                };
                let rez_perc = ann.rez.as_ref().map(|r| r.perc_g).unwrap_or(0.0);
                let raw = (ann.riz_perc_g / 100.0 + rez_perc / 100.0).min(1.0);
                let score = self.normalize(raw, end - start, SUBCLASS);
                let pattern_id = format!("RLOOP_{}_{}", ann.model, i + 1);
                let mut motif = Motif::from_span(
                    seq,
                    sequence_name,
                    MotifClass::RLoop,
                    SUBCLASS,
                    (start, end),
                    round3(raw),
                    score,
                    strand,
                    "QmRLFS_detection",
                    &pattern_id,
                );
                let riz_len = ann.riz_end - ann.riz_start;
                let rez_len = ann.rez.as_ref().map(|r| r.end - r.start).unwrap_or(0);
                let total_len = end - start;
                let linker_len = total_len.saturating_sub(riz_len + rez_len);
                let slice = &seq[start..end];
                let (g_count, c_count) = slice.iter().fold((0i64, 0i64), |(g, c), &b| {
                    match b {
                        b'G' => (g + 1, c),
                        b'C' => (g, c + 1),
                        _ => (g, c),
                    }
                });
                let gc_skew = if g_count + c_count > 0 {
                    round3((g_count - c_count) as f64 / (g_count + c_count) as f64)
                } else {
                    0.0
                };
                motif.set_attr("Model", ann.model);
                motif.set_attr("RIZ_Length", riz_len);
                motif.set_attr("RIZ_Perc_G", ann.riz_perc_g);
                motif.set_attr("REZ_Length", rez_len);
                motif.set_attr("REZ_Perc_G", rez_perc);
                motif.set_attr("Linker_Length", linker_len);
                motif.set_attr("GC_Content", round3(gc_content(slice)));
                motif.set_attr("GC_Skew", gc_skew);
                motif.set_attr("Arm_Length", crate::motif::AttrValue::Na);
                motif.set_attr("Loop_Length", linker_len);
                motif.set_attr("Type_Of_Repeat", "RNA-DNA hybrid (R-loop)");
                motif.set_attr(
                    "Criterion",
                    format!(
                        "QmRLFS {}; RIZ %G={:.1}% >={MIN_PERC_G_RIZ}%; REZ %G={:.1}% >={MIN_PERC_G_REZ}%",
                        ann.model, ann.riz_perc_g, rez_perc
                    ),
                );
                motif.set_attr(
                    "Disease_Relevance",
                    Self::disease_relevance(gc_content(slice), total_len, ann.riz_perc_g),
                );
                motif.set_attr(
                    "Regions_Involved",
                    format!(
                        "RIZ (RNA invasion zone, {riz_len}bp, G-rich) - Linker ({linker_len}bp) - REZ ({rez_len}bp)"
                    ),
                );
                motifs.push(motif);
            }
        }
        motifs.sort_by_key(|m| m.start);
        motifs
    }
}

impl RLoopDetector {
    fn disease_relevance(gc: f64, length: usize, riz_perc_g: f64) -> String {
        let mut notes: Vec<&str> = Vec::new();
        if gc > 70.0 {
            notes.push("High GC-content - genomic instability, DNA damage hotspot");
        }
        if length > 500 {
            notes.push("Long R-loop (>500bp) - replication-transcription conflicts");
        }
        if riz_perc_g > 65.0 {
            notes.push("Strong RIZ signal - transcription-associated R-loop");
        }
        notes.push(
            "Associated with: neurodegeneration (ALS, Fragile X), cancer, repeat expansion diseases",
        );
        notes.join("; ")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn detector() -> RLoopDetector {
        RLoopDetector::new()
    }

    #[test]
    fn g_cluster_riz_detected() {
        let seq = b"GGGAGGGTGGGAGGGATT";
        let motifs = detector().detect(seq, "riz");
        assert!(!motifs.is_empty());
        let m = motifs.iter().find(|m| m.strand.is_plus_strand()).unwrap();
        assert_eq!(m.subclass, "R-loop formation sites");
        assert!(m.attr("RIZ_Perc_G").unwrap().as_f64().unwrap() >= 50.0);
        assert!(m.raw_score >= 0.5);
    }

    #[test]
    fn c_rich_strand_maps_to_minus() {
        // The reverse complement carries the G clusters.
        let seq = revcomp(b"GGGAGGGTGGGAGGGATT");
        let motifs = detector().detect(&seq, "minus");
        assert!(motifs.iter().any(|m| m.strand.is_minus_strand()));
        for m in &motifs {
            assert!(m.start >= 1 && m.end <= seq.len());
            let expected = String::from_utf8_lossy(&seq[m.start - 1..m.end]);
            assert_eq!(m.sequence, expected);
        }
    }

    #[test]
    fn rez_extends_the_call() {
        // RIZ, 50 bp linker of A/T, then a long G-rich extension zone.
        let mut seq = b"GGGGAGGGGAGGGGAGGGG".to_vec();
        seq.extend(std::iter::repeat(b'A').take(50));
        for _ in 0..40 {
            seq.extend_from_slice(b"GGAGT");
        }
        let motifs = detector().detect(&seq, "rez");
        let with_rez = motifs
            .iter()
            .find(|m| m.attr("REZ_Length").unwrap().as_i64().unwrap() > 0);
        assert!(with_rez.is_some(), "expected a motif with a REZ");
        let m = with_rez.unwrap();
        assert!(m.attr("REZ_Perc_G").unwrap().as_f64().unwrap() >= 40.0);
        assert!(m.length > 100);
    }

    #[test]
    fn at_rich_sequence_is_quiet() {
        let seq: Vec<u8> = b"ATTA".iter().cycle().take(200).cloned().collect();
        assert!(detector().detect(&seq, "at").is_empty());
    }
}
