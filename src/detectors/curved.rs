//! Curved DNA detector: local poly-A/poly-T tracts and global A-phased
//! repeats (APRs) — runs of A-tract centers spaced at the helical repeat.

use regex::bytes::Regex;

use crate::detector::{round3, MotifDetector, Normalization, PatternGroup, PatternInfo};
use crate::motif::{Motif, Strand};
use crate::seq_utils::{at_content, gc_content, revcomp};
use crate::taxonomy::MotifClass;

const MIN_AT_TRACT: usize = 3;
const PHASING_CENTER_SPACING: f64 = 10.5;
const PHASING_TOL_LOW: f64 = 9.9;
const PHASING_TOL_HIGH: f64 = 11.1;
const MIN_APR_TRACTS: usize = 3;
const LOCAL_LONG_TRACT: usize = 7;
const SCORE_THRESHOLD: f64 = 0.1;

const RAW_MIN: f64 = 0.1;
const RAW_MAX: f64 = 0.95;

#[derive(Debug, Clone)]
struct Apr {
    centers: Vec<f64>,
    mean_deviation: f64,
    score: f64,
}

pub struct CurvedDnaDetector {
    at_window: Regex,
}

impl Default for CurvedDnaDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CurvedDnaDetector {
    pub fn new() -> Self {
        CurvedDnaDetector {
            at_window: Regex::new(r"[AT]{3,}").expect("hard-coded AT-window pattern"),
        }
    }

    /// Longest A-led run analysis inside a pure-AT window.
    ///
    /// Walks the window once tracking the current A run, the A-run with a
    /// trailing T allowance (an A-tract tolerates Ts shorter than the A
    /// run it follows), and the longest pure-T run, returning
    /// (max_at_len, end index of that run, max_t_len).
    fn analyze_at_window(window: &[u8]) -> (usize, usize, usize) {
        let mut a_len = 0usize;
        let mut t_len = 0usize;
        let mut at_len = 0usize;
        let mut ta_len = 0usize;
        let mut max_at_len = 0usize;
        let mut max_at_end = 0usize;
        let mut max_t_len = 0usize;

        for (i, &b) in window.iter().enumerate() {
            let prev = if i > 0 { Some(window[i - 1]) } else { None };
            match b {
                b'A' => {
                    t_len = 0;
                    ta_len = 0;
                    if prev == Some(b'T') {
                        a_len = 1;
                        at_len = 1;
                    } else {
                        a_len += 1;
                        at_len += 1;
                    }
                }
                b'T' => {
                    if ta_len < a_len {
                        ta_len += 1;
                        at_len += 1;
                    } else {
                        t_len += 1;
                        ta_len = 0;
                        at_len = 0;
                        a_len = 0;
                    }
                }
                _ => {
                    a_len = 0;
                    t_len = 0;
                    at_len = 0;
                    ta_len = 0;
                }
            }
            if at_len > max_at_len {
                max_at_len = at_len;
                max_at_end = i;
            }
            if t_len > max_t_len {
                max_t_len = t_len;
            }
        }
        (max_at_len, max_at_end, max_t_len)
    }

    /// A-tract centers from AT-window analysis on both orientations.
    fn tract_centers(&self, seq: &[u8]) -> Vec<f64> {
        let mut centers = Vec::new();
        for m in self.at_window.find_iter(seq) {
            let window = m.as_bytes();
            let window_len = window.len();
            let (max_at, max_at_end, max_t) = Self::analyze_at_window(window);
            let rc = revcomp(window);
            let (max_at_rc, max_at_end_rc, max_t_rc) = Self::analyze_at_window(&rc);

            let diff_fwd = max_at as i64 - max_t as i64;
            let diff_rc = max_at_rc as i64 - max_t_rc as i64;
            if diff_fwd < MIN_AT_TRACT as i64 && diff_rc < MIN_AT_TRACT as i64 {
                continue;
            }
            let center = if diff_fwd >= diff_rc {
                (m.start() + max_at_end) as f64 - (max_at as f64 - 1.0) / 2.0
            } else {
                let rc_end_original = m.start() + (window_len - 1 - max_at_end_rc);
                rc_end_original as f64 - (max_at_rc as f64 - 1.0) / 2.0
            };
            centers.push(center);
        }
        centers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        centers
    }

    /// Group sorted centers into phased runs with spacing inside the
    /// helical tolerance band.
    fn find_aprs(&self, seq: &[u8]) -> Vec<Apr> {
        let centers = self.tract_centers(seq);
        let mut aprs = Vec::new();
        if centers.len() < MIN_APR_TRACTS {
            return aprs;
        }
        let max_dev = (PHASING_TOL_HIGH - PHASING_CENTER_SPACING)
            .abs()
            .max((PHASING_CENTER_SPACING - PHASING_TOL_LOW).abs());
        let mut i = 0;
        while i < centers.len() {
            let mut j = i + 1;
            while j < centers.len() {
                let spacing = centers[j] - centers[j - 1];
                if (PHASING_TOL_LOW..=PHASING_TOL_HIGH).contains(&spacing) {
                    j += 1;
                } else {
                    break;
                }
            }
            let run = &centers[i..j];
            if run.len() >= MIN_APR_TRACTS {
                let deviations: Vec<f64> = run
                    .windows(2)
                    .map(|w| (w[1] - w[0] - PHASING_CENTER_SPACING).abs())
                    .collect();
                let mean_dev =
                    deviations.iter().sum::<f64>() / deviations.len() as f64;
                let score = (1.0 - mean_dev / max_dev).max(0.0);
                aprs.push(Apr {
                    centers: run.to_vec(),
                    mean_deviation: mean_dev,
                    score: round3(score),
                });
            }
            i = j.max(i + 1);
        }
        aprs
    }

    /// Local curvature: homopolymer A or T runs of LOCAL_LONG_TRACT+.
    fn find_long_tracts(seq: &[u8]) -> Vec<(usize, usize, u8)> {
        let mut tracts = Vec::new();
        let mut i = 0;
        while i < seq.len() {
            let b = seq[i];
            if b == b'A' || b == b'T' {
                let start = i;
                while i < seq.len() && seq[i] == b {
                    i += 1;
                }
                if i - start >= LOCAL_LONG_TRACT {
                    tracts.push((start, i, b));
                }
            } else {
                i += 1;
            }
        }
        tracts
    }
}

impl MotifDetector for CurvedDnaDetector {
    fn class(&self) -> MotifClass {
        MotifClass::CurvedDna
    }

    fn patterns(&self) -> Vec<PatternGroup> {
        vec![
            PatternGroup {
                name: "local_curved",
                patterns: vec![
                    PatternInfo {
                        pattern: r"A{7,}",
                        id: "CRV_002",
                        name: "Long A-tract",
                        subclass: "Local Curvature",
                        min_len: LOCAL_LONG_TRACT,
                        score_tag: "curvature_score",
                        min_score: SCORE_THRESHOLD,
                        reference: "Olson 1998",
                    },
                    PatternInfo {
                        pattern: r"T{7,}",
                        id: "CRV_003",
                        name: "Long T-tract",
                        subclass: "Local Curvature",
                        min_len: LOCAL_LONG_TRACT,
                        score_tag: "curvature_score",
                        min_score: SCORE_THRESHOLD,
                        reference: "Olson 1998",
                    },
                ],
            },
            PatternGroup {
                name: "global_curved",
                patterns: vec![PatternInfo {
                    pattern: r"[AT]{3,}",
                    id: "CRV_APR",
                    name: "A-phased repeat",
                    subclass: "Global Curvature",
                    min_len: 3 * MIN_AT_TRACT,
                    score_tag: "phasing_score",
                    min_score: SCORE_THRESHOLD,
                    reference: "Koo 1986",
                }],
            },
        ]
    }

    fn raw_score_bounds(&self, _subclass: &str, _length: usize) -> (f64, f64) {
        (RAW_MIN, RAW_MAX)
    }

    fn normalization(&self, _subclass: &str) -> Normalization {
        Normalization::Linear
    }

    fn detect(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
        let n = seq.len();
        let mut motifs = Vec::new();

        for (i, apr) in self
            .find_aprs(seq)
            .into_iter()
            .filter(|a| a.score > SCORE_THRESHOLD)
            .enumerate()
        {
            let first = apr.centers.first().copied().unwrap_or(0.0);
            let last = apr.centers.last().copied().unwrap_or(0.0);
            let start = (first as usize).saturating_sub(10);
            let end = ((last as usize) + 10).min(n);
            if end <= start {
                continue;
            }
            let slice = &seq[start..end];
            let score = self.normalize(apr.score, end - start, "Global Curvature");
            let pattern_id = format!("CRV_APR_{}", i + 1);
            let mut motif = Motif::from_span(
                seq,
                sequence_name,
                MotifClass::CurvedDna,
                "Global Curvature",
                (start, end),
                apr.score,
                score,
                Strand::plus(),
                "Curved_DNA_detection",
                &pattern_id,
            );
            motif.set_attr("Num_Tracts", apr.centers.len());
            motif.set_attr(
                "Center_Positions",
                apr.centers
                    .iter()
                    .map(|c| format!("{c:.1}"))
                    .collect::<Vec<_>>()
                    .join(","),
            );
            motif.set_attr("Mean_Spacing_Deviation", round3(apr.mean_deviation));
            motif.set_attr("GC_Content", round3(gc_content(slice)));
            motif.set_attr("AT_Content", round3(at_content(slice)));
            motif.set_attr("Arm_Length", crate::motif::AttrValue::Na);
            motif.set_attr("Loop_Length", crate::motif::AttrValue::Na);
            motif.set_attr("Type_Of_Repeat", "A/T-tract phased repeat (global APR)");
            motif.set_attr(
                "Criterion",
                format!(
                    "A-phased repeat: >={MIN_APR_TRACTS} A/T-tracts, phasing score {:.3} >{SCORE_THRESHOLD}; helical periodicity ~10.5bp",
                    apr.score
                ),
            );
            motif.set_attr(
                "Disease_Relevance",
                Self::disease_relevance(at_content(slice), end - start),
            );
            motif.set_attr(
                "Regions_Involved",
                format!(
                    "{} phased tracts, avg spacing {:.1}bp",
                    apr.centers.len(),
                    if apr.centers.len() > 1 {
                        (last - first) / (apr.centers.len() - 1) as f64
                    } else {
                        0.0
                    }
                ),
            );
            motifs.push(motif);
        }

        for (i, (start, end, base)) in Self::find_long_tracts(seq).into_iter().enumerate() {
            let len = end - start;
            let raw = len as f64 / (len as f64 + 6.0);
            if raw <= SCORE_THRESHOLD {
                continue;
            }
            let slice = &seq[start..end];
            let score = self.normalize(raw, len, "Local Curvature");
            let pattern_id = format!("CRV_TRACT_{}", i + 1);
            let mut motif = Motif::from_span(
                seq,
                sequence_name,
                MotifClass::CurvedDna,
                "Local Curvature",
                (start, end),
                round3(raw),
                score,
                Strand::plus(),
                "Curved_DNA_detection",
                &pattern_id,
            );
            let tract_type = if base == b'A' { "A-tract" } else { "T-tract" };
            motif.set_attr("Tract_Type", tract_type);
            motif.set_attr("Tract_Length", len);
            motif.set_attr("GC_Content", round3(gc_content(slice)));
            motif.set_attr("AT_Content", round3(at_content(slice)));
            motif.set_attr("Arm_Length", crate::motif::AttrValue::Na);
            motif.set_attr("Loop_Length", crate::motif::AttrValue::Na);
            motif.set_attr("Type_Of_Repeat", format!("{tract_type} homopolymer"));
            motif.set_attr(
                "Criterion",
                format!(
                    "Long A/T-tract: length {len}bp >={LOCAL_LONG_TRACT}bp, score {raw:.3} >{SCORE_THRESHOLD}"
                ),
            );
            motif.set_attr(
                "Disease_Relevance",
                Self::disease_relevance(at_content(slice), len),
            );
            motif.set_attr(
                "Regions_Involved",
                format!("Single {tract_type} ({len}bp)"),
            );
            motifs.push(motif);
        }

        motifs.sort_by_key(|m| m.start);
        motifs
    }
}

impl CurvedDnaDetector {
    fn disease_relevance(at: f64, length: usize) -> String {
        let mut notes: Vec<&str> = Vec::new();
        if at > 80.0 {
            notes.push("High AT-content curvature - nucleosome positioning, chromatin structure");
        }
        if length > 100 {
            notes.push("Extended curvature - DNA packaging, gene regulation");
        }
        notes.push(
            "Curved DNA - transcription factor binding, replication origin, chromatin organization",
        );
        notes.join("; ")
    }
}
