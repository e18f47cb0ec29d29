//! Z-DNA detector: 10-mer propensity scoring plus eGZ (extruded-G)
//! trinucleotide repeats.

use regex::bytes::Regex;

use crate::detector::{round3, MotifDetector, Normalization, PatternGroup, PatternInfo};
use crate::motif::{Motif, Strand};
use crate::seq_utils::gc_content;
use crate::tables::{ZDNA_TENMERS, ZDNA_TENMER_MAX};
use crate::taxonomy::MotifClass;
use crate::tenmer::TenmerScanner;

/// Minimum cumulative region score for a Z-DNA call.
const MIN_Z_SCORE: f64 = 50.0;
const MIN_EGZ_REPEATS: usize = 3;
const EGZ_BASE_SCORE: f64 = 0.85;
const EGZ_MIN_SCORE: f64 = 0.80;

pub struct ZDnaDetector {
    scanner: TenmerScanner,
    egz: Vec<(Regex, &'static str, &'static str)>,
    alternating_cg: Regex,
    alternating_at: Regex,
}

impl Default for ZDnaDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ZDnaDetector {
    pub fn new() -> Self {
        let egz = [
            (r"(?:CGG){4,}", "ZDN_EGZ_CGG", "CGG"),
            (r"(?:GGC){4,}", "ZDN_EGZ_GGC", "GGC"),
            (r"(?:CCG){4,}", "ZDN_EGZ_CCG", "CCG"),
            (r"(?:GCC){4,}", "ZDN_EGZ_GCC", "GCC"),
        ]
        .iter()
        .map(|(p, id, unit)| {
            (Regex::new(p).expect("hard-coded eGZ pattern"), *id, *unit)
        })
        .collect();
        ZDnaDetector {
            scanner: TenmerScanner::new(&ZDNA_TENMERS),
            egz,
            alternating_cg: Regex::new(r"(?:CG){2,}|(?:GC){2,}")
                .expect("hard-coded pattern"),
            alternating_at: Regex::new(r"(?:AT){2,}|(?:TA){2,}")
                .expect("hard-coded pattern"),
        }
    }

    fn count_dinucs(seq: &[u8], pairs: [&[u8; 2]; 2]) -> usize {
        seq.windows(2)
            .filter(|&w| w == pairs[0].as_slice() || w == pairs[1].as_slice())
            .count()
    }

    fn tenmer_motifs(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
        let mut motifs = Vec::new();
        for (i, region) in self.scanner.scan_regions(seq).iter().enumerate() {
            let sum = region.sum_score();
            if sum <= MIN_Z_SCORE || region.hits.is_empty() {
                continue;
            }
            let slice = &seq[region.start..region.end];
            let raw = sum;
            let score = self.normalize(raw, region.len(), "Z-DNA");
            let pattern_id = format!("ZDNA_{}", i + 1);
            let mut motif = Motif::from_span(
                seq,
                sequence_name,
                MotifClass::ZDna,
                "Z-DNA",
                (region.start, region.end),
                round3(raw),
                score,
                Strand::plus(),
                "Z-DNA_detection",
                &pattern_id,
            );
            let cg = Self::count_dinucs(slice, [b"CG", b"GC"]);
            let at = Self::count_dinucs(slice, [b"AT", b"TA"]);
            let alt_cg = self.alternating_cg.find_iter(slice).count();
            let alt_at = self.alternating_at.find_iter(slice).count();
            motif.set_attr("Contributing_10mers", region.hits.len());
            motif.set_attr("Mean_10mer_Score", round3(region.mean_per_tenmer()));
            motif.set_attr("CG_Dinucleotides", cg);
            motif.set_attr("AT_Dinucleotides", at);
            motif.set_attr("Alternating_CG_Regions", alt_cg);
            motif.set_attr("Alternating_AT_Regions", alt_at);
            motif.set_attr("GC_Content", round3(gc_content(slice)));
            motif.set_attr("Arm_Length", crate::motif::AttrValue::Na);
            motif.set_attr("Loop_Length", crate::motif::AttrValue::Na);
            motif.set_attr(
                "Type_Of_Repeat",
                if alt_cg >= 2 {
                    "CG/GC alternating purine-pyrimidine (canonical Z-DNA)"
                } else if alt_at >= 2 {
                    "AT/TA alternating purine-pyrimidine (Z-DNA)"
                } else {
                    "Mixed dinucleotide composition (Z-DNA)"
                },
            );
            motif.set_attr(
                "Criterion",
                format!(
                    "10-mer table scoring; sum score {:.1} >{}; {} contributing 10-mers",
                    sum,
                    MIN_Z_SCORE,
                    region.hits.len()
                ),
            );
            motif.set_attr(
                "Disease_Relevance",
                Self::zdna_disease_relevance(slice, gc_content(slice)),
            );
            motifs.push(motif);
        }
        motifs
    }

    fn zdna_disease_relevance(seq: &[u8], gc: f64) -> String {
        let mut notes: Vec<&str> = Vec::new();
        let text = String::from_utf8_lossy(seq);
        if text.contains("CGCGCGCGCG") || text.contains("GCGCGCGCGC") {
            notes.push("Long CG/GC alternating - potential methylation site, epigenetic regulation");
        }
        if gc > 75.0 {
            notes.push("High GC Z-DNA - promoter element, gene regulation");
        }
        if seq.len() > 50 {
            notes.push("Extended Z-DNA - chromatin structure, recombination hotspot");
        }
        notes.push(
            "Z-DNA formation - immune response (ZBP1 binding), transcription, genome instability",
        );
        notes.join("; ")
    }

    fn egz_motifs(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
        let mut motifs = Vec::new();
        for (re, pattern_id, unit) in &self.egz {
            for m in re.find_iter(seq) {
                let copies = (m.end() - m.start()) / 3;
                let raw = EGZ_BASE_SCORE * (copies as f64 / MIN_EGZ_REPEATS as f64);
                if raw < EGZ_MIN_SCORE {
                    continue;
                }
                let score = self.normalize(raw, m.end() - m.start(), "eGZ");
                let mut motif = Motif::from_span(
                    seq,
                    sequence_name,
                    MotifClass::ZDna,
                    "eGZ",
                    (m.start(), m.end()),
                    round3(raw),
                    score,
                    Strand::plus(),
                    "Z-DNA_detection",
                    pattern_id,
                );
                motif.set_attr("Repeat_Unit", *unit);
                motif.set_attr("Repeat_Count", copies);
                motif.set_attr("GC_Content", round3(gc_content(m.as_bytes())));
                motif.set_attr("Arm_Length", crate::motif::AttrValue::Na);
                motif.set_attr("Loop_Length", crate::motif::AttrValue::Na);
                motif.set_attr(
                    "Type_Of_Repeat",
                    format!("Trinucleotide eGZ-motif ({unit})"),
                );
                motif.set_attr(
                    "Criterion",
                    format!(
                        "eGZ-motif: {unit} trinucleotide repeat >={MIN_EGZ_REPEATS} copies (detected n={copies})"
                    ),
                );
                motif.set_attr(
                    "Disease_Relevance",
                    Self::egz_disease_relevance(unit, copies),
                );
                motif.set_attr(
                    "Regions_Involved",
                    format!("eGZ-motif: {unit} trinucleotide x {copies} repeats"),
                );
                motifs.push(motif);
            }
        }
        motifs
    }

    fn egz_disease_relevance(unit: &str, copies: usize) -> String {
        let mut notes = Vec::new();
        if unit == "CGG" || unit == "CCG" {
            if copies >= 200 {
                notes.push(format!(
                    "Fragile X syndrome: pathogenic CGG/CCG expansion (n>=200, detected n={copies})"
                ));
            } else if copies >= 55 {
                notes.push(format!(
                    "Fragile X premutation (55<=n<200, detected n={copies})"
                ));
            } else {
                notes.push(format!("CGG/CCG repeat (n={copies}, monitor for expansion)"));
            }
        }
        notes.push(
            "Z-DNA formation - transcription regulation, genomic instability".to_string(),
        );
        notes.join("; ")
    }
}

impl MotifDetector for ZDnaDetector {
    fn class(&self) -> MotifClass {
        MotifClass::ZDna
    }

    fn patterns(&self) -> Vec<PatternGroup> {
        vec![
            PatternGroup {
                name: "z_dna_10mers",
                patterns: vec![PatternInfo {
                    pattern: "",
                    id: "ZDN_10MER",
                    name: "Z-DNA 10-mer table",
                    subclass: "Z-DNA",
                    min_len: 10,
                    score_tag: "z_dna_10mer_score",
                    min_score: MIN_Z_SCORE,
                    reference: "Ho 1986",
                }],
            },
            PatternGroup {
                name: "egz_motifs",
                patterns: vec![
                    PatternInfo {
                        pattern: r"(?:CGG){4,}",
                        id: "ZDN_EGZ_CGG",
                        name: "CGG repeat (eGZ)",
                        subclass: "eGZ",
                        min_len: 12,
                        score_tag: "egz_score",
                        min_score: EGZ_MIN_SCORE,
                        reference: "Herbert 1997",
                    },
                    PatternInfo {
                        pattern: r"(?:GGC){4,}",
                        id: "ZDN_EGZ_GGC",
                        name: "GGC repeat (eGZ)",
                        subclass: "eGZ",
                        min_len: 12,
                        score_tag: "egz_score",
                        min_score: EGZ_MIN_SCORE,
                        reference: "Herbert 1997",
                    },
                    PatternInfo {
                        pattern: r"(?:CCG){4,}",
                        id: "ZDN_EGZ_CCG",
                        name: "CCG repeat (eGZ)",
                        subclass: "eGZ",
                        min_len: 12,
                        score_tag: "egz_score",
                        min_score: EGZ_MIN_SCORE,
                        reference: "Herbert 1997",
                    },
                    PatternInfo {
                        pattern: r"(?:GCC){4,}",
                        id: "ZDN_EGZ_GCC",
                        name: "GCC repeat (eGZ)",
                        subclass: "eGZ",
                        min_len: 12,
                        score_tag: "egz_score",
                        min_score: EGZ_MIN_SCORE,
                        reference: "Herbert 1997",
                    },
                ],
            },
        ]
    }

    fn raw_score_bounds(&self, subclass: &str, length: usize) -> (f64, f64) {
        if subclass == "eGZ" {
            (EGZ_MIN_SCORE, 3.0)
        } else {
            // Cumulative sums grow with region length; the ceiling is the
            // per-base maximum times the region length.
            let per_base_max = *ZDNA_TENMER_MAX / 10.0;
            (MIN_Z_SCORE, (per_base_max * length.max(20) as f64).max(MIN_Z_SCORE + 1.0))
        }
    }

    fn normalization(&self, subclass: &str) -> Normalization {
        if subclass == "eGZ" {
            Normalization::Linear
        } else {
            Normalization::Log10
        }
    }

    fn detect(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
        let mut motifs = self.tenmer_motifs(seq, sequence_name);
        motifs.extend(self.egz_motifs(seq, sequence_name));
        motifs.sort_by_key(|m| m.start);
        motifs
    }
}
