//! Slipped DNA detector: short tandem repeats and direct repeats prone to
//! replication slippage.
//!
//! Tandem tracts are found with a period-match array per unit size (the
//! run length of seq[i..] against seq[i+k..]), which gives the same
//! leftmost-greedy tracts as a backreference scan in O(n) per unit size.
//! Hard gates (tract length, primitive-unit purity, copy minima) and a
//! mechanistic slippage-energy score follow.

use crate::detector::{round3, MotifDetector, Normalization, PatternGroup, PatternInfo};
use crate::motif::{Motif, Strand};
use crate::seq_utils::{gc_content, IntervalSet};
use crate::taxonomy::MotifClass;

const MIN_TRACT_LENGTH: usize = 20;
const MIN_PURITY: f64 = 0.90;
const MAX_UNIT_SIZE: usize = 100;
const MIN_COPIES_STR_CORE: f64 = 6.0;
const MIN_COPIES_STR_RELAXED: f64 = 4.0;
const MIN_COPIES_DR: f64 = 2.0;
/// Unit sizes <= 9 bp are STRs, >= 10 bp direct repeats.
const STR_DIRECT_THRESHOLD: usize = 10;

const DISEASE_UNITS: [&str; 6] = ["CAG", "CTG", "CGG", "CCG", "GAA", "TTC"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    Core,
    Lenient,
}

#[derive(Debug, Clone)]
struct Tract {
    start: usize,
    end: usize,
    primitive_unit: Vec<u8>,
    primitive_copies: f64,
    purity: f64,
    score: f64,
}

pub struct SlippedDnaDetector {
    mode: ScoringMode,
}

impl Default for SlippedDnaDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SlippedDnaDetector {
    pub fn new() -> Self {
        SlippedDnaDetector {
            mode: ScoringMode::Core,
        }
    }

    pub fn with_mode(mode: ScoringMode) -> Self {
        SlippedDnaDetector { mode }
    }

    /// Shortest unit that regenerates `unit` when tiled (partial final
    /// copy allowed).
    fn primitive_unit(unit: &[u8]) -> &[u8] {
        let n = unit.len();
        for period in 1..=n / 2 {
            let candidate = &unit[..period];
            let mut ok = true;
            let mut i = 0;
            while i < n {
                let take = period.min(n - i);
                if &unit[i..i + take] != &candidate[..take] {
                    ok = false;
                    break;
                }
                i += period;
            }
            if ok {
                return candidate;
            }
        }
        unit
    }

    /// Fraction of bases matching a perfect cyclic tiling of `unit`.
    fn repeat_purity(seq: &[u8], unit: &[u8]) -> f64 {
        if unit.is_empty() || seq.is_empty() || unit.len() > seq.len() {
            return 0.0;
        }
        let matches = seq
            .iter()
            .enumerate()
            .filter(|(i, &b)| b == unit[i % unit.len()])
            .count();
        matches as f64 / seq.len() as f64
    }

    fn min_copies(&self, primitive_len: usize) -> f64 {
        match self.mode {
            ScoringMode::Core => {
                if primitive_len <= 4 {
                    MIN_COPIES_STR_CORE
                } else {
                    MIN_COPIES_DR
                }
            }
            ScoringMode::Lenient => {
                if primitive_len <= 9 {
                    MIN_COPIES_STR_RELAXED
                } else {
                    MIN_COPIES_DR
                }
            }
        }
    }

    /// Mechanistic slippage-energy score on the 1-3 scale: log-saturated
    /// length and copy terms, unit-size instability factor (2-4 bp units
    /// slip most readily), squared purity, GC term, and a bonus for the
    /// pathogenic trinucleotide units.
    fn slippage_score(seq: &[u8], unit: &[u8], copies: f64, purity: f64) -> f64 {
        let len_term = ((seq.len().max(1) as f64).ln() / 25f64.ln() / 2.0).min(1.0);
        let copy_term = ((copies.max(1.0)).ln() / 4f64.ln() / 2.0).min(1.0);
        let k = unit.len();
        let unit_term = if (2..=4).contains(&k) {
            1.0
        } else if k == 1 || (5..=6).contains(&k) {
            0.75
        } else if k <= 20 {
            0.5
        } else {
            0.3
        };
        let purity_term = purity * purity;
        let gc_term = 0.6 + 0.4 * gc_content(seq) / 100.0;
        let raw = 0.30 * len_term
            + 0.30 * copy_term
            + 0.15 * unit_term
            + 0.15 * purity_term
            + 0.10 * gc_term;
        let base = 1.0 + 2.0 * raw.min(1.0);
        let unit_str = String::from_utf8_lossy(unit);
        let bonus = if DISEASE_UNITS.contains(&unit_str.as_ref()) {
            1.15
        } else {
            1.0
        };
        round3((base * bonus).clamp(1.0, 3.0))
    }

    /// All maximal tandem tracts for every unit size, leftmost and
    /// non-overlapping per unit size.
    fn find_tandem_repeats(seq: &[u8]) -> Vec<(usize, usize, usize)> {
        let n = seq.len();
        let mut candidates = Vec::new();
        let max_k = MAX_UNIT_SIZE.min(n / 2);
        let mut matches = vec![0usize; n + 1];
        for k in 1..=max_k {
            // matches[i] = length of the common prefix of seq[i..] and
            // seq[i+k..].
            for i in (0..n.saturating_sub(k)).rev() {
                matches[i] = if seq[i] == seq[i + k] {
                    matches[i + 1] + 1
                } else {
                    0
                };
            }
            for i in n.saturating_sub(k)..=n {
                matches[i] = 0;
            }
            let min_copies = 2.max((MIN_TRACT_LENGTH + k - 1) / k);
            let needed = (min_copies - 1) * k;
            let mut i = 0;
            while i + k <= n {
                if matches[i] >= needed {
                    let copies = matches[i] / k + 1;
                    let end = i + copies * k;
                    if seq[i..i + k].iter().all(|&b| matches!(b, b'A' | b'C' | b'G' | b'T')) {
                        candidates.push((i, end, k));
                    }
                    i = end;
                } else {
                    i += 1;
                }
            }
        }
        candidates
    }

    fn annotate(&self, seq: &[u8]) -> Vec<Tract> {
        let mut filtered: Vec<Tract> = Vec::new();
        for (start, end, _k) in Self::find_tandem_repeats(seq) {
            let tract = &seq[start..end];
            if tract.len() < MIN_TRACT_LENGTH {
                continue;
            }
            let unit = Self::primitive_unit(&seq[start..start + _k]);
            let purity = Self::repeat_purity(tract, unit);
            if purity < MIN_PURITY {
                continue;
            }
            let copies = tract.len() as f64 / unit.len() as f64;
            if copies < self.min_copies(unit.len()) {
                continue;
            }
            filtered.push(Tract {
                start,
                end,
                primitive_unit: unit.to_vec(),
                primitive_copies: copies,
                purity,
                score: 0.0,
            });
        }

        // One call per locus: earliest start wins, longer primitive units
        // break ties so a true direct repeat is not shadowed by its own
        // internal STR.
        filtered.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(b.primitive_unit.len().cmp(&a.primitive_unit.len()))
        });
        let mut intervals = IntervalSet::new();
        let mut accepted = Vec::new();
        for mut tract in filtered {
            if intervals.try_insert(tract.start, tract.end) {
                tract.score = Self::slippage_score(
                    &seq[tract.start..tract.end],
                    &tract.primitive_unit,
                    tract.primitive_copies,
                    tract.purity,
                );
                accepted.push(tract);
            }
        }
        accepted.sort_by_key(|t| t.start);
        accepted
    }
}

impl MotifDetector for SlippedDnaDetector {
    fn class(&self) -> MotifClass {
        MotifClass::SlippedDna
    }

    fn patterns(&self) -> Vec<PatternGroup> {
        vec![
            PatternGroup {
                name: "short_tandem_repeats",
                patterns: vec![PatternInfo {
                    pattern: "",
                    id: "SLIPPED_STR",
                    name: "Short tandem repeat",
                    subclass: "STR",
                    min_len: MIN_TRACT_LENGTH,
                    score_tag: "slippage_energy",
                    min_score: 1.0,
                    reference: "Schlotterer 2000; Weber 1989",
                }],
            },
            PatternGroup {
                name: "direct_repeats",
                patterns: vec![PatternInfo {
                    pattern: "",
                    id: "SLIPPED_DR",
                    name: "Direct repeat",
                    subclass: "Direct Repeat",
                    min_len: MIN_TRACT_LENGTH,
                    score_tag: "slippage_energy",
                    min_score: 1.0,
                    reference: "Sinden 1994; Pearson 2005",
                }],
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
        self.annotate(seq)
            .into_iter()
            .enumerate()
            .map(|(i, tract)| {
                let unit_size = tract.primitive_unit.len();
                let subclass = if unit_size < STR_DIRECT_THRESHOLD {
                    "STR"
                } else {
                    "Direct Repeat"
                };
                let score = self.normalize(tract.score, tract.end - tract.start, subclass);
                let pattern_id = format!("SLIPPED_{}", i + 1);
                let mut motif = Motif::from_span(
                    seq,
                    sequence_name,
                    MotifClass::SlippedDna,
                    subclass,
                    (tract.start, tract.end),
                    tract.score,
                    score,
                    Strand::plus(),
                    "Slipped_DNA_detection",
                    &pattern_id,
                );
                let unit = String::from_utf8_lossy(&tract.primitive_unit).into_owned();
                let copies = round3(tract.primitive_copies);
                motif.set_attr("Repeat_Unit", unit.clone());
                motif.set_attr("Unit_Size", unit_size);
                motif.set_attr("Copy_Number", copies);
                motif.set_attr("Purity", round3(tract.purity));
                motif.set_attr(
                    "GC_Content",
                    round3(gc_content(&seq[tract.start..tract.end])),
                );
                motif.set_attr("Slippage_Score", tract.score);
                motif.set_attr("Arm_Length", crate::motif::AttrValue::Na);
                motif.set_attr("Loop_Length", crate::motif::AttrValue::Na);
                motif.set_attr("Type_Of_Repeat", Self::repeat_type(&unit, unit_size));
                motif.set_attr(
                    "Criterion",
                    format!(
                        "{subclass}: unit size {unit_size}bp; tract >={MIN_TRACT_LENGTH}bp; purity {:.1}% >={:.0}%; copies {copies:.1}",
                        tract.purity * 100.0,
                        MIN_PURITY * 100.0
                    ),
                );
                motif.set_attr(
                    "Disease_Relevance",
                    Self::disease_relevance(&unit, tract.primitive_copies, unit_size),
                );
                motif.set_attr(
                    "Regions_Involved",
                    format!(
                        "Tandem repeat of {unit} unit ({unit_size}bp) x {copies:.1} copies, total {}bp tract",
                        tract.end - tract.start
                    ),
                );
                motif.set_attr("References", "Sinden 1994; Pearson 2005; Mirkin 2007");
                motif
            })
            .collect()
    }
}

impl SlippedDnaDetector {
    fn repeat_type(unit: &str, unit_size: usize) -> String {
        match unit_size {
            1 => format!("Mononucleotide ({unit})"),
            2 => format!("Dinucleotide ({unit})"),
            3 => format!("Trinucleotide ({unit})"),
            4 => format!("Tetranucleotide ({unit})"),
            5 => format!("Pentanucleotide ({unit})"),
            6 => format!("Hexanucleotide ({unit})"),
            n if n < 20 => format!("Short tandem repeat ({unit}, {n}bp)"),
            n => format!("Long direct repeat ({n}bp unit)"),
        }
    }

    fn disease_relevance(unit: &str, copies: f64, unit_size: usize) -> String {
        let n = copies;
        match unit {
            "CAG" if n > 36.0 => {
                "Huntington disease (n>36), Spinocerebellar ataxias".to_string()
            }
            "CTG" if n > 50.0 => "Myotonic dystrophy type 1 (n>50)".to_string(),
            "CGG" if n > 200.0 => "Fragile X syndrome (n>200)".to_string(),
            "CCG" if n > 200.0 => "Fragile X syndrome RC strand".to_string(),
            "GAA" if n > 66.0 => "Friedreich ataxia (n>66)".to_string(),
            "TTC" if n > 66.0 => "Friedreich ataxia RC strand".to_string(),
            "GGGGCC" if n > 30.0 => {
                "C9orf72 ALS/FTD (n>30, most common ALS/FTD mutation)".to_string()
            }
            "CCTG" if n > 75.0 => "Myotonic dystrophy type 2 (n>75)".to_string(),
            _ if unit_size <= 6 && n > 20.0 => {
                format!("Expanded repeat (n={n:.1}, potential instability)")
            }
            _ if unit_size <= 6 && n > 10.0 => {
                format!("Intermediate repeat (n={n:.1}, monitor for expansion)")
            }
            _ if unit_size >= 20 && n >= 3.0 => {
                "Long direct repeat (genomic instability, deletion/duplication risk)".to_string()
            }
            _ => "None annotated".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn detector() -> SlippedDnaDetector {
        SlippedDnaDetector::new()
    }

    #[test]
    fn cag_repeat_is_an_str_with_disease_bonus() {
        let seq: Vec<u8> = b"CAG".iter().cycle().take(30).cloned().collect();
        let motifs = detector().detect(&seq, "cag");
        assert_eq!(motifs.len(), 1);
        let m = &motifs[0];
        assert_eq!(m.subclass, "STR");
        assert_eq!(m.attr("Repeat_Unit").unwrap().as_text(), Some("CAG"));
        assert_eq!(m.attr("Copy_Number").unwrap().as_f64(), Some(10.0));

        // The same tract with a non-disease unit scores lower.
        let control: Vec<u8> = b"ACT".iter().cycle().take(30).cloned().collect();
        let control_motifs = detector().detect(&control, "act");
        assert_eq!(control_motifs.len(), 1);
        assert!(m.raw_score > control_motifs[0].raw_score);
    }

    #[test]
    fn short_tracts_are_gated_out() {
        // 18 bp < 20 bp tract floor.
        let seq: Vec<u8> = b"CAG".iter().cycle().take(18).cloned().collect();
        assert!(detector().detect(&seq, "short").is_empty());
    }

    #[test]
    fn long_unit_is_a_direct_repeat() {
        let unit = b"ACGTTGCAAGTC";
        let mut seq = Vec::new();
        for _ in 0..3 {
            seq.extend_from_slice(unit);
        }
        let motifs = detector().detect(&seq, "dr");
        assert_eq!(motifs.len(), 1);
        assert_eq!(motifs[0].subclass, "Direct Repeat");
        assert_eq!(motifs[0].attr("Unit_Size").unwrap().as_i64(), Some(12));
    }

    #[test]
    fn primitive_unit_collapses_composite_periods() {
        assert_eq!(SlippedDnaDetector::primitive_unit(b"CAGCAG"), b"CAG");
        assert_eq!(SlippedDnaDetector::primitive_unit(b"CACACA"), b"CA");
        assert_eq!(SlippedDnaDetector::primitive_unit(b"ACGT"), b"ACGT");
    }

    #[test]
    fn purity_measures_cyclic_agreement() {
        use float_eq::assert_float_eq;
        assert_float_eq!(
            SlippedDnaDetector::repeat_purity(b"CAGCAGCAG", b"CAG"),
            1.0,
            abs <= 1e-12
        );
        assert_float_eq!(
            SlippedDnaDetector::repeat_purity(b"CAGCATCAG", b"CAG"),
            8.0 / 9.0,
            abs <= 1e-12
        );
    }

    #[test]
    fn mononucleotide_needs_core_copy_floor() {
        let seq: Vec<u8> = std::iter::repeat(b'A').take(24).collect();
        let motifs = detector().detect(&seq, "a24");
        assert_eq!(motifs.len(), 1);
        assert_eq!(motifs[0].attr("Unit_Size").unwrap().as_i64(), Some(1));
        assert_eq!(motifs[0].attr("Copy_Number").unwrap().as_f64(), Some(24.0));
    }

    #[test]
    fn lenient_mode_lowers_the_copy_floor() {
        // A 4 bp unit at five copies: below the six-copy floor of the
        // core mode, accepted by the relaxed one.
        let seq: Vec<u8> = b"GATC".iter().cycle().take(20).cloned().collect();
        assert!(detector().detect(&seq, "core").is_empty());
        let lenient = SlippedDnaDetector::with_mode(ScoringMode::Lenient);
        let motifs = lenient.detect(&seq, "lenient");
        assert_eq!(motifs.len(), 1);
        assert_eq!(motifs[0].attr("Copy_Number").unwrap().as_f64(), Some(5.0));
    }

    #[test]
    fn ambiguous_bases_never_seed_a_unit() {
        let seq = b"CANCANCANCANCANCANCANCAN";
        assert!(detector().detect(seq, "n").is_empty());
    }

    #[test]
    fn accepted_tracts_do_not_overlap() {
        let mut seq: Vec<u8> = b"CAG".iter().cycle().take(30).cloned().collect();
        seq.extend_from_slice(b"TTTTTTT");
        seq.extend(b"GATA".iter().cycle().take(32).cloned());
        let motifs = detector().detect(&seq, "multi");
        assert!(motifs.len() >= 2);
        for (i, a) in motifs.iter().enumerate() {
            for b in motifs.iter().skip(i + 1) {
                assert_eq!(a.overlap_len(b), 0);
            }
        }
    }
}
