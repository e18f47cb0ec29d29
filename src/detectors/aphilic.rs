//! A-philic DNA detector: 10-mer log2-odds propensity scan, structurally
//! analogous to the Z-DNA 10-mer path but with the A-tract step table.

use itertools::Itertools;

use crate::detector::{round3, MotifDetector, Normalization, PatternGroup, PatternInfo};
use crate::motif::{Motif, Strand};
use crate::seq_utils::{at_content, gc_content};
use crate::tables::{APHILIC_TENMERS, APHILIC_TENMER_MAX};
use crate::taxonomy::MotifClass;
use crate::tenmer::TenmerScanner;

const MIN_SUM_LOG2: f64 = 0.5;
const SUBCLASS: &str = "A-philic DNA";

pub struct APhilicDetector {
    scanner: TenmerScanner,
}

impl Default for APhilicDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl APhilicDetector {
    pub fn new() -> Self {
        APhilicDetector {
            scanner: TenmerScanner::new(&APHILIC_TENMERS),
        }
    }
}

impl MotifDetector for APhilicDetector {
    fn class(&self) -> MotifClass {
        MotifClass::APhilicDna
    }

    fn patterns(&self) -> Vec<PatternGroup> {
        vec![PatternGroup {
            name: "a_philic_10mers",
            patterns: vec![PatternInfo {
                pattern: "",
                id: "APH_10MER",
                name: "A-philic 10-mer table",
                subclass: SUBCLASS,
                min_len: 10,
                score_tag: "a_philic_10mer_score",
                min_score: MIN_SUM_LOG2,
                reference: "Gorin 1995; Vinogradov 2003",
            }],
        }]
    }

    fn raw_score_bounds(&self, _subclass: &str, length: usize) -> (f64, f64) {
        let per_base_max = *APHILIC_TENMER_MAX / 10.0;
        (
            MIN_SUM_LOG2,
            (per_base_max * length.max(10) as f64).max(MIN_SUM_LOG2 + 0.1),
        )
    }

    fn normalization(&self, _subclass: &str) -> Normalization {
        Normalization::Linear
    }

    fn detect(&self, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
        let mut motifs = Vec::new();
        for (i, region) in self.scanner.scan_regions(seq).iter().enumerate() {
            let sum_log2 = region.sum_score();
            if sum_log2 <= MIN_SUM_LOG2 || region.hits.is_empty() {
                continue;
            }
            let slice = &seq[region.start..region.end];
            let score = self.normalize(sum_log2, region.len(), SUBCLASS);
            let pattern_id = format!("APHIL_{}", i + 1);
            let mut motif = Motif::from_span(
                seq,
                sequence_name,
                MotifClass::APhilicDna,
                SUBCLASS,
                (region.start, region.end),
                round3(sum_log2),
                score,
                Strand::plus(),
                "A-philic_detection",
                &pattern_id,
            );
            let tenmer_list = region
                .hits
                .iter()
                .take(10)
                .map(|h| String::from_utf8_lossy(&seq[h.pos..h.pos + 10]).into_owned())
                .join(",");
            motif.set_attr("Contributing_10mers", region.hits.len());
            motif.set_attr("Mean_10mer_Log2", round3(region.mean_per_tenmer()));
            motif.set_attr("GC_Content", round3(gc_content(slice)));
            motif.set_attr("AT_Content", round3(at_content(slice)));
            motif.set_attr("Arm_Length", crate::motif::AttrValue::Na);
            motif.set_attr("Loop_Length", crate::motif::AttrValue::Na);
            motif.set_attr(
                "Type_Of_Repeat",
                if at_content(slice) > 80.0 {
                    "High AT-content A-philic DNA (>80% AT)"
                } else if at_content(slice) > 65.0 {
                    "Moderate AT-content A-philic DNA (65-80% AT)"
                } else {
                    "A-philic DNA"
                },
            );
            motif.set_attr(
                "Criterion",
                format!(
                    "10-mer propensity scoring; sum log2 {:.2} >{MIN_SUM_LOG2}; {} contributing 10-mers",
                    sum_log2,
                    region.hits.len()
                ),
            );
            motif.set_attr(
                "Disease_Relevance",
                "A-philic DNA - minor groove narrowing, protein-DNA recognition, gene regulation",
            );
            motif.set_attr(
                "Regions_Involved",
                format!(
                    "{} overlapping A-philic 10-mers: {}",
                    region.hits.len(),
                    tenmer_list
                ),
            );
            motifs.push(motif);
        }
        motifs
    }
}
