//! Chunk-boundary deduplication.
//!
//! Motifs detected independently in the overlap region of two adjacent
//! chunks appear twice in the merged list. Any true duplicate lies within
//! the overlap window, so a back-scan bounded by the overlap size is a
//! complete check.

use crate::motif::Motif;

/// Fraction of the shorter motif two same-subclass calls must share to
/// count as boundary duplicates.
const DUP_MIN_OVERLAP: f64 = 0.5;

fn sort_key(m: &Motif) -> (usize, usize, &'static str) {
    (m.start, m.end, m.class.canonical_name())
}

fn is_duplicate(a: &Motif, b: &Motif) -> bool {
    if a.class != b.class || a.subclass != b.subclass {
        return false;
    }
    let overlap = a.overlap_len(b);
    if overlap == 0 {
        return false;
    }
    let shorter = a.length.min(b.length);
    overlap as f64 / shorter as f64 >= DUP_MIN_OVERLAP
}

/// Remove boundary duplicates from a merged multi-chunk motif list,
/// keeping the higher-scoring copy of each pair.
pub fn dedup_chunk_boundaries(mut motifs: Vec<Motif>, overlap: usize) -> Vec<Motif> {
    motifs.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    let mut out: Vec<Motif> = Vec::with_capacity(motifs.len());

    'next: for motif in motifs {
        for idx in (0..out.len()).rev() {
            // Prior motifs starting more than one overlap before the
            // current start cannot be boundary duplicates.
            if out[idx].start + overlap < motif.start {
                break;
            }
            if is_duplicate(&out[idx], &motif) {
                if motif.score > out[idx].score {
                    out[idx] = motif;
                }
                continue 'next;
            }
        }
        out.push(motif);
    }

    out.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    out
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::motif::Strand;
    use crate::taxonomy::MotifClass;

    fn mk(class: MotifClass, subclass: &str, start: usize, end: usize, score: f64) -> Motif {
        Motif {
            id: format!("t_p_{start}"),
            sequence_name: "t".to_string(),
            class,
            subclass: subclass.to_string(),
            start,
            end,
            length: end - start + 1,
            sequence: String::new(),
            raw_score: score,
            score,
            strand: Strand::plus(),
            method: "test".to_string(),
            pattern_id: "p".to_string(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn exact_duplicates_collapse() {
        let motifs = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 100, 150, 2.0),
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 100, 150, 2.0),
        ];
        let out = dedup_chunk_boundaries(motifs, 2000);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn overlapping_duplicates_keep_the_higher_score() {
        let motifs = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 100, 150, 2.0),
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 120, 170, 1.8),
        ];
        let out = dedup_chunk_boundaries(motifs, 2000);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 2.0);
    }

    #[test]
    fn distinct_loci_survive() {
        let motifs = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 100, 150, 2.0),
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 200, 250, 1.8),
        ];
        let out = dedup_chunk_boundaries(motifs, 2000);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn different_classes_survive_even_when_overlapping() {
        let motifs = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 100, 150, 2.0),
            mk(MotifClass::ZDna, "Z-DNA", 120, 170, 1.8),
        ];
        let out = dedup_chunk_boundaries(motifs, 2000);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn below_half_overlap_is_not_a_duplicate() {
        let motifs = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 100, 150, 2.0),
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 140, 190, 1.8),
        ];
        // 11 bp of 51 bp: 22% overlap.
        let out = dedup_chunk_boundaries(motifs, 2000);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn back_scan_is_bounded_by_the_overlap() {
        // Same subclass with >=50% overlap but separated by more than the
        // chunk overlap: left untouched.
        let motifs = vec![
            mk(MotifClass::ZDna, "Z-DNA", 100, 5000, 2.0),
            mk(MotifClass::ZDna, "Z-DNA", 3000, 5100, 1.8),
        ];
        let out = dedup_chunk_boundaries(motifs, 2000);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn idempotence() {
        let motifs = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 100, 150, 2.0),
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 120, 170, 1.8),
            mk(MotifClass::ZDna, "Z-DNA", 400, 460, 1.5),
        ];
        let once = dedup_chunk_boundaries(motifs, 2000);
        let twice = dedup_chunk_boundaries(once.clone(), 2000);
        assert_eq!(once.len(), twice.len());
    }
}
