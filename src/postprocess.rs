//! Post-detection passes over the merged motif list: intra-subclass
//! overlap removal, hybrid synthesis, and cluster synthesis.

use std::collections::BTreeSet;

use fnv::{FnvHashMap, FnvHashSet};
use statrs::statistics::Statistics;

use crate::detector::round2;
use crate::motif::{Motif, Strand};
use crate::seq_utils::IntervalSet;
use crate::taxonomy::MotifClass;

/// Hybrid annotation window: mutual overlap fraction of the shorter
/// motif, exclusive bounds — near-identical spans are duplicates of one
/// structure, not a hybrid.
const HYBRID_MIN_FRACTION: f64 = 0.50;
const HYBRID_MAX_FRACTION: f64 = 0.99;

const CLUSTER_WINDOW: usize = 300;
const CLUSTER_MIN_MOTIFS: usize = 4;
const CLUSTER_MIN_CLASSES: usize = 3;

/// Within each (class, subclass) group, accept motifs in decreasing
/// (score, length) order, rejecting any that intersect an accepted
/// interval. Conflict checks are binary searches over the accepted set.
pub fn remove_overlaps_by_subclass(motifs: Vec<Motif>) -> Vec<Motif> {
    let mut groups: FnvHashMap<(MotifClass, String), Vec<Motif>> = FnvHashMap::default();
    for motif in motifs {
        groups
            .entry((motif.class, motif.subclass.clone()))
            .or_default()
            .push(motif);
    }

    let mut kept = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.length.cmp(&a.length))
                .then(a.start.cmp(&b.start))
        });
        let mut intervals = IntervalSet::new();
        for motif in group {
            if intervals.try_insert(motif.start - 1, motif.end) {
                kept.push(motif);
            }
        }
    }
    kept.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then(a.class.canonical_name().cmp(b.class.canonical_name()))
    });
    kept
}

/// Pairwise cross-class overlaps in the (0.50, 0.99) band of the shorter
/// motif become `Hybrid` annotations spanning the union.
pub fn synthesize_hybrids(motifs: &[Motif], seq: &[u8], sequence_name: &str) -> Vec<Motif> {
    let mut hybrids = Vec::new();
    let mut seen: FnvHashSet<(usize, usize, String)> = FnvHashSet::default();

    for (i, a) in motifs.iter().enumerate() {
        for b in motifs.iter().skip(i + 1) {
            if b.start > a.end {
                break;
            }
            if a.class == b.class {
                continue;
            }
            let overlap = a.overlap_len(b);
            if overlap == 0 {
                continue;
            }
            let shorter = a.length.min(b.length);
            let fraction = overlap as f64 / shorter as f64;
            if fraction <= HYBRID_MIN_FRACTION || fraction >= HYBRID_MAX_FRACTION {
                continue;
            }

            let start = a.start.min(b.start);
            let end = a.end.max(b.end);
            let pair: BTreeSet<&str> =
                [a.class.canonical_name(), b.class.canonical_name()]
                    .into_iter()
                    .collect();
            let pair_key = pair.iter().copied().collect::<Vec<_>>().join("|");
            if !seen.insert((start, end, pair_key)) {
                continue;
            }

            let subclass = format!(
                "{}_{}_Overlap",
                a.class.canonical_name(),
                b.class.canonical_name()
            );
            let raw = [a.raw_score, b.raw_score].iter().mean();
            let score = round2([a.score, b.score].iter().mean());
            let mut hybrid = Motif {
                id: format!("{sequence_name}_HYBRID_{start}"),
                sequence_name: sequence_name.to_string(),
                class: MotifClass::Hybrid,
                subclass,
                start,
                end,
                length: end - start + 1,
                sequence: String::from_utf8_lossy(&seq[start - 1..end]).into_owned(),
                raw_score: round2(raw),
                score,
                strand: Strand::plus(),
                method: "Hybrid_synthesis".to_string(),
                pattern_id: "HYBRID".to_string(),
                attrs: Default::default(),
            };
            hybrid.set_attr(
                "Contributing_Classes",
                format!("{},{}", a.class.canonical_name(), b.class.canonical_name()),
            );
            hybrid.set_attr("Overlap_Fraction", round2(fraction));
            hybrids.push(hybrid);
        }
    }
    hybrids
}

/// Density windows: any 300 bp window holding >= 4 motifs from >= 3
/// classes becomes a `Non-B_DNA_Clusters` annotation covering the actual
/// spanning extent of those motifs.
pub fn synthesize_clusters(motifs: &[Motif], seq: &[u8], sequence_name: &str) -> Vec<Motif> {
    let mut clusters = Vec::new();
    if motifs.len() < CLUSTER_MIN_MOTIFS {
        return clusters;
    }
    let starts: Vec<usize> = motifs.iter().map(|m| m.start).collect();
    let mut used_windows: FnvHashSet<usize> = FnvHashSet::default();
    let mut emitted_spans: FnvHashSet<(usize, usize)> = FnvHashSet::default();

    for (i, anchor) in motifs.iter().enumerate() {
        let window_start = anchor.start;
        if !used_windows.insert(window_start) {
            continue;
        }
        let window_end = window_start + CLUSTER_WINDOW;
        // End of the member range via binary search over sorted starts.
        let hi = starts.partition_point(|&s| s <= window_end);
        let members = &motifs[i..hi];
        if members.len() < CLUSTER_MIN_MOTIFS {
            continue;
        }
        let classes: FnvHashSet<MotifClass> = members.iter().map(|m| m.class).collect();
        if classes.len() < CLUSTER_MIN_CLASSES {
            continue;
        }
        let start = members.iter().map(|m| m.start).min().unwrap_or(window_start);
        let end = members.iter().map(|m| m.end).max().unwrap_or(window_end);
        if !emitted_spans.insert((start, end)) {
            continue;
        }
        let score = round2(members.iter().map(|m| m.score).mean());
        let mut names: Vec<&str> = classes.iter().map(|c| c.canonical_name()).collect();
        names.sort_unstable();
        let mut cluster = Motif {
            id: format!("{sequence_name}_CLUSTER_{start}"),
            sequence_name: sequence_name.to_string(),
            class: MotifClass::NonBDnaClusters,
            subclass: "Motif Hotspot".to_string(),
            start,
            end,
            length: end - start + 1,
            sequence: String::from_utf8_lossy(&seq[start - 1..end]).into_owned(),
            raw_score: members.len() as f64,
            score,
            strand: Strand::plus(),
            method: "Cluster_synthesis".to_string(),
            pattern_id: "CLUSTER".to_string(),
            attrs: Default::default(),
        };
        cluster.set_attr("Motif_Count", members.len());
        cluster.set_attr("Classes_Involved", names.join(","));
        clusters.push(cluster);
    }
    clusters
}

/// Full post-processing for one analysis window: overlap removal within
/// (class, subclass), then hybrid and cluster synthesis over the
/// surviving primary motifs.
pub fn postprocess(motifs: Vec<Motif>, seq: &[u8], sequence_name: &str) -> Vec<Motif> {
    let mut kept = remove_overlaps_by_subclass(motifs);
    let hybrids = synthesize_hybrids(&kept, seq, sequence_name);
    let clusters = synthesize_clusters(&kept, seq, sequence_name);
    kept.extend(hybrids);
    kept.extend(clusters);
    kept.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then(a.class.canonical_name().cmp(b.class.canonical_name()))
    });
    kept
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mk(class: MotifClass, subclass: &str, start: usize, end: usize, score: f64) -> Motif {
        Motif {
            id: format!("t_{subclass}_{start}"),
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
    fn overlap_removal_keeps_best_per_subclass() {
        let motifs = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 10, 40, 2.0),
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 20, 50, 1.5),
            mk(MotifClass::GQuadruplex, "Telomeric G4", 20, 50, 1.2),
        ];
        let kept = remove_overlaps_by_subclass(motifs);
        // Same subclass overlap resolved, different subclass kept.
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().any(|m| m.score == 2.0));
        assert!(kept.iter().any(|m| m.subclass == "Telomeric G4"));
    }

    #[test]
    fn hybrid_band_is_exclusive() {
        let a = mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 1, 100, 2.0);
        // 25% of the shorter motif overlaps: below the band.
        let b = mk(MotifClass::ZDna, "Z-DNA", 81, 160, 1.6);
        let motifs = vec![a.clone(), b.clone()];
        let seq = vec![b'A'; 400];
        let hybrids = synthesize_hybrids(&motifs, &seq, "t");
        assert_eq!(hybrids.len(), 0);

        // 75% of the shorter motif overlaps: inside the band.
        let c = mk(MotifClass::ZDna, "Z-DNA", 41, 120, 1.6);
        let motifs = vec![a.clone(), c];
        let hybrids = synthesize_hybrids(&motifs, &seq, "t");
        assert_eq!(hybrids.len(), 1);
        let h = &hybrids[0];
        assert_eq!(h.class, MotifClass::Hybrid);
        assert_eq!(h.subclass, "G-Quadruplex_Z-DNA_Overlap");
        assert_eq!((h.start, h.end), (1, 120));
        assert_eq!(h.score, 1.8);

        // Identical spans are duplicates, not hybrids.
        let d = mk(MotifClass::ZDna, "Z-DNA", 1, 100, 1.6);
        let motifs = vec![a, d];
        assert!(synthesize_hybrids(&motifs, &seq, "t").is_empty());
    }

    #[test]
    fn same_class_pairs_never_hybridize() {
        let a = mk(MotifClass::Triplex, "Triplex", 1, 60, 2.0);
        let b = mk(MotifClass::Triplex, "Sticky DNA", 21, 80, 2.0);
        let seq = vec![b'A'; 100];
        assert!(synthesize_hybrids(&[a, b], &seq, "t").is_empty());
    }

    #[test]
    fn clusters_need_density_and_diversity() {
        let motifs = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 10, 40, 2.0),
            mk(MotifClass::ZDna, "Z-DNA", 60, 90, 1.5),
            mk(MotifClass::Cruciform, "Cruciform forming IRs", 120, 160, 1.8),
            mk(MotifClass::Triplex, "Sticky DNA", 200, 230, 1.4),
        ];
        let seq = vec![b'A'; 400];
        let clusters = synthesize_clusters(&motifs, &seq, "t");
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!(c.class, MotifClass::NonBDnaClusters);
        assert_eq!(c.subclass, "Motif Hotspot");
        assert_eq!((c.start, c.end), (10, 230));
        assert_eq!(c.attr("Motif_Count").unwrap().as_i64(), Some(4));

        // Two classes only: no cluster.
        let two_classes = vec![
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 10, 40, 2.0),
            mk(MotifClass::GQuadruplex, "Telomeric G4", 60, 90, 1.5),
            mk(MotifClass::ZDna, "Z-DNA", 120, 160, 1.8),
            mk(MotifClass::ZDna, "eGZ", 200, 230, 1.4),
        ];
        assert!(synthesize_clusters(&two_classes, &seq, "t").is_empty());
    }

    #[test]
    fn postprocess_output_is_sorted() {
        let motifs = vec![
            mk(MotifClass::ZDna, "Z-DNA", 200, 260, 1.5),
            mk(MotifClass::GQuadruplex, "Canonical intramolecular G4", 10, 40, 2.0),
            mk(MotifClass::Cruciform, "Cruciform forming IRs", 100, 150, 1.8),
        ];
        let seq = vec![b'A'; 400];
        let out = postprocess(motifs, &seq, "t");
        let starts: Vec<usize> = out.iter().map(|m| m.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }
}
