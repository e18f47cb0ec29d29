//! End-to-end pipeline tests: the documented detection scenarios, the
//! chunked-analysis consistency guarantees, and throughput sanity.

use libnonb::{MotifClass, NonBScanner, ScanConfig};
use rand::prelude::SmallRng;
use rand::{Rng, SeedableRng};

fn scanner() -> NonBScanner {
    NonBScanner::new()
}

/// Weighted random sequence with the given GC fraction.
fn random_sequence(len: usize, gc: f64, seed: u64) -> String {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            if rng.gen_bool(gc) {
                if rng.gen_bool(0.5) {
                    'G'
                } else {
                    'C'
                }
            } else if rng.gen_bool(0.5) {
                'A'
            } else {
                'T'
            }
        })
        .collect()
}

#[test]
fn telomeric_g4_scenario() {
    let motifs = scanner().analyze("TTAGGGTTAGGGTTAGGGTTAGGG", "telo").unwrap();
    let g4 = motifs
        .iter()
        .find(|m| m.class == MotifClass::GQuadruplex)
        .expect("G-Quadruplex motif");
    assert_eq!(g4.subclass, "Telomeric G4");
    assert_eq!(g4.start, 1);
    assert_eq!(g4.end, 24);
    assert!(g4.score >= 1.0 && g4.score <= 3.0);
}

#[test]
fn i_motif_on_reverse_strand_scenario() {
    // Reverse complement of CCCCTCCCCTCCCCTCCCC.
    let motifs = scanner().analyze("GGGGAGGGGAGGGGAGGGG", "rc").unwrap();
    let im: Vec<_> = motifs
        .iter()
        .filter(|m| m.class == MotifClass::IMotif)
        .collect();
    assert_eq!(im.len(), 1);
    assert_eq!(im[0].subclass, "Canonical i-motif");
    assert_eq!(im[0].strand.as_str(), "-");
}

#[test]
fn sticky_dna_scenario() {
    let motifs = scanner().analyze("GAAGAAGAAGAAGAAGAA", "gaa").unwrap();
    let sticky = motifs
        .iter()
        .find(|m| m.class == MotifClass::Triplex && m.subclass == "Sticky DNA")
        .expect("Sticky DNA motif");
    assert_eq!(sticky.attr("Copy_Number").unwrap().as_i64(), Some(6));
    assert_eq!(
        sticky.attr("Replication_Blockage_Range").unwrap().as_bool(),
        Some(false)
    );
    assert!(sticky.score >= 1.0 && sticky.score <= 1.3);
}

#[test]
fn cag_str_scenario() {
    let seq: String = "CAG".repeat(10);
    let motifs = scanner().analyze(&seq, "cag").unwrap();
    let slipped = motifs
        .iter()
        .find(|m| m.class == MotifClass::SlippedDna)
        .expect("Slipped_DNA motif");
    assert_eq!(slipped.subclass, "STR");
    assert_eq!(slipped.attr("Repeat_Unit").unwrap().as_text(), Some("CAG"));
    assert_eq!(slipped.attr("Copy_Number").unwrap().as_f64(), Some(10.0));

    let control: String = "ACT".repeat(10);
    let control_motifs = scanner().analyze(&control, "act").unwrap();
    let control_slipped = control_motifs
        .iter()
        .find(|m| m.class == MotifClass::SlippedDna)
        .expect("control STR");
    assert!(slipped.raw_score > control_slipped.raw_score);
}

#[test]
fn cruciform_scenario() {
    let arm = "GCATGCATGCATGCATGC";
    let revcomp: String = arm
        .chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'T' => 'A',
            'G' => 'C',
            _ => 'G',
        })
        .collect();
    let seq = format!("{arm}TTTTT{revcomp}");
    let motifs = scanner().analyze(&seq, "cruciform").unwrap();
    let cruciform = motifs
        .iter()
        .find(|m| m.class == MotifClass::Cruciform)
        .expect("Cruciform motif");
    assert!(cruciform.attr("Arm_Length").unwrap().as_i64().unwrap() >= 18);
    assert_eq!(cruciform.attr("Loop_Length").unwrap().as_i64(), Some(5));
    assert!(cruciform.attr("DeltaG").unwrap().as_f64().unwrap() < -5.0);
}

#[test]
fn pipeline_invariants_on_mixed_sequence() {
    let mut seq = random_sequence(2_000, 0.5, 11);
    seq.insert_str(500, "TTAGGGTTAGGGTTAGGGTTAGGG");
    seq.insert_str(1200, &"CAG".repeat(15));
    let motifs = scanner().analyze(&seq, "mixed").unwrap();
    assert!(!motifs.is_empty());
    let mut prev_start = 0usize;
    for m in &motifs {
        assert!(m.start >= 1 && m.start <= m.end && m.end <= seq.len());
        assert_eq!(m.length, m.end - m.start + 1);
        assert!((1.0..=3.0).contains(&m.score));
        assert!(m.start >= prev_start, "output not sorted by start");
        prev_start = m.start;
        if !m.sequence.is_empty() {
            assert_eq!(m.sequence, &seq[m.start - 1..m.end]);
        }
        // Every emitted pair must be canonical.
        libnonb::taxonomy::normalize_pair(
            m.class.canonical_name(),
            &m.subclass,
            true,
            false,
        )
        .unwrap();
    }
}

#[test]
fn analysis_is_idempotent() {
    let mut seq = random_sequence(5_000, 0.55, 7);
    seq.insert_str(1000, "GGGATGGGCTGGGAAGGGTT");
    seq.insert_str(3000, &"GAA".repeat(25));
    let a = scanner().analyze(&seq, "idem").unwrap();
    let b = scanner().analyze(&seq, "idem").unwrap();
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.id, y.id);
        assert_eq!((x.start, x.end), (y.start, y.end));
        assert_eq!(x.subclass, y.subclass);
        assert_eq!(x.score, y.score);
    }
}

#[test]
fn chunked_analysis_matches_direct_on_the_interior() {
    // 120 kb with G4s planted away from boundaries; force tiling with a
    // low threshold and compare against the direct run.
    let mut seq = random_sequence(120_000, 0.45, 42);
    for &pos in &[10_000, 30_000, 55_000, 80_000, 110_000] {
        seq.replace_range(pos..pos + 24, "TTAGGGTTAGGGTTAGGGTTAGGG");
    }

    let direct = NonBScanner::with_config(ScanConfig {
        use_chunking: false,
        ..ScanConfig::default()
    })
    .analyze(&seq, "interior")
    .unwrap();

    let chunked = NonBScanner::with_config(ScanConfig {
        sequence_chunking_threshold: 50_000,
        ..ScanConfig::default()
    })
    .analyze(&seq, "interior")
    .unwrap();

    let telomeric = |motifs: &[libnonb::Motif]| -> Vec<(usize, usize)> {
        motifs
            .iter()
            .filter(|m| m.subclass == "Telomeric G4")
            .map(|m| (m.start, m.end))
            .collect()
    };
    assert_eq!(telomeric(&direct), telomeric(&chunked));
    assert!(!telomeric(&chunked).is_empty());

    // No boundary duplicates: same-subclass overlaps must be gone.
    for (i, a) in chunked.iter().enumerate() {
        for b in chunked.iter().skip(i + 1) {
            if a.class == b.class && a.subclass == b.subclass && a.overlap_len(b) > 0 {
                let shorter = a.length.min(b.length) as f64;
                assert!(
                    (a.overlap_len(b) as f64) / shorter < 0.5,
                    "boundary duplicate survived: {a:?} vs {b:?}"
                );
            }
        }
    }
}

#[test]
#[ignore = "long-running genome-scale regression"]
fn megabase_sequence_returns_motifs() {
    // 1.1 Mb with periodic G4 patterns: chunked analysis must not drop
    // everything as false boundary duplicates.
    let unit = format!("GGGTAGGGTAGGGTAGGG{}", "ATCGATCGATCGATCG".repeat(10));
    let mut seq = String::with_capacity(1_100_000 + unit.len());
    while seq.len() < 1_100_000 {
        seq.push_str(&unit);
    }
    seq.truncate(1_100_000);
    let motifs = scanner().analyze(&seq, "mega").unwrap();
    assert!(!motifs.is_empty(), "no motifs found for >1 Mb sequence");
    for m in motifs.iter().take(5) {
        assert!(m.start >= 1 && m.end <= seq.len());
    }
}

#[test]
fn gc_rich_sequence_completes_without_blowup() {
    // 50 kb at 70% GC: seed-region merging must keep G4 detection far
    // from quadratic.
    let seq = random_sequence(50_000, 0.70, 1234);
    let config = ScanConfig {
        enabled_classes: Some(vec![MotifClass::GQuadruplex]),
        ..ScanConfig::default()
    };
    let started = std::time::Instant::now();
    let motifs = NonBScanner::with_config(config).analyze(&seq, "gc").unwrap();
    let elapsed = started.elapsed();
    assert!(
        elapsed.as_secs() < 60,
        "G4 detection took {elapsed:?} on 50 kb"
    );
    for m in &motifs {
        assert_eq!(m.class, MotifClass::GQuadruplex);
    }
}

#[test]
fn hybrid_and_cluster_synthesis_end_to_end() {
    // A dense multi-class neighborhood: telomeric G4 (plus its C-rich
    // complement), sticky DNA, an A-tract, and a CAG expansion within a
    // 300 bp window.
    let mut seq = String::new();
    seq.push_str("TTAGGGTTAGGGTTAGGGTTAGGG");
    seq.push_str(&"GAA".repeat(10));
    seq.push_str("AAAAAAAAAAAA");
    seq.push_str(&"CAG".repeat(10));
    seq.push_str("GCATGCATGCATGCATGCTTTTTGCATGCATGCATGCATGC");
    let motifs = scanner().analyze(&seq, "dense").unwrap();
    let classes: std::collections::BTreeSet<_> =
        motifs.iter().map(|m| m.class.canonical_name()).collect();
    assert!(classes.len() >= 3, "expected class diversity, got {classes:?}");
    let cluster = motifs
        .iter()
        .find(|m| m.class == MotifClass::NonBDnaClusters);
    assert!(cluster.is_some(), "expected a cluster in {classes:?}");
    let c = cluster.unwrap();
    assert_eq!(c.subclass, "Motif Hotspot");
    assert!(c.attr("Motif_Count").unwrap().as_i64().unwrap() >= 4);
}
