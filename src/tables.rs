//! Bundled propensity tables: nearest-neighbor stacking energies and the
//! 10-mer lookup maps used by the Z-DNA and A-philic detectors.
//!
//! The 10-mer maps are expanded once at startup from dinucleotide step
//! models: Z-DNA propensity follows the B-to-Z transition weights
//! (CG/GC >> CA/AC/GT/TG > AT/TA, Ho 1986), so the table holds every
//! alternating purine/pyrimidine 10-mer scored by the sum of its nine
//! steps. A-philicity follows ApA/ApT step preferences (Gorin 1995), so
//! that table holds A/T-only 10-mers with a positive summed log2 odds.

use fnv::FnvHashMap;
use lazy_static::lazy_static;

/// Nearest-neighbor dinucleotide stacking free energies in kcal/mol
/// (SantaLucia 1998 unified set), used by the cruciform stem filter.
pub fn nn_energy(dinuc: &[u8]) -> f64 {
    match dinuc {
        b"AA" => -1.0,
        b"AC" => -1.44,
        b"AG" => -1.28,
        b"AT" => -0.88,
        b"CA" => -1.45,
        b"CC" => -1.84,
        b"CG" => -2.17,
        b"CT" => -1.28,
        b"GA" => -1.30,
        b"GC" => -2.24,
        b"GG" => -1.84,
        b"GT" => -1.44,
        b"TA" => -0.58,
        b"TC" => -1.30,
        b"TG" => -1.45,
        b"TT" => -1.0,
        _ => 0.0,
    }
}

/// Most negative nearest-neighbor energy (the GC step).
pub const NN_ENERGY_MIN: f64 = -2.24;

pub const TENMER_LEN: usize = 10;

fn z_step_weight(a: u8, b: u8) -> f64 {
    match (a, b) {
        (b'G', b'C') | (b'C', b'G') => 3.0,
        (b'G', b'T') | (b'T', b'G') => 2.0,
        (b'A', b'C') | (b'C', b'A') => 2.0,
        (b'A', b'T') | (b'T', b'A') => 1.0,
        _ => 0.0,
    }
}

fn aphilic_step_log2(a: u8, b: u8) -> f64 {
    match (a, b) {
        (b'A', b'A') | (b'T', b'T') => 0.35,
        (b'A', b'T') => 0.20,
        (b'T', b'A') => -0.30,
        _ => -0.50,
    }
}

const PURINES: [u8; 2] = [b'A', b'G'];
const PYRIMIDINES: [u8; 2] = [b'C', b'T'];

/// Every 10-mer with strictly alternating purine/pyrimidine positions,
/// scored by the sum of its nine dinucleotide step weights.
fn build_zdna_table() -> FnvHashMap<[u8; TENMER_LEN], f64> {
    let mut table = FnvHashMap::default();
    // Two phases: purine-first and pyrimidine-first.
    for phase in 0..2 {
        for bits in 0u32..(1 << TENMER_LEN) {
            let mut tenmer = [0u8; TENMER_LEN];
            for (i, slot) in tenmer.iter_mut().enumerate() {
                let choice = ((bits >> i) & 1) as usize;
                *slot = if (i + phase) % 2 == 0 {
                    PURINES[choice]
                } else {
                    PYRIMIDINES[choice]
                };
            }
            let score: f64 = tenmer
                .windows(2)
                .map(|w| z_step_weight(w[0], w[1]))
                .sum();
            table.insert(tenmer, score);
        }
    }
    table
}

/// A/T-only 10-mers whose summed step log2 odds is positive.
fn build_aphilic_table() -> FnvHashMap<[u8; TENMER_LEN], f64> {
    let mut table = FnvHashMap::default();
    for bits in 0u32..(1 << TENMER_LEN) {
        let mut tenmer = [0u8; TENMER_LEN];
        for (i, slot) in tenmer.iter_mut().enumerate() {
            *slot = if (bits >> i) & 1 == 0 { b'A' } else { b'T' };
        }
        let log2: f64 = tenmer
            .windows(2)
            .map(|w| aphilic_step_log2(w[0], w[1]))
            .sum();
        if log2 > 0.0 {
            table.insert(tenmer, log2);
        }
    }
    table
}

lazy_static! {
    pub static ref ZDNA_TENMERS: FnvHashMap<[u8; TENMER_LEN], f64> = build_zdna_table();
    pub static ref APHILIC_TENMERS: FnvHashMap<[u8; TENMER_LEN], f64> =
        build_aphilic_table();
    /// Highest 10-mer score in the Z-DNA table (the (CG)5 repeat).
    pub static ref ZDNA_TENMER_MAX: f64 = ZDNA_TENMERS
        .values()
        .cloned()
        .fold(f64::MIN, f64::max);
    /// Highest 10-mer log2 odds in the A-philic table (the A10 tract).
    pub static ref APHILIC_TENMER_MAX: f64 = APHILIC_TENMERS
        .values()
        .cloned()
        .fold(f64::MIN, f64::max);
}
