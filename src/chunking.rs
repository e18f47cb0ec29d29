//! Chunk planning: overlapping tiling for large sequences and the
//! three-tier adaptive hierarchy for genome-scale input.

/// Default tile size for chunked analysis.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;
/// Default overlap between adjacent tiles.
pub const DEFAULT_CHUNK_OVERLAP: usize = 2_000;
/// Sequences at or above this length are tiled.
pub const SEQUENCE_CHUNKING_THRESHOLD: usize = 1_000_000;
/// Sequences at or above this length run detectors in parallel.
pub const PARALLEL_DETECTOR_THRESHOLD: usize = 50_000;

/// Adaptive tier geometry for genome-scale sequences.
pub const MACRO_CHUNK_SIZE: usize = 100_000_000;
pub const MESO_CHUNK_SIZE: usize = 10_000_000;
pub const MICRO_CHUNK_SIZE: usize = 5_000_000;
pub const TIER_OVERLAP: usize = 2_000;

/// Adaptive strategy selected from the sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// One window, no tiling.
    Direct,
    /// Flat tiling at the configured chunk size.
    SingleTier,
    /// Macro/meso/micro hierarchy for sequences past the macro size.
    TripleTier,
}

pub fn strategy_for(len: usize, chunking_threshold: usize) -> ChunkStrategy {
    if len < chunking_threshold {
        ChunkStrategy::Direct
    } else if len < MACRO_CHUNK_SIZE {
        ChunkStrategy::SingleTier
    } else {
        ChunkStrategy::TripleTier
    }
}

/// (start, end) pairs tiling `len` with the given overlap. The final
/// tile always reaches `len`; every interior boundary is covered by
/// `overlap` shared bases.
pub fn tile(len: usize, chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    assert!(chunk_size > overlap, "chunk size must exceed overlap");
    let mut tiles = Vec::new();
    if len == 0 {
        return tiles;
    }
    let step = chunk_size - overlap;
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(len);
        tiles.push((start, end));
        if end == len {
            break;
        }
        start += step;
    }
    tiles
}
