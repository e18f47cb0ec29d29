//! Shared 10-mer propensity scan engine.
//!
//! Both table-driven detectors (Z-DNA, A-philic) work the same way: find
//! every tabled 10-mer in the sequence, merge overlapping/adjacent hits
//! into regions, and score regions by summed per-base contributions
//! (each hit spreads score/10 over its ten positions).
//!
//! The primary matcher is an Aho-Corasick automaton over the whole table
//! (one pass, overlapping matches). If automaton construction fails the
//! engine falls back to a hash-window scan over the same map.

use aho_corasick::AhoCorasick;
use fnv::FnvHashMap;

use crate::tables::TENMER_LEN;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TenmerHit {
    pub pos: usize,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct TenmerRegion {
    /// 0-based half-open span covered by the merged hits.
    pub start: usize,
    pub end: usize,
    pub hits: Vec<TenmerHit>,
}

impl TenmerRegion {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Summed per-base contribution over the region: every hit adds
    /// score/10 to each of its ten positions.
    pub fn sum_score(&self) -> f64 {
        // All hit positions lie inside [start, end), so the per-base sum
        // over the region is just the sum of the full hit scores.
        self.hits.iter().map(|h| h.score).sum()
    }

    pub fn mean_per_tenmer(&self) -> f64 {
        if self.hits.is_empty() {
            0.0
        } else {
            self.hits.iter().map(|h| h.score).sum::<f64>() / self.hits.len() as f64
        }
    }
}

pub struct TenmerScanner {
    automaton: Option<AhoCorasick>,
    /// Pattern-index -> score, parallel to the automaton's pattern order.
    pattern_scores: Vec<f64>,
    table: &'static FnvHashMap<[u8; TENMER_LEN], f64>,
}

impl TenmerScanner {
    pub fn new(table: &'static FnvHashMap<[u8; TENMER_LEN], f64>) -> Self {
        let mut patterns: Vec<&[u8; TENMER_LEN]> = table.keys().collect();
        patterns.sort_unstable();
        let pattern_scores = patterns.iter().map(|p| table[*p]).collect();
        let automaton = match AhoCorasick::new(patterns.iter().map(|p| p.as_slice())) {
            Ok(ac) => Some(ac),
            Err(e) => {
                log::warn!("10-mer automaton build failed, using hash-window scan: {e}");
                None
            }
        };
        TenmerScanner {
            automaton,
            pattern_scores,
            table,
        }
    }

    /// All tabled 10-mer occurrences in `seq`, sorted by position.
    pub fn find(&self, seq: &[u8]) -> Vec<TenmerHit> {
        let mut hits = match &self.automaton {
            Some(ac) => ac
                .find_overlapping_iter(seq)
                .map(|m| TenmerHit {
                    pos: m.start(),
                    score: self.pattern_scores[m.pattern().as_usize()],
                })
                .collect(),
            None => self.hash_window_scan(seq),
        };
        hits.sort_by_key(|h| h.pos);
        hits
    }

    /// Fallback: probe the table with every 10 bp window.
    fn hash_window_scan(&self, seq: &[u8]) -> Vec<TenmerHit> {
        if seq.len() < TENMER_LEN {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for pos in 0..=seq.len() - TENMER_LEN {
            let window: &[u8; TENMER_LEN] = seq[pos..pos + TENMER_LEN]
                .try_into()
                .expect("window is exactly 10 bp");
            if let Some(&score) = self.table.get(window) {
                hits.push(TenmerHit { pos, score });
            }
        }
        hits
    }

    /// Merge overlapping/adjacent hits (gap <= `merge_gap`) into regions.
    pub fn merge(hits: &[TenmerHit], merge_gap: usize) -> Vec<TenmerRegion> {
        let mut merged = Vec::new();
        let mut iter = hits.iter();
        let first = match iter.next() {
            Some(h) => h,
            None => return merged,
        };
        let mut cur = TenmerRegion {
            start: first.pos,
            end: first.pos + TENMER_LEN,
            hits: vec![*first],
        };
        for hit in iter {
            if hit.pos <= cur.end + merge_gap {
                cur.end = cur.end.max(hit.pos + TENMER_LEN);
                cur.hits.push(*hit);
            } else {
                merged.push(cur);
                cur = TenmerRegion {
                    start: hit.pos,
                    end: hit.pos + TENMER_LEN,
                    hits: vec![*hit],
                };
            }
        }
        merged.push(cur);
        merged
    }

    pub fn scan_regions(&self, seq: &[u8]) -> Vec<TenmerRegion> {
        Self::merge(&self.find(seq), 0)
    }
}
