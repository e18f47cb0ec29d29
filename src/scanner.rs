//! Pipeline orchestrator: input validation, chunk planning, parallel
//! detector dispatch, post-processing, and boundary deduplication.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rayon::prelude::*;

use crate::chunking::{
    self, strategy_for, tile, ChunkStrategy, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
    PARALLEL_DETECTOR_THRESHOLD, SEQUENCE_CHUNKING_THRESHOLD, TIER_OVERLAP,
};
use crate::dedup::dedup_chunk_boundaries;
use crate::detector::MotifDetector;
use crate::detectors::{DetectorRegistry, SHARED_REGISTRY};
use crate::error::ScanError;
use crate::motif::Motif;
use crate::postprocess;
use crate::preprocess;
use crate::taxonomy::{self, MotifClass};

/// Progress callback: (detector name, completed count, total count,
/// elapsed seconds, motifs so far).
pub type ProgressCallback = Arc<dyn Fn(&str, usize, usize, f64, usize) + Send + Sync>;

/// Cooperative cancellation handle. The scanner checks it at detector
/// and chunk boundaries and returns `ScanError::Cancelled` without
/// merging partial results.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Classes to run; `None` means all nine.
    pub enabled_classes: Option<Vec<MotifClass>>,
    /// Run detectors concurrently once the window passes the detector
    /// parallelism threshold.
    pub parallel_detectors: bool,
    /// Run chunks concurrently when the sequence is tiled.
    pub parallel_chunks: bool,
    /// Tile sequences past `sequence_chunking_threshold`.
    pub use_chunking: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Tile-the-sequence trigger; independent of the detector-parallel
    /// trigger below.
    pub sequence_chunking_threshold: usize,
    /// Detector-parallelism trigger.
    pub parallel_detector_threshold: usize,
    /// Strict taxonomy: fail on unknown classes or invalid pairings
    /// instead of warning and auto-correcting.
    pub strict_taxonomy: bool,
    /// Worker threads for parallel execution; `None` uses the CPU count.
    pub num_threads: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            enabled_classes: None,
            parallel_detectors: true,
            parallel_chunks: true,
            use_chunking: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            sequence_chunking_threshold: SEQUENCE_CHUNKING_THRESHOLD,
            parallel_detector_threshold: PARALLEL_DETECTOR_THRESHOLD,
            strict_taxonomy: false,
            num_threads: None,
        }
    }
}

impl ScanConfig {
    /// Resolve class names through the taxonomy. Unknown names fail in
    /// strict mode and are dropped with a warning otherwise.
    pub fn with_classes_by_name(
        mut self,
        names: &[String],
        strict: bool,
    ) -> Result<Self, ScanError> {
        let mut classes = Vec::new();
        for name in names {
            match taxonomy::normalize_class(name, strict) {
                Ok(class) => classes.push(class),
                Err(e) if strict => return Err(e),
                Err(_) => log::warn!("dropping unknown class {name:?}"),
            }
        }
        self.enabled_classes = Some(classes);
        Ok(self)
    }
}

/// Execution record for one detector over one window.
#[derive(Debug, Clone)]
pub struct DetectorRun {
    pub class: MotifClass,
    pub motif_count: usize,
    pub elapsed_secs: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub motifs: Vec<Motif>,
    pub detector_runs: Vec<DetectorRun>,
    pub sequence_length: usize,
    pub strategy: ChunkStrategy,
    pub elapsed_secs: f64,
}

pub struct NonBScanner {
    registry: Arc<DetectorRegistry>,
    config: ScanConfig,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl Default for NonBScanner {
    fn default() -> Self {
        Self::new()
    }
}

struct ProgressState {
    callback: Option<ProgressCallback>,
    completed: Mutex<(usize, usize)>,
    total: usize,
    started: Instant,
}

impl ProgressState {
    fn report(&self, detector_name: &str, new_motifs: usize) {
        if let Some(cb) = &self.callback {
            let (completed, motifs) = {
                let mut guard = self
                    .completed
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                guard.0 += 1;
                guard.1 += new_motifs;
                *guard
            };
            cb(
                detector_name,
                completed,
                self.total,
                self.started.elapsed().as_secs_f64(),
                motifs,
            );
        }
    }
}

impl NonBScanner {
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self::with_registry(SHARED_REGISTRY.clone(), config)
    }

    /// Constructor-injected registry, mainly for tests.
    pub fn with_registry(registry: Arc<DetectorRegistry>, config: ScanConfig) -> Self {
        NonBScanner {
            registry,
            config,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Analyze one sequence and return the final ordered motif list.
    pub fn analyze(&self, sequence: &str, name: &str) -> Result<Vec<Motif>, ScanError> {
        self.analyze_with_report(sequence, name).map(|r| r.motifs)
    }

    /// Analyze with per-detector execution records.
    pub fn analyze_with_report(
        &self,
        sequence: &str,
        name: &str,
    ) -> Result<ScanReport, ScanError> {
        let started = Instant::now();
        let seq = preprocess::validate(sequence)?;

        if seq.is_empty() {
            log::warn!("empty sequence {name:?}, returning no motifs");
            return Ok(self.empty_report(0, started));
        }
        if seq.len() < 10 {
            log::warn!(
                "sequence {name:?} too short for motif analysis ({} bp)",
                seq.len()
            );
            return Ok(self.empty_report(seq.len(), started));
        }
        if seq.iter().all(|&b| b != b'A' && b != b'C' && b != b'G' && b != b'T') {
            log::warn!("sequence {name:?} has no unambiguous bases, returning no motifs");
            return Ok(self.empty_report(seq.len(), started));
        }

        let detectors = self.resolve_detectors();
        if detectors.is_empty() {
            log::warn!("no detectors enabled");
            return Ok(self.empty_report(seq.len(), started));
        }

        let strategy = if self.config.use_chunking {
            strategy_for(seq.len(), self.config.sequence_chunking_threshold)
        } else {
            ChunkStrategy::Direct
        };

        let (motifs, runs) = match strategy {
            ChunkStrategy::Direct => self.analyze_window(&seq, name, 0, &detectors)?,
            ChunkStrategy::SingleTier => {
                self.analyze_chunked(&seq, name, &detectors)?
            }
            ChunkStrategy::TripleTier => {
                self.analyze_adaptive(&seq, name, &detectors)?
            }
        };

        let motifs = self.enforce_taxonomy(motifs)?;

        if motifs.is_empty() && !runs.is_empty() && runs.iter().all(|r| r.error.is_some())
        {
            let first = runs
                .iter()
                .find_map(|r| r.error.clone())
                .unwrap_or_else(|| "unknown detector failure".to_string());
            return Err(ScanError::InternalDetectorError(first));
        }

        Ok(ScanReport {
            motifs,
            detector_runs: runs,
            sequence_length: seq.len(),
            strategy,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }

    fn empty_report(&self, len: usize, started: Instant) -> ScanReport {
        ScanReport {
            motifs: Vec::new(),
            detector_runs: Vec::new(),
            sequence_length: len,
            strategy: ChunkStrategy::Direct,
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }

    fn resolve_detectors(&self) -> Vec<&dyn MotifDetector> {
        match &self.config.enabled_classes {
            Some(classes) => self.registry.subset(classes),
            None => self.registry.iter().collect(),
        }
    }

    /// Final taxonomy gate over every motif: lenient mode auto-corrects
    /// and warns, strict mode propagates the typed error.
    fn enforce_taxonomy(&self, motifs: Vec<Motif>) -> Result<Vec<Motif>, ScanError> {
        let strict = self.config.strict_taxonomy;
        let mut out = Vec::with_capacity(motifs.len());
        for mut motif in motifs {
            let (class, subclass) = taxonomy::enforce_pair(
                motif.class,
                std::mem::take(&mut motif.subclass),
                strict,
                !strict,
            )?;
            motif.class = class;
            motif.subclass = subclass;
            out.push(motif);
        }
        Ok(out)
    }

    /// Run detectors over one window (sequential or parallel), then the
    /// per-window post-processing.
    fn analyze_window(
        &self,
        seq: &[u8],
        name: &str,
        offset: usize,
        detectors: &[&dyn MotifDetector],
    ) -> Result<(Vec<Motif>, Vec<DetectorRun>), ScanError> {
        let state = ProgressState {
            callback: self.progress.clone(),
            completed: Mutex::new((0, 0)),
            total: detectors.len(),
            started: Instant::now(),
        };

        let parallel = self.config.parallel_detectors
            && seq.len() >= self.config.parallel_detector_threshold
            && detectors.len() > 1;

        let outcomes: Vec<(Vec<Motif>, DetectorRun)> = if parallel {
            match self.build_pool(detectors.len()) {
                Some(pool) => pool.install(|| {
                    detectors
                        .par_iter()
                        .map(|det| self.run_one(*det, seq, name, &state))
                        .collect()
                }),
                None => detectors
                    .iter()
                    .map(|det| self.run_one(*det, seq, name, &state))
                    .collect(),
            }
        } else {
            detectors
                .iter()
                .map(|det| self.run_one(*det, seq, name, &state))
                .collect()
        };

        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut runs = Vec::with_capacity(outcomes.len());
        let mut motifs = Vec::new();
        for (mut found, run) in outcomes {
            runs.push(run);
            motifs.append(&mut found);
        }

        let mut motifs = postprocess::postprocess(motifs, seq, name);
        if offset > 0 {
            for motif in &mut motifs {
                motif.shift(offset);
            }
        }
        Ok((motifs, runs))
    }

    /// One detector over one window, isolated from the others: a panic
    /// becomes an empty contribution plus an error record.
    fn run_one(
        &self,
        detector: &dyn MotifDetector,
        seq: &[u8],
        name: &str,
        state: &ProgressState,
    ) -> (Vec<Motif>, DetectorRun) {
        let class = detector.class();
        if self.cancel.is_cancelled() {
            return (
                Vec::new(),
                DetectorRun {
                    class,
                    motif_count: 0,
                    elapsed_secs: 0.0,
                    error: Some("cancelled".to_string()),
                },
            );
        }
        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| detector.detect(seq, name)));
        let elapsed = started.elapsed().as_secs_f64();
        match result {
            Ok(motifs) => {
                state.report(class.canonical_name(), motifs.len());
                let run = DetectorRun {
                    class,
                    motif_count: motifs.len(),
                    elapsed_secs: elapsed,
                    error: None,
                };
                (motifs, run)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "detector panicked".to_string());
                log::error!("detector {class} failed: {message}");
                state.report(class.canonical_name(), 0);
                (
                    Vec::new(),
                    DetectorRun {
                        class,
                        motif_count: 0,
                        elapsed_secs: elapsed,
                        error: Some(message),
                    },
                )
            }
        }
    }

    /// Build a scoped worker pool; a failure (e.g. restricted sandbox)
    /// falls back to in-thread execution with a warning.
    fn build_pool(&self, task_count: usize) -> Option<rayon::ThreadPool> {
        let threads = self
            .config
            .num_threads
            .unwrap_or_else(num_cpus::get)
            .min(task_count.max(1));
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("worker pool unavailable, running sequentially: {e}");
                None
            }
        }
    }

    /// Flat tiling: each tile runs the full per-window pipeline, then
    /// boundary duplicates are removed from the merged list.
    fn analyze_chunked(
        &self,
        seq: &[u8],
        name: &str,
        detectors: &[&dyn MotifDetector],
    ) -> Result<(Vec<Motif>, Vec<DetectorRun>), ScanError> {
        let chunk_size = self.config.chunk_size.max(self.config.chunk_overlap + 1);
        let tiles = tile(seq.len(), chunk_size, self.config.chunk_overlap);
        log::info!(
            "analyzing {name:?} ({} bp) in {} chunks of {} bp ({} bp overlap)",
            seq.len(),
            tiles.len(),
            chunk_size,
            self.config.chunk_overlap
        );

        let process = |&(start, end): &(usize, usize)| -> Result<
            (Vec<Motif>, Vec<DetectorRun>),
            ScanError,
        > {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            self.analyze_window(&seq[start..end], name, start, detectors)
        };

        let outcomes: Result<Vec<_>, ScanError> = if self.config.parallel_chunks {
            match self.build_pool(tiles.len()) {
                Some(pool) => pool.install(|| tiles.par_iter().map(process).collect()),
                None => tiles.iter().map(process).collect(),
            }
        } else {
            tiles.iter().map(process).collect()
        };
        let outcomes = outcomes?;

        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut motifs = Vec::new();
        let mut runs: Vec<DetectorRun> = Vec::new();
        for (mut chunk_motifs, chunk_runs) in outcomes {
            motifs.append(&mut chunk_motifs);
            runs.extend(chunk_runs);
        }
        let motifs = dedup_chunk_boundaries(motifs, self.config.chunk_overlap);
        Ok((motifs, Self::merge_runs(runs)))
    }

    /// Genome-scale three-tier hierarchy. Tiers are processed
    /// sequentially; the detector-parallel pool runs inside each micro
    /// window, and the boundary rule is applied at every tier seam.
    fn analyze_adaptive(
        &self,
        seq: &[u8],
        name: &str,
        detectors: &[&dyn MotifDetector],
    ) -> Result<(Vec<Motif>, Vec<DetectorRun>), ScanError> {
        let mut all = Vec::new();
        let mut runs = Vec::new();
        for (macro_start, macro_end) in
            tile(seq.len(), chunking::MACRO_CHUNK_SIZE, TIER_OVERLAP)
        {
            let mut macro_motifs = Vec::new();
            for (meso_start, meso_end) in
                tile(macro_end - macro_start, chunking::MESO_CHUNK_SIZE, TIER_OVERLAP)
            {
                let meso_abs = macro_start + meso_start;
                let mut meso_motifs = Vec::new();
                for (micro_start, micro_end) in
                    tile(meso_end - meso_start, chunking::MICRO_CHUNK_SIZE, TIER_OVERLAP)
                {
                    if self.cancel.is_cancelled() {
                        return Err(ScanError::Cancelled);
                    }
                    let abs = meso_abs + micro_start;
                    let window = &seq[abs..meso_abs + micro_end];
                    let (motifs, window_runs) =
                        self.analyze_window(window, name, abs, detectors)?;
                    meso_motifs.extend(motifs);
                    runs.extend(window_runs);
                }
                macro_motifs.extend(dedup_chunk_boundaries(meso_motifs, TIER_OVERLAP));
            }
            all.extend(dedup_chunk_boundaries(macro_motifs, TIER_OVERLAP));
        }
        let motifs = dedup_chunk_boundaries(all, TIER_OVERLAP);
        Ok((motifs, Self::merge_runs(runs)))
    }

    /// Collapse per-window runs into one record per detector class.
    fn merge_runs(runs: Vec<DetectorRun>) -> Vec<DetectorRun> {
        let mut merged: Vec<DetectorRun> = Vec::new();
        for run in runs {
            match merged.iter_mut().find(|r| r.class == run.class) {
                Some(existing) => {
                    existing.motif_count += run.motif_count;
                    existing.elapsed_secs += run.elapsed_secs;
                    if existing.error.is_none() {
                        existing.error = run.error;
                    }
                }
                None => merged.push(run),
            }
        }
        merged
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scanner() -> NonBScanner {
        NonBScanner::new()
    }

    #[test]
    fn empty_sequence_returns_no_motifs() {
        assert!(scanner().analyze("", "empty").unwrap().is_empty());
    }

    #[test]
    fn short_sequence_returns_no_motifs() {
        assert!(scanner().analyze("ACGTACGT", "short").unwrap().is_empty());
    }

    #[test]
    fn all_n_sequence_returns_no_motifs() {
        assert!(scanner()
            .analyze("NNNNNNNNNNNNNNNNNNNN", "n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn invalid_character_is_fatal() {
        let err = scanner().analyze("ACGTACGT!ACGT", "bad").unwrap_err();
        assert!(matches!(err, ScanError::InvalidCharacter { ch: '!', pos: 8 }));
    }

    #[test]
    fn telomeric_sequence_end_to_end() {
        let motifs = scanner()
            .analyze("TTAGGGTTAGGGTTAGGGTTAGGG", "telo")
            .unwrap();
        let g4 = motifs
            .iter()
            .find(|m| m.class == MotifClass::GQuadruplex)
            .expect("G4 motif");
        assert_eq!(g4.subclass, "Telomeric G4");
        assert_eq!(g4.start, 1);
        assert_eq!(g4.end, 24);
    }

    #[test]
    fn output_is_sorted_and_consistent() {
        let seq = "TTAGGGTTAGGGTTAGGGTTAGGGAAAAAAAAAAAAGAAGAAGAAGAAGAAGAACCCCTCCCCTCCCCTCCCC";
        let motifs = scanner().analyze(seq, "mix").unwrap();
        assert!(!motifs.is_empty());
        let mut prev_start = 0;
        for m in &motifs {
            assert!(m.start >= 1 && m.end <= seq.len());
            assert!(m.start >= prev_start);
            prev_start = m.start;
            assert_eq!(m.length, m.end - m.start + 1);
            assert!(m.score >= 1.0 && m.score <= 3.0);
            if !m.sequence.is_empty() {
                assert_eq!(m.sequence, &seq[m.start - 1..m.end]);
            }
        }
    }

    #[test]
    fn enabled_classes_filter_detectors() {
        let config = ScanConfig {
            enabled_classes: Some(vec![MotifClass::Triplex]),
            ..ScanConfig::default()
        };
        let motifs = NonBScanner::with_config(config)
            .analyze("TTAGGGTTAGGGTTAGGGTTAGGGGAAGAAGAAGAAGAAGAA", "filter")
            .unwrap();
        assert!(!motifs.is_empty());
        assert!(motifs.iter().all(|m| m.class == MotifClass::Triplex));
    }

    #[test]
    fn unknown_class_names_error_in_strict_mode() {
        let err = ScanConfig::default()
            .with_classes_by_name(&["B-DNA".to_string()], true)
            .unwrap_err();
        assert!(matches!(err, ScanError::UnknownClass(_)));

        let config = ScanConfig::default()
            .with_classes_by_name(&["B-DNA".to_string(), "g4".to_string()], false)
            .unwrap();
        assert_eq!(
            config.enabled_classes,
            Some(vec![MotifClass::GQuadruplex])
        );
    }

    #[test]
    fn cancelled_scan_returns_cancelled() {
        let scanner = scanner();
        scanner.cancel_token().cancel();
        let seq: String = "TTAGGGTTAGGG".repeat(10);
        let err = scanner.analyze(&seq, "cancel").unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
    }

    #[test]
    fn analysis_is_deterministic() {
        let seq = "TTAGGGTTAGGGTTAGGGTTAGGGAAAAAAAAAAAAGAAGAAGAAGAAGAAGAA";
        let a = scanner().analyze(seq, "det").unwrap();
        let b = scanner().analyze(seq, "det").unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!((x.start, x.end), (y.start, y.end));
            assert_eq!(x.score, y.score);
        }
    }

    #[test]
    fn progress_callback_sees_every_detector() {
        use std::sync::atomic::AtomicUsize;
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_cb = calls.clone();
        let mut scanner = scanner();
        scanner.set_progress_callback(Arc::new(move |_, completed, total, _, _| {
            assert!(completed <= total);
            calls_in_cb.fetch_add(1, Ordering::SeqCst);
        }));
        scanner
            .analyze("TTAGGGTTAGGGTTAGGGTTAGGG", "progress")
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }
}
