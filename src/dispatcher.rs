//! Windowed dispatch: run a single detector class over pre-computed
//! windows of a larger sequence, translating coordinates back to the
//! full-sequence frame.

use std::sync::Arc;

use crate::detectors::{DetectorRegistry, SHARED_REGISTRY};
use crate::motif::Motif;
use crate::taxonomy::MotifClass;

pub struct WindowDispatcher {
    registry: Arc<DetectorRegistry>,
}

impl Default for WindowDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowDispatcher {
    pub fn new() -> Self {
        WindowDispatcher {
            registry: SHARED_REGISTRY.clone(),
        }
    }

    pub fn with_registry(registry: Arc<DetectorRegistry>) -> Self {
        WindowDispatcher { registry }
    }

    /// Run the detector for `class` over each 0-based end-inclusive
    /// window, re-mapping coordinates into the chromosome frame.
    pub fn run(
        &self,
        sequence: &[u8],
        windows_by_class: &[(MotifClass, Vec<(usize, usize)>)],
        sequence_name: &str,
    ) -> Vec<Motif> {
        let mut results = Vec::new();
        for (class, windows) in windows_by_class {
            for &(win_start, win_end) in windows {
                if win_start > win_end || win_end >= sequence.len() {
                    continue;
                }
                results.extend(self.run_window(
                    &sequence[win_start..=win_end],
                    *class,
                    win_start,
                    sequence_name,
                ));
            }
        }
        results
    }

    /// Run one detector over an extracted window slice; `win_start` is
    /// the 0-based position of the slice in the full sequence.
    pub fn run_window(
        &self,
        window: &[u8],
        class: MotifClass,
        win_start: usize,
        sequence_name: &str,
    ) -> Vec<Motif> {
        let detector = match self.registry.get(class) {
            Some(d) => d,
            None => return Vec::new(),
        };
        let mut motifs = detector.detect(window, sequence_name);
        for motif in &mut motifs {
            motif.shift(win_start);
        }
        motifs
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn window_results_are_remapped() {
        let mut seq = vec![b'A'; 100];
        seq.extend_from_slice(b"TTAGGGTTAGGGTTAGGGTTAGGG");
        seq.extend(vec![b'A'; 100]);
        let dispatcher = WindowDispatcher::new();
        let motifs = dispatcher.run(
            &seq,
            &[(MotifClass::GQuadruplex, vec![(100, 123)])],
            "chr",
        );
        let telo = motifs
            .iter()
            .find(|m| m.subclass == "Telomeric G4")
            .expect("telomeric motif");
        assert_eq!(telo.start, 101);
        assert_eq!(telo.end, 124);
        assert_eq!(telo.id, format!("chr_{}_101", telo.pattern_id));
    }

    #[test]
    fn out_of_range_windows_are_skipped() {
        let dispatcher = WindowDispatcher::new();
        let motifs = dispatcher.run(
            b"ACGTACGT",
            &[(MotifClass::GQuadruplex, vec![(4, 100)])],
            "chr",
        );
        assert!(motifs.is_empty());
    }
}
