//! The nine motif-class detectors and their shared registry.

pub mod aphilic;
pub mod cruciform;
pub mod curved;
pub mod gquad;
pub mod imotif;
pub mod rloop;
pub mod slipped;
pub mod triplex;
pub mod zdna;

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::detector::MotifDetector;
use crate::taxonomy::MotifClass;

pub use aphilic::APhilicDetector;
pub use cruciform::CruciformDetector;
pub use curved::CurvedDnaDetector;
pub use gquad::GQuadruplexDetector;
pub use imotif::IMotifDetector;
pub use rloop::RLoopDetector;
pub use slipped::SlippedDnaDetector;
pub use triplex::TriplexDetector;
pub use zdna::ZDnaDetector;

/// Immutable set of constructed detectors; pattern compilation happens
/// once here and instances are shared across threads and calls.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn MotifDetector>>,
}

impl DetectorRegistry {
    /// All nine detectors.
    pub fn all() -> Self {
        let detectors: Vec<Box<dyn MotifDetector>> = vec![
            Box::new(CurvedDnaDetector::new()),
            Box::new(SlippedDnaDetector::new()),
            Box::new(CruciformDetector::new()),
            Box::new(RLoopDetector::new()),
            Box::new(TriplexDetector::new()),
            Box::new(GQuadruplexDetector::new()),
            Box::new(IMotifDetector::new()),
            Box::new(ZDnaDetector::new()),
            Box::new(APhilicDetector::new()),
        ];
        DetectorRegistry { detectors }
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn MotifDetector> {
        self.detectors.iter().map(|d| d.as_ref())
    }

    pub fn get(&self, class: MotifClass) -> Option<&dyn MotifDetector> {
        self.iter().find(|d| d.class() == class)
    }

    /// Detectors for the requested classes, in registry order.
    pub fn subset(&self, classes: &[MotifClass]) -> Vec<&dyn MotifDetector> {
        self.iter().filter(|d| classes.contains(&d.class())).collect()
    }
}

lazy_static! {
    /// Process-wide registry built once; scanners share it unless a
    /// caller injects its own.
    pub static ref SHARED_REGISTRY: Arc<DetectorRegistry> =
        Arc::new(DetectorRegistry::all());
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn registry_holds_one_detector_per_class() {
        let registry = DetectorRegistry::all();
        assert_eq!(registry.len(), 9);
        for class in MotifClass::DETECTABLE {
            let detector = registry.get(class).expect("detector for class");
            assert_eq!(detector.class(), class);
        }
        assert!(registry.get(MotifClass::Hybrid).is_none());
    }

    #[test]
    fn every_pattern_subclass_is_canonical() {
        let registry = DetectorRegistry::all();
        for detector in registry.iter() {
            for group in detector.patterns() {
                for info in group.patterns {
                    let (class, sub) = crate::taxonomy::normalize_pair(
                        detector.class().canonical_name(),
                        info.subclass,
                        true,
                        false,
                    )
                    .unwrap_or_else(|e| {
                        panic!("{}/{}: {e}", detector.class(), info.subclass)
                    });
                    assert_eq!(class, detector.class());
                    assert_eq!(sub, info.subclass);
                }
            }
        }
    }

    #[test]
    fn subset_respects_registry_order() {
        let registry = DetectorRegistry::all();
        let subset = registry.subset(&[MotifClass::ZDna, MotifClass::CurvedDna]);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset[0].class(), MotifClass::CurvedDna);
        assert_eq!(subset[1].class(), MotifClass::ZDna);
    }
}
