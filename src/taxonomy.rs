//! Canonical motif taxonomy: class/subclass pairing, aliases, length caps.
//!
//! Every motif leaving the pipeline carries a (class, subclass) pair from
//! this table. Detectors emit canonical names directly; the normalizer is
//! the enforcement point for anything arriving from outside (CLI class
//! filters, export round-trips).

use fnv::FnvHashMap;
use lazy_static::lazy_static;
use serde::{Serialize, Serializer};

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MotifClass {
    GQuadruplex,
    ZDna,
    CurvedDna,
    RLoop,
    SlippedDna,
    Cruciform,
    Triplex,
    IMotif,
    APhilicDna,
    Hybrid,
    NonBDnaClusters,
}

impl MotifClass {
    /// All canonical classes, including the two synthesized ones.
    pub const ALL: [MotifClass; 11] = [
        MotifClass::GQuadruplex,
        MotifClass::ZDna,
        MotifClass::CurvedDna,
        MotifClass::RLoop,
        MotifClass::SlippedDna,
        MotifClass::Cruciform,
        MotifClass::Triplex,
        MotifClass::IMotif,
        MotifClass::APhilicDna,
        MotifClass::Hybrid,
        MotifClass::NonBDnaClusters,
    ];

    /// Classes with a dedicated detector (Hybrid and cluster motifs are
    /// synthesized downstream, never detected).
    pub const DETECTABLE: [MotifClass; 9] = [
        MotifClass::CurvedDna,
        MotifClass::SlippedDna,
        MotifClass::Cruciform,
        MotifClass::RLoop,
        MotifClass::Triplex,
        MotifClass::GQuadruplex,
        MotifClass::IMotif,
        MotifClass::ZDna,
        MotifClass::APhilicDna,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            MotifClass::GQuadruplex => "G-Quadruplex",
            MotifClass::ZDna => "Z-DNA",
            MotifClass::CurvedDna => "Curved_DNA",
            MotifClass::RLoop => "R-Loop",
            MotifClass::SlippedDna => "Slipped_DNA",
            MotifClass::Cruciform => "Cruciform",
            MotifClass::Triplex => "Triplex",
            MotifClass::IMotif => "i-Motif",
            MotifClass::APhilicDna => "A-philic_DNA",
            MotifClass::Hybrid => "Hybrid",
            MotifClass::NonBDnaClusters => "Non-B_DNA_Clusters",
        }
    }

    /// The closed subclass set for this class. Hybrid subclasses are
    /// dynamic (`<A>_<B>_Overlap`) and validated by suffix instead.
    pub fn subclasses(&self) -> &'static [&'static str] {
        match self {
            MotifClass::GQuadruplex => &[
                "Telomeric G4",
                "Higher-order G4 array/G4-wire",
                "Stacked G4",
                "Canonical intramolecular G4",
                "Bulged G4",
                "Extended-loop canonical",
                "Intramolecular G-triplex",
                "Two-tetrad weak PQS",
            ],
            MotifClass::ZDna => &["Z-DNA", "eGZ"],
            MotifClass::CurvedDna => &["Global Curvature", "Local Curvature"],
            MotifClass::RLoop => &["R-loop formation sites"],
            MotifClass::SlippedDna => &["STR", "Direct Repeat"],
            MotifClass::Cruciform => &["Cruciform forming IRs"],
            MotifClass::Triplex => &["Triplex", "Sticky DNA"],
            MotifClass::IMotif => &["Canonical i-motif", "Relaxed i-motif", "AC-motif"],
            MotifClass::APhilicDna => &["A-philic DNA"],
            MotifClass::Hybrid => &[],
            MotifClass::NonBDnaClusters => &["Motif Hotspot"],
        }
    }
}

impl std::fmt::Display for MotifClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl Serialize for MotifClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.canonical_name())
    }
}

lazy_static! {
    static ref CLASS_ALIASES: FnvHashMap<&'static str, MotifClass> = {
        let mut m = FnvHashMap::default();
        for class in MotifClass::ALL {
            m.insert(class.canonical_name(), class);
        }
        m.insert("g4", MotifClass::GQuadruplex);
        m.insert("gquad", MotifClass::GQuadruplex);
        m.insert("g quadruplex", MotifClass::GQuadruplex);
        m.insert("g_quadruplex", MotifClass::GQuadruplex);
        m.insert("quadruplex", MotifClass::GQuadruplex);
        m.insert("zdna", MotifClass::ZDna);
        m.insert("z dna", MotifClass::ZDna);
        m.insert("z_dna", MotifClass::ZDna);
        m.insert("curved dna", MotifClass::CurvedDna);
        m.insert("curved-dna", MotifClass::CurvedDna);
        m.insert("curved", MotifClass::CurvedDna);
        m.insert("rloop", MotifClass::RLoop);
        m.insert("r loop", MotifClass::RLoop);
        m.insert("r_loop", MotifClass::RLoop);
        m.insert("slipped", MotifClass::SlippedDna);
        m.insert("slipped dna", MotifClass::SlippedDna);
        m.insert("slipped-dna", MotifClass::SlippedDna);
        m.insert("h-dna", MotifClass::Triplex);
        m.insert("hdna", MotifClass::Triplex);
        m.insert("imotif", MotifClass::IMotif);
        m.insert("i motif", MotifClass::IMotif);
        m.insert("i_motif", MotifClass::IMotif);
        m.insert("aphilic", MotifClass::APhilicDna);
        m.insert("a-philic", MotifClass::APhilicDna);
        m.insert("a-philic dna", MotifClass::APhilicDna);
        m.insert("clusters", MotifClass::NonBDnaClusters);
        m.insert("cluster", MotifClass::NonBDnaClusters);
        m.insert("non-b dna clusters", MotifClass::NonBDnaClusters);
        m
    };
    static ref SUBCLASS_TO_CLASS: FnvHashMap<&'static str, MotifClass> = {
        let mut m = FnvHashMap::default();
        for class in MotifClass::ALL {
            for sub in class.subclasses() {
                m.insert(*sub, class);
            }
        }
        m
    };
    static ref SUBCLASS_ALIASES: FnvHashMap<&'static str, &'static str> = {
        let mut m = FnvHashMap::default();
        // Internal detector labels collapse onto canonical names.
        m.insert("telomeric_g4", "Telomeric G4");
        m.insert("higher_order_g4", "Higher-order G4 array/G4-wire");
        m.insert("stacked_g4", "Stacked G4");
        m.insert("canonical_g4", "Canonical intramolecular G4");
        m.insert("bulged_g4", "Bulged G4");
        m.insert("extended_loop_g4", "Extended-loop canonical");
        m.insert("g_triplex", "Intramolecular G-triplex");
        m.insert("weak_pqs", "Two-tetrad weak PQS");
        m.insert("canonical_imotif", "Canonical i-motif");
        m.insert("relaxed_imotif", "Relaxed i-motif");
        m.insert("hur_ac_motif", "AC-motif");
        m.insert("ac_motif_hur", "AC-motif");
        m.insert("ac-motif (hur)", "AC-motif");
        m.insert("egz", "eGZ");
        m.insert("egz-motif", "eGZ");
        m.insert("inverted_repeats", "Cruciform forming IRs");
        m.insert("cruciform ir", "Cruciform forming IRs");
        m.insert("mirror_triplex", "Triplex");
        m.insert("mirror triplex", "Triplex");
        m.insert("sticky_dna", "Sticky DNA");
        m.insert("r-loop", "R-loop formation sites");
        m.insert("rlfs", "R-loop formation sites");
        m.insert("qmrlfs", "R-loop formation sites");
        m.insert("short tandem repeat", "STR");
        m.insert("direct_repeat", "Direct Repeat");
        m.insert("local_curved", "Local Curvature");
        m.insert("global_curved", "Global Curvature");
        m.insert("apr", "Global Curvature");
        m.insert("a-philic 10-mer", "A-philic DNA");
        m.insert("hotspot", "Motif Hotspot");
        m
    };
}

/// Resolve a class name (canonical, alias, or any casing).
pub fn normalize_class(name: &str, strict: bool) -> Result<MotifClass, ScanError> {
    let trimmed = name.trim();
    if let Some(class) = CLASS_ALIASES.get(trimmed) {
        return Ok(*class);
    }
    let lower = trimmed.to_lowercase();
    if let Some(class) = CLASS_ALIASES.get(lower.as_str()) {
        return Ok(*class);
    }
    for class in MotifClass::ALL {
        if class.canonical_name().to_lowercase() == lower {
            return Ok(class);
        }
    }
    if !strict {
        log::warn!("unknown class name {name:?}");
    }
    Err(ScanError::UnknownClass(name.to_string()))
}

/// Resolve a subclass name to canonical form. Dynamic hybrid subclasses
/// (`<A>_<B>_Overlap`) pass through unchanged.
pub fn normalize_subclass(name: &str, strict: bool) -> Result<String, ScanError> {
    let trimmed = name.trim();
    if SUBCLASS_TO_CLASS.contains_key(trimmed) {
        return Ok(trimmed.to_string());
    }
    if trimmed.ends_with("_Overlap") {
        return Ok(trimmed.to_string());
    }
    let lower = trimmed.to_lowercase();
    if let Some(canonical) = SUBCLASS_ALIASES.get(lower.as_str()) {
        return Ok((*canonical).to_string());
    }
    for (canonical, _) in SUBCLASS_TO_CLASS.iter() {
        if canonical.to_lowercase() == lower {
            return Ok((*canonical).to_string());
        }
    }
    if !strict {
        log::warn!("unknown subclass name {name:?}");
    }
    Err(ScanError::UnknownSubclass(name.to_string()))
}

/// Enforce canonical class/subclass pairing.
///
/// With `auto_correct`, a subclass that belongs to a different class
/// rewrites the class; otherwise a mismatch is an `InvalidPairing` in
/// strict mode and a pass-through warning in lenient mode.
pub fn normalize_pair(
    class_in: &str,
    subclass_in: &str,
    strict: bool,
    auto_correct: bool,
) -> Result<(MotifClass, String), ScanError> {
    let class = normalize_class(class_in, strict)?;
    let subclass = normalize_subclass(subclass_in, strict)?;
    enforce_pair(class, subclass, strict, auto_correct)
}

/// Pairing check for an already-resolved class and canonical subclass.
pub fn enforce_pair(
    class: MotifClass,
    subclass: String,
    strict: bool,
    auto_correct: bool,
) -> Result<(MotifClass, String), ScanError> {
    if class == MotifClass::Hybrid && subclass.ends_with("_Overlap") {
        return Ok((class, subclass));
    }
    match SUBCLASS_TO_CLASS.get(subclass.as_str()) {
        Some(owner) if *owner == class => Ok((class, subclass)),
        Some(owner) => {
            if auto_correct {
                log::warn!(
                    "subclass {subclass:?} belongs to {owner}, not {class}; correcting class"
                );
                Ok((*owner, subclass))
            } else if strict {
                Err(ScanError::InvalidPairing {
                    class: class.canonical_name().to_string(),
                    subclass,
                    expected: owner.canonical_name().to_string(),
                })
            } else {
                log::warn!("invalid pairing {class}/{subclass:?} passed through");
                Ok((class, subclass))
            }
        }
        None => {
            if strict {
                Err(ScanError::UnknownSubclass(subclass))
            } else {
                log::warn!("unknown subclass {subclass:?} passed through");
                Ok((class, subclass))
            }
        }
    }
}

/// Structural length cap in bp used by the score normalizer.
///
/// Some classes have subclass-specific caps; the cap saturates the length
/// factor, it never truncates motifs.
pub fn length_cap(class: MotifClass, subclass: Option<&str>) -> usize {
    match class {
        MotifClass::GQuadruplex => 120,
        MotifClass::IMotif => 60,
        MotifClass::ZDna => 300,
        MotifClass::CurvedDna => match subclass {
            Some("Local Curvature") => 50,
            _ => 120,
        },
        MotifClass::RLoop => 2000,
        MotifClass::SlippedDna => match subclass {
            Some("Direct Repeat") => 500,
            _ => 1000,
        },
        MotifClass::Cruciform => 200,
        MotifClass::Triplex => 150,
        MotifClass::APhilicDna => 300,
        // Synthesized motifs keep their constituents' scores; the cap is
        // only meaningful when renormalizing the spanned region.
        MotifClass::Hybrid | MotifClass::NonBDnaClusters => 2000,
    }
}

/// Opt-in disease-expansion cap override for repeat-unit driven motifs
/// (pathogenic expansions run far past the structural caps).
pub fn disease_length_cap(repeat_unit: &str) -> Option<usize> {
    match repeat_unit {
        "CAG" | "CTG" => Some(1000),
        "CGG" | "CCG" => Some(1300),
        "GAA" | "TTC" => Some(1700),
        "GGGGCC" | "GGCCCC" => Some(2000),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn canonical_pairs_pass() {
        let (class, sub) =
            normalize_pair("G-Quadruplex", "Telomeric G4", true, false).unwrap();
        assert_eq!(class, MotifClass::GQuadruplex);
        assert_eq!(sub, "Telomeric G4");
    }

    #[test]
    fn aliases_and_case_folding() {
        let (class, sub) =
            normalize_pair("g-quadruplex", "telomeric g4", true, false).unwrap();
        assert_eq!(class, MotifClass::GQuadruplex);
        assert_eq!(sub, "Telomeric G4");

        let (class, sub) = normalize_pair("zdna", "egz", true, false).unwrap();
        assert_eq!(class, MotifClass::ZDna);
        assert_eq!(sub, "eGZ");

        let (class, sub) =
            normalize_pair("i-motif", "canonical_imotif", true, false).unwrap();
        assert_eq!(class, MotifClass::IMotif);
        assert_eq!(sub, "Canonical i-motif");
    }

    #[test]
    fn mismatched_pair_auto_corrects() {
        let (class, sub) =
            normalize_pair("Triplex", "Telomeric G4", false, true).unwrap();
        assert_eq!(class, MotifClass::GQuadruplex);
        assert_eq!(sub, "Telomeric G4");
    }

    #[test]
    fn mismatched_pair_fails_strict() {
        let err = normalize_pair("Triplex", "Telomeric G4", true, false).unwrap_err();
        assert!(matches!(err, ScanError::InvalidPairing { .. }));
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(matches!(
            normalize_class("B-DNA", true),
            Err(ScanError::UnknownClass(_))
        ));
        assert!(matches!(
            normalize_subclass("left-handed helix", true),
            Err(ScanError::UnknownSubclass(_))
        ));
    }

    #[test]
    fn hybrid_subclasses_are_dynamic() {
        let (class, sub) =
            normalize_pair("Hybrid", "G-Quadruplex_Z-DNA_Overlap", true, false).unwrap();
        assert_eq!(class, MotifClass::Hybrid);
        assert_eq!(sub, "G-Quadruplex_Z-DNA_Overlap");
    }

    #[test]
    fn subclass_specific_caps() {
        assert_eq!(length_cap(MotifClass::CurvedDna, Some("Local Curvature")), 50);
        assert_eq!(length_cap(MotifClass::CurvedDna, Some("Global Curvature")), 120);
        assert_eq!(length_cap(MotifClass::SlippedDna, Some("STR")), 1000);
        assert_eq!(length_cap(MotifClass::SlippedDna, Some("Direct Repeat")), 500);
        assert_eq!(length_cap(MotifClass::GQuadruplex, None), 120);
    }

    #[test]
    fn disease_overrides_are_opt_in() {
        assert_eq!(disease_length_cap("CAG"), Some(1000));
        assert_eq!(disease_length_cap("ACT"), None);
    }

    #[test]
    fn every_subclass_maps_back_to_its_class() {
        for class in MotifClass::ALL {
            for sub in class.subclasses() {
                let (owner, canonical) =
                    normalize_pair(class.canonical_name(), sub, true, false).unwrap();
                assert_eq!(owner, class);
                assert_eq!(&canonical, sub);
            }
        }
    }
}
