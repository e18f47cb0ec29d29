//! The universal motif record emitted by every detector.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Serialize, Serializer};

use crate::taxonomy::MotifClass;

/// Strand call for a motif.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strand {
    strand: i8,
}

impl Default for Strand {
    fn default() -> Self {
        Strand::plus()
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Strand {
    pub const fn new(strand: i8) -> Self {
        Self { strand }
    }

    pub const fn plus() -> Self {
        Strand::new(1)
    }

    pub const fn minus() -> Self {
        Strand::new(-1)
    }

    pub fn is_plus_strand(&self) -> bool {
        self.strand > 0
    }

    pub fn is_minus_strand(&self) -> bool {
        self.strand < 0
    }

    pub fn as_str(&self) -> &'static str {
        if self.strand < 0 {
            "-"
        } else {
            "+"
        }
    }
}

impl Serialize for Strand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Class-specific attribute slot. Unknown/irrelevant slots hold `Na`,
/// rendered as "N/A" by the export adapters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    Flag(bool),
    Na,
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(v) => write!(f, "{v}"),
            AttrValue::Flag(v) => write!(f, "{v}"),
            AttrValue::Na => write!(f, "N/A"),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Flag(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// One detected (or synthesized) motif.
///
/// Coordinates are 1-based inclusive in the original full sequence, so
/// `sequence == input[start-1..end]` and `length == end - start + 1`.
#[derive(Debug, Clone, Serialize)]
pub struct Motif {
    pub id: String,
    pub sequence_name: String,
    pub class: MotifClass,
    pub subclass: String,
    pub start: usize,
    pub end: usize,
    pub length: usize,
    pub sequence: String,
    pub raw_score: f64,
    pub score: f64,
    pub strand: Strand,
    pub method: String,
    pub pattern_id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Motif {
    /// Build a motif from a 0-based half-open span within `seq`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_span(
        seq: &[u8],
        name: &str,
        class: MotifClass,
        subclass: &str,
        span: (usize, usize),
        raw_score: f64,
        score: f64,
        strand: Strand,
        method: &str,
        pattern_id: &str,
    ) -> Self {
        let (s, e) = span;
        let start = s + 1;
        Motif {
            id: format!("{name}_{pattern_id}_{start}"),
            sequence_name: name.to_string(),
            class,
            subclass: subclass.to_string(),
            start,
            end: e,
            length: e - s,
            sequence: String::from_utf8_lossy(&seq[s..e]).into_owned(),
            raw_score,
            score,
            strand,
            method: method.to_string(),
            pattern_id: pattern_id.to_string(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Shift chunk-local coordinates to global ones and rebuild the id so
    /// it reflects the global start.
    pub fn shift(&mut self, offset: usize) {
        self.start += offset;
        self.end += offset;
        self.id = format!("{}_{}_{}", self.sequence_name, self.pattern_id, self.start);
    }

    /// Overlap in bp with another motif (1-based inclusive intervals).
    pub fn overlap_len(&self, other: &Motif) -> usize {
        let lo = self.start.max(other.start);
        let hi = self.end.min(other.end);
        if hi >= lo {
            hi - lo + 1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn span_coordinates_are_one_based_inclusive() {
        let seq = b"ACGTACGT";
        let m = Motif::from_span(
            seq,
            "test",
            MotifClass::GQuadruplex,
            "Telomeric G4",
            (2, 6),
            1.0,
            1.5,
            Strand::plus(),
            "demo",
            "PAT",
        );
        assert_eq!(m.start, 3);
        assert_eq!(m.end, 6);
        assert_eq!(m.length, 4);
        assert_eq!(m.sequence, "GTAC");
        assert_eq!(m.id, "test_PAT_3");
    }

    #[test]
    fn shift_rewrites_the_id() {
        let seq = b"ACGTACGT";
        let mut m = Motif::from_span(
            seq,
            "test",
            MotifClass::ZDna,
            "Z-DNA",
            (0, 4),
            60.0,
            2.0,
            Strand::plus(),
            "demo",
            "ZDNA_1",
        );
        m.shift(100);
        assert_eq!(m.start, 101);
        assert_eq!(m.end, 104);
        assert_eq!(m.id, "test_ZDNA_1_101");
    }

    #[test]
    fn overlap_lengths() {
        let seq = b"ACGTACGTACGT";
        let a = Motif::from_span(
            seq,
            "t",
            MotifClass::ZDna,
            "Z-DNA",
            (0, 6),
            0.0,
            1.0,
            Strand::plus(),
            "m",
            "p",
        );
        let b = Motif::from_span(
            seq,
            "t",
            MotifClass::ZDna,
            "Z-DNA",
            (3, 9),
            0.0,
            1.0,
            Strand::plus(),
            "m",
            "p",
        );
        let c = Motif::from_span(
            seq,
            "t",
            MotifClass::ZDna,
            "Z-DNA",
            (6, 12),
            0.0,
            1.0,
            Strand::plus(),
            "m",
            "p",
        );
        assert_eq!(a.overlap_len(&b), 3);
        assert_eq!(a.overlap_len(&c), 0);
        assert_eq!(b.overlap_len(&c), 3);
    }
}
