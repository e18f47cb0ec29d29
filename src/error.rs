use thiserror::Error;

/// Typed failures surfaced by the scanner and the taxonomy layer.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("empty sequence")]
    EmptySequence,

    #[error("sequence too short ({len} bp, need at least {min} bp)")]
    TooShort { len: usize, min: usize },

    #[error("invalid character {ch:?} at position {pos}")]
    InvalidCharacter { ch: char, pos: usize },

    #[error("unknown motif class: {0:?}")]
    UnknownClass(String),

    #[error("unknown subclass: {0:?}")]
    UnknownSubclass(String),

    #[error("subclass {subclass:?} does not belong to class {class:?} (expected {expected:?})")]
    InvalidPairing {
        class: String,
        subclass: String,
        expected: String,
    },

    #[error("all detectors failed: {0}")]
    InternalDetectorError(String),

    #[error("analysis cancelled")]
    Cancelled,
}
