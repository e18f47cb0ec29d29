pub mod chunking;
pub mod dedup;
pub mod detector;
pub mod detectors;
pub mod dispatcher;
pub mod error;
pub mod motif;
pub mod postprocess;
pub mod preprocess;
pub mod scanner;
pub mod seq_utils;
pub mod tables;
pub mod taxonomy;
pub mod tenmer;

pub use error::ScanError;
pub use motif::{AttrValue, Motif, Strand};
pub use scanner::{
    CancelToken, NonBScanner, ProgressCallback, ScanConfig, ScanReport,
};
pub use taxonomy::MotifClass;
