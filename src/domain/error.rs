// ============================================================
// Layer 3 - Error Types
// ============================================================
// Typed failures of the library. The application and CLI layers
// wrap these in anyhow with extra context.
//
//   ConfigError - malformed layer specification, raised before
//                 any layer is allocated
//   DataError   - datasets whose parts do not line up, or split
//                 files that cannot be read
//   TrainError  - everything the training driver can hit

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("feature vector width must be positive")]
    ZeroFeatureDim,

    #[error("dense layer specification is empty")]
    EmptyDenseSpec,

    #[error("dense layer {index} has width 0")]
    ZeroWidth { index: usize },

    #[error("unknown convolution stage tag '{0}' (expected maintain, downsample or pool)")]
    UnknownStage(String),

    #[error(
        "convolution spec lengths differ: {stages} stages, {filters} filters, {kernels} kernel sizes"
    )]
    LengthMismatch {
        stages: usize,
        filters: usize,
        kernels: usize,
    },

    #[error("convolution stage {index} has 0 filters")]
    ZeroFilters { index: usize },

    #[error("convolution stage {index} has kernel size 0")]
    ZeroKernel { index: usize },

    #[error("image dimensions must be positive (got {height}x{width}, {timestamps} timestamps)")]
    ZeroImageDim {
        height: usize,
        width: usize,
        timestamps: usize,
    },

    #[error("dropout rate {0} is outside [0, 1)")]
    InvalidDropout(f64),
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("{what}: expected {expected} values, found {found}")]
    Misaligned {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("label at row {row} is {value}; labels must be 0 (FP) or 1 (TP)")]
    InvalidLabel { row: usize, value: u8 },

    #[error("cannot read '{path}': {message}")]
    Npy { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("model expects {model} input but training was requested in {requested} mode")]
    ModeMismatch {
        model: &'static str,
        requested: &'static str,
    },

    #[error("{split} split: {message}")]
    Shape { split: &'static str, message: String },

    #[error("invalid fit settings: {0}")]
    Settings(String),

    #[error("{split} split is empty")]
    EmptySplit { split: &'static str },

    #[error("{phase} loss became non-finite ({loss}) in epoch {epoch}")]
    NonFiniteLoss {
        phase: &'static str,
        epoch: usize,
        loss: f64,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot record weights at '{path}': {message}")]
    Record { path: PathBuf, message: String },
}

impl TrainError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrainError::Io {
            path: path.into(),
            source,
        }
    }
}
