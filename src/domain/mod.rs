// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types that describe the classifier and its
// failures. Nothing in here touches burn or the filesystem,
// so every rule can be unit tested without a device.

// Layer widths, stage tags, image shape, input mode
pub mod layer_spec;

// ConfigError, DataError, TrainError
pub mod error;

// Abstractions implemented by the data layer
pub mod traits;
