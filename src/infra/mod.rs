// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Everything a training run leaves on disk:
//
//   checkpoint.rs - artifact names per label, weight records
//                   (CompactRecorder) and the classifier JSON;
//                   WeightCheckpoint epoch policy
//
//   metrics.rs    - per-epoch CSV log; CsvLogger epoch policy
//
// Both policies are driven by ml::trainer after each epoch.

/// Weights, artifact paths and classifier config persistence
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
