// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// From split files on disk to tensor batches:
//
//   .npy files
//       │
//       ▼
//   NpySplitLoader  → reads one partition, permutes images to CHW
//       │
//       ▼
//   AlarmDataset    → implements burn's Dataset trait
//       │
//       ▼
//   AlarmBatcher    → stacks samples into tensors
//       │
//       ▼
//   DataLoader      → feeds batches to the training driver
//
// Partitions arrive pre-split; nothing here shuffles or splits.

/// Aligned features, images and labels for one partition
pub mod dataset;

/// Implements burn's Batcher trait for alarm samples
pub mod batcher;

/// Reads train/validation/test partitions from .npy files
pub mod loader;
