// ============================================================
// Layer 5 - ML Layer (Burn)
// ============================================================
// Everything that builds, trains or runs the network.
//
//   session.rs  - device + seed, passed into build and train
//   model.rs    - AlarmClassifier: feature branch, optional
//                 image branch, output head, BCE loss
//   optim.rs    - AMSGrad on top of burn's SimpleOptimizer
//   policy.rs   - per-epoch hooks and early stopping
//   trainer.rs  - epoch loop, validation, test evaluation

/// Explicit execution context
pub mod session;

/// Classifier architecture and its builder
pub mod model;

/// AMSGrad optimiser
pub mod optim;

/// Epoch policies
pub mod policy;

/// Training driver and evaluation
pub mod trainer;
