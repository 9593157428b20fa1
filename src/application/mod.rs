// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor code, no printing.
// Each use case wires the data, ml and infra layers together
// for one command and is generic over the burn backend, which
// the CLI picks.

// Load splits, build, train, persist
pub mod train_use_case;

// Rebuild a trained classifier and score it on one split
pub mod evaluate_use_case;
