// ============================================================
// Layer 3 - Core Traits
// ============================================================
// The application layer loads splits through `SplitSource`
// so it never depends on how the partitions are stored.
// `NpySplitLoader` is the on-disk implementation; tests use
// in-memory datasets directly.

use crate::data::dataset::{AlarmDataset, SplitName, Splits};
use crate::domain::{error::DataError, layer_spec::InputMode};

/// Anything that can produce one pre-split partition.
pub trait SplitSource {
    /// Load a single partition. Imagery is loaded only in
    /// `InputMode::FeaturesAndImagery`.
    fn load_split(&self, split: SplitName, mode: InputMode) -> Result<AlarmDataset, DataError>;

    /// Load train, validation and test together.
    fn load_splits(&self, mode: InputMode) -> Result<Splits, DataError> {
        Ok(Splits {
            train: self.load_split(SplitName::Train, mode)?,
            validation: self.load_split(SplitName::Validation, mode)?,
            test: self.load_split(SplitName::Test, mode)?,
        })
    }
}
