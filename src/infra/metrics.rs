// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// The file is truncated when a run starts, so rerunning with the
// same label replaces the old log instead of appending to it:
//
//   epoch,accuracy,loss,val_accuracy,val_loss
//   0,0.612500,0.671204,0.640000,0.655931
//   1,0.688750,0.602118,0.700000,0.611480
//   ...
//
// Epochs are 0-based. The header is written exactly once per run.

use burn::prelude::*;
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::domain::error::TrainError;
use crate::ml::{
    model::AlarmClassifier,
    policy::{Control, EpochMetrics, EpochPolicy},
};

pub const CSV_HEADER: &str = "epoch,accuracy,loss,val_accuracy,val_loss";

/// Appends one row per completed epoch to a fresh CSV file.
#[derive(Debug)]
pub struct CsvLogger {
    csv_path: PathBuf,
}

impl CsvLogger {
    /// Truncate (or create) the log and write the header.
    pub fn create(csv_path: impl Into<PathBuf>) -> Result<Self, TrainError> {
        let csv_path = csv_path.into();
        let mut f = File::create(&csv_path).map_err(|e| TrainError::io(&csv_path, e))?;
        writeln!(f, "{CSV_HEADER}").map_err(|e| TrainError::io(&csv_path, e))?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&mut self, m: &EpochMetrics) -> Result<(), TrainError> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| TrainError::io(&self.csv_path, e))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.accuracy, m.loss, m.val_accuracy, m.val_loss,
        )
        .map_err(|e| TrainError::io(&self.csv_path, e))?;

        tracing::debug!(
            "Logged epoch {} metrics: loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.loss,
            m.val_loss,
        );
        Ok(())
    }
}

impl<B: Backend> EpochPolicy<B> for CsvLogger {
    fn on_epoch_end(
        &mut self,
        metrics: &EpochMetrics,
        _model: &AlarmClassifier<B>,
    ) -> Result<Control, TrainError> {
        self.log(metrics)?;
        Ok(Control::Continue)
    }
}
