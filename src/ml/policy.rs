// ============================================================
// Layer 5 - Epoch Policies
// ============================================================
// Hooks the training driver runs after every completed epoch.
// The driver holds each policy in its own named field and calls
// them in a fixed order:
//
//   1. WeightCheckpoint  (infra::checkpoint) overwrite weights
//   2. CsvLogger         (infra::metrics)    append one CSV row
//   3. EarlyStopping     (here)              decide continue/stop
//
// Every policy sees the same EpochMetrics for that epoch.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::error::TrainError;
use crate::ml::model::AlarmClassifier;

/// Aggregated results of one epoch. `epoch` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    /// Training accuracy, fraction in [0, 1]
    pub accuracy: f64,
    /// Mean training loss over batches
    pub loss: f64,
    pub val_accuracy: f64,
    pub val_loss: f64,
}

/// What the driver should do after a policy ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
}

pub trait EpochPolicy<B: Backend> {
    fn on_epoch_end(
        &mut self,
        metrics: &EpochMetrics,
        model: &AlarmClassifier<B>,
    ) -> Result<Control, TrainError>;
}

// ─── Early stopping ──────────────────────────────────────────────────────────
/// Stops once validation loss has failed to improve on the best value
/// seen for `patience` consecutive epochs. An epoch improves only if
/// `val_loss` is strictly below the best. Weights are never rolled back.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: f64,
    wait: usize,
    stopped_epoch: Option<usize>,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: f64::INFINITY,
            wait: 0,
            stopped_epoch: None,
        }
    }

    /// Feed one epoch's validation loss.
    pub fn observe(&mut self, epoch: usize, val_loss: f64) -> Control {
        if val_loss < self.best {
            self.best = val_loss;
            self.wait = 0;
            return Control::Continue;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            self.stopped_epoch = Some(epoch);
            tracing::warn!(
                "Early stopping at epoch {}: val_loss has not improved on {:.6} for {} epochs",
                epoch,
                self.best,
                self.wait,
            );
            Control::Stop
        } else {
            Control::Continue
        }
    }

    /// Epoch at which training was stopped, if it was.
    pub fn stopped_epoch(&self) -> Option<usize> {
        self.stopped_epoch
    }
}

impl<B: Backend> EpochPolicy<B> for EarlyStopping {
    fn on_epoch_end(
        &mut self,
        metrics: &EpochMetrics,
        _model: &AlarmClassifier<B>,
    ) -> Result<Control, TrainError> {
        Ok(self.observe(metrics.epoch, metrics.val_loss))
    }
}
