// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Re-scores a finished run on one split:
//
//   Step 1: Read classifier{label}.json   (Layer 6 - infra)
//   Step 2: Rebuild the same model        (Layer 5 - ml)
//   Step 3: Load weights{label}.mpk       (Layer 6 - infra)
//   Step 4: Load the split and evaluate   (Layer 4 + 5)
//
// No autodiff needed; runs on a plain backend.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::PathBuf;

use crate::data::{dataset::SplitName, loader::NpySplitLoader};
use crate::domain::traits::SplitSource;
use crate::infra::checkpoint::{load_weights, RunArtifacts};
use crate::ml::{
    model::build,
    session::{Session, DEFAULT_SEED},
    trainer::{evaluate, Evaluation},
};

pub struct EvaluateUseCase {
    data_dir: PathBuf,
    artifacts: RunArtifacts,
    split: SplitName,
    batch_size: usize,
}

impl EvaluateUseCase {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        label: impl Into<String>,
        split: SplitName,
        batch_size: usize,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            artifacts: RunArtifacts::new(output_dir, label),
            split,
            batch_size,
        }
    }

    pub fn execute<B: Backend>(&self, device: B::Device) -> Result<Evaluation> {
        let classifier = self.artifacts.load_config()?;
        let session = Session::<B>::new(device, DEFAULT_SEED);
        let model = build(&classifier, &session)?;

        let weights = self.artifacts.weights();
        let model = load_weights(model, &weights, session.device()).with_context(|| {
            format!(
                "Cannot load weights for label '{}'. Have you run 'train' first?",
                self.artifacts.label()
            )
        })?;

        let dataset = NpySplitLoader::new(&self.data_dir)
            .load_split(self.split, classifier.mode())
            .with_context(|| format!("Cannot load {} split", self.split))?;

        let result = evaluate(&model, &dataset, self.batch_size)?;
        tracing::info!(
            "{} split: loss={:.4}, accuracy={:.1}% over {} samples",
            self.split,
            result.loss,
            result.accuracy * 100.0,
            result.samples,
        );
        Ok(result)
    }
}
