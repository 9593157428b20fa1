// ============================================================
// Layer 6 - Checkpoints and Run Artifacts
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// and keeps the classifier description next to them.
//
// Files for one run, all in the output directory:
//
//   weights{label}.mpk          model weights, overwritten every epoch
//   loss_v_epoch{label}         per-epoch CSV (see metrics.rs)
//   classifier{label}.json      ClassifierConfig
//
// The JSON is what lets `evaluate` rebuild the exact architecture
// before loading the weights into it; CompactRecorder refuses a
// record whose parameter layout does not match the model.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{error::TrainError, layer_spec::ClassifierConfig};
use crate::ml::{
    model::AlarmClassifier,
    policy::{Control, EpochMetrics, EpochPolicy},
};

/// File names of one labelled run inside the output directory.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    dir: PathBuf,
    label: String,
}

impl RunArtifacts {
    pub fn new(dir: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Weights path without extension; the recorder appends `.mpk`.
    pub fn weights(&self) -> PathBuf {
        self.dir.join(format!("weights{}", self.label))
    }

    /// Weights path as it appears on disk.
    pub fn weights_file(&self) -> PathBuf {
        self.weights().with_extension("mpk")
    }

    pub fn loss_log(&self) -> PathBuf {
        self.dir.join(format!("loss_v_epoch{}", self.label))
    }

    pub fn classifier_config(&self) -> PathBuf {
        self.dir.join(format!("classifier{}.json", self.label))
    }

    /// Create the output directory (and parents) if it is missing.
    pub fn ensure_dir(&self) -> Result<(), TrainError> {
        fs::create_dir_all(&self.dir).map_err(|e| TrainError::io(&self.dir, e))
    }

    pub fn save_config(&self, cfg: &ClassifierConfig) -> Result<()> {
        let path = self.classifier_config();
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write classifier config to '{}'", path.display()))?;
        tracing::debug!("Saved classifier config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ClassifierConfig> {
        let path = self.classifier_config();
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read classifier config from '{}'. \
                 Make sure you have run 'train' with label '{}' first.",
                path.display(),
                self.label,
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed classifier config '{}'", path.display()))
    }
}

/// Overwrites the weights file after every epoch, whatever the metrics.
#[derive(Debug, Clone)]
pub struct WeightCheckpoint {
    path: PathBuf,
}

impl WeightCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save<B: Backend>(&mut self, model: &AlarmClassifier<B>) -> Result<(), TrainError> {
        save_weights(model, &self.path)
    }
}

impl<B: Backend> EpochPolicy<B> for WeightCheckpoint {
    fn on_epoch_end(
        &mut self,
        metrics: &EpochMetrics,
        model: &AlarmClassifier<B>,
    ) -> Result<Control, TrainError> {
        self.save(model)?;
        tracing::debug!("Checkpoint saved for epoch {}", metrics.epoch);
        Ok(Control::Continue)
    }
}

/// Write the model's parameters to `path` (extension added by the recorder).
pub fn save_weights<B: Backend>(model: &AlarmClassifier<B>, path: &Path) -> Result<(), TrainError> {
    CompactRecorder::new()
        .record(model.clone().into_record(), path.to_path_buf())
        .map_err(|e| TrainError::Record {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Restore parameters saved by [`save_weights`] into a model of the
/// same architecture.
pub fn load_weights<B: Backend>(
    model: AlarmClassifier<B>,
    path: &Path,
    device: &B::Device,
) -> Result<AlarmClassifier<B>, TrainError> {
    let record = CompactRecorder::new()
        .load(path.to_path_buf(), device)
        .map_err(|e| TrainError::Record {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(model.load_record(record))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layer_spec::{ConvSpec, ImageSpec, StageKind};
    use crate::ml::{model::build, session::Session};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_artifact_names_carry_label() {
        let run = RunArtifacts::new("/tmp/out", "_dual");
        assert_eq!(run.weights(), PathBuf::from("/tmp/out/weights_dual"));
        assert_eq!(run.weights_file(), PathBuf::from("/tmp/out/weights_dual.mpk"));
        assert_eq!(run.loss_log(), PathBuf::from("/tmp/out/loss_v_epoch_dual"));
        assert_eq!(
            run.classifier_config(),
            PathBuf::from("/tmp/out/classifier_dual.json")
        );
    }

    #[test]
    fn test_config_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunArtifacts::new(dir.path(), "x");
        let cfg = ClassifierConfig::features_only(6, vec![8, 4]).with_imagery(
            ImageSpec::new(8, 8),
            ConvSpec::new(vec![StageKind::Maintain, StageKind::Pool], vec![4, 0], vec![3, 0]),
        );
        run.save_config(&cfg).unwrap();
        assert_eq!(run.load_config().unwrap(), cfg);
    }

    #[test]
    fn test_missing_config_mentions_label() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunArtifacts::new(dir.path(), "nope").load_config().unwrap_err();
        assert!(format!("{err:#}").contains("nope"));
    }

    #[test]
    fn test_weights_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::<TestBackend>::new(Default::default(), 7);
        let cfg = ClassifierConfig::features_only(3, vec![4]);
        let model = build(&cfg, &session).unwrap();

        let run = RunArtifacts::new(dir.path(), "w");
        let mut checkpoint = WeightCheckpoint::new(run.weights());
        checkpoint.save(&model).unwrap();
        checkpoint.save(&model).unwrap();
        assert!(run.weights_file().exists());

        let fresh = build(&cfg, &Session::<TestBackend>::new(Default::default(), 8)).unwrap();
        let restored = load_weights(fresh, &run.weights(), session.device()).unwrap();

        let x = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.2, 0.3]], session.device());
        let a: f32 = model.forward(x.clone(), None).into_scalar().elem();
        let b: f32 = restored.forward(x, None).into_scalar().elem();
        // CompactRecorder stores half precision.
        assert!((a - b).abs() < 1e-2);
    }
}
