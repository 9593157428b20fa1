// ============================================================
// Layer 5 - Training Driver
// ============================================================
// Fits an assembled classifier on pre-split data, then scores it
// on the test split.
//
//   - Training runs on the autodiff backend B
//   - model.valid() gives the same model on B::InnerBackend with
//     dropout switched off; validation and test use that
//   - The train loader reshuffles every epoch from the session seed
//   - After each epoch: checkpoint -> CSV row -> early stopping
//
// Optimiser is AMSGrad (see optim.rs), loss is binary
// cross-entropy on clipped probabilities (see model.rs).

use burn::{
    config::Config,
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::data::{
    batcher::{AlarmBatch, AlarmBatcher},
    dataset::{AlarmDataset, Splits},
};
use crate::domain::{error::TrainError, layer_spec::InputMode};
use crate::infra::{
    checkpoint::{RunArtifacts, WeightCheckpoint},
    metrics::CsvLogger,
};
use crate::ml::{
    model::AlarmClassifier,
    optim::AmsGradConfig,
    policy::{Control, EarlyStopping, EpochMetrics, EpochPolicy},
    session::Session,
};

#[derive(Config, Debug)]
pub struct FitSettings {
    #[config(default = 50)]
    pub num_epochs: usize,
    #[config(default = 64)]
    pub batch_size: usize,
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    /// Epochs without validation improvement before stopping.
    #[config(default = 5)]
    pub patience: usize,
    #[config(default = "AmsGradConfig::new()")]
    pub optimizer: AmsGradConfig,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl FitSettings {
    fn validate(&self) -> Result<(), TrainError> {
        if self.batch_size == 0 {
            return Err(TrainError::Settings("batch size must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::Settings(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Loss and accuracy over one whole dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
    pub samples: usize,
}

#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Wall-clock time of the epoch loop only.
    pub elapsed: Duration,
    pub test: Evaluation,
    pub epochs_run: usize,
    pub stopped_early: bool,
    pub history: Vec<EpochMetrics>,
}

pub struct TrainedClassifier<B: AutodiffBackend> {
    pub model: AlarmClassifier<B>,
    pub report: TrainReport,
}

/// Train with the default settings: 50 epochs, batch 64, lr 0.001,
/// patience 5.
pub fn train<B: AutodiffBackend>(
    session: &Session<B>,
    model: AlarmClassifier<B>,
    output_dir: &Path,
    label: &str,
    splits: Splits,
    mode: InputMode,
) -> Result<TrainedClassifier<B>, TrainError> {
    train_with(session, model, output_dir, label, splits, mode, &FitSettings::default())
}

pub fn train_with<B: AutodiffBackend>(
    session: &Session<B>,
    model: AlarmClassifier<B>,
    output_dir: &Path,
    label: &str,
    splits: Splits,
    mode: InputMode,
    settings: &FitSettings,
) -> Result<TrainedClassifier<B>, TrainError> {
    // ── Checks before anything touches the disk ──────────────────────────────
    settings.validate()?;
    check_inputs(&model, &splits, mode)?;

    let artifacts = RunArtifacts::new(output_dir, label);
    artifacts.ensure_dir()?;
    let mut hooks = EpochHooks {
        checkpoint: WeightCheckpoint::new(artifacts.weights()),
        csv: CsvLogger::create(artifacts.loss_log())?,
        early_stopping: EarlyStopping::new(settings.patience),
    };

    let device = session.device().clone();
    let Splits {
        train,
        validation,
        test,
    } = splits;
    let train_samples = train.sample_count();
    let batcher = AlarmBatcher::new(model.image_shape());

    // ── Data loaders ─────────────────────────────────────────────────────────
    let train_loader: Arc<dyn DataLoader<B, AlarmBatch<B>>> = DataLoaderBuilder::new(batcher.clone())
        .batch_size(settings.batch_size)
        .shuffle(session.seed())
        .num_workers(1)
        .set_device(device.clone())
        .build(train);
    let val_loader = eval_loader::<B::InnerBackend>(&batcher, validation, settings.batch_size, &device);

    let mut optim = settings.optimizer.init::<B, AlarmClassifier<B>>();
    let mut model = model;
    let mut history = Vec::with_capacity(settings.num_epochs);

    tracing::info!(
        "Training {} classifier on {} samples for up to {} epochs (batch {}, lr {})",
        mode.name(),
        train_samples,
        settings.num_epochs,
        settings.batch_size,
        settings.learning_rate,
    );

    // ── Epoch loop ───────────────────────────────────────────────────────────
    let started = Instant::now();
    for epoch in 0..settings.num_epochs {
        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        for batch in train_loader.iter() {
            let step = model.forward_classification(batch);
            let batch_size = step.batch_size();
            let loss_val: f64 = step.loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val * batch_size as f64;
            correct += step.correct();
            seen += batch_size;

            let grads = step.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(settings.learning_rate, model, grads);
        }

        let loss = loss_sum / seen as f64;
        if !loss.is_finite() {
            return Err(TrainError::NonFiniteLoss {
                phase: "training",
                epoch,
                loss,
            });
        }

        let val = run_evaluation(&model.valid(), val_loader.as_ref());
        if !val.loss.is_finite() {
            return Err(TrainError::NonFiniteLoss {
                phase: "validation",
                epoch,
                loss: val.loss,
            });
        }

        let metrics = EpochMetrics {
            epoch,
            accuracy: correct as f64 / seen as f64,
            loss,
            val_accuracy: val.accuracy,
            val_loss: val.loss,
        };
        tracing::info!(
            "Epoch {:>3}/{} | loss={:.4} | acc={:.1}% | val_loss={:.4} | val_acc={:.1}%",
            epoch + 1,
            settings.num_epochs,
            metrics.loss,
            metrics.accuracy * 100.0,
            metrics.val_loss,
            metrics.val_accuracy * 100.0,
        );
        history.push(metrics);

        if hooks.end_epoch(&metrics, &model)? == Control::Stop {
            break;
        }
    }
    let elapsed = started.elapsed();
    let stopped_early = hooks.early_stopping.stopped_epoch().is_some();

    // ── Test evaluation ──────────────────────────────────────────────────────
    let test_loader = eval_loader::<B::InnerBackend>(&batcher, test, settings.batch_size, &device);
    let test = run_evaluation(&model.valid(), test_loader.as_ref());
    tracing::info!(
        "Training complete in {:.2?}: {} epochs{}, test loss={:.4}, test accuracy={:.1}%",
        elapsed,
        history.len(),
        if stopped_early { " (stopped early)" } else { "" },
        test.loss,
        test.accuracy * 100.0,
    );

    Ok(TrainedClassifier {
        model,
        report: TrainReport {
            elapsed,
            test,
            epochs_run: history.len(),
            stopped_early,
            history,
        },
    })
}

/// Score a model on one dataset with dropout off.
pub fn evaluate<B: Backend>(
    model: &AlarmClassifier<B>,
    dataset: &AlarmDataset,
    batch_size: usize,
) -> Result<Evaluation, TrainError> {
    if batch_size == 0 {
        return Err(TrainError::Settings("batch size must be positive".into()));
    }
    check_split(model, "evaluation", dataset)?;

    let device = model.devices().into_iter().next().unwrap_or_default();
    let batcher = AlarmBatcher::new(model.image_shape());
    let loader = eval_loader::<B>(&batcher, dataset.clone(), batch_size, &device);
    Ok(run_evaluation(model, loader.as_ref()))
}

// ─── Epoch hooks ─────────────────────────────────────────────────────────────
/// The three per-epoch policies, called in declaration order.
struct EpochHooks {
    checkpoint: WeightCheckpoint,
    csv: CsvLogger,
    early_stopping: EarlyStopping,
}

impl EpochHooks {
    fn end_epoch<B: Backend>(
        &mut self,
        metrics: &EpochMetrics,
        model: &AlarmClassifier<B>,
    ) -> Result<Control, TrainError> {
        self.checkpoint.on_epoch_end(metrics, model)?;
        self.csv.on_epoch_end(metrics, model)?;
        self.early_stopping.on_epoch_end(metrics, model)
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────
fn eval_loader<B: Backend>(
    batcher: &AlarmBatcher,
    dataset: AlarmDataset,
    batch_size: usize,
    device: &B::Device,
) -> Arc<dyn DataLoader<B, AlarmBatch<B>>> {
    DataLoaderBuilder::new(batcher.clone())
        .batch_size(batch_size)
        .num_workers(1)
        .set_device(device.clone())
        .build(dataset)
}

fn run_evaluation<B: Backend>(
    model: &AlarmClassifier<B>,
    loader: &dyn DataLoader<B, AlarmBatch<B>>,
) -> Evaluation {
    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;
    let mut samples = 0usize;

    for batch in loader.iter() {
        let step = model.forward_classification(batch);
        let batch_size = step.batch_size();
        let batch_loss: f64 = step.loss.clone().into_scalar().elem::<f64>();
        loss_sum += batch_loss * batch_size as f64;
        correct += step.correct();
        samples += batch_size;
    }

    if samples == 0 {
        return Evaluation {
            loss: f64::NAN,
            accuracy: 0.0,
            samples,
        };
    }
    Evaluation {
        loss: loss_sum / samples as f64,
        accuracy: correct as f64 / samples as f64,
        samples,
    }
}

fn check_inputs<B: Backend>(
    model: &AlarmClassifier<B>,
    splits: &Splits,
    mode: InputMode,
) -> Result<(), TrainError> {
    if model.mode() != mode {
        return Err(TrainError::ModeMismatch {
            model: model.mode().name(),
            requested: mode.name(),
        });
    }
    for (name, dataset) in splits.iter() {
        check_split(model, name.as_str(), dataset)?;
    }
    Ok(())
}

fn check_split<B: Backend>(
    model: &AlarmClassifier<B>,
    split: &'static str,
    dataset: &AlarmDataset,
) -> Result<(), TrainError> {
    if dataset.sample_count() == 0 {
        return Err(TrainError::EmptySplit { split });
    }
    if dataset.feature_dim() != model.feature_dim() {
        return Err(TrainError::Shape {
            split,
            message: format!(
                "{} features per sample, model expects {}",
                dataset.feature_dim(),
                model.feature_dim()
            ),
        });
    }
    let message = match (model.image_shape(), dataset.image_shape()) {
        (None, None) => return Ok(()),
        (Some(expected), Some(found)) if expected == found => return Ok(()),
        (Some(expected), Some(found)) => {
            format!("images are {found:?} (C, H, W), model expects {expected:?}")
        }
        (Some(_), None) => "imagery is missing but the model has an image branch".to_string(),
        (None, Some(_)) => "carries imagery but the model is feature-only".to_string(),
    };
    Err(TrainError::Shape { split, message })
}
