// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates one training run:
//
//   Step 1: Parse the convolution tags    (Layer 3 - domain)
//   Step 2: Load train/val/test splits    (Layer 4 - data)
//   Step 3: Derive the ClassifierConfig   (Layer 3 - domain)
//   Step 4: Build the model               (Layer 5 - ml)
//   Step 5: Fit + test evaluation         (Layer 5 - ml)
//   Step 6: Save the classifier config    (Layer 6 - infra)
//
// Feature width and image height/width come from the data, so
// the command line only describes the layers.

use anyhow::{bail, Context, Result};
use burn::tensor::backend::AutodiffBackend;
use std::path::PathBuf;

use crate::data::loader::NpySplitLoader;
use crate::domain::{
    layer_spec::{
        ClassifierConfig, ConvSpec, ImageSpec, InputMode, CHANNELS_PER_FRAME, DEFAULT_DROPOUT,
        DEFAULT_TIMESTAMPS,
    },
    traits::SplitSource,
};
use crate::infra::checkpoint::RunArtifacts;
use crate::ml::{
    model::build,
    session::{Session, DEFAULT_SEED},
    trainer::{train_with, FitSettings, TrainReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub label: String,
    pub dense: Vec<usize>,
    /// Empty for a feature-only classifier.
    pub stages: Vec<String>,
    pub filters: Vec<usize>,
    pub kernels: Vec<usize>,
    pub timestamps: usize,
    pub dropout: f64,
    pub seed: u64,
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub patience: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let fit = FitSettings::default();
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            label: String::new(),
            dense: vec![50, 50, 25],
            stages: Vec::new(),
            filters: Vec::new(),
            kernels: Vec::new(),
            timestamps: DEFAULT_TIMESTAMPS,
            dropout: DEFAULT_DROPOUT,
            seed: DEFAULT_SEED,
            epochs: fit.num_epochs,
            batch_size: fit.batch_size,
            lr: fit.learning_rate,
            patience: fit.patience,
        }
    }
}

impl TrainConfig {
    /// Imagery is enabled by `stages`; filters or kernels alone are
    /// rejected rather than silently ignored.
    pub fn mode(&self) -> Result<InputMode> {
        if !self.stages.is_empty() {
            return Ok(InputMode::FeaturesAndImagery);
        }
        if !self.filters.is_empty() || !self.kernels.is_empty() {
            bail!("--filters/--kernels given without --stages; add --stages to train with imagery");
        }
        Ok(InputMode::Features)
    }

    pub fn fit_settings(&self) -> FitSettings {
        FitSettings::new()
            .with_num_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_learning_rate(self.lr)
            .with_patience(self.patience)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline on backend `B`.
    pub fn execute<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainReport> {
        let cfg = &self.config;
        let mode = cfg.mode()?;

        // ── Step 1: Parse stage tags before touching any data ────────────────
        let conv = match mode {
            InputMode::Features => None,
            InputMode::FeaturesAndImagery => Some(ConvSpec::parse(
                cfg.stages.as_slice(),
                cfg.filters.clone(),
                cfg.kernels.clone(),
            )?),
        };

        // ── Step 2: Load the pre-split partitions ────────────────────────────
        tracing::info!("Loading {} splits from '{}'", mode.name(), cfg.data_dir.display());
        let loader = NpySplitLoader::new(&cfg.data_dir);
        let splits = loader
            .load_splits(mode)
            .with_context(|| format!("Cannot load splits from '{}'", cfg.data_dir.display()))?;

        // ── Step 3: Describe the classifier ──────────────────────────────────
        let mut classifier = ClassifierConfig::features_only(splits.train.feature_dim(), cfg.dense.clone())
            .with_dropout(cfg.dropout);
        if let Some(conv) = conv {
            let image = image_spec(splits.train.image_shape(), cfg.timestamps)?;
            classifier = classifier.with_imagery(image, conv);
        }

        // ── Step 4: Build ────────────────────────────────────────────────────
        let session = Session::<B>::new(device, cfg.seed);
        let model = build(&classifier, &session)?;

        // ── Step 5: Fit and evaluate ─────────────────────────────────────────
        let trained = train_with(
            &session,
            model,
            &cfg.output_dir,
            &cfg.label,
            splits,
            mode,
            &cfg.fit_settings(),
        )?;

        // ── Step 6: Keep the architecture next to the weights ────────────────
        RunArtifacts::new(&cfg.output_dir, &cfg.label).save_config(&classifier)?;

        Ok(trained.report)
    }
}

/// Image spec from the `[C, H, W]` found on disk; C must be
/// `3 x timestamps`.
fn image_spec(shape: Option<[usize; 3]>, timestamps: usize) -> Result<ImageSpec> {
    let Some([channels, height, width]) = shape else {
        bail!("imagery requested but the training split has no images");
    };
    let image = ImageSpec::new(height, width).with_timestamps(timestamps);
    if image.channels() != channels {
        bail!(
            "images have {} channels, expected {} ({} timestamps x {} per frame)",
            channels,
            image.channels(),
            timestamps,
            CHANNELS_PER_FRAME,
        );
    }
    Ok(image)
}
