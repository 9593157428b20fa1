// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their flags. List-valued flags take comma-separated values:
//
//   --dense 50,50,25 --stages m,d,m,p --filters 32,32,32,32

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::SplitName;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a TP/FP classifier on pre-split .npy data
    Train(TrainArgs),

    /// Score a trained classifier on one split
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding {train,validation,test}_{features,labels,images}.npy
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Where weights, the CSV log and the classifier config are written
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Suffix appended to every artifact name
    #[arg(long, default_value = "")]
    pub label: String,

    /// Hidden dense layer widths of the feature branch
    #[arg(long, value_delimiter = ',', default_value = "50,50,25")]
    pub dense: Vec<usize>,

    /// Convolution stage tags (m = maintain, d = downsample, p = pool).
    /// Leave out for a feature-only classifier.
    #[arg(long, value_delimiter = ',')]
    pub stages: Vec<String>,

    /// Filters per stage, paired with --stages
    #[arg(long, value_delimiter = ',')]
    pub filters: Vec<usize>,

    /// Square kernel size per stage, paired with --stages
    #[arg(long, value_delimiter = ',')]
    pub kernels: Vec<usize>,

    /// Capture times stacked per image (3 RGB channels each)
    #[arg(long, default_value_t = 3)]
    pub timestamps: usize,

    /// Dropout after every dense and convolution stage
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Seed for initialisation, dropout and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum number of epochs
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Epochs without validation-loss improvement before stopping
    #[arg(long, default_value_t = 5)]
    pub patience: usize,

    /// Run on the wgpu backend instead of the CPU
    #[arg(long)]
    pub gpu: bool,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir: a.data_dir,
            output_dir: a.output_dir,
            label: a.label,
            dense: a.dense,
            stages: a.stages,
            filters: a.filters,
            kernels: a.kernels,
            timestamps: a.timestamps,
            dropout: a.dropout,
            seed: a.seed,
            epochs: a.epochs,
            batch_size: a.batch_size,
            lr: a.lr,
            patience: a.patience,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Output directory of the training run
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Label the run was trained with
    #[arg(long, default_value = "")]
    pub label: String,

    /// Split to score: train, validation or test
    #[arg(long, default_value = "test")]
    pub split: SplitName,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Run on the wgpu backend instead of the CPU
    #[arg(long)]
    pub gpu: bool,
}
