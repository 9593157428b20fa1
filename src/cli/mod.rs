// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, picks the burn backend and hands
// off to Layer 2. Two commands:
//   1. `train`    - fit a classifier and report test metrics
//   2. `evaluate` - reload a trained classifier and score a split

pub mod commands;

use anyhow::Result;
use burn::backend::{
    ndarray::NdArrayDevice,
    wgpu::WgpuDevice,
    Autodiff, NdArray, Wgpu,
};
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::application::{
    evaluate_use_case::EvaluateUseCase,
    train_use_case::{TrainConfig, TrainUseCase},
};

type CpuBackend = NdArray;
type GpuBackend = Wgpu;

#[derive(Parser, Debug)]
#[command(
    name = "tpfp-classifier",
    version,
    about = "Train and evaluate fire-alarm TP/FP classifiers on sensor features and CCTV frames."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let gpu = args.gpu;
    let use_case = TrainUseCase::new(TrainConfig::from(args));

    let report = if gpu {
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        use_case.execute::<Autodiff<GpuBackend>>(device)?
    } else {
        use_case.execute::<Autodiff<CpuBackend>>(NdArrayDevice::Cpu)?
    };

    println!(
        "Trained for {} epochs{} in {:.2?}",
        report.epochs_run,
        if report.stopped_early { " (early stop)" } else { "" },
        report.elapsed,
    );
    println!(
        "Test loss {:.4}, test accuracy {:.2}%",
        report.test.loss,
        report.test.accuracy * 100.0,
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let use_case = EvaluateUseCase::new(
        &args.data_dir,
        &args.output_dir,
        args.label.as_str(),
        args.split,
        args.batch_size,
    );

    let result = if args.gpu {
        use_case.execute::<GpuBackend>(WgpuDevice::default())?
    } else {
        use_case.execute::<CpuBackend>(NdArrayDevice::Cpu)?
    };

    println!(
        "{} split: loss {:.4}, accuracy {:.2}% ({} samples)",
        args.split,
        result.loss,
        result.accuracy * 100.0,
        result.samples,
    );
    Ok(())
}
