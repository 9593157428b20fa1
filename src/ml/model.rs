use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid, softmax},
};

use crate::data::batcher::AlarmBatch;
use crate::domain::{
    error::ConfigError,
    layer_spec::{ClassifierConfig, ImagePlan, InputMode, SamePadding, StageKind, StagePlan},
};
use crate::ml::session::Session;

/// Probabilities are clipped to [EPS, 1 - EPS] before taking logs.
pub const PROB_EPSILON: f64 = 1e-7;

/// Assemble a classifier from its declarative description.
///
/// The whole config is validated first; on error no parameter has
/// been allocated.
pub fn build<B: Backend>(
    config: &ClassifierConfig,
    session: &Session<B>,
) -> Result<AlarmClassifier<B>, ConfigError> {
    let plan = config.image_plan()?;
    let device = session.device();

    let mut width = config.feature_dim;
    let mut dense = Vec::with_capacity(config.dense_widths.len());
    for &units in &config.dense_widths {
        dense.push(DenseStage::new(width, units, config.dropout, device));
        width = units;
    }

    let image = match (&config.imagery, plan) {
        (Some(imagery), Some(plan)) => Some(ImageBranch::new(
            imagery.image.shape(),
            &plan,
            width,
            config.dropout,
            device,
        )),
        _ => None,
    };

    // Dual input concatenates two branches of equal width.
    let output_in = if image.is_some() { 2 * width } else { width };
    let output = LinearConfig::new(output_in, config.mode().output_units()).init(device);

    let model = AlarmClassifier {
        dense,
        image,
        output,
        feature_dim: config.feature_dim,
    };
    tracing::info!(
        "Built {} classifier: {} dense stages, {} image stages, {} parameters",
        model.mode().name(),
        model.dense_stage_count(),
        model.image_stage_count(),
        model.num_params(),
    );
    Ok(model)
}

// ─── Feature branch ──────────────────────────────────────────────────────────
/// dense -> relu -> dropout
#[derive(Module, Debug)]
pub struct DenseStage<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> DenseStage<B> {
    fn new(d_input: usize, d_output: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(d_input, d_output).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.dropout.forward(relu(self.linear.forward(x)))
    }
}

// ─── Image branch ────────────────────────────────────────────────────────────
/// pad -> conv -> relu -> dropout, for maintain and downsample stages.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    dropout: Dropout,
    padding: Ignored<SamePadding>,
}

/// pad with -inf -> 2x2 max pool, so padding never wins a window.
#[derive(Module, Clone, Debug)]
pub struct PoolBlock {
    pool: MaxPool2d,
    padding: Ignored<SamePadding>,
}

#[derive(Module, Debug)]
pub enum ImageStage<B: Backend> {
    Conv(ConvBlock<B>),
    Pool(PoolBlock),
}

impl<B: Backend> ImageStage<B> {
    fn from_plan(plan: &StagePlan, dropout: f64, device: &B::Device) -> Self {
        // burn pads symmetrically, so the padding is applied by hand
        // and the layers themselves run unpadded.
        let padding = Ignored(plan.padding);
        match plan.kind {
            StageKind::Maintain | StageKind::Downsample => ImageStage::Conv(ConvBlock {
                conv: Conv2dConfig::new(
                    [plan.in_channels, plan.out_channels],
                    [plan.kernel, plan.kernel],
                )
                .with_stride([plan.stride, plan.stride])
                .with_padding(PaddingConfig2d::Valid)
                .init(device),
                dropout: DropoutConfig::new(dropout).init(),
                padding,
            }),
            StageKind::Pool => ImageStage::Pool(PoolBlock {
                pool: MaxPool2dConfig::new([plan.kernel, plan.kernel])
                    .with_strides([plan.stride, plan.stride])
                    .with_padding(PaddingConfig2d::Valid)
                    .init(),
                padding,
            }),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            ImageStage::Conv(block) => {
                let x = pad_same(x, &block.padding, 0.0);
                block.dropout.forward(relu(block.conv.forward(x)))
            }
            ImageStage::Pool(block) => {
                block.pool.forward(pad_same(x, &block.padding, f32::NEG_INFINITY))
            }
        }
    }

    pub fn is_pool(&self) -> bool {
        matches!(self, ImageStage::Pool(_))
    }
}

fn pad_same<B: Backend>(x: Tensor<B, 4>, padding: &SamePadding, value: f32) -> Tensor<B, 4> {
    if padding.is_zero() {
        return x;
    }
    x.pad((padding.left, padding.right, padding.top, padding.bottom), value)
}

/// Convolution stack, flatten, then a linear "compress" layer that
/// projects to the feature branch width.
#[derive(Module, Debug)]
pub struct ImageBranch<B: Backend> {
    stages: Vec<ImageStage<B>>,
    compress: Linear<B>,
    channels: usize,
    height: usize,
    width: usize,
}

impl<B: Backend> ImageBranch<B> {
    fn new(
        input_shape: [usize; 3],
        plan: &ImagePlan,
        d_output: usize,
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        let stages = plan
            .stages
            .iter()
            .map(|stage| ImageStage::from_plan(stage, dropout, device))
            .collect();
        let [channels, height, width] = input_shape;
        Self {
            stages,
            compress: LinearConfig::new(plan.flattened_width(), d_output).init(device),
            channels,
            height,
            width,
        }
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for stage in &self.stages {
            x = stage.forward(x);
        }
        let [batch_size, c, h, w] = x.dims();
        self.compress.forward(x.reshape([batch_size, c * h * w]))
    }
}

// ─── Classifier ──────────────────────────────────────────────────────────────
/// TP/FP classifier with an optional image branch.
///
/// * feature-only: `[N, 1]` sigmoid output, P(TP)
/// * feature+imagery: `[N, 2]` softmax output, index 0 = FP, 1 = TP
#[derive(Module, Debug)]
pub struct AlarmClassifier<B: Backend> {
    dense: Vec<DenseStage<B>>,
    image: Option<ImageBranch<B>>,
    output: Linear<B>,
    feature_dim: usize,
}

impl<B: Backend> AlarmClassifier<B> {
    /// Class probabilities for a batch.
    ///
    /// # Panics
    /// Panics if `images` is present for a feature-only model or absent
    /// for a dual-input model. The training driver checks this before
    /// the first batch.
    pub fn forward(&self, features: Tensor<B, 2>, images: Option<Tensor<B, 4>>) -> Tensor<B, 2> {
        let mut x = features;
        for stage in &self.dense {
            x = stage.forward(x);
        }

        match (&self.image, images) {
            (None, None) => sigmoid(self.output.forward(x)),
            (Some(branch), Some(images)) => {
                let b = branch.forward(images);
                softmax(self.output.forward(Tensor::cat(vec![x, b], 1)), 1)
            }
            (None, Some(_)) => panic!("feature-only classifier was given an image batch"),
            (Some(_), None) => panic!("dual-input classifier needs an image batch"),
        }
    }

    /// Forward pass plus binary cross-entropy against the batch labels.
    pub fn forward_classification(&self, batch: AlarmBatch<B>) -> ClassificationStep<B> {
        let probabilities = self.forward(batch.features, batch.images);
        let targets = match self.mode() {
            InputMode::Features => batch.targets,
            // One-hot [FP, TP] to line up with the two softmax units.
            InputMode::FeaturesAndImagery => {
                Tensor::cat(vec![batch.targets.clone().neg() + 1.0, batch.targets], 1)
            }
        };
        let loss = binary_cross_entropy(probabilities.clone(), targets);
        ClassificationStep {
            loss,
            probabilities,
            labels: batch.labels,
        }
    }

    pub fn mode(&self) -> InputMode {
        match self.image {
            Some(_) => InputMode::FeaturesAndImagery,
            None => InputMode::Features,
        }
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// `[C, H, W]` the image branch expects, if there is one.
    pub fn image_shape(&self) -> Option<[usize; 3]> {
        self.image
            .as_ref()
            .map(|branch| [branch.channels, branch.height, branch.width])
    }

    /// Hidden dense stages of the feature branch (output layer excluded).
    pub fn dense_stage_count(&self) -> usize {
        self.dense.len()
    }

    /// Dense layers on the feature path: hidden stages plus the output layer.
    pub fn dense_layer_count(&self) -> usize {
        self.dense.len() + 1
    }

    pub fn image_stage_count(&self) -> usize {
        self.image.as_ref().map_or(0, |branch| branch.stages.len())
    }

    pub fn pool_stage_count(&self) -> usize {
        self.image.as_ref().map_or(0, |branch| {
            branch.stages.iter().filter(|stage| stage.is_pool()).count()
        })
    }

    pub fn output_units(&self) -> usize {
        self.output.weight.val().dims()[1]
    }
}

// ─── Loss / accuracy ─────────────────────────────────────────────────────────
pub struct ClassificationStep<B: Backend> {
    pub loss: Tensor<B, 1>,
    pub probabilities: Tensor<B, 2>,
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> ClassificationStep<B> {
    pub fn batch_size(&self) -> usize {
        self.labels.dims()[0]
    }

    /// Predicted class per row: threshold 0.5 for one output unit,
    /// argmax for two.
    pub fn predictions(&self) -> Tensor<B, 1, Int> {
        let [batch_size, units] = self.probabilities.dims();
        let predicted = if units == 1 {
            self.probabilities.clone().greater_elem(0.5).int()
        } else {
            self.probabilities.clone().argmax(1)
        };
        predicted.reshape([batch_size])
    }

    pub fn correct(&self) -> usize {
        let hits: i64 = self
            .predictions()
            .equal(self.labels.clone())
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        hits as usize
    }
}

/// Mean binary cross-entropy over every output unit.
pub fn binary_cross_entropy<B: Backend>(
    probabilities: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let p = probabilities.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
    let positive = targets.clone() * p.clone().log();
    let negative = (targets.neg() + 1.0) * (p.neg() + 1.0).log();
    (positive + negative).neg().mean()
}
