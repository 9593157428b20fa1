// ============================================================
// Layer 3 - Declarative Layer Specification
// ============================================================
// Plain data describing a classifier before any tensor exists.
//
//   dense_widths  [50, 50, 25]   -> F-50-50-25 fully connected stack
//   stages        m, d, m, p     -> maintain / downsample / pool
//   filters       32, 32, 32, 32 -> paired with stages by position
//   kernel_sizes  3, 3, 3, 3     -> ignored for pool stages
//
// Validation happens here so a bad spec is rejected before the
// model builder allocates a single parameter. The builder then
// consumes `StagePlan`s, which already carry the resolved
// channel counts, strides, paddings and spatial sizes.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::ConfigError;

/// Dropout applied after every hidden stage unless overridden.
pub const DEFAULT_DROPOUT: f64 = 0.1;

/// Capture times per alarm: at trigger, +1 s, +5 s.
pub const DEFAULT_TIMESTAMPS: usize = 3;

/// Colour channels per captured frame.
pub const CHANNELS_PER_FRAME: usize = 3;

// ─── StageKind ───────────────────────────────────────────────────────────────
/// One entry of the convolutional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Stride-1 convolution, relu, dropout.
    Maintain,
    /// Stride-2 convolution, relu, dropout.
    Downsample,
    /// 2x2 max-pool with stride 2. No parameters.
    Pool,
}

impl StageKind {
    pub fn stride(self) -> usize {
        match self {
            StageKind::Maintain => 1,
            StageKind::Downsample | StageKind::Pool => 2,
        }
    }

    pub fn is_pool(self) -> bool {
        matches!(self, StageKind::Pool)
    }
}

impl FromStr for StageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "maintain" => Ok(StageKind::Maintain),
            "d" | "downsample" => Ok(StageKind::Downsample),
            "p" | "pool" => Ok(StageKind::Pool),
            _ => Err(ConfigError::UnknownStage(s.to_string())),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            StageKind::Maintain => "m",
            StageKind::Downsample => "d",
            StageKind::Pool => "p",
        };
        f.write_str(tag)
    }
}

// ─── ConvSpec ────────────────────────────────────────────────────────────────
/// The convolutional branch: three sequences paired by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvSpec {
    pub stages: Vec<StageKind>,
    pub filters: Vec<usize>,
    pub kernel_sizes: Vec<usize>,
}

impl ConvSpec {
    pub fn new(stages: Vec<StageKind>, filters: Vec<usize>, kernel_sizes: Vec<usize>) -> Self {
        Self {
            stages,
            filters,
            kernel_sizes,
        }
    }

    /// Build from textual tags such as `["m", "d", "m", "p"]`.
    /// The first unknown tag aborts with `ConfigError::UnknownStage`.
    pub fn parse<S: AsRef<str>>(
        tags: &[S],
        filters: Vec<usize>,
        kernel_sizes: Vec<usize>,
    ) -> Result<Self, ConfigError> {
        let stages = tags
            .iter()
            .map(|t| t.as_ref().parse())
            .collect::<Result<Vec<StageKind>, _>>()?;
        Ok(Self::new(stages, filters, kernel_sizes))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.len() != self.filters.len() || self.stages.len() != self.kernel_sizes.len() {
            return Err(ConfigError::LengthMismatch {
                stages: self.stages.len(),
                filters: self.filters.len(),
                kernels: self.kernel_sizes.len(),
            });
        }

        for (index, kind) in self.stages.iter().enumerate() {
            if kind.is_pool() {
                continue;
            }
            if self.filters[index] == 0 {
                return Err(ConfigError::ZeroFilters { index });
            }
            let size = self.kernel_sizes[index];
            if size == 0 {
                return Err(ConfigError::ZeroKernel { index });
            }
        }
        Ok(())
    }
}

// ─── ImageSpec ───────────────────────────────────────────────────────────────
/// Shape of one stacked CCTV sample: `timestamps` RGB frames of
/// `height` x `width`, concatenated along the channel axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub height: usize,
    pub width: usize,
    pub timestamps: usize,
}

impl ImageSpec {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            timestamps: DEFAULT_TIMESTAMPS,
        }
    }

    pub fn with_timestamps(mut self, timestamps: usize) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn channels(&self) -> usize {
        CHANNELS_PER_FRAME * self.timestamps
    }

    /// Channels-first shape `[C, H, W]` of a single sample.
    pub fn shape(&self) -> [usize; 3] {
        [self.channels(), self.height, self.width]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.height == 0 || self.width == 0 || self.timestamps == 0 {
            return Err(ConfigError::ZeroImageDim {
                height: self.height,
                width: self.width,
                timestamps: self.timestamps,
            });
        }
        Ok(())
    }
}

/// Image input plus the convolutional stack that consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageryConfig {
    pub image: ImageSpec,
    pub conv: ConvSpec,
}

// ─── InputMode ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    /// Feature vector only; one sigmoid output unit.
    Features,
    /// Feature vector plus image stack; two softmax output units.
    FeaturesAndImagery,
}

impl InputMode {
    pub fn name(self) -> &'static str {
        match self {
            InputMode::Features => "feature-only",
            InputMode::FeaturesAndImagery => "feature+imagery",
        }
    }

    pub fn output_units(self) -> usize {
        match self {
            InputMode::Features => 1,
            InputMode::FeaturesAndImagery => 2,
        }
    }
}

// ─── ClassifierConfig ────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Length of the sensor feature vector.
    pub feature_dim: usize,
    /// Output width of each hidden dense layer, in order.
    pub dense_widths: Vec<usize>,
    /// Present in dual-input mode only.
    pub imagery: Option<ImageryConfig>,
    pub dropout: f64,
}

impl ClassifierConfig {
    pub fn features_only(feature_dim: usize, dense_widths: Vec<usize>) -> Self {
        Self {
            feature_dim,
            dense_widths,
            imagery: None,
            dropout: DEFAULT_DROPOUT,
        }
    }

    pub fn with_imagery(mut self, image: ImageSpec, conv: ConvSpec) -> Self {
        self.imagery = Some(ImageryConfig { image, conv });
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn mode(&self) -> InputMode {
        match self.imagery {
            Some(_) => InputMode::FeaturesAndImagery,
            None => InputMode::Features,
        }
    }

    /// Width of the last hidden dense layer, i.e. the feature branch output.
    pub fn feature_branch_width(&self) -> usize {
        self.dense_widths.last().copied().unwrap_or(self.feature_dim)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feature_dim == 0 {
            return Err(ConfigError::ZeroFeatureDim);
        }
        if self.dense_widths.is_empty() {
            return Err(ConfigError::EmptyDenseSpec);
        }
        if let Some(index) = self.dense_widths.iter().position(|&w| w == 0) {
            return Err(ConfigError::ZeroWidth { index });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::InvalidDropout(self.dropout));
        }
        if let Some(imagery) = &self.imagery {
            imagery.image.validate()?;
            imagery.conv.validate()?;
        }
        Ok(())
    }

    /// Resolved geometry of every image stage, in order.
    /// Returns `None` in feature-only mode.
    pub fn image_plan(&self) -> Result<Option<ImagePlan>, ConfigError> {
        self.validate()?;
        Ok(self.imagery.as_ref().map(ImagePlan::resolve))
    }
}

// ─── Stage planning ──────────────────────────────────────────────────────────
/// Geometry of one image stage after shapes have been propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub kind: StageKind,
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub stride: usize,
    /// Same padding; the odd pixel, if any, goes after the input.
    pub padding: SamePadding,
    pub input: (usize, usize),
    pub output: (usize, usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    pub stages: Vec<StagePlan>,
    /// Channels after the final stage.
    pub channels: usize,
    /// Spatial size after the final stage.
    pub extent: (usize, usize),
}

impl ImagePlan {
    fn resolve(imagery: &ImageryConfig) -> Self {
        let conv = &imagery.conv;
        let mut channels = imagery.image.channels();
        let mut extent = (imagery.image.height, imagery.image.width);
        let mut stages = Vec::with_capacity(conv.len());

        for (i, &kind) in conv.stages.iter().enumerate() {
            let stride = kind.stride();
            let output = (same_extent(extent.0, stride), same_extent(extent.1, stride));
            let (kernel, out_channels) = match kind {
                StageKind::Maintain | StageKind::Downsample => (conv.kernel_sizes[i], conv.filters[i]),
                StageKind::Pool => (2, channels),
            };
            let plan = StagePlan {
                kind,
                in_channels: channels,
                out_channels,
                kernel,
                stride,
                padding: SamePadding::new(extent, kernel, stride),
                input: extent,
                output,
            };
            channels = plan.out_channels;
            extent = plan.output;
            stages.push(plan);
        }

        Self {
            stages,
            channels,
            extent,
        }
    }

    /// Number of values per sample once the image branch is flattened.
    pub fn flattened_width(&self) -> usize {
        self.channels * self.extent.0 * self.extent.1
    }
}

/// Zero-or-more pixels added around an image so a window of `kernel`
/// with `stride` yields `ceil(input / stride)` outputs per axis.
/// When the total is odd the extra pixel goes at the bottom/right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamePadding {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl SamePadding {
    pub fn new(input: (usize, usize), kernel: usize, stride: usize) -> Self {
        let (top, bottom) = same_padding_1d(input.0, kernel, stride);
        let (left, right) = same_padding_1d(input.1, kernel, stride);
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top + self.bottom + self.left + self.right == 0
    }
}

/// `(before, after)` padding along one axis.
pub fn same_padding_1d(input: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let covered = (same_extent(input, stride) - 1) * stride + kernel;
    let total = covered.saturating_sub(input);
    (total / 2, total - total / 2)
}

/// Output length of a same-padded window: `ceil(input / stride)`.
pub fn same_extent(input: usize, stride: usize) -> usize {
    (input + stride - 1) / stride
}
