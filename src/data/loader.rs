// ============================================================
// Layer 4 - Split Loader
// ============================================================
// Reads pre-split partitions from a directory of .npy files:
//
//   {split}_features.npy   f32  [N, F]
//   {split}_labels.npy     u8   [N]      0 = FP, 1 = TP
//   {split}_images.npy     f32  [N, H, W, C]   imagery only
//
// with split in {train, validation, test}. Images are stored
// channels-last (the usual camera / numpy layout) and are
// permuted to channels-first here, which is what burn's Conv2d
// expects.

use ndarray::{Array1, Array2, Array4};
use ndarray_npy::{read_npy, ReadableElement};
use std::path::{Path, PathBuf};

use crate::data::dataset::{AlarmDataset, SplitName};
use crate::domain::{error::DataError, layer_spec::InputMode, traits::SplitSource};

pub struct NpySplitLoader {
    dir: PathBuf,
}

impl NpySplitLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn features_path(&self, split: SplitName) -> PathBuf {
        self.dir.join(format!("{split}_features.npy"))
    }

    pub fn labels_path(&self, split: SplitName) -> PathBuf {
        self.dir.join(format!("{split}_labels.npy"))
    }

    pub fn images_path(&self, split: SplitName) -> PathBuf {
        self.dir.join(format!("{split}_images.npy"))
    }
}

impl SplitSource for NpySplitLoader {
    fn load_split(&self, split: SplitName, mode: InputMode) -> Result<AlarmDataset, DataError> {
        let features: Array2<f32> = read_array(&self.features_path(split))?;
        let labels: Array1<u8> = read_array(&self.labels_path(split))?;

        let feature_dim = features.ncols();
        let features: Vec<f32> = features.as_standard_layout().iter().copied().collect();
        let dataset = AlarmDataset::from_flat(features, feature_dim, labels.to_vec())?;

        let dataset = match mode {
            InputMode::Features => dataset,
            InputMode::FeaturesAndImagery => {
                let images: Array4<f32> = read_array(&self.images_path(split))?;
                let (_, h, w, c) = images.dim();
                // [N, H, W, C] -> [N, C, H, W]
                let chw = images.permuted_axes([0, 3, 1, 2]);
                let data: Vec<f32> = chw.as_standard_layout().iter().copied().collect();
                dataset.with_images(data, [c, h, w])?
            }
        };

        tracing::info!(
            "Loaded {} split: {} samples, {} features{}, {:.1}% TP",
            split,
            dataset.sample_count(),
            dataset.feature_dim(),
            dataset
                .image_shape()
                .map(|[c, h, w]| format!(", images {c}x{h}x{w}"))
                .unwrap_or_default(),
            dataset.positive_fraction() * 100.0,
        );
        Ok(dataset)
    }
}

fn read_array<A, D>(path: &Path) -> Result<ndarray::Array<A, D>, DataError>
where
    A: ReadableElement,
    D: ndarray::Dimension,
{
    read_npy(path).map_err(|e| DataError::Npy {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
