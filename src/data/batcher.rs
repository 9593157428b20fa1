// ============================================================
// Layer 4 - Alarm Batcher
// ============================================================
// Implements burn's Batcher trait: a Vec<AlarmSample> becomes
// one AlarmBatch whose tensors all have batch_size as their
// first dimension.
//
//   features  [N, F]        sensor vectors, row-major
//   images    [N, C, H, W]  only when the samples carry imagery
//   labels    [N]           Int, 0 = FP, 1 = TP
//   targets   [N, 1]        the same labels as floats, for BCE
//
// Features and images are flattened sample by sample and then
// reshaped, so row i of every tensor belongs to the same alarm.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::AlarmSample;

#[derive(Debug, Clone)]
pub struct AlarmBatch<B: Backend> {
    pub features: Tensor<B, 2>,
    pub images: Option<Tensor<B, 4>>,
    pub labels: Tensor<B, 1, Int>,
    pub targets: Tensor<B, 2>,
}

/// Holds the per-sample image shape so flat image buffers can be
/// restored to `[N, C, H, W]`.
#[derive(Debug, Clone, Default)]
pub struct AlarmBatcher {
    image_shape: Option<[usize; 3]>,
}

impl AlarmBatcher {
    pub fn new(image_shape: Option<[usize; 3]>) -> Self {
        Self { image_shape }
    }
}

impl<B: Backend> Batcher<B, AlarmSample, AlarmBatch<B>> for AlarmBatcher {
    fn batch(&self, items: Vec<AlarmSample>, device: &B::Device) -> AlarmBatch<B> {
        let batch_size = items.len();
        let feature_dim = items.first().map(|s| s.features.len()).unwrap_or(0);

        let feature_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();
        let features = Tensor::<B, 1>::from_floats(feature_flat.as_slice(), device)
            .reshape([batch_size, feature_dim]);

        let images = self.image_shape.map(|[c, h, w]| {
            let image_flat: Vec<f32> = items
                .iter()
                .flat_map(|s| s.image.iter().flatten().copied())
                .collect();
            Tensor::<B, 1>::from_floats(image_flat.as_slice(), device).reshape([batch_size, c, h, w])
        });

        let label_ints: Vec<i32> = items.iter().map(|s| s.label as i32).collect();
        let label_floats: Vec<f32> = items.iter().map(|s| s.label as f32).collect();

        let labels = Tensor::<B, 1, Int>::from_ints(label_ints.as_slice(), device);
        let targets =
            Tensor::<B, 1>::from_floats(label_floats.as_slice(), device).reshape([batch_size, 1]);

        AlarmBatch {
            features,
            images,
            labels,
            targets,
        }
    }
}
