#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use tpfp_classifier::data::dataset::{AlarmDataset, Splits};

pub const FEATURES: usize = 6;
pub const CHANNELS: usize = 9;

/// Alarms whose first feature decides the label, so a small network
/// can separate them. Images, when requested, are brighter for TP.
pub fn alarms(n: usize, image_hw: Option<(usize, usize)>, seed: u64) -> AlarmDataset {
    labelled_alarms(n, image_hw, seed, false)
}

/// Same features as `alarms`, opposite labels. A model that learns
/// `alarms` gets steadily worse on these.
pub fn mislabelled_alarms(n: usize, seed: u64) -> AlarmDataset {
    labelled_alarms(n, None, seed, true)
}

fn labelled_alarms(n: usize, image_hw: Option<(usize, usize)>, seed: u64, flip: bool) -> AlarmDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n * FEATURES);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let signal: f32 = rng.gen();
        labels.push(u8::from((signal > 0.5) != flip));
        features.push(signal);
        features.extend((1..FEATURES).map(|_| rng.gen::<f32>()));
    }

    let dataset = AlarmDataset::from_flat(features, FEATURES, labels.clone()).unwrap();
    match image_hw {
        None => dataset,
        Some((h, w)) => {
            let per_sample = CHANNELS * h * w;
            let images = labels
                .iter()
                .flat_map(|&label| {
                    let base = 0.25 + 0.5 * label as f32;
                    (0..per_sample).map(move |i| base + (i % 5) as f32 * 0.01)
                })
                .collect();
            dataset.with_images(images, [CHANNELS, h, w]).unwrap()
        }
    }
}

pub fn splits(train: usize, image_hw: Option<(usize, usize)>) -> Splits {
    Splits {
        train: alarms(train, image_hw, 1),
        validation: alarms(train / 4, image_hw, 2),
        test: alarms(train / 4, image_hw, 3),
    }
}
