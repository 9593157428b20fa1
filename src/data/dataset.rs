use burn::data::dataset::Dataset;
use std::{fmt, str::FromStr};

use crate::domain::error::DataError;

/// One alarm event: sensor features, optional stacked CCTV frames
/// (channels-first, flattened) and the ground-truth label.
#[derive(Debug, Clone)]
pub struct AlarmSample {
    pub features: Vec<f32>,
    pub image: Option<Vec<f32>>,
    /// 0 = false positive, 1 = true positive.
    pub label: u8,
}

/// Flattened image stack for a whole partition, channels-first per sample.
#[derive(Debug, Clone)]
struct ImageStack {
    data: Vec<f32>,
    shape: [usize; 3],
}

impl ImageStack {
    fn sample_len(&self) -> usize {
        self.shape.iter().product()
    }
}

/// One partition (train, validation or test). Features, images and
/// labels are index-aligned; the constructors refuse anything else.
#[derive(Debug, Clone)]
pub struct AlarmDataset {
    features: Vec<f32>,
    feature_dim: usize,
    images: Option<ImageStack>,
    labels: Vec<u8>,
}

impl AlarmDataset {
    /// Build from a row-major `[N, feature_dim]` buffer.
    pub fn from_flat(features: Vec<f32>, feature_dim: usize, labels: Vec<u8>) -> Result<Self, DataError> {
        let expected = labels.len() * feature_dim;
        if features.len() != expected {
            return Err(DataError::Misaligned {
                what: "features",
                expected,
                found: features.len(),
            });
        }
        if let Some((row, &value)) = labels.iter().enumerate().find(|&(_, &l)| l > 1) {
            return Err(DataError::InvalidLabel { row, value });
        }
        Ok(Self {
            features,
            feature_dim,
            images: None,
            labels,
        })
    }

    /// Attach a channels-first `[N, C, H, W]` image buffer.
    pub fn with_images(mut self, data: Vec<f32>, shape: [usize; 3]) -> Result<Self, DataError> {
        let expected = self.labels.len() * shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(DataError::Misaligned {
                what: "images",
                expected,
                found: data.len(),
            });
        }
        self.images = Some(ImageStack { data, shape });
        Ok(self)
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// `[C, H, W]` of one sample, if imagery is attached.
    pub fn image_shape(&self) -> Option<[usize; 3]> {
        self.images.as_ref().map(|s| s.shape)
    }

    pub fn sample_count(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Share of samples labelled TP.
    pub fn positive_fraction(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        positives as f64 / self.labels.len() as f64
    }
}

impl Dataset<AlarmSample> for AlarmDataset {
    fn get(&self, index: usize) -> Option<AlarmSample> {
        let label = *self.labels.get(index)?;
        let start = index * self.feature_dim;
        let features = self.features[start..start + self.feature_dim].to_vec();
        let image = self.images.as_ref().map(|stack| {
            let len = stack.sample_len();
            stack.data[index * len..(index + 1) * len].to_vec()
        });
        Some(AlarmSample {
            features,
            image,
            label,
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

// ─── Splits ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitName {
    Train,
    Validation,
    Test,
}

impl SplitName {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitName::Train => "train",
            SplitName::Validation => "validation",
            SplitName::Test => "test",
        }
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(SplitName::Train),
            "validation" | "val" => Ok(SplitName::Validation),
            "test" => Ok(SplitName::Test),
            other => Err(format!("unknown split '{other}' (train, validation or test)")),
        }
    }
}

/// The three disjoint partitions handed to the training driver.
#[derive(Debug, Clone)]
pub struct Splits {
    pub train: AlarmDataset,
    pub validation: AlarmDataset,
    pub test: AlarmDataset,
}

impl Splits {
    pub fn iter(&self) -> impl Iterator<Item = (SplitName, &AlarmDataset)> {
        [
            (SplitName::Train, &self.train),
            (SplitName::Validation, &self.validation),
            (SplitName::Test, &self.test),
        ]
        .into_iter()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_aligned_rows() {
        let ds = AlarmDataset::from_flat(vec![1.0, 2.0, 3.0, 4.0], 2, vec![0, 1])
            .unwrap()
            .with_images(vec![0.5; 2 * 9], [9, 1, 1])
            .unwrap();

        let second = ds.get(1).unwrap();
        assert_eq!(second.features, vec![3.0, 4.0]);
        assert_eq!(second.label, 1);
        assert_eq!(second.image.unwrap().len(), 9);
        assert!(ds.get(2).is_none());
        assert_eq!(ds.image_shape(), Some([9, 1, 1]));
    }

    #[test]
    fn test_label_count_must_match_rows() {
        let err = AlarmDataset::from_flat(vec![0.0; 6], 2, vec![0, 1]).unwrap_err();
        assert!(matches!(err, DataError::Misaligned { what: "features", expected: 4, found: 6 }));
    }

    #[test]
    fn test_non_binary_label_rejected() {
        let err = AlarmDataset::from_flat(vec![0.0; 4], 2, vec![0, 2]).unwrap_err();
        assert!(matches!(err, DataError::InvalidLabel { row: 1, value: 2 }));
    }

    #[test]
    fn test_image_length_checked() {
        let ds = AlarmDataset::from_flat(vec![0.0; 4], 2, vec![0, 1]).unwrap();
        assert!(ds.with_images(vec![0.0; 17], [9, 1, 1]).is_err());
    }

    #[test]
    fn test_positive_fraction() {
        let ds = AlarmDataset::from_flat(vec![0.0; 4], 1, vec![0, 1, 1, 1]).unwrap();
        assert!((ds.positive_fraction() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_split_names_parse() {
        assert_eq!("val".parse::<SplitName>().unwrap(), SplitName::Validation);
        assert!("dev".parse::<SplitName>().is_err());
    }
}
