mod common;

use burn::{backend::NdArray, prelude::*};
use tpfp_classifier::{
    domain::{
        error::ConfigError,
        layer_spec::{ClassifierConfig, ConvSpec, ImageSpec, InputMode, StageKind},
    },
    ml::{model::build, session::Session},
};

type TestBackend = NdArray;

fn reference_conv() -> ConvSpec {
    ConvSpec::parse(&["m", "d", "m", "p"], vec![32; 4], vec![3; 4]).unwrap()
}

#[test]
fn single_input_has_one_dense_layer_per_width_plus_output() {
    let session = Session::<TestBackend>::default();
    for widths in [vec![8], vec![50, 50, 25], vec![16, 8, 8, 4, 2]] {
        let n = widths.len();
        let model = build(&ClassifierConfig::features_only(common::FEATURES, widths), &session).unwrap();
        assert_eq!(model.mode(), InputMode::Features);
        assert_eq!(model.dense_stage_count(), n);
        assert_eq!(model.dense_layer_count(), n + 1);
        assert_eq!(model.image_stage_count(), 0);
        assert_eq!(model.output_units(), 1);
    }
}

#[test]
fn single_input_outputs_probabilities() {
    let session = Session::<TestBackend>::default();
    let model = build(
        &ClassifierConfig::features_only(common::FEATURES, vec![50, 50, 25]),
        &session,
    )
    .unwrap();

    let x = Tensor::<TestBackend, 2>::random(
        [5, common::FEATURES],
        burn::tensor::Distribution::Uniform(-1.0, 1.0),
        session.device(),
    );
    let probs = model.forward(x, None);
    assert_eq!(probs.dims(), [5, 1]);
    let values: Vec<f32> = probs.into_data().to_vec().unwrap();
    assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn dual_input_reference_architecture_gives_two_way_distribution() {
    let session = Session::<TestBackend>::default();
    let cfg = ClassifierConfig::features_only(common::FEATURES, vec![50, 50, 25])
        .with_imagery(ImageSpec::new(16, 12), reference_conv());
    let model = build(&cfg, &session).unwrap();

    assert_eq!(model.mode(), InputMode::FeaturesAndImagery);
    assert_eq!(model.image_stage_count(), 4);
    assert_eq!(model.pool_stage_count(), 1);
    assert_eq!(model.output_units(), 2);
    assert_eq!(model.image_shape(), Some([9, 16, 12]));

    let device = session.device();
    let features = Tensor::<TestBackend, 2>::ones([3, common::FEATURES], device);
    let images = Tensor::<TestBackend, 4>::ones([3, 9, 16, 12], device) * 0.5;
    let probs = model.forward(features, Some(images));
    assert_eq!(probs.dims(), [3, 2]);

    let row_sums: Vec<f32> = probs.sum_dim(1).into_data().to_vec().unwrap();
    for sum in row_sums {
        assert!((sum - 1.0).abs() < 1e-5, "row sums to {sum}");
    }
}

#[test]
fn odd_spatial_sizes_flow_through_downsample_and_pool() {
    let session = Session::<TestBackend>::default();
    let conv = ConvSpec::new(
        vec![StageKind::Downsample, StageKind::Pool, StageKind::Maintain],
        vec![4, 0, 4],
        vec![5, 0, 1],
    );
    let cfg = ClassifierConfig::features_only(3, vec![4])
        .with_imagery(ImageSpec::new(7, 5).with_timestamps(1), conv);
    let model = build(&cfg, &session).unwrap();

    let device = session.device();
    let probs = model.forward(
        Tensor::zeros([2, 3], device),
        Some(Tensor::zeros([2, 3, 7, 5], device)),
    );
    assert_eq!(probs.dims(), [2, 2]);
}

#[test]
fn even_kernels_build_and_keep_same_geometry() {
    let session = Session::<TestBackend>::default();
    let conv = ConvSpec::new(
        vec![StageKind::Maintain, StageKind::Downsample, StageKind::Pool],
        vec![4, 4, 0],
        vec![2, 4, 0],
    );
    let cfg = ClassifierConfig::features_only(3, vec![4])
        .with_imagery(ImageSpec::new(7, 6).with_timestamps(1), conv);
    // 7x6 -> 7x6 -> 4x3 -> 2x2
    assert_eq!(cfg.image_plan().unwrap().unwrap().extent, (2, 2));
    let model = build(&cfg, &session).unwrap();

    let device = session.device();
    let probs = model.forward(
        Tensor::zeros([2, 3], device),
        Some(Tensor::ones([2, 3, 7, 6], device)),
    );
    assert_eq!(probs.dims(), [2, 2]);
}

#[test]
fn mismatched_conv_lists_fail_before_construction() {
    let session = Session::<TestBackend>::default();
    let cfg = ClassifierConfig::features_only(common::FEATURES, vec![8]).with_imagery(
        ImageSpec::new(8, 8),
        ConvSpec::new(
            vec![StageKind::Maintain, StageKind::Downsample, StageKind::Pool],
            vec![8, 8],
            vec![3, 3, 3],
        ),
    );
    let err = build(&cfg, &session).unwrap_err();
    assert_eq!(
        err,
        ConfigError::LengthMismatch {
            stages: 3,
            filters: 2,
            kernels: 3
        }
    );
}

#[test]
fn unknown_stage_tag_never_reaches_the_builder() {
    let err = ConvSpec::parse(&["m", "q"], vec![8, 8], vec![3, 3]).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownStage(tag) if tag == "q"));
}

#[test]
fn empty_dense_spec_is_rejected() {
    let session = Session::<TestBackend>::default();
    let err = build(&ClassifierConfig::features_only(4, vec![]), &session).unwrap_err();
    assert_eq!(err, ConfigError::EmptyDenseSpec);
}
