mod common;

use burn::{
    backend::{Autodiff, NdArray},
    module::AutodiffModule,
};
use std::fs;
use tpfp_classifier::{
    data::dataset::Splits,
    domain::{
        error::TrainError,
        layer_spec::{ClassifierConfig, ConvSpec, ImageSpec, InputMode},
    },
    infra::{
        checkpoint::{load_weights, RunArtifacts},
        metrics::CSV_HEADER,
    },
    ml::{
        model::build,
        session::Session,
        trainer::{evaluate, train, train_with, FitSettings},
    },
};

type TrainBackend = Autodiff<NdArray>;

#[test]
fn feature_only_reference_run_completes() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::<TrainBackend>::new(Default::default(), 42);
    let cfg = ClassifierConfig::features_only(common::FEATURES, vec![50, 50, 25]).with_dropout(0.1);
    let model = build(&cfg, &session).unwrap();

    let trained = train(
        &session,
        model,
        dir.path(),
        "_single",
        common::splits(256, None),
        InputMode::Features,
    )
    .unwrap();
    let report = &trained.report;

    assert!(report.epochs_run >= 1 && report.epochs_run <= 50);
    if report.epochs_run < 50 {
        assert!(report.stopped_early);
    }
    assert!(report.elapsed.as_nanos() > 0);
    assert!((0.0..=1.0).contains(&report.test.accuracy));
    assert!(report.test.loss.is_finite());

    let run = RunArtifacts::new(dir.path(), "_single");
    assert!(run.weights_file().exists());
    let log = fs::read_to_string(run.loss_log()).unwrap();
    assert_eq!(log.lines().count(), report.epochs_run + 1);
}

#[test]
fn early_stopping_fires_when_validation_loss_stalls() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::<TrainBackend>::new(Default::default(), 5);
    let model = build(&ClassifierConfig::features_only(common::FEATURES, vec![16, 8]), &session).unwrap();
    // A vanishing step leaves the weights untouched, so epoch 1 ties
    // epoch 0 on validation loss and a tie is not an improvement.
    let settings = FitSettings::new()
        .with_num_epochs(20)
        .with_batch_size(16)
        .with_learning_rate(1e-20)
        .with_patience(1);

    let report = train_with(
        &session,
        model,
        dir.path(),
        "_stall",
        common::splits(64, None),
        InputMode::Features,
        &settings,
    )
    .unwrap()
    .report;

    assert!(report.stopped_early);
    assert_eq!(report.epochs_run, 2);
    let log = fs::read_to_string(RunArtifacts::new(dir.path(), "_stall").loss_log()).unwrap();
    assert_eq!(log.lines().count(), 3);
}

#[test]
fn early_stopping_keeps_last_epoch_weights_not_best() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::<TrainBackend>::new(Default::default(), 11);
    let cfg = ClassifierConfig::features_only(common::FEATURES, vec![16, 8]);
    let model = build(&cfg, &session).unwrap();
    // Validation labels are inverted, so learning the training split
    // pushes validation loss up from the first epoch on.
    let validation = common::mislabelled_alarms(64, 2);
    let data = Splits {
        train: common::alarms(128, None, 1),
        validation: validation.clone(),
        test: common::alarms(32, None, 3),
    };
    let settings = FitSettings::new()
        .with_num_epochs(40)
        .with_batch_size(16)
        .with_learning_rate(0.01)
        .with_patience(2);

    let trained = train_with(
        &session,
        model,
        dir.path(),
        "_last",
        data,
        InputMode::Features,
        &settings,
    )
    .unwrap();
    let report = &trained.report;

    assert!(report.stopped_early);
    assert!(report.epochs_run < 40);
    let best = report
        .history
        .iter()
        .map(|m| m.val_loss)
        .fold(f64::INFINITY, f64::min);
    let last = report.history.last().unwrap().val_loss;
    assert!(last > best, "last epoch {last} should be worse than best {best}");

    // The returned model is the final epoch's model.
    let returned = evaluate(&trained.model.valid(), &validation, 16).unwrap();
    assert!((returned.loss - last).abs() < 1e-5);

    // The checkpoint on disk holds the same weights.
    let fresh = build(&cfg, &Session::<TrainBackend>::new(Default::default(), 99)).unwrap();
    let run = RunArtifacts::new(dir.path(), "_last");
    let restored = load_weights(fresh, &run.weights(), session.device()).unwrap();
    let from_disk = evaluate(&restored.valid(), &validation, 16).unwrap();
    // CompactRecorder stores half precision.
    assert!((from_disk.loss - returned.loss).abs() < 1e-2);
}

#[test]
fn dual_input_reference_run_trains_and_evaluates() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::<TrainBackend>::new(Default::default(), 42);
    let conv = ConvSpec::parse(&["m", "d", "m", "p"], vec![32; 4], vec![3; 4]).unwrap();
    let cfg = ClassifierConfig::features_only(common::FEATURES, vec![50, 50, 25])
        .with_imagery(ImageSpec::new(8, 8), conv);
    let model = build(&cfg, &session).unwrap();
    let data = common::splits(64, Some((8, 8)));
    let test_set = data.test.clone();
    let settings = FitSettings::new().with_num_epochs(3).with_batch_size(16);

    let trained = train_with(
        &session,
        model,
        dir.path(),
        "_dual",
        data,
        InputMode::FeaturesAndImagery,
        &settings,
    )
    .unwrap();

    assert!(trained.report.epochs_run <= 3);
    assert_eq!(trained.report.test.samples, 16);

    // Evaluating the returned model again matches the report.
    let again = evaluate(&trained.model.valid(), &test_set, 16).unwrap();
    assert!((again.accuracy - trained.report.test.accuracy).abs() < 1e-9);
}

#[test]
fn dual_mode_requires_images() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::<TrainBackend>::default();
    let conv = ConvSpec::parse(&["m", "p"], vec![4, 0], vec![3, 0]).unwrap();
    let cfg = ClassifierConfig::features_only(common::FEATURES, vec![8])
        .with_imagery(ImageSpec::new(8, 8), conv);
    let model = build(&cfg, &session).unwrap();

    let result = train(
        &session,
        model,
        dir.path(),
        "_noimg",
        common::splits(16, None),
        InputMode::FeaturesAndImagery,
    );
    assert!(matches!(result, Err(TrainError::Shape { split: "train", .. })));
    assert!(!RunArtifacts::new(dir.path(), "_noimg").loss_log().exists());
}

#[test]
fn rerun_with_same_label_rewrites_log_and_weights() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("out");
    let cfg = ClassifierConfig::features_only(common::FEATURES, vec![8]);
    let settings = FitSettings::new().with_num_epochs(3).with_batch_size(32);

    let mut runs = Vec::new();
    for seed in [1, 2] {
        let session = Session::<TrainBackend>::new(Default::default(), seed);
        let model = build(&cfg, &session).unwrap();
        let trained = train_with(
            &session,
            model,
            &out,
            "_again",
            common::splits(64, None),
            InputMode::Features,
            &settings,
        )
        .unwrap();
        runs.push(trained.report.epochs_run);
    }

    let run = RunArtifacts::new(&out, "_again");
    assert!(run.weights_file().exists());

    let log = fs::read_to_string(run.loss_log()).unwrap();
    assert_eq!(log.matches(CSV_HEADER).count(), 1);
    let epochs: Vec<usize> = log
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(epochs, (0..runs[1]).collect::<Vec<_>>());
}
