//! End-to-end pipeline test on a tiny synthetic dataset.

use std::path::PathBuf;

use image::{Rgb, RgbImage};

use cataract_cnn::backend::{default_device, TrainingBackend};
use cataract_cnn::pipeline::{run_experiment, ExperimentConfig};
use cataract_cnn::tuner::space::{ParamRange, SearchSpace};
use cataract_cnn::{ClassFolder, FundusDataset, SplitConfig};

const IMAGE_SIZE: usize = 8;

/// Write a small synthetic dataset: dark images for cataract, bright for normal.
fn write_dataset(root: &PathBuf, per_class: usize) -> (PathBuf, PathBuf) {
    let cataract_dir = root.join("cataract");
    let normal_dir = root.join("normal");
    std::fs::create_dir_all(&cataract_dir).unwrap();
    std::fs::create_dir_all(&normal_dir).unwrap();

    for i in 0..per_class {
        let dark = RgbImage::from_pixel(12, 12, Rgb([30, 30, 30]));
        dark.save(cataract_dir.join(format!("c_{:02}.png", i))).unwrap();

        let bright = RgbImage::from_pixel(12, 12, Rgb([220, 220, 220]));
        bright.save(normal_dir.join(format!("n_{:02}.png", i))).unwrap();
    }

    (cataract_dir, normal_dir)
}

/// A search space small enough for a fast test run.
fn tiny_space() -> SearchSpace {
    let mut space = SearchSpace::new();
    space.add("conv1_filters", ParamRange::Int { min: 2, max: 4, step: 2 }).unwrap();
    space.add("conv1_dropout", ParamRange::Float { min: 0.2, max: 0.3, step: 0.1 }).unwrap();
    space.add("conv2_filters", ParamRange::Int { min: 2, max: 4, step: 2 }).unwrap();
    space.add("conv2_dropout", ParamRange::Float { min: 0.2, max: 0.3, step: 0.1 }).unwrap();
    space.add("dense1_units", ParamRange::Int { min: 8, max: 16, step: 8 }).unwrap();
    space.add("dense1_dropout", ParamRange::Float { min: 0.2, max: 0.3, step: 0.1 }).unwrap();
    space.add("dense2_units", ParamRange::Int { min: 8, max: 8, step: 8 }).unwrap();
    space.add("dense2_dropout", ParamRange::Float { min: 0.2, max: 0.3, step: 0.1 }).unwrap();
    space.add("dense3_units", ParamRange::Int { min: 4, max: 8, step: 4 }).unwrap();
    space.add("dense3_dropout", ParamRange::Float { min: 0.2, max: 0.3, step: 0.1 }).unwrap();
    space
}

#[test]
fn full_pipeline_on_synthetic_images() {
    let root = std::env::temp_dir().join(format!("cataract_e2e_{}", std::process::id()));
    let (cataract_dir, normal_dir) = write_dataset(&root, 10);

    let classes = vec![
        ClassFolder::new(&cataract_dir, 0, "cataract"),
        ClassFolder::new(&normal_dir, 1, "normal"),
    ];

    let dataset = FundusDataset::load(&classes, IMAGE_SIZE).unwrap();
    assert_eq!(dataset.len(), 20);
    assert_eq!(dataset.skipped, 0);

    let config = ExperimentConfig {
        split: SplitConfig::new(0.20, 0.10, 38).unwrap(),
        space: tiny_space(),
        max_trials: 2,
        search_epochs: 1,
        final_epochs: 2,
        batch_size: 4,
        learning_rate: 1e-3,
        image_size: IMAGE_SIZE,
        search_seed: 38,
    };

    let report = run_experiment::<TrainingBackend>(default_device(), &dataset, &config).unwrap();

    // 20 items: 4 test, then 16 * 0.10 rounds to 2 validation, 14 train
    assert_eq!(report.test_size, 4);
    assert_eq!(report.validation_size, 2);
    assert_eq!(report.train_size, 14);

    assert_eq!(report.search.trials.len(), 2);
    assert_eq!(report.fit.history.len(), 2);

    // Every split is fully evaluated
    assert_eq!(report.validation.metrics.total_samples, 2);
    assert_eq!(report.test.metrics.total_samples, 4);
    assert_eq!(report.train.metrics.total_samples, 14);

    for split in [&report.validation, &report.test, &report.train] {
        assert!(split.loss.is_finite());
        assert!((0.0..=1.0).contains(&split.metrics.accuracy));
        assert_eq!(split.metrics.confusion_matrix.total(), split.metrics.total_samples);
    }

    // Reports serialize for the CLI's JSON export
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("best_config"));

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn experiment_runs_are_independent() {
    let root = std::env::temp_dir().join(format!("cataract_e2e_iso_{}", std::process::id()));
    let (cataract_dir, normal_dir) = write_dataset(&root, 8);

    let classes = vec![
        ClassFolder::new(&cataract_dir, 0, "cataract"),
        ClassFolder::new(&normal_dir, 1, "normal"),
    ];
    let dataset = FundusDataset::load(&classes, IMAGE_SIZE).unwrap();

    let make_config = |test_fraction: f64| ExperimentConfig {
        split: SplitConfig::new(test_fraction, 0.10, 38).unwrap(),
        space: tiny_space(),
        max_trials: 2,
        search_epochs: 1,
        final_epochs: 1,
        batch_size: 4,
        learning_rate: 1e-3,
        image_size: IMAGE_SIZE,
        search_seed: 38,
    };

    // Run a first experiment, then check a second one samples the same
    // trial configurations: each run owns a fresh search RNG.
    let first = run_experiment::<TrainingBackend>(default_device(), &dataset, &make_config(0.20))
        .unwrap();
    let second = run_experiment::<TrainingBackend>(default_device(), &dataset, &make_config(0.35))
        .unwrap();

    for (a, b) in first.search.trials.iter().zip(second.search.trials.iter()) {
        assert_eq!(a.config, b.config);
    }

    std::fs::remove_dir_all(&root).unwrap();
}
