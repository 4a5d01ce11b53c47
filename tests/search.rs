use image::{Rgb, RgbImage};
use mask_trainer::data::dataset::{DatasetStrategy, InMemoryDataset};
use mask_trainer::search::{artifact_path, RandomSampler, SamplerKind};
use mask_trainer::{run_search, Registry, Result, SearchConfig, SearchSpace, Study, TrialConfig, TrialParams};

#[test]
fn persists_parameters_of_the_best_trial() {
    let tmp = tempfile::tempdir().unwrap();
    let mut study = Study::new("exp", SearchSpace::default(), Box::new(RandomSampler::new(3))).unwrap();

    let values = [0.5, 0.8, 0.3];
    let mut seen: Vec<TrialParams> = Vec::new();
    let mut objective = |number: usize, params: &TrialParams| -> Result<f64> {
        seen.push(params.clone());
        Ok(values[number])
    };
    study.optimize(&mut objective, 3).unwrap();

    let path = study.persist_best(tmp.path()).unwrap().unwrap();
    assert_eq!(path, artifact_path(tmp.path(), "exp", 0.8));
    assert_eq!(path.file_name().unwrap(), "search_exp_0.8.json");

    let saved: TrialParams = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved, seen[1]);
    assert_eq!(study.best_trial().unwrap().number, 1);
}

#[test]
fn search_runs_real_trials_with_sampled_settings() {
    let mut registry = Registry::with_defaults();
    let samples = |n: usize| -> Vec<(RgbImage, usize)> {
        (0..n).map(|i| (RgbImage::from_pixel(4, 4, Rgb([(i * 30) as u8, 0, 0])), i % 2)).collect()
    };
    let dataset = InMemoryDataset::new(samples(8), samples(4), 2);
    registry.register_dataset("InMemory", move |_| Ok(Box::new(dataset.clone()) as Box<dyn DatasetStrategy>));

    let tmp = tempfile::tempdir().unwrap();
    let base = TrialConfig {
        dataset: "InMemory".into(),
        resize: (4, 4),
        batch_size: 4,
        valid_batch_size: 4,
        model_dir: tmp.path().to_path_buf(),
        num_workers: 0,
        ..TrialConfig::default()
    };
    let search = SearchConfig {
        n_trials: 3,
        space: SearchSpace { epochs: (1, 2), lr: (1e-4, 1e-2), optimizers: vec!["SGD".into(), "AdamW".into()] },
        sampler: SamplerKind::Grid,
    };

    let study = run_search(&base, &registry, &search).unwrap();
    assert_eq!(study.trials().len(), 3);
    for (trial, dir) in study.trials().iter().zip(["exp", "exp2", "exp3"]) {
        let saved = TrialConfig::load(&tmp.path().join(dir).join("config.json")).unwrap();
        assert!(saved.search_mode);
        assert_eq!((saved.epochs, saved.lr, &saved.optimizer), (trial.params.n_epochs, trial.params.lr, &trial.params.optimizer));
    }

    let best = study.best_trial().unwrap();
    assert!(artifact_path(tmp.path(), "exp", best.value).exists());
}
