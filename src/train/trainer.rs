//! The trial controller: one configuration in, one validation F1 out.

use std::path::PathBuf;

use tracing::info;

use crate::data::dataset::DatasetArgs;
use crate::data::loader::{DataLoader, LoaderOptions};
use crate::data::transform::AugmentationArgs;
use crate::error::Result;
use crate::models::{ModelArgs, ParamInfo};
use crate::optim::{OptimizerArgs, StepLr};
use crate::output::{increment_path, SummaryWriter, CONFIG_FILE};
use crate::registry::Registry;
use crate::search::{SamplerKind, SearchSpace, Study, TrialParams};
use crate::train::best::BestState;
use crate::train::cutmix::CutMix;
use crate::train::epoch_stats::ValidationSummary;
use crate::train::loop_fn::{EpochRunner, FigureOptions};
use crate::train::seed::SeedBundle;
use crate::train::train_config::TrialConfig;

/// Only this dataset keeps the validation grid in loader order.
const ORDERED_FIGURE_DATASET: &str = "MaskSplitByProfileDataset";

/// What a finished trial reports.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    /// Best validation macro F1; the search objective.
    pub best_f1: f64,
    pub best_loss: f64,
    pub dir: PathBuf,
    pub epochs: Vec<ValidationSummary>,
}

/// Runs one full trial: seeds, strategies, `config.epochs` epochs.
pub fn run_trial(config: &TrialConfig, registry: &Registry) -> Result<TrialOutcome> {
    config.validate()?;
    let seeds = SeedBundle::new(config.seed);
    let dir = increment_path(&config.model_dir.join(&config.name), false);

    // ── strategies ──────────────────────────────────────────────────────────
    let dataset = registry.dataset(&config.dataset, &DatasetArgs {
        data_dir: config.data_dir.clone(),
        label: config.label,
        val_ratio: config.val_ratio,
    })?;
    let num_classes = dataset.num_classes();
    let (mean, std) = (dataset.mean(), dataset.std());

    let transforms = registry.augmentation(&config.augmentation, AugmentationArgs { resize: config.resize, mean, std })?;
    let (train_set, val_set) = dataset.split(&mut seeds.split())?;

    let train_loader = DataLoader::new(train_set, transforms.train, LoaderOptions {
        batch_size: config.batch_size,
        shuffle: true,
        num_workers: config.num_workers,
        seed: seeds.train_loader(),
    });
    let val_loader = DataLoader::new(val_set, transforms.val, LoaderOptions {
        batch_size: config.valid_batch_size,
        shuffle: false,
        num_workers: config.num_workers,
        seed: seeds.val_loader(),
    });

    let model_args = ModelArgs {
        num_classes,
        input_dim: train_loader.shape().numel(),
        version: Some(config.model_version.clone()),
    };
    let model = registry.model(&config.model, &model_args, &mut seeds.model_init())?;
    let criterion = registry.loss(&config.criterion)?;

    let trainable: Vec<ParamInfo> = model.param_info().into_iter().filter(|p| p.requires_grad).collect();
    let optimizer = registry.optimizer(&config.optimizer, &trainable, OptimizerArgs {
        lr: config.lr,
        weight_decay: config.weight_decay,
    })?;
    let scheduler = (!config.search_mode).then(|| StepLr::new(optimizer.as_ref(), config.lr_decay_step, config.lr_gamma));

    // ── output directory ────────────────────────────────────────────────────
    std::fs::create_dir_all(&dir)?;
    config.save(&dir.join(CONFIG_FILE))?;
    info!(
        dir = %dir.display(),
        model = %config.model,
        optimizer = %config.optimizer,
        lr = config.lr,
        epochs = config.epochs,
        train_batches = train_loader.len(),
        val_batches = val_loader.len(),
        "trial started"
    );

    let mut runner = EpochRunner {
        model,
        optimizer,
        scheduler,
        criterion,
        cutmix: CutMix::new(config.beta, seeds.cutmix())?,
        train_loader,
        val_loader,
        writer: SummaryWriter::create(&dir)?,
        best: BestState::new(),
        figure: FigureOptions {
            label: config.label,
            mean,
            std,
            shuffle: config.dataset != ORDERED_FIGURE_DATASET,
            rng: seeds.visual(),
        },
        log_interval: config.log_interval,
        out_dir: dir.clone(),
    };

    let mut epochs = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        epochs.push(runner.run_epoch(epoch)?);
    }

    info!(dir = %dir.display(), best_f1 = runner.best.best_f1, best_loss = runner.best.best_loss, "trial finished");
    Ok(TrialOutcome { best_f1: runner.best.best_f1, best_loss: runner.best.best_loss, dir, epochs })
}

/// Search settings on top of a base trial configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub n_trials: usize,
    pub space: SearchSpace,
    pub sampler: SamplerKind,
}

/// Runs `search.n_trials` trials with sampled `epochs`, `lr` and
/// `optimizer`, then writes the best parameters to the model directory.
pub fn run_search(base: &TrialConfig, registry: &Registry, search: &SearchConfig) -> Result<Study> {
    base.validate()?;
    let sampler = search.sampler.build(SeedBundle::new(base.seed).search());
    let mut study = Study::new(base.name.clone(), search.space.clone(), sampler)?;

    let mut objective = |_number: usize, params: &TrialParams| -> Result<f64> {
        Ok(run_trial(&base.with_params(params), registry)?.best_f1)
    };
    study.optimize(&mut objective, search.n_trials)?;
    study.persist_best(&base.model_dir)?;
    Ok(study)
}
