//! Command-line surface of the `mask-trainer` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::data::labels::LabelTarget;
use crate::error::Result;
use crate::optim::DEFAULT_WEIGHT_DECAY;
use crate::search::{SamplerKind, SearchSpace};
use crate::train::train_config::{default_num_workers, parse_resize, TrialConfig};
use crate::train::trainer::SearchConfig;

#[derive(Parser, Debug)]
#[command(name = "mask-trainer", version, about = "Train the mask/gender/age classifier, optionally under hyperparameter search")]
pub struct Cli {
    /// Random seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of epochs to train
    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    /// Dataset strategy
    #[arg(long, default_value = "MaskSplitByProfileDataset")]
    pub dataset: String,

    /// Label to predict: total, mask, gender or age
    #[arg(long, default_value = "total")]
    pub label: LabelTarget,

    /// Augmentation strategy
    #[arg(long, default_value = "BaseAugmentation")]
    pub augmentation: String,

    /// Resize images to HEIGHT WIDTH
    #[arg(long, num_args = 1.., default_values_t = [64u32, 48])]
    pub resize: Vec<u32>,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 64)]
    pub valid_batch_size: usize,

    /// Model strategy
    #[arg(long, default_value = "BaseModel")]
    pub model: String,

    /// Version tag, passed to versioned models only
    #[arg(long, default_value = "b0")]
    pub model_version: String,

    /// Optimizer strategy
    #[arg(long, default_value = "SGD")]
    pub optimizer: String,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Share of the data held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub val_ratio: f64,

    /// Loss strategy
    #[arg(long, default_value = "cross_entropy")]
    pub criterion: String,

    /// Epochs between learning-rate decays
    #[arg(long, default_value_t = 20)]
    pub lr_decay_step: usize,

    #[arg(long, default_value_t = 0.5)]
    pub lr_gamma: f64,

    /// Batches between training log lines
    #[arg(long, default_value_t = 20)]
    pub log_interval: usize,

    /// CutMix beta; zero or negative disables CutMix
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub beta: f64,

    /// Run directory name under the model directory
    #[arg(long, default_value = "exp")]
    pub name: String,

    /// Data loader threads (default: half the cores)
    #[arg(long)]
    pub num_workers: Option<usize>,

    /// Start from a saved config.json instead of the trial flags above
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SM_CHANNEL_TRAIN", default_value = "/opt/ml/input/data/train/images")]
    pub data_dir: PathBuf,

    #[arg(long, env = "SM_MODEL_DIR", default_value = "./model")]
    pub model_dir: PathBuf,

    // ── search ──────────────────────────────────────────────────────────────
    /// Run a hyperparameter search instead of a single trial
    #[arg(long)]
    pub search: bool,

    #[arg(long, default_value_t = 10)]
    pub search_trials: usize,

    #[arg(long, default_value_t = 3)]
    pub search_epoch_min: usize,

    #[arg(long, default_value_t = 5)]
    pub search_epoch_max: usize,

    #[arg(long, default_value_t = 1e-5)]
    pub search_lr_min: f64,

    #[arg(long, default_value_t = 1e-2)]
    pub search_lr_max: f64,

    /// Optimizers the search picks from
    #[arg(long, num_args = 1.., default_values_t = SearchSpace::default().optimizers)]
    pub search_optimizer: Vec<String>,

    /// Search algorithm: random or grid
    #[arg(long, default_value = "random")]
    pub search_sampler: SamplerKind,
}

impl Cli {
    /// The base trial configuration these flags describe.
    pub fn trial_config(&self) -> Result<TrialConfig> {
        if let Some(path) = &self.config {
            let mut config = TrialConfig::load(path)?;
            config.data_dir = self.data_dir.clone();
            config.model_dir = self.model_dir.clone();
            if let Some(n) = self.num_workers {
                config.num_workers = n;
            }
            return Ok(config);
        }

        let config = TrialConfig {
            seed: self.seed,
            epochs: self.epochs,
            dataset: self.dataset.clone(),
            label: self.label,
            augmentation: self.augmentation.clone(),
            resize: parse_resize(&self.resize)?,
            batch_size: self.batch_size,
            valid_batch_size: self.valid_batch_size,
            model: self.model.clone(),
            model_version: self.model_version.clone(),
            optimizer: self.optimizer.clone(),
            lr: self.lr,
            weight_decay: DEFAULT_WEIGHT_DECAY,
            val_ratio: self.val_ratio,
            criterion: self.criterion.clone(),
            lr_decay_step: self.lr_decay_step,
            lr_gamma: self.lr_gamma,
            log_interval: self.log_interval,
            beta: self.beta,
            name: self.name.clone(),
            data_dir: self.data_dir.clone(),
            model_dir: self.model_dir.clone(),
            search_mode: false,
            num_workers: self.num_workers.unwrap_or_else(default_num_workers),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn search_config(&self) -> Result<SearchConfig> {
        let space = SearchSpace {
            epochs: (self.search_epoch_min, self.search_epoch_max),
            lr: (self.search_lr_min, self.search_lr_max),
            optimizers: self.search_optimizer.clone(),
        };
        space.validate()?;
        Ok(SearchConfig { n_trials: self.search_trials, space, sampler: self.search_sampler })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mask-trainer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_build_a_valid_config() {
        let cli = parse(&["--data-dir", "/data", "--model-dir", "/out"]);
        let config = cli.trial_config().unwrap();
        assert_eq!(config.resize, (64, 48));
        assert_eq!(config.dataset, "MaskSplitByProfileDataset");
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert!(!cli.search);
        assert_eq!(cli.search_config().unwrap().space, SearchSpace::default());
    }

    #[test]
    fn resize_with_three_values_is_rejected() {
        let cli = parse(&["--resize", "1", "2", "3"]);
        assert!(cli.trial_config().is_err());
    }

    #[test]
    fn search_flags_are_parsed() {
        let cli = parse(&[
            "--search", "--search-trials", "4", "--search-optimizer", "SGD", "Adam",
            "--search-sampler", "grid", "--beta", "-1", "--label", "age",
        ]);
        let search = cli.search_config().unwrap();
        assert_eq!(search.n_trials, 4);
        assert_eq!(search.space.optimizers, vec!["SGD", "Adam"]);
        assert_eq!(search.sampler, SamplerKind::Grid);
        assert_eq!(cli.label, LabelTarget::Age);
    }
}
