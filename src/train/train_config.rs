use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::data::labels::LabelTarget;
use crate::error::{Result, TrainError};
use crate::optim::DEFAULT_WEIGHT_DECAY;
use crate::search::TrialParams;

/// Everything one trial needs, fixed before it starts.
///
/// Search trials are the base configuration with `epochs`, `lr` and
/// `optimizer` replaced by sampled values (`with_params`). The record is
/// written to `config.json` in the trial directory and can be read back with
/// `load`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    pub seed: u64,
    pub epochs: usize,
    pub dataset: String,
    pub label: LabelTarget,
    pub augmentation: String,
    /// `(height, width)` images are resized to.
    pub resize: (u32, u32),
    pub batch_size: usize,
    pub valid_batch_size: usize,
    pub model: String,
    /// Only passed to versioned models.
    pub model_version: String,
    pub optimizer: String,
    pub lr: f64,
    pub weight_decay: f64,
    pub val_ratio: f64,
    pub criterion: String,
    pub lr_decay_step: usize,
    pub lr_gamma: f64,
    pub log_interval: usize,
    /// CutMix β; `<= 0` disables CutMix.
    pub beta: f64,
    pub name: String,
    pub data_dir: PathBuf,
    pub model_dir: PathBuf,
    /// Set for search trials; disables the LR schedule.
    pub search_mode: bool,
    pub num_workers: usize,
}

/// Half the available cores, at least one.
pub fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}

impl Default for TrialConfig {
    fn default() -> Self {
        TrialConfig {
            seed: 42,
            epochs: 1,
            dataset: "MaskSplitByProfileDataset".into(),
            label: LabelTarget::Total,
            augmentation: "BaseAugmentation".into(),
            resize: (64, 48),
            batch_size: 64,
            valid_batch_size: 64,
            model: "BaseModel".into(),
            model_version: "b0".into(),
            optimizer: "SGD".into(),
            lr: 1e-3,
            weight_decay: DEFAULT_WEIGHT_DECAY,
            val_ratio: 0.2,
            criterion: "cross_entropy".into(),
            lr_decay_step: 20,
            lr_gamma: 0.5,
            log_interval: 20,
            beta: -1.0,
            name: "exp".into(),
            data_dir: PathBuf::from("/opt/ml/input/data/train/images"),
            model_dir: PathBuf::from("./model"),
            search_mode: false,
            num_workers: default_num_workers(),
        }
    }
}

/// Turns the `--resize` values into `(height, width)`.
pub fn parse_resize(values: &[u32]) -> Result<(u32, u32)> {
    match values {
        [h, w] if *h > 0 && *w > 0 => Ok((*h, *w)),
        _ => Err(TrainError::Config(format!("resize takes exactly two positive integers, got {values:?}"))),
    }
}

impl TrialConfig {
    /// Rejects settings no trial can run with.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(TrainError::Config(msg));
        if self.batch_size == 0 || self.valid_batch_size == 0 {
            return fail("batch sizes must be at least 1".into());
        }
        if self.log_interval == 0 {
            return fail("log_interval must be at least 1".into());
        }
        if !(0.0..1.0).contains(&self.val_ratio) {
            return fail(format!("val_ratio must be in [0, 1), got {}", self.val_ratio));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return fail(format!("lr must be positive, got {}", self.lr));
        }
        if self.resize.0 == 0 || self.resize.1 == 0 {
            return fail(format!("resize must be positive, got {:?}", self.resize));
        }
        if self.name.is_empty() {
            return fail("name must not be empty".into());
        }
        Ok(())
    }

    /// A copy of `self` running the sampled search parameters.
    pub fn with_params(&self, params: &TrialParams) -> TrialConfig {
        TrialConfig {
            epochs: params.n_epochs,
            lr: params.lr,
            optimizer: params.optimizer.clone(),
            search_mode: true,
            ..self.clone()
        }
    }

    pub fn load(path: &Path) -> Result<TrialConfig> {
        let text = std::fs::read_to_string(path)?;
        let config: TrialConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_needs_two_values() {
        assert_eq!(parse_resize(&[96, 128]).unwrap(), (96, 128));
        assert!(parse_resize(&[96]).is_err());
        assert!(parse_resize(&[1, 2, 3]).is_err());
        assert!(parse_resize(&[0, 2]).is_err());
    }

    #[test]
    fn search_params_override_three_fields() {
        let base = TrialConfig::default();
        let params = TrialParams { n_epochs: 4, lr: 3e-4, optimizer: "AdamW".into() };
        let trial = base.with_params(&params);
        assert_eq!((trial.epochs, trial.lr, trial.optimizer.as_str()), (4, 3e-4, "AdamW"));
        assert!(trial.search_mode);
        assert_eq!(trial.batch_size, base.batch_size);
        assert_eq!(trial.name, base.name);
    }

    #[test]
    fn save_load_preserves_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let config = TrialConfig { label: LabelTarget::Age, beta: 1.0, ..TrialConfig::default() };
        config.save(&path).unwrap();
        assert_eq!(TrialConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: TrialConfig = serde_json::from_str(r#"{"epochs": 7, "label": "mask"}"#).unwrap();
        assert_eq!(config.epochs, 7);
        assert_eq!(config.label, LabelTarget::Mask);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn validate_rejects_bad_ratio() {
        let config = TrialConfig { val_ratio: 1.5, ..TrialConfig::default() };
        assert!(matches!(config.validate(), Err(TrainError::Config(_))));
    }
}
