use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::error::Result;
use crate::search::sampler::Sampler;
use crate::search::space::{SearchSpace, TrialParams};

/// Scores one set of hyperparameters; higher is better.
pub trait Objective {
    fn evaluate(&mut self, number: usize, params: &TrialParams) -> Result<f64>;
}

impl<F> Objective for F
where
    F: FnMut(usize, &TrialParams) -> Result<f64>,
{
    fn evaluate(&mut self, number: usize, params: &TrialParams) -> Result<f64> {
        self(number, params)
    }
}

/// One finished trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 0-based trial number.
    pub number: usize,
    pub params: TrialParams,
    pub value: f64,
    pub duration_secs: f64,
}

/// A maximizing search over `SearchSpace`.
pub struct Study {
    name: String,
    space: SearchSpace,
    sampler: Box<dyn Sampler>,
    trials: Vec<TrialRecord>,
    best_trial_idx: Option<usize>,
}

impl Study {
    pub fn new(name: impl Into<String>, space: SearchSpace, sampler: Box<dyn Sampler>) -> Result<Study> {
        space.validate()?;
        Ok(Study { name: name.into(), space, sampler, trials: Vec::new(), best_trial_idx: None })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn best_trial(&self) -> Option<&TrialRecord> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().map(|t| t.value)
    }

    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    /// Records a finished trial; it becomes the best only on a strictly
    /// higher value.
    pub fn add_trial(&mut self, record: TrialRecord) {
        let is_better = match self.best_value() {
            None => true,
            Some(best) => record.value > best,
        };
        if is_better {
            self.best_trial_idx = Some(self.trials.len());
        }
        self.trials.push(record);
    }

    /// Runs `n_trials` trials one after another. The first failing trial
    /// aborts the search.
    pub fn optimize<O: Objective>(&mut self, objective: &mut O, n_trials: usize) -> Result<()> {
        info!(study = %self.name, sampler = self.sampler.name(), n_trials, "starting search");
        for _ in 0..n_trials {
            let number = self.trials.len();
            let params = self.sampler.sample(&self.space, number);
            info!(trial = number, n_epochs = params.n_epochs, lr = params.lr, optimizer = %params.optimizer, "trial started");

            let start = Instant::now();
            let value = objective.evaluate(number, &params)?;
            let duration_secs = start.elapsed().as_secs_f64();

            self.add_trial(TrialRecord { number, params, value, duration_secs });
            info!(
                trial = number,
                value,
                best_value = self.best_value().unwrap_or(value),
                best_trial = self.best_trial().map(|t| t.number).unwrap_or(number),
                duration_secs,
                "trial finished"
            );
        }
        Ok(())
    }

    /// Writes the best trial's parameters to
    /// `<dir>/search_<name>_<value>.json`. Nothing is written before the
    /// first trial completes.
    pub fn persist_best(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some(best) = self.best_trial() else {
            return Ok(None);
        };
        std::fs::create_dir_all(dir)?;
        let path = artifact_path(dir, &self.name, best.value);
        std::fs::write(&path, serde_json::to_string_pretty(&best.params)?)?;
        info!(path = %path.display(), value = best.value, "saved best search parameters");
        Ok(Some(path))
    }
}

pub fn artifact_path(dir: &Path, name: &str, value: f64) -> PathBuf {
    dir.join(format!("search_{name}_{value}.json"))
}
