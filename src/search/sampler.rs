use std::str::FromStr;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::error::TrainError;
use crate::search::space::{SearchSpace, TrialParams};

/// Proposes the hyperparameters of the next trial.
pub trait Sampler {
    fn name(&self) -> &'static str;

    /// Parameters for trial `number` (0-based).
    fn sample(&mut self, space: &SearchSpace, number: usize) -> TrialParams;
}

/// Independent draws from the search space.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        RandomSampler { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Sampler for RandomSampler {
    fn name(&self) -> &'static str {
        "random"
    }

    fn sample(&mut self, space: &SearchSpace, _number: usize) -> TrialParams {
        TrialParams {
            n_epochs: space.sample_epochs(&mut self.rng),
            lr: space.sample_lr(&mut self.rng),
            optimizer: space.sample_optimizer(&mut self.rng),
        }
    }
}

/// Walks the cartesian product of every epoch value, `lr_points` log-spaced
/// learning rates and every optimizer, wrapping around when trials outnumber
/// grid points.
pub struct GridSampler {
    lr_points: usize,
    grid: Vec<TrialParams>,
}

impl GridSampler {
    pub fn new(lr_points: usize) -> Self {
        GridSampler { lr_points: lr_points.max(1), grid: Vec::new() }
    }

    fn build(&self, space: &SearchSpace) -> Vec<TrialParams> {
        let lrs = space.lr_grid(self.lr_points);
        let mut grid = Vec::new();
        for n_epochs in space.epochs.0..=space.epochs.1 {
            for &lr in &lrs {
                for optimizer in &space.optimizers {
                    grid.push(TrialParams { n_epochs, lr, optimizer: optimizer.clone() });
                }
            }
        }
        grid
    }

    pub fn len(&self, space: &SearchSpace) -> usize {
        self.build(space).len()
    }
}

impl Sampler for GridSampler {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn sample(&mut self, space: &SearchSpace, number: usize) -> TrialParams {
        if self.grid.is_empty() {
            self.grid = self.build(space);
        }
        self.grid[number % self.grid.len()].clone()
    }
}

/// Sampler choice as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    Random,
    Grid,
}

impl SamplerKind {
    /// Grid search uses three learning-rate points.
    pub fn build(self, seed: u64) -> Box<dyn Sampler> {
        match self {
            SamplerKind::Random => Box::new(RandomSampler::new(seed)),
            SamplerKind::Grid   => Box::new(GridSampler::new(3)),
        }
    }
}

impl FromStr for SamplerKind {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SamplerKind::Random),
            "grid" => Ok(SamplerKind::Grid),
            other => Err(TrainError::Config(format!("unknown sampler {other:?} (random, grid)"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> SearchSpace {
        SearchSpace { epochs: (1, 2), lr: (1e-3, 1e-1), optimizers: vec!["SGD".into(), "Adam".into()] }
    }

    #[test]
    fn random_sampler_is_seeded() {
        let s = space();
        let mut a = RandomSampler::new(5);
        let mut b = RandomSampler::new(5);
        for i in 0..10 {
            assert_eq!(a.sample(&s, i), b.sample(&s, i));
        }
    }

    #[test]
    fn grid_covers_product_then_wraps() {
        let s = space();
        let mut grid = GridSampler::new(3);
        assert_eq!(grid.len(&s), 2 * 3 * 2);
        let all: Vec<TrialParams> = (0..12).map(|i| grid.sample(&s, i)).collect();
        assert_eq!(all[0], TrialParams { n_epochs: 1, lr: 1e-3, optimizer: "SGD".into() });
        assert_eq!(all[11].n_epochs, 2);
        assert_eq!(all[11].optimizer, "Adam");
        assert_eq!(grid.sample(&s, 12), all[0]);
    }

    #[test]
    fn parses_kind() {
        assert_eq!("grid".parse::<SamplerKind>().unwrap(), SamplerKind::Grid);
        assert!("bayes".parse::<SamplerKind>().is_err());
    }
}
