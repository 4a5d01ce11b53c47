use rand::{rngs::StdRng, Rng};
use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};

/// The hyperparameters a search trial varies. Also the layout of the search
/// artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialParams {
    pub n_epochs: usize,
    pub lr: f64,
    pub optimizer: String,
}

/// Ranges sampled per trial.
///
/// - `epochs`     — inclusive integer range
/// - `lr`         — log-uniform over `[min, max]`
/// - `optimizers` — categorical, uniform over the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub epochs: (usize, usize),
    pub lr: (f64, f64),
    pub optimizers: Vec<String>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        SearchSpace {
            epochs: (3, 5),
            lr: (1e-5, 1e-2),
            optimizers: ["Adadelta", "AdamW", "SGD", "RMSprop", "Adam", "Adagrad"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<()> {
        let (e_min, e_max) = self.epochs;
        if e_min == 0 || e_min > e_max {
            return Err(TrainError::Config(format!("invalid epoch range [{e_min}, {e_max}]")));
        }
        let (lr_min, lr_max) = self.lr;
        if !(lr_min > 0.0 && lr_min <= lr_max && lr_max.is_finite()) {
            return Err(TrainError::Config(format!("invalid lr range [{lr_min}, {lr_max}]")));
        }
        if self.optimizers.is_empty() {
            return Err(TrainError::Config("search needs at least one optimizer".into()));
        }
        Ok(())
    }

    pub fn sample_epochs(&self, rng: &mut StdRng) -> usize {
        rng.gen_range(self.epochs.0..=self.epochs.1)
    }

    pub fn sample_lr(&self, rng: &mut StdRng) -> f64 {
        let (lo, hi) = (self.lr.0.ln(), self.lr.1.ln());
        (rng.gen::<f64>() * (hi - lo) + lo).exp().clamp(self.lr.0, self.lr.1)
    }

    pub fn sample_optimizer(&self, rng: &mut StdRng) -> String {
        self.optimizers[rng.gen_range(0..self.optimizers.len())].clone()
    }

    /// `n` log-spaced learning rates from `lr.0` to `lr.1` inclusive.
    pub fn lr_grid(&self, n: usize) -> Vec<f64> {
        if n <= 1 || self.lr.0 == self.lr.1 {
            return vec![self.lr.0];
        }
        let (lo, hi) = (self.lr.0.ln(), self.lr.1.ln());
        (0..n)
            .map(|i| match i {
                0 => self.lr.0,
                i if i == n - 1 => self.lr.1,
                i => (lo + (hi - lo) * i as f64 / (n - 1) as f64).exp(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn samples_stay_in_range() {
        let space = SearchSpace::default();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let e = space.sample_epochs(&mut rng);
            let lr = space.sample_lr(&mut rng);
            assert!((3..=5).contains(&e));
            assert!((1e-5..=1e-2).contains(&lr));
            assert!(space.optimizers.contains(&space.sample_optimizer(&mut rng)));
        }
    }

    #[test]
    fn lr_grid_is_log_spaced() {
        let space = SearchSpace { lr: (1e-4, 1e-2), ..SearchSpace::default() };
        let grid = space.lr_grid(3);
        assert!((grid[1] - 1e-3).abs() < 1e-12);
        assert!((grid[2] - 1e-2).abs() < 1e-12);
    }

    #[test]
    fn rejects_inverted_ranges() {
        assert!(SearchSpace { epochs: (5, 3), ..SearchSpace::default() }.validate().is_err());
        assert!(SearchSpace { lr: (0.0, 1.0), ..SearchSpace::default() }.validate().is_err());
        assert!(SearchSpace { optimizers: vec![], ..SearchSpace::default() }.validate().is_err());
        assert!(SearchSpace::default().validate().is_ok());
    }
}
