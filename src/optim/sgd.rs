use crate::error::{Result, TrainError};
use crate::models::{ParamInfo, ParamMut};
use crate::optim::{Optimizer, OptimizerArgs};

/// Plain SGD with L2 weight decay folded into the gradient.
pub struct Sgd {
    pub learning_rate: f64,
    pub weight_decay: f64,
    param_count: usize,
}

impl Sgd {
    pub fn new(params: &[ParamInfo], args: OptimizerArgs) -> Sgd {
        Sgd { learning_rate: args.lr, weight_decay: args.weight_decay, param_count: params.len() }
    }
}

impl Optimizer for Sgd {
    fn name(&self) -> &'static str {
        "SGD"
    }

    /// `p ← p - lr · (g + wd · p)`
    fn step(&mut self, params: Vec<ParamMut<'_>>) -> Result<()> {
        if params.len() != self.param_count {
            return Err(TrainError::Shape { expected: self.param_count, actual: params.len() });
        }
        for ParamMut { values, grads, .. } in params {
            for (x, g) in values.iter_mut().zip(grads) {
                *x -= self.learning_rate * (g + self.weight_decay * *x);
            }
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::testing::{distance_after_steps, info, no_decay};

    #[test]
    fn converges_on_quadratic() {
        let mut opt = Sgd::new(&info(3), no_decay(0.1));
        assert!(distance_after_steps(&mut opt, 200) < 1e-6);
    }

    #[test]
    fn rejects_foreign_parameter_set() {
        let mut opt = Sgd::new(&info(3), no_decay(0.1));
        assert!(opt.step(Vec::new()).is_err());
    }
}
