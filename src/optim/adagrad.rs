use crate::error::Result;
use crate::models::{ParamInfo, ParamMut};
use crate::optim::{check_shapes, zero_state, Optimizer, OptimizerArgs};

const EPS: f64 = 1e-10;

/// Adagrad: per-coordinate steps shrink with the sum of squared gradients.
pub struct Adagrad {
    learning_rate: f64,
    weight_decay: f64,
    sum: Vec<Vec<f64>>,
}

impl Adagrad {
    pub fn new(params: &[ParamInfo], args: OptimizerArgs) -> Adagrad {
        Adagrad { learning_rate: args.lr, weight_decay: args.weight_decay, sum: zero_state(params) }
    }
}

impl Optimizer for Adagrad {
    fn name(&self) -> &'static str {
        "Adagrad"
    }

    fn step(&mut self, params: Vec<ParamMut<'_>>) -> Result<()> {
        check_shapes(&self.sum, &params)?;
        for (ParamMut { values, grads, .. }, acc) in params.into_iter().zip(&mut self.sum) {
            for ((x, &g), s) in values.iter_mut().zip(grads).zip(acc.iter_mut()) {
                let g = g + self.weight_decay * *x;
                *s += g * g;
                *x -= self.learning_rate * g / (s.sqrt() + EPS);
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
        let mut opt = Adagrad::new(&info(3), no_decay(1.0));
        assert!(distance_after_steps(&mut opt, 1000) < 0.1);
    }
}
