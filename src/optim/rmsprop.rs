use crate::error::Result;
use crate::models::{ParamInfo, ParamMut};
use crate::optim::{check_shapes, zero_state, Optimizer, OptimizerArgs};

const ALPHA: f64 = 0.99;
const EPS: f64 = 1e-8;

/// RMSprop: divides each step by a running RMS of recent gradients.
pub struct RmsProp {
    learning_rate: f64,
    weight_decay: f64,
    square_avg: Vec<Vec<f64>>,
}

impl RmsProp {
    pub fn new(params: &[ParamInfo], args: OptimizerArgs) -> RmsProp {
        RmsProp { learning_rate: args.lr, weight_decay: args.weight_decay, square_avg: zero_state(params) }
    }
}

impl Optimizer for RmsProp {
    fn name(&self) -> &'static str {
        "RMSprop"
    }

    fn step(&mut self, params: Vec<ParamMut<'_>>) -> Result<()> {
        check_shapes(&self.square_avg, &params)?;
        for (ParamMut { values, grads, .. }, sq) in params.into_iter().zip(&mut self.square_avg) {
            for ((x, &g), s) in values.iter_mut().zip(grads).zip(sq.iter_mut()) {
                let g = g + self.weight_decay * *x;
                *s = ALPHA * *s + (1.0 - ALPHA) * g * g;
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
    fn settles_near_optimum() {
        // Step size stays ≈ lr, so it hovers within a few lr of the minimum.
        let mut opt = RmsProp::new(&info(3), no_decay(0.01));
        assert!(distance_after_steps(&mut opt, 3000) < 0.1);
    }
}
