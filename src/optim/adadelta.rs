use crate::error::Result;
use crate::models::{ParamInfo, ParamMut};
use crate::optim::{check_shapes, zero_state, Optimizer, OptimizerArgs};

const RHO: f64 = 0.9;
const EPS: f64 = 1e-6;

/// Adadelta: step sizes come from the ratio of running RMS of past updates
/// to running RMS of gradients, scaled by `lr`.
pub struct Adadelta {
    learning_rate: f64,
    weight_decay: f64,
    square_avg: Vec<Vec<f64>>,
    acc_delta: Vec<Vec<f64>>,
}

impl Adadelta {
    pub fn new(params: &[ParamInfo], args: OptimizerArgs) -> Adadelta {
        Adadelta {
            learning_rate: args.lr,
            weight_decay: args.weight_decay,
            square_avg: zero_state(params),
            acc_delta: zero_state(params),
        }
    }
}

impl Optimizer for Adadelta {
    fn name(&self) -> &'static str {
        "Adadelta"
    }

    fn step(&mut self, params: Vec<ParamMut<'_>>) -> Result<()> {
        check_shapes(&self.square_avg, &params)?;
        let buffers = self.square_avg.iter_mut().zip(self.acc_delta.iter_mut());
        for (ParamMut { values, grads, .. }, (sq, acc)) in params.into_iter().zip(buffers) {
            for i in 0..values.len() {
                let g = grads[i] + self.weight_decay * values[i];
                sq[i] = RHO * sq[i] + (1.0 - RHO) * g * g;
                let delta = (acc[i] + EPS).sqrt() / (sq[i] + EPS).sqrt() * g;
                acc[i] = RHO * acc[i] + (1.0 - RHO) * delta * delta;
                values[i] -= self.learning_rate * delta;
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
