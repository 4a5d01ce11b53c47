use crate::error::Result;
use crate::models::{ParamInfo, ParamMut};
use crate::optim::{check_shapes, zero_state, Optimizer, OptimizerArgs};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPS: f64 = 1e-8;

/// Adam with bias correction. With `decoupled` set it becomes AdamW: weight
/// decay shrinks the parameters directly instead of joining the gradient.
pub struct Adam {
    learning_rate: f64,
    weight_decay: f64,
    decoupled: bool,
    t: i32,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
    pub fn new(params: &[ParamInfo], args: OptimizerArgs) -> Adam {
        Adam {
            learning_rate: args.lr,
            weight_decay: args.weight_decay,
            decoupled: false,
            t: 0,
            m: zero_state(params),
            v: zero_state(params),
        }
    }

    pub fn adamw(params: &[ParamInfo], args: OptimizerArgs) -> Adam {
        Adam { decoupled: true, ..Adam::new(params, args) }
    }
}

impl Optimizer for Adam {
    fn name(&self) -> &'static str {
        if self.decoupled { "AdamW" } else { "Adam" }
    }

    fn step(&mut self, params: Vec<ParamMut<'_>>) -> Result<()> {
        check_shapes(&self.m, &params)?;
        self.t += 1;
        let bc1 = 1.0 - BETA1.powi(self.t);
        let bc2 = 1.0 - BETA2.powi(self.t);
        let lr = self.learning_rate;

        for ((ParamMut { values, grads, .. }, m), v) in params.into_iter().zip(&mut self.m).zip(&mut self.v) {
            for i in 0..values.len() {
                let x = &mut values[i];
                let mut g = grads[i];
                if self.decoupled {
                    *x *= 1.0 - lr * self.weight_decay;
                } else {
                    g += self.weight_decay * *x;
                }
                m[i] = BETA1 * m[i] + (1.0 - BETA1) * g;
                v[i] = BETA2 * v[i] + (1.0 - BETA2) * g * g;
                let m_hat = m[i] / bc1;
                let v_hat = v[i] / bc2;
                *x -= lr * m_hat / (v_hat.sqrt() + EPS);
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
