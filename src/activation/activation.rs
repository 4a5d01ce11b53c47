use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::math::matrix::Matrix;

/// Element-wise activations available to hidden layers.
///
/// Output layers use `Identity`: models emit raw logits and the loss
/// strategies apply softmax themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    ReLU,
    Identity,
    Tanh,
    LeakyReLU { alpha: f64 },
    Gelu,
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
        }
    }

    /// Derivative evaluated at the pre-activation `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let t = inner.tanh();
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * d_inner
            }
        }
    }

    pub fn apply(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Identity => z.clone(),
            _ => z.map(|x| self.function(x)),
        }
    }

    /// Pulls an upstream gradient `∂L/∂a` back through the activation: `∂L/∂z`.
    pub fn backward(&self, z: &Matrix, grad_out: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Identity => grad_out.clone(),
            _ => grad_out.hadamard(&z.map(|x| self.derivative(x))),
        }
    }

    /// He init suits rectifiers; Xavier the rest.
    pub fn prefers_he_init(&self) -> bool {
        matches!(self, ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. } | ActivationFunction::Gelu)
    }
}
