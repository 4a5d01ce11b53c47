use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully connected layer operating on a whole batch at once.
///
/// Weights are `input_size × size`; a forward pass maps `n × input_size`
/// to `n × size`. Gradients accumulate across `backward` calls until
/// `zero_grad` is called, mirroring the optimizer contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
    /// Frozen layers still run forward but never receive gradients and are
    /// filtered out before the optimizer sees the parameter set.
    pub trainable: bool,
    #[serde(skip)]
    input: Matrix,
    #[serde(skip)]
    pre_activation: Matrix,
    #[serde(skip)]
    weights_grad: Matrix,
    #[serde(skip)]
    biases_grad: Matrix,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        size: usize,
        activation: ActivationFunction,
        trainable: bool,
        rng: &mut R,
    ) -> Layer {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };

        Layer {
            size,
            weights,
            biases: Matrix::zeros(1, size),
            activator: activation,
            trainable,
            input: Matrix::default(),
            pre_activation: Matrix::default(),
            weights_grad: Matrix::zeros(input_size, size),
            biases_grad: Matrix::zeros(1, size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// Forward pass that caches what `backward` needs.
    pub fn feed_from(&mut self, input: &Matrix) -> Matrix {
        let z = self.linear(input);
        let a = self.activator.apply(&z);
        self.input = input.clone();
        self.pre_activation = z;
        a
    }

    /// Forward pass with no caching (evaluation mode).
    pub fn infer(&self, input: &Matrix) -> Matrix {
        self.activator.apply(&self.linear(input))
    }

    fn linear(&self, input: &Matrix) -> Matrix {
        let mut z = input.matmul(&self.weights);
        z.add_row_broadcast(&self.biases);
        z
    }

    /// Accumulates parameter gradients from `grad_out` (∂L/∂a) and returns
    /// ∂L/∂input when `needs_input_grad` is set.
    pub fn backward(&mut self, grad_out: &Matrix, needs_input_grad: bool) -> Option<Matrix> {
        let delta = self.activator.backward(&self.pre_activation, grad_out);

        if self.trainable {
            self.ensure_grad_buffers();
            self.weights_grad.add_assign(&self.input.t_matmul(&delta));
            self.biases_grad.add_assign(&delta.sum_rows());
        }

        if needs_input_grad {
            Some(delta.matmul_t(&self.weights))
        } else {
            None
        }
    }

    pub fn zero_grad(&mut self) {
        self.ensure_grad_buffers();
        self.weights_grad.fill(0.0);
        self.biases_grad.fill(0.0);
    }

    // Deserialized layers come back with empty grad buffers.
    fn ensure_grad_buffers(&mut self) {
        if self.weights_grad.data.len() != self.weights.data.len() {
            self.weights_grad = Matrix::zeros(self.weights.rows, self.weights.cols);
        }
        if self.biases_grad.data.len() != self.biases.data.len() {
            self.biases_grad = Matrix::zeros(self.biases.rows, self.biases.cols);
        }
    }

    /// `(weights, weights_grad)` and `(biases, biases_grad)` slices.
    pub fn params_mut(&mut self) -> [(&mut [f64], &[f64]); 2] {
        self.ensure_grad_buffers();
        [
            (&mut self.weights.data[..], &self.weights_grad.data[..]),
            (&mut self.biases.data[..], &self.biases_grad.data[..]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn backward_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Layer::new(3, 2, ActivationFunction::Tanh, true, &mut rng);
        let x = Matrix::from_rows(&[vec![0.2, -0.4, 0.9], vec![1.0, 0.1, -0.3]]);

        // L = sum(a)
        let loss = |l: &Layer| l.infer(&x).data.iter().sum::<f64>();

        layer.zero_grad();
        let a = layer.feed_from(&x);
        let ones = a.map(|_| 1.0);
        layer.backward(&ones, false);

        let h = 1e-6;
        let analytic = layer.weights_grad.data.clone();
        for idx in 0..layer.weights.data.len() {
            let mut plus = layer.clone();
            plus.weights.data[idx] += h;
            let mut minus = layer.clone();
            minus.weights.data[idx] -= h;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
            assert!((numeric - analytic[idx]).abs() < 1e-5);
        }
    }

    #[test]
    fn frozen_layer_accumulates_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Layer::new(2, 2, ActivationFunction::ReLU, false, &mut rng);
        layer.zero_grad();
        let x = Matrix::from_rows(&[vec![1.0, 1.0]]);
        let a = layer.feed_from(&x);
        let grad_in = layer.backward(&a.map(|_| 1.0), true);
        assert!(grad_in.is_some());
        assert!(layer.weights_grad.data.iter().all(|&g| g == 0.0));
    }
}
