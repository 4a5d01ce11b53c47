use crate::loss::{log_softmax, softmax, Criterion, LossOutput};
use crate::math::matrix::Matrix;

/// Cross-entropy against a smoothed target: `1 - ε` on the true class and
/// `ε / (K - 1)` spread over the others.
pub struct LabelSmoothingLoss {
    pub smoothing: f64,
}

impl Default for LabelSmoothingLoss {
    fn default() -> Self {
        LabelSmoothingLoss { smoothing: 0.1 }
    }
}

impl LabelSmoothingLoss {
    fn target(&self, k: usize, y: usize, j: usize) -> f64 {
        if j == y {
            1.0 - self.smoothing
        } else if k > 1 {
            self.smoothing / (k - 1) as f64
        } else {
            0.0
        }
    }
}

impl Criterion for LabelSmoothingLoss {
    fn name(&self) -> &'static str {
        "label_smoothing"
    }

    fn compute(&self, logits: &Matrix, labels: &[usize]) -> LossOutput {
        let n = logits.rows as f64;
        let k = logits.cols;
        let log_p = log_softmax(logits);
        let mut grad = softmax(logits);
        let mut value = 0.0;

        for (i, &y) in labels.iter().enumerate() {
            for j in 0..k {
                let q = self.target(k, y, j);
                value -= q * log_p.get(i, j);
                grad.data[i * k + j] = (grad.data[i * k + j] - q) / n;
            }
        }

        LossOutput { value: value / n, grad }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::grad_check::{assert_gradient, sample_logits};

    #[test]
    fn gradient_is_correct() {
        let (logits, labels) = sample_logits();
        assert_gradient(&LabelSmoothingLoss::default(), &logits, &labels);
    }
}
