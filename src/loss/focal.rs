use crate::loss::{log_softmax, Criterion, LossOutput};
use crate::math::matrix::Matrix;

/// Focal loss: `-(1 - p_t)^γ · log p_t`, averaged over the batch.
pub struct FocalLoss {
    pub gamma: f64,
}

impl Default for FocalLoss {
    fn default() -> Self {
        FocalLoss { gamma: 2.0 }
    }
}

impl Criterion for FocalLoss {
    fn name(&self) -> &'static str {
        "focal"
    }

    fn compute(&self, logits: &Matrix, labels: &[usize]) -> LossOutput {
        let n = logits.rows as f64;
        let k = logits.cols;
        let log_p = log_softmax(logits);
        let mut grad = Matrix::zeros(logits.rows, k);
        let mut value = 0.0;

        for (i, &y) in labels.iter().enumerate() {
            let log_pt = log_p.get(i, y);
            let pt = log_pt.exp();
            let q = 1.0 - pt;
            value -= q.powf(self.gamma) * log_pt;

            // ∂/∂z_j = (δ_yj - p_j) · [γ q^(γ-1) p_t log p_t - q^γ]
            let scale = if self.gamma == 0.0 {
                -1.0
            } else {
                self.gamma * q.powf(self.gamma - 1.0) * pt * log_pt - q.powf(self.gamma)
            };
            for j in 0..k {
                let delta = if j == y { 1.0 } else { 0.0 };
                grad.data[i * k + j] = (delta - log_p.get(i, j).exp()) * scale / n;
            }
        }

        LossOutput { value: value / n, grad }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::cross_entropy::CrossEntropyLoss;
    use crate::loss::grad_check::{assert_gradient, sample_logits};

    #[test]
    fn gradient_is_correct() {
        let (logits, labels) = sample_logits();
        assert_gradient(&FocalLoss::default(), &logits, &labels);
    }

    #[test]
    fn gamma_zero_is_cross_entropy() {
        let (logits, labels) = sample_logits();
        let focal = FocalLoss { gamma: 0.0 }.compute(&logits, &labels);
        let ce = CrossEntropyLoss.compute(&logits, &labels);
        assert!((focal.value - ce.value).abs() < 1e-12);
        for (a, b) in focal.grad.data.iter().zip(&ce.grad.data) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
