use crate::loss::{log_softmax, softmax, Criterion, LossOutput};
use crate::math::matrix::Matrix;

/// Categorical cross-entropy on logits, averaged over the batch.
pub struct CrossEntropyLoss;

impl Criterion for CrossEntropyLoss {
    fn name(&self) -> &'static str {
        "cross_entropy"
    }

    /// L = -mean_i log softmax(z_i)[y_i]
    ///
    /// The combined softmax + cross-entropy gradient simplifies to
    /// `(p - onehot(y)) / n`.
    fn compute(&self, logits: &Matrix, labels: &[usize]) -> LossOutput {
        let n = logits.rows as f64;
        let log_p = log_softmax(logits);
        let mut grad = softmax(logits);

        let mut value = 0.0;
        for (i, &y) in labels.iter().enumerate() {
            value -= log_p.get(i, y);
            grad.data[i * grad.cols + y] -= 1.0;
        }
        grad.data.iter_mut().for_each(|g| *g /= n);

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
        assert_gradient(&CrossEntropyLoss, &logits, &labels);
    }

    #[test]
    fn uniform_logits_give_log_k() {
        let logits = Matrix::zeros(2, 4);
        let v = CrossEntropyLoss.value(&logits, &[0, 3]);
        assert!((v - 4f64.ln()).abs() < 1e-12);
    }
}
