use crate::loss::{softmax, Criterion, LossOutput};
use crate::math::matrix::Matrix;

const EPS: f64 = 1e-7;

/// Differentiable macro F1: `1 - mean_c soft_f1_c` with softmax
/// probabilities standing in for hard predictions.
///
/// Per class, `tp + fn` is the class count `n_c` and `tp + fp` is the summed
/// probability `s_c`, so `f1_c = 2 tp_c / (s_c + n_c + ε)`.
pub struct F1Loss;

impl Criterion for F1Loss {
    fn name(&self) -> &'static str {
        "f1"
    }

    fn compute(&self, logits: &Matrix, labels: &[usize]) -> LossOutput {
        let k = logits.cols;
        let p = softmax(logits);

        let mut tp = vec![0.0; k];
        let mut count = vec![0.0; k];
        let s = p.sum_rows().data;
        for (i, &y) in labels.iter().enumerate() {
            tp[y] += p.get(i, y);
            count[y] += 1.0;
        }

        let denom: Vec<f64> = (0..k).map(|c| s[c] + count[c] + EPS).collect();
        let mean_f1 = (0..k).map(|c| 2.0 * tp[c] / denom[c]).sum::<f64>() / k as f64;

        // ∂L/∂p_ic, then through the softmax Jacobian row by row.
        let mut grad = Matrix::zeros(logits.rows, k);
        for (i, &y) in labels.iter().enumerate() {
            let dp: Vec<f64> = (0..k)
                .map(|c| {
                    let y_ic = if c == y { 1.0 } else { 0.0 };
                    -(2.0 * y_ic / denom[c] - 2.0 * tp[c] / (denom[c] * denom[c])) / k as f64
                })
                .collect();
            let dot: f64 = (0..k).map(|c| dp[c] * p.get(i, c)).sum();
            for j in 0..k {
                grad.data[i * k + j] = p.get(i, j) * (dp[j] - dot);
            }
        }

        LossOutput { value: 1.0 - mean_f1, grad }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::grad_check::{assert_gradient, sample_logits};

    #[test]
    fn gradient_is_correct() {
        let (logits, labels) = sample_logits();
        assert_gradient(&F1Loss, &logits, &labels);
    }

    #[test]
    fn confident_correct_logits_approach_zero() {
        let logits = Matrix::from_rows(&[vec![30.0, 0.0], vec![0.0, 30.0]]);
        assert!(F1Loss.value(&logits, &[0, 1]) < 1e-6);
    }
}
