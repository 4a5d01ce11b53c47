pub mod cross_entropy;
pub mod f1;
pub mod focal;
pub mod label_smoothing;
pub mod loss_type;

pub use cross_entropy::CrossEntropyLoss;
pub use f1::F1Loss;
pub use focal::FocalLoss;
pub use label_smoothing::LabelSmoothingLoss;
pub use loss_type::LossType;

use crate::math::matrix::Matrix;

/// Batch loss and its gradient with respect to the logits.
#[derive(Debug, Clone)]
pub struct LossOutput {
    /// Mean loss over the batch.
    pub value: f64,
    /// ∂value/∂logits, `n × num_classes`.
    pub grad: Matrix,
}

/// A loss function over raw logits and integer class labels.
pub trait Criterion: Send + Sync {
    fn name(&self) -> &'static str;

    fn compute(&self, logits: &Matrix, labels: &[usize]) -> LossOutput;

    fn value(&self, logits: &Matrix, labels: &[usize]) -> f64 {
        self.compute(logits, labels).value
    }
}

/// Row-wise softmax, shifted by the row max for stability.
pub fn softmax(logits: &Matrix) -> Matrix {
    let mut out = logits.clone();
    for r in 0..out.rows {
        let row = &mut out.data[r * out.cols..(r + 1) * out.cols];
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for x in row.iter_mut() {
            *x = (*x - max).exp();
            sum += *x;
        }
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
    out
}

/// Row-wise log-softmax.
pub fn log_softmax(logits: &Matrix) -> Matrix {
    let mut out = logits.clone();
    for r in 0..out.rows {
        let row = &mut out.data[r * out.cols..(r + 1) * out.cols];
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let lse = max + row.iter().map(|x| (x - max).exp()).sum::<f64>().ln();
        for x in row.iter_mut() {
            *x -= lse;
        }
    }
    out
}
