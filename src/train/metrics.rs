use std::collections::BTreeSet;

use crate::math::matrix::Matrix;

/// Index of the maximum element in each row. Ties resolve to the lowest index.
pub fn argmax_rows(logits: &Matrix) -> Vec<usize> {
    (0..logits.rows)
        .map(|r| {
            logits.row(r).iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
                .0
        })
        .collect()
}

pub fn count_correct(preds: &[usize], labels: &[usize]) -> usize {
    preds.iter().zip(labels).filter(|(p, l)| p == l).count()
}

/// Unweighted mean of per-class F1 over every class that occurs in either
/// `preds` or `labels`. A class with no true positives scores 0.
pub fn macro_f1(preds: &[usize], labels: &[usize]) -> f64 {
    let classes: BTreeSet<usize> = preds.iter().chain(labels).copied().collect();
    if classes.is_empty() {
        return 0.0;
    }

    let total: f64 = classes.iter()
        .map(|&c| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&p, &l) in preds.iter().zip(labels) {
                match (p == c, l == c) {
                    (true, true) => tp += 1,
                    (true, false) => fp += 1,
                    (false, true) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fn_;
            if denom == 0 { 0.0 } else { 2.0 * tp as f64 / denom as f64 }
        })
        .sum();

    total / classes.len() as f64
}
