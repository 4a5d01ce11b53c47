//! CutMix on horizontal strips.
//!
//! When it fires, a band of rows spanning the full image width is copied into
//! every image from another image of the same batch, and the loss is blended
//! between the original and the donor labels by the share of area kept.

use rand::{rngs::StdRng, seq::SliceRandom, Rng};
use rand_distr::{Beta, Distribution};

use crate::data::loader::Batch;
use crate::data::transform::ImageShape;
use crate::error::{Result, TrainError};
use crate::loss::{Criterion, LossOutput};
use crate::math::matrix::Matrix;

/// Rows `[y1, y2)` across the full width. `y1 == y2` is a legal empty strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strip {
    pub y1: usize,
    pub y2: usize,
}

impl Strip {
    pub fn height(&self) -> usize {
        self.y2 - self.y1
    }
}

/// Everything one CutMix application decided.
#[derive(Debug, Clone, PartialEq)]
pub struct MixPlan {
    /// `permutation[i]` donates the strip pasted into image `i`.
    pub permutation: Vec<usize>,
    pub strip: Strip,
    /// Effective weight of the original labels: `1 - strip area / image area`.
    pub lambda: f64,
}

/// Strip of height `floor(height · sqrt(1 - λ))` centred on row `cy`,
/// clamped to the image.
pub fn strip_region(height: usize, lambda: f64, cy: usize) -> Strip {
    let cut_h = (height as f64 * (1.0 - lambda).max(0.0).sqrt()) as i64;
    let h = height as i64;
    let cy = cy as i64;
    let y1 = (cy - cut_h / 2).clamp(0, h);
    let y2 = (cy + cut_h / 2).clamp(0, h);
    Strip { y1: y1 as usize, y2: y2 as usize }
}

/// `1 - strip area / image area` for a full-width strip.
pub fn effective_lambda(strip: Strip, height: usize) -> f64 {
    if height == 0 {
        return 1.0;
    }
    1.0 - strip.height() as f64 / height as f64
}

pub struct CutMix {
    beta: f64,
    dist: Option<Beta<f64>>,
    rng: StdRng,
}

impl CutMix {
    /// `beta <= 0` disables the policy; it then never draws from `rng`.
    pub fn new(beta: f64, rng: StdRng) -> Result<CutMix> {
        let dist = if beta > 0.0 {
            Some(Beta::new(beta, beta).map_err(|e| TrainError::Config(format!("cutmix beta {beta}: {e}")))?)
        } else {
            None
        };
        Ok(CutMix { beta, dist, rng })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn enabled(&self) -> bool {
        self.dist.is_some()
    }

    /// Flips the coin and, on success, draws λ, the permutation and the strip.
    pub fn plan(&mut self, batch_len: usize, shape: ImageShape) -> Option<MixPlan> {
        let dist = self.dist.as_ref()?;
        if self.rng.gen::<f64>() <= 0.5 {
            return None;
        }

        let lambda = dist.sample(&mut self.rng);
        let mut permutation: Vec<usize> = (0..batch_len).collect();
        permutation.shuffle(&mut self.rng);
        let cy = if shape.height == 0 { 0 } else { self.rng.gen_range(0..shape.height) };

        let strip = strip_region(shape.height, lambda, cy);
        Some(MixPlan { permutation, strip, lambda: effective_lambda(strip, shape.height) })
    }
}

/// Pastes each donor's strip into the batch in place. Donor pixels are read
/// from the batch as it was before any pasting.
pub fn apply(plan: &MixPlan, batch: &mut Batch) {
    if plan.strip.height() == 0 {
        return;
    }
    let shape = batch.shape;
    let source = batch.inputs.clone();
    let row_len = shape.numel();

    for (i, &donor) in plan.permutation.iter().enumerate() {
        for c in 0..shape.channels {
            let start = shape.index(c, plan.strip.y1, 0);
            let end = shape.index(c, plan.strip.y2 - 1, shape.width - 1) + 1;
            let dst = &mut batch.inputs.data[i * row_len + start..i * row_len + end];
            dst.copy_from_slice(&source.data[donor * row_len + start..donor * row_len + end]);
        }
    }
}

/// Loss against the labels, blended with the donors' labels when a plan is
/// given: `λ · L(y) + (1 - λ) · L(y[perm])`.
pub fn mixed_loss(criterion: &dyn Criterion, logits: &Matrix, labels: &[usize], plan: Option<&MixPlan>) -> LossOutput {
    let Some(plan) = plan else {
        return criterion.compute(logits, labels);
    };

    let donor_labels: Vec<usize> = plan.permutation.iter().map(|&j| labels[j]).collect();
    let a = criterion.compute(logits, labels);
    let b = criterion.compute(logits, &donor_labels);
    let lambda = plan.lambda;

    let mut grad = a.grad;
    for (g, gb) in grad.data.iter_mut().zip(&b.grad.data) {
        *g = lambda * *g + (1.0 - lambda) * gb;
    }
    LossOutput { value: lambda * a.value + (1.0 - lambda) * b.value, grad }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::CrossEntropyLoss;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn batch(n: usize, shape: ImageShape) -> Batch {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64; shape.numel()]).collect();
        Batch { inputs: Matrix::from_rows(&rows), labels: (0..n).map(|i| i % 3).collect(), shape }
    }

    #[test]
    fn zero_height_strip_keeps_lambda_one() {
        let strip = strip_region(16, 1.0, 5);
        assert_eq!(strip.height(), 0);
        assert_eq!(effective_lambda(strip, 16), 1.0);
    }

    #[test]
    fn strip_clamps_at_edges() {
        // λ = 0 asks for the whole image; centred on row 0 half of it is cut.
        assert_eq!(strip_region(10, 0.0, 0), Strip { y1: 0, y2: 5 });
        assert_eq!(strip_region(10, 0.0, 9), Strip { y1: 4, y2: 10 });
    }

    #[test]
    fn apply_pastes_donor_rows_only() {
        let shape = ImageShape::rgb(4, 2);
        let mut b = batch(2, shape);
        let plan = MixPlan { permutation: vec![1, 0], strip: Strip { y1: 1, y2: 3 }, lambda: 0.5 };
        apply(&plan, &mut b);
        for c in 0..3 {
            for y in 0..4 {
                for x in 0..2 {
                    let expect = if (1..3).contains(&y) { 1.0 } else { 0.0 };
                    assert_eq!(b.inputs.get(0, shape.index(c, y, x)), expect);
                }
            }
        }
    }

    #[test]
    fn mixed_loss_blends_both_targets() {
        let logits = Matrix::from_rows(&[vec![2.0, 0.0, -1.0], vec![0.0, 1.0, 0.5]]);
        let labels = [0, 1];
        let plan = MixPlan { permutation: vec![1, 0], strip: Strip { y1: 0, y2: 1 }, lambda: 0.25 };
        let mixed = mixed_loss(&CrossEntropyLoss, &logits, &labels, Some(&plan));
        let a = CrossEntropyLoss.value(&logits, &[0, 1]);
        let b = CrossEntropyLoss.value(&logits, &[1, 0]);
        assert!((mixed.value - (0.25 * a + 0.75 * b)).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn disabled_policy_is_identity(beta in -5.0f64..=0.0, seed in any::<u64>(), n in 1usize..6) {
            let shape = ImageShape::rgb(5, 3);
            let mut cutmix = CutMix::new(beta, StdRng::seed_from_u64(seed)).unwrap();
            let original = batch(n, shape);
            let mut b = original.clone();
            let plan = cutmix.plan(n, shape);
            prop_assert!(plan.is_none());
            if let Some(p) = &plan { apply(p, &mut b); }
            prop_assert_eq!(&b.inputs, &original.inputs);

            let logits = Matrix::from_rows(&(0..n).map(|i| vec![i as f64, 0.5, -0.5]).collect::<Vec<_>>());
            let direct = CrossEntropyLoss.value(&logits, &original.labels);
            prop_assert_eq!(mixed_loss(&CrossEntropyLoss, &logits, &b.labels, plan.as_ref()).value, direct);
        }

        #[test]
        fn fixed_seed_reproduces_plans(beta in 0.05f64..5.0, seed in any::<u64>(), n in 1usize..8, h in 1usize..40) {
            let shape = ImageShape::rgb(h, 2);
            let mut a = CutMix::new(beta, StdRng::seed_from_u64(seed)).unwrap();
            let mut b = CutMix::new(beta, StdRng::seed_from_u64(seed)).unwrap();
            for _ in 0..4 {
                prop_assert_eq!(a.plan(n, shape), b.plan(n, shape));
            }
        }

        #[test]
        fn lambda_stays_in_unit_interval(beta in 0.05f64..5.0, seed in any::<u64>(), h in 1usize..64) {
            let shape = ImageShape::rgb(h, 1);
            let mut cutmix = CutMix::new(beta, StdRng::seed_from_u64(seed)).unwrap();
            for _ in 0..8 {
                if let Some(p) = cutmix.plan(3, shape) {
                    prop_assert!((0.0..=1.0).contains(&p.lambda));
                    prop_assert!(p.strip.y2 <= h);
                    let mut perm = p.permutation.clone();
                    perm.sort_unstable();
                    prop_assert_eq!(perm, vec![0, 1, 2]);
                }
            }
        }
    }
}
