use crate::optim::Optimizer;

/// Decays the learning rate by `gamma` every `step_size` epochs.
///
/// `step` is called once per completed epoch; the rate after `e` calls is
/// `base_lr · gamma^(e / step_size)`.
#[derive(Debug, Clone)]
pub struct StepLr {
    base_lr: f64,
    step_size: usize,
    gamma: f64,
    last_epoch: usize,
}

impl StepLr {
    pub fn new(optimizer: &dyn Optimizer, step_size: usize, gamma: f64) -> StepLr {
        StepLr { base_lr: optimizer.learning_rate(), step_size: step_size.max(1), gamma, last_epoch: 0 }
    }

    pub fn step(&mut self, optimizer: &mut dyn Optimizer) {
        self.last_epoch += 1;
        let lr = self.base_lr * self.gamma.powi((self.last_epoch / self.step_size) as i32);
        optimizer.set_learning_rate(lr);
    }

    pub fn last_epoch(&self) -> usize {
        self.last_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::testing::{info, no_decay};
    use crate::optim::Sgd;

    #[test]
    fn halves_every_two_epochs() {
        let mut opt = Sgd::new(&info(1), no_decay(1.0));
        let mut sched = StepLr::new(&opt, 2, 0.5);
        let mut seen = Vec::new();
        for _ in 0..5 {
            sched.step(&mut opt);
            seen.push(opt.learning_rate());
        }
        assert_eq!(seen, vec![1.0, 0.5, 0.5, 0.25, 0.25]);
    }
}
