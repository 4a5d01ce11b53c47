/// Best validation scores seen so far in one trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestState {
    pub best_f1: f64,
    pub best_loss: f64,
    epochs_seen: usize,
}

impl Default for BestState {
    fn default() -> Self {
        BestState { best_f1: 0.0, best_loss: f64::INFINITY, epochs_seen: 0 }
    }
}

impl BestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in one epoch's validation scores. Returns `true` when the F1
    /// beats every earlier epoch, i.e. the `best` checkpoint must be
    /// rewritten. The first epoch always counts as an improvement.
    pub fn update(&mut self, f1: f64, loss: f64) -> bool {
        self.best_loss = self.best_loss.min(loss);
        let improved = self.epochs_seen == 0 || f1 > self.best_f1;
        if improved {
            self.best_f1 = self.best_f1.max(f1);
        }
        self.epochs_seen += 1;
        improved
    }

    pub fn epochs_seen(&self) -> usize {
        self.epochs_seen
    }
}
