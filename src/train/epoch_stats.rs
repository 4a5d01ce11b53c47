use serde::{Serialize, Deserialize};

/// Running sums over a window of batches.
///
/// Training resets the window every `log_interval` batches; validation keeps
/// one window for the whole split.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    pub loss_sum: f64,
    pub correct: usize,
    pub f1_sum: f64,
    pub batches: usize,
    pub samples: usize,
}

impl RunningStats {
    pub fn record(&mut self, loss: f64, correct: usize, f1: f64, batch_len: usize) {
        self.loss_sum += loss;
        self.correct += correct;
        self.f1_sum += f1;
        self.batches += 1;
        self.samples += batch_len;
    }

    pub fn reset(&mut self) {
        *self = RunningStats::default();
    }

    /// Mean loss per batch.
    pub fn mean_loss(&self) -> f64 {
        if self.batches == 0 { 0.0 } else { self.loss_sum / self.batches as f64 }
    }

    /// Mean F1 per batch.
    pub fn mean_f1(&self) -> f64 {
        if self.batches == 0 { 0.0 } else { self.f1_sum / self.batches as f64 }
    }

    /// Correct predictions per sample seen.
    pub fn accuracy(&self) -> f64 {
        if self.samples == 0 { 0.0 } else { self.correct as f64 / self.samples as f64 }
    }
}

/// One periodic training log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainLogRecord {
    /// 0-based epoch.
    pub epoch: usize,
    /// 0-based index of the batch that closed the window.
    pub batch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub f1: f64,
    pub lr: f64,
}

/// What one training pass reports.
#[derive(Debug, Clone, Default)]
pub struct TrainSummary {
    pub batches: usize,
    pub samples: usize,
    pub logs: Vec<TrainLogRecord>,
}

/// Averages of one validation pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub epoch: usize,
    pub loss: f64,
    /// Correct predictions over `samples`, the images in full batches. The
    /// trailing partial batch is never evaluated, so this is not divided by
    /// the split size.
    pub accuracy: f64,
    pub f1: f64,
    pub samples: usize,
    /// Whether this epoch produced a new `best` checkpoint.
    pub improved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_follow_their_denominators() {
        let mut s = RunningStats::default();
        s.record(2.0, 3, 0.5, 4);
        s.record(1.0, 1, 0.25, 4);
        assert_eq!(s.mean_loss(), 1.5);
        assert_eq!(s.mean_f1(), 0.375);
        assert_eq!(s.accuracy(), 0.5);
        s.reset();
        assert_eq!(s, RunningStats::default());
        assert_eq!(s.accuracy(), 0.0);
    }
}
