use std::path::PathBuf;
use std::time::Instant;

use rand::{rngs::StdRng, Rng};
use tracing::{debug, info, warn};

use crate::data::labels::LabelTarget;
use crate::data::loader::{Batch, DataLoader};
use crate::data::transform::denormalize;
use crate::error::{Result, TrainError};
use crate::loss::Criterion;
use crate::models::Model;
use crate::optim::{Optimizer, StepLr};
use crate::output::{checkpoint_path, GridCaption, SummaryWriter, BEST_CHECKPOINT, LAST_CHECKPOINT};
use crate::train::best::BestState;
use crate::train::cutmix::{self, CutMix};
use crate::train::epoch_stats::{RunningStats, TrainLogRecord, TrainSummary, ValidationSummary};
use crate::train::metrics::{argmax_rows, count_correct, macro_f1};

/// Images shown in the per-epoch validation grid.
const GRID_IMAGES: usize = 16;

/// How the validation grid is drawn.
pub struct FigureOptions {
    pub label: LabelTarget,
    pub mean: [f64; 3],
    pub std: [f64; 3],
    /// Draw cells at random (with replacement) instead of the first images.
    pub shuffle: bool,
    pub rng: StdRng,
}

/// Everything one trial's epochs operate on. Built by the trial controller
/// and owned by it for the trial's lifetime.
pub struct EpochRunner {
    pub model: Box<dyn Model>,
    pub optimizer: Box<dyn Optimizer>,
    /// `None` leaves the learning rate fixed.
    pub scheduler: Option<StepLr>,
    pub criterion: Box<dyn Criterion>,
    pub cutmix: CutMix,
    pub train_loader: DataLoader,
    pub val_loader: DataLoader,
    pub writer: SummaryWriter,
    pub best: BestState,
    pub figure: FigureOptions,
    pub log_interval: usize,
    pub out_dir: PathBuf,
}

impl EpochRunner {
    /// Training pass, LR schedule, validation pass.
    pub fn run_epoch(&mut self, epoch: usize) -> Result<ValidationSummary> {
        let started = Instant::now();
        let train = self.train_epoch(epoch)?;

        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.step(self.optimizer.as_mut());
        }

        let val = self.validate_epoch(epoch)?;
        info!(
            epoch,
            train_batches = train.batches,
            val_loss = val.loss,
            val_accuracy = val.accuracy,
            val_f1 = val.f1,
            best_f1 = self.best.best_f1,
            best_loss = self.best.best_loss,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "epoch finished"
        );
        Ok(val)
    }

    // -----------------------------------------------------------------------
    // Training
    // -----------------------------------------------------------------------

    pub fn train_epoch(&mut self, epoch: usize) -> Result<TrainSummary> {
        let n_batches = self.train_loader.len();
        if n_batches == 0 {
            warn!(epoch, batch_size = self.train_loader.batch_size(), "training split is smaller than one batch");
        }

        let mut stats = RunningStats::default();
        let mut summary = TrainSummary::default();

        for (idx, batch) in self.train_loader.iter(epoch).enumerate() {
            let mut batch = batch?;
            let (loss, correct, f1) = self.train_step(epoch, idx, &mut batch)?;
            stats.record(loss, correct, f1, batch.len());
            summary.batches += 1;
            summary.samples += batch.len();

            if (idx + 1) % self.log_interval == 0 {
                let record = TrainLogRecord {
                    epoch,
                    batch: idx,
                    loss: stats.mean_loss(),
                    accuracy: stats.accuracy(),
                    f1: stats.mean_f1(),
                    lr: self.optimizer.learning_rate(),
                };
                info!(
                    "Epoch[{}]({}/{}) || training loss {:.4} || training accuracy {:4.2}% || train f1 {:.4} || lr {}",
                    epoch, idx + 1, n_batches, record.loss, record.accuracy * 100.0, record.f1, record.lr
                );
                let step = epoch * n_batches + idx;
                self.writer.add_scalar("Train/loss", record.loss, step)?;
                self.writer.add_scalar("Train/accuracy", record.accuracy, step)?;
                self.writer.add_scalar("Train/f1", record.f1, step)?;
                self.writer.add_scalar("Train/lr", record.lr, step)?;
                summary.logs.push(record);
                stats.reset();
            }
        }
        Ok(summary)
    }

    /// One optimization step. Returns `(loss, correct, macro F1)` of the batch.
    fn train_step(&mut self, epoch: usize, idx: usize, batch: &mut Batch) -> Result<(f64, usize, f64)> {
        self.model.zero_grad();

        let plan = self.cutmix.plan(batch.len(), batch.shape);
        if let Some(plan) = &plan {
            cutmix::apply(plan, batch);
            debug!(epoch, batch = idx, lambda = plan.lambda, rows = ?(plan.strip.y1, plan.strip.y2), "cutmix");
        }

        let logits = self.model.forward(&batch.inputs);
        check_labels(&batch.labels, logits.cols)?;
        let loss = cutmix::mixed_loss(self.criterion.as_ref(), &logits, &batch.labels, plan.as_ref());
        if !loss.value.is_finite() {
            return Err(TrainError::NonFiniteLoss { epoch, batch: idx, value: loss.value });
        }

        self.model.backward(&loss.grad);
        self.optimizer.step(self.model.trainable_parameters())?;

        let preds = argmax_rows(&logits);
        Ok((loss.value, count_correct(&preds, &batch.labels), macro_f1(&preds, &batch.labels)))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate_epoch(&mut self, epoch: usize) -> Result<ValidationSummary> {
        info!(epoch, "calculating validation results");
        let mut stats = RunningStats::default();
        let mut figure_drawn = false;

        for (idx, batch) in self.val_loader.iter(epoch).enumerate() {
            let batch = batch?;
            let logits = self.model.predict(&batch.inputs);
            check_labels(&batch.labels, logits.cols)?;
            let loss = self.criterion.value(&logits, &batch.labels);
            if !loss.is_finite() {
                return Err(TrainError::NonFiniteLoss { epoch, batch: idx, value: loss });
            }
            let preds = argmax_rows(&logits);
            stats.record(loss, count_correct(&preds, &batch.labels), macro_f1(&preds, &batch.labels), batch.len());

            if !figure_drawn {
                self.draw_figure(epoch, &batch, &preds)?;
                figure_drawn = true;
            }
        }

        let loss = if stats.batches == 0 {
            warn!(epoch, batch_size = self.val_loader.batch_size(), "validation split is smaller than one batch");
            f64::INFINITY
        } else {
            stats.mean_loss()
        };
        let accuracy = stats.accuracy();
        let f1 = stats.mean_f1();

        let improved = self.best.update(f1, loss);
        if improved {
            info!(epoch, f1, "new best model on validation F1, saving");
            self.model.save(&checkpoint_path(&self.out_dir, BEST_CHECKPOINT))?;
        }
        self.model.save(&checkpoint_path(&self.out_dir, LAST_CHECKPOINT))?;

        info!(
            "[Val] acc : {:4.2}%, loss: {:.4}, f1: {:.4} || best f1 : {:.4}, best loss: {:.4}",
            accuracy * 100.0, loss, f1, self.best.best_f1, self.best.best_loss
        );
        self.writer.add_scalar("Val/loss", loss, epoch)?;
        self.writer.add_scalar("Val/accuracy", accuracy, epoch)?;
        self.writer.add_scalar("Val/f1", f1, epoch)?;

        Ok(ValidationSummary { epoch, loss, accuracy, f1, samples: stats.samples, improved })
    }

    fn draw_figure(&mut self, epoch: usize, batch: &Batch, preds: &[usize]) -> Result<()> {
        let n = GRID_IMAGES.min(batch.len());
        let picks: Vec<usize> = if self.figure.shuffle {
            (0..n).map(|_| self.figure.rng.gen_range(0..batch.len())).collect()
        } else {
            (0..n).collect()
        };

        let row_len = batch.shape.numel();
        let mut images = Vec::with_capacity(n);
        let mut captions = Vec::with_capacity(n);
        for (cell, &i) in picks.iter().enumerate() {
            let tensor = &batch.inputs.data[i * row_len..(i + 1) * row_len];
            images.push(denormalize(tensor, batch.shape, &self.figure.mean, &self.figure.std));

            let (gt, pred) = (batch.labels[i], preds[i]);
            let text = self.figure.label.describe(gt).iter()
                .zip(self.figure.label.describe(pred))
                .map(|((task, gt_label), (_, pred_label))| format!("{task} - gt: {gt_label}, pred: {pred_label}"))
                .collect::<Vec<_>>()
                .join("\n");
            captions.push(GridCaption { cell, ground_truth: gt, prediction: pred, text });
        }

        self.writer.add_image_grid(epoch, &images, &captions)?;
        Ok(())
    }
}

/// Rejects labels the model has no logit for.
fn check_labels(labels: &[usize], classes: usize) -> Result<()> {
    match labels.iter().find(|&&label| label >= classes) {
        Some(label) => Err(TrainError::Data(format!("label {label} out of range for {classes} classes"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_must_index_a_logit() {
        assert!(check_labels(&[0, 2, 1], 3).is_ok());
        match check_labels(&[0, 3], 3) {
            Err(TrainError::Data(msg)) => assert_eq!(msg, "label 3 out of range for 3 classes"),
            other => panic!("expected a data error, got {other:?}"),
        }
    }
}
