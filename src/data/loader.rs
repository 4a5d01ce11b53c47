//! Batching over a dataset split with a bounded prefetch worker pool.

use std::any::Any;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::Dataset;
use crate::data::transform::{ImageShape, Transform};
use crate::error::{Result, TrainError};
use crate::math::matrix::Matrix;
use crate::train::seed::derive_seed;

/// Batches each worker may hold ready before blocking.
const PREFETCH_PER_WORKER: usize = 2;

/// One mini-batch: a row per image (CHW flattened) and its class ids.
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Matrix,
    pub labels: Vec<usize>,
    pub shape: ImageShape,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Loader settings.
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    pub batch_size: usize,
    pub shuffle: bool,
    /// 0 loads on the calling thread.
    pub num_workers: usize,
    /// Base seed for shuffling and per-batch transform draws.
    pub seed: u64,
}

/// Yields `len() / batch_size` full batches per epoch; a trailing partial
/// batch is dropped.
pub struct DataLoader {
    dataset: Arc<dyn Dataset>,
    transform: Arc<dyn Transform>,
    options: LoaderOptions,
}

impl DataLoader {
    pub fn new(dataset: Arc<dyn Dataset>, transform: Arc<dyn Transform>, options: LoaderOptions) -> Self {
        assert!(options.batch_size > 0, "batch_size must be at least 1");
        DataLoader { dataset, transform, options }
    }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        self.dataset.len() / self.options.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.options.batch_size
    }

    /// Number of samples the batches of one epoch cover.
    pub fn samples_per_epoch(&self) -> usize {
        self.len() * self.options.batch_size
    }

    pub fn shape(&self) -> ImageShape {
        self.transform.output_shape()
    }

    /// Index lists of every batch in `epoch`, in delivery order.
    fn plan(&self, epoch: usize) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.options.shuffle {
            let mut rng = StdRng::seed_from_u64(derive_seed(self.options.seed, &[epoch as u64]));
            order.shuffle(&mut rng);
        }
        order
            .chunks_exact(self.options.batch_size)
            .map(|c| c.to_vec())
            .collect()
    }

    pub fn iter(&self, epoch: usize) -> BatchIter {
        let plan = Arc::new(self.plan(epoch));
        let job = BatchJob {
            dataset: self.dataset.clone(),
            transform: self.transform.clone(),
            seed: derive_seed(self.options.seed, &[epoch as u64, u64::MAX]),
        };

        let workers = self.options.num_workers.min(plan.len());
        if workers == 0 {
            return BatchIter { plan, next: 0, inline: Some(job), receivers: Vec::new(), handles: Vec::new() };
        }

        let mut receivers = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for w in 0..workers {
            let (tx, rx) = mpsc::sync_channel(PREFETCH_PER_WORKER);
            let job = job.clone();
            let plan = plan.clone();
            handles.push(Some(thread::spawn(move || job.run_worker(w, workers, &plan, tx))));
            receivers.push(rx);
        }

        BatchIter { plan, next: 0, inline: None, receivers, handles }
    }
}

#[derive(Clone)]
struct BatchJob {
    dataset: Arc<dyn Dataset>,
    transform: Arc<dyn Transform>,
    seed: u64,
}

impl BatchJob {
    fn build(&self, batch_index: usize, indices: &[usize]) -> Result<Batch> {
        // Transform draws depend only on (epoch seed, batch index), never on
        // which worker produced the batch.
        let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, &[batch_index as u64]));
        let shape = self.transform.output_shape();
        let mut inputs = Matrix::zeros(indices.len(), shape.numel());
        let mut labels = Vec::with_capacity(indices.len());

        for (row, &idx) in indices.iter().enumerate() {
            let (image, label) = self.dataset.load(idx)?;
            let tensor = self.transform.apply(&image, &mut rng);
            if tensor.len() != shape.numel() {
                return Err(TrainError::Shape { expected: shape.numel(), actual: tensor.len() });
            }
            inputs.data[row * shape.numel()..(row + 1) * shape.numel()].copy_from_slice(&tensor);
            labels.push(label);
        }

        Ok(Batch { inputs, labels, shape })
    }

    /// Produces batches `w, w + n, w + 2n, ...` until done or the consumer
    /// hangs up.
    fn run_worker(&self, w: usize, n: usize, plan: &[Vec<usize>], tx: SyncSender<Result<Batch>>) {
        for batch_index in (w..plan.len()).step_by(n) {
            let batch = self.build(batch_index, &plan[batch_index]);
            let failed = batch.is_err();
            if tx.send(batch).is_err() || failed {
                return;
            }
        }
    }
}

/// Iterator over one epoch's batches. Dropping it stops the workers.
pub struct BatchIter {
    plan: Arc<Vec<Vec<usize>>>,
    next: usize,
    inline: Option<BatchJob>,
    receivers: Vec<Receiver<Result<Batch>>>,
    handles: Vec<Option<JoinHandle<()>>>,
}

impl BatchIter {
    /// Joins worker `w` after its channel closed before delivering every
    /// batch it owed, and turns the exit into an error.
    fn worker_failure(&mut self, w: usize) -> TrainError {
        let reason = match self.handles[w].take().map(JoinHandle::join) {
            Some(Err(payload)) => format!("panicked: {}", panic_message(payload.as_ref())),
            _ => "exited early".to_string(),
        };
        TrainError::Data(format!("loader worker {w} {reason}"))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl Iterator for BatchIter {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.plan.len() {
            return None;
        }
        let i = self.next;
        self.next += 1;

        match &self.inline {
            Some(job) => Some(job.build(i, &self.plan[i])),
            // Round-robin matches the workers' striding, so order is fixed.
            None => {
                let w = i % self.receivers.len();
                match self.receivers[w].recv() {
                    Ok(batch) => Some(batch),
                    Err(_) => {
                        self.next = self.plan.len();
                        Some(Err(self.worker_failure(w)))
                    }
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.plan.len() - self.next;
        (left, Some(left))
    }
}

impl Drop for BatchIter {
    fn drop(&mut self) {
        self.receivers.clear();
        for h in self.handles.drain(..).flatten() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{DatasetStrategy, InMemoryDataset};
    use crate::data::transform::{base_augmentation, custom_augmentation, AugmentationArgs};
    use image::{Rgb, RgbImage};

    fn split(n: usize) -> Arc<dyn Dataset> {
        let samples = (0..n).map(|i| (RgbImage::from_pixel(2, 2, Rgb([(i * 7 % 256) as u8, 0, 0])), i)).collect();
        let ds = InMemoryDataset::new(samples, Vec::new(), n);
        ds.split(&mut StdRng::seed_from_u64(0)).unwrap().0
    }

    fn args() -> AugmentationArgs {
        AugmentationArgs { resize: (2, 2), mean: [0.0; 3], std: [1.0; 3] }
    }

    fn labels_of(loader: &DataLoader, epoch: usize) -> Vec<Vec<usize>> {
        loader.iter(epoch).map(|b| b.unwrap().labels).collect()
    }

    #[test]
    fn drops_last_partial_batch() {
        let loader = DataLoader::new(
            split(10),
            base_augmentation(args()).val,
            LoaderOptions { batch_size: 4, shuffle: false, num_workers: 0, seed: 1 },
        );
        assert_eq!(loader.len(), 2);
        assert_eq!(labels_of(&loader, 0), vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
    }

    #[test]
    fn worker_count_does_not_change_output() {
        let ds = split(24);
        let t = custom_augmentation(args()).train;
        let opts = |num_workers| LoaderOptions { batch_size: 3, shuffle: true, num_workers, seed: 7 };
        let inline = DataLoader::new(ds.clone(), t.clone(), opts(0));
        let pooled = DataLoader::new(ds, t, opts(3));

        let a: Vec<Batch> = inline.iter(2).map(|b| b.unwrap()).collect();
        let b: Vec<Batch> = pooled.iter(2).map(|b| b.unwrap()).collect();
        assert_eq!(a.len(), 8);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.labels, y.labels);
            assert_eq!(x.inputs, y.inputs);
        }
    }

    #[test]
    fn reshuffles_each_epoch() {
        let loader = DataLoader::new(
            split(32),
            base_augmentation(args()).train,
            LoaderOptions { batch_size: 32, shuffle: true, num_workers: 1, seed: 3 },
        );
        assert_ne!(labels_of(&loader, 0), labels_of(&loader, 1));
        assert_eq!(labels_of(&loader, 1), labels_of(&loader, 1));
    }

    struct Truncating {
        panic: bool,
    }

    impl Transform for Truncating {
        fn apply(&self, _image: &RgbImage, _rng: &mut StdRng) -> Vec<f64> {
            if self.panic {
                panic!("transform exploded");
            }
            Vec::new()
        }

        fn output_shape(&self) -> ImageShape {
            ImageShape { channels: 3, height: 2, width: 2 }
        }
    }

    #[test]
    fn wrong_sized_transform_output_is_an_error() {
        for num_workers in [0, 2] {
            let loader = DataLoader::new(
                split(8),
                Arc::new(Truncating { panic: false }),
                LoaderOptions { batch_size: 2, shuffle: false, num_workers, seed: 1 },
            );
            let first = loader.iter(0).next().unwrap();
            assert!(matches!(first, Err(TrainError::Shape { expected: 12, actual: 0 })), "workers={num_workers}");
        }
    }

    #[test]
    fn panicking_worker_surfaces_as_error() {
        let loader = DataLoader::new(
            split(8),
            Arc::new(Truncating { panic: true }),
            LoaderOptions { batch_size: 2, shuffle: false, num_workers: 2, seed: 1 },
        );
        let items: Vec<Result<Batch>> = loader.iter(0).collect();
        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(TrainError::Data(msg)) => {
                assert!(msg.starts_with("loader worker 0 panicked"), "{msg}");
                assert!(msg.contains("transform exploded"), "{msg}");
            }
            other => panic!("expected a data error, got {other:?}"),
        }
    }

    #[test]
    fn early_drop_stops_workers() {
        let loader = DataLoader::new(
            split(40),
            base_augmentation(args()).train,
            LoaderOptions { batch_size: 2, shuffle: false, num_workers: 2, seed: 3 },
        );
        let mut it = loader.iter(0);
        assert!(it.next().is_some());
        drop(it);
    }
}
