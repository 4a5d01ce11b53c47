//! Dataset strategies: the mask-image folders plus an in-memory variant.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::data::labels::{AgeLabel, GenderLabel, LabelTarget, MaskLabel, MultiLabel};
use crate::error::{Result, TrainError};

/// Per-channel statistics of the mask dataset images.
pub const MASK_MEAN: [f64; 3] = [0.548, 0.504, 0.479];
pub const MASK_STD: [f64; 3] = [0.237, 0.247, 0.246];

/// One split: random access to decoded images and their class ids.
pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;

    fn load(&self, index: usize) -> Result<(RgbImage, usize)>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a dataset strategy exposes to the trial.
pub trait DatasetStrategy {
    fn num_classes(&self) -> usize;

    fn mean(&self) -> [f64; 3];

    fn std(&self) -> [f64; 3];

    /// Disjoint `(train, val)` splits; `rng` decides the partition.
    fn split(&self, rng: &mut StdRng) -> Result<(Arc<dyn Dataset>, Arc<dyn Dataset>)>;
}

/// What every dataset constructor receives.
#[derive(Debug, Clone)]
pub struct DatasetArgs {
    pub data_dir: PathBuf,
    pub label: LabelTarget,
    pub val_ratio: f64,
}

// ---------------------------------------------------------------------------
// Mask image folders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub profile: String,
    pub labels: MultiLabel,
}

/// How `MaskDataset::split` partitions the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Images are shuffled independently; one person may land in both splits.
    ByImage,
    /// Whole profiles go to one side, so no person is in both splits.
    ByProfile,
}

/// `data_dir/<id>_<gender>_<race>_<age>/<mask1..5|incorrect_mask|normal>.<ext>`
pub struct MaskDataset {
    records: Arc<Vec<ImageRecord>>,
    label: LabelTarget,
    val_ratio: f64,
    mode: SplitMode,
}

/// Parses `<id>_<gender>_<race>_<age>` into gender and age labels.
fn parse_profile(name: &str) -> Result<(GenderLabel, AgeLabel)> {
    let parts: Vec<&str> = name.split('_').collect();
    let malformed = || TrainError::Data(format!("malformed profile directory {name:?}"));
    if parts.len() != 4 {
        return Err(malformed());
    }
    let gender = GenderLabel::parse(parts[1]).ok_or_else(malformed)?;
    let age: u32 = parts[3].parse().map_err(|_| malformed())?;
    Ok((gender, AgeLabel::from_years(age)))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true)
}

impl MaskDataset {
    pub fn open(args: &DatasetArgs, mode: SplitMode) -> Result<MaskDataset> {
        let mut profiles: Vec<PathBuf> = std::fs::read_dir(&args.data_dir)
            .map_err(|e| TrainError::Data(format!("cannot read {}: {e}", args.data_dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir() && !is_hidden(p))
            .collect();
        profiles.sort();

        let mut records = Vec::new();
        for dir in &profiles {
            let profile = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
            let (gender, age) = parse_profile(&profile)?;

            let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && !is_hidden(p))
                .collect();
            files.sort();

            for path in files {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                let Some(mask) = MaskLabel::from_file_stem(stem) else {
                    debug!(file = %path.display(), "skipping unrecognized file");
                    continue;
                };
                records.push(ImageRecord {
                    path,
                    profile: profile.clone(),
                    labels: MultiLabel { mask, gender, age },
                });
            }
        }

        if records.is_empty() {
            return Err(TrainError::Data(format!("no images found under {}", args.data_dir.display())));
        }
        info!(profiles = profiles.len(), images = records.len(), "indexed mask dataset");

        Ok(MaskDataset {
            records: Arc::new(records),
            label: args.label,
            val_ratio: args.val_ratio,
            mode,
        })
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    fn subset(&self, indices: Vec<usize>) -> Arc<dyn Dataset> {
        Arc::new(RecordSubset { records: self.records.clone(), indices, label: self.label })
    }
}

impl DatasetStrategy for MaskDataset {
    fn num_classes(&self) -> usize {
        self.label.num_classes()
    }

    fn mean(&self) -> [f64; 3] {
        MASK_MEAN
    }

    fn std(&self) -> [f64; 3] {
        MASK_STD
    }

    fn split(&self, rng: &mut StdRng) -> Result<(Arc<dyn Dataset>, Arc<dyn Dataset>)> {
        let (train, val) = match self.mode {
            SplitMode::ByImage => {
                let mut indices: Vec<usize> = (0..self.records.len()).collect();
                indices.shuffle(rng);
                let n_val = (indices.len() as f64 * self.val_ratio) as usize;
                let train = indices.split_off(n_val);
                (train, indices)
            }
            SplitMode::ByProfile => {
                let mut by_profile: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
                for (i, r) in self.records.iter().enumerate() {
                    by_profile.entry(r.profile.as_str()).or_default().push(i);
                }
                let mut profiles: Vec<&str> = by_profile.keys().copied().collect();
                profiles.shuffle(rng);
                let n_val = (profiles.len() as f64 * self.val_ratio) as usize;

                let (mut train, mut val) = (Vec::new(), Vec::new());
                for (rank, p) in profiles.iter().enumerate() {
                    let target = if rank < n_val { &mut val } else { &mut train };
                    target.extend_from_slice(&by_profile[p]);
                }
                train.sort_unstable();
                val.sort_unstable();
                (train, val)
            }
        };

        info!(train = train.len(), val = val.len(), mode = ?self.mode, "split dataset");
        Ok((self.subset(train), self.subset(val)))
    }
}

struct RecordSubset {
    records: Arc<Vec<ImageRecord>>,
    indices: Vec<usize>,
    label: LabelTarget,
}

impl Dataset for RecordSubset {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn load(&self, index: usize) -> Result<(RgbImage, usize)> {
        let record = &self.records[self.indices[index]];
        let image = image::open(&record.path)?.to_rgb8();
        Ok((image, self.label.class_of(&record.labels)))
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Pre-split images held in memory. Useful for embedding the trainer and for
/// exercising the loop without touching the filesystem.
#[derive(Clone)]
pub struct InMemoryDataset {
    pub train: Arc<Vec<(RgbImage, usize)>>,
    pub val: Arc<Vec<(RgbImage, usize)>>,
    pub num_classes: usize,
    pub mean: [f64; 3],
    pub std: [f64; 3],
}

impl InMemoryDataset {
    pub fn new(train: Vec<(RgbImage, usize)>, val: Vec<(RgbImage, usize)>, num_classes: usize) -> Self {
        InMemoryDataset {
            train: Arc::new(train),
            val: Arc::new(val),
            num_classes,
            mean: [0.5; 3],
            std: [0.25; 3],
        }
    }
}

struct MemorySplit(Arc<Vec<(RgbImage, usize)>>);

impl Dataset for MemorySplit {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn load(&self, index: usize) -> Result<(RgbImage, usize)> {
        Ok(self.0[index].clone())
    }
}

impl DatasetStrategy for InMemoryDataset {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn mean(&self) -> [f64; 3] {
        self.mean
    }

    fn std(&self) -> [f64; 3] {
        self.std
    }

    fn split(&self, _rng: &mut StdRng) -> Result<(Arc<dyn Dataset>, Arc<dyn Dataset>)> {
        Ok((Arc::new(MemorySplit(self.train.clone())), Arc::new(MemorySplit(self.val.clone()))))
    }
}
