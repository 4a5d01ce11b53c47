pub mod dataset;
pub mod labels;
pub mod loader;
pub mod transform;

pub use dataset::{Dataset, DatasetArgs, DatasetStrategy, InMemoryDataset, MaskDataset, SplitMode};
pub use labels::{LabelTarget, MultiLabel};
pub use loader::{Batch, DataLoader, LoaderOptions};
pub use transform::{AugmentationArgs, ImageShape, Transform, TransformPair};
