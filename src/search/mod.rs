pub mod sampler;
pub mod space;
pub mod study;

pub use sampler::{GridSampler, RandomSampler, Sampler, SamplerKind};
pub use space::{SearchSpace, TrialParams};
pub use study::{artifact_path, Objective, Study, TrialRecord};
