pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod models;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod search;
pub mod output;
pub mod registry;
pub mod cli;
pub mod error;

// Convenience re-exports
pub use error::{Result, StrategyKind, TrainError};
pub use math::matrix::Matrix;
pub use models::{Model, ModelArgs};
pub use registry::Registry;
pub use search::{SearchSpace, Study, TrialParams};
pub use train::{run_search, run_trial, SearchConfig, TrialConfig, TrialOutcome};
