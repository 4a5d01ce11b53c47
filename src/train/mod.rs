pub mod best;
pub mod cutmix;
pub mod epoch_stats;
pub mod loop_fn;
pub mod metrics;
pub mod seed;
pub mod train_config;
pub mod trainer;

pub use best::BestState;
pub use cutmix::{CutMix, MixPlan};
pub use epoch_stats::{RunningStats, TrainLogRecord, TrainSummary, ValidationSummary};
pub use loop_fn::{EpochRunner, FigureOptions};
pub use seed::SeedBundle;
pub use train_config::TrialConfig;
pub use trainer::{run_search, run_trial, SearchConfig, TrialOutcome};
