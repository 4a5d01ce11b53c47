//! Error types for the trainer.

use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Strategy families resolvable through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Dataset,
    Augmentation,
    Model,
    Optimizer,
    Loss,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StrategyKind::Dataset      => "dataset",
            StrategyKind::Augmentation => "augmentation",
            StrategyKind::Model        => "model",
            StrategyKind::Optimizer    => "optimizer",
            StrategyKind::Loss         => "loss",
        };
        f.write_str(s)
    }
}

/// Every failure is fatal to the current trial; nothing here is retried.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("unknown {kind} strategy: {name:?}")]
    UnknownStrategy { kind: StrategyKind, name: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("non-finite loss {value} at epoch {epoch}, batch {batch}")]
    NonFiniteLoss { epoch: usize, batch: usize, value: f64 },

    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl TrainError {
    pub fn unknown(kind: StrategyKind, name: impl Into<String>) -> Self {
        TrainError::UnknownStrategy { kind, name: name.into() }
    }
}
