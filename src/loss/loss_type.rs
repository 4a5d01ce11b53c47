use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{StrategyKind, TrainError};
use crate::loss::{Criterion, CrossEntropyLoss, F1Loss, FocalLoss, LabelSmoothingLoss};

/// Built-in loss names.
///
/// - `CrossEntropy`   — `cross_entropy`
/// - `Focal`          — `focal`, γ = 2
/// - `LabelSmoothing` — `label_smoothing`, ε = 0.1
/// - `F1`             — `f1`, soft macro F1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    CrossEntropy,
    Focal,
    LabelSmoothing,
    F1,
}

impl LossType {
    pub const ALL: [LossType; 4] = [LossType::CrossEntropy, LossType::Focal, LossType::LabelSmoothing, LossType::F1];

    pub fn as_str(&self) -> &'static str {
        match self {
            LossType::CrossEntropy   => "cross_entropy",
            LossType::Focal          => "focal",
            LossType::LabelSmoothing => "label_smoothing",
            LossType::F1             => "f1",
        }
    }

    pub fn create(&self) -> Box<dyn Criterion> {
        match self {
            LossType::CrossEntropy   => Box::new(CrossEntropyLoss),
            LossType::Focal          => Box::new(FocalLoss::default()),
            LossType::LabelSmoothing => Box::new(LabelSmoothingLoss::default()),
            LossType::F1             => Box::new(F1Loss),
        }
    }
}

impl FromStr for LossType {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LossType::ALL.iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| TrainError::unknown(StrategyKind::Loss, s))
    }
}
