pub mod adadelta;
pub mod adagrad;
pub mod adam;
pub mod rmsprop;
pub mod scheduler;
pub mod sgd;

pub use adadelta::Adadelta;
pub use adagrad::Adagrad;
pub use adam::Adam;
pub use rmsprop::RmsProp;
pub use scheduler::StepLr;
pub use sgd::Sgd;

use crate::error::{Result, TrainError};
use crate::models::{ParamInfo, ParamMut};

/// Weight decay applied to every optimizer a trial builds.
pub const DEFAULT_WEIGHT_DECAY: f64 = 5e-4;

/// Hyperparameters shared by every optimizer constructor.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerArgs {
    pub lr: f64,
    pub weight_decay: f64,
}

/// Updates trainable parameters from their accumulated gradients.
///
/// Optimizers are built from the `ParamInfo` of the trainable parameters only
/// and expect `step` to receive those same parameters in the same order.
pub trait Optimizer {
    fn name(&self) -> &'static str;

    fn step(&mut self, params: Vec<ParamMut<'_>>) -> Result<()>;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}

/// Zeroed per-parameter state buffers.
pub(crate) fn zero_state(params: &[ParamInfo]) -> Vec<Vec<f64>> {
    params.iter().map(|p| vec![0.0; p.len]).collect()
}

/// Guards against a parameter set that differs from the one the optimizer
/// was built with.
pub(crate) fn check_shapes(state: &[Vec<f64>], params: &[ParamMut<'_>]) -> Result<()> {
    if state.len() != params.len() {
        return Err(TrainError::Shape { expected: state.len(), actual: params.len() });
    }
    for (s, p) in state.iter().zip(params) {
        if s.len() != p.values.len() {
            return Err(TrainError::Shape { expected: s.len(), actual: p.values.len() });
        }
    }
    Ok(())
}
