//! Model strategy interface and the built-in architectures.

use std::path::Path;

use rand::rngs::StdRng;

use crate::activation::activation::ActivationFunction;
use crate::error::{Result, TrainError};
use crate::math::matrix::Matrix;
use crate::network::spec::{LayerSpec, NetworkSpec};

/// Static description of one parameter tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub len: usize,
    pub requires_grad: bool,
}

/// Mutable view of one parameter tensor and its accumulated gradient.
pub struct ParamMut<'a> {
    pub name: String,
    pub values: &'a mut [f64],
    pub grads: &'a [f64],
    pub requires_grad: bool,
}

/// A classifier mapping a batch of flattened images (`n × input_dim`) to a
/// batch of per-class logits (`n × num_classes`).
pub trait Model {
    /// Training-mode forward pass; caches activations for `backward`.
    fn forward(&mut self, inputs: &Matrix) -> Matrix;

    /// Evaluation-mode forward pass; no state is touched.
    fn predict(&self, inputs: &Matrix) -> Matrix;

    /// Accumulates parameter gradients given ∂L/∂logits for the last
    /// `forward` batch.
    fn backward(&mut self, grad_logits: &Matrix);

    fn zero_grad(&mut self);

    fn param_info(&self) -> Vec<ParamInfo>;

    /// Every parameter, trainable or not, in `param_info` order.
    fn parameters_mut(&mut self) -> Vec<ParamMut<'_>>;

    /// Persists the parameters (a checkpoint).
    fn save(&self, path: &Path) -> Result<()>;

    /// Only the parameters the optimizer may update, in a stable order.
    fn trainable_parameters(&mut self) -> Vec<ParamMut<'_>> {
        self.parameters_mut().into_iter().filter(|p| p.requires_grad).collect()
    }
}

/// Inputs every model constructor receives.
#[derive(Debug, Clone)]
pub struct ModelArgs {
    pub num_classes: usize,
    pub input_dim: usize,
    /// Only passed to models registered as versioned.
    pub version: Option<String>,
}

/// File extension of checkpoints written by `Model::save`.
pub const CHECKPOINT_EXT: &str = "json";

// ---------------------------------------------------------------------------
// Built-in architectures
// ---------------------------------------------------------------------------

/// One ReLU hidden layer of 64 units.
pub fn base_model(args: &ModelArgs, rng: &mut StdRng) -> Result<Box<dyn Model>> {
    let spec = NetworkSpec {
        name: "BaseModel".into(),
        input_size: args.input_dim,
        layers: vec![
            LayerSpec::hidden(64, ActivationFunction::ReLU),
            LayerSpec::logits(args.num_classes),
        ],
    };
    Ok(Box::new(spec.build(rng)))
}

/// Hidden widths for each `MlpNet` version tag.
fn mlp_widths(version: &str) -> Option<&'static [usize]> {
    match version {
        "b0" => Some(&[128]),
        "b1" => Some(&[256, 128]),
        "b2" => Some(&[256, 128, 64]),
        "b3" => Some(&[512, 256, 128]),
        _ => None,
    }
}

/// GELU MLP whose depth and width scale with the version tag (default `b0`).
pub fn mlp_net(args: &ModelArgs, rng: &mut StdRng) -> Result<Box<dyn Model>> {
    let version = args.version.as_deref().unwrap_or("b0");
    let widths = mlp_widths(version)
        .ok_or_else(|| TrainError::Config(format!("MlpNet has no version {version:?} (expected b0..b3)")))?;

    let mut layers: Vec<LayerSpec> = widths.iter()
        .map(|&w| LayerSpec::hidden(w, ActivationFunction::Gelu))
        .collect();
    layers.push(LayerSpec::logits(args.num_classes));

    let spec = NetworkSpec { name: format!("MlpNet-{version}"), input_size: args.input_dim, layers };
    Ok(Box::new(spec.build(rng)))
}

/// Frozen random-projection backbone with a trainable two-layer head.
pub fn projection_head(args: &ModelArgs, rng: &mut StdRng) -> Result<Box<dyn Model>> {
    let spec = NetworkSpec {
        name: "ProjectionHead".into(),
        input_size: args.input_dim,
        layers: vec![
            LayerSpec::frozen(256, ActivationFunction::Tanh),
            LayerSpec::hidden(64, ActivationFunction::ReLU),
            LayerSpec::logits(args.num_classes),
        ],
    };
    Ok(Box::new(spec.build(rng)))
}
