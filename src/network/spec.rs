use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::dense::Layer;
use crate::network::network::Network;

/// One layer in an architecture description.
///
/// - `size`       — number of output units
/// - `activation` — activation applied after the affine transform
/// - `trainable`  — `false` freezes the layer (random-projection backbones)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub activation: ActivationFunction,
    #[serde(default = "default_trainable")]
    pub trainable: bool,
}

fn default_trainable() -> bool {
    true
}

impl LayerSpec {
    pub fn hidden(size: usize, activation: ActivationFunction) -> Self {
        LayerSpec { size, activation, trainable: true }
    }

    pub fn frozen(size: usize, activation: ActivationFunction) -> Self {
        LayerSpec { size, activation, trainable: false }
    }

    /// Final layer emitting raw logits.
    pub fn logits(num_classes: usize) -> Self {
        LayerSpec { size: num_classes, activation: ActivationFunction::Identity, trainable: true }
    }
}

/// Serializable architecture: a name plus the input width and layer stack.
///
/// Model strategies produce one of these and `build` turns it into weights,
/// drawing every initial value from the caller's RNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    pub input_size: usize,
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Network {
        let mut fan_in = self.input_size;
        let layers = self.layers.iter()
            .map(|spec| {
                let layer = Layer::new(fan_in, spec.size, spec.activation, spec.trainable, rng);
                fan_in = spec.size;
                layer
            })
            .collect();
        Network::new(self.name.clone(), layers)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(self.input_size)
    }
}
