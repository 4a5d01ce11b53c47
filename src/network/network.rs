use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::layers::dense::Layer;
use crate::math::matrix::Matrix;
use crate::models::{Model, ParamInfo, ParamMut};

/// A stack of dense layers. Every built-in model strategy produces one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub layers: Vec<Layer>,
}

impl Network {
    pub fn new(name: String, layers: Vec<Layer>) -> Network {
        Network { name, layers }
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network previously written by `save_json`.
    pub fn load_json(path: &Path) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    fn param_name(layer: usize, slot: usize) -> String {
        let kind = if slot == 0 { "weight" } else { "bias" };
        format!("layers.{layer}.{kind}")
    }
}

impl Model for Network {
    fn forward(&mut self, inputs: &Matrix) -> Matrix {
        let mut current = inputs.clone();
        for layer in &mut self.layers {
            current = layer.feed_from(&current);
        }
        current
    }

    fn predict(&self, inputs: &Matrix) -> Matrix {
        self.layers.iter().fold(inputs.clone(), |x, layer| layer.infer(&x))
    }

    fn backward(&mut self, grad_logits: &Matrix) {
        // No layer below a frozen prefix needs an input gradient.
        let first_trainable = self.layers.iter().position(|l| l.trainable).unwrap_or(self.layers.len());
        let mut grad = grad_logits.clone();
        for i in (first_trainable..self.layers.len()).rev() {
            match self.layers[i].backward(&grad, i > first_trainable) {
                Some(g) => grad = g,
                None => break,
            }
        }
    }

    fn zero_grad(&mut self) {
        self.layers.iter_mut().for_each(Layer::zero_grad);
    }

    fn param_info(&self) -> Vec<ParamInfo> {
        self.layers.iter().enumerate()
            .flat_map(|(i, layer)| {
                [
                    ParamInfo { name: Network::param_name(i, 0), len: layer.weights.data.len(), requires_grad: layer.trainable },
                    ParamInfo { name: Network::param_name(i, 1), len: layer.biases.data.len(), requires_grad: layer.trainable },
                ]
            })
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<ParamMut<'_>> {
        let mut params = Vec::with_capacity(self.layers.len() * 2);
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let requires_grad = layer.trainable;
            for (slot, (values, grads)) in layer.params_mut().into_iter().enumerate() {
                params.push(ParamMut {
                    name: Network::param_name(i, slot),
                    values,
                    grads,
                    requires_grad,
                });
            }
        }
        params
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.save_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::network::spec::{LayerSpec, NetworkSpec};
    use rand::{rngs::StdRng, SeedableRng};

    fn small() -> Network {
        NetworkSpec {
            name: "t".into(),
            input_size: 4,
            layers: vec![
                LayerSpec::frozen(3, ActivationFunction::Gelu),
                LayerSpec::hidden(3, ActivationFunction::ReLU),
                LayerSpec::logits(2),
            ],
        }
        .build(&mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn forward_and_predict_agree() {
        let mut net = small();
        let x = Matrix::from_rows(&[vec![0.1, 0.2, 0.3, 0.4], vec![-1.0, 0.0, 1.0, 2.0]]);
        assert_eq!(net.forward(&x), net.predict(&x));
    }

    #[test]
    fn frozen_params_are_flagged() {
        let net = small();
        let info = net.param_info();
        assert_eq!(info.len(), 6);
        assert!(!info[0].requires_grad && !info[1].requires_grad);
        assert!(info[2..].iter().all(|p| p.requires_grad));
        assert_eq!(info[0].name, "layers.0.weight");
    }

    #[test]
    fn json_roundtrip_keeps_weights() {
        let net = small();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        net.save_json(&path).unwrap();
        let loaded = Network::load_json(&path).unwrap();
        let x = Matrix::from_rows(&[vec![0.5, 0.5, 0.5, 0.5]]);
        assert_eq!(net.predict(&x), loaded.predict(&x));
    }
}
