//! Name → constructor tables for every pluggable strategy.
//!
//! A trial never names a concrete type; it asks the registry for the
//! strategy its configuration names. Unknown names fail with
//! `TrainError::UnknownStrategy`.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::data::dataset::{DatasetArgs, DatasetStrategy, MaskDataset, SplitMode};
use crate::data::transform::{base_augmentation, custom_augmentation, AugmentationArgs, TransformPair};
use crate::error::{Result, StrategyKind, TrainError};
use crate::loss::{Criterion, LossType};
use crate::models::{base_model, mlp_net, projection_head, Model, ModelArgs, ParamInfo};
use crate::optim::{Adadelta, Adagrad, Adam, Optimizer, OptimizerArgs, RmsProp, Sgd};

pub type DatasetFactory = Arc<dyn Fn(&DatasetArgs) -> Result<Box<dyn DatasetStrategy>> + Send + Sync>;
pub type AugmentationFactory = Arc<dyn Fn(AugmentationArgs) -> TransformPair + Send + Sync>;
pub type ModelFactory = Arc<dyn Fn(&ModelArgs, &mut StdRng) -> Result<Box<dyn Model>> + Send + Sync>;
pub type OptimizerFactory = Arc<dyn Fn(&[ParamInfo], OptimizerArgs) -> Box<dyn Optimizer> + Send + Sync>;
pub type LossFactory = Arc<dyn Fn() -> Box<dyn Criterion> + Send + Sync>;

#[derive(Clone)]
struct ModelEntry {
    factory: ModelFactory,
    /// Whether the factory receives `ModelArgs::version`.
    versioned: bool,
}

#[derive(Clone, Default)]
pub struct Registry {
    datasets: HashMap<String, DatasetFactory>,
    augmentations: HashMap<String, AugmentationFactory>,
    models: HashMap<String, ModelEntry>,
    optimizers: HashMap<String, OptimizerFactory>,
    losses: HashMap<String, LossFactory>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in strategy.
    pub fn with_defaults() -> Self {
        let mut r = Registry::new();

        r.register_dataset("MaskBaseDataset", |args| {
            Ok(Box::new(MaskDataset::open(args, SplitMode::ByImage)?) as Box<dyn DatasetStrategy>)
        });
        r.register_dataset("MaskSplitByProfileDataset", |args| {
            Ok(Box::new(MaskDataset::open(args, SplitMode::ByProfile)?) as Box<dyn DatasetStrategy>)
        });

        r.register_augmentation("BaseAugmentation", base_augmentation);
        r.register_augmentation("CustomAugmentation", custom_augmentation);

        r.register_model("BaseModel", false, base_model);
        r.register_model("MlpNet", true, mlp_net);
        r.register_model("ProjectionHead", false, projection_head);

        r.register_optimizer("SGD", |p, a| Box::new(Sgd::new(p, a)));
        r.register_optimizer("Adam", |p, a| Box::new(Adam::new(p, a)));
        r.register_optimizer("AdamW", |p, a| Box::new(Adam::adamw(p, a)));
        r.register_optimizer("RMSprop", |p, a| Box::new(RmsProp::new(p, a)));
        r.register_optimizer("Adagrad", |p, a| Box::new(Adagrad::new(p, a)));
        r.register_optimizer("Adadelta", |p, a| Box::new(Adadelta::new(p, a)));

        for loss in LossType::ALL {
            r.register_loss(loss.as_str(), move || loss.create());
        }
        r
    }

    // ── registration ──────────────────────────────────────────────────────

    pub fn register_dataset<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&DatasetArgs) -> Result<Box<dyn DatasetStrategy>> + Send + Sync + 'static,
    {
        self.datasets.insert(name.to_string(), Arc::new(factory));
    }

    pub fn register_augmentation<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(AugmentationArgs) -> TransformPair + Send + Sync + 'static,
    {
        self.augmentations.insert(name.to_string(), Arc::new(factory));
    }

    /// `versioned` models receive the configured version tag; others are
    /// built with `version: None`.
    pub fn register_model<F>(&mut self, name: &str, versioned: bool, factory: F)
    where
        F: Fn(&ModelArgs, &mut StdRng) -> Result<Box<dyn Model>> + Send + Sync + 'static,
    {
        self.models.insert(name.to_string(), ModelEntry { factory: Arc::new(factory), versioned });
    }

    pub fn register_optimizer<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&[ParamInfo], OptimizerArgs) -> Box<dyn Optimizer> + Send + Sync + 'static,
    {
        self.optimizers.insert(name.to_string(), Arc::new(factory));
    }

    pub fn register_loss<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Criterion> + Send + Sync + 'static,
    {
        self.losses.insert(name.to_string(), Arc::new(factory));
    }

    // ── resolution ────────────────────────────────────────────────────────

    pub fn dataset(&self, name: &str, args: &DatasetArgs) -> Result<Box<dyn DatasetStrategy>> {
        let factory = self.datasets.get(name).ok_or_else(|| TrainError::unknown(StrategyKind::Dataset, name))?;
        factory(args)
    }

    pub fn augmentation(&self, name: &str, args: AugmentationArgs) -> Result<TransformPair> {
        let factory = self.augmentations.get(name)
            .ok_or_else(|| TrainError::unknown(StrategyKind::Augmentation, name))?;
        Ok(factory(args))
    }

    pub fn model(&self, name: &str, args: &ModelArgs, rng: &mut StdRng) -> Result<Box<dyn Model>> {
        let entry = self.models.get(name).ok_or_else(|| TrainError::unknown(StrategyKind::Model, name))?;
        if entry.versioned {
            (entry.factory)(args, rng)
        } else {
            let args = ModelArgs { version: None, ..args.clone() };
            (entry.factory)(&args, rng)
        }
    }

    pub fn optimizer(&self, name: &str, params: &[ParamInfo], args: OptimizerArgs) -> Result<Box<dyn Optimizer>> {
        let factory = self.optimizers.get(name).ok_or_else(|| TrainError::unknown(StrategyKind::Optimizer, name))?;
        Ok(factory(params, args))
    }

    pub fn loss(&self, name: &str) -> Result<Box<dyn Criterion>> {
        let factory = self.losses.get(name).ok_or_else(|| TrainError::unknown(StrategyKind::Loss, name))?;
        Ok(factory())
    }

    /// Registered names of one category, sorted.
    pub fn names(&self, kind: StrategyKind) -> Vec<String> {
        let mut names: Vec<String> = match kind {
            StrategyKind::Dataset      => self.datasets.keys().cloned().collect(),
            StrategyKind::Augmentation => self.augmentations.keys().cloned().collect(),
            StrategyKind::Model        => self.models.keys().cloned().collect(),
            StrategyKind::Optimizer    => self.optimizers.keys().cloned().collect(),
            StrategyKind::Loss         => self.losses.keys().cloned().collect(),
        };
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::DEFAULT_WEIGHT_DECAY;
    use rand::SeedableRng;

    #[test]
    fn defaults_cover_every_category() {
        let r = Registry::with_defaults();
        assert_eq!(r.names(StrategyKind::Dataset), vec!["MaskBaseDataset", "MaskSplitByProfileDataset"]);
        assert_eq!(r.names(StrategyKind::Optimizer).len(), 6);
        assert_eq!(r.names(StrategyKind::Loss), vec!["cross_entropy", "f1", "focal", "label_smoothing"]);
        assert_eq!(r.loss("focal").unwrap().name(), "focal");
    }

    #[test]
    fn unknown_names_report_their_category() {
        let r = Registry::with_defaults();
        match r.loss("hinge") {
            Err(TrainError::UnknownStrategy { kind, name }) => {
                assert_eq!(kind, StrategyKind::Loss);
                assert_eq!(name, "hinge");
            }
            _ => panic!("expected UnknownStrategy"),
        }
        let args = OptimizerArgs { lr: 0.1, weight_decay: DEFAULT_WEIGHT_DECAY };
        assert!(matches!(
            r.optimizer("LBFGS", &[], args),
            Err(TrainError::UnknownStrategy { kind: StrategyKind::Optimizer, .. })
        ));
    }

    #[test]
    fn version_reaches_only_versioned_models() {
        let r = Registry::with_defaults();
        let mut rng = StdRng::seed_from_u64(0);
        let args = ModelArgs { num_classes: 3, input_dim: 6, version: Some("b9".into()) };
        // BaseModel ignores the tag; MlpNet rejects an unknown one.
        assert!(r.model("BaseModel", &args, &mut rng).is_ok());
        assert!(matches!(r.model("MlpNet", &args, &mut rng), Err(TrainError::Config(_))));
    }

    #[test]
    fn caller_registrations_override_and_extend() {
        let mut r = Registry::with_defaults();
        r.register_loss("cross_entropy", || LossType::F1.create());
        assert_eq!(r.loss("cross_entropy").unwrap().name(), "f1");
    }
}
