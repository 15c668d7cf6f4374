// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::models::{DenseAutoencoder, Granularity, ModelSpec};
use recad_core::{RecadError, TrainableModel};
use std::collections::BTreeMap;

/// Per-timestep dense autoencoder.
pub const DENSE_AE_TAG: &str = "dense_ae";
/// Whole-window dense autoencoder.
pub const WINDOW_AE_TAG: &str = "window_ae";

pub type ModelConstructor = fn(&ModelSpec) -> Result<Box<dyn TrainableModel>, RecadError>;

/// Maps configuration tags to model constructors.
#[derive(Clone, Debug)]
pub struct ModelRegistry {
    constructors: BTreeMap<String, ModelConstructor>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DENSE_AE_TAG, build_dense_ae);
        registry.register(WINDOW_AE_TAG, build_window_ae);
        registry
    }
}

impl ModelRegistry {
    /// Registry without the built-in models.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Adds or replaces the constructor for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, constructor: ModelConstructor) {
        self.constructors.insert(tag.into(), constructor);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Resolves `tag` and builds a fresh model for `spec`.
    pub fn build(
        &self,
        tag: &str,
        spec: &ModelSpec,
    ) -> Result<Box<dyn TrainableModel>, RecadError> {
        let constructor = self.constructors.get(tag).ok_or_else(|| {
            RecadError::invalid_input(format!(
                "unknown model '{tag}'; expected one of: {}",
                self.tags().collect::<Vec<_>>().join(", ")
            ))
        })?;
        let model = constructor(spec)?;
        tracing::debug!(
            model = tag,
            parameters = model.parameters().len(),
            "built model"
        );
        Ok(model)
    }
}

fn build_dense_ae(spec: &ModelSpec) -> Result<Box<dyn TrainableModel>, RecadError> {
    Ok(Box::new(DenseAutoencoder::new(
        DENSE_AE_TAG,
        Granularity::Timestep,
        spec,
    )?))
}

fn build_window_ae(spec: &ModelSpec) -> Result<Box<dyn TrainableModel>, RecadError> {
    Ok(Box::new(DenseAutoencoder::new(
        WINDOW_AE_TAG,
        Granularity::Window,
        spec,
    )?))
}

#[cfg(test)]
mod tests {
    use super::{DENSE_AE_TAG, ModelRegistry, WINDOW_AE_TAG};
    use crate::models::ModelSpec;
    use recad_core::RecadError;

    fn spec() -> ModelSpec {
        ModelSpec {
            seq_len: 4,
            features: 3,
            d_model: 5,
            seed: 1,
        }
    }

    #[test]
    fn builtin_tags_resolve() {
        let registry = ModelRegistry::default();
        assert_eq!(
            registry.tags().collect::<Vec<_>>(),
            vec![DENSE_AE_TAG, WINDOW_AE_TAG]
        );

        let dense = registry.build(DENSE_AE_TAG, &spec()).expect("dense_ae");
        assert_eq!(dense.tag(), DENSE_AE_TAG);
        assert_eq!(dense.parameters().len(), 2 * 3 * 5 + 5 + 3);

        let window = registry.build(WINDOW_AE_TAG, &spec()).expect("window_ae");
        assert_eq!(window.tag(), WINDOW_AE_TAG);
        assert_eq!(window.parameters().len(), 2 * 12 * 5 + 5 + 12);
    }

    #[test]
    fn unknown_tag_lists_known_models() {
        let err = ModelRegistry::default()
            .build("transformer", &spec())
            .err()
            .expect("unknown tag");
        assert!(matches!(err, RecadError::InvalidInput(_)));
        assert!(err.to_string().contains("dense_ae, window_ae"));
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let registry = ModelRegistry::empty();
        assert!(!registry.contains(DENSE_AE_TAG));
        assert!(registry.build(DENSE_AE_TAG, &spec()).is_err());
    }
}
