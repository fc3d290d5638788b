use std::collections::HashMap;

use rankfuse_config::DEFAULT_ENTITY_LABEL;

/// Flat per-label multipliers for entity search, fixed for the lifetime of a run.
#[derive(Clone, Debug, Default)]
pub struct EntityWeights {
	weights: HashMap<String, f32>,
}
impl EntityWeights {
	pub fn new(weights: HashMap<String, f32>) -> Self {
		Self { weights }
	}

	pub fn from_config(cfg: &rankfuse_config::Config) -> Self {
		Self::new(cfg.entity_weights.clone())
	}

	/// Exact label first, then the `DEFAULT` entry, then 1.0.
	pub fn weight(&self, label: &str) -> f32 {
		self.weights
			.get(label)
			.or_else(|| self.weights.get(DEFAULT_ENTITY_LABEL))
			.copied()
			.unwrap_or(1.0)
	}
}
