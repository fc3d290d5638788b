mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Boost, Cascade, Config, Elasticsearch, Fusion, Output, Providers, Qdrant, Service,
};

use std::{
	collections::{BTreeMap, HashSet},
	fs,
	path::Path,
};

pub const FUSION_MODES: [&str; 2] = ["voting", "rrf"];
pub const GATING_MODES: [&str; 3] = ["any", "all", "adaptive"];
pub const TIE_BREAK_KEYS: [&str; 4] = ["best_rank", "source_count", "rank_sum", "first_seen"];
pub const COLUMN_KINDS: [&str; 2] = ["article_id", "image_id"];
pub const BOOST_MODES: [&str; 2] = ["sigmoid", "linear"];
pub const DEFAULT_ENTITY_LABEL: &str = "DEFAULT";

pub fn load(path: &Path) -> Result<Config> {
	let cfg = read(path)?;

	validate(&cfg)?;

	Ok(cfg)
}

/// Reads and normalizes a config file without validating it, so callers can apply command-line
/// overrides before calling [`validate`].
pub fn read(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if !FUSION_MODES.contains(&cfg.fusion.mode.as_str()) {
		return Err(Error::Validation {
			message: "fusion.mode must be one of voting or rrf.".to_string(),
		});
	}
	if cfg.fusion.top_k == 0 {
		return Err(Error::Validation {
			message: "fusion.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.fusion.rrf_k == 0 {
		return Err(Error::Validation {
			message: "fusion.rrf_k must be greater than zero.".to_string(),
		});
	}
	if !GATING_MODES.contains(&cfg.fusion.gating.as_str()) {
		return Err(Error::Validation {
			message: "fusion.gating must be one of any, all, or adaptive.".to_string(),
		});
	}

	if let Some(depth) = cfg.fusion.depth
		&& depth == 0
	{
		return Err(Error::Validation {
			message: "fusion.depth must be greater than zero.".to_string(),
		});
	}

	let mut seen_keys = HashSet::new();

	for key in &cfg.fusion.tie_break {
		if !TIE_BREAK_KEYS.contains(&key.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"fusion.tie_break contains unknown key {key:?}; expected best_rank, source_count, rank_sum, or first_seen."
				),
			});
		}
		if !seen_keys.insert(key.as_str()) {
			return Err(Error::Validation {
				message: format!("fusion.tie_break lists {key:?} more than once."),
			});
		}
	}

	for (name, weight) in &cfg.fusion.source_weights {
		if name.trim().is_empty() {
			return Err(Error::Validation {
				message: "fusion.source_weights keys must be non-empty.".to_string(),
			});
		}
		if !weight.is_finite() {
			return Err(Error::Validation {
				message: format!("fusion.source_weights.{name} must be a finite number."),
			});
		}
		if *weight < 0.0 {
			return Err(Error::Validation {
				message: format!("fusion.source_weights.{name} must be zero or greater."),
			});
		}
	}

	if !matches!(cfg.output.placeholder.as_str(), "" | "#") {
		return Err(Error::Validation {
			message: "output.placeholder must be empty or \"#\".".to_string(),
		});
	}

	if let Some(kind) = cfg.output.column_kind.as_deref()
		&& !COLUMN_KINDS.contains(&kind)
	{
		return Err(Error::Validation {
			message: "output.column_kind must be one of article_id or image_id.".to_string(),
		});
	}

	for (label, weight) in &cfg.entity_weights {
		if !weight.is_finite() {
			return Err(Error::Validation {
				message: format!("entity_weights.{label} must be a finite number."),
			});
		}
		if *weight < 0.0 {
			return Err(Error::Validation {
				message: format!("entity_weights.{label} must be zero or greater."),
			});
		}
	}

	if let Some(es) = cfg.providers.elasticsearch.as_ref() {
		for (label, value) in [
			("providers.elasticsearch.url", &es.url),
			("providers.elasticsearch.index", &es.index),
			("providers.elasticsearch.id_field", &es.id_field),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}

		if es.size == 0 {
			return Err(Error::Validation {
				message: "providers.elasticsearch.size must be greater than zero.".to_string(),
			});
		}
		if es.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "providers.elasticsearch.timeout_ms must be greater than zero."
					.to_string(),
			});
		}
		if !es.same_label_bonus.is_finite() || es.same_label_bonus < 0.0 {
			return Err(Error::Validation {
				message:
					"providers.elasticsearch.same_label_bonus must be a finite number of zero or greater."
						.to_string(),
			});
		}
	}
	if let Some(qdrant) = cfg.providers.qdrant.as_ref() {
		for (label, value) in [
			("providers.qdrant.url", &qdrant.url),
			("providers.qdrant.item_collection", &qdrant.item_collection),
			("providers.qdrant.id_field", &qdrant.id_field),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}

		if qdrant.limit == 0 {
			return Err(Error::Validation {
				message: "providers.qdrant.limit must be greater than zero.".to_string(),
			});
		}
		if qdrant.rrf_k == 0 {
			return Err(Error::Validation {
				message: "providers.qdrant.rrf_k must be greater than zero.".to_string(),
			});
		}

		validate_query_collections(&qdrant.query_collections)?;

		if let Some(cascade) = qdrant.cascade.as_ref() {
			validate_cascade(cascade)?;
		}
	}

	Ok(())
}

fn validate_query_collections(collections: &BTreeMap<String, f32>) -> Result<()> {
	for (name, weight) in collections {
		if name.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.qdrant.query_collections keys must be non-empty.".to_string(),
			});
		}
		if !weight.is_finite() || *weight < 0.0 {
			return Err(Error::Validation {
				message: format!(
					"providers.qdrant.query_collections.{name} must be a finite number of zero or greater."
				),
			});
		}
	}

	if !collections.values().any(|weight| *weight > 0.0) {
		return Err(Error::Validation {
			message: "providers.qdrant.query_collections must have at least one positive weight."
				.to_string(),
		});
	}

	Ok(())
}

fn validate_cascade(cascade: &Cascade) -> Result<()> {
	if cascade.article_map.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "providers.qdrant.cascade.article_map must be non-empty.".to_string(),
		});
	}
	if cascade.max_articles == 0 {
		return Err(Error::Validation {
			message: "providers.qdrant.cascade.max_articles must be greater than zero.".to_string(),
		});
	}

	let boost = &cascade.boost;

	if !BOOST_MODES.contains(&boost.mode.as_str()) {
		return Err(Error::Validation {
			message: "providers.qdrant.cascade.boost.mode must be one of sigmoid or linear."
				.to_string(),
		});
	}

	for (label, value) in [
		("min_similarity", boost.min_similarity),
		("similarity_weight", boost.similarity_weight),
		("rank_weight", boost.rank_weight),
		("bias", boost.bias),
		("max_boost", boost.max_boost),
		("linear_factor", boost.linear_factor),
	] {
		if !value.is_finite() {
			return Err(Error::Validation {
				message: format!("providers.qdrant.cascade.boost.{label} must be a finite number."),
			});
		}
	}

	if boost.max_boost < 0.0 || boost.linear_factor < 0.0 {
		return Err(Error::Validation {
			message:
				"providers.qdrant.cascade.boost.max_boost and linear_factor must be zero or greater."
					.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.output.column_kind.as_deref().map(|kind| kind.trim().is_empty()).unwrap_or(false) {
		cfg.output.column_kind = None;
	}

	if let Some(qdrant) = cfg.providers.qdrant.as_mut()
		&& qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		qdrant.api_key = None;
	}
	if let Some(cascade) = cfg.providers.qdrant.as_mut().and_then(|qdrant| qdrant.cascade.as_mut())
	{
		cascade.boost.mode = cascade.boost.mode.trim().to_ascii_lowercase();
	}

	cfg.fusion.mode = cfg.fusion.mode.trim().to_ascii_lowercase();
	cfg.fusion.gating = cfg.fusion.gating.trim().to_ascii_lowercase();
}
