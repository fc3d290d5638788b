use std::{
	collections::{BTreeMap, HashMap},
	path::PathBuf,
};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub fusion: Fusion,
	#[serde(default)]
	pub output: Output,
	/// Per-label multipliers used by entity search. The `DEFAULT` key is the fallback label.
	#[serde(default)]
	pub entity_weights: HashMap<String, f32>,
	#[serde(default)]
	pub providers: Providers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fusion {
	/// One of `voting` or `rrf`.
	pub mode: String,
	pub top_k: u32,
	#[serde(default = "default_rrf_k")]
	pub rrf_k: u32,
	/// One of `any`, `all` or `adaptive`.
	#[serde(default = "default_gating")]
	pub gating: String,
	/// Only ranks up to this depth contribute from each source.
	pub depth: Option<u32>,
	#[serde(default = "default_tie_break")]
	pub tie_break: Vec<String>,
	/// Source name to weight. Sources missing from the map weigh 1.0.
	#[serde(default)]
	pub source_weights: HashMap<String, f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Output {
	pub dir: PathBuf,
	pub placeholder: String,
	pub column_kind: Option<String>,
	pub write_json: bool,
}
impl Default for Output {
	fn default() -> Self {
		Self {
			dir: PathBuf::from("ReRank"),
			placeholder: String::new(),
			column_kind: None,
			write_json: true,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Providers {
	pub elasticsearch: Option<Elasticsearch>,
	pub qdrant: Option<Qdrant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Elasticsearch {
	pub url: String,
	pub index: String,
	#[serde(default = "default_article_id_field")]
	pub id_field: String,
	pub size: u32,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_same_label_bonus")]
	pub same_label_bonus: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub api_key: Option<String>,
	/// Collections holding stored query vectors, keyed by name, valued by fusion weight.
	pub query_collections: BTreeMap<String, f32>,
	pub item_collection: String,
	#[serde(default = "default_image_id_field")]
	pub id_field: String,
	pub limit: u32,
	/// RRF constant used when more than one query collection is active.
	#[serde(default = "default_rrf_k")]
	pub rrf_k: u32,
	pub cascade: Option<Cascade>,
}

/// Restricts image search to the images of a query's retrieved articles.
#[derive(Debug, Clone, Deserialize)]
pub struct Cascade {
	/// JSON object of article id to image ids.
	pub article_map: PathBuf,
	#[serde(default = "default_max_articles")]
	pub max_articles: u32,
	#[serde(default)]
	pub boost: Boost,
}

/// Article-rank boost added to an image's similarity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Boost {
	/// One of `sigmoid` or `linear`.
	pub mode: String,
	/// Sigmoid mode gives no boost below this similarity.
	pub min_similarity: f32,
	pub similarity_weight: f32,
	pub rank_weight: f32,
	pub bias: f32,
	pub max_boost: f32,
	/// Linear mode boost is `linear_factor / article_rank`.
	pub linear_factor: f32,
}
impl Default for Boost {
	fn default() -> Self {
		Self {
			mode: "sigmoid".to_string(),
			min_similarity: 0.5,
			similarity_weight: 10.0,
			rank_weight: 2.5,
			bias: 0.0,
			max_boost: 0.5,
			linear_factor: 0.3,
		}
	}
}

fn default_rrf_k() -> u32 {
	60
}

fn default_gating() -> String {
	"any".to_string()
}

fn default_tie_break() -> Vec<String> {
	vec!["best_rank".to_string(), "first_seen".to_string()]
}

fn default_article_id_field() -> String {
	"article_id".to_string()
}

fn default_image_id_field() -> String {
	"image_id".to_string()
}

fn default_max_articles() -> u32 {
	15
}

fn default_timeout_ms() -> u64 {
	10_000
}

fn default_same_label_bonus() -> f32 {
	1.3
}
