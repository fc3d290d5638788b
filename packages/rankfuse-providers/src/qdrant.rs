use std::collections::{BTreeMap, HashMap};

use qdrant_client::{
	Qdrant,
	qdrant::{
		Condition, Filter, Query as QdrantQuery, QueryPointsBuilder, RetrievedPoint,
		ScrollPointsBuilder, Value, value::Kind, vectors_output::VectorsOptions,
	},
};

use crate::{BoxFuture, Error, RankedListProvider, Result};
use rankfuse_domain::{Query, RankedList};

/// Article rank used for a hit outside every known article.
const UNRANKED_ARTICLE: u32 = 999;

/// Image search keyed by query vectors stored next to the query id.
///
/// Each active query collection yields one nearest-neighbour list; several lists are merged with
/// weighted RRF. With a [`Cascade`], a query only searches the images of its retrieved articles
/// and every hit gets an article-rank boost on top of its similarity.
pub struct QdrantProvider {
	client: Qdrant,
	cfg: rankfuse_config::Qdrant,
	cascade: Option<Cascade>,
}
impl QdrantProvider {
	pub fn new(cfg: &rankfuse_config::Qdrant) -> Result<Self> {
		if cfg.item_collection.trim().is_empty() {
			return Err(Error::InvalidConfig {
				message: "Qdrant item_collection must be non-empty.".to_string(),
			});
		}
		if !cfg.query_collections.values().any(|weight| *weight > 0.0) {
			return Err(Error::InvalidConfig {
				message: "Qdrant needs a query collection with a positive weight.".to_string(),
			});
		}

		let client = Qdrant::from_url(&cfg.url).api_key(cfg.api_key.clone()).build()?;

		Ok(Self { client, cfg: cfg.clone(), cascade: None })
	}

	pub fn with_cascade(mut self, cascade: Cascade) -> Self {
		self.cascade = Some(cascade);

		self
	}

	async fn query_vector(&self, collection: &str, query_id: &str) -> Result<Option<Vec<f32>>> {
		let scroll = ScrollPointsBuilder::new(collection)
			.filter(Filter::must([Condition::matches(self.cfg.id_field.clone(), query_id.to_string())]))
			.limit(1)
			.with_payload(false)
			.with_vectors(true);
		let response = self.client.scroll(scroll).await?;

		Ok(response.result.first().and_then(dense_vector))
	}

	async fn nearest(
		&self,
		vector: Vec<f32>,
		filter: Option<Filter>,
		limit: u64,
	) -> Result<Vec<(String, f32)>> {
		let mut search = QueryPointsBuilder::new(self.cfg.item_collection.clone())
			.query(QdrantQuery::new_nearest(vector))
			.with_payload(true)
			.limit(limit);

		if let Some(filter) = filter {
			search = search.filter(filter);
		}

		let response = self.client.query(search).await?;

		Ok(response
			.result
			.iter()
			.filter_map(|point| {
				Some((payload_string(&point.payload, &self.cfg.id_field)?, point.score))
			})
			.collect())
	}

	async fn search(&self, query: &Query) -> Result<RankedList> {
		let limit = u64::from(self.cfg.limit);
		let restricted = self.cascade.as_ref().and_then(|cascade| {
			let candidates = cascade.candidates(&query.id);

			if candidates.is_none() {
				tracing::debug!(query_id = %query.id, "No candidate images; searching all images.");
			}

			candidates.map(|candidates| (cascade.boost, candidates))
		});
		let mut lists = Vec::new();

		for (collection, weight) in &self.cfg.query_collections {
			if *weight <= 0.0 {
				continue;
			}

			let Some(vector) = self.query_vector(collection, &query.id).await? else {
				tracing::warn!(query_id = %query.id, %collection, "No stored vector for query.");

				continue;
			};
			let hits = match &restricted {
				Some((boost, candidates)) => {
					let filter = Filter::must([Condition::matches(
						self.cfg.id_field.clone(),
						candidates.image_ids.clone(),
					)]);
					let hits = self.nearest(vector, Some(filter), 2 * limit).await?;

					boosted(hits, candidates, boost)
				},
				None => self.nearest(vector, None, limit).await?,
			};

			lists.push((*weight, hits));
		}

		let merged = merge_collections(&lists, self.cfg.rrf_k, self.cfg.limit as usize);
		let list = crate::ranked_from_hits(
			&query.id,
			merged.into_iter().map(|(id, score)| (Some(id), Some(score))),
		)?;

		tracing::debug!(
			query_id = %query.id,
			collections = lists.len(),
			restricted = restricted.is_some(),
			hits = list.len(),
			"Vector search finished."
		);

		Ok(list)
	}
}
impl RankedListProvider for QdrantProvider {
	fn name(&self) -> &str {
		"qdrant"
	}

	fn width(&self) -> usize {
		self.cfg.limit as usize
	}

	fn ranked_list<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<RankedList>> {
		Box::pin(self.search(query))
	}
}

/// Retrieved articles per query and the images each article owns.
pub struct Cascade {
	boost: RankBoost,
	max_articles: usize,
	article_images: HashMap<String, Vec<String>>,
	articles: BTreeMap<String, RankedList>,
}
impl Cascade {
	pub fn new(
		cfg: &rankfuse_config::Cascade,
		article_images: HashMap<String, Vec<String>>,
		articles: BTreeMap<String, RankedList>,
	) -> Result<Self> {
		Ok(Self {
			boost: RankBoost::from_config(&cfg.boost)?,
			max_articles: cfg.max_articles as usize,
			article_images,
			articles,
		})
	}

	/// Images of the first `max_articles` articles retrieved for `query_id`, in article order.
	///
	/// An image listed under several articles takes the best article rank. `None` when no
	/// retrieved article has images.
	pub fn candidates(&self, query_id: &str) -> Option<CandidateImages> {
		let articles = self.articles.get(query_id)?;
		let mut out = CandidateImages::default();

		for (position, article_id) in articles.item_ids().take(self.max_articles).enumerate() {
			let Some(images) = self.article_images.get(article_id) else {
				continue;
			};

			for image_id in images {
				if out.article_rank.contains_key(image_id) {
					continue;
				}

				out.article_rank.insert(image_id.clone(), position as u32 + 1);
				out.image_ids.push(image_id.clone());
			}
		}

		(!out.image_ids.is_empty()).then_some(out)
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateImages {
	pub image_ids: Vec<String>,
	/// 1-based rank of the article an image came from.
	pub article_rank: HashMap<String, u32>,
}
impl CandidateImages {
	pub fn rank(&self, image_id: &str) -> u32 {
		self.article_rank.get(image_id).copied().unwrap_or(UNRANKED_ARTICLE)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RankBoost {
	/// `max_boost * sigmoid(similarity_weight * s - rank_weight * ln(rank) + bias)`, zero below
	/// `min_similarity`.
	Sigmoid {
		min_similarity: f32,
		similarity_weight: f32,
		rank_weight: f32,
		bias: f32,
		max_boost: f32,
	},
	/// `factor / rank`.
	Linear { factor: f32 },
}
impl RankBoost {
	pub fn from_config(cfg: &rankfuse_config::Boost) -> Result<Self> {
		match cfg.mode.as_str() {
			"sigmoid" => Ok(Self::Sigmoid {
				min_similarity: cfg.min_similarity,
				similarity_weight: cfg.similarity_weight,
				rank_weight: cfg.rank_weight,
				bias: cfg.bias,
				max_boost: cfg.max_boost,
			}),
			"linear" => Ok(Self::Linear { factor: cfg.linear_factor }),
			other => Err(Error::InvalidConfig { message: format!("Unknown boost mode {other:?}.") }),
		}
	}

	/// Boost for a hit with `similarity` whose article sits at 1-based `article_rank`.
	pub fn boost(&self, similarity: f32, article_rank: u32) -> f32 {
		let rank = f64::from(article_rank.max(1));

		match *self {
			Self::Linear { factor } => (f64::from(factor) / rank) as f32,
			Self::Sigmoid { min_similarity, similarity_weight, rank_weight, bias, max_boost } => {
				if similarity < min_similarity {
					return 0.0;
				}

				let input = f64::from(similarity_weight) * f64::from(similarity)
					- f64::from(rank_weight) * rank.ln()
					+ f64::from(bias);
				let sigmoid = 1.0 / (1.0 + (-input).exp());

				(sigmoid * f64::from(max_boost)) as f32
			},
		}
	}
}

/// Adds the article-rank boost to every hit and re-sorts by the boosted score.
pub fn boosted(
	hits: Vec<(String, f32)>,
	candidates: &CandidateImages,
	boost: &RankBoost,
) -> Vec<(String, f32)> {
	let mut hits: Vec<(String, f32)> = hits
		.into_iter()
		.map(|(image_id, similarity)| {
			let bonus = boost.boost(similarity, candidates.rank(&image_id));

			(image_id, similarity + bonus)
		})
		.collect();

	hits.sort_by(|left, right| right.1.total_cmp(&left.1));

	hits
}

/// Weighted RRF over per-collection lists; a single list passes through with its own scores.
///
/// Equal scores keep first-seen order.
pub fn merge_collections(
	lists: &[(f32, Vec<(String, f32)>)],
	rrf_k: u32,
	limit: usize,
) -> Vec<(String, f32)> {
	if let [(_, only)] = lists {
		return only.iter().take(limit).cloned().collect();
	}

	let mut order: Vec<(String, f32)> = Vec::new();
	let mut index: HashMap<String, usize> = HashMap::new();

	for (weight, hits) in lists {
		for (position, (image_id, _)) in hits.iter().enumerate() {
			let score = weight / (rrf_k as f32 + position as f32 + 1.0);

			match index.get(image_id) {
				Some(slot) => order[*slot].1 += score,
				None => {
					index.insert(image_id.clone(), order.len());
					order.push((image_id.clone(), score));
				},
			}
		}
	}

	order.sort_by(|left, right| right.1.total_cmp(&left.1));
	order.truncate(limit);

	order
}

/// Item id stored under `key`; integer payloads are rendered as decimal strings.
pub fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
		Some(Kind::IntegerValue(number)) => Some(number.to_string()),
		_ => None,
	}
}

#[allow(deprecated)]
fn dense_vector(point: &RetrievedPoint) -> Option<Vec<f32>> {
	match point.vectors.as_ref()?.vectors_options.as_ref()? {
		VectorsOptions::Vector(vector) if !vector.data.is_empty() => Some(vector.data.clone()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	fn sigmoid() -> RankBoost {
		RankBoost::from_config(&rankfuse_config::Boost::default()).expect("Default boost is valid.")
	}

	fn hits(raw: &[(&str, f32)]) -> Vec<(String, f32)> {
		raw.iter().map(|(id, score)| (id.to_string(), *score)).collect()
	}

	#[test]
	fn reads_string_and_integer_ids() {
		let payload = HashMap::from([
			("image_id".to_string(), Value::from("L01_V001_12")),
			("frame".to_string(), Value::from(12_i64)),
			("flag".to_string(), Value::from(true)),
		]);

		assert_eq!(payload_string(&payload, "image_id").as_deref(), Some("L01_V001_12"));
		assert_eq!(payload_string(&payload, "frame").as_deref(), Some("12"));
		assert_eq!(payload_string(&payload, "flag"), None);
		assert_eq!(payload_string(&payload, "missing"), None);
	}

	#[test]
	fn sigmoid_boost_rewards_similarity_and_penalizes_article_rank() {
		let boost = sigmoid();

		assert_eq!(boost.boost(0.49, 1), 0.0);
		assert!((boost.boost(0.8, 1) - 0.499_832).abs() < 1e-5);
		assert!((boost.boost(0.8, 10) - 0.452_046).abs() < 1e-5);
		assert!((boost.boost(0.6, 3) - 0.481_399).abs() < 1e-5);
		assert!(boost.boost(0.8, 1) > boost.boost(0.8, 2));
		assert!(boost.boost(0.9, 4) > boost.boost(0.7, 4));
	}

	#[test]
	fn linear_boost_divides_by_article_rank() {
		let boost = RankBoost::Linear { factor: 0.3 };

		assert!((boost.boost(0.1, 3) - 0.1).abs() < 1e-6);
		assert!((boost.boost(0.9, 1) - 0.3).abs() < 1e-6);
		assert!((boost.boost(0.9, 0) - 0.3).abs() < 1e-6);
	}

	#[test]
	fn unknown_boost_mode_is_rejected() {
		let cfg = rankfuse_config::Boost { mode: "step".to_string(), ..Default::default() };

		assert!(matches!(RankBoost::from_config(&cfg), Err(Error::InvalidConfig { .. })));
	}

	#[test]
	fn candidates_follow_article_order_and_keep_best_rank() {
		let cfg = rankfuse_config::Cascade {
			article_map: PathBuf::from("map.json"),
			max_articles: 2,
			boost: rankfuse_config::Boost::default(),
		};
		let article_images = HashMap::from([
			("a1".to_string(), vec!["i1".to_string(), "i2".to_string()]),
			("a2".to_string(), vec!["i2".to_string(), "i3".to_string()]),
			("a3".to_string(), vec!["i4".to_string()]),
		]);
		let articles = BTreeMap::from([
			("q1".to_string(), RankedList::from_items("q1", ["a1", "a2", "a3"]).expect("Valid list.")),
			("q2".to_string(), RankedList::from_items("q2", ["missing"]).expect("Valid list.")),
		]);
		let cascade = Cascade::new(&cfg, article_images, articles).expect("Cascade must build.");
		let candidates = cascade.candidates("q1").expect("q1 has candidate images.");

		assert_eq!(candidates.image_ids, vec!["i1", "i2", "i3"]);
		assert_eq!(candidates.rank("i2"), 1);
		assert_eq!(candidates.rank("i3"), 2);
		assert_eq!(candidates.rank("i4"), UNRANKED_ARTICLE);
		assert!(cascade.candidates("q2").is_none());
		assert!(cascade.candidates("q3").is_none());
	}

	#[test]
	fn boost_can_lift_an_image_from_a_better_article() {
		let candidates = CandidateImages {
			image_ids: vec!["a".to_string(), "b".to_string()],
			article_rank: HashMap::from([("a".to_string(), 1), ("b".to_string(), 5)]),
		};
		let ranked = boosted(
			hits(&[("b", 0.82), ("a", 0.80)]),
			&candidates,
			&RankBoost::Linear { factor: 0.3 },
		);
		let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();

		assert_eq!(ids, vec!["a", "b"]);
		assert!((ranked[0].1 - 1.1).abs() < 1e-6);
	}

	#[test]
	fn collections_merge_by_weighted_rrf() {
		let single = merge_collections(&[(0.5, hits(&[("x", 0.9), ("y", 0.8)]))], 60, 1);

		assert_eq!(single, hits(&[("x", 0.9)]));

		let merged = merge_collections(
			&[(1.0, hits(&[("x", 0.9), ("y", 0.8)])), (2.0, hits(&[("y", 0.7), ("z", 0.6)]))],
			60,
			10,
		);
		let ids: Vec<&str> = merged.iter().map(|(id, _)| id.as_str()).collect();

		assert_eq!(ids, vec!["y", "z", "x"]);
		assert!((merged[0].1 - (1.0 / 62.0 + 2.0 / 61.0)).abs() < 1e-6);
	}
}
