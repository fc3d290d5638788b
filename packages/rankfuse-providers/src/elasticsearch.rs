//! Entity-weighted full-text search against an Elasticsearch index of articles.
//!
//! Every extracted entity becomes a `function_score` clause whose boost is the label's weight, so
//! a matching PERSON outranks a matching LANGUAGE. A second clause rewards documents where the same
//! text appears under the same label.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{BoxFuture, Error, RankedListProvider, Result};
use rankfuse_domain::{Entity, EntityWeights, Query, RankedList};

const ENTITIES_PATH: &str = "entities";
const TERM_BOOST: f32 = 5.0;
const FUZZY_BOOST: f32 = 2.0;
const PREFIX_BOOST: f32 = 1.5;

pub struct ElasticsearchProvider {
	client: Client,
	cfg: rankfuse_config::Elasticsearch,
	weights: EntityWeights,
}
impl ElasticsearchProvider {
	pub fn new(cfg: &rankfuse_config::Elasticsearch, weights: EntityWeights) -> Result<Self> {
		if cfg.url.trim().is_empty() || cfg.index.trim().is_empty() {
			return Err(Error::InvalidConfig {
				message: "Elasticsearch url and index must be non-empty.".to_string(),
			});
		}

		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, cfg: cfg.clone(), weights })
	}

	pub fn search_url(&self) -> String {
		format!("{}/{}/_search", self.cfg.url.trim_end_matches('/'), self.cfg.index)
	}

	async fn search(&self, query: &Query) -> Result<RankedList> {
		let entities: Vec<Entity> = query.usable_entities().collect();

		if entities.is_empty() {
			tracing::debug!(query_id = %query.id, "Query has no usable entities.");

			return Ok(RankedList::new(query.id.as_str(), Vec::new())?);
		}

		let body = build_entity_query(
			&entities,
			&self.weights,
			self.cfg.same_label_bonus,
			self.cfg.size,
			&self.cfg.id_field,
		);
		let res = self.client.post(self.search_url()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;
		let list = parse_search_response(&query.id, &json, &self.cfg.id_field)?;

		tracing::debug!(
			query_id = %query.id,
			entities = entities.len(),
			hits = list.len(),
			"Entity search finished."
		);

		Ok(list)
	}
}
impl RankedListProvider for ElasticsearchProvider {
	fn name(&self) -> &str {
		"elasticsearch"
	}

	fn width(&self) -> usize {
		self.cfg.size as usize
	}

	fn ranked_list<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<RankedList>> {
		Box::pin(self.search(query))
	}
}

pub fn build_entity_query(
	entities: &[Entity],
	weights: &EntityWeights,
	same_label_bonus: f32,
	size: u32,
	id_field: &str,
) -> Value {
	let mut should = Vec::with_capacity(entities.len() * 2);

	for entity in entities {
		let weight = weights.weight(&entity.label);

		should.push(serde_json::json!({
			"function_score": {
				"query": {
					"nested": {
						"path": ENTITIES_PATH,
						"query": {
							"bool": {
								"should": [
									{ "term": { "entities.text.keyword": { "value": entity.text, "boost": TERM_BOOST } } },
									{ "match": { "entities.text": { "query": entity.text, "boost": FUZZY_BOOST, "fuzziness": "AUTO" } } },
									{ "prefix": { "entities.text.keyword": { "value": entity.text.to_lowercase(), "boost": PREFIX_BOOST } } }
								]
							}
						},
						"score_mode": "max"
					}
				},
				"boost": weight,
				"boost_mode": "multiply"
			}
		}));

		if entity.label.is_empty() {
			continue;
		}

		should.push(serde_json::json!({
			"function_score": {
				"query": {
					"nested": {
						"path": ENTITIES_PATH,
						"query": {
							"bool": {
								"must": [
									{ "match": { "entities.text": entity.text } },
									{ "term": { "entities.label": entity.label } }
								]
							}
						}
					}
				},
				"boost": weight * same_label_bonus
			}
		}));
	}

	serde_json::json!({
		"size": size,
		"_source": [id_field, ENTITIES_PATH],
		"query": {
			"bool": {
				"should": should,
				"minimum_should_match": 1
			}
		}
	})
}

pub fn parse_search_response(query_id: &str, json: &Value, id_field: &str) -> Result<RankedList> {
	let hits = json
		.get("hits")
		.and_then(|hits| hits.get("hits"))
		.and_then(Value::as_array)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Search response is missing hits.hits array.".to_string(),
		})?;
	let ids = hits.iter().map(|hit| {
		let id = hit.get("_source").and_then(|source| source.get(id_field)).and_then(id_string);
		let score = hit.get("_score").and_then(Value::as_f64).map(|score| score as f32);

		(id, score)
	});

	crate::ranked_from_hits(query_id, ids)
}

fn id_string(value: &Value) -> Option<String> {
	match value {
		Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}
