use std::collections::HashMap;

use rankfuse_domain::{
	AggregateError, AggregatedResult, Candidate, ColumnKind, Entity, EntityWeights, Query, RankedList,
	RankedListError,
};

#[test]
fn ranked_list_accepts_gaps_but_not_reordering() {
	let list = RankedList::new("q1", vec![Candidate::new("a", 1), Candidate::new("b", 3)])
		.expect("Gapped ranks are valid.");

	assert_eq!(list.len(), 2);
	assert_eq!(list.leading_len(), 1);

	let err = RankedList::new("q1", vec![Candidate::new("a", 2), Candidate::new("b", 2)])
		.expect_err("Repeated rank must be rejected.");

	assert_eq!(err, RankedListError::RankOrder { previous: 2, rank: 2 });
}

#[test]
fn ranked_list_rejects_zero_rank_blank_ids_and_duplicates() {
	assert_eq!(
		RankedList::new("q1", vec![Candidate::new("a", 0)]),
		Err(RankedListError::ZeroRank { item_id: "a".to_string() })
	);
	assert_eq!(
		RankedList::new("q1", vec![Candidate::new(" ", 1)]),
		Err(RankedListError::EmptyItemId { position: 1 })
	);
	assert_eq!(
		RankedList::from_items("q1", ["a", "b", "a"]),
		Err(RankedListError::DuplicateItem { item_id: "a".to_string() })
	);
	assert_eq!(RankedList::from_items("", ["a"]), Err(RankedListError::EmptyQueryId));
}

#[test]
fn from_items_assigns_positional_ranks() {
	let list = RankedList::from_items("q1", ["x", "y", "z"]).expect("Valid list.");
	let ranks: Vec<u32> = list.candidates().iter().map(|candidate| candidate.rank).collect();

	assert_eq!(ranks, vec![1, 2, 3]);
	assert_eq!(list.leading_len(), 3);
	assert_eq!(list.item_ids().collect::<Vec<_>>(), vec!["x", "y", "z"]);
}

#[test]
fn column_kind_headers() {
	assert_eq!(ColumnKind::ImageId.header(4), "image_id_4");
	assert_eq!(ColumnKind::parse("article_id"), Some(ColumnKind::ArticleId));
	assert_eq!(ColumnKind::parse("doc_id"), None);
}

#[test]
fn aggregated_result_dedupes_and_truncates() {
	let mut result = AggregatedResult::new();

	result
		.insert(
			"q2",
			vec!["a".to_string(), "b".to_string(), "a".to_string(), "c".to_string(), "d".to_string()],
			3,
		)
		.expect("Insert must succeed.");
	result.insert("q1", Vec::new(), 3).expect("Insert must succeed.");

	assert_eq!(result.get("q2"), Some(&["a".to_string(), "b".to_string(), "c".to_string()][..]));
	assert_eq!(result.get("q1"), Some(&[][..]));
	assert_eq!(result.iter().map(|(query_id, _)| query_id).collect::<Vec<_>>(), vec!["q1", "q2"]);
	assert_eq!(result.max_row_len(), 3);
}

#[test]
fn aggregated_result_stores_ids_the_csv_reader_can_return() {
	let mut result = AggregatedResult::new();

	result
		.insert(
			" q1 ",
			vec!["x ".to_string(), "#".to_string(), " ".to_string(), "y".to_string(), " x".to_string()],
			3,
		)
		.expect("Insert must succeed.");

	assert_eq!(result.get("q1"), Some(&["x".to_string(), "y".to_string()][..]));
	assert_eq!(result.get(" q1 "), None);
	assert_eq!(result.insert("  ", vec!["a".to_string()], 3), Err(AggregateError::EmptyQueryId));
	assert_eq!(result.len(), 1);
}

#[test]
fn entity_weights_fall_back_to_default_label() {
	let weights = EntityWeights::new(HashMap::from([
		("PERSON".to_string(), 4.3_f32),
		("DEFAULT".to_string(), 0.5_f32),
	]));

	assert_eq!(weights.weight("PERSON"), 4.3);
	assert_eq!(weights.weight("GPE"), 0.5);
	assert_eq!(EntityWeights::default().weight("GPE"), 1.0);
}

#[test]
fn query_deserializes_with_optional_fields() {
	let query: Query = serde_json::from_value(serde_json::json!({
		"id": "q1",
		"text": "Crowd at the final",
		"entities": [
			{ "label": "EVENT", "text": " final " },
			{ "label": "PERSON", "text": "  " }
		]
	}))
	.expect("Query must deserialize.");

	assert!(query.summary.is_none());
	assert_eq!(
		query.usable_entities().collect::<Vec<_>>(),
		vec![Entity { label: "EVENT".to_string(), text: "final".to_string() }]
	);
}
