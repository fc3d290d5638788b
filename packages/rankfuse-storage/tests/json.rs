use rankfuse_storage::json;
use rankfuse_testkit::TestDir;

#[test]
fn query_ids_are_trimmed_before_dedupe() {
	let dir = TestDir::new().expect("Failed to create test directory.");

	dir.write(
		"queries.json",
		r#"[
			{ "id": " q1", "text": "first" },
			{ "id": "q1", "text": "repeat" },
			{ "id": "   ", "text": "blank" },
			{ "id": "q2 ", "text": "second" }
		]"#,
	)
	.expect("Failed to write queries.");

	let queries = json::read_queries(&dir.join("queries.json")).expect("Queries must load.");
	let ids: Vec<(&str, &str)> =
		queries.iter().map(|query| (query.id.as_str(), query.text.as_str())).collect();

	assert_eq!(ids, vec![("q1", "first"), ("q2", "second")]);

	dir.cleanup().expect("Failed to clean up test directory.");
}

#[test]
fn article_map_trims_ids_and_drops_blanks() {
	let dir = TestDir::new().expect("Failed to create test directory.");

	dir.write("map.json", r#"{ "a1": ["img1 ", " ", "img2"], " ": ["img3"], "a2": [] }"#)
		.expect("Failed to write article map.");

	let map = json::read_article_map(&dir.join("map.json")).expect("Article map must load.");

	assert_eq!(map.len(), 2);
	assert_eq!(map["a1"], vec!["img1".to_string(), "img2".to_string()]);
	assert!(map["a2"].is_empty());

	dir.cleanup().expect("Failed to clean up test directory.");
}
