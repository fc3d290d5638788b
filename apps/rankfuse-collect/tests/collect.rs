use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing};
use clap::Parser;
use serde_json::Value;
use tokio::{
	net::TcpListener,
	sync::{oneshot, oneshot::Sender},
};

use rankfuse_collect::{Args, SourceKind, build_provider, collect};
use rankfuse_testkit::TestDir;

const QUERIES: &str = r#"[
	{ "id": "q2", "text": "Harbour fire", "entities": [{ "label": "FAC", "text": "Harbour" }] },
	{ "id": "q1", "text": "Election night", "entities": [{ "label": "EVENT", "text": "Election" }] },
	{ "id": "q3", "text": "No entities here" }
]"#;

async fn start_search_server() -> (String, Sender<()>) {
	let app = Router::new().route("/articles/_search", routing::post(search_handler));
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind search server.");
	let addr = listener.local_addr().expect("Failed to read search server address.");
	let (tx, rx) = oneshot::channel();
	let server = axum::serve(listener, app).with_graceful_shutdown(async move {
		let _ = rx.await;
	});

	tokio::spawn(async move {
		let _ = server.into_future().await;
	});

	(format!("http://{addr}"), tx)
}

async fn search_handler(Json(payload): Json<Value>) -> impl IntoResponse {
	let text = payload["query"]["bool"]["should"][0]["function_score"]["query"]["nested"]["query"]
		["bool"]["should"][0]["term"]["entities.text.keyword"]["value"]
		.as_str()
		.unwrap_or_default()
		.to_lowercase();
	let body = serde_json::json!({
		"hits": {
			"hits": [
				{ "_score": 2.0, "_source": { "article_id": format!("{text}_a") } },
				{ "_score": 1.0, "_source": { "article_id": format!("{text}_b") } }
			]
		}
	});

	(StatusCode::OK, Json(body)).into_response()
}

fn config_toml(es_url: &str) -> String {
	format!(
		r##"
[service]
log_level = "info"

[fusion]
mode = "rrf"
top_k = 10

[output]
placeholder = "#"

[entity_weights]
EVENT = 2.9
DEFAULT = 1.0

[providers.elasticsearch]
url = "{es_url}"
index = "articles"
size = 3
"##
	)
}

fn args(dir: &TestDir, source: &str, extra: &[&str]) -> Args {
	let config = dir.join("rankfuse.toml").display().to_string();
	let queries = dir.join("queries.json").display().to_string();
	let output = dir.join("out/es.csv").display().to_string();
	let mut argv = vec![
		"rankfuse-collect".to_string(),
		"-c".to_string(),
		config,
		"--queries".to_string(),
		queries,
		"--source".to_string(),
		source.to_string(),
		"-o".to_string(),
		output,
	];

	argv.extend(extra.iter().map(|arg| arg.to_string()));

	Args::parse_from(argv)
}

#[tokio::test]
async fn collects_entity_search_rows_into_csv() {
	let dir = TestDir::new().expect("Failed to create test directory.");
	let (url, shutdown) = start_search_server().await;

	dir.write("rankfuse.toml", &config_toml(&url)).expect("Failed to write config.");
	dir.write("queries.json", QUERIES).expect("Failed to write queries.");

	let args = args(&dir, "elasticsearch", &[]);
	let config = rankfuse_config::load(&args.config).expect("Config must load.");
	let output = collect(&config, &args).await.expect("Collect must succeed.");

	assert_eq!(output.queries, 3);
	assert_eq!(output.empty, 1);
	assert_eq!(output.failed, 0);
	assert_eq!(
		dir.read("out/es.csv").expect("Output must exist."),
		"query_id,article_id_1,article_id_2,article_id_3\n\
		 q1,election_a,election_b,#\n\
		 q2,harbour_a,harbour_b,#\n\
		 q3,#,#,#\n"
	);

	let _ = shutdown.send(());

	dir.cleanup().expect("Failed to clean up test directory.");
}

#[tokio::test]
async fn max_queries_limits_the_run() {
	let dir = TestDir::new().expect("Failed to create test directory.");
	let (url, shutdown) = start_search_server().await;

	dir.write("rankfuse.toml", &config_toml(&url)).expect("Failed to write config.");
	dir.write("queries.json", QUERIES).expect("Failed to write queries.");

	let args = args(&dir, "elasticsearch", &["--max-queries", "1"]);
	let config = rankfuse_config::load(&args.config).expect("Config must load.");
	let output = collect(&config, &args).await.expect("Collect must succeed.");

	assert_eq!(output.queries, 1);
	assert_eq!(
		dir.read("out/es.csv").expect("Output must exist."),
		"query_id,article_id_1,article_id_2,article_id_3\nq2,harbour_a,harbour_b,#\n"
	);

	let _ = shutdown.send(());

	dir.cleanup().expect("Failed to clean up test directory.");
}

#[test]
fn missing_provider_section_is_an_error() {
	let dir = TestDir::new().expect("Failed to create test directory.");

	dir.write("rankfuse.toml", &config_toml("http://127.0.0.1:9")).expect("Failed to write config.");

	let config =
		rankfuse_config::load(&dir.join("rankfuse.toml")).expect("Config must load.");

	assert!(build_provider(&config, SourceKind::Qdrant, None).is_err());
	assert!(build_provider(&config, SourceKind::Elasticsearch, None).is_ok());
	assert!(
		build_provider(&config, SourceKind::Elasticsearch, Some(dir.join("a.csv").as_path())).is_err()
	);

	dir.cleanup().expect("Failed to clean up test directory.");
}

#[tokio::test]
async fn candidates_need_a_cascade_section() {
	let dir = TestDir::new().expect("Failed to create test directory.");
	let qdrant = r#"
[providers.qdrant]
url = "http://127.0.0.1:9"
item_collection = "images"
limit = 5

[providers.qdrant.query_collections]
Query_Large = 1.0
"#;

	dir.write("rankfuse.toml", &(config_toml("http://127.0.0.1:9") + qdrant))
		.expect("Failed to write config.");
	dir.write("articles.csv", "query_id,article_id_1\nq1,a1\n").expect("Failed to write candidates.");

	let config =
		rankfuse_config::load(&dir.join("rankfuse.toml")).expect("Config must load.");
	let candidates = dir.join("articles.csv");
	let err = build_provider(&config, SourceKind::Qdrant, Some(candidates.as_path()))
		.err()
		.expect("Cascade search without a cascade section must fail.");

	assert!(err.to_string().contains("providers.qdrant.cascade"), "Unexpected error: {err}");
	assert!(build_provider(&config, SourceKind::Qdrant, None).is_ok());

	let map = dir
		.write("map.json", r#"{ "a1": ["i1", "i2"] }"#)
		.expect("Failed to write article map.");
	let cascade =
		format!("\n[providers.qdrant.cascade]\narticle_map = {:?}\n", map.display().to_string());

	dir.write("rankfuse.toml", &(config_toml("http://127.0.0.1:9") + qdrant + &cascade))
		.expect("Failed to write config.");

	let config =
		rankfuse_config::load(&dir.join("rankfuse.toml")).expect("Config must load.");
	let provider = build_provider(&config, SourceKind::Qdrant, Some(candidates.as_path()))
		.expect("Cascade provider must build.");

	assert_eq!(provider.name(), "qdrant");
	assert_eq!(provider.width(), 5);

	dir.cleanup().expect("Failed to clean up test directory.");
}
