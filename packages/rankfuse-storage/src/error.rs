#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("I/O error at {path:?}.")]
	Io { path: std::path::PathBuf, source: std::io::Error },
	#[error(transparent)]
	Csv(#[from] csv::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error("Invalid header: {message}")]
	InvalidHeader { message: String },
	#[error(transparent)]
	RankedList(#[from] rankfuse_domain::RankedListError),
}
