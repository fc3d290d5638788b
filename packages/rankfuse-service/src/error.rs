pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
	#[error("Report error: {message}")]
	Report { message: String },
	#[error(transparent)]
	Storage(#[from] rankfuse_storage::Error),
}
