pub mod json;
pub mod models;
pub mod ranked_csv;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
