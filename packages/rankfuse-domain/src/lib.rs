pub mod aggregate;
pub mod entity;
pub mod query;
pub mod ranked_list;

pub use aggregate::{AggregateError, AggregatedResult};
pub use entity::EntityWeights;
pub use query::{Entity, Query};
pub use ranked_list::{Candidate, ColumnKind, RankedList, RankedListError};
