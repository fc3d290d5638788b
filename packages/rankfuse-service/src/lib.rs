pub mod aggregator;
pub mod fusion;
pub mod policy;
pub mod report;
pub mod source;

mod error;

pub use aggregator::{AggregationRun, Aggregator, QueryOutcome, SkipReason, SkippedQuery};
pub use error::{Error, Result};
pub use fusion::FusedItem;
pub use policy::{FusionMode, FusionPolicy, Gating, TieBreakKey};
pub use report::RunReport;
pub use source::{Source, SourceArg, resolve_names};
