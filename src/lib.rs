pub mod aggregation;
pub mod display;
pub mod output;
pub mod sources;
pub mod types;

// Re-exports for library users
pub use aggregation::Aggregator;
pub use display::display_totals_table;
pub use output::{write_csv, CsvDialect};
pub use sources::{counts_from_query, totals_from_query, value_sets_from_query, QueryCursor};
pub use types::{sum_totals, AggregationError, Observation, Total, Value};
