pub mod assemble;
pub mod datetime;
pub mod location;
pub mod tags;

use std::path::PathBuf;

use thiserror::Error;

pub use assemble::{dedup_events, Normalizer};
pub use datetime::{parse_datetime_text, EventDateTime};
pub use location::LocationTable;
pub use tags::TagTable;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read table {0:?}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("invalid table json: {0}")]
    Parse(#[from] serde_json::Error),
}
