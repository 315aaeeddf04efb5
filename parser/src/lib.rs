// Parser crate for access-log CSV input and NDJSON output

pub mod types;
pub mod url_norm;
pub mod record;
pub mod csv_parser;
pub mod ndjson;

// Re-export main types
pub use types::*;
pub use csv_parser::{CsvRowReader, RowRead};
pub use record::parse_record;
pub use url_norm::normalize_url;
pub use ndjson::{parse_ndjson, write_ndjson};
