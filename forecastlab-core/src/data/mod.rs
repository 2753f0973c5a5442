//! Raw text ingestion.

pub mod parse;

pub use parse::{
    parse_date, parse_series, parse_series_with_min, ParseReport, ParsedSeries, RowError,
    SkippedRow, DATE_FORMAT, MIN_SERIES_LEN,
};
