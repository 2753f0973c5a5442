//! Series parser: semicolon-delimited `date;price` text → sorted price series.
//!
//! Parsing is best-effort per row. A row with a non-numeric or non-positive
//! price, or a date no known format accepts, is skipped and recorded in the
//! [`ParseReport`]; only a series that ends up too short fails the load.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::PricePoint;
use crate::error::PipelineError;

/// Minimum number of points for one default window (60) plus horizon (5).
pub const MIN_SERIES_LEN: usize = 65;

/// Primary date format of the input (`DD.MM.YYYY`).
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Tried in order when the primary format fails.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%Y.%m.%d",
];

/// Why a single row was dropped.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RowError {
    #[error("missing price column")]
    MissingPrice,

    #[error("price is not a number: '{0}'")]
    BadPrice(String),

    #[error("price must be positive, got {0}")]
    NonPositivePrice(f64),

    #[error("unrecognised date: '{0}'")]
    BadDate(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// A row the parser skipped, with its 1-based line number in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub line: u64,
    pub error: RowError,
}

/// What happened to every data row of one parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    /// Non-blank data rows seen (header excluded).
    pub rows_read: usize,
    /// Rows that became price points, after de-duplication.
    pub rows_accepted: usize,
    /// Rows dropped because an earlier row had the same date.
    pub duplicates_dropped: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Output of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedSeries {
    pub points: Vec<PricePoint>,
    pub report: ParseReport,
}

/// Parse a series and require at least [`MIN_SERIES_LEN`] points.
pub fn parse_series(text: &str) -> Result<ParsedSeries, PipelineError> {
    parse_series_with_min(text, MIN_SERIES_LEN)
}

/// Parse a series and require at least `min_len` points.
///
/// The first non-blank line is the header. Points come back sorted ascending
/// by date; when two rows share a date the earlier row in the input wins.
pub fn parse_series_with_min(text: &str, min_len: usize) -> Result<ParsedSeries, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut report = ParseReport::default();
    let mut points: Vec<PricePoint> = Vec::new();

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                report.rows_read += 1;
                skip(&mut report, line, RowError::Malformed(e.to_string()));
                continue;
            }
        };

        // Whitespace-only lines survive the reader as a single empty field.
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        report.rows_read += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        match parse_row(&record) {
            Ok(point) => points.push(point),
            Err(error) => skip(&mut report, line, error),
        }
    }

    // Stable sort keeps input order among equal dates, so dedup keeps the first.
    points.sort_by_key(|p| p.date);
    let before = points.len();
    points.dedup_by_key(|p| p.date);
    report.duplicates_dropped = before - points.len();
    report.rows_accepted = points.len();

    debug!(
        rows_read = report.rows_read,
        accepted = report.rows_accepted,
        skipped = report.skipped.len(),
        duplicates = report.duplicates_dropped,
        "parsed price series"
    );

    if points.len() < min_len {
        return Err(PipelineError::InsufficientData {
            points: points.len(),
            min_points: min_len,
        });
    }

    Ok(ParsedSeries { points, report })
}

fn skip(report: &mut ParseReport, line: u64, error: RowError) {
    debug!(line, %error, "skipping row");
    report.skipped.push(SkippedRow { line, error });
}

fn parse_row(record: &csv::StringRecord) -> Result<PricePoint, RowError> {
    let raw_date = record.get(0).unwrap_or_default();
    let raw_price = record
        .get(1)
        .filter(|s| !s.is_empty())
        .ok_or(RowError::MissingPrice)?;

    let price = parse_price(raw_price)?;
    let date = parse_date(raw_date).ok_or_else(|| RowError::BadDate(raw_date.to_string()))?;

    Ok(PricePoint { date, price })
}

/// Parse a price, accepting a decimal comma when no dot is present.
fn parse_price(raw: &str) -> Result<f64, RowError> {
    let text: Cow<'_, str> = if raw.contains(',') && !raw.contains('.') {
        Cow::Owned(raw.replace(',', "."))
    } else {
        Cow::Borrowed(raw)
    };

    let price: f64 = text
        .parse()
        .map_err(|_| RowError::BadPrice(raw.to_string()))?;

    // "NaN" and "inf" parse as f64 but are not prices.
    if !price.is_finite() {
        return Err(RowError::BadPrice(raw.to_string()));
    }
    if price <= 0.0 {
        return Err(RowError::NonPositivePrice(price));
    }
    Ok(price)
}

/// Parse a calendar date: `DD.MM.YYYY` first, then the fallback formats,
/// then RFC 3339 and `YYYY-MM-DD HH:MM:SS` timestamps (date part kept).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|ts| ts.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_primary_format_and_skips_header() {
        let text = "Datum;Schluss\n02.01.2024;100.5\n03.01.2024;101\n";
        let parsed = parse_series_with_min(text, 1).unwrap();

        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.points[0], PricePoint::new(ymd(2024, 1, 2), 100.5));
        assert_eq!(parsed.points[1], PricePoint::new(ymd(2024, 1, 3), 101.0));
        assert_eq!(parsed.report.rows_read, 2);
        assert!(parsed.report.skipped.is_empty());
    }

    #[test]
    fn sorts_by_calendar_date_not_text() {
        // Lexically "01.02" < "31.01", chronologically the other way round.
        let text = "date;price\n01.02.2024;2\n31.01.2024;1\n15.12.2023;0.5\n";
        let parsed = parse_series_with_min(text, 1).unwrap();
        let dates: Vec<NaiveDate> = parsed.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![ymd(2023, 12, 15), ymd(2024, 1, 31), ymd(2024, 2, 1)]);
    }

    #[test]
    fn bad_row_is_skipped_without_aborting() {
        let text = "date;price\n02.01.2024;100\nbad-date;abc\n03.01.2024;101\n";
        let parsed = parse_series_with_min(text, 1).unwrap();

        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.report.skipped.len(), 1);
        assert_eq!(parsed.report.skipped[0].line, 3);
        assert_eq!(
            parsed.report.skipped[0].error,
            RowError::BadPrice("abc".into())
        );
    }

    #[test]
    fn stray_quote_does_not_swallow_following_rows() {
        let start = ymd(2024, 1, 1);
        let mut text = String::from("date;price\n");
        for i in 0..20 {
            let date = start + chrono::Duration::days(i);
            text.push_str(&format!("{};{}\n", date.format(DATE_FORMAT), 100 + i));
        }
        text.push_str("\"bad-date;abc\n");
        for i in 20..40 {
            let date = start + chrono::Duration::days(i);
            text.push_str(&format!("{};{}\n", date.format(DATE_FORMAT), 100 + i));
        }

        let parsed = parse_series_with_min(&text, 1).unwrap();

        assert_eq!(parsed.points.len(), 40);
        assert_eq!(parsed.report.rows_read, 41);
        assert_eq!(parsed.report.skipped.len(), 1);
        assert_eq!(parsed.report.skipped[0].line, 22);
        assert_eq!(
            parsed.report.skipped[0].error,
            RowError::BadPrice("abc".into())
        );
    }

    #[test]
    fn non_positive_and_non_finite_prices_are_skipped() {
        let text = "date;price\n02.01.2024;0\n03.01.2024;-5\n04.01.2024;NaN\n05.01.2024;inf\n08.01.2024;7\n";
        let parsed = parse_series_with_min(text, 1).unwrap();
        assert_eq!(parsed.points.len(), 1);
        assert_eq!(parsed.report.skipped.len(), 4);
        assert_eq!(parsed.report.skipped[0].error, RowError::NonPositivePrice(0.0));
    }

    #[test]
    fn unparseable_date_with_good_price_is_skipped() {
        let text = "date;price\nyesterday;100\n02.01.2024;101\n";
        let parsed = parse_series_with_min(text, 1).unwrap();
        assert_eq!(parsed.points.len(), 1);
        assert_eq!(
            parsed.report.skipped[0].error,
            RowError::BadDate("yesterday".into())
        );
    }

    #[test]
    fn missing_price_column_is_skipped() {
        let text = "date;price\n02.01.2024\n03.01.2024;\n04.01.2024;9\n";
        let parsed = parse_series_with_min(text, 1).unwrap();
        assert_eq!(parsed.points.len(), 1);
        assert_eq!(parsed.report.skipped.len(), 2);
        assert!(parsed
            .report
            .skipped
            .iter()
            .all(|s| s.error == RowError::MissingPrice));
    }

    #[test]
    fn blank_lines_and_padding_are_ignored() {
        let text = "date ; price\n\n  02.01.2024 ;  100.0  \n   \n03.01.2024;101.0\n\n";
        let parsed = parse_series_with_min(text, 1).unwrap();
        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.report.rows_read, 2);
        assert!(parsed.report.skipped.is_empty());
    }

    #[test]
    fn duplicate_dates_keep_first_occurrence() {
        let text = "date;price\n02.01.2024;100\n03.01.2024;101\n02.01.2024;999\n";
        let parsed = parse_series_with_min(text, 1).unwrap();
        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.points[0].price, 100.0);
        assert_eq!(parsed.report.duplicates_dropped, 1);
        assert_eq!(parsed.report.rows_accepted, 2);
    }

    #[test]
    fn decimal_comma_is_accepted() {
        let text = "date;price\n02.01.2024;123,45\n";
        let parsed = parse_series_with_min(text, 1).unwrap();
        assert!((parsed.points[0].price - 123.45).abs() < 1e-12);
    }

    #[test]
    fn too_few_points_is_insufficient_data() {
        let mut text = String::from("date;price\n");
        for i in 1..=10 {
            text.push_str(&format!("{i:02}.01.2024;{}\n", 100 + i));
        }
        let err = parse_series(&text).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InsufficientData {
                points: 10,
                min_points: MIN_SERIES_LEN
            }
        );
    }

    #[test]
    fn header_only_input_is_insufficient_data() {
        let err = parse_series("date;price\n").unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { points: 0, .. }));
    }

    #[test]
    fn fallback_date_formats() {
        assert_eq!(parse_date("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("05/03/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("12/31/2024"), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date("2024/03/05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("05-03-2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024.03.05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T16:00:00Z"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05 16:00:00"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("5.3.2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("not a date"), None);
    }
}
