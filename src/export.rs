//! CSV export of the visible session subset.
//!
//! Produces a complete delimited-text document: fixed column header, one
//! row per session, newline-terminated rows. Money fields are plain numbers
//! so the file stays machine-parseable; fields containing separators or
//! quotes are quoted per RFC 4180. How the bytes reach the user (download,
//! share sheet) is the embedding app's concern.

use chrono::{DateTime, NaiveDate, Utc};

use crate::session::Session;

/// Fixed column order of the export.
pub const CSV_HEADER: [&str; 8] = [
    "Cashier",
    "Opened At",
    "Closed At",
    "Starting Cash",
    "Total Sales",
    "Ending Cash",
    "Variance",
    "Status",
];

/// Rendered in the Closed At column while a session is still open.
const OPEN_PLACEHOLDER: &str = "-";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serialize `sessions` to a CSV document, header row first.
pub fn to_csv(sessions: &[Session]) -> String {
    let mut out = String::new();
    write_row(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));

    for session in sessions {
        write_row(
            &mut out,
            [
                session.display_name().to_string(),
                format_timestamp(session.opened_at),
                session
                    .closed_at
                    .map(format_timestamp)
                    .unwrap_or_else(|| OPEN_PLACEHOLDER.to_string()),
                format_amount(session.starting_cash),
                format_amount(session.total_sales),
                format_amount(session.ending_cash.unwrap_or(0.0)),
                format_amount(session.variance().unwrap_or(0.0)),
                session.status.as_str().to_string(),
            ]
            .into_iter(),
        );
    }

    out
}

/// File name for an export produced on `date`, e.g.
/// `cashier-sessions-2024-01-05.csv`.
pub fn export_filename(date: NaiveDate) -> String {
    format!("cashier-sessions-{}.csv", date.format("%Y-%m-%d"))
}

fn write_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape_field(&field));
    }
    out.push('\n');
}

/// RFC 4180 quoting: wrap the field when it contains a comma, quote, or
/// line break, doubling embedded quotes.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Plain number rendering, no thousands separators or currency symbol.
fn format_amount(amount: f64) -> String {
    format!("{amount}")
}

// ===========================================================================
// Tests
// ===========================================================================
