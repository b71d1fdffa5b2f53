use crate::data::{Error, Row};
use std::io::Read;
use tracing::info;

/// Column names that may carry the order date, by decreasing priority.
pub(crate) const DATE_COLUMNS: [&str; 7] = [
    "Date",
    "TxnDate",
    "Transaction Date",
    "PO Date",
    "DocDate",
    "PODate",
    "DATE",
];

/// Trait for doing something with a `Row` read from a CSV file. Used by the
/// grouping logic to build purchase orders, but also by tests to check what
/// the reader hands out. An error stops the reading.
pub(crate) trait RowUser {
    fn use_row(&mut self, row: Row) -> Result<(), Error>;
}

/// CSV importer for `Row`s. The whole input is buffered first so a leading
/// byte-order mark can be dropped; returns how many rows were handed over.
pub(crate) fn read_rows<R: Read, U: RowUser>(
    mut reader: R,
    user: &mut U,
) -> Result<usize, Error> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    let input = input.strip_prefix('\u{feff}').unwrap_or(input.as_str());

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(input.as_bytes());
    let headers = rdr.headers()?.clone();
    let mut count = 0;
    for result in rdr.records() {
        let record = result?;
        // short records just lack their trailing columns
        user.use_row(headers.iter().zip(record.iter()).collect())?;
        count += 1;
    }
    info!(rows = count, "read CSV input");
    Ok(count)
}

/// The first non-empty date column of `row`, trimmed, or `""` if there's none.
/// A whitespace-only column still wins over the ones after it.
pub(crate) fn date_field(row: &Row) -> &str {
    DATE_COLUMNS
        .iter()
        .map(|column| row.get(column))
        .find(|value| !value.is_empty())
        .map(str::trim)
        .unwrap_or_default()
}

/// Tabs and line breaks would shift the IIF columns around, so they become spaces.
pub(crate) fn sanitize(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

/// A trimmed, sanitized text column; missing columns come back empty.
pub(crate) fn text_field(row: &Row, column: &str) -> String {
    sanitize(row.get(column).trim())
}
