use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use tracing::debug;

/// The one date format the IIF side ever sees.
pub const IIF_DATE_FORMAT: &str = "%m/%d/%Y";

/// A `strftime`-style pattern we're willing to read dates in. Patterns carrying a
/// time of day have to be parsed as a date-time even though we only keep the date,
/// otherwise chrono complains about the leftover fields.
struct Format {
    pattern: &'static str,
    with_time: bool,
}

const fn date(pattern: &'static str) -> Format {
    Format {
        pattern,
        with_time: false,
    }
}

const fn date_time(pattern: &'static str) -> Format {
    Format {
        pattern,
        with_time: true,
    }
}

/// Tried in this order, first hit wins.
const KNOWN_FORMATS: &[Format] = &[
    date_time("%m/%d/%Y %I:%M %p"),
    date_time("%m/%d/%Y %H:%M"),
    date("%m/%d/%Y"),
    date("%m/%d/%y"),
    date("%m-%d-%Y"),
    date("%m-%d-%y"),
    date("%Y-%m-%d"),
    date_time("%Y-%m-%d %H:%M:%S"),
    date("%Y/%m/%d"),
    date("%b %d, %Y"),
    date("%b %d %Y"),
    date("%B %d, %Y"),
    date("%B %d %Y"),
];

/// Last chance for dates whose separators got mixed up, once every `-` became a `/`.
const SLASHED_FORMATS: &[Format] = &[date("%m/%d/%Y"), date("%m/%d/%y"), date("%Y/%m/%d")];

const ISO_OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

const ISO_FORMATS: &[Format] = &[
    date("%Y-%m-%d"),
    date("%Y%m%d"),
    date_time("%Y-%m-%dT%H:%M:%S%.f"),
    date_time("%Y-%m-%d %H:%M:%S%.f"),
    date_time("%Y-%m-%dT%H:%M"),
    date_time("%Y-%m-%d %H:%M"),
];

/// Turns whatever a spreadsheet put in a date column into `MM/DD/YYYY`.
///
/// "Today" is frozen when the normalizer is built so that every row of a run
/// falling back to it gets the very same date, even across midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DateNormalizer {
    today: NaiveDate,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl DateNormalizer {
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Never fails: anything we can't make sense of becomes today's date, which
    /// keeps the output importable. This is the only place that decides so.
    pub fn normalize(&self, raw: &str) -> String {
        let date = parse(raw).unwrap_or_else(|| {
            if !raw.trim().is_empty() {
                debug!(raw, "unrecognized date, using today");
            }
            self.today
        });
        date.format(IIF_DATE_FORMAT).to_string()
    }
}

/// Lenient date parsing, `None` when nothing fits:
/// 1. the whole trimmed string against the known formats,
/// 2. its first word against the same formats (drops a trailing time of day),
/// 3. that word with `-` swapped for `/` against the slashed formats,
/// 4. a general ISO 8601 reading of the whole string, trailing `Z` removed.
pub(crate) fn parse(raw: &str) -> Option<NaiveDate> {
    let candidate = raw.trim();
    let token = candidate.split_whitespace().next()?;

    parse_with(candidate, KNOWN_FORMATS)
        .or_else(|| parse_with(token, KNOWN_FORMATS))
        .or_else(|| parse_with(&token.replace('-', "/"), SLASHED_FORMATS))
        .or_else(|| parse_iso(candidate.strip_suffix('Z').unwrap_or(candidate)))
}

fn parse_with(value: &str, formats: &[Format]) -> Option<NaiveDate> {
    formats.iter().find_map(|format| {
        let date = if format.with_time {
            NaiveDateTime::parse_from_str(value, format.pattern)
                .ok()?
                .date()
        } else {
            NaiveDate::parse_from_str(value, format.pattern).ok()?
        };
        if format.pattern.contains("%y") {
            pivot_two_digit_year(date)
        } else {
            four_digit_year(date)
        }
    })
}

fn parse_iso(value: &str) -> Option<NaiveDate> {
    ISO_OFFSET_FORMATS
        .iter()
        .find_map(|pattern| DateTime::parse_from_str(value, pattern).ok())
        // keep the date as written, whatever the offset
        .map(|date_time| date_time.naive_local().date())
        .and_then(four_digit_year)
        .or_else(|| parse_with(value, ISO_FORMATS))
}

/// `%Y` happily reads `24` as year 24; a year column with fewer than four digits
/// has to go through the `%y` patterns instead.
fn four_digit_year(date: NaiveDate) -> Option<NaiveDate> {
    (1000..=9999).contains(&date.year()).then_some(date)
}

/// Two-digit years map to 1969..=2068, whichever pivot chrono itself applies.
fn pivot_two_digit_year(date: NaiveDate) -> Option<NaiveDate> {
    match date.year() {
        year if year > 2068 => date.with_year(year - 100),
        year if year < 1969 => date.with_year(year + 100),
        _ => Some(date),
    }
}
