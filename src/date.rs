/// Date inference from filenames with filesystem-metadata fallback.
///
/// This module decides which year/month a file belongs to when date-based
/// sorting is enabled. Filename patterns are tried in strict priority order,
/// each candidate checked against the real calendar before it is accepted;
/// the file's modification time is used only when no filename pattern yields
/// a valid date.
use chrono::{DateTime, Datelike, Local, NaiveDate};
use regex::Regex;
use std::path::Path;

/// Years outside this range are never accepted, no matter how the digits parse.
pub const YEAR_MIN: i32 = 2000;
/// Upper bound of the accepted year range (inclusive).
pub const YEAR_MAX: i32 = 2199;

/// Identifies which inference strategy produced a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// A continuous `YYYYMMDD` digit run in the filename.
    FilenameContinuous,
    /// A separated `YYYY-MM-DD`-style filename pattern.
    FilenameIso,
    /// A separated `DD-MM-YYYY` filename pattern.
    FilenameDayMonthYear,
    /// A separated `MM-DD-YYYY` filename pattern.
    FilenameMonthDayYear,
    /// Filesystem last-modified time.
    Metadata,
    /// No date inference was performed (date sorting disabled).
    CategoryOnly,
}

impl DateSource {
    /// Returns the label recorded in the audit log for this source.
    pub fn label(&self) -> &'static str {
        match self {
            DateSource::FilenameContinuous => "Filename (Continuous)",
            DateSource::FilenameIso => "Filename (ISO)",
            DateSource::FilenameDayMonthYear => "Filename (DD-MM-YYYY)",
            DateSource::FilenameMonthDayYear => "Filename (MM-DD-YYYY)",
            DateSource::Metadata => "Metadata (OS)",
            DateSource::CategoryOnly => "Category Only",
        }
    }
}

impl std::fmt::Display for DateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The year/month a file was attributed to, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateInference {
    /// Four-digit year string, always within [2000, 2199].
    pub year: String,
    /// Full English month name (e.g. "August").
    pub month_name: String,
    /// The strategy that produced this inference.
    pub source: DateSource,
}

/// Extracts dates from filenames using pre-compiled patterns.
///
/// Construct once and reuse; each call scans only the filename component of
/// the given path.
#[derive(Debug)]
pub struct DateExtractor {
    continuous: Regex,
    separated_iso: Regex,
    separated_reversed: Regex,
}

impl DateExtractor {
    /// Compiles the filename patterns.
    pub fn new() -> Self {
        // The pattern literals are fixed, so compilation cannot fail.
        Self {
            continuous: Regex::new(r"(20\d{2}|21\d{2})(\d{2})(\d{2})")
                .expect("continuous date pattern is valid"),
            separated_iso: Regex::new(r"(20\d{2}|21\d{2})[-_ .](\d{1,2})[-_ .](\d{1,2})")
                .expect("ISO date pattern is valid"),
            separated_reversed: Regex::new(r"(\d{1,2})[-_ .](\d{1,2})[-_ .](20\d{2}|21\d{2})")
                .expect("reversed date pattern is valid"),
        }
    }

    /// Infers a date for `path`, trying filename patterns in priority order
    /// and falling back to the filesystem modification time.
    ///
    /// A tier whose syntactic match fails the calendar check yields nothing
    /// and the next tier is tried. The metadata fallback reads the file's
    /// mtime and therefore needs the file to exist; pattern-only extraction
    /// does not.
    pub fn extract(&self, path: &Path) -> std::io::Result<DateInference> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Some(inference) = self.extract_from_filename(&filename) {
            return Ok(inference);
        }

        // Fallback: filesystem last-modified time.
        let mtime = std::fs::metadata(path)?.modified()?;
        let local: DateTime<Local> = mtime.into();
        Ok(DateInference {
            year: local.year().to_string(),
            month_name: month_name(local.month()),
            source: DateSource::Metadata,
        })
    }

    /// Runs the filename pattern tiers only, without touching the filesystem.
    pub fn extract_from_filename(&self, filename: &str) -> Option<DateInference> {
        // Tier 1: continuous YYYYMMDD.
        if let Some(caps) = self.continuous.captures(filename) {
            let (y, m, d) = capture_triple(&caps);
            if let Some(inference) = validated(y, m, d, DateSource::FilenameContinuous) {
                return Some(inference);
            }
        }

        // Tier 2: YYYY sep MM sep DD.
        if let Some(caps) = self.separated_iso.captures(filename) {
            let (y, m, d) = capture_triple(&caps);
            if let Some(inference) = validated(y, m, d, DateSource::FilenameIso) {
                return Some(inference);
            }
        }

        // Tier 3: two short numbers then a year. DD-MM wins over MM-DD.
        if let Some(caps) = self.separated_reversed.captures(filename) {
            let (p1, p2, y) = capture_triple(&caps);
            if let Some(inference) = validated(y, p2, p1, DateSource::FilenameDayMonthYear) {
                return Some(inference);
            }
            if let Some(inference) = validated(y, p1, p2, DateSource::FilenameMonthDayYear) {
                return Some(inference);
            }
        }

        None
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that `(year, month, day)` is a real calendar date in the accepted
/// year range. Handles leap years and variable month lengths.
pub fn is_valid_calendar_date(year: i32, month: u32, day: u32) -> bool {
    (YEAR_MIN..=YEAR_MAX).contains(&year) && NaiveDate::from_ymd_opt(year, month, day).is_some()
}

/// Builds a validated inference, or `None` when the triple is not a real date.
fn validated(year: i32, month: i32, day: i32, source: DateSource) -> Option<DateInference> {
    if month < 0 || day < 0 {
        return None;
    }
    let (month, day) = (month as u32, day as u32);
    if !is_valid_calendar_date(year, month, day) {
        return None;
    }
    Some(DateInference {
        year: year.to_string(),
        month_name: month_name(month),
        source,
    })
}

/// Parses the three capture groups of a date pattern as integers.
fn capture_triple(caps: &regex::Captures<'_>) -> (i32, i32, i32) {
    let group = |i: usize| {
        caps.get(i)
            .map(|m| m.as_str().parse::<i32>().unwrap_or(-1))
            .unwrap_or(-1)
    };
    (group(1), group(2), group(3))
}

/// Full English month name for a 1-based month number.
fn month_name(month: u32) -> String {
    // Month is always validated before this is called; chrono renders %B.
    match NaiveDate::from_ymd_opt(2000, month, 1) {
        Some(date) => date.format("%B").to_string(),
        None => String::new(),
    }
}
