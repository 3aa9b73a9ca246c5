//! Fuzzy date search over single lines of header text.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// One date found inside a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    /// The matched span, verbatim.
    pub text: String,
    /// Byte offset of the match within the line.
    pub start: usize,
    /// ISO-8601 `YYYY-MM-DD`. Missing day or month default to `01`.
    pub normalized: String,
}

/// Finds dates in a line of text.
///
/// Implementations return every match in order of appearance; callers that
/// want a single date take the first.
pub trait DateDetector: Send + Sync {
    fn find_dates(&self, line: &str) -> Vec<DateMatch>;
}

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());
static DAY_MONTH_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+{MONTH},?\s+(\d{{4}})\b"
    ))
    .unwrap()
});
static MONTH_DAY_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTH}\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .unwrap()
});
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/.](\d{1,2})[/.](\d{4})\b").unwrap());
static MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\b{MONTH},?\s+(\d{{4}})\b")).unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

/// Regex-driven [`DateDetector`] covering the forms common on paper title pages:
///
/// - `2023-03-15`
/// - `15 March 2023`, `15th Mar. 2023`
/// - `March 15, 2023`
/// - `03/15/2023`, `15.03.2023` (month first unless the first field exceeds 12)
/// - `March 2023`
/// - a bare year between 1900 and 2099 (optional, on by default)
///
/// Overlapping candidates resolve to the earliest, then longest, match, so
/// `15 March 2023` is reported once rather than also as `March 2023` and `2023`.
#[derive(Debug, Clone)]
pub struct PatternDateDetector {
    bare_years: bool,
}

impl Default for PatternDateDetector {
    fn default() -> Self {
        Self { bare_years: true }
    }
}

impl PatternDateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a lone year such as `2021` counts as a date.
    pub fn with_bare_years(mut self, enabled: bool) -> Self {
        self.bare_years = enabled;
        self
    }
}

impl DateDetector for PatternDateDetector {
    fn find_dates(&self, line: &str) -> Vec<DateMatch> {
        let mut found: Vec<DateMatch> = Vec::new();

        collect(&ISO_RE, line, &mut found, |c| {
            ymd(num(c, 1)?, num(c, 2)?, num(c, 3)?)
        });
        collect(&DAY_MONTH_YEAR_RE, line, &mut found, |c| {
            ymd(num(c, 3)?, month_number(&c[2])?, num(c, 1)?)
        });
        collect(&MONTH_DAY_YEAR_RE, line, &mut found, |c| {
            ymd(num(c, 3)?, month_number(&c[1])?, num(c, 2)?)
        });
        collect(&NUMERIC_RE, line, &mut found, |c| {
            let (first, second, year) = (num(c, 1)?, num(c, 2)?, num(c, 3)?);
            if first > 12 {
                ymd(year, second, first)
            } else {
                ymd(year, first, second)
            }
        });
        collect(&MONTH_YEAR_RE, line, &mut found, |c| {
            ymd(num(c, 2)?, month_number(&c[1])?, 1)
        });
        if self.bare_years {
            let mut years = Vec::new();
            collect(&YEAR_RE, line, &mut years, |c| ymd(num(c, 1)?, 1, 1));
            years.retain(|m| !inside_identifier(line, m.start, m.start + m.text.len()));
            found.extend(years);
        }

        resolve_overlaps(found)
    }
}

fn collect(
    re: &Regex,
    line: &str,
    found: &mut Vec<DateMatch>,
    to_date: impl Fn(&Captures) -> Option<NaiveDate>,
) {
    for caps in re.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(date) = to_date(&caps) {
            found.push(DateMatch {
                text: whole.as_str().to_string(),
                start: whole.start(),
                normalized: date.format("%Y-%m-%d").to_string(),
            });
        }
    }
}

/// Keep the earliest match at each position, preferring the longest, and
/// drop anything overlapping an already accepted match.
fn resolve_overlaps(mut found: Vec<DateMatch>) -> Vec<DateMatch> {
    found.sort_by(|a, b| a.start.cmp(&b.start).then(b.text.len().cmp(&a.text.len())));
    let mut accepted: Vec<DateMatch> = Vec::with_capacity(found.len());
    let mut covered_until = 0;
    for m in found {
        if !accepted.is_empty() && m.start < covered_until {
            continue;
        }
        covered_until = m.start + m.text.len();
        accepted.push(m);
    }
    accepted
}

/// True when `line[start..end]` is part of a token such as `arXiv:2005.14165`
/// or `10.1145/2020.123`, where four digits are an identifier, not a year.
fn inside_identifier(line: &str, start: usize, end: usize) -> bool {
    let before = line[..start].chars().next_back();
    let mut after = line[end..].chars();
    let next = after.next();
    let digit_after_separator = after.next().is_some_and(|c| c.is_ascii_digit());

    matches!(before, Some(':' | '/' | '.'))
        || (matches!(next, Some('.' | '/')) && digit_after_separator)
}

fn num(caps: &Captures, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn ymd(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    let month = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
