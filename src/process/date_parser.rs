use chrono::{Month, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// A reporting month. Keys the output namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// `None` unless `month` is 1..=12 and the year is representable.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Stored-artifact identifier, `{year}_{month}` with no zero padding.
    pub fn identifier(&self) -> String {
        format!("{}_{}", self.year, self.month)
    }

    /// Inverse of `identifier`.
    pub fn from_identifier(s: &str) -> Option<Self> {
        let (y, m) = s.split_once('_')?;
        Self::new(y.parse().ok()?, m.parse().ok()?)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("period not recognized in label {0:?}")]
    NotRecognized(String),
}

const YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+|\d+").expect("token regex"));
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{4})\b").expect("month/year regex"));
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[/-](\d{1,2})\b").expect("year/month regex"));

/// Pull a `(year, month)` out of a free-form label.
///
/// Month names (full, three-letter, or "Sept") and a four-digit year may
/// appear in either order among other words. Numeric `MM/YYYY` and `YYYY-MM`
/// fragments are accepted as a second choice. Both parts must be present.
pub fn tag_period(label: &str) -> Result<Period, PeriodError> {
    by_words(label)
        .or_else(|| by_numbers(label))
        .ok_or_else(|| PeriodError::NotRecognized(label.to_string()))
}

fn by_words(label: &str) -> Option<Period> {
    let mut month = None;
    let mut year = None;
    for tok in TOKEN.find_iter(label).map(|m| m.as_str()) {
        if tok.as_bytes()[0].is_ascii_digit() {
            if year.is_none() && tok.len() == 4 {
                year = tok.parse::<i32>().ok().filter(|y| YEARS.contains(y));
            }
        } else if month.is_none() {
            month = month_from_name(tok);
        }
    }
    Period::new(year?, month?)
}

fn by_numbers(label: &str) -> Option<Period> {
    let from = |caps: regex::Captures, y: usize, m: usize| {
        let year: i32 = caps[y].parse().ok().filter(|y| YEARS.contains(y))?;
        Period::new(year, caps[m].parse().ok()?)
    };
    MONTH_YEAR
        .captures(label)
        .and_then(|c| from(c, 2, 1))
        .or_else(|| YEAR_MONTH.captures(label).and_then(|c| from(c, 1, 2)))
}

fn month_from_name(word: &str) -> Option<u32> {
    let word = word.to_ascii_lowercase();
    if word == "sept" {
        return Some(9);
    }
    (1..=12u8).find_map(|n| {
        let name = Month::try_from(n).ok()?.name().to_ascii_lowercase();
        (word == name || word == name[..3]).then_some(n as u32)
    })
}
