// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Date Resolution
//!
//! Turns anchor phrases ("this week", "last 28 days") and explicit ISO dates
//! into concrete inclusive calendar-day ranges. Every analytics tool enters
//! through this module before any provider I/O happens, so bad date input
//! fails fast and cheap.
//!
//! Two rules shape everything here:
//!
//! - Ranges never extend past the reference date. A computed end in the
//!   future is pulled back; the start is left alone, so "this week" asked
//!   mid-week covers the week so far rather than days that have not happened.
//! - The phrase grammar is a closed enum ([`AnchorExpression`]). Synonym
//!   surface forms fold into the same variants at parse time; anything else
//!   is rejected with [`InsightError::InvalidDateExpression`].
//!
//! All resolution functions take the reference date ("today") as a
//! parameter. Callers pass the current local date; tests pass fixed dates.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::InsightError;

/// An inclusive range of calendar days
///
/// Invariant: `start <= end`, and both ends sit at or before the reference
/// date the range was resolved against. Construction goes through
/// [`DateRange::new`] or the resolvers in this module; the fields stay
/// private so a resolved range cannot drift afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range from explicit endpoints, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InsightError> {
        if start > end {
            return Err(InsightError::InvalidDateExpression(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// A single-day range
    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// First day of the range
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both ends
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `date` falls inside the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every day in the range, ascending
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    /// The same range with the start moved `days` further into the past
    ///
    /// Rolling windows and anomaly baselines need history from before the
    /// requested range; the extended range is what gets fetched, while
    /// results still report only the original days.
    pub fn extend_back(&self, days: u32) -> Self {
        Self {
            start: self.start - Duration::days(days as i64),
            end: self.end,
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// The closed grammar of supported anchor expressions
///
/// One variant per supported phrase family; synonym spellings ("current
/// week", "week to date", "past 28 days") fold into these at parse time.
/// `tomorrow` parses as [`AnchorExpression::Today`] since the future is
/// clamped away regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorExpression {
    /// The reference day itself
    Today,
    /// The day before the reference day
    Yesterday,
    /// The calendar week containing the reference day, up to the reference day
    ThisWeek,
    /// The full calendar week before the current one
    LastWeek,
    /// The calendar month containing the reference day, up to the reference day
    ThisMonth,
    /// The full calendar month before the current one
    LastMonth,
    /// The trailing N days ending at the reference day
    LastDays(u32),
    /// The trailing N*7 days ending at the reference day
    LastWeeks(u32),
    /// An explicit date pair, both ends inclusive
    Explicit { start: NaiveDate, end: NaiveDate },
}

impl AnchorExpression {
    /// Parse only the relative-phrase grammar, without explicit dates
    ///
    /// Matching is case-insensitive and whitespace-tolerant. Returns `None`
    /// for anything outside the grammar so callers can decide whether to try
    /// an ISO date next.
    pub fn parse_phrase(input: &str) -> Option<Self> {
        let clean = input.trim().to_lowercase();
        let words: Vec<&str> = clean.split_whitespace().collect();
        let normalized = words.join(" ");

        let expr = match normalized.as_str() {
            "today" | "current day" | "now" => AnchorExpression::Today,
            "tomorrow" | "next day" => AnchorExpression::Today,
            "yesterday" | "prev day" | "previous day" => AnchorExpression::Yesterday,
            "this week" | "current week" => AnchorExpression::ThisWeek,
            "this week to date" | "current week to date" | "week to date" => {
                AnchorExpression::ThisWeek
            }
            "last week" | "past week" | "previous week" => AnchorExpression::LastWeek,
            "this month" | "current month" => AnchorExpression::ThisMonth,
            "this month to date" | "current month to date" | "month to date" => {
                AnchorExpression::ThisMonth
            }
            "last month" | "past month" | "previous month" => AnchorExpression::LastMonth,
            _ => return parse_count_phrase(&words),
        };
        Some(expr)
    }

    /// Resolve this expression against a reference date and week convention
    ///
    /// Every variant maps to exactly one range. The failure modes are an
    /// explicit pair with `start > end` and a trailing count whose start
    /// would fall outside the calendar chrono can represent.
    pub fn resolve(
        &self,
        reference: NaiveDate,
        week_start: Weekday,
    ) -> Result<DateRange, InsightError> {
        let (start, end) = match *self {
            AnchorExpression::Today => (reference, reference),
            AnchorExpression::Yesterday => {
                let day = reference - Duration::days(1);
                (day, day)
            }
            AnchorExpression::ThisWeek => {
                let start = week_start_of(reference, week_start);
                (start, start + Duration::days(6))
            }
            AnchorExpression::LastWeek => {
                let current_start = week_start_of(reference, week_start);
                (current_start - Duration::days(7), current_start - Duration::days(1))
            }
            AnchorExpression::ThisMonth => {
                (first_day_of_month(reference), last_day_of_month(reference))
            }
            AnchorExpression::LastMonth => {
                let last_of_previous = first_day_of_month(reference) - Duration::days(1);
                (first_day_of_month(last_of_previous), last_of_previous)
            }
            AnchorExpression::LastDays(n) => (count_start(reference, n, 1, "days")?, reference),
            AnchorExpression::LastWeeks(n) => (count_start(reference, n, 7, "weeks")?, reference),
            AnchorExpression::Explicit { start, end } => {
                if start > end {
                    return Err(InsightError::InvalidDateExpression(format!(
                        "start {} is after end {}",
                        start, end
                    )));
                }
                (start, end)
            }
        };
        Ok(clamp_to_reference(start, end, reference))
    }
}

impl std::str::FromStr for AnchorExpression {
    type Err = InsightError;

    /// A phrase from the grammar, or a single `YYYY-MM-DD` date
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(expr) = AnchorExpression::parse_phrase(s) {
            return Ok(expr);
        }
        if let Some(date) = parse_iso_date(s) {
            return Ok(AnchorExpression::Explicit { start: date, end: date });
        }
        Err(InsightError::InvalidDateExpression(format!(
            "unrecognized phrase or date '{}'",
            s.trim()
        )))
    }
}

/// The period granularities summaries and cues operate on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
}

impl std::str::FromStr for PeriodKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(PeriodKind::Daily),
            "weekly" => Ok(PeriodKind::Weekly),
            "monthly" => Ok(PeriodKind::Monthly),
            other => Err(anyhow::anyhow!(
                "Invalid period '{}'. Must be one of: daily, weekly, monthly",
                other
            )),
        }
    }
}

/// A period resolved from an anchor, reporting the anchor actually used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedPeriod {
    /// The clamped range the period covers
    pub range: DateRange,
    /// The anchor after clamping, never past the range end
    pub anchor: NaiveDate,
}

/// Parse a single date-or-day-word string relative to a reference date
///
/// Accepts `today`/`yesterday`-style day words and strict `YYYY-MM-DD`.
/// `None` means the input is outside the grammar, which callers surface as
/// an invalid-expression error rather than guessing.
pub fn parse_single_date(input: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let clean = input.trim().to_lowercase();
    let normalized = clean.split_whitespace().collect::<Vec<_>>().join(" ");
    match normalized.as_str() {
        "today" | "current day" | "now" => Some(reference),
        "yesterday" | "prev day" | "previous day" => Some(reference - Duration::days(1)),
        "tomorrow" | "next day" => Some(reference),
        _ => parse_iso_date(&normalized),
    }
}

/// Resolve the `(start_date, end_date)` string pair tools accept
///
/// A relative phrase in either slot resolves the whole range, as long as the
/// other slot is empty or repeats the same phrase. Otherwise both slots are
/// single dates; a missing one mirrors the other. A provided but
/// unparseable slot is an error, and so is a reversed explicit pair.
pub fn resolve_date_strings(
    start: Option<&str>,
    end: Option<&str>,
    reference: NaiveDate,
    week_start: Weekday,
) -> Result<DateRange, InsightError> {
    let start_input = start.map(str::trim).filter(|s| !s.is_empty());
    let end_input = end.map(str::trim).filter(|s| !s.is_empty());

    // A phrase in either slot takes the whole range, checked start slot first.
    for (slot, other) in [(start_input, end_input), (end_input, start_input)] {
        if let Some(input) = slot {
            if let Some(expr) = AnchorExpression::parse_phrase(input) {
                let other_repeats = other.map_or(true, |o| o.eq_ignore_ascii_case(input));
                if other_repeats {
                    let range = expr.resolve(reference, week_start)?;
                    debug!(phrase = input, %range, "date phrase resolved the range");
                    return Ok(range);
                }
            }
        }
    }

    let start_date = start_input
        .map(|s| {
            parse_single_date(s, reference).ok_or_else(|| {
                InsightError::InvalidDateExpression(format!("unrecognized phrase or date '{}'", s))
            })
        })
        .transpose()?;
    let end_date = end_input
        .map(|e| {
            parse_single_date(e, reference).ok_or_else(|| {
                InsightError::InvalidDateExpression(format!("unrecognized phrase or date '{}'", e))
            })
        })
        .transpose()?;

    let (start_date, end_date) = match (start_date, end_date) {
        (None, None) => {
            return Err(InsightError::InvalidDateExpression(
                "no start or end date given".to_string(),
            ))
        }
        (Some(s), None) => (s, s),
        (None, Some(e)) => (e, e),
        (Some(s), Some(e)) => (s, e),
    };

    if start_date > end_date {
        return Err(InsightError::InvalidDateExpression(format!(
            "start {} is after end {}",
            start_date, end_date
        )));
    }
    let range = clamp_to_reference(start_date, end_date, reference);
    debug!(%range, "explicit dates resolved the range");
    Ok(range)
}

/// Resolve a daily/weekly/monthly period around an optional anchor
///
/// The anchor accepts a relative phrase, which resolves the range directly
/// and ignores the period kind, or a single date. An anchor in the future is
/// pulled back to the reference date. The reported anchor reflects the
/// clamped window so callers always see a day inside the range.
pub fn resolve_anchor_period(
    period: PeriodKind,
    anchor: Option<&str>,
    reference: NaiveDate,
    week_start: Weekday,
) -> Result<ResolvedPeriod, InsightError> {
    let anchor_input = anchor.map(str::trim).filter(|s| !s.is_empty());

    let anchor_date = match anchor_input {
        Some(input) => {
            if let Some(expr) = AnchorExpression::parse_phrase(input) {
                let range = expr.resolve(reference, week_start)?;
                debug!(phrase = input, %range, "anchor phrase resolved the period");
                return Ok(ResolvedPeriod { range, anchor: range.end() });
            }
            let parsed = parse_single_date(input, reference).ok_or_else(|| {
                InsightError::InvalidDateExpression(format!("unrecognized anchor '{}'", input))
            })?;
            parsed.min(reference)
        }
        None => reference,
    };

    let (start, end) = match period {
        PeriodKind::Daily => (anchor_date, anchor_date),
        PeriodKind::Weekly => {
            let start = week_start_of(anchor_date, week_start);
            (start, start + Duration::days(6))
        }
        PeriodKind::Monthly => (first_day_of_month(anchor_date), last_day_of_month(anchor_date)),
    };
    let range = clamp_to_reference(start, end, reference);
    let resolved = ResolvedPeriod {
        range,
        anchor: anchor_date.min(range.end()),
    };
    debug!(period = ?period, range = %resolved.range, anchor = %resolved.anchor, "resolved anchor period");
    Ok(resolved)
}

fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Largest trailing window a count phrase may request, about ten years.
/// Counts past it fall outside the grammar like any other unsupported
/// phrase.
const MAX_PHRASE_DAYS: u32 = 3660;

/// `{last|past|previous} N {days|weeks|months}`, numeric or spelled-out N
fn parse_count_phrase(words: &[&str]) -> Option<AnchorExpression> {
    if words.len() != 3 {
        return None;
    }
    if !matches!(words[0], "last" | "past" | "previous") {
        return None;
    }
    let n: u32 = words[1].parse().ok().or_else(|| word_number(words[1]))?;
    if n == 0 {
        return None;
    }
    match words[2] {
        "day" | "days" if n <= MAX_PHRASE_DAYS => Some(AnchorExpression::LastDays(n)),
        "week" | "weeks" if n <= MAX_PHRASE_DAYS / 7 => Some(AnchorExpression::LastWeeks(n)),
        // "last three months" and friends; months count as 30 days here
        "month" | "months" if n <= MAX_PHRASE_DAYS / 30 => {
            Some(AnchorExpression::LastDays(n * 30))
        }
        _ => None,
    }
}

fn word_number(word: &str) -> Option<u32> {
    let n = match word {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => return None,
    };
    Some(n)
}

/// Start of a trailing window of `count * unit_days` days ending at the
/// reference, failing instead of wrapping when the calendar cannot reach it
fn count_start(
    reference: NaiveDate,
    count: u32,
    unit_days: i64,
    unit: &str,
) -> Result<NaiveDate, InsightError> {
    reference
        .checked_sub_signed(Duration::days(i64::from(count) * unit_days - 1))
        .ok_or_else(|| {
            InsightError::InvalidDateExpression(format!(
                "last {} {} reaches before the supported calendar",
                count, unit
            ))
        })
}

/// End past the reference pulls back; a start left past the pulled-back end
/// (an entirely future explicit range) collapses to the reference day.
fn clamp_to_reference(start: NaiveDate, end: NaiveDate, reference: NaiveDate) -> DateRange {
    let end = if end > reference { reference } else { end };
    let start = if start > end { end } else { start };
    DateRange { start, end }
}

fn week_start_of(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() as i64
        - week_start.num_days_from_monday() as i64)
        % 7;
    date - Duration::days(offset)
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first_of_next| first_of_next - Duration::days(1))
        .unwrap_or(date)
}
