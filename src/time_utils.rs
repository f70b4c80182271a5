// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Date handling for DCC date fields.
//!
//! DCC dates in the wild are messy: some issuers embed full ISO-8601
//! timestamps in date-only fields, and dates of birth may omit the day or
//! both day and month.  The helpers here implement the tolerant parsing the
//! verification rules depend on.

use std::sync::LazyLock;

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use crate::error::{CoreError, Error, ForeignError as _, Result};

/// The `YYYY-MM-DD` format used by DCC date fields.
pub const YYYYMMDD_FORMAT: &str = "%Y-%m-%d";

/// Dates of birth may have the day absent, or both day and month absent.
/// Two-digit years are not accepted.
static DATE_OF_BIRTH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:((?:19|20)\d\d)(?:-(\d\d)(?:-(\d\d))?)?)?$")
        .expect("the date of birth pattern is valid")
});

/// Error type used by the [`time_utils`][crate::time_utils] module.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum TimeError {
    /// The value does not parse as a `YYYY-MM-DD` date.
    #[strum(to_string = "Date did not conform to the YYYY-MM-DD format")]
    InvalidDate,

    /// The value does not match the date of birth pattern.
    #[strum(to_string = "Date of birth did not conform to the expected format")]
    InvalidDateOfBirth,

    /// A month number outside the 1-12 range was encountered.
    #[strum(to_string = "Month is outside of the 1-12 range")]
    InvalidMonth,
}

impl CoreError for TimeError {}

/// The components of a (possibly partial) date of birth.
///
/// Absent components are [`None`]; the shape check does **not** verify the
/// date exists on the calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateOfBirth {
    /// Four digit year, starting with `19` or `20`.
    pub year: Option<String>,
    /// Two digit month.
    pub month: Option<String>,
    /// Two digit day.
    pub day: Option<String>,
}

/// Clips a date value to its first 10 characters.
///
/// Some issuers (notably BG) put full ISO-8601 timestamps into date-only
/// fields; everything after the `YYYY-MM-DD` part is ignored.
pub fn truncate_date_string(value: &str) -> &str {
    match value.char_indices().nth(10) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

/// Parses a (truncated) value as a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, TimeError> {
    NaiveDate::parse_from_str(truncate_date_string(value), YYYYMMDD_FORMAT)
        .foreign_err(|| TimeError::InvalidDate)
}

/// Parses a (truncated) value into its [`DateOfBirth`] components.
pub fn parse_date_of_birth(value: &str) -> Result<DateOfBirth, TimeError> {
    let truncated = truncate_date_string(value);

    let captures = DATE_OF_BIRTH_REGEX
        .captures(truncated)
        .ok_or_else(|| Error::root(TimeError::InvalidDateOfBirth))?;

    Ok(DateOfBirth {
        year: captures.get(1).map(|m| m.as_str().to_owned()),
        month: captures.get(2).map(|m| m.as_str().to_owned()),
        day: captures.get(3).map(|m| m.as_str().to_owned()),
    })
}

/// Resolves a (possibly partial) date of birth to the most recent day and
/// month it could denote.
///
/// A missing month resolves to December and a missing day to the last day of
/// the month, so the holder is treated as young as the data allows.  A
/// missing year resolves to 1900, treating the holder as old.
pub fn most_recent_dob_day_month(value: &str) -> Result<NaiveDate, TimeError> {
    let dob = parse_date_of_birth(value)?;

    let year: i32 = dob
        .year
        .as_deref()
        .unwrap_or("1900")
        .parse()
        .foreign_err(|| TimeError::InvalidDate)?;

    let month: u32 = dob
        .month
        .as_deref()
        .unwrap_or("12")
        .parse()
        .foreign_err(|| TimeError::InvalidDate)?;

    let day: u32 = match dob.day.as_deref() {
        Some(day) => day.parse().foreign_err(|| TimeError::InvalidDate)?,
        None => days_in_month(year, month)?,
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| Error::root(TimeError::InvalidDate))
}

/// Gregorian leap year rule: divisible by 4 and not by 100, unless by 400.
pub(crate) fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> Result<u32, TimeError> {
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => return Err(Error::root(TimeError::InvalidMonth)),
    };

    Ok(days)
}

/// The UTC instant at which the given calendar day starts.
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Adds calendar years, clamping the day when the target month is shorter.
pub(crate) fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    if years >= 0 {
        date.checked_add_months(Months::new(12 * years as u32))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_months(Months::new(12 * years.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}
