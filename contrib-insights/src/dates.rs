// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Date-range helpers for the weekly report.
//!
//! Every helper is a pure function of a "now" reading so callers can pin the
//! clock in tests. Calendar arithmetic happens in the time zone carried by
//! `now`, which is the local zone for [`ReportWindow::current`].

use chrono::{DateTime, Days, Local, Months, NaiveDate, TimeDelta, TimeZone};

/// Format used for calendar dates in search queries and links.
const DATE_FORMAT: &str = "%Y-%m-%d";
/// Length of the reporting window in days.
const WINDOW_DAYS: u64 = 7;
/// Issues without updates for this many months are considered stale.
const STALE_MONTHS: u32 = 12;

/// Returns the start of the reporting window ending at `now`.
///
/// A local time that does not exist (daylight saving gap) falls back to
/// subtracting whole 24 hour days.
fn window_start<Tz,>(now: &DateTime<Tz,>,) -> DateTime<Tz,>
where
    Tz: TimeZone,
{
    now.clone()
        .checked_sub_days(Days::new(WINDOW_DAYS,),)
        .unwrap_or_else(|| now.clone() - TimeDelta::days(WINDOW_DAYS as i64,),)
}

fn format_date(date: NaiveDate,) -> String
{
    date.format(DATE_FORMAT,).to_string()
}

/// Returns the last seven days as `(from, to)` calendar dates.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use contrib_insights::last_week_as_dates;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0,).unwrap();
/// assert_eq!(
///     last_week_as_dates(&now,),
///     ("2024-03-08".to_owned(), "2024-03-15".to_owned())
/// );
/// ```
pub fn last_week_as_dates<Tz,>(now: &DateTime<Tz,>,) -> (String, String,)
where
    Tz: TimeZone,
{
    (format_date(window_start(now,).date_naive(),), format_date(now.date_naive(),),)
}

/// Returns the last seven days as `(from, to)` decimal epoch milliseconds.
pub fn last_week_as_epoch_millis<Tz,>(now: &DateTime<Tz,>,) -> (String, String,)
where
    Tz: TimeZone,
{
    (window_start(now,).timestamp_millis().to_string(), now.timestamp_millis().to_string(),)
}

/// Returns the calendar date one year before `now`.
///
/// February 29 maps to February 28 of the previous year.
pub fn one_year_ago_as_date<Tz,>(now: &DateTime<Tz,>,) -> String
where
    Tz: TimeZone,
{
    let today = now.date_naive();
    let year_ago = today.checked_sub_months(Months::new(STALE_MONTHS,),).unwrap_or(NaiveDate::MIN,);
    format_date(year_ago,)
}

/// All date boundaries used by one report run.
///
/// Computing the window once keeps every digest of a run on the same
/// interval even when the run straddles midnight.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ReportWindow
{
    /// First day of the window, `YYYY-MM-DD`.
    pub from_date:    String,
    /// Last day of the window, `YYYY-MM-DD`.
    pub to_date:      String,
    /// Window start in epoch milliseconds.
    pub from_millis:  String,
    /// Window end in epoch milliseconds.
    pub to_millis:    String,
    /// Issues not updated since this date count as stale.
    pub stale_before: String,
}

impl ReportWindow
{
    /// Builds the window ending at the provided instant.
    pub fn ending_at<Tz,>(now: &DateTime<Tz,>,) -> Self
    where
        Tz: TimeZone,
    {
        let (from_date, to_date,) = last_week_as_dates(now,);
        let (from_millis, to_millis,) = last_week_as_epoch_millis(now,);

        Self {
            from_date,
            to_date,
            from_millis,
            to_millis,
            stale_before: one_year_ago_as_date(now,),
        }
    }

    /// Builds the window ending at the current local wall-clock time.
    pub fn current() -> Self
    {
        Self::ending_at(&Local::now(),)
    }
}
