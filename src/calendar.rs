use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::models::{CanonicalDayRecord, ReconciledDayRow};

/// Japanese weekday short names, indexed from Monday.
pub const WEEKDAY_JP: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];

/// Work-type codes that appear on a rendered schedule: on-site and off-site
/// client work. Other codes (leave, holidays, in-house) are excluded from
/// the output entirely, not zero-filled.
pub const RENDERED_WORK_CODES: [&str; 2] = ["01", "02"];

/// A target year-month such as `2023-07`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = text.split_once('-').and_then(|(year, month)| {
            let year: i32 = year.parse().ok()?;
            let month: u32 = month.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(Self { year, month })
        });

        parsed.ok_or_else(|| Error::Transform(format!("bad work month {text:?}")))
    }

    /// Every calendar day of the month, ascending. The last day is the
    /// first day of the next month minus one day.
    pub fn days(&self) -> Result<Vec<NaiveDate>> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| Error::Transform(format!("bad work month {self}")))?;
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| Error::Transform(format!("bad work month {self}")))?;

        Ok(first.iter_days().take_while(|day| *day <= last).collect())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Produce exactly one row per calendar day of the target month by
/// left-merging the employee's eligible work records onto the month.
///
/// More than one eligible record on the same date is an ambiguity the
/// sort-key design should prevent; it fails here rather than silently
/// picking one.
pub fn reconcile_month(
    month: &YearMonth,
    records: &[CanonicalDayRecord],
    granularity: u32,
) -> Result<Vec<ReconciledDayRow>> {
    let mut by_date: BTreeMap<NaiveDate, &CanonicalDayRecord> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| RENDERED_WORK_CODES.contains(&record.work_code.as_str()))
    {
        if by_date.insert(record.date, record).is_some() {
            return Err(Error::Transform(format!(
                "ambiguous work data for {}: more than one eligible record on {}",
                record.id, record.date
            )));
        }
    }

    let rows = month
        .days()?
        .into_iter()
        .map(|date| {
            let record = by_date.get(&date);
            ReconciledDayRow {
                date,
                work_day: date.day().to_string(),
                work_weekday: WEEKDAY_JP[date.weekday().num_days_from_monday() as usize]
                    .to_string(),
                work_code: record.map(|r| r.work_code.clone()),
                start_time: record.and_then(|r| {
                    r.start_datetime.map(|at| rounded_clock(r.date, at, granularity))
                }),
                end_time: record.and_then(|r| {
                    r.end_datetime.map(|at| rounded_clock(r.date, at, granularity))
                }),
            }
        })
        .collect();

    Ok(rows)
}

/// Format a timestamp as an `HH:MM` display string relative to midnight of
/// its own date: the elapsed duration truncated into hour/minute components
/// with the minute floored to the granularity multiple. The hour exceeds 24
/// for shifts that ended the following day.
pub fn rounded_clock(origin: NaiveDate, at: NaiveDateTime, granularity: u32) -> String {
    let granularity = granularity.max(1);
    let elapsed = at - origin.and_time(NaiveTime::MIN);
    let total_minutes = elapsed.num_minutes();
    let hours = total_minutes / 60;
    let minutes = (total_minutes % 60) as u32;
    let floored = minutes / granularity * granularity;

    format!("{hours:0>2}:{floored:0>2}")
}
