use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::{CanonicalDayRecord, RawAttendanceRecord};

/// Convert parsed export rows into canonical daily work records ready for
/// persistence. Input order is not preserved as a contract; the sort key is
/// the ordering contract used downstream.
pub fn normalize_records(rows: &[RawAttendanceRecord]) -> Result<Vec<CanonicalDayRecord>> {
    rows.iter().map(normalize_record).collect()
}

fn normalize_record(row: &RawAttendanceRecord) -> Result<CanonicalDayRecord> {
    if row.id.is_empty() {
        return Err(Error::Transform(
            "record cannot be keyed: employee id is missing".to_string(),
        ));
    }

    let date_text = row.date.as_deref().ok_or_else(|| {
        Error::Transform(format!("record for {} cannot be keyed: date is missing", row.id))
    })?;
    let date = NaiveDate::parse_from_str(date_text, "%Y%m%d").map_err(|err| {
        Error::Transform(format!("record for {}: bad date {date_text:?}: {err}", row.id))
    })?;

    let work_num = row.work_num.as_deref().ok_or_else(|| {
        Error::Transform(format!(
            "record for {} on {date} cannot be keyed: sequence number is missing",
            row.id
        ))
    })?;

    // An end time past midnight ("24:30") is an offset from the day's own
    // midnight, so it lands on the following calendar day.
    let midnight = date.and_time(NaiveTime::MIN);
    let start_datetime = row
        .start_time
        .as_deref()
        .map(|text| clock_offset(&row.id, date, text))
        .transpose()?
        .map(|offset| midnight + offset);
    let end_datetime = row
        .end_time
        .as_deref()
        .map(|text| clock_offset(&row.id, date, text))
        .transpose()?
        .map(|offset| midnight + offset);

    Ok(CanonicalDayRecord {
        id: row.id.clone(),
        sk: format!("WorkData#{}#{:0>2}", date.format("%Y-%m-%d"), work_num),
        date,
        date_code: row.date_code.clone(),
        work_code: row.work_code.clone(),
        start_datetime,
        end_datetime,
        break_hours: row.break_hours.clone(),
        work_hours: row.work_hours.clone(),
        night_hours: row.night_hours.clone(),
        memo: row.memo.clone(),
    })
}

/// Parse an `HH:MM` clock reading as an offset from midnight. Hours may
/// exceed 24 for shifts that end the following day.
fn clock_offset(id: &str, date: NaiveDate, text: &str) -> Result<Duration> {
    let parsed = text.split_once(':').and_then(|(hours, minutes)| {
        let hours: i64 = hours.parse().ok()?;
        let minutes: i64 = minutes.parse().ok()?;
        if hours < 0 || !(0..60).contains(&minutes) {
            return None;
        }
        Some(Duration::hours(hours) + Duration::minutes(minutes))
    });

    parsed.ok_or_else(|| {
        Error::Transform(format!("record for {id} on {date}: bad clock time {text:?}"))
    })
}

/// Distinct `YYYY-MM` buckets present in a normalized batch, used to fan
/// out one render per month. Duplicates collapse; order is not significant
/// to callers.
pub fn work_months(records: &[CanonicalDayRecord]) -> Vec<String> {
    let months: BTreeSet<String> = records
        .iter()
        .map(|record| record.date.format("%Y-%m").to_string())
        .collect();
    months.into_iter().collect()
}
