use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One line of an uploaded attendance export, exactly as read. Every field
/// stays text so leading zeros and blank-vs-zero survive until
/// normalization. Blank optional columns deserialize to `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAttendanceRecord {
    pub id: String,
    pub name: String,
    pub date: Option<String>,
    pub work_num: Option<String>,
    pub date_code: String,
    pub date_type: String,
    pub work_code: String,
    pub work_type: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub start_time_round: Option<String>,
    pub end_time_round: Option<String>,
    pub break_hours: Option<String>,
    pub work_hours: Option<String>,
    pub night_hours: Option<String>,
    pub memo: Option<String>,
    pub approver: Option<String>,
    pub approval_datetime: Option<String>,
    pub second_approver: Option<String>,
    pub second_approval_datetime: Option<String>,
    pub third_approver: Option<String>,
    pub third_approval_datetime: Option<String>,
}

/// Normalized daily work record, the persisted unit. Partition key is the
/// employee id; `sk` is `WorkData#{date}#{seq:02}` and is the only ordering
/// contract used downstream. Never mutated after creation; re-uploads
/// overwrite by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDayRecord {
    pub id: String,
    #[serde(rename = "SK")]
    pub sk: String,
    pub date: NaiveDate,
    pub date_code: String,
    pub work_code: String,
    pub start_datetime: Option<NaiveDateTime>,
    pub end_datetime: Option<NaiveDateTime>,
    pub break_hours: Option<String>,
    pub work_hours: Option<String>,
    pub night_hours: Option<String>,
    pub memo: Option<String>,
}

/// One day of the target month joined with at most one eligible work
/// record. Days without source data keep empty time fields rather than
/// being omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledDayRow {
    pub date: NaiveDate,
    pub work_day: String,
    pub work_weekday: String,
    pub work_code: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Result of ingesting one export: whose records were stored and which
/// months they cover, so the caller can fan out one render per month.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub user_id: String,
    pub work_months: Vec<String>,
}

/// A rendered schedule plus the identifiers used to name it downstream.
#[derive(Debug, Clone)]
pub struct RenderedSchedule {
    pub user_id: String,
    pub work_month: String,
    pub object_name: String,
    pub bytes: Vec<u8>,
}

/// What a caller needs to locate the rendered artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOutcome {
    pub work_month: String,
    pub bucket_name: String,
    pub object_name: String,
}
