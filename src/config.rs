//! Rendering configuration: raw per-organization/per-employee settings and
//! their validated, typed forms. Validation happens once at load so a
//! missing key or malformed cell address fails up front instead of midway
//! through a render.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::ReconciledDayRow;

/// Widest addressable xlsx sheet: XFD1048576.
pub const MAX_SHEET_COLS: u32 = 16_384;
pub const MAX_SHEET_ROWS: u32 = 1_048_576;

/// Per-organization template settings as stored.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    pub name: String,
    pub year_month_formats: HashMap<String, String>,
    pub year_month_cells: HashMap<String, String>,
    pub start_cells: HashMap<String, String>,
    pub user_name_cell: String,
}

impl TemplateConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| Error::Config(format!("bad template config: {err}")))
    }
}

/// Per-employee settings as stored.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub id: String,
    pub user_name: String,
    pub time_sharing: u32,
}

impl UserConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| Error::Config(format!("bad user config: {err}")))
    }
}

/// An A1-style cell address, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    pub col: u32,
    pub row: u32,
}

impl CellAddress {
    pub fn parse(text: &str) -> Result<Self> {
        let letters: String = text.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        let digits = &text[letters.len()..];

        if letters.is_empty()
            || letters.len() > 3
            || digits.is_empty()
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::Config(format!("bad cell address {text:?}")));
        }

        let col = letters.chars().fold(0u32, |acc, c| {
            acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
        });
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::Config(format!("bad cell address {text:?}")))?;

        if !(1..=MAX_SHEET_COLS).contains(&col) || !(1..=MAX_SHEET_ROWS).contains(&row) {
            return Err(Error::Config(format!(
                "cell address {text:?} is outside the sheet range"
            )));
        }

        Ok(Self { col, row })
    }

    /// The cell `delta` rows below this one, or `None` past the sheet edge.
    pub fn offset_rows(&self, delta: u32) -> Option<Self> {
        let row = self.row.checked_add(delta)?;
        (row <= MAX_SHEET_ROWS).then_some(Self { col: self.col, row })
    }
}

/// A schedule column a template can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleColumn {
    StartTime,
    EndTime,
    WorkDay,
    WorkWeekday,
}

impl ScheduleColumn {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "start_time" => Some(Self::StartTime),
            "end_time" => Some(Self::EndTime),
            "work_day" => Some(Self::WorkDay),
            "work_weekday" => Some(Self::WorkWeekday),
            _ => None,
        }
    }

    pub fn value_for<'a>(&self, row: &'a ReconciledDayRow) -> Option<&'a str> {
        match self {
            Self::StartTime => row.start_time.as_deref(),
            Self::EndTime => row.end_time.as_deref(),
            Self::WorkDay => Some(row.work_day.as_str()),
            Self::WorkWeekday => Some(row.work_weekday.as_str()),
        }
    }
}

/// A localized year/month caption and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct YearMonthLabel {
    pub label: String,
    pub pattern: String,
    pub cell: CellAddress,
}

/// A data column and the cell its day-1 value occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBinding {
    pub name: String,
    pub column: ScheduleColumn,
    pub start: CellAddress,
}

/// Validated template settings. Labels and columns are sorted by name so a
/// render walks them in a stable order.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLayout {
    pub name: String,
    pub year_month_labels: Vec<YearMonthLabel>,
    pub user_name_cell: CellAddress,
    pub columns: Vec<ColumnBinding>,
}

impl TemplateLayout {
    pub fn from_config(config: &TemplateConfig) -> Result<Self> {
        if config.name.is_empty() {
            return Err(Error::Config("template name is missing".to_string()));
        }

        let mut year_month_labels = Vec::new();
        for (label, cell) in &config.year_month_cells {
            let pattern = config.year_month_formats.get(label).ok_or_else(|| {
                Error::Config(format!("year/month label {label:?} has no format pattern"))
            })?;
            year_month_labels.push(YearMonthLabel {
                label: label.clone(),
                pattern: pattern.clone(),
                cell: CellAddress::parse(cell)?,
            });
        }
        year_month_labels.sort_by(|a, b| a.label.cmp(&b.label));

        let mut columns = Vec::new();
        for (name, cell) in &config.start_cells {
            let column = ScheduleColumn::from_name(name)
                .ok_or_else(|| Error::Config(format!("unknown schedule column {name:?}")))?;
            columns.push(ColumnBinding {
                name: name.clone(),
                column,
                start: CellAddress::parse(cell)?,
            });
        }
        columns.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            name: config.name.clone(),
            year_month_labels,
            user_name_cell: CellAddress::parse(&config.user_name_cell)?,
            columns,
        })
    }
}

/// Validated per-employee settings.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub user_name: String,
    /// Minute granularity clock readings are floored to. Divides 60.
    pub time_sharing: u32,
}

impl UserProfile {
    pub fn from_config(config: &UserConfig) -> Result<Self> {
        if config.id.is_empty() {
            return Err(Error::Config("user id is missing".to_string()));
        }
        if config.user_name.is_empty() {
            return Err(Error::Config("user name is missing".to_string()));
        }
        if config.time_sharing == 0 || 60 % config.time_sharing != 0 {
            return Err(Error::Config(format!(
                "time sharing {} does not divide 60 evenly",
                config.time_sharing
            )));
        }

        Ok(Self {
            id: config.id.clone(),
            user_name: config.user_name.clone(),
            time_sharing: config.time_sharing,
        })
    }
}
