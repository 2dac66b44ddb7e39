use std::io::Cursor;

use crate::calendar::YearMonth;
use crate::config::{TemplateLayout, UserProfile};
use crate::error::{Error, Result};
use crate::models::ReconciledDayRow;

/// Render one employee-month onto a copy of the template workbook.
///
/// Writes the formatted year/month captions, the employee's display name
/// and every bound data column into the first worksheet, then serializes
/// the workbook back to bytes. Day 1 always occupies a column's start cell;
/// day *n* sits *n − 1* rows below it, blank when the day has no data, so
/// rows never shift or reorder.
pub fn render_schedule(
    template: &[u8],
    layout: &TemplateLayout,
    profile: &UserProfile,
    month: &YearMonth,
    rows: &[ReconciledDayRow],
) -> Result<Vec<u8>> {
    let mut book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(template), true)
        .map_err(|err| Error::Render(format!("template could not be loaded: {err}")))?;
    let sheet = book
        .get_sheet_mut(&0)
        .ok_or_else(|| Error::Render("template has no worksheet".to_string()))?;

    let year = month.year.to_string();
    let month_number = month.month.to_string();
    for label in &layout.year_month_labels {
        let caption = label
            .pattern
            .replace("{year}", &year)
            .replace("{month}", &month_number);
        sheet
            .get_cell_mut((label.cell.col, label.cell.row))
            .set_value_string(caption);
    }

    sheet
        .get_cell_mut((layout.user_name_cell.col, layout.user_name_cell.row))
        .set_value_string(profile.user_name.as_str());

    for binding in &layout.columns {
        for (offset, row) in rows.iter().enumerate() {
            let cell = binding.start.offset_rows(offset as u32).ok_or_else(|| {
                Error::Render(format!(
                    "column {:?} runs past the sheet edge on day {}",
                    binding.name, row.work_day
                ))
            })?;
            let value = binding.column.value_for(row).unwrap_or("");
            sheet.get_cell_mut((cell.col, cell.row)).set_value_string(value);
        }
    }

    let mut rendered = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut rendered)
        .map_err(|err| Error::Render(format!("workbook could not be serialized: {err}")))?;

    Ok(rendered.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::reconcile_month;
    use crate::config::{TemplateConfig, UserConfig};
    use crate::models::CanonicalDayRecord;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::HashMap;

    fn template_bytes() -> Vec<u8> {
        let book = umya_spreadsheet::new_file();
        let mut buffer = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut buffer).unwrap();
        buffer.into_inner()
    }

    fn layout() -> TemplateLayout {
        let config = TemplateConfig {
            name: "monthly.xlsx".to_string(),
            year_month_formats: HashMap::from([(
                "western".to_string(),
                "{year}年{month}月度".to_string(),
            )]),
            year_month_cells: HashMap::from([("western".to_string(), "C2".to_string())]),
            start_cells: HashMap::from([
                ("work_day".to_string(), "A5".to_string()),
                ("work_weekday".to_string(), "B5".to_string()),
                ("start_time".to_string(), "C5".to_string()),
                ("end_time".to_string(), "D5".to_string()),
            ]),
            user_name_cell: "C3".to_string(),
        };
        TemplateLayout::from_config(&config).unwrap()
    }

    fn profile() -> UserProfile {
        UserProfile::from_config(&UserConfig {
            id: "A0001".to_string(),
            user_name: "山田太郎".to_string(),
            time_sharing: 15,
        })
        .unwrap()
    }

    fn work_record(date: &str, start: &str, end: &str) -> CanonicalDayRecord {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let at = |text: &str| {
            let (hours, minutes) = text.split_once(':').unwrap();
            date.and_time(NaiveTime::MIN)
                + chrono::Duration::hours(hours.parse().unwrap())
                + chrono::Duration::minutes(minutes.parse().unwrap())
        };
        CanonicalDayRecord {
            id: "A0001".to_string(),
            sk: format!("WorkData#{date}#01"),
            date,
            date_code: "01".to_string(),
            work_code: "02".to_string(),
            start_datetime: Some(at(start)),
            end_datetime: Some(at(end)),
            break_hours: None,
            work_hours: None,
            night_hours: None,
            memo: None,
        }
    }

    fn sheet_value(bytes: &[u8], cell: &str) -> String {
        let book =
            umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true).unwrap();
        book.get_sheet(&0).unwrap().get_value(cell)
    }

    #[test]
    fn renders_captions_name_and_columns() {
        let month = YearMonth::parse("2023-07").unwrap();
        let records = vec![work_record("2023-07-05", "09:07", "18:52")];
        let rows = reconcile_month(&month, &records, 15).unwrap();

        let bytes = render_schedule(&template_bytes(), &layout(), &profile(), &month, &rows)
            .unwrap();

        assert_eq!(sheet_value(&bytes, "C2"), "2023年7月度");
        assert_eq!(sheet_value(&bytes, "C3"), "山田太郎");
        // Day 1 sits at each column's start cell regardless of data.
        assert_eq!(sheet_value(&bytes, "A5"), "1");
        assert_eq!(sheet_value(&bytes, "B5"), "土");
        assert_eq!(sheet_value(&bytes, "C5"), "");
        // July 5th lands four rows below the start cell.
        assert_eq!(sheet_value(&bytes, "C9"), "09:00");
        assert_eq!(sheet_value(&bytes, "D9"), "18:45");
        // Day 31 sits 30 rows below the start cell; nothing beyond it.
        assert_eq!(sheet_value(&bytes, "A35"), "31");
        assert_eq!(sheet_value(&bytes, "A4"), "");
        assert_eq!(sheet_value(&bytes, "A36"), "");
    }

    #[test]
    fn rendering_is_deterministic() {
        let month = YearMonth::parse("2023-07").unwrap();
        let records = vec![work_record("2023-07-05", "09:07", "18:52")];
        let rows = reconcile_month(&month, &records, 15).unwrap();
        let template = template_bytes();

        let first = render_schedule(&template, &layout(), &profile(), &month, &rows).unwrap();
        let second = render_schedule(&template, &layout(), &profile(), &month, &rows).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_bytes_that_are_not_a_workbook() {
        let month = YearMonth::parse("2023-07").unwrap();
        let rows = reconcile_month(&month, &[], 15).unwrap();

        let err = render_schedule(b"not a workbook", &layout(), &profile(), &month, &rows)
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn rejects_a_column_that_runs_past_the_sheet_edge() {
        let month = YearMonth::parse("2023-07").unwrap();
        let rows = reconcile_month(&month, &[], 15).unwrap();

        let mut layout = layout();
        layout.columns[0].start.row = crate::config::MAX_SHEET_ROWS - 5;
        let err = render_schedule(&template_bytes(), &layout, &profile(), &month, &rows)
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }
}
