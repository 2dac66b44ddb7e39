use encoding_rs::SHIFT_JIS;

use crate::error::{Error, Result};
use crate::models::RawAttendanceRecord;

/// Fixed column order of an uploaded attendance export.
pub const EXPORT_COLUMNS: [&str; 22] = [
    "id",
    "name",
    "date",
    "work_num",
    "date_code",
    "date_type",
    "work_code",
    "work_type",
    "start_time",
    "end_time",
    "start_time_round",
    "end_time_round",
    "break_hours",
    "work_hours",
    "night_hours",
    "memo",
    "approver",
    "approval_datetime",
    "second_approver",
    "second_approval_datetime",
    "third_approver",
    "third_approval_datetime",
];

/// Parse the raw bytes of an uploaded export into typed rows.
///
/// The export is tab-delimited Shift-JIS text with exactly one header line,
/// which is discarded. Values are kept as text; no numeric coercion happens
/// here.
pub fn parse_export(bytes: &[u8]) -> Result<Vec<RawAttendanceRecord>> {
    if bytes.is_empty() {
        return Err(Error::Parse("export is empty".to_string()));
    }

    let (text, _, had_errors) = SHIFT_JIS.decode(bytes);
    if had_errors {
        return Err(Error::Parse(
            "export is not valid Shift-JIS text".to_string(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let line = index + 1;
        let record =
            result.map_err(|err| Error::Parse(format!("line {line}: {err}")))?;

        // The first line is the header row from the HR system.
        if index == 0 {
            continue;
        }

        if record.len() != EXPORT_COLUMNS.len() {
            return Err(Error::Parse(format!(
                "line {line}: expected {} columns, found {}",
                EXPORT_COLUMNS.len(),
                record.len()
            )));
        }

        let row: RawAttendanceRecord = record
            .deserialize(None)
            .map_err(|err| Error::Parse(format!("line {line}: {err}")))?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(Error::Parse("export contains no data rows".to_string()));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_line() -> String {
        EXPORT_COLUMNS.join("\t")
    }

    fn data_line(fields: &[&str; 22]) -> String {
        fields.join("\t")
    }

    fn sample_fields<'a>() -> [&'a str; 22] {
        [
            "A0001",
            "山田太郎",
            "20230705",
            "01",
            "01",
            "平日",
            "02",
            "客先(リモート)",
            "09:07",
            "18:52",
            "09:00",
            "18:45",
            "1.00",
            "8.75",
            "0.00",
            "定例作業",
            "佐藤",
            "2023/07/06 09:00",
            "",
            "",
            "",
            "",
        ]
    }

    fn encode(text: &str) -> Vec<u8> {
        let (bytes, _, _) = SHIFT_JIS.encode(text);
        bytes.into_owned()
    }

    #[test]
    fn parses_a_valid_export() {
        let text = format!("{}\n{}\n", header_line(), data_line(&sample_fields()));
        let rows = parse_export(&encode(&text)).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, "A0001");
        assert_eq!(row.name, "山田太郎");
        assert_eq!(row.date.as_deref(), Some("20230705"));
        assert_eq!(row.work_num.as_deref(), Some("01"));
        assert_eq!(row.work_code, "02");
        assert_eq!(row.start_time.as_deref(), Some("09:07"));
        assert_eq!(row.end_time.as_deref(), Some("18:52"));
        assert_eq!(row.memo.as_deref(), Some("定例作業"));
        assert_eq!(row.second_approver, None);
    }

    #[test]
    fn keeps_leading_zeros_and_blanks() {
        let mut fields = sample_fields();
        fields[3] = "07";
        fields[9] = "";
        fields[12] = "";
        let text = format!("{}\n{}\n", header_line(), data_line(&fields));
        let rows = parse_export(&encode(&text)).unwrap();

        assert_eq!(rows[0].work_num.as_deref(), Some("07"));
        assert_eq!(rows[0].end_time, None);
        assert_eq!(rows[0].break_hours, None);
    }

    #[test]
    fn rejects_empty_input() {
        let err = parse_export(b"").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn rejects_header_only_input() {
        let text = format!("{}\n", header_line());
        let err = parse_export(&encode(&text)).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn rejects_column_count_mismatch() {
        let text = format!("{}\nA0001\t山田太郎\t20230705\n", header_line());
        let err = parse_export(&encode(&text)).unwrap_err();
        match err {
            Error::Parse(message) => assert!(message.contains("columns")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_bytes_that_are_not_shift_jis() {
        // 0x81 opens a double-byte sequence; 0x39 is not a valid trail byte.
        let err = parse_export(&[0x81, 0x39, 0x0a]).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
