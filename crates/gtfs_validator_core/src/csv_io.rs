use std::io::Cursor;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;

use crate::notice::{NoticeContainer, NoticeSeverity, ValidationNotice};

const NOTICE_CODE_EMPTY_ROW: &str = "empty_row";
const NOTICE_CODE_NEW_LINE_IN_VALUE: &str = "new_line_in_value";
const NOTICE_CODE_LEADING_OR_TRAILING_WHITESPACE: &str = "leading_or_trailing_whitespace";

#[derive(Debug, Clone)]
pub struct CsvParseError {
    pub file: String,
    pub message: String,
    pub line_index: Option<u64>,
    pub column_index: Option<u64>,
    pub char_index: Option<u64>,
    pub parsed_content: Option<String>,
}

/// A loaded GTFS table: the header row as declared in the file, the
/// successfully parsed rows, and the 1-based CSV row number each parsed row
/// came from (header is row 1, so data starts at row 2), so validators can
/// attach precise locations to notices without re-scanning the file.
///
/// `field_count_mismatches` records rows whose raw field count didn't match
/// the header: missing trailing fields are padded with empty strings, extra
/// fields are dropped, and the row is still parsed (see `parse_csv_table`),
/// but the discrepancy itself is surfaced here for the `wrong_number_of_fields`
/// structural validator rather than being reported by the parser directly.
#[derive(Debug, Clone, Default)]
pub struct CsvTable<T> {
    pub headers: Vec<String>,
    pub rows: Vec<T>,
    pub row_numbers: Vec<u64>,
    pub field_count_mismatches: Vec<(u64, usize)>,
}

impl<T> CsvTable<T> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn iter_with_row(&self) -> impl Iterator<Item = (u64, &T)> {
        self.row_numbers.iter().copied().zip(self.rows.iter())
    }
}

/// Parses `bytes` as a GTFS CSV table, recording one `ValidationNotice` per
/// malformed row instead of aborting the whole table on the first bad row.
/// The same `StringRecord` buffer is reused across the stream (the `csv`
/// crate's `read_record` pattern) to avoid a per-row allocation for feeds with
/// millions of stop_times rows.
pub fn parse_csv_table<T: DeserializeOwned>(
    file_name: &str,
    bytes: &[u8],
    notices: &NoticeContainer,
) -> CsvTable<T> {
    let bytes = strip_bom(bytes);
    scan_raw_row_issues(file_name, bytes, notices);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Fields)
        .flexible(true)
        .from_reader(Cursor::new(bytes));

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(|h| h.to_string()).collect(),
        Err(err) => {
            notices.push_csv_error(&CsvParseError {
                file: file_name.to_string(),
                message: err.to_string(),
                line_index: Some(1),
                column_index: None,
                char_index: None,
                parsed_content: None,
            });
            return CsvTable::default();
        }
    };
    let header_record = StringRecord::from(headers.clone());
    let header_len = headers.len();

    let mut table = CsvTable {
        headers,
        rows: Vec::new(),
        row_numbers: Vec::new(),
        field_count_mismatches: Vec::new(),
    };

    let mut record = StringRecord::new();
    let mut row_number: u64 = 1;
    loop {
        row_number += 1;
        match reader.read_record(&mut record) {
            Ok(true) => {
                let actual_len = record.len();
                if actual_len != header_len {
                    table.field_count_mismatches.push((row_number, actual_len));
                }
                let adjusted = if actual_len == header_len {
                    record.clone()
                } else {
                    let mut fields: Vec<&str> = record.iter().collect();
                    fields.resize(header_len, "");
                    StringRecord::from(fields)
                };
                match adjusted.deserialize::<T>(Some(&header_record)) {
                    Ok(row) => {
                        table.rows.push(row);
                        table.row_numbers.push(row_number);
                    }
                    Err(err) => {
                        notices.push_csv_error(&CsvParseError {
                            file: file_name.to_string(),
                            message: err.to_string(),
                            line_index: Some(row_number),
                            column_index: err.position().map(|p| p.byte()),
                            char_index: None,
                            parsed_content: Some(record.iter().collect::<Vec<_>>().join(",")),
                        });
                    }
                }
            }
            Ok(false) => break,
            Err(err) => {
                notices.push_csv_error(&CsvParseError {
                    file: file_name.to_string(),
                    message: err.to_string(),
                    line_index: Some(row_number),
                    column_index: None,
                    char_index: None,
                    parsed_content: None,
                });
                break;
            }
        }
    }

    table
}

/// A second, untrimmed pass over the same bytes `parse_csv_table` just read,
/// looking for defects that `Trim::Fields` would otherwise erase before a
/// validator ever saw them: a row of only-whitespace fields, a field that
/// still carries an embedded newline from quoting, and a field with leading
/// or trailing whitespace around its real content.
fn scan_raw_row_issues(file_name: &str, bytes: &[u8], notices: &NoticeContainer) {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::None)
        .flexible(true)
        .from_reader(Cursor::new(bytes));

    if reader.headers().is_err() {
        return;
    }

    let mut record = StringRecord::new();
    let mut row_number: u64 = 1;
    loop {
        row_number += 1;
        match reader.read_record(&mut record) {
            Ok(true) => {
                if record.iter().all(|value| value.trim().is_empty()) {
                    let mut notice = ValidationNotice::new(
                        NOTICE_CODE_EMPTY_ROW,
                        NoticeSeverity::Warning,
                        format!("{file_name} row {row_number} is empty"),
                    );
                    notice.file = Some(file_name.to_string());
                    notice.row = Some(row_number);
                    notice.insert_context_field("filename", file_name);
                    notice.insert_context_field("csvRowNumber", row_number);
                    notices.push(notice);
                    continue;
                }

                for value in record.iter() {
                    if value.contains('\n') || value.contains('\r') {
                        let mut notice = ValidationNotice::new(
                            NOTICE_CODE_NEW_LINE_IN_VALUE,
                            NoticeSeverity::Error,
                            format!("{file_name} row {row_number} has a field value containing a newline"),
                        );
                        notice.file = Some(file_name.to_string());
                        notice.row = Some(row_number);
                        notice.insert_context_field("filename", file_name);
                        notice.insert_context_field("csvRowNumber", row_number);
                        notices.push(notice);
                    } else if value != value.trim() {
                        let mut notice = ValidationNotice::new(
                            NOTICE_CODE_LEADING_OR_TRAILING_WHITESPACE,
                            NoticeSeverity::Warning,
                            format!(
                                "{file_name} row {row_number} has a field value with leading or trailing whitespace"
                            ),
                        );
                        notice.file = Some(file_name.to_string());
                        notice.row = Some(row_number);
                        notice.insert_context_field("filename", file_name);
                        notice.insert_context_field("csvRowNumber", row_number);
                        notices.push(notice);
                    }
                }
            }
            Ok(false) => break,
            Err(_) => break,
        }
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
    if bytes.starts_with(&BOM) {
        &bytes[3..]
    } else {
        bytes
    }
}

impl ValidationNotice {
    pub fn from_csv_parse_error(error: &CsvParseError) -> Self {
        Self::from_csv_error_internal(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeContainer;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Row {
        stop_id: String,
        stop_lat: Option<f64>,
    }

    #[test]
    fn parses_well_formed_rows_and_tracks_row_numbers() {
        let notices = NoticeContainer::new();
        let table: CsvTable<Row> =
            parse_csv_table("stops.txt", b"stop_id,stop_lat\nS1,1.0\nS2,\n", &notices);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.row_numbers, vec![2, 3]);
        assert!(notices.is_empty());
    }

    #[test]
    fn strips_leading_bom() {
        let notices = NoticeContainer::new();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"stop_id,stop_lat\nS1,1.0\n");
        let table: CsvTable<Row> = parse_csv_table("stops.txt", &bytes, &notices);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].stop_id, "S1");
    }

    #[test]
    fn malformed_row_is_reported_without_aborting_remaining_rows() {
        let notices = NoticeContainer::new();
        let table: CsvTable<Row> = parse_csv_table(
            "stops.txt",
            b"stop_id,stop_lat\nS1,not_a_number\nS2,2.0\n",
            &notices,
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].stop_id, "S2");
        assert_eq!(notices.len(), 1);
    }
}
