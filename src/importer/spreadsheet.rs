use crate::models::ParseResult;

#[cfg(feature = "excel")]
use super::validate::assemble;
#[cfg(feature = "excel")]
use super::{normalize_header, Cell, RawRow};

#[cfg(feature = "excel")]
fn to_cell(data: &calamine::Data) -> Cell {
    use calamine::Data;
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        // as_datetime honors the workbook's 1900 or 1904 date system
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(datetime) => Cell::Date(datetime.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

/// Parse the first worksheet of an `.xlsx`/`.xls` workbook. The first row
/// of the sheet's used range is the header row.
#[cfg(feature = "excel")]
pub fn parse_excel(content: &[u8]) -> ParseResult {
    use calamine::Reader;

    let cursor = std::io::Cursor::new(content.to_vec());
    let mut workbook = match calamine::open_workbook_auto_from_rs(cursor) {
        Ok(workbook) => workbook,
        Err(e) => {
            tracing::warn!(error = %e, "workbook unreadable");
            return ParseResult::file_error(format!("Failed to read workbook: {e}"));
        }
    };

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return ParseResult::file_error("The workbook contains no worksheets");
    };
    let range = match workbook.worksheet_range(&sheet_name) {
        Ok(range) => range,
        Err(e) => {
            tracing::warn!(error = %e, sheet = %sheet_name, "worksheet unreadable");
            return ParseResult::file_error(format!("Failed to read worksheet '{sheet_name}': {e}"));
        }
    };

    // The used range may not start at A1; keep row numbers sheet-relative.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return ParseResult::file_error(format!("Worksheet '{sheet_name}' is empty"));
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| normalize_header(&to_cell(cell).text().unwrap_or_default()))
        .collect();
    if headers.iter().all(String::is_empty) {
        return ParseResult::file_error(format!("Worksheet '{sheet_name}' has no header row"));
    }

    let mut rows = Vec::new();
    for (idx, data_row) in sheet_rows.enumerate() {
        let row = RawRow::from_columns(&headers, data_row.iter().map(to_cell));
        if row.is_blank() {
            continue;
        }
        rows.push((first_row + idx + 2, row));
    }

    tracing::debug!(sheet = %sheet_name, rows = rows.len(), "read worksheet");
    assemble(rows)
}

#[cfg(not(feature = "excel"))]
pub fn parse_excel(_content: &[u8]) -> ParseResult {
    ParseResult::file_error("Excel import is not enabled in this build; upload a .csv file")
}
