//! Bulk trip import: file bytes in, validated trips and per-row errors out.
//!
//! Tokenizing is format specific (`delimited`, `spreadsheet`); everything
//! after a file has been turned into [`RawRow`]s is shared (`validate`).
//! Nothing here touches storage.

pub mod delimited;
pub mod spreadsheet;
pub mod validate;
pub mod values;

use chrono::NaiveDate;

use crate::models::ParseResult;

pub use delimited::parse_csv;
pub use spreadsheet::parse_excel;

/// Column headers of the import template, in template order.
pub const EXPECTED_HEADERS: [&str; 22] = [
    "Trip_ID",
    "Client_Name",
    "Travel_Agency",
    "Start_Date",
    "End_Date",
    "Destination_Country",
    "Destination_City",
    "Adults",
    "Children",
    "Total_Travelers",
    "Flight_Cost",
    "Hotel_Cost",
    "Ground_Transport",
    "Activities_Tours",
    "Meals_Cost",
    "Insurance_Cost",
    "Other_Costs",
    "Currency",
    "Commission_Rate",
    "Commission_Amount",
    "Client_ID",
    "Client_Type",
];

pub const MIME_CSV: &str = "text/csv";
pub const MIME_XLS: &str = "application/vnd.ms-excel";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Trim a header and collapse inner whitespace runs to `_`, so
/// " Client  Name " becomes "Client_Name". A UTF-8 byte order mark left by
/// spreadsheet exports is dropped.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// One untyped cell as the tokenizer saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl Cell {
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed text form, `None` when blank.
    pub fn text(&self) -> Option<String> {
        let s = match self {
            Cell::Empty => return None,
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Bool(b) => b.to_string(),
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

/// Header-keyed cells of one data row, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, Cell)>,
}

impl RawRow {
    pub fn new(cells: Vec<(String, Cell)>) -> Self {
        Self { cells }
    }

    /// Pair headers with cells positionally. Cells beyond the header row and
    /// columns with an empty header are dropped.
    pub fn from_columns(headers: &[String], cells: impl IntoIterator<Item = Cell>) -> Self {
        let cells = headers
            .iter()
            .zip(cells)
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, c)| (h.clone(), c))
            .collect();
        Self::new(cells)
    }

    /// The cell under `header`. Missing columns read as `None`; when a
    /// header repeats, the first column wins.
    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.cells.iter().find(|(h, _)| h == header).map(|(_, c)| c)
    }

    /// The cell under `header` unless it is absent or blank.
    pub fn present(&self, header: &str) -> Option<&Cell> {
        self.get(header).filter(|c| !c.is_blank())
    }

    pub fn text(&self, header: &str) -> Option<String> {
        self.get(header).and_then(Cell::text)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, c)| c.is_blank())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Excel,
}

impl ImportFormat {
    /// Recognize a declared MIME type or a file name.
    pub fn detect(declared: &str) -> Option<Self> {
        let declared = declared.trim().to_ascii_lowercase();
        let mime = declared.split(';').next().unwrap_or("").trim();
        match mime {
            MIME_CSV => return Some(Self::Csv),
            MIME_XLS | MIME_XLSX => return Some(Self::Excel),
            _ => {}
        }
        if declared.ends_with(".csv") {
            Some(Self::Csv)
        } else if declared.ends_with(".xlsx") || declared.ends_with(".xls") {
            Some(Self::Excel)
        } else {
            None
        }
    }
}

/// Parse an uploaded file given its declared MIME type or file name.
pub fn parse_import_file(content: &[u8], declared: &str) -> ParseResult {
    match ImportFormat::detect(declared) {
        Some(ImportFormat::Csv) => match std::str::from_utf8(content) {
            Ok(text) => parse_csv(text),
            Err(e) => {
                tracing::warn!(error = %e, "csv upload is not utf-8");
                ParseResult::file_error("Failed to parse CSV: file is not valid UTF-8 text")
            }
        },
        Some(ImportFormat::Excel) => parse_excel(content),
        None => {
            tracing::warn!(declared, "unsupported import type");
            ParseResult::file_error(format!(
                "Unsupported file type '{declared}'. Upload a .csv, .xls or .xlsx file"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Trip_ID,Client_Name,Start_Date,End_Date,Destination_Country\n\
                       T001,Ada Lovelace,2025-03-01,2025-03-10,Italy\n";

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Client Name"), "Client_Name");
        assert_eq!(normalize_header("  Trip_ID  "), "Trip_ID");
        assert_eq!(normalize_header("Destination \t  Country"), "Destination_Country");
        assert_eq!(normalize_header("\u{feff}Trip_ID"), "Trip_ID");
        assert_eq!(normalize_header("   "), "");
    }

    #[test]
    fn test_detect_by_mime_type() {
        assert_eq!(ImportFormat::detect("text/csv"), Some(ImportFormat::Csv));
        assert_eq!(ImportFormat::detect("text/csv; charset=utf-8"), Some(ImportFormat::Csv));
        assert_eq!(ImportFormat::detect(MIME_XLS), Some(ImportFormat::Excel));
        assert_eq!(ImportFormat::detect(MIME_XLSX), Some(ImportFormat::Excel));
        assert_eq!(ImportFormat::detect("application/pdf"), None);
    }

    #[test]
    fn test_detect_by_file_name() {
        assert_eq!(ImportFormat::detect("trips.CSV"), Some(ImportFormat::Csv));
        assert_eq!(ImportFormat::detect("q1/trips.xlsx"), Some(ImportFormat::Excel));
        assert_eq!(ImportFormat::detect("legacy.xls"), Some(ImportFormat::Excel));
        assert_eq!(ImportFormat::detect("notes.txt"), None);
    }

    #[test]
    fn test_parse_import_file_dispatches_csv() {
        let result = parse_import_file(CSV.as_bytes(), "text/csv");
        assert!(result.success);
        assert_eq!(result.valid_rows, 1);
        let by_name = parse_import_file(CSV.as_bytes(), "upload.csv");
        assert_eq!(result, by_name);
    }

    #[test]
    fn test_parse_import_file_rejects_unknown_type() {
        let result = parse_import_file(CSV.as_bytes(), "application/json");
        assert!(!result.success);
        assert!(result.trips.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 0);
        assert_eq!(result.errors[0].field, "file");
    }

    #[test]
    fn test_parse_import_file_rejects_non_utf8_csv() {
        let result = parse_import_file(&[0xff, 0xfe, 0x00, 0x41], "text/csv");
        assert!(!result.success);
        assert_eq!(result.errors[0].field, "file");
    }

    #[test]
    fn test_raw_row_lookup() {
        let headers = vec!["Trip_ID".to_string(), String::new(), "Adults".to_string()];
        let row = RawRow::from_columns(
            &headers,
            vec![Cell::from_text(" T1 "), Cell::from_text("x"), Cell::Number(2.0)],
        );
        assert_eq!(row.text("Trip_ID").as_deref(), Some("T1"));
        assert_eq!(row.text("Adults").as_deref(), Some("2"));
        assert!(row.get("Children").is_none());
        assert!(!row.is_blank());
    }

    #[test]
    fn test_cell_text_forms() {
        assert_eq!(Cell::Number(3.0).text().as_deref(), Some("3"));
        assert_eq!(Cell::Number(2.5).text().as_deref(), Some("2.5"));
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(Cell::Date(d).text().as_deref(), Some("2025-03-01"));
        assert_eq!(Cell::from_text("   ").text(), None);
    }
}
