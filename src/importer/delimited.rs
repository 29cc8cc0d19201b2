use csv::ReaderBuilder;

use crate::models::ParseResult;

use super::validate::assemble;
use super::{normalize_header, Cell, RawRow};

/// Parse CSV text (Excel dialect: quoted delimiters, embedded newlines and
/// doubled quotes) into a batch result.
pub fn parse_csv(content: &str) -> ParseResult {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(normalize_header).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "csv header row unreadable");
            return ParseResult::file_error(format!("Failed to parse CSV: {e}"));
        }
    };
    if headers.iter().all(String::is_empty) {
        return ParseResult::file_error("Failed to parse CSV: the file has no header row");
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "csv record unreadable");
                return ParseResult::file_error(format!("Failed to parse CSV: {e}"));
            }
        };
        let row = RawRow::from_columns(&headers, record.iter().map(Cell::from_text));
        if row.is_blank() {
            continue;
        }
        // +1 for 1-based numbering, +1 for the header row
        rows.push((idx + 2, row));
    }

    assemble(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Trip_ID,Client_Name,Travel_Agency,Start_Date,End_Date,Destination_Country,Destination_City,Adults,Children,Total_Travelers,Flight_Cost,Hotel_Cost,Ground_Transport,Activities_Tours,Meals_Cost,Insurance_Cost,Other_Costs,Currency,Commission_Rate,Commission_Amount,Client_ID,Client_Type";

    fn csv_with(rows: &[&str]) -> String {
        let mut content = format!("{HEADER}\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        content
    }

    #[test]
    fn test_valid_file_parses_every_row() {
        let content = csv_with(&[
            "T001,Ada Lovelace,Wanderlust,2025-03-01,2025-03-10,Italy,Rome,2,1,3,\"$1,200.50\",900,150,200,300,80,0,USD,10,,C1,individual",
            "T002,Grace Hopper,,04/02/2025,04/09/2025,Japan,Tokyo,1,0,1,1500,1100,,,,,,,,250,,Corporate",
            "T003,Alan Turing,,2025-05-01,2025-05-03,France,,,,,,,,,,,,,,,,",
        ]);
        let result = parse_csv(&content);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.total_rows, 3);
        assert_eq!(result.valid_rows, 3);
        assert_eq!(result.trips.len(), 3);
        assert!(result.errors.is_empty());

        let first = &result.trips[0];
        assert_eq!(first.flight_cost, 120050);
        assert_eq!(first.travel_agency.as_deref(), Some("Wanderlust"));
        assert_eq!(first.total_travelers, 3);

        let second = &result.trips[1];
        assert_eq!(second.start_date, "2025-04-02");
        assert_eq!(second.client_type.map(|t| t.as_str()), Some("corporate"));
        assert_eq!(second.commission_cents(), 25000);
        assert_eq!(second.travel_agency, None);
    }

    #[test]
    fn test_header_normalization() {
        let content = " Trip ID ,Client   Name,Start Date,End Date,Destination Country\n\
                       T1,Ada,2025-01-01,2025-01-02,Peru\n";
        let result = parse_csv(content);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.trips[0].client_name, "Ada");
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let content = "\u{feff}Trip_ID,Client_Name,Start_Date,End_Date,Destination_Country\n\
                       T1,Ada,2025-01-01,2025-01-02,Peru\n";
        let result = parse_csv(content);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.trips[0].trip_id, "T1");
    }

    #[test]
    fn test_quoted_fields() {
        let content = "Trip_ID,Client_Name,Start_Date,End_Date,Destination_Country,Destination_City\n\
                       T1,\"Smith, Jane\",2025-01-01,2025-01-02,USA,\"New York\"\n\
                       T2,\"The \"\"Explorers\"\" Club\",2025-01-01,2025-01-02,\"Line one\nLine two\",Oslo\n";
        let result = parse_csv(content);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.trips[0].client_name, "Smith, Jane");
        assert_eq!(result.trips[1].client_name, "The \"Explorers\" Club");
        assert_eq!(result.trips[1].destination_country, "Line one\nLine two");
    }

    #[test]
    fn test_row_numbers_are_header_adjusted() {
        let content = csv_with(&[
            "T001,Ada,,2025-03-01,2025-03-10,Italy,,,,,,,,,,,,,,,,",
            "T002,,,2025-03-01,2025-03-10,Italy,,,,,,,,,,,,,,,,",
        ]);
        let result = parse_csv(&content);
        assert!(!result.success);
        assert_eq!(result.valid_rows, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 3);
        assert_eq!(result.errors[0].field, "Client_Name");
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let content = "Trip_ID,Client_Name,Start_Date,End_Date,Destination_Country\n\
                       T1,Ada,2025-01-01,2025-01-02,Peru\n\
                       ,,,,\n\
                       T2,Bob,2025-01-01,2025-01-02,Chile\n";
        let result = parse_csv(content);
        assert!(result.success);
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.trips[1].source_row, 4);
    }

    #[test]
    fn test_duplicates_within_file() {
        let content = "Trip_ID,Client_Name,Start_Date,End_Date,Destination_Country\n\
                       T001,Ada,2025-01-01,2025-01-02,Peru\n\
                       T001,Bob,2025-02-01,2025-02-02,Chile\n";
        let result = parse_csv(content);
        assert!(!result.success);
        assert_eq!(result.trips.len(), 1);
        assert_eq!(result.trips[0].client_name, "Ada");
        assert_eq!(result.errors[0].field, "Trip_ID");
        assert!(result.errors[0].message.contains("T001"));
    }

    #[test]
    fn test_short_rows_read_missing_cells_as_absent() {
        let content = "Trip_ID,Client_Name,Start_Date,End_Date,Destination_Country,Adults\n\
                       T1,Ada,2025-01-01,2025-01-02,Peru\n";
        let result = parse_csv(content);
        assert!(result.success);
        assert_eq!(result.trips[0].adults, 1);
    }

    #[test]
    fn test_empty_file_is_a_file_error() {
        let result = parse_csv("");
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 0);
        assert_eq!(result.errors[0].field, "file");
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let result = parse_csv(&csv_with(&[]));
        assert!(result.success);
        assert_eq!(result.total_rows, 0);
        assert!(result.trips.is_empty());
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let content = csv_with(&[
            "T001,Ada,,2025-03-01,2025-03-10,Italy,,,,,,,,,,,,,,,,",
            "T001,Bob,,2025-03-01,2025-02-10,Italy,,,,,,,,,,,,,,,,",
        ]);
        assert_eq!(parse_csv(&content), parse_csv(&content));
    }
}
