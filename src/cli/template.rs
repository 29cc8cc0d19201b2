use std::path::Path;

use crate::error::{Result, VoyagrError};
use crate::importer::EXPECTED_HEADERS;

const DEFAULT_OUTPUT: &str = "voyagriq-import-template.csv";

/// One valid trip, aligned with `EXPECTED_HEADERS`.
pub const SAMPLE_ROW: [&str; 22] = [
    "TRIP-001",
    "Jane Smith",
    "Wanderlust Travel",
    "2025-06-01",
    "2025-06-10",
    "Italy",
    "Rome",
    "2",
    "1",
    "3",
    "1850.00",
    "2400.00",
    "320.00",
    "450.00",
    "600.00",
    "180.00",
    "75.00",
    "USD",
    "10",
    "",
    "CL-1001",
    "individual",
];

pub fn run(output: Option<String>) -> Result<()> {
    let output = output.unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let path = Path::new(&output);
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => write_csv(path)?,
        "xlsx" => write_xlsx(path)?,
        _ => {
            return Err(VoyagrError::Other(
                "template output must end in .csv or .xlsx".to_string(),
            ))
        }
    }
    println!("Wrote template to {}", path.display());
    Ok(())
}

pub fn write_csv(path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(EXPECTED_HEADERS)?;
    wtr.write_record(SAMPLE_ROW)?;
    wtr.flush()?;
    Ok(())
}

#[cfg(feature = "excel")]
pub fn write_xlsx(path: &Path) -> Result<()> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Trips")?;

    for (col, (header, sample)) in EXPECTED_HEADERS.iter().zip(SAMPLE_ROW).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &bold)?;
        sheet.set_column_width(col, (header.len() + 4) as f64)?;
        if sample.is_empty() {
            continue;
        }
        match sample.parse::<f64>() {
            Ok(n) => sheet.write_number(1, col, n)?,
            Err(_) => sheet.write_string(1, col, sample)?,
        };
    }
    workbook.save(path)?;
    Ok(())
}

#[cfg(not(feature = "excel"))]
pub fn write_xlsx(_path: &Path) -> Result<()> {
    Err(VoyagrError::Other(
        "Excel templates require the `excel` feature".to_string(),
    ))
}
