use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::{error_table, resolve_agency};
use crate::db::get_connection;
use crate::error::{Result, VoyagrError};
use crate::importer::parse_import_file;
use crate::models::ParseResult;
use crate::ratelimit::{Decision, RateLimiter, SqliteStore, SystemClock};
use crate::settings::{get_db_path, load_settings};
use crate::store::{commit_import, compute_checksum, import_exists, CommitOutcome};

pub struct ImportOptions<'a> {
    pub agency: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub dry_run: bool,
    pub strict: bool,
    pub json: bool,
}

#[derive(Serialize)]
struct ImportReport<'a> {
    result: &'a ParseResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    committed: Option<&'a CommitOutcome>,
    duplicate_file: bool,
}

pub fn run(file: &str, opts: &ImportOptions) -> Result<()> {
    let file_path = PathBuf::from(file);
    let content = std::fs::read(&file_path)?;
    let filename = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());
    let declared = opts.content_type.unwrap_or(&filename);

    let result = parse_import_file(&content, declared);

    if opts.dry_run {
        print_report(&result, None, false, opts.json)?;
        return finish(&result, None);
    }

    let settings = load_settings();
    let conn = get_connection(&get_db_path())?;
    let agency = resolve_agency(&conn, opts.agency)?;
    let checksum = compute_checksum(&content);

    if import_exists(&conn, agency.id, &checksum)? {
        print_report(&result, None, true, opts.json)?;
        if !opts.json {
            println!("This file has already been imported (duplicate checksum).");
        }
        return finish(&result, None);
    }

    if result.trips.is_empty() || (opts.strict && !result.success) {
        print_report(&result, None, false, opts.json)?;
        if !opts.json && !result.trips.is_empty() {
            println!("{}", "Nothing stored: --strict requires every row to be valid.".yellow());
        }
        return finish(&result, None);
    }

    let mut limiter = RateLimiter::new(
        SystemClock,
        SqliteStore::new(&conn),
        settings.import_limit.max_imports,
        settings.import_limit.window_secs,
    );
    let key = format!("import:{}", agency.id);
    match limiter.peek(&key)? {
        Decision::Limited { retry_after } => return Err(VoyagrError::RateLimited { retry_after }),
        Decision::Allowed { remaining } => tracing::debug!(%key, remaining, "import allowed"),
    }

    let outcome = commit_import(&conn, agency.id, &filename, &checksum, &result)?;
    limiter.record(&key)?;
    print_report(&result, Some(&outcome), false, opts.json)?;
    if !opts.json {
        println!("{} trips stored for {}", outcome.inserted, agency.name);
    }
    finish(&result, Some(&outcome))
}

fn print_report(
    result: &ParseResult,
    committed: Option<&CommitOutcome>,
    duplicate_file: bool,
    json: bool,
) -> Result<()> {
    if json {
        let report = ImportReport {
            result,
            committed,
            duplicate_file,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let invalid = result.total_rows - result.valid_rows;
    let summary = format!(
        "{} rows read, {} valid, {} with errors",
        result.total_rows, result.valid_rows, invalid
    );
    if result.success {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }

    if !result.errors.is_empty() {
        println!("Errors\n{}", error_table(&result.errors));
    }
    if let Some(outcome) = committed {
        if !outcome.rejected.is_empty() {
            println!("Rejected by the store\n{}", error_table(&outcome.rejected));
        }
    }
    Ok(())
}

/// Exit status: any parse error or store rejection fails the command.
fn finish(result: &ParseResult, committed: Option<&CommitOutcome>) -> Result<()> {
    let problems = result.errors.len() + committed.map_or(0, |c| c.rejected.len());
    if problems > 0 {
        return Err(VoyagrError::Other(format!(
            "import finished with {problems} problem(s)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::parse_csv;

    #[test]
    fn test_finish_clean_import() {
        let result = parse_csv("Trip_ID,Client_Name,Destination_Country,Start_Date,End_Date\nT1,Ada,Peru,2025-01-01,2025-01-05\n");
        assert!(finish(&result, None).is_ok());
    }

    #[test]
    fn test_finish_counts_rejections() {
        let result = parse_csv("Trip_ID,Client_Name,Destination_Country,Start_Date,End_Date\nT1,Ada,Peru,2025-01-01,2025-01-05\n");
        let outcome = CommitOutcome {
            import_id: 1,
            inserted: 0,
            rejected: vec![crate::models::ParseError::new(2, "Trip_ID", "already imported")],
        };
        let err = finish(&result, Some(&outcome)).unwrap_err();
        assert!(err.to_string().contains("1 problem"));
    }

    #[test]
    fn test_json_report_shape() {
        let result = ParseResult::file_error("Unsupported file type");
        let report = ImportReport {
            result: &result,
            committed: None,
            duplicate_file: false,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["result"]["success"], false);
        assert_eq!(value["result"]["totalRows"], 0);
        assert_eq!(value["result"]["errors"][0]["field"], "file");
        assert!(value.get("committed").is_none());
    }
}
