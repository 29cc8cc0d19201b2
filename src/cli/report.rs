use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::resolve_agency;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::reports;
use crate::settings::get_db_path;

pub fn run(agency: Option<&str>, year: Option<i32>) -> Result<()> {
    let conn = get_connection(&get_db_path())?;
    let agency = resolve_agency(&conn, agency)?;
    let summary = reports::get_summary(&conn, agency.id, year)?;

    let period = year.map_or_else(|| "all time".to_string(), |y| y.to_string());
    println!("{}", format!("{} ({period})", agency.name).bold());

    let mut table = Table::new();
    table.add_row(vec![Cell::new("Trips"), Cell::new(summary.trips)]);
    table.add_row(vec![Cell::new("Travelers"), Cell::new(summary.travelers)]);
    table.add_row(vec![Cell::new("Total cost"), Cell::new(money(summary.total_cost))]);
    table.add_row(vec![
        Cell::new("Average per trip"),
        Cell::new(money(summary.average_cost())),
    ]);
    table.add_row(vec![
        Cell::new("Commission".green().bold()),
        Cell::new(money(summary.total_commission)),
    ]);
    println!("Summary\n{table}");

    if summary.trips == 0 {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", "%"]);
    for item in &summary.spend {
        table.add_row(vec![
            Cell::new(item.name),
            Cell::new(money(item.total)),
            Cell::new(format!("{:.1}%", item.pct)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(summary.total_cost)),
        Cell::new(""),
    ]);
    println!("Spend by Category\n{table}");

    let mut table = Table::new();
    table.set_header(vec!["Country", "Trips", "Total"]);
    for d in &summary.destinations {
        table.add_row(vec![
            Cell::new(&d.country),
            Cell::new(d.trips),
            Cell::new(money(d.total)),
        ]);
    }
    println!("Top Destinations\n{table}");
    Ok(())
}
