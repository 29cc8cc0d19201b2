use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::resolve_agency;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{money, percent};
use crate::models::Commission;
use crate::settings::get_db_path;
use crate::store::list_trips;

pub fn run(agency: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_db_path())?;
    let agency = resolve_agency(&conn, agency)?;
    let trips = list_trips(&conn, agency.id)?;

    if trips.is_empty() {
        println!("No trips stored for {}.", agency.name);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Trip ID",
        "Client",
        "Dates",
        "Destination",
        "Travelers",
        "Total Cost",
        "Commission",
    ]);
    for trip in &trips {
        let destination = match &trip.destination_city {
            Some(city) => format!("{city}, {}", trip.destination_country),
            None => trip.destination_country.clone(),
        };
        let commission = match trip.commission {
            Some(Commission::Rate(rate)) => {
                format!("{} ({})", money(trip.commission_cents()), percent(rate))
            }
            Some(Commission::Amount(cents)) => money(cents),
            None => String::new(),
        };
        table.add_row(vec![
            Cell::new(&trip.trip_id),
            Cell::new(&trip.client_name),
            Cell::new(format!("{} to {}", trip.start_date, trip.end_date)),
            Cell::new(destination),
            Cell::new(trip.total_travelers).set_alignment(CellAlignment::Right),
            Cell::new(money(trip.total_cost())).set_alignment(CellAlignment::Right),
            Cell::new(commission).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Trips for {} ({})\n{table}", agency.name, trips.len());
    Ok(())
}
