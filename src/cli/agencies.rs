use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{get_db_path, load_settings, save_settings};
use crate::store::{add_agency, list_agencies};

pub fn add(name: &str, make_default: bool) -> Result<()> {
    let conn = get_connection(&get_db_path())?;
    add_agency(&conn, name)?;
    println!("Added agency: {}", name.trim());

    if make_default {
        let mut settings = load_settings();
        settings.default_agency = Some(name.trim().to_string());
        save_settings(&settings)?;
        println!("Default agency set to {}", name.trim());
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&get_db_path())?;
    let default = load_settings().default_agency;
    let rows = list_agencies(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Trips", "Default"]);
    for (agency, trips) in rows {
        let is_default = default.as_deref() == Some(agency.name.as_str());
        table.add_row(vec![
            Cell::new(agency.id),
            Cell::new(&agency.name),
            Cell::new(trips),
            Cell::new(if is_default { "*" } else { "" }),
        ]);
    }
    println!("Agencies\n{table}");
    Ok(())
}
