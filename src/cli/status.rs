use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{get_db_path, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = get_db_path();

    println!("Data dir:       {}", settings.data_dir);
    println!("Database:       {}", db_path.display());
    println!(
        "Default agency: {}",
        settings.default_agency.as_deref().unwrap_or("(not set)")
    );
    println!(
        "Import limit:   {} per {}s",
        settings.import_limit.max_imports, settings.import_limit.window_secs
    );

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let agencies: i64 = conn.query_row("SELECT count(*) FROM agencies", [], |r| r.get(0))?;
        let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?;
        let trips: i64 = conn.query_row("SELECT count(*) FROM trips", [], |r| r.get(0))?;

        println!();
        println!("Agencies:  {agencies}");
        println!("Imports:   {imports}");
        println!("Trips:     {trips}");
    } else {
        println!();
        println!("Database not found. Run `voyagriq init` to set up.");
    }

    Ok(())
}
