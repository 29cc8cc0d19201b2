use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DB_FILE: &str = "voyagriq.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS agencies (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    agency_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    total_rows INTEGER NOT NULL,
    valid_rows INTEGER NOT NULL,
    error_count INTEGER NOT NULL,
    inserted_rows INTEGER NOT NULL DEFAULT 0,
    checksum TEXT,
    FOREIGN KEY (agency_id) REFERENCES agencies(id)
);

CREATE TABLE IF NOT EXISTS trips (
    id INTEGER PRIMARY KEY,
    agency_id INTEGER NOT NULL,
    import_id INTEGER,
    trip_id TEXT NOT NULL,
    client_name TEXT NOT NULL,
    travel_agency TEXT,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    destination_country TEXT NOT NULL,
    destination_city TEXT,
    adults INTEGER NOT NULL,
    children INTEGER NOT NULL,
    total_travelers INTEGER NOT NULL,
    flight_cost INTEGER NOT NULL DEFAULT 0,
    hotel_cost INTEGER NOT NULL DEFAULT 0,
    ground_transport INTEGER NOT NULL DEFAULT 0,
    activities_tours INTEGER NOT NULL DEFAULT 0,
    meals_cost INTEGER NOT NULL DEFAULT 0,
    insurance_cost INTEGER NOT NULL DEFAULT 0,
    other_costs INTEGER NOT NULL DEFAULT 0,
    currency TEXT NOT NULL DEFAULT 'USD',
    commission_rate REAL,
    commission_amount INTEGER,
    client_id TEXT,
    client_type TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (agency_id, trip_id),
    CHECK (commission_rate IS NULL OR commission_amount IS NULL),
    FOREIGN KEY (agency_id) REFERENCES agencies(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_trips_agency_start ON trips (agency_id, start_date);

CREATE TABLE IF NOT EXISTS rate_limit_hits (
    key TEXT NOT NULL,
    hit_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rate_limit_hits_key ON rate_limit_hits (key, hit_at);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["agencies", "imports", "trips", "rate_limit_hits"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_trip_ids_are_unique_per_agency() {
        let (_dir, conn) = test_db();
        conn.execute_batch(
            "INSERT INTO agencies (name) VALUES ('A'), ('B');
             INSERT INTO trips (agency_id, trip_id, client_name, start_date, end_date, destination_country, adults, children, total_travelers)
             VALUES (1, 'T1', 'Ada', '2025-01-01', '2025-01-02', 'Peru', 1, 0, 1);
             INSERT INTO trips (agency_id, trip_id, client_name, start_date, end_date, destination_country, adults, children, total_travelers)
             VALUES (2, 'T1', 'Bob', '2025-01-01', '2025-01-02', 'Peru', 1, 0, 1);",
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO trips (agency_id, trip_id, client_name, start_date, end_date, destination_country, adults, children, total_travelers)
             VALUES (1, 'T1', 'Eve', '2025-01-01', '2025-01-02', 'Peru', 1, 0, 1)",
            [],
        );
        assert!(dup.is_err());
    }
}
