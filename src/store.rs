//! Caller-side persistence of imported trips. Every trip row belongs to one
//! agency and every query here is scoped by `agency_id`.

use rusqlite::{Connection, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, VoyagrError};
use crate::models::{Agency, ClientType, Commission, ParseError, ParseResult, ParsedTrip};

pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ---------------------------------------------------------------------------
// Agencies
// ---------------------------------------------------------------------------

pub fn add_agency(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VoyagrError::Other("Agency name cannot be empty".to_string()));
    }
    match conn.execute("INSERT INTO agencies (name) VALUES (?1)", [name]) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => {
            Err(VoyagrError::Other(format!("Agency already exists: {name}")))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn find_agency(conn: &Connection, name: &str) -> Result<Agency> {
    conn.query_row(
        "SELECT id, name FROM agencies WHERE name = ?1",
        [name.trim()],
        |row| {
            Ok(Agency {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .map_err(|_| VoyagrError::UnknownAgency(name.to_string()))
}

/// Agencies with their stored trip counts, by name.
pub fn list_agencies(conn: &Connection) -> Result<Vec<(Agency, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name, COUNT(t.id) FROM agencies a \
         LEFT JOIN trips t ON t.agency_id = a.id \
         GROUP BY a.id ORDER BY a.name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                Agency {
                    id: row.get(0)?,
                    name: row.get(1)?,
                },
                row.get(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

pub fn import_exists(conn: &Connection, agency_id: i64, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE agency_id = ?1 AND checksum = ?2")?;
    Ok(stmt.exists(rusqlite::params![agency_id, checksum])?)
}

#[derive(Debug, Serialize)]
pub struct CommitOutcome {
    pub import_id: i64,
    pub inserted: usize,
    /// Trips the store refused, in the same shape as parse errors.
    pub rejected: Vec<ParseError>,
}

/// Record the import batch and insert its valid trips in one transaction.
/// A trip id the agency already has is reported back as a `Trip_ID` error
/// for its source row; other trips still go in.
pub fn commit_import(
    conn: &Connection,
    agency_id: i64,
    filename: &str,
    checksum: &str,
    result: &ParseResult,
) -> Result<CommitOutcome> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO imports (agency_id, filename, total_rows, valid_rows, error_count, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            agency_id,
            filename,
            result.total_rows as i64,
            result.valid_rows as i64,
            result.errors.len() as i64,
            checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    let mut inserted = 0usize;
    let mut rejected = Vec::new();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO trips (agency_id, import_id, trip_id, client_name, travel_agency, \
             start_date, end_date, destination_country, destination_city, adults, children, \
             total_travelers, flight_cost, hotel_cost, ground_transport, activities_tours, \
             meals_cost, insurance_cost, other_costs, currency, commission_rate, \
             commission_amount, client_id, client_type) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
        )?;
        for trip in &result.trips {
            let outcome = stmt.execute(rusqlite::params![
                agency_id,
                import_id,
                trip.trip_id,
                trip.client_name,
                trip.travel_agency,
                trip.start_date,
                trip.end_date,
                trip.destination_country,
                trip.destination_city,
                trip.adults,
                trip.children,
                trip.total_travelers,
                trip.flight_cost,
                trip.hotel_cost,
                trip.ground_transport,
                trip.activities_tours,
                trip.meals_cost,
                trip.insurance_cost,
                trip.other_costs,
                trip.currency,
                trip.commission.and_then(|c| c.rate()),
                trip.commission.and_then(|c| c.amount()),
                trip.client_id,
                trip.client_type.map(|t| t.as_str()),
            ]);
            match outcome {
                Ok(_) => inserted += 1,
                Err(e) if is_unique_violation(&e) => {
                    tracing::warn!(trip_id = %trip.trip_id, row = trip.source_row, "trip id already stored");
                    rejected.push(
                        ParseError::new(
                            trip.source_row,
                            "Trip_ID",
                            format!("Trip ID \"{}\" already exists for this agency", trip.trip_id),
                        )
                        .with_value(trip.trip_id.clone()),
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    tx.execute(
        "UPDATE imports SET inserted_rows = ?1 WHERE id = ?2",
        rusqlite::params![inserted as i64, import_id],
    )?;
    tx.commit()?;

    tracing::debug!(import_id, inserted, rejected = rejected.len(), "committed import");
    Ok(CommitOutcome {
        import_id,
        inserted,
        rejected,
    })
}

// ---------------------------------------------------------------------------
// Trips
// ---------------------------------------------------------------------------

fn trip_from_row(row: &Row) -> rusqlite::Result<ParsedTrip> {
    let rate: Option<f64> = row.get(19)?;
    let amount: Option<i64> = row.get(20)?;
    let client_type: Option<String> = row.get(21)?;
    Ok(ParsedTrip {
        source_row: 0,
        trip_id: row.get(0)?,
        client_name: row.get(1)?,
        travel_agency: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        destination_country: row.get(5)?,
        destination_city: row.get(6)?,
        adults: row.get(7)?,
        children: row.get(8)?,
        total_travelers: row.get(9)?,
        flight_cost: row.get(10)?,
        hotel_cost: row.get(11)?,
        ground_transport: row.get(12)?,
        activities_tours: row.get(13)?,
        meals_cost: row.get(14)?,
        insurance_cost: row.get(15)?,
        other_costs: row.get(16)?,
        currency: row.get(17)?,
        commission: rate
            .map(Commission::Rate)
            .or(amount.map(Commission::Amount)),
        client_id: row.get(18)?,
        client_type: client_type.as_deref().and_then(ClientType::parse),
    })
}

/// Stored trips for one agency, most recent start date first.
pub fn list_trips(conn: &Connection, agency_id: i64) -> Result<Vec<ParsedTrip>> {
    let mut stmt = conn.prepare(
        "SELECT trip_id, client_name, travel_agency, start_date, end_date, destination_country, \
         destination_city, adults, children, total_travelers, flight_cost, hotel_cost, \
         ground_transport, activities_tours, meals_cost, insurance_cost, other_costs, currency, \
         client_id, commission_rate, commission_amount, client_type \
         FROM trips WHERE agency_id = ?1 ORDER BY start_date DESC, trip_id",
    )?;
    let trips = stmt
        .query_map([agency_id], trip_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(trips)
}
