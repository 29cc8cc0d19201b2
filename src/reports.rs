use rusqlite::Connection;

use crate::error::Result;

/// Commission in cents for one stored trip: the flat amount, or the rate
/// applied to the trip's total cost.
const COMMISSION_SQL: &str = "CASE \
     WHEN commission_amount IS NOT NULL THEN commission_amount \
     WHEN commission_rate IS NOT NULL THEN \
         ROUND((flight_cost + hotel_cost + ground_transport + activities_tours + meals_cost \
                + insurance_cost + other_costs) * commission_rate / 100.0) \
     ELSE 0 END";

const TOTAL_COST_SQL: &str = "(flight_cost + hotel_cost + ground_transport + activities_tours \
     + meals_cost + insurance_cost + other_costs)";

const SPEND_CATEGORIES: [(&str, &str); 7] = [
    ("Flights", "flight_cost"),
    ("Hotels", "hotel_cost"),
    ("Ground transport", "ground_transport"),
    ("Activities & tours", "activities_tours"),
    ("Meals", "meals_cost"),
    ("Insurance", "insurance_cost"),
    ("Other", "other_costs"),
];

fn year_filter(year: Option<i32>) -> String {
    match year {
        Some(y) => format!("{y:04}%"),
        None => "%".to_string(),
    }
}

pub struct CategorySpend {
    pub name: &'static str,
    pub total: i64,
    pub pct: f64,
}

pub struct DestinationItem {
    pub country: String,
    pub trips: i64,
    pub total: i64,
}

pub struct TripSummary {
    pub trips: i64,
    pub travelers: i64,
    pub total_cost: i64,
    pub total_commission: i64,
    pub spend: Vec<CategorySpend>,
    pub destinations: Vec<DestinationItem>,
}

impl TripSummary {
    pub fn average_cost(&self) -> i64 {
        if self.trips == 0 {
            0
        } else {
            (self.total_cost as f64 / self.trips as f64).round() as i64
        }
    }
}

pub fn get_summary(conn: &Connection, agency_id: i64, year: Option<i32>) -> Result<TripSummary> {
    let pattern = year_filter(year);

    let spend_columns: Vec<String> = SPEND_CATEGORIES
        .iter()
        .map(|(_, col)| format!("COALESCE(SUM({col}), 0)"))
        .collect();
    let sql = format!(
        "SELECT COUNT(*), COALESCE(SUM(total_travelers), 0), \
         CAST(COALESCE(SUM({COMMISSION_SQL}), 0) AS INTEGER), {} \
         FROM trips WHERE agency_id = ?1 AND start_date LIKE ?2",
        spend_columns.join(", ")
    );
    let (trips, travelers, total_commission, totals) =
        conn.query_row(&sql, rusqlite::params![agency_id, pattern], |row| {
            let mut totals = [0_i64; SPEND_CATEGORIES.len()];
            for (i, slot) in totals.iter_mut().enumerate() {
                *slot = row.get(3 + i)?;
            }
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                totals,
            ))
        })?;

    let total_cost: i64 = totals.iter().sum();
    let spend = SPEND_CATEGORIES
        .iter()
        .zip(totals)
        .map(|(&(name, _), total)| CategorySpend {
            name,
            total,
            pct: if total_cost != 0 {
                total as f64 / total_cost as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    let mut stmt = conn.prepare(&format!(
        "SELECT destination_country, COUNT(*), COALESCE(SUM({TOTAL_COST_SQL}), 0) AS total \
         FROM trips WHERE agency_id = ?1 AND start_date LIKE ?2 \
         GROUP BY destination_country ORDER BY total DESC, destination_country LIMIT 10"
    ))?;
    let destinations = stmt
        .query_map(rusqlite::params![agency_id, pattern], |row| {
            Ok(DestinationItem {
                country: row.get(0)?,
                trips: row.get(1)?,
                total: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(TripSummary {
        trips,
        travelers,
        total_cost,
        total_commission,
        spend,
        destinations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::importer::parse_csv;
    use crate::store::{add_agency, commit_import};

    const CSV: &str = "Trip_ID,Client_Name,Start_Date,End_Date,Destination_Country,Adults,Children,Flight_Cost,Hotel_Cost,Commission_Rate,Commission_Amount\n\
                       T1,Ada,2025-03-01,2025-03-05,Italy,2,1,1000,500,10,\n\
                       T2,Bob,2025-06-01,2025-06-05,Italy,1,0,200,,,75\n\
                       T3,Cy,2024-11-01,2024-11-05,Japan,2,0,3000,1000,,\n";

    fn seeded() -> (tempfile::TempDir, Connection, i64) {
        let (dir, conn) = test_db();
        let agency_id = add_agency(&conn, "Wanderlust").unwrap();
        commit_import(&conn, agency_id, "trips.csv", "x", &parse_csv(CSV)).unwrap();
        (dir, conn, agency_id)
    }

    #[test]
    fn test_summary_all_years() {
        let (_dir, conn, agency_id) = seeded();
        let s = get_summary(&conn, agency_id, None).unwrap();
        assert_eq!(s.trips, 3);
        assert_eq!(s.travelers, 6);
        assert_eq!(s.total_cost, 570_000);
        // 10% of $1,500 plus a flat $75
        assert_eq!(s.total_commission, 15_000 + 7_500);
        assert_eq!(s.spend[0].name, "Flights");
        assert_eq!(s.spend[0].total, 420_000);
        assert_eq!(s.destinations[0].country, "Japan");
        assert_eq!(s.destinations[1].trips, 2);
        assert_eq!(s.average_cost(), 190_000);
    }

    #[test]
    fn test_summary_by_year() {
        let (_dir, conn, agency_id) = seeded();
        let s = get_summary(&conn, agency_id, Some(2025)).unwrap();
        assert_eq!(s.trips, 2);
        assert_eq!(s.total_cost, 170_000);
        assert_eq!(s.destinations.len(), 1);
    }

    #[test]
    fn test_summary_is_scoped_to_agency() {
        let (_dir, conn, _) = seeded();
        let other = add_agency(&conn, "Elsewhere").unwrap();
        let s = get_summary(&conn, other, None).unwrap();
        assert_eq!(s.trips, 0);
        assert_eq!(s.total_cost, 0);
        assert_eq!(s.average_cost(), 0);
        assert!(s.destinations.is_empty());
    }
}
