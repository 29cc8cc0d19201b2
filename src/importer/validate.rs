use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{ClientType, Commission, ParseError, ParseResult, ParsedTrip, DEFAULT_CURRENCY};

use super::values::{
    cell_amount, cell_date, cell_integer, cell_percent, dollars_to_cents, MAX_AMOUNT,
};
use super::{Cell, RawRow};

const REQUIRED_FIELDS: [&str; 5] = [
    "Trip_ID",
    "Client_Name",
    "Destination_Country",
    "Start_Date",
    "End_Date",
];

const COST_FIELDS: [&str; 7] = [
    "Flight_Cost",
    "Hotel_Cost",
    "Ground_Transport",
    "Activities_Tours",
    "Meals_Cost",
    "Insurance_Cost",
    "Other_Costs",
];

fn label(field: &str) -> String {
    field.replace('_', " ")
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Row validation
// ---------------------------------------------------------------------------

/// Collects every problem found in one row.
struct RowCheck<'a> {
    row: &'a RawRow,
    number: usize,
    errors: Vec<ParseError>,
}

impl<'a> RowCheck<'a> {
    fn fail(&mut self, field: &str, message: impl Into<String>, cell: Option<&Cell>) {
        let mut error = ParseError::new(self.number, field, message);
        if let Some(value) = cell.and_then(Cell::text) {
            error = error.with_value(value);
        }
        self.errors.push(error);
    }

    fn required(&mut self, field: &str) {
        let row = self.row;
        if row.present(field).is_none() {
            self.fail(field, format!("{} is required", label(field)), None);
        }
    }

    fn date(&mut self, field: &str) -> Option<NaiveDate> {
        let row = self.row;
        let cell = row.present(field)?;
        let parsed = cell_date(cell);
        if parsed.is_none() {
            self.fail(field, "Invalid date. Use YYYY-MM-DD or MM/DD/YYYY", Some(cell));
        }
        parsed
    }

    /// Whole number `>= min`; a blank cell reads as `default`.
    fn count(&mut self, field: &str, min: i64, default: u32) -> Option<u32> {
        let row = self.row;
        let Some(cell) = row.present(field) else {
            return Some(default);
        };
        match cell_integer(cell) {
            Some(v) if v >= min && v <= i64::from(u32::MAX) => Some(v as u32),
            _ => {
                let message = if min == 0 {
                    format!("{} must be a whole number of 0 or more", label(field))
                } else {
                    format!("{} must be a whole number of at least {min}", label(field))
                };
                self.fail(field, message, Some(cell));
                None
            }
        }
    }

    /// Non-negative dollars as cents; a blank cell reads as `None`.
    fn money(&mut self, field: &str) -> Option<i64> {
        let row = self.row;
        let cell = row.present(field)?;
        match cell_amount(cell) {
            Some(dollars) if dollars > MAX_AMOUNT => {
                self.fail(
                    field,
                    format!("{} cannot exceed $1,000,000,000", label(field)),
                    Some(cell),
                );
                None
            }
            Some(dollars) if dollars >= 0.0 => Some(dollars_to_cents(dollars)),
            Some(_) => {
                self.fail(field, format!("{} cannot be negative", label(field)), Some(cell));
                None
            }
            None => {
                self.fail(field, format!("{} must be a valid amount", label(field)), Some(cell));
                None
            }
        }
    }

    fn client_type(&mut self) -> Option<ClientType> {
        let row = self.row;
        let cell = row.present("Client_Type")?;
        let parsed = cell.text().as_deref().and_then(ClientType::parse);
        if parsed.is_none() {
            self.fail(
                "Client_Type",
                "Client type must be one of: individual, corporate, group",
                Some(cell),
            );
        }
        parsed
    }

    fn currency(&mut self) -> String {
        let row = self.row;
        match row.present("Currency") {
            None => DEFAULT_CURRENCY.to_string(),
            Some(cell) => {
                let code = cell.text().unwrap_or_default();
                if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
                    code.to_ascii_uppercase()
                } else {
                    self.fail("Currency", "Currency must be a 3-letter code such as USD", Some(cell));
                    DEFAULT_CURRENCY.to_string()
                }
            }
        }
    }

    fn commission(&mut self) -> Option<Commission> {
        let row = self.row;
        let rate = row.present("Commission_Rate").and_then(|cell| {
            let rate = cell_percent(cell).filter(|r| (0.0..=100.0).contains(r));
            if rate.is_none() {
                self.fail(
                    "Commission_Rate",
                    "Commission rate must be a percentage between 0 and 100",
                    Some(cell),
                );
            }
            rate
        });
        let amount = self.money("Commission_Amount");

        match (rate, amount) {
            (Some(_), Some(_)) => {
                let cell = row.get("Commission_Amount");
                self.fail(
                    "Commission_Amount",
                    "Give either Commission Rate or Commission Amount, not both",
                    cell,
                );
                None
            }
            (Some(rate), None) => Some(Commission::Rate(rate)),
            (None, Some(cents)) => Some(Commission::Amount(cents)),
            (None, None) => None,
        }
    }
}

/// Validate one row. Every problem in the row is reported; a row with any
/// problem yields no trip.
pub fn validate_row(row: &RawRow, row_number: usize) -> Result<ParsedTrip, Vec<ParseError>> {
    let mut check = RowCheck {
        row,
        number: row_number,
        errors: Vec::new(),
    };

    for field in REQUIRED_FIELDS {
        check.required(field);
    }

    let start = check.date("Start_Date");
    let end = check.date("End_Date");
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            let cell = row.get("End_Date");
            check.fail("End_Date", "End date cannot be before start date", cell);
        }
    }

    let adults = check.count("Adults", 0, 1);
    let children = check.count("Children", 0, 0);
    let total_travelers = if row.present("Total_Travelers").is_some() {
        check.count("Total_Travelers", 1, 1)
    } else {
        match (adults, children) {
            (Some(a), Some(c)) if a.saturating_add(c) < 1 => {
                check.fail("Total_Travelers", "Total travelers must be at least 1", None);
                None
            }
            (Some(a), Some(c)) => Some(a.saturating_add(c)),
            _ => None,
        }
    };

    let client_type = check.client_type();

    let mut costs = [0_i64; COST_FIELDS.len()];
    for (slot, field) in costs.iter_mut().zip(COST_FIELDS) {
        if let Some(cents) = check.money(field) {
            *slot = cents;
        }
    }

    let currency = check.currency();
    let commission = check.commission();

    if !check.errors.is_empty() {
        return Err(check.errors);
    }

    let (Some(start), Some(end), Some(adults), Some(children), Some(total_travelers)) =
        (start, end, adults, children, total_travelers)
    else {
        // Unreachable: each missing piece above records an error.
        return Err(vec![ParseError::new(row_number, "row", "Row could not be validated")]);
    };
    let [flight_cost, hotel_cost, ground_transport, activities_tours, meals_cost, insurance_cost, other_costs] =
        costs;

    Ok(ParsedTrip {
        source_row: row_number,
        trip_id: row.text("Trip_ID").unwrap_or_default(),
        client_name: row.text("Client_Name").unwrap_or_default(),
        travel_agency: row.text("Travel_Agency"),
        start_date: iso(start),
        end_date: iso(end),
        destination_country: row.text("Destination_Country").unwrap_or_default(),
        destination_city: row.text("Destination_City"),
        adults,
        children,
        total_travelers,
        flight_cost,
        hotel_cost,
        ground_transport,
        activities_tours,
        meals_cost,
        insurance_cost,
        other_costs,
        currency,
        commission,
        client_id: row.text("Client_ID"),
        client_type,
    })
}

// ---------------------------------------------------------------------------
// Batch assembly
// ---------------------------------------------------------------------------

/// Accumulator threaded through the row fold. `seen` maps each accepted
/// trip id to the row it was first accepted on.
#[derive(Debug, Default)]
pub struct BatchState {
    seen: HashMap<String, usize>,
    trips: Vec<ParsedTrip>,
    errors: Vec<ParseError>,
    total_rows: usize,
}

impl BatchState {
    /// Fold one validated row into the batch. First occurrence of a trip id
    /// wins; later ones are rejected.
    pub fn push(mut self, row_number: usize, outcome: Result<ParsedTrip, Vec<ParseError>>) -> Self {
        self.total_rows += 1;
        match outcome {
            Err(errors) => self.errors.extend(errors),
            Ok(trip) => match self.seen.get(&trip.trip_id) {
                Some(first_row) => {
                    self.errors.push(
                        ParseError::new(
                            row_number,
                            "Trip_ID",
                            format!(
                                "Duplicate Trip ID \"{}\" (first seen on row {first_row})",
                                trip.trip_id
                            ),
                        )
                        .with_value(trip.trip_id.clone()),
                    );
                }
                None => {
                    self.seen.insert(trip.trip_id.clone(), row_number);
                    self.trips.push(trip);
                }
            },
        }
        self
    }

    pub fn finish(self) -> ParseResult {
        let valid_rows = self.trips.len();
        ParseResult {
            success: self.errors.is_empty(),
            trips: self.trips,
            errors: self.errors,
            total_rows: self.total_rows,
            valid_rows,
        }
    }
}

/// Validate numbered rows in file order and build the batch result.
pub fn assemble(rows: impl IntoIterator<Item = (usize, RawRow)>) -> ParseResult {
    let result = rows
        .into_iter()
        .fold(BatchState::default(), |state, (number, row)| {
            let outcome = validate_row(&row, number);
            state.push(number, outcome)
        })
        .finish();
    tracing::debug!(
        total = result.total_rows,
        valid = result.valid_rows,
        errors = result.errors.len(),
        "validated import rows"
    );
    result
}
