use serde::Serialize;

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone)]
pub struct Agency {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Individual,
    Corporate,
    Group,
}

impl ClientType {
    pub const ALL: [ClientType; 3] = [Self::Individual, Self::Corporate, Self::Group];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Corporate => "corporate",
            Self::Group => "group",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
    }
}

/// The agency's earnings on a trip: a percentage of trip cost or a flat fee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Commission {
    #[serde(rename = "commission_rate")]
    Rate(f64),
    #[serde(rename = "commission_amount")]
    Amount(i64),
}

impl Commission {
    pub fn cents_on(&self, total_cost: i64) -> i64 {
        match *self {
            Self::Rate(rate) => (total_cost as f64 * rate / 100.0).round() as i64,
            Self::Amount(cents) => cents,
        }
    }

    pub fn rate(&self) -> Option<f64> {
        match *self {
            Self::Rate(rate) => Some(rate),
            Self::Amount(_) => None,
        }
    }

    pub fn amount(&self) -> Option<i64> {
        match *self {
            Self::Rate(_) => None,
            Self::Amount(cents) => Some(cents),
        }
    }
}

/// One validated, normalized trip. Money fields are in cents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTrip {
    /// Row in the source file; used to point persistence failures back at it.
    #[serde(skip)]
    pub source_row: usize,
    pub trip_id: String,
    pub client_name: String,
    pub travel_agency: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub destination_country: String,
    pub destination_city: Option<String>,
    pub adults: u32,
    pub children: u32,
    pub total_travelers: u32,
    pub flight_cost: i64,
    pub hotel_cost: i64,
    pub ground_transport: i64,
    pub activities_tours: i64,
    pub meals_cost: i64,
    pub insurance_cost: i64,
    pub other_costs: i64,
    pub currency: String,
    #[serde(flatten)]
    pub commission: Option<Commission>,
    pub client_id: Option<String>,
    pub client_type: Option<ClientType>,
}

impl ParsedTrip {
    pub fn total_cost(&self) -> i64 {
        [
            self.flight_cost,
            self.hotel_cost,
            self.ground_transport,
            self.activities_tours,
            self.meals_cost,
            self.insurance_cost,
            self.other_costs,
        ]
        .into_iter()
        .fold(0_i64, i64::saturating_add)
    }

    pub fn commission_cents(&self) -> i64 {
        self.commission
            .map(|c| c.cents_on(self.total_cost()))
            .unwrap_or(0)
    }
}

/// A single validation failure. Row 0 with field "file" means the whole
/// file was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    pub row: usize,
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ParseError {
    pub fn new(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn file(message: impl Into<String>) -> Self {
        Self::new(0, "file", message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub success: bool,
    pub trips: Vec<ParsedTrip>,
    pub errors: Vec<ParseError>,
    #[serde(rename = "totalRows")]
    pub total_rows: usize,
    #[serde(rename = "validRows")]
    pub valid_rows: usize,
}

impl ParseResult {
    /// Whole-file rejection: no trips and exactly one error.
    pub fn file_error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            trips: Vec::new(),
            errors: vec![ParseError::file(message)],
            total_rows: 0,
            valid_rows: 0,
        }
    }
}
