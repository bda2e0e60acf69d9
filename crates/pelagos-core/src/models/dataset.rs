use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub code: String,
    pub name: String,
}

/// One direct sailing, as returned by the schedule lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartureOption {
    pub company: String,
    pub origin_port: String,
    pub destination_port: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration_minutes: i64,
}

/// A two-leg journey through one intermediate port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOption {
    pub via_port: String,
    pub first: DepartureOption,
    pub second: DepartureOption,
    pub transfer_minutes: i64,
    pub total_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOption {
    pub origin_port: String,
    pub destination_port: String,
    pub company: String,
    pub vessel: Option<String>,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccommodationPrice {
    pub code: String,
    pub name: String,
    pub price_cents: i64,
}

/// Per-vessel fare detail for one route: base fare plus cabin/seat options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteFareBreakdown {
    pub company: String,
    pub vessel: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub base_price_cents: i64,
    pub accommodations: Vec<AccommodationPrice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRange {
    pub origin_code: String,
    pub origin_name: String,
    pub destination_code: String,
    pub destination_name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub appear_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandSuggestion {
    pub island: String,
    pub group: String,
    pub connections: i64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DatasetCounts {
    pub companies: usize,
    pub ports: usize,
    pub vessels: usize,
    pub routes: usize,
    pub schedules: usize,
    pub accommodations: usize,
    pub historical_ranges: usize,
    pub users: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub companies: usize,
    pub ports: usize,
    pub vessels: usize,
    pub routes: usize,
    pub schedules: usize,
    pub accommodations: usize,
    pub skipped_schedules: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRunRecord {
    pub id: i64,
    pub source: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub detail: Option<String>,
    pub routes: usize,
    pub schedules: usize,
}

/// Ordering requested for a schedule lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePreference {
    Earliest,
    Latest,
    Shortest,
}

impl SchedulePreference {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
            Self::Shortest => "shortest",
        }
    }
}
