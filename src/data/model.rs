use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const PICKUP_COLUMN: &str = "pickup_datetime";
pub const DROPOFF_COLUMN: &str = "dropoff_datetime";
pub const DISTANCE_COLUMN: &str = "trip_miles";
pub const FARE_COLUMN: &str = "base_passenger_fare";
pub const DISPATCH_COLUMN: &str = "dispatching_base_num";

/// Every column the loader reads; anything else in the file is skipped.
pub const TRIP_COLUMNS: [&str; 5] = [
    PICKUP_COLUMN,
    DROPOFF_COLUMN,
    DISTANCE_COLUMN,
    FARE_COLUMN,
    DISPATCH_COLUMN,
];

/// Columns the dashboard cannot run without.
pub const REQUIRED_COLUMNS: [&str; 4] = [PICKUP_COLUMN, DROPOFF_COLUMN, DISTANCE_COLUMN, FARE_COLUMN];

// ---------------------------------------------------------------------------
// TripRecord – one row of the source file
// ---------------------------------------------------------------------------

/// A single trip.  Numeric cells are narrowed to `f32`; nulls become `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub pickup: Option<NaiveDateTime>,
    pub dropoff: Option<NaiveDateTime>,
    pub trip_miles: f32,
    pub base_fare: f32,
    /// Interned: a handful of dispatch bases repeat across millions of rows.
    pub dispatch_base: Option<Arc<str>>,
}

impl TripRecord {
    pub fn pickup_date(&self) -> Option<NaiveDate> {
        self.pickup.map(|ts| ts.date())
    }
}

// ---------------------------------------------------------------------------
// TripTable – the complete loaded (or filtered) dataset
// ---------------------------------------------------------------------------

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a table instance, used as a cache key for derived results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u64);

impl TableId {
    fn next() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trip records in file order plus the columns the source file offered.
/// Never mutated after construction; derived tables get a fresh [`TableId`].
#[derive(Debug)]
pub struct TripTable {
    id: TableId,
    /// Every column name found in the source, in file order.
    pub source_columns: Vec<String>,
    pub records: Vec<TripRecord>,
}

impl TripTable {
    pub fn new(source_columns: Vec<String>, records: Vec<TripRecord>) -> Self {
        TripTable {
            id: TableId::next(),
            source_columns,
            records,
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    /// Number of trips.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.source_columns.iter().any(|c| c == name)
    }

    /// Required columns the source did not provide, in canonical order.
    pub fn missing_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// DateInterval
// ---------------------------------------------------------------------------

/// Inclusive calendar-date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    /// Bounds given in reverse order are swapped.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            DateInterval { start: a, end: b }
        } else {
            DateInterval { start: b, end: a }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Pull both ends inside `bounds`.
    pub fn clamp_to(&self, bounds: &DateInterval) -> DateInterval {
        DateInterval {
            start: self.start.clamp(bounds.start, bounds.end),
            end: self.end.clamp(bounds.start, bounds.end),
        }
    }

    /// Calendar days covered, both ends included.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} – {}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Trip count per calendar day, dense over the table's date span.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyCountSeries {
    pub counts: BTreeMap<NaiveDate, usize>,
}

/// Scalar metrics for the metric cards.  Averages are `None` when there is
/// nothing to average.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryMetrics {
    pub total_trips: usize,
    pub avg_distance: Option<f64>,
    pub avg_fare: Option<f64>,
    pub total_revenue: f64,
}

/// One equal-width histogram bucket `[start, end)`; the last bucket is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceHistogram {
    pub bins: Vec<HistogramBin>,
}
