use std::path::PathBuf;
use std::sync::Arc;

use crate::data::model::{DailyCountSeries, DateInterval, DistanceHistogram, SummaryMetrics};

pub const NO_DATA_NOTICE: &str = "No data available for the selected filters.";
const UNAVAILABLE: &str = "n/a";

// ---------------------------------------------------------------------------
// Metric cards
// ---------------------------------------------------------------------------

/// The four headline numbers, already formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCards {
    pub total_trips: String,
    pub avg_distance: String,
    pub avg_fare: String,
    pub total_revenue: String,
}

impl From<&SummaryMetrics> for MetricCards {
    fn from(m: &SummaryMetrics) -> Self {
        MetricCards {
            total_trips: group_thousands(&m.total_trips.to_string()),
            avg_distance: m
                .avg_distance
                .map_or_else(|| UNAVAILABLE.to_string(), |d| format!("{d:.2} miles")),
            avg_fare: m.avg_fare.map_or_else(|| UNAVAILABLE.to_string(), dollars),
            total_revenue: dollars(m.total_revenue),
        }
    }
}

impl MetricCards {
    /// `(label, value)` pairs in display order.
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("Total Trips", self.total_trips.as_str()),
            ("Avg Distance", self.avg_distance.as_str()),
            ("Avg Fare", self.avg_fare.as_str()),
            ("Total Revenue", self.total_revenue.as_str()),
        ]
    }
}

/// `$1,234.50`; negative amounts keep their sign in front.
fn dollars(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${}.{frac_part}", group_thousands(int_part))
}

/// Insert `,` every three digits of a plain digit string.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ---------------------------------------------------------------------------
// Dashboard view
// ---------------------------------------------------------------------------

/// Chart inputs; absent when the filtered table is empty.
#[derive(Debug, Clone)]
pub struct Charts {
    pub histogram: Arc<DistanceHistogram>,
    pub daily: Arc<DailyCountSeries>,
}

/// Everything the rendering layer needs for one pass.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub source: PathBuf,
    pub loaded_rows: usize,
    pub visible_rows: usize,
    /// Pickup-date bounds of the loaded table.
    pub span: Option<DateInterval>,
    /// The interval actually applied, after clamping.
    pub interval: Option<DateInterval>,
    pub metrics: MetricCards,
    pub charts: Option<Charts>,
}

impl DashboardView {
    pub fn notice(&self) -> Option<&'static str> {
        self.charts.is_none().then_some(NO_DATA_NOTICE)
    }
}
