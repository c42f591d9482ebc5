use std::collections::BTreeMap;

use super::filter::date_span;
use super::model::{DailyCountSeries, DistanceHistogram, HistogramBin, SummaryMetrics, TripTable};

// ---------------------------------------------------------------------------
// Summary metrics
// ---------------------------------------------------------------------------

/// Running sum/count that skips `NaN` cells the way a dataframe mean does.
#[derive(Default)]
struct NanSkippingSum {
    sum: f64,
    count: usize,
}

impl NanSkippingSum {
    fn push(&mut self, value: f32) {
        if !value.is_nan() {
            self.sum += f64::from(value);
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

pub fn summarize(table: &TripTable) -> SummaryMetrics {
    let mut distance = NanSkippingSum::default();
    let mut fare = NanSkippingSum::default();
    for r in &table.records {
        distance.push(r.trip_miles);
        fare.push(r.base_fare);
    }

    SummaryMetrics {
        total_trips: table.len(),
        avg_distance: distance.mean(),
        avg_fare: fare.mean(),
        total_revenue: fare.sum,
    }
}

// ---------------------------------------------------------------------------
// Daily counts
// ---------------------------------------------------------------------------

/// Trips per pickup day, with zero entries for days in the span that had none.
pub fn daily_counts(table: &TripTable) -> DailyCountSeries {
    let Some(span) = date_span(table) else {
        return DailyCountSeries::default();
    };

    let mut counts: BTreeMap<_, usize> = span.days().map(|d| (d, 0)).collect();
    for date in table.records.iter().filter_map(|r| r.pickup_date()) {
        *counts.entry(date).or_default() += 1;
    }
    DailyCountSeries { counts }
}

// ---------------------------------------------------------------------------
// Distance histogram
// ---------------------------------------------------------------------------

/// Equal-width histogram of `trip_miles` over the finite values.
pub fn distance_histogram(table: &TripTable, bins: usize) -> DistanceHistogram {
    let values: Vec<f64> = table
        .records
        .iter()
        .map(|r| f64::from(r.trip_miles))
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() || bins == 0 {
        return DistanceHistogram::default();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.abs() < f64::EPSILON {
        return DistanceHistogram {
            bins: vec![HistogramBin {
                start: min - 0.5,
                end: min + 0.5,
                count: values.len(),
            }],
        };
    }

    let width = range / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    DistanceHistogram {
        bins: counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                start: min + i as f64 * width,
                end: min + (i + 1) as f64 * width,
                count,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::TripRecord;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    fn trip(day: Option<NaiveDate>, miles: f32, fare: f32) -> TripRecord {
        TripRecord {
            pickup: day.and_then(|d| d.and_hms_opt(12, 0, 0)),
            dropoff: None,
            trip_miles: miles,
            base_fare: fare,
            dispatch_base: None,
        }
    }

    fn table(records: Vec<TripRecord>) -> TripTable {
        TripTable::new(Vec::new(), records)
    }

    #[test]
    fn summarize_means_and_totals() {
        let t = table(vec![
            trip(Some(date(1, 1)), 5.0, 10.0),
            trip(Some(date(1, 2)), 3.0, 8.0),
        ]);
        let m = summarize(&t);
        assert_eq!(m.total_trips, 2);
        assert_eq!(m.avg_distance, Some(4.0));
        assert_eq!(m.avg_fare, Some(9.0));
        assert_eq!(m.total_revenue, 18.0);
    }

    #[test]
    fn summarize_empty_table_reports_unavailable() {
        let m = summarize(&table(Vec::new()));
        assert_eq!(m.total_trips, 0);
        assert_eq!(m.avg_distance, None);
        assert_eq!(m.avg_fare, None);
        assert_eq!(m.total_revenue, 0.0);
    }

    #[test]
    fn summarize_skips_nan_cells() {
        let t = table(vec![
            trip(Some(date(1, 1)), f32::NAN, 10.0),
            trip(Some(date(1, 1)), 2.0, f32::NAN),
        ]);
        let m = summarize(&t);
        assert_eq!(m.total_trips, 2);
        assert_eq!(m.avg_distance, Some(2.0));
        assert_eq!(m.avg_fare, Some(10.0));
        assert_eq!(m.total_revenue, 10.0);
    }

    #[test]
    fn daily_counts_are_dense() {
        let t = table(vec![
            trip(Some(date(1, 5)), 1.0, 4.0),
            trip(Some(date(1, 1)), 5.0, 10.0),
            trip(Some(date(1, 2)), 3.0, 8.0),
        ]);
        let series = daily_counts(&t);
        let got: Vec<(NaiveDate, usize)> = series.counts.into_iter().collect();
        assert_eq!(
            got,
            vec![
                (date(1, 1), 1),
                (date(1, 2), 1),
                (date(1, 3), 0),
                (date(1, 4), 0),
                (date(1, 5), 1),
            ]
        );
    }

    #[test]
    fn daily_counts_sum_to_row_count() {
        let mut records = Vec::new();
        for (i, day) in [3, 3, 9, 14, 14, 14, 28].into_iter().enumerate() {
            records.push(trip(Some(date(2, day)), i as f32, 1.0));
        }
        let t = table(records);
        let series = daily_counts(&t);
        assert_eq!(series.counts.values().sum::<usize>(), t.len());
        assert_eq!(series.counts.len(), 26);
        assert_eq!(series.counts[&date(2, 14)], 3);
    }

    #[test]
    fn daily_counts_of_empty_table_is_empty() {
        assert!(daily_counts(&table(Vec::new())).counts.is_empty());
        assert!(daily_counts(&table(vec![trip(None, 1.0, 1.0)])).counts.is_empty());
    }

    #[test]
    fn histogram_covers_all_finite_values() {
        let t = table(
            [0.0, 1.0, 2.5, 5.0, 10.0, f32::NAN]
                .into_iter()
                .map(|m| trip(Some(date(1, 1)), m, 1.0))
                .collect(),
        );
        let h = distance_histogram(&t, 4);
        assert_eq!(h.bins.len(), 4);
        assert_eq!(h.bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_eq!(h.bins[0].start, 0.0);
        assert_eq!(h.bins[3].end, 10.0);
        assert_eq!(h.bins[3].count, 1, "max lands in the closed last bin");
        assert_eq!(h.bins[0].width(), 2.5);
    }

    #[test]
    fn histogram_of_constant_values_is_one_bin() {
        let t = table(vec![trip(None, 2.0, 1.0), trip(None, 2.0, 1.0)]);
        let h = distance_histogram(&t, 50);
        assert_eq!(h.bins.len(), 1);
        assert_eq!(h.bins[0].count, 2);
        assert_eq!(h.bins[0].center(), 2.0);
        assert!(distance_histogram(&table(Vec::new()), 50).bins.is_empty());
    }
}
