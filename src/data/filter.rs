use super::model::{DateInterval, TripTable};

// ---------------------------------------------------------------------------
// Date-range filter
// ---------------------------------------------------------------------------

/// Earliest and latest pickup dates, or `None` when no row has a pickup.
pub fn date_span(table: &TripTable) -> Option<DateInterval> {
    let mut dates = table.records.iter().filter_map(|r| r.pickup_date());
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateInterval::new(min, max))
}

/// Return a new table with the trips whose pickup date lies in `interval`.
///
/// * Both ends are inclusive.
/// * Rows without a pickup timestamp never match.
/// * Row order is preserved and the input is left untouched.
pub fn filter_by_date(table: &TripTable, interval: DateInterval) -> TripTable {
    let records = table
        .records
        .iter()
        .filter(|r| r.pickup_date().is_some_and(|d| interval.contains(d)))
        .cloned()
        .collect();
    TripTable::new(table.source_columns.clone(), records)
}
