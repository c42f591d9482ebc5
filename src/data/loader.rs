use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::timezone::Tz;
use arrow::array::{Array, ArrayRef, AsArray, Float32Array, StringArray, TimestampMicrosecondArray};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::{DataType, Float32Type, TimeUnit, TimestampMicrosecondType};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{
    DISPATCH_COLUMN, DISTANCE_COLUMN, DROPOFF_COLUMN, FARE_COLUMN, PICKUP_COLUMN, TRIP_COLUMNS,
    TripRecord, TripTable,
};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a trip table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – columnar file with the trip columns (recommended)
/// * `.csv`     – same columns as text, timestamps as `YYYY-MM-DD HH:MM:SS`
///
/// Only the trip columns are read.  A column missing from the file is not an
/// error here; it is reported by [`TripTable::missing_columns`].
pub fn load_file(path: &Path) -> Result<TripTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Hands out one shared `Arc<str>` per distinct dispatch base.
#[derive(Default)]
struct Interner {
    seen: HashMap<String, Arc<str>>,
}

impl Interner {
    fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(shared) = self.seen.get(s) {
            return shared.clone();
        }
        let shared: Arc<str> = Arc::from(s);
        self.seen.insert(s.to_string(), shared.clone());
        shared
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of trip records.
///
/// Expected schema (extra columns are pruned via a projection mask):
/// - `pickup_datetime`, `dropoff_datetime`: Timestamp (any unit / tz), Date,
///   or timestamp-parseable Utf8
/// - `trip_miles`, `base_passenger_fare`: any numeric type, narrowed to f32
/// - `dispatching_base_num`: Utf8
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<TripTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let source_columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let wanted: Vec<usize> = source_columns
        .iter()
        .enumerate()
        .filter(|(_, name)| TRIP_COLUMNS.contains(&name.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mask = ProjectionMask::roots(builder.parquet_schema(), wanted);
    let reader = builder
        .with_projection(mask)
        .build()
        .context("building parquet reader")?;

    let mut records = Vec::new();
    let mut interner = Interner::default();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        append_batch(&batch, &mut records, &mut interner)?;
    }

    log::debug!(
        "Read {} trips from {} (columns {:?})",
        records.len(),
        path.display(),
        source_columns
    );
    Ok(TripTable::new(source_columns, records))
}

// -- Parquet / Arrow helpers --

fn append_batch(
    batch: &RecordBatch,
    records: &mut Vec<TripRecord>,
    interner: &mut Interner,
) -> Result<()> {
    let pickup = timestamp_column(batch, PICKUP_COLUMN)?;
    let dropoff = timestamp_column(batch, DROPOFF_COLUMN)?;
    let miles = f32_column(batch, DISTANCE_COLUMN)?;
    let fare = f32_column(batch, FARE_COLUMN)?;
    let dispatch = string_column(batch, DISPATCH_COLUMN)?;

    records.reserve(batch.num_rows());
    for row in 0..batch.num_rows() {
        records.push(TripRecord {
            pickup: pickup.as_ref().and_then(|c| c.at(row)),
            dropoff: dropoff.as_ref().and_then(|c| c.at(row)),
            trip_miles: miles.as_ref().map_or(f32::NAN, |a| f32_at(a, row)),
            base_fare: fare.as_ref().map_or(f32::NAN, |a| f32_at(a, row)),
            dispatch_base: dispatch
                .as_ref()
                .filter(|a| a.is_valid(row))
                .map(|a| interner.intern(a.value(row))),
        });
    }
    Ok(())
}

/// A `Timestamp(µs)` column plus the zone its instants are shown in.
struct TimestampColumn {
    values: TimestampMicrosecondArray,
    tz: Option<Tz>,
}

impl TimestampColumn {
    /// Wall-clock time: local to the column's zone if it has one, else as stored.
    fn at(&self, row: usize) -> Option<NaiveDateTime> {
        if self.values.is_null(row) {
            return None;
        }
        match self.tz {
            Some(tz) => self
                .values
                .value_as_datetime_with_tz(row, tz)
                .map(|dt| dt.naive_local()),
            None => DateTime::from_timestamp_micros(self.values.value(row)).map(|dt| dt.naive_utc()),
        }
    }
}

/// Cast a column to `Timestamp(µs)`, keeping its zone.  Strings are parsed by
/// the cast kernel.
fn timestamp_column(batch: &RecordBatch, name: &str) -> Result<Option<TimestampColumn>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let zone = match col.data_type() {
        DataType::Timestamp(_, zone) => zone.clone(),
        _ => None,
    };
    let tz = zone
        .as_deref()
        .map(|z| z.parse::<Tz>())
        .transpose()
        .with_context(|| format!("column '{name}' has an unknown time zone"))?;

    let casted = cast_column(col, &DataType::Timestamp(TimeUnit::Microsecond, zone), name)?;
    Ok(Some(TimestampColumn {
        values: casted.as_primitive::<TimestampMicrosecondType>().clone(),
        tz,
    }))
}

fn f32_column(batch: &RecordBatch, name: &str) -> Result<Option<Float32Array>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let casted = cast_column(col, &DataType::Float32, name)?;
    Ok(Some(casted.as_primitive::<Float32Type>().clone()))
}

fn string_column(batch: &RecordBatch, name: &str) -> Result<Option<StringArray>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let casted = cast_column(col, &DataType::Utf8, name)?;
    Ok(Some(casted.as_string::<i32>().clone()))
}

/// Unsafe-mode cast: a value that cannot be converted fails the whole load
/// instead of silently becoming null.
fn cast_column(col: &ArrayRef, to: &DataType, name: &str) -> Result<ArrayRef> {
    if col.data_type() == to {
        return Ok(col.clone());
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    cast_with_options(col, to, &options).with_context(|| {
        format!("column '{name}' of type {:?} cannot be read as {to:?}", col.data_type())
    })
}

fn f32_at(arr: &Float32Array, row: usize) -> f32 {
    if arr.is_null(row) {
        f32::NAN
    } else {
        arr.value(row)
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one trip per row.
/// Empty cells are nulls.
fn load_csv(path: &Path) -> Result<TripTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let source_columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let index_of = |name: &str| source_columns.iter().position(|h| h == name);

    let pickup_idx = index_of(PICKUP_COLUMN);
    let dropoff_idx = index_of(DROPOFF_COLUMN);
    let miles_idx = index_of(DISTANCE_COLUMN);
    let fare_idx = index_of(FARE_COLUMN);
    let dispatch_idx = index_of(DISPATCH_COLUMN);

    let mut records = Vec::new();
    let mut interner = Interner::default();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::trim).filter(|s| !s.is_empty());

        let pickup = cell(pickup_idx)
            .map(|s| parse_timestamp(s).with_context(|| format!("CSV row {row_no}, {PICKUP_COLUMN}")))
            .transpose()?;
        let dropoff = cell(dropoff_idx)
            .map(|s| parse_timestamp(s).with_context(|| format!("CSV row {row_no}, {DROPOFF_COLUMN}")))
            .transpose()?;
        let trip_miles = parse_f32(cell(miles_idx), row_no, DISTANCE_COLUMN)?;
        let base_fare = parse_f32(cell(fare_idx), row_no, FARE_COLUMN)?;

        records.push(TripRecord {
            pickup,
            dropoff,
            trip_miles,
            base_fare,
            dispatch_base: cell(dispatch_idx).map(|s| interner.intern(s)),
        });
    }

    Ok(TripTable::new(source_columns, records))
}

fn parse_f32(cell: Option<&str>, row: usize, col: &str) -> Result<f32> {
    match cell {
        None => Ok(f32::NAN),
        Some(s) => s
            .parse::<f32>()
            .with_context(|| format!("Row {row}, {col}: '{s}' is not a number")),
    }
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse the timestamp spellings pandas writes and reads back by default.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight);
    }
    bail!("'{s}' is not a timestamp")
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use arrow::array::{Float64Array, Int64Array};
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn col(name: &str, arr: impl Array + 'static) -> (&str, ArrayRef) {
        let arr: ArrayRef = Arc::new(arr);
        (name, arr)
    }

    fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) {
        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|(name, arr)| Field::new(*name, arr.data_type().clone(), true))
                .collect::<Vec<_>>(),
        ));
        let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, a)| a).collect();
        let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();
        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn micros(s: &str) -> i64 {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
            .timestamp_micros()
    }

    #[test]
    fn parquet_reads_trip_columns_and_narrows_floats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.parquet");
        write_parquet(
            &path,
            vec![
                col(
                    PICKUP_COLUMN,
                    TimestampMicrosecondArray::from(vec![Some(micros("2023-01-01 08:30:00")), None]),
                ),
                col(
                    DROPOFF_COLUMN,
                    TimestampMicrosecondArray::from(vec![
                        Some(micros("2023-01-01 08:45:00")),
                        Some(micros("2023-01-02 00:10:00")),
                    ]),
                ),
                col(DISTANCE_COLUMN, Float64Array::from(vec![Some(5.25), None])),
                col(FARE_COLUMN, Float64Array::from(vec![10.5, 8.0])),
                col(DISPATCH_COLUMN, StringArray::from(vec!["B03404", "B03404"])),
                col("shared_request_flag", Int64Array::from(vec![0, 1])),
            ],
        );

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.missing_columns().is_empty());
        assert!(table.has_column("shared_request_flag"));

        let first = &table.records[0];
        assert_eq!(first.pickup.unwrap().to_string(), "2023-01-01 08:30:00");
        assert_eq!(first.trip_miles, 5.25_f32);
        assert_eq!(first.base_fare, 10.5_f32);

        let second = &table.records[1];
        assert!(second.pickup.is_none());
        assert!(second.trip_miles.is_nan());
        assert!(Arc::ptr_eq(
            first.dispatch_base.as_ref().unwrap(),
            second.dispatch_base.as_ref().unwrap()
        ));
    }

    #[test]
    fn zoned_timestamps_use_local_wall_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.parquet");
        let pickups = TimestampMicrosecondArray::from(vec![micros("2023-01-02 03:30:00")])
            .with_timezone("America/New_York");
        write_parquet(
            &path,
            vec![
                col(PICKUP_COLUMN, pickups),
                col(DISTANCE_COLUMN, Float64Array::from(vec![2.0])),
            ],
        );

        let table = load_file(&path).unwrap();
        let pickup = table.records[0].pickup.unwrap();
        assert_eq!(pickup.to_string(), "2023-01-01 22:30:00");
        assert_eq!(
            table.records[0].pickup_date(),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
    }

    #[test]
    fn parquet_accepts_string_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.parquet");
        write_parquet(
            &path,
            vec![
                col(PICKUP_COLUMN, StringArray::from(vec!["2023-01-05T23:59:00"])),
                col(DISTANCE_COLUMN, Float64Array::from(vec![1.0])),
            ],
        );

        let table = load_file(&path).unwrap();
        assert_eq!(
            table.records[0].pickup_date(),
            NaiveDate::from_ymd_opt(2023, 1, 5)
        );
        assert_eq!(table.missing_columns(), vec![DROPOFF_COLUMN, FARE_COLUMN]);
        assert!(table.records[0].base_fare.is_nan());
    }

    #[test]
    fn csv_loader_reads_same_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv");
        std::fs::write(
            &path,
            "pickup_datetime,dropoff_datetime,trip_miles,base_passenger_fare,dispatching_base_num\n\
             2023-01-01 08:00:00,2023-01-01 08:20:00,5.0,10.0,B03404\n\
             2023-01-02,,3.0,,B02510\n",
        )
        .unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[1].pickup.unwrap().to_string(), "2023-01-02 00:00:00");
        assert!(table.records[1].dropoff.is_none());
        assert!(table.records[1].base_fare.is_nan());
        assert_eq!(table.records[1].dispatch_base.as_deref(), Some("B02510"));
    }

    #[test]
    fn csv_with_bad_timestamp_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv");
        std::fs::write(&path, "pickup_datetime,trip_miles\nyesterday,1.0\n").unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("not a timestamp"));
    }

    #[test]
    fn corrupt_or_unknown_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("trips.parquet");
        std::fs::write(&junk, b"definitely not parquet").unwrap();
        assert!(load_file(&junk).is_err());

        assert!(load_file(&dir.path().join("trips.xlsx")).is_err());
        assert!(load_file(&dir.path().join("absent.parquet")).is_err());
    }

    #[test]
    fn timestamp_spellings() {
        for s in [
            "2023-01-01 08:00:00",
            "2023-01-01 08:00:00.250",
            "2023-01-01T08:00:00",
            "2023-01-01 08:00",
            "2023-01-01T08:00:00Z",
        ] {
            let ts = parse_timestamp(s).unwrap();
            assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), "{s}");
        }
        assert!(parse_timestamp("soon").is_err());
    }
}
