use std::sync::Arc;

use arrow::array::{Float64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    /// Exponential distribution via inverse transform
    fn exponential(&mut self, mean: f64) -> f64 {
        -mean * (1.0 - self.next_f64()).max(1e-15).ln()
    }
}

const DISPATCH_BASES: [&str; 4] = ["B03404", "B02510", "B02764", "B02872"];
/// Days with no service, to show zero-filled gaps in the daily series.
const OUTAGE_DAYS: [u32; 2] = [15, 16];

fn main() {
    let mut rng = SimpleRng::new(42);
    let first_day = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date");

    let mut pickups: Vec<i64> = Vec::new();
    let mut dropoffs: Vec<i64> = Vec::new();
    let mut miles: Vec<Option<f64>> = Vec::new();
    let mut fares: Vec<f64> = Vec::new();
    let mut bases: Vec<&str> = Vec::new();
    let mut shared: Vec<&str> = Vec::new();

    for day in 0..31u32 {
        if OUTAGE_DAYS.contains(&(day + 1)) {
            continue;
        }
        let date = first_day + Duration::days(i64::from(day));
        // Weekends are busier.
        let trips = if date.weekday().number_from_monday() >= 6 { 900 } else { 600 };

        for _ in 0..trips {
            let pickup = date
                .and_hms_opt(0, 0, 0)
                .expect("midnight exists")
                + Duration::seconds(rng.below(86_400) as i64);
            let distance = 0.3 + rng.exponential(4.5);
            let minutes = 4.0 + distance * 3.2 + rng.exponential(5.0);
            let dropoff = pickup + Duration::seconds((minutes * 60.0) as i64);
            let fare = 2.55 + distance * 1.75 + minutes * 0.55;

            pickups.push(pickup.and_utc().timestamp_micros());
            dropoffs.push(dropoff.and_utc().timestamp_micros());
            // A sprinkle of missing distances, as in the real feed.
            miles.push((rng.below(200) != 0).then_some((distance * 100.0).round() / 100.0));
            fares.push((fare * 100.0).round() / 100.0);
            bases.push(DISPATCH_BASES[rng.below(DISPATCH_BASES.len() as u64) as usize]);
            shared.push(if rng.below(10) == 0 { "Y" } else { "N" });
        }
    }

    let n_trips = pickups.len();
    let timestamp = DataType::Timestamp(TimeUnit::Microsecond, None);
    let schema = Arc::new(Schema::new(vec![
        Field::new("dispatching_base_num", DataType::Utf8, false),
        Field::new("pickup_datetime", timestamp.clone(), false),
        Field::new("dropoff_datetime", timestamp, false),
        Field::new("trip_miles", DataType::Float64, true),
        Field::new("base_passenger_fare", DataType::Float64, false),
        Field::new("shared_request_flag", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(bases)),
            Arc::new(TimestampMicrosecondArray::from(pickups)),
            Arc::new(TimestampMicrosecondArray::from(dropoffs)),
            Arc::new(Float64Array::from(miles)),
            Arc::new(Float64Array::from(fares)),
            Arc::new(StringArray::from(shared)),
        ],
    )
    .expect("Failed to create RecordBatch");

    // Write Parquet
    std::fs::create_dir_all("data").expect("Failed to create data directory");
    let output_path = "data/Uber_cleaned_data.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!("Wrote {n_trips} trips for January 2023 to {output_path}");
}
