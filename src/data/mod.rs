/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .parquet / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  project trip columns → TripTable
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ TripTable │  Vec<TripRecord>, source columns, identity
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  inclusive pickup-date range → new TripTable
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  summary metrics, daily counts, distance histogram
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
