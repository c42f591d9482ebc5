use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::{AuthState, PasswordGate};
use crate::config::DashboardConfig;
use crate::data::filter::date_span;
use crate::data::model::{DateInterval, SummaryMetrics, TripTable};
use crate::error::DashboardError;
use crate::pipeline::{FileSource, Pipeline, TripSource};
use crate::view::{Charts, DashboardView, MetricCards};

// ---------------------------------------------------------------------------
// Dashboard controller
// ---------------------------------------------------------------------------

/// Gate → load → validate → filter → aggregate → view.
///
/// The controller is per session; the pipeline (and its caches) may be shared
/// between sessions.
pub struct DashboardController<S = FileSource> {
    data_path: PathBuf,
    histogram_bins: usize,
    gate: PasswordGate,
    pipeline: Arc<Pipeline<S>>,
}

impl DashboardController<FileSource> {
    pub fn from_config(config: &DashboardConfig) -> Self {
        let pipeline = Arc::new(Pipeline::new(FileSource, config.cache_ttl));
        Self::new(config, pipeline)
    }
}

impl<S: TripSource> DashboardController<S> {
    pub fn new(config: &DashboardConfig, pipeline: Arc<Pipeline<S>>) -> Self {
        Self {
            data_path: config.data_path.clone(),
            histogram_bins: config.histogram_bins,
            gate: PasswordGate::new(config.password.clone()),
            pipeline,
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.gate.state()
    }

    /// Called on each render before the dashboard is unlocked.
    pub fn prompt(&mut self) -> Result<AuthState, DashboardError> {
        self.gate.prompt()
    }

    pub fn submit_password(&mut self, credential: String) -> Result<(), DashboardError> {
        self.gate.submit(credential)
    }

    /// Load the configured file, or the uploaded one when the configured file
    /// is missing or unreadable.
    pub fn load_source(
        &self,
        upload: Option<&Path>,
    ) -> Result<(PathBuf, Arc<TripTable>), DashboardError> {
        match (self.pipeline.load(&self.data_path), upload) {
            (Ok(table), _) => Ok((self.data_path.clone(), table)),
            (Err(err @ DashboardError::DataUnavailable { .. }), Some(upload)) => {
                log::warn!("{err}; using uploaded {}", upload.display());
                let table = self.pipeline.load(upload)?;
                Ok((upload.to_path_buf(), table))
            }
            (Err(err), _) => Err(err),
        }
    }

    /// One render pass.  `requested` defaults to the full date span and is
    /// clamped into it.
    pub fn run(
        &self,
        upload: Option<&Path>,
        requested: Option<DateInterval>,
    ) -> Result<DashboardView, DashboardError> {
        if !self.gate.is_authorized() {
            return Err(DashboardError::Locked);
        }

        let (source, table) = self.load_source(upload)?;
        validate_schema(&table)?;

        let Some(span) = date_span(&table) else {
            log::warn!("{} has no pickup timestamps", source.display());
            return Ok(DashboardView {
                source,
                loaded_rows: table.len(),
                visible_rows: 0,
                span: None,
                interval: None,
                metrics: MetricCards::from(&SummaryMetrics::default()),
                charts: None,
            });
        };

        let interval = requested.map_or(span, |r| r.clamp_to(&span));
        let filtered = self.pipeline.filter(&table, interval);
        let summary = self.pipeline.summarize(&filtered);

        let charts = (!filtered.is_empty()).then(|| Charts {
            histogram: self.pipeline.histogram(&filtered, self.histogram_bins),
            daily: self.pipeline.daily_counts(&filtered),
        });

        log::debug!(
            "Rendered {} of {} trips for {interval}",
            filtered.len(),
            table.len()
        );

        Ok(DashboardView {
            source,
            loaded_rows: table.len(),
            visible_rows: filtered.len(),
            span: Some(span),
            interval: Some(interval),
            metrics: MetricCards::from(&*summary),
            charts,
        })
    }
}

/// Halt when any required column is missing from the source.
fn validate_schema(table: &TripTable) -> Result<(), DashboardError> {
    let missing = table.missing_columns();
    if missing.is_empty() {
        return Ok(());
    }
    Err(DashboardError::SchemaInvalid {
        missing,
        available: table.source_columns.clone(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::TripRecord;
    use crate::pipeline::tests::{CountingSource, three_trips, trip};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        source: Arc<CountingSource>,
        controller: DashboardController<Arc<CountingSource>>,
    }

    fn fixture(rows: Vec<TripRecord>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("trips.parquet");
        std::fs::write(&data_path, b"").unwrap();

        let config = DashboardConfig {
            data_path,
            password: Some("letmein".to_string()),
            ..DashboardConfig::default()
        };
        let source = Arc::new(CountingSource::new(rows));
        let pipeline = Arc::new(Pipeline::new(source.clone(), config.cache_ttl));
        Fixture {
            _dir: dir,
            source,
            controller: DashboardController::new(&config, pipeline),
        }
    }

    fn unlocked(rows: Vec<TripRecord>) -> Fixture {
        let mut fx = fixture(rows);
        fx.controller.prompt().unwrap();
        fx.controller.submit_password("letmein".to_string()).unwrap();
        fx
    }

    #[test]
    fn locked_until_authorized() {
        let mut fx = fixture(three_trips());
        assert!(matches!(fx.controller.run(None, None), Err(DashboardError::Locked)));
        assert_eq!(fx.source.reads(), 0);

        fx.controller.prompt().unwrap();
        assert!(fx.controller.submit_password("wrong".to_string()).is_err());
        assert_eq!(
            fx.controller.auth_state(),
            AuthState::Authenticating {
                last_attempt_failed: true
            }
        );
        fx.controller.submit_password("letmein".to_string()).unwrap();
        assert_eq!(fx.controller.auth_state(), AuthState::Authorized);
        assert!(fx.controller.run(None, None).is_ok());
    }

    #[test]
    fn end_to_end_two_of_three_trips() {
        let fx = unlocked(three_trips());
        let view = fx
            .controller
            .run(None, Some(DateInterval::new(date(1), date(2))))
            .unwrap();

        assert_eq!(view.loaded_rows, 3);
        assert_eq!(view.visible_rows, 2);
        assert_eq!(view.span, Some(DateInterval::new(date(1), date(5))));
        assert_eq!(view.metrics.total_trips, "2");
        assert_eq!(view.metrics.avg_distance, "4.00 miles");
        assert_eq!(view.metrics.avg_fare, "$9.00");
        assert_eq!(view.metrics.total_revenue, "$18.00");
        assert!(view.notice().is_none());
    }

    #[test]
    fn full_span_daily_counts_are_dense() {
        let fx = unlocked(three_trips());
        let view = fx.controller.run(None, None).unwrap();

        let charts = view.charts.unwrap();
        let counts: Vec<usize> = charts.daily.counts.values().copied().collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 1]);
        assert_eq!(charts.daily.counts.keys().next(), Some(&date(1)));
        assert_eq!(charts.histogram.bins.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn requested_interval_is_clamped_to_span() {
        let fx = unlocked(three_trips());
        let view = fx
            .controller
            .run(
                None,
                Some(DateInterval::new(
                    NaiveDate::from_ymd_opt(2022, 12, 1).unwrap(),
                    date(31),
                )),
            )
            .unwrap();
        assert_eq!(view.interval, Some(DateInterval::new(date(1), date(5))));
        assert_eq!(view.visible_rows, 3);
    }

    #[test]
    fn empty_selection_shows_notice_without_charts() {
        let fx = unlocked(three_trips());
        let view = fx
            .controller
            .run(None, Some(DateInterval::new(date(3), date(4))))
            .unwrap();

        assert_eq!(view.visible_rows, 0);
        assert!(view.charts.is_none());
        assert!(view.notice().is_some());
        assert_eq!(view.metrics.avg_distance, "n/a");
        assert_eq!(view.metrics.total_revenue, "$0.00");
    }

    #[test]
    fn repeated_runs_reuse_the_loaded_table() {
        let fx = unlocked(three_trips());
        for day in 1..=5 {
            fx.controller
                .run(None, Some(DateInterval::new(date(1), date(day))))
                .unwrap();
        }
        assert_eq!(fx.source.reads(), 1);
    }

    #[test]
    fn missing_required_columns_halt_the_run() {
        struct NoFare;
        impl TripSource for NoFare {
            fn read(&self, _path: &Path) -> anyhow::Result<TripTable> {
                Ok(TripTable::new(
                    vec!["pickup_datetime".into(), "trip_miles".into()],
                    vec![trip(1, 1.0, 1.0)],
                ))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("trips.parquet");
        std::fs::write(&data_path, b"").unwrap();
        let config = DashboardConfig {
            data_path,
            password: Some("pw".into()),
            ..DashboardConfig::default()
        };
        let pipeline = Arc::new(Pipeline::new(NoFare, config.cache_ttl));
        let mut controller = DashboardController::new(&config, pipeline);
        controller.submit_password("pw".into()).unwrap();

        match controller.run(None, None) {
            Err(DashboardError::SchemaInvalid { missing, available }) => {
                assert_eq!(missing, vec!["dropoff_datetime", "base_passenger_fare"]);
                assert_eq!(available, vec!["pickup_datetime", "trip_miles"]);
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_without_upload_is_data_unavailable() {
        let fx = unlocked(three_trips());
        let config = DashboardConfig {
            data_path: PathBuf::from("/definitely/not/here.parquet"),
            password: Some("letmein".to_string()),
            ..DashboardConfig::default()
        };
        let pipeline = Arc::new(Pipeline::new(fx.source.clone(), config.cache_ttl));
        let mut controller = DashboardController::new(&config, pipeline);
        controller.submit_password("letmein".to_string()).unwrap();

        let err = controller.run(None, None).unwrap_err();
        assert!(matches!(err, DashboardError::DataUnavailable { .. }));
        assert!(err.is_recoverable());

        let upload = fx._dir.path().join("trips.parquet");
        let view = controller.run(Some(&upload), None).unwrap();
        assert_eq!(view.source, upload);
        assert_eq!(view.loaded_rows, 3);
    }

    #[test]
    fn table_without_pickups_is_no_data() {
        let mut rows = three_trips();
        for r in &mut rows {
            r.pickup = None;
        }
        let fx = unlocked(rows);
        let view = fx.controller.run(None, None).unwrap();
        assert_eq!(view.loaded_rows, 3);
        assert_eq!(view.visible_rows, 0);
        assert!(view.span.is_none());
        assert!(view.notice().is_some());
        assert_eq!(view.metrics.total_trips, "0");
        assert_eq!(view.metrics.avg_fare, "n/a");
    }

    #[test]
    fn unreadable_configured_file_falls_back_to_upload() {
        let dir = tempfile::tempdir().unwrap();
        let configured = dir.path().join("configured.csv");
        std::fs::write(
            &configured,
            "pickup_datetime,dropoff_datetime,trip_miles,base_passenger_fare\n\
             yesterday,2023-01-01 08:20:00,5.0,10.0\n",
        )
        .unwrap();
        let upload = dir.path().join("upload.csv");
        std::fs::write(
            &upload,
            "pickup_datetime,dropoff_datetime,trip_miles,base_passenger_fare\n\
             2023-01-01 08:00:00,2023-01-01 08:20:00,5.0,10.0\n\
             2023-01-03 09:00:00,2023-01-03 09:30:00,3.0,8.0\n",
        )
        .unwrap();

        let config = DashboardConfig {
            data_path: configured,
            password: Some("pw".into()),
            ..DashboardConfig::default()
        };
        let mut controller = DashboardController::from_config(&config);
        controller.submit_password("pw".into()).unwrap();

        let err = controller.run(None, None).unwrap_err();
        assert!(matches!(err, DashboardError::DataUnavailable { .. }));

        let view = controller.run(Some(&upload), None).unwrap();
        assert_eq!(view.source, upload);
        assert_eq!(view.loaded_rows, 2);
        assert_eq!(view.metrics.total_revenue, "$18.00");
    }
}
