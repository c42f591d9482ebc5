use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::data::aggregate::{daily_counts, distance_histogram, summarize};
use crate::data::filter::filter_by_date;
use crate::data::loader::load_file;
use crate::data::model::{
    DailyCountSeries, DateInterval, DistanceHistogram, SummaryMetrics, TableId, TripTable,
};
use crate::error::DashboardError;

// ---------------------------------------------------------------------------
// Table sources
// ---------------------------------------------------------------------------

/// Where tables come from.  The pipeline caches whatever this returns.
pub trait TripSource: Send + Sync {
    fn read(&self, path: &Path) -> anyhow::Result<TripTable>;
}

/// Reads parquet / csv files from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

impl TripSource for FileSource {
    fn read(&self, path: &Path) -> anyhow::Result<TripTable> {
        load_file(path)
    }
}

// ---------------------------------------------------------------------------
// Cached pipeline
// ---------------------------------------------------------------------------

/// Process-wide memoized load → filter → aggregate.
///
/// | step        | key                      |
/// |-------------|--------------------------|
/// | load        | file path                |
/// | filter      | (table id, interval)     |
/// | summarize   | table id                 |
/// | daily       | table id                 |
/// | histogram   | (table id, bin count)    |
///
/// Every cache shares one TTL so derived results expire with their table.
pub struct Pipeline<S = FileSource> {
    source: S,
    tables: TtlCache<PathBuf, TripTable>,
    filtered: TtlCache<(TableId, DateInterval), TripTable>,
    summaries: TtlCache<TableId, SummaryMetrics>,
    daily: TtlCache<TableId, DailyCountSeries>,
    histograms: TtlCache<(TableId, usize), DistanceHistogram>,
}

impl<S: TripSource> Pipeline<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            tables: TtlCache::with_ttl(ttl),
            filtered: TtlCache::with_ttl(ttl),
            summaries: TtlCache::with_ttl(ttl),
            daily: TtlCache::with_ttl(ttl),
            histograms: TtlCache::with_ttl(ttl),
        }
    }

    /// Load `path`, reading it at most once per TTL window.
    pub fn load(&self, path: &Path) -> Result<Arc<TripTable>, DashboardError> {
        self.purge_expired();
        self.tables.get_or_try_insert_with(&path.to_path_buf(), || {
            if !path.exists() {
                return Err(DashboardError::DataUnavailable {
                    path: path.to_path_buf(),
                    reason: "file not found".to_string(),
                });
            }
            log::info!("Loading trips from {}", path.display());
            let table = self
                .source
                .read(path)
                .map_err(|e| DashboardError::DataUnavailable {
                    path: path.to_path_buf(),
                    reason: format!("{e:#}"),
                })?;
            log::info!(
                "Loaded {} trips as table {} from {} ({} paths cached)",
                table.len(),
                table.id(),
                path.display(),
                self.tables.len()
            );
            Ok(table)
        })
    }

    pub fn filter(&self, table: &TripTable, interval: DateInterval) -> Arc<TripTable> {
        self.filtered.get_or_insert_with(&(table.id(), interval), || {
            log::debug!("Filtering table {} to {interval}", table.id());
            filter_by_date(table, interval)
        })
    }

    pub fn summarize(&self, table: &TripTable) -> Arc<SummaryMetrics> {
        self.summaries
            .get_or_insert_with(&table.id(), || summarize(table))
    }

    pub fn daily_counts(&self, table: &TripTable) -> Arc<DailyCountSeries> {
        self.daily
            .get_or_insert_with(&table.id(), || daily_counts(table))
    }

    pub fn histogram(&self, table: &TripTable, bins: usize) -> Arc<DistanceHistogram> {
        self.histograms
            .get_or_insert_with(&(table.id(), bins), || distance_histogram(table, bins))
    }

    fn purge_expired(&self) {
        let purged = self.tables.purge_expired()
            + self.filtered.purge_expired()
            + self.summaries.purge_expired()
            + self.daily.purge_expired()
            + self.histograms.purge_expired();
        if purged > 0 {
            log::debug!("Purged {purged} expired cache entries");
        }
    }
}
