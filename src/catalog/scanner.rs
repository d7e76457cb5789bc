use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::models::{CatalogEntry, PipelineWarning, Station, TimeWindow};
use crate::utils::constants::{
    CATALOG_FILE, LATEST_SCAN_DAYS, LEVEL3_DIR, OLDEST_SCAN_FROM_DAYS, OLDEST_SCAN_TO_DAYS,
    PRODUCT_DIR,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use regex_lite::Regex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Matches product names as they appear in a THREDDS catalog listing.
const CATALOG_ENTRY_PATTERN: &str = r"<tt>(\w{5}\d_\w{3}_\w{3}_\d{8}_\d{4})\.nids";

/// Entries found by a scan plus any days that could not be read.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub entries: Vec<CatalogEntry>,
    pub warnings: Vec<PipelineWarning>,
}

/// Oldest and newest scan times currently held by the remote archive.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

pub struct CatalogScanner {
    client: reqwest::Client,
    base_url: String,
    max_workers: usize,
    pattern: Regex,
}

impl CatalogScanner {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Result<Self> {
        let pattern = Regex::new(CATALOG_ENTRY_PATTERN)
            .map_err(|e| PipelineError::Config(format!("catalog pattern: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url().to_string(),
            max_workers: settings.scan_workers,
            pattern,
        })
    }

    /// `{base}/{category}/level3/NVW/{tail}/{YYYYMMDD}/catalog.html`
    pub fn catalog_url(&self, station: &Station, day: NaiveDate) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}/{}",
            self.base_url,
            station.category.catalog_segment(),
            LEVEL3_DIR,
            PRODUCT_DIR,
            station.tail(),
            day.format("%Y%m%d"),
            CATALOG_FILE
        )
    }

    /// List every product in the catalogs covering `window` (plus the
    /// trailing day), in day order and sorted by name within a day.
    pub async fn discover(
        &self,
        station: &Station,
        window: &TimeWindow,
        cancel: &CancellationToken,
    ) -> Result<ScanReport> {
        let days = window.scan_days();
        info!(
            station = %station.id,
            window = %window,
            days = days.len(),
            "Scanning catalog"
        );
        self.discover_days(station, &days, cancel).await
    }

    pub async fn discover_days(
        &self,
        station: &Station,
        days: &[NaiveDate],
        cancel: &CancellationToken,
    ) -> Result<ScanReport> {
        // `buffered` keeps results in day order while fetching concurrently
        let results: Vec<Option<(NaiveDate, std::result::Result<Vec<CatalogEntry>, String>)>> =
            stream::iter(days.iter().copied())
                .map(|day| async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        result = self.scan_day(station, day) => Some((day, result)),
                    }
                })
                .buffered(self.max_workers)
                .collect()
                .await;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut report = ScanReport::default();
        for (day, result) in results.into_iter().flatten() {
            match result {
                Ok(entries) => {
                    debug!(%day, count = entries.len(), "Catalog day scanned");
                    report.entries.extend(entries);
                }
                Err(reason) => {
                    warn!(%day, %reason, "Catalog day unavailable");
                    report
                        .warnings
                        .push(PipelineWarning::CatalogUnavailable { day, reason });
                }
            }
        }

        info!(
            entries = report.entries.len(),
            failed_days = report.warnings.len(),
            "Catalog scan complete"
        );
        Ok(report)
    }

    async fn scan_day(
        &self,
        station: &Station,
        day: NaiveDate,
    ) -> std::result::Result<Vec<CatalogEntry>, String> {
        let url = self.catalog_url(station, day);
        debug!(%url, "Fetching catalog page");

        let response = self.client.get(&url).send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {} from {}", response.status(), url));
        }

        let page = response.text().await.map_err(|e| e.to_string())?;
        Ok(self.extract_entries(&page))
    }

    /// Pull product names out of one catalog page, sorted and de-duplicated.
    pub fn extract_entries(&self, page: &str) -> Vec<CatalogEntry> {
        let mut entries: Vec<CatalogEntry> = self
            .pattern
            .captures_iter(page)
            .filter_map(|caps| caps.get(1))
            .filter_map(|name| CatalogEntry::parse(name.as_str()).ok())
            .collect();

        entries.sort();
        entries.dedup();
        entries
    }

    /// Find the oldest scan (looking 29-31 days back) and the newest scan
    /// (looking over the last day) available for `station`. Either end is
    /// `None` when its catalogs list nothing.
    pub async fn availability(
        &self,
        station: &Station,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Availability> {
        let oldest = TimeWindow::new(
            now - Duration::days(OLDEST_SCAN_FROM_DAYS),
            now - Duration::days(OLDEST_SCAN_TO_DAYS),
        )?;
        let newest = TimeWindow::new(now - Duration::days(LATEST_SCAN_DAYS), now)?;

        let earliest = self
            .discover(station, &oldest, cancel)
            .await?
            .entries
            .first()
            .map(CatalogEntry::valid_time);
        let latest = self
            .discover(station, &newest, cancel)
            .await?
            .entries
            .last()
            .map(CatalogEntry::valid_time);

        Ok(Availability { earliest, latest })
    }
}
