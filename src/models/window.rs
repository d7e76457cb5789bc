use crate::error::{PipelineError, Result};
use crate::utils::constants::{TRAILING_SCAN_DAYS, WINDOW_TIME_FORMAT};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// Inclusive UTC time range `[start, end]` at hour resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidWindow(format!(
                "start {} is after end {}",
                start.format(WINDOW_TIME_FORMAT),
                end.format(WINDOW_TIME_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a window from two `YYYYMMDD/HH` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_hour(start)?, parse_hour(end)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.start <= *time && *time <= self.end
    }

    /// Calendar days whose catalogs must be scanned: every day touched by the
    /// window plus the trailing day(s).
    pub fn scan_days(&self) -> Vec<NaiveDate> {
        let first = self.start.date_naive();
        let last = self.end.date_naive() + Duration::days(TRAILING_SCAN_DAYS);

        first.iter_days().take_while(|day| *day <= last).collect()
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(WINDOW_TIME_FORMAT),
            self.end.format(WINDOW_TIME_FORMAT)
        )
    }
}

/// Parse `YYYYMMDD/HH` into the top of that UTC hour.
pub fn parse_hour(value: &str) -> Result<DateTime<Utc>> {
    let invalid = || {
        PipelineError::InvalidWindow(format!(
            "'{}' is not in YYYYMMDD/HH format",
            value.trim()
        ))
    };

    let (date_part, hour_part) = value.trim().split_once('/').ok_or_else(invalid)?;
    if date_part.len() != 8 || hour_part.len() != 2 {
        return Err(invalid());
    }

    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").map_err(|_| invalid())?;
    let hour = hour_part.parse::<u32>().map_err(|_| invalid())?;
    let naive = date.and_hms_opt(hour, 0, 0).ok_or_else(invalid)?;

    Ok(Utc.from_utc_datetime(&naive))
}
