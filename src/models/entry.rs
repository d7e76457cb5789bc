use crate::error::{PipelineError, Result};
use crate::utils::constants::RAW_EXTENSION;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A product listed in a remote day catalog, e.g. `Level3_TLX_NVW_20200601_0015`.
///
/// Grammar: five word characters and one digit, then `_` separated station
/// tail (3), product code (3), date (`YYYYMMDD`) and time (`HHMM`). The full
/// name is the natural key, so equality and ordering use it alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    name: String,
    station_tail: String,
    product: String,
    valid_time: DateTime<Utc>,
}

impl CatalogEntry {
    /// Parse a catalog name; a trailing `.nids` is accepted and dropped.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw
            .strip_suffix(&format!(".{}", RAW_EXTENSION))
            .unwrap_or(raw);
        let invalid = |why: &str| PipelineError::InvalidFilename(format!("{}: {}", name, why));

        let fields: Vec<&str> = name.split('_').collect();
        let [prefix, tail, product, date, time] = fields.as_slice() else {
            return Err(invalid("expected five '_' separated fields"));
        };

        let prefix_ok = prefix.len() == 6
            && prefix.is_ascii()
            && prefix[..5].bytes().all(|b| b.is_ascii_alphanumeric())
            && prefix.as_bytes()[5].is_ascii_digit();
        if !prefix_ok {
            return Err(invalid("bad class prefix"));
        }
        if !is_code(tail) || !is_code(product) {
            return Err(invalid("station and product codes must be three characters"));
        }
        if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("date must be YYYYMMDD"));
        }
        if time.len() != 4 || !time.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("time must be HHMM"));
        }

        let date = NaiveDate::parse_from_str(date, "%Y%m%d")?;
        let time = NaiveTime::parse_from_str(time, "%H%M")?;
        let valid_time = Utc.from_utc_datetime(&date.and_time(time));

        Ok(Self {
            name: name.to_string(),
            station_tail: tail.to_string(),
            product: product.to_string(),
            valid_time,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn station_tail(&self) -> &str {
        &self.station_tail
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn valid_time(&self) -> DateTime<Utc> {
        self.valid_time
    }

    pub fn day(&self) -> NaiveDate {
        self.valid_time.date_naive()
    }

    /// Name of the file on the remote file server and in the working directory.
    pub fn raw_file_name(&self) -> String {
        format!("{}.{}", self.name, RAW_EXTENSION)
    }
}

impl PartialEq for CatalogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CatalogEntry {}

impl PartialOrd for CatalogEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CatalogEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl std::fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn is_code(field: &str) -> bool {
    field.len() == 3 && field.bytes().all(|b| b.is_ascii_alphanumeric())
}
