use crate::utils::constants::WFO_MARKER_PREFIX;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Radar network a site belongs to; selects the catalog subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadarCategory {
    /// WSR-88D
    Nexrad,
    /// Terminal Doppler Weather Radar
    Terminal,
}

impl RadarCategory {
    pub fn catalog_segment(&self) -> &'static str {
        match self {
            RadarCategory::Nexrad => "nexrad",
            RadarCategory::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for RadarCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.catalog_segment())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Station {
    #[validate(length(equal = 4))]
    pub id: String,

    pub category: RadarCategory,

    #[validate(length(equal = 3))]
    pub wfo: String,
}

impl Station {
    pub fn new(id: &str, category: RadarCategory, wfo: &str) -> Self {
        Self {
            id: id.to_uppercase(),
            category,
            wfo: wfo.to_uppercase(),
        }
    }

    /// Last three characters of the site id (`KTLX` -> `TLX`), as used in
    /// catalog paths and product names.
    pub fn tail(&self) -> &str {
        let split = self.id.len().saturating_sub(3);
        self.id.get(split..).unwrap_or(&self.id)
    }

    /// Four-letter office marker that prefixes canonical files (`KOUN`).
    pub fn wfo_marker(&self) -> String {
        format!("{}{}", WFO_MARKER_PREFIX, self.wfo)
    }
}

impl std::fmt::Display for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} / WFO {})", self.id, self.category, self.wfo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_fields() {
        let station = Station::new("ktlx", RadarCategory::Nexrad, "oun");

        assert_eq!(station.id, "KTLX");
        assert_eq!(station.tail(), "TLX");
        assert_eq!(station.wfo_marker(), "KOUN");
        assert_eq!(station.category.catalog_segment(), "nexrad");
        assert!(station.validate().is_ok());
    }

    #[test]
    fn test_terminal_station_tail() {
        let station = Station::new("TORD", RadarCategory::Terminal, "LOT");
        assert_eq!(station.tail(), "ORD");
        assert_eq!(station.category.to_string(), "terminal");
    }

    #[test]
    fn test_tail_of_non_ascii_id() {
        let station = Station::new("kélx", RadarCategory::Nexrad, "OUN");
        assert_eq!(station.tail(), "KÉLX");
    }

    #[test]
    fn test_invalid_station_lengths() {
        let station = Station::new("KTLXX", RadarCategory::Nexrad, "OUNN");
        assert!(station.validate().is_err());
    }
}
