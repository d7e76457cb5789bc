use crate::error::{PipelineError, Result};
use crate::models::{RadarCategory, Station};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// WSR-88D sites and their forecast offices.
#[rustfmt::skip]
const NEXRAD_SITES: &[(&str, &str)] = &[
    ("KABR", "ABR"), ("KABX", "ABQ"), ("KAKQ", "AKQ"), ("KAMA", "AMA"),
    ("KAMX", "MFL"), ("KAPX", "APX"), ("KARX", "ARX"), ("KATX", "SEW"),
    ("KBBX", "STO"), ("KBGM", "BGM"), ("KBHX", "EKA"), ("KBIS", "BIS"),
    ("KBLX", "BYZ"), ("KBMX", "BMX"), ("KBOX", "BOX"), ("KBRO", "BRO"),
    ("KBUF", "BUF"), ("KBYX", "KEY"), ("KCAE", "CAE"), ("KCBW", "CAR"),
    ("KCBX", "BOI"), ("KCCX", "CTP"), ("KCLE", "CLE"), ("KCLX", "CHS"),
    ("KCRP", "CRP"), ("KCXX", "BTV"), ("KCYS", "CYS"), ("KDAX", "STO"),
    ("KDDC", "DDC"), ("KDFX", "EWX"), ("KDGX", "JAN"), ("KDIX", "PHI"),
    ("KDLH", "DLH"), ("KDMX", "DMX"), ("KDOX", "PHI"), ("KDTX", "DTX"),
    ("KDVN", "DVN"), ("KDYX", "SJT"), ("KEAX", "EAX"), ("KEMX", "TWC"),
    ("KENX", "ALY"), ("KEOX", "TAE"), ("KEPZ", "EPZ"), ("KESX", "VEF"),
    ("KEVX", "TAE"), ("KEWX", "EWX"), ("KEYX", "VEF"), ("KFCX", "RNK"),
    ("KFDR", "OUN"), ("KFDX", "ABQ"), ("KFFC", "FFC"), ("KFSD", "FSD"),
    ("KFSX", "FGZ"), ("KFTG", "BOU"), ("KFWS", "FWD"), ("KGGW", "GGW"),
    ("KGJX", "GJT"), ("KGLD", "GLD"), ("KGRB", "GRB"), ("KGRK", "FWD"),
    ("KGRR", "GRR"), ("KGSP", "GSP"), ("KGWX", "JAN"), ("KGYX", "GYX"),
    ("KHDX", "EPZ"), ("KHGX", "HGX"), ("KHNX", "HNX"), ("KHPX", "PAH"),
    ("KHTX", "HUN"), ("KICT", "ICT"), ("KICX", "SLC"), ("KILN", "ILN"),
    ("KILX", "ILX"), ("KIND", "IND"), ("KINX", "TSA"), ("KIWA", "PSR"),
    ("KIWX", "IWX"), ("KJAX", "JAX"), ("KJGX", "FFC"), ("KJKL", "JKL"),
    ("KLBB", "LUB"), ("KLCH", "LCH"), ("KLGX", "SEW"), ("KLIX", "LIX"),
    ("KLNX", "LBF"), ("KLOT", "LOT"), ("KLRX", "LKN"), ("KLSX", "LSX"),
    ("KLTX", "ILM"), ("KLVX", "LMK"), ("KLWX", "LWX"), ("KLZK", "LZK"),
    ("KMAF", "MAF"), ("KMAX", "MFR"), ("KMBX", "BIS"), ("KMHX", "MHX"),
    ("KMKX", "MKX"), ("KMLB", "MLB"), ("KMOB", "MOB"), ("KMPX", "MPX"),
    ("KMQT", "MQT"), ("KMRX", "MRX"), ("KMSX", "MSO"), ("KMTX", "SLC"),
    ("KMUX", "MTR"), ("KMVX", "FGF"), ("KMXX", "BMX"), ("KNKX", "SGX"),
    ("KNQA", "MEG"), ("KOAX", "OAX"), ("KOHX", "OHX"), ("KOKX", "OKX"),
    ("KOTX", "OTX"), ("KPAH", "PAH"), ("KPBZ", "PBZ"), ("KPDT", "PDT"),
    ("KPOE", "LCH"), ("KPUX", "PUB"), ("KRAX", "RAH"), ("KRGX", "REV"),
    ("KRIW", "RIW"), ("KRLX", "RLX"), ("KRTX", "PQR"), ("KSFX", "PIH"),
    ("KSGF", "SGF"), ("KSHV", "SHV"), ("KSJT", "SJT"), ("KSOX", "SGX"),
    ("KSRX", "TSA"), ("KTBW", "TBW"), ("KTFX", "TFX"), ("KTLH", "TAE"),
    ("KTLX", "OUN"), ("KTWX", "TOP"), ("KTYX", "BUF"), ("KUDX", "UNR"),
    ("KUEX", "GID"), ("KVAX", "TAE"), ("KVBX", "LOX"), ("KVNX", "OUN"),
    ("KVTX", "LOX"), ("KVWX", "PAH"), ("KYUX", "PSR"),
];

/// TDWR sites and the forecast office whose area they sit in.
#[rustfmt::skip]
const TDWR_SITES: &[(&str, &str)] = &[
    ("TADW", "LWX"), ("TATL", "FFC"), ("TBNA", "OHX"), ("TBOS", "BOX"),
    ("TBWI", "LWX"), ("TCLT", "GSP"), ("TCMH", "ILN"), ("TCVG", "ILN"),
    ("TDAL", "FWD"), ("TDAY", "ILN"), ("TDCA", "LWX"), ("TDEN", "BOU"),
    ("TDFW", "FWD"), ("TDTW", "DTX"), ("TEWR", "OKX"), ("TFLL", "MFL"),
    ("THOU", "HGX"), ("TIAD", "LWX"), ("TIAH", "HGX"), ("TICH", "ICT"),
    ("TIDS", "IND"), ("TJFK", "OKX"), ("TLAS", "VEF"), ("TLVE", "CLE"),
    ("TMCI", "EAX"), ("TMCO", "MLB"), ("TMDW", "LOT"), ("TMEM", "MEG"),
    ("TMIA", "MFL"), ("TMKE", "MKX"), ("TMSP", "MPX"), ("TMSY", "LIX"),
    ("TOKC", "OUN"), ("TORD", "LOT"), ("TPBI", "MFL"), ("TPHL", "PHI"),
    ("TPHX", "PSR"), ("TPIT", "PBZ"), ("TRDU", "RAH"), ("TSDF", "LMK"),
    ("TSJU", "SJU"), ("TSLC", "SLC"), ("TSTL", "LSX"), ("TTPA", "TBW"),
    ("TTUL", "TSA"),
];

/// Registry entry supplied through settings to add or override a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StationEntry {
    pub category: RadarCategory,

    #[validate(length(equal = 3))]
    pub wfo: String,
}

/// Lookup from 4-character site id to category and forecast office.
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: HashMap<String, Station>,
}

impl StationRegistry {
    pub fn builtin() -> Self {
        let nexrad = NEXRAD_SITES
            .iter()
            .map(|(id, wfo)| Station::new(id, RadarCategory::Nexrad, wfo));
        let terminal = TDWR_SITES
            .iter()
            .map(|(id, wfo)| Station::new(id, RadarCategory::Terminal, wfo));

        let stations = nexrad
            .chain(terminal)
            .map(|station| (station.id.clone(), station))
            .collect();

        Self { stations }
    }

    pub fn with_overrides(mut self, overrides: &HashMap<String, StationEntry>) -> Result<Self> {
        for (id, entry) in overrides {
            if !id.is_ascii() || !entry.wfo.is_ascii() {
                return Err(PipelineError::Config(format!(
                    "station override '{}' must use ASCII identifiers",
                    id
                )));
            }
            entry.validate()?;
            let station = Station::new(id, entry.category, &entry.wfo);
            station.validate()?;
            self.stations.insert(station.id.clone(), station);
        }
        Ok(self)
    }

    pub fn resolve(&self, station_id: &str) -> Result<Station> {
        let key = station_id.trim().to_uppercase();
        self.stations
            .get(&key)
            .cloned()
            .ok_or(PipelineError::UnknownStation { station_id: key })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
