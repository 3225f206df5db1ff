use gtfs_model::{
    Agency, Attribution, Calendar, CalendarDate, FareAttribute, FareRule, FeedInfo, Frequency,
    Level, Pathway, Route, Shape, Stop, StopTime, Transfer, Translation, Trip,
};

use crate::csv_io::{parse_csv_table, CsvTable};
use crate::feed_source::{FeedAccessError, FeedSource};
use crate::notice::NoticeContainer;

pub const AGENCY_FILE: &str = "agency.txt";
pub const STOPS_FILE: &str = "stops.txt";
pub const ROUTES_FILE: &str = "routes.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";
pub const CALENDAR_FILE: &str = "calendar.txt";
pub const CALENDAR_DATES_FILE: &str = "calendar_dates.txt";
pub const FARE_ATTRIBUTES_FILE: &str = "fare_attributes.txt";
pub const FARE_RULES_FILE: &str = "fare_rules.txt";
pub const SHAPES_FILE: &str = "shapes.txt";
pub const FREQUENCIES_FILE: &str = "frequencies.txt";
pub const TRANSFERS_FILE: &str = "transfers.txt";
pub const FEED_INFO_FILE: &str = "feed_info.txt";
pub const ATTRIBUTIONS_FILE: &str = "attributions.txt";
pub const LEVELS_FILE: &str = "levels.txt";
pub const PATHWAYS_FILE: &str = "pathways.txt";
pub const TRANSLATIONS_FILE: &str = "translations.txt";

pub const REQUIRED_FILES: &[&str] = &[
    AGENCY_FILE,
    STOPS_FILE,
    ROUTES_FILE,
    TRIPS_FILE,
    STOP_TIMES_FILE,
];

pub const GTFS_FILE_NAMES: &[&str] = &[
    AGENCY_FILE,
    STOPS_FILE,
    ROUTES_FILE,
    TRIPS_FILE,
    STOP_TIMES_FILE,
    CALENDAR_FILE,
    CALENDAR_DATES_FILE,
    FARE_ATTRIBUTES_FILE,
    FARE_RULES_FILE,
    SHAPES_FILE,
    FREQUENCIES_FILE,
    TRANSFERS_FILE,
    FEED_INFO_FILE,
    ATTRIBUTIONS_FILE,
    LEVELS_FILE,
    PATHWAYS_FILE,
    TRANSLATIONS_FILE,
];

/// The parsed, in-memory representation of a GTFS feed, scoped to the
/// "static" core file set (no GTFS-Fares-v2 or GTFS-Flex tables). The five
/// required tables always have a value (empty when the file is missing, with
/// a notice already recorded); the rest are genuinely optional.
#[derive(Debug, Clone, Default)]
pub struct GtfsFeed {
    pub agency: CsvTable<Agency>,
    pub stops: CsvTable<Stop>,
    pub routes: CsvTable<Route>,
    pub trips: CsvTable<Trip>,
    pub stop_times: CsvTable<StopTime>,
    pub calendar: Option<CsvTable<Calendar>>,
    pub calendar_dates: Option<CsvTable<CalendarDate>>,
    pub fare_attributes: Option<CsvTable<FareAttribute>>,
    pub fare_rules: Option<CsvTable<FareRule>>,
    pub shapes: Option<CsvTable<Shape>>,
    pub frequencies: Option<CsvTable<Frequency>>,
    pub transfers: Option<CsvTable<Transfer>>,
    pub feed_info: Option<CsvTable<FeedInfo>>,
    pub attributions: Option<CsvTable<Attribution>>,
    pub levels: Option<CsvTable<Level>>,
    pub pathways: Option<CsvTable<Pathway>>,
    pub translations: Option<CsvTable<Translation>>,
}

impl GtfsFeed {
    pub fn load(
        source: &dyn FeedSource,
        notices: &NoticeContainer,
    ) -> Result<Self, FeedAccessError> {
        let mut feed = GtfsFeed::default();

        feed.agency = Self::load_required(source, AGENCY_FILE, notices)?;
        feed.stops = Self::load_required(source, STOPS_FILE, notices)?;
        feed.routes = Self::load_required(source, ROUTES_FILE, notices)?;
        feed.trips = Self::load_required(source, TRIPS_FILE, notices)?;
        feed.stop_times = Self::load_required(source, STOP_TIMES_FILE, notices)?;

        feed.calendar = Self::load_optional(source, CALENDAR_FILE, notices)?;
        feed.calendar_dates = Self::load_optional(source, CALENDAR_DATES_FILE, notices)?;
        feed.fare_attributes = Self::load_optional(source, FARE_ATTRIBUTES_FILE, notices)?;
        feed.fare_rules = Self::load_optional(source, FARE_RULES_FILE, notices)?;
        feed.shapes = Self::load_optional(source, SHAPES_FILE, notices)?;
        feed.frequencies = Self::load_optional(source, FREQUENCIES_FILE, notices)?;
        feed.transfers = Self::load_optional(source, TRANSFERS_FILE, notices)?;
        feed.feed_info = Self::load_optional(source, FEED_INFO_FILE, notices)?;
        feed.attributions = Self::load_optional(source, ATTRIBUTIONS_FILE, notices)?;
        feed.levels = Self::load_optional(source, LEVELS_FILE, notices)?;
        feed.pathways = Self::load_optional(source, PATHWAYS_FILE, notices)?;
        feed.translations = Self::load_optional(source, TRANSLATIONS_FILE, notices)?;

        Ok(feed)
    }

    fn load_required<T: serde::de::DeserializeOwned>(
        source: &dyn FeedSource,
        file_name: &str,
        notices: &NoticeContainer,
    ) -> Result<CsvTable<T>, FeedAccessError> {
        match source.read_file(file_name)? {
            Some(bytes) => {
                let table = parse_csv_table(file_name, &bytes, notices);
                if table.is_empty() {
                    notices.push_empty_table(file_name);
                }
                Ok(table)
            }
            None => {
                notices.push_missing_file(file_name);
                Ok(CsvTable::default())
            }
        }
    }

    fn load_optional<T: serde::de::DeserializeOwned>(
        source: &dyn FeedSource,
        file_name: &str,
        notices: &NoticeContainer,
    ) -> Result<Option<CsvTable<T>>, FeedAccessError> {
        match source.read_file(file_name)? {
            Some(bytes) => Ok(Some(parse_csv_table(file_name, &bytes, notices))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed_source::DirectoryFeedSource;
    use std::fs;

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}_{}", prefix, std::process::id(), nanos))
    }

    #[test]
    fn loads_required_tables_and_flags_missing_optional_as_absent() {
        let dir = temp_dir("gtfs_feed_load");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(AGENCY_FILE),
            "agency_name,agency_url,agency_timezone\nTest,https://example.com,UTC\n",
        )
        .unwrap();
        fs::write(dir.join(STOPS_FILE), "stop_id\nSTOP1\n").unwrap();
        fs::write(dir.join(ROUTES_FILE), "route_id,route_type\nR1,3\n").unwrap();
        fs::write(
            dir.join(TRIPS_FILE),
            "route_id,service_id,trip_id\nR1,SVC1,T1\n",
        )
        .unwrap();
        fs::write(
            dir.join(STOP_TIMES_FILE),
            "trip_id,stop_id,stop_sequence,arrival_time,departure_time\nT1,STOP1,1,08:00:00,08:00:00\n",
        )
        .unwrap();

        let source = DirectoryFeedSource::open(&dir).unwrap();
        let notices = NoticeContainer::new();
        let feed = GtfsFeed::load(&source, &notices).unwrap();

        assert_eq!(feed.agency.len(), 1);
        assert_eq!(feed.stops.len(), 1);
        assert!(feed.calendar.is_none());
        assert!(notices.is_empty());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn records_notice_for_missing_required_file() {
        let dir = temp_dir("gtfs_feed_missing");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(AGENCY_FILE),
            "agency_name,agency_url,agency_timezone\nTest,https://example.com,UTC\n",
        )
        .unwrap();

        let source = DirectoryFeedSource::open(&dir).unwrap();
        let notices = NoticeContainer::new();
        let feed = GtfsFeed::load(&source, &notices).unwrap();

        assert!(feed.stops.is_empty());
        assert!(notices
            .iter()
            .any(|n| n.code == "missing_required_file" && n.file.as_deref() == Some(STOPS_FILE)));

        fs::remove_dir_all(&dir).ok();
    }
}
