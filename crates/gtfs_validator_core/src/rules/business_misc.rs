use std::collections::HashMap;

use gtfs_model::LocationType;

use crate::feed::{
    AGENCY_FILE, FARE_RULES_FILE, FEED_INFO_FILE, FREQUENCIES_FILE, LEVELS_FILE, PATHWAYS_FILE,
    ROUTES_FILE, STOPS_FILE, TRANSFERS_FILE,
};
use crate::{FeedIndices, GtfsFeed, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_UNUSED_STOP: &str = "unused_stop";
const CODE_UNUSED_ROUTE: &str = "unused_route";
const CODE_UNUSED_AGENCY: &str = "unused_agency";
const CODE_DUPLICATE_ROUTE_NAME: &str = "duplicate_route_name";
const CODE_DUPLICATE_FARE_ID: &str = "duplicate_fare_id";
const CODE_AGENCY_INCONSISTENT_TIMEZONE: &str = "agency_inconsistent_timezone";
const CODE_MATCHING_FEED_AND_AGENCY_LANG: &str = "feed_info_lang_and_agency_lang_mismatch";
const CODE_OVERLAPPING_FREQUENCY: &str = "overlapping_frequency";
const CODE_PATHWAY_DANGLING_GENERIC_NODE: &str = "pathway_dangling_generic_node";
const CODE_PATHWAY_LOOP: &str = "pathway_loop";
const CODE_MISSING_LEVEL_ID: &str = "missing_level_id";
const CODE_TRANSFERS_STOP_TYPE: &str = "transfers_stop_type";
const CODE_TRANSFERS_TRIP_REFERENCE: &str = "transfers_trip_reference";

/// Reports `stops.txt`/`routes.txt`/`agency.txt` rows no `trip`/`route`
/// transitively references — dead data a feed carries but no rider will ever
/// see. Grouped into one validator since each check is the same "does
/// anything downstream reference this id" shape.
#[derive(Debug, Default)]
pub struct UnusedEntitiesValidator;

impl Validator for UnusedEntitiesValidator {
    fn name(&self) -> &'static str {
        CODE_UNUSED_STOP
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Business
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let mut referenced_stops: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for stop_time in &feed.stop_times.rows {
            referenced_stops.insert(stop_time.stop_id.as_str());
        }
        for (row, stop) in feed.stops.iter_with_row() {
            // Parent stations, entrances, and generic nodes exist to be
            // referenced by other stops, not by stop_times directly.
            if stop.location_type_or_default() != LocationType::StopOrPlatform {
                continue;
            }
            if !referenced_stops.contains(stop.stop_id.as_str()) {
                let mut notice = ValidationNotice::new(
                    CODE_UNUSED_STOP,
                    NoticeSeverity::Warning,
                    format!("stop {:?} is never referenced by any stop_time", stop.stop_id),
                );
                notice.file = Some(STOPS_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("stopId", &stop.stop_id);
                notices.push(notice);
            }
        }

        for (row, route) in feed.routes.iter_with_row() {
            if !indices.trips_by_route.contains_key(&route.route_id) {
                let mut notice = ValidationNotice::new(
                    CODE_UNUSED_ROUTE,
                    NoticeSeverity::Warning,
                    format!("route {:?} has no trips", route.route_id),
                );
                notice.file = Some(ROUTES_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("routeId", &route.route_id);
                notices.push(notice);
            }
        }

        let referenced_agencies: std::collections::HashSet<&str> = feed
            .routes
            .rows
            .iter()
            .filter_map(|route| route.agency_id.as_deref())
            .collect();
        let single_agency = feed.agency.rows.len() == 1;
        for (row, agency) in feed.agency.iter_with_row() {
            let Some(agency_id) = &agency.agency_id else {
                continue;
            };
            // A lone agency is implicitly every route's operator even when
            // agency_id is never echoed back in routes.txt.
            if !single_agency && !referenced_agencies.contains(agency_id.as_str()) {
                let mut notice = ValidationNotice::new(
                    CODE_UNUSED_AGENCY,
                    NoticeSeverity::Warning,
                    format!("agency {agency_id:?} has no routes"),
                );
                notice.file = Some(AGENCY_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("agencyId", agency_id);
                notices.push(notice);
            }
        }
    }
}

/// Two routes under the same agency with the same short+long name pair are
/// almost always a data duplication bug rather than intentionally identical
/// routes.
#[derive(Debug, Default)]
pub struct DuplicateRouteNameValidator;

impl Validator for DuplicateRouteNameValidator {
    fn name(&self) -> &'static str {
        CODE_DUPLICATE_ROUTE_NAME
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Business
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let mut seen: HashMap<(Option<String>, String, String), u64> = HashMap::new();
        for (row, route) in feed.routes.iter_with_row() {
            let key = (
                route.agency_id.clone(),
                route.route_short_name.clone().unwrap_or_default(),
                route.route_long_name.clone().unwrap_or_default(),
            );
            if key.1.is_empty() && key.2.is_empty() {
                continue;
            }
            if let Some(&first_row) = seen.get(&key) {
                let mut notice = ValidationNotice::new(
                    CODE_DUPLICATE_ROUTE_NAME,
                    NoticeSeverity::Warning,
                    format!("route {:?} duplicates the name of the route defined at row {first_row}", route.route_id),
                );
                notice.file = Some(ROUTES_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("routeId", &route.route_id);
                notice.insert_context_field("prevCsvRowNumber", first_row);
                notices.push(notice);
            } else {
                seen.insert(key, row);
            }
        }
    }
}

/// `fare_rules.txt` rows that repeat the exact same rule tuple for one
/// `fare_id` are redundant at best and contradictory at worst if a later
/// duplicate disagrees with fields the format doesn't carry a precedence
/// rule for.
#[derive(Debug, Default)]
pub struct DuplicateFareIdValidator;

impl Validator for DuplicateFareIdValidator {
    fn name(&self) -> &'static str {
        CODE_DUPLICATE_FARE_ID
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Relational
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let Some(fare_rules) = &feed.fare_rules else {
            return;
        };
        let mut seen: HashMap<(String, Option<String>, Option<String>, Option<String>, Option<String>), u64> =
            HashMap::new();
        for (row, rule) in fare_rules.iter_with_row() {
            let key = (
                rule.fare_id.clone(),
                rule.route_id.clone(),
                rule.origin_id.clone(),
                rule.destination_id.clone(),
                rule.contains_id.clone(),
            );
            if let Some(&first_row) = seen.get(&key) {
                let mut notice = ValidationNotice::new(
                    CODE_DUPLICATE_FARE_ID,
                    NoticeSeverity::Warning,
                    format!("fare_rules row {row} duplicates the rule defined at row {first_row} for fare {:?}", rule.fare_id),
                );
                notice.file = Some(FARE_RULES_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("fareId", &rule.fare_id);
                notice.insert_context_field("prevCsvRowNumber", first_row);
                notices.push(notice);
            } else {
                seen.insert(key, row);
            }
        }
    }
}

/// Every agency in a feed is expected to share one timezone; GTFS-consuming
/// software generally assumes a single feed-wide timezone and multiple
/// distinct `agency_timezone` values usually indicate a data entry mistake
/// rather than a genuinely multi-timezone feed.
#[derive(Debug, Default)]
pub struct AgencyInconsistentTimezoneValidator;

impl Validator for AgencyInconsistentTimezoneValidator {
    fn name(&self) -> &'static str {
        CODE_AGENCY_INCONSISTENT_TIMEZONE
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Business
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let Some(first) = feed.agency.rows.first() else {
            return;
        };
        let expected = first.agency_timezone.as_str();
        for (row, agency) in feed.agency.iter_with_row().skip(1) {
            if agency.agency_timezone != expected {
                let mut notice = ValidationNotice::new(
                    CODE_AGENCY_INCONSISTENT_TIMEZONE,
                    NoticeSeverity::Error,
                    format!(
                        "agency {:?} uses timezone {:?}, inconsistent with {:?} used by the feed's other agencies",
                        agency.agency_id, agency.agency_timezone, expected
                    ),
                );
                notice.file = Some(AGENCY_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("agencyId", &agency.agency_id);
                notice.insert_context_field("agencyTimezone", &agency.agency_timezone);
                notices.push(notice);
            }
        }
    }
}

/// `feed_info.feed_lang` should match every agency's `agency_lang` when both
/// are present; `"mul"` (multiple languages) is an explicit GTFS escape
/// hatch from this rule.
#[derive(Debug, Default)]
pub struct MatchingFeedAndAgencyLangValidator;

impl Validator for MatchingFeedAndAgencyLangValidator {
    fn name(&self) -> &'static str {
        CODE_MATCHING_FEED_AND_AGENCY_LANG
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Business
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let Some(feed_info) = &feed.feed_info else {
            return;
        };
        for (_, info) in feed_info.iter_with_row() {
            let feed_lang = info.feed_lang.trim();
            if feed_lang.is_empty() || feed_lang.eq_ignore_ascii_case("mul") {
                continue;
            }
            for (agency_row, agency) in feed.agency.iter_with_row() {
                let Some(agency_lang) = &agency.agency_lang else {
                    continue;
                };
                let agency_lang = agency_lang.trim();
                if agency_lang.is_empty() || agency_lang.eq_ignore_ascii_case(feed_lang) {
                    continue;
                }
                let mut notice = ValidationNotice::new(
                    CODE_MATCHING_FEED_AND_AGENCY_LANG,
                    NoticeSeverity::Warning,
                    format!(
                        "agency {:?} declares agency_lang {agency_lang:?}, which does not match feed_info's feed_lang {feed_lang:?}",
                        agency.agency_id
                    ),
                );
                notice.file = Some(FEED_INFO_FILE.to_string());
                notice.row = Some(agency_row);
                notice.insert_context_field("agencyId", &agency.agency_id);
                notice.insert_context_field("agencyLang", agency_lang);
                notice.insert_context_field("agencyName", &agency.agency_name);
                notice.insert_context_field("feedLang", feed_lang);
                notices.push(notice);
            }
        }
    }
}

/// Two `frequencies.txt` rows for the same trip whose `[start_time, end_time)`
/// windows overlap would have the same vehicle dispatched twice at once.
#[derive(Debug, Default)]
pub struct OverlappingFrequencyValidator;

impl Validator for OverlappingFrequencyValidator {
    fn name(&self) -> &'static str {
        CODE_OVERLAPPING_FREQUENCY
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Relational
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let Some(frequencies) = &feed.frequencies else {
            return;
        };
        let mut by_trip: HashMap<&str, Vec<(u64, i32, i32)>> = HashMap::new();
        for (row, frequency) in frequencies.iter_with_row() {
            by_trip.entry(frequency.trip_id.as_str()).or_default().push((
                row,
                frequency.start_time.total_seconds(),
                frequency.end_time.total_seconds(),
            ));
        }
        for (trip_id, mut windows) in by_trip {
            windows.sort_by_key(|&(_, start, _)| start);
            for pair in windows.windows(2) {
                let (prev_row, _, prev_end) = pair[0];
                let (row, start, _) = pair[1];
                if start < prev_end {
                    let mut notice = ValidationNotice::new(
                        CODE_OVERLAPPING_FREQUENCY,
                        NoticeSeverity::Error,
                        format!("trip {trip_id:?} has overlapping frequencies rows {prev_row} and {row}"),
                    );
                    notice.file = Some(FREQUENCIES_FILE.to_string());
                    notice.row = Some(row);
                    notice.insert_context_field("tripId", trip_id);
                    notices.push(notice);
                }
            }
        }
    }
}

/// A `pathways.txt` row touching a generic node should be matched by another
/// pathway on the other side of that node; a generic node with only one
/// pathway is a dead end with no onward connection.
#[derive(Debug, Default)]
pub struct PathwayDanglingGenericNodeValidator;

impl Validator for PathwayDanglingGenericNodeValidator {
    fn name(&self) -> &'static str {
        CODE_PATHWAY_DANGLING_GENERIC_NODE
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Relational
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let Some(pathways) = &feed.pathways else {
            return;
        };
        let mut degree: HashMap<&str, usize> = HashMap::new();
        for pathway in &pathways.rows {
            *degree.entry(pathway.from_stop_id.as_str()).or_default() += 1;
            *degree.entry(pathway.to_stop_id.as_str()).or_default() += 1;
        }

        for (row, pathway) in pathways.iter_with_row() {
            for stop_id in [&pathway.from_stop_id, &pathway.to_stop_id] {
                let Some(&stop_index) = indices.stop_ids.get(stop_id) else {
                    continue;
                };
                let stop = &feed.stops.rows[stop_index];
                if stop.location_type_or_default() == LocationType::GenericNode
                    && degree.get(stop_id.as_str()).copied().unwrap_or(0) < 2
                {
                    let mut notice = ValidationNotice::new(
                        CODE_PATHWAY_DANGLING_GENERIC_NODE,
                        NoticeSeverity::Warning,
                        format!("generic node {stop_id:?} has only one pathway connecting to it"),
                    );
                    notice.file = Some(PATHWAYS_FILE.to_string());
                    notice.row = Some(row);
                    notice.insert_context_field("stopId", stop_id);
                    notice.insert_context_field("pathwayId", &pathway.pathway_id);
                    notices.push(notice);
                }
            }
        }
    }
}

/// A pathway whose `from_stop_id` and `to_stop_id` are the same stop goes
/// nowhere; riders following it would never actually move.
#[derive(Debug, Default)]
pub struct PathwayLoopValidator;

impl Validator for PathwayLoopValidator {
    fn name(&self) -> &'static str {
        CODE_PATHWAY_LOOP
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Relational
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let Some(pathways) = &feed.pathways else {
            return;
        };
        for (row, pathway) in pathways.iter_with_row() {
            let from_id = pathway.from_stop_id.trim();
            let to_id = pathway.to_stop_id.trim();
            if !from_id.is_empty() && from_id == to_id {
                let mut notice = ValidationNotice::new(
                    CODE_PATHWAY_LOOP,
                    NoticeSeverity::Warning,
                    format!("pathway {:?} has the same from_stop_id and to_stop_id", pathway.pathway_id),
                );
                notice.file = Some(PATHWAYS_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("pathwayId", &pathway.pathway_id);
                notice.insert_context_field("stopId", from_id);
                notices.push(notice);
            }
        }
    }
}

/// A stop declaring `level_id` should resolve to a real `levels.txt` row;
/// this is a foreign key in spirit but kept separate from the generic
/// declarative FK table because `level_id` is one of the few optional
/// fields acting as a key into an optional file.
#[derive(Debug, Default)]
pub struct MissingLevelIdValidator;

impl Validator for MissingLevelIdValidator {
    fn name(&self) -> &'static str {
        CODE_MISSING_LEVEL_ID
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Relational
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let known_levels: std::collections::HashSet<&str> = feed
            .levels
            .as_ref()
            .map(|levels| levels.rows.iter().map(|l| l.level_id.as_str()).collect())
            .unwrap_or_default();

        for (row, stop) in feed.stops.iter_with_row() {
            let Some(level_id) = &stop.level_id else {
                continue;
            };
            if !known_levels.contains(level_id.as_str()) {
                let mut notice = ValidationNotice::new(
                    CODE_MISSING_LEVEL_ID,
                    NoticeSeverity::Error,
                    format!("stop {:?} references level_id {level_id:?}, which has no levels.txt row", stop.stop_id),
                );
                notice.file = Some(LEVELS_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("stopId", &stop.stop_id);
                notice.insert_context_field("levelId", level_id);
                notices.push(notice);
            }
        }
    }
}

/// `transfers.txt` rows referencing a `from_stop_id`/`to_stop_id` that isn't
/// a boardable location (i.e. is a station rather than a stop/platform), and
/// rows naming a `from_trip_id`/`to_trip_id` that doesn't exist — both of
/// which a transfer can't actually be carried out against.
#[derive(Debug, Default)]
pub struct TransfersValidator;

impl Validator for TransfersValidator {
    fn name(&self) -> &'static str {
        CODE_TRANSFERS_STOP_TYPE
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Relational
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let Some(transfers) = &feed.transfers else {
            return;
        };

        for (row, transfer) in transfers.iter_with_row() {
            for stop_id in [&transfer.from_stop_id, &transfer.to_stop_id].into_iter().flatten() {
                let Some(&stop_index) = indices.stop_ids.get(stop_id) else {
                    continue;
                };
                let stop = &feed.stops.rows[stop_index];
                if stop.location_type_or_default() != LocationType::StopOrPlatform {
                    let mut notice = ValidationNotice::new(
                        CODE_TRANSFERS_STOP_TYPE,
                        NoticeSeverity::Error,
                        format!("transfer at row {row} references stop {stop_id:?}, which is not a boardable stop or platform"),
                    );
                    notice.file = Some(TRANSFERS_FILE.to_string());
                    notice.row = Some(row);
                    notice.insert_context_field("stopId", stop_id);
                    notices.push(notice);
                }
            }

            for trip_id in [&transfer.from_trip_id, &transfer.to_trip_id].into_iter().flatten() {
                if !indices.trip_ids.contains_key(trip_id) {
                    let mut notice = ValidationNotice::new(
                        CODE_TRANSFERS_TRIP_REFERENCE,
                        NoticeSeverity::Error,
                        format!("transfer at row {row} references trip {trip_id:?}, which does not exist"),
                    );
                    notice.file = Some(TRANSFERS_FILE.to_string());
                    notice.row = Some(row);
                    notice.insert_context_field("tripId", trip_id);
                    notices.push(notice);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::CsvTable;
    use gtfs_model::{Agency, Route};

    #[test]
    fn flags_unused_route() {
        let mut feed = GtfsFeed::default();
        feed.routes = CsvTable {
            headers: vec!["route_id".into()],
            rows: vec![Route { route_id: "R1".into(), ..Default::default() }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        UnusedEntitiesValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_UNUSED_ROUTE));
    }

    #[test]
    fn flags_inconsistent_agency_timezone() {
        let mut feed = GtfsFeed::default();
        feed.agency = CsvTable {
            headers: vec!["agency_name".into()],
            rows: vec![
                Agency { agency_id: Some("A1".into()), agency_timezone: "America/New_York".into(), ..Default::default() },
                Agency { agency_id: Some("A2".into()), agency_timezone: "Europe/Paris".into(), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        AgencyInconsistentTimezoneValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_AGENCY_INCONSISTENT_TIMEZONE));
    }

    #[test]
    fn flags_feed_lang_mismatch() {
        use gtfs_model::FeedInfo;
        let mut feed = GtfsFeed::default();
        feed.agency = CsvTable {
            headers: vec!["agency_name".into()],
            rows: vec![Agency { agency_lang: Some("fr".into()), ..Default::default() }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        feed.feed_info = Some(CsvTable {
            headers: vec!["feed_publisher_name".into()],
            rows: vec![FeedInfo {
                feed_publisher_name: "Agency".into(),
                feed_publisher_url: "https://example.com".into(),
                feed_lang: "en".into(),
                feed_start_date: None,
                feed_end_date: None,
                feed_version: None,
                feed_contact_email: None,
                feed_contact_url: None,
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        MatchingFeedAndAgencyLangValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices
            .iter()
            .any(|n| n.code == CODE_MATCHING_FEED_AND_AGENCY_LANG));
    }

    #[test]
    fn flags_pathway_with_identical_endpoints() {
        use gtfs_model::Pathway;
        let mut feed = GtfsFeed::default();
        feed.pathways = Some(CsvTable {
            headers: vec!["pathway_id".into()],
            rows: vec![Pathway {
                pathway_id: "P1".into(),
                from_stop_id: "S1".into(),
                to_stop_id: "S1".into(),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        PathwayLoopValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_PATHWAY_LOOP));
    }

    #[test]
    fn accepts_pathway_with_distinct_endpoints() {
        use gtfs_model::Pathway;
        let mut feed = GtfsFeed::default();
        feed.pathways = Some(CsvTable {
            headers: vec!["pathway_id".into()],
            rows: vec![Pathway {
                pathway_id: "P1".into(),
                from_stop_id: "S1".into(),
                to_stop_id: "S2".into(),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        PathwayLoopValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.is_empty());
    }
}
