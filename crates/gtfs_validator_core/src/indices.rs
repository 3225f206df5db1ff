use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Days, NaiveDate};
use compact_str::CompactString;
use gtfs_model::ExceptionType;

use crate::feed::GtfsFeed;

/// Read-only relational indices built once in the loading prologue and
/// shared (via `Arc`) across every validator in the run. Validators that need
/// "all stop_times for this trip" or "does this stop_id exist" look it up
/// here instead of scanning `Vec`s, which is what makes per-validator
/// relational checks linear instead of quadratic.
#[derive(Debug, Default)]
pub struct FeedIndices {
    pub stop_ids: HashMap<String, usize>,
    pub route_ids: HashMap<String, usize>,
    pub trip_ids: HashMap<String, usize>,
    pub agency_ids: HashMap<String, usize>,
    pub service_ids_from_calendar: HashMap<String, usize>,
    pub service_ids_from_calendar_dates: HashMap<String, Vec<usize>>,
    pub shape_ids: HashMap<String, Vec<usize>>,
    pub stop_times_by_trip: HashMap<String, Vec<usize>>,
    pub trips_by_route: HashMap<String, Vec<usize>>,
    pub trips_by_block: HashMap<String, Vec<usize>>,
    pub trips_by_service: HashMap<String, Vec<usize>>,
    pub fare_ids: HashMap<String, usize>,
    pub level_ids: HashMap<String, usize>,
    /// Every date each `service_id` actually runs: the calendar weekday mask
    /// expanded across its date range, with `calendar_dates` exceptions
    /// (type 1 adds, type 2 removes) applied on top. Computed once here so
    /// `calendar_coverage` and `block_overlap` both intersect active-day sets
    /// instead of re-deriving them per validator.
    pub active_dates: HashMap<CompactString, BTreeSet<NaiveDate>>,
}

impl FeedIndices {
    pub fn build(feed: &GtfsFeed) -> Self {
        let mut indices = FeedIndices::default();

        for (i, stop) in feed.stops.rows.iter().enumerate() {
            indices.stop_ids.insert(stop.stop_id.clone(), i);
        }
        for (i, route) in feed.routes.rows.iter().enumerate() {
            indices.route_ids.insert(route.route_id.clone(), i);
        }
        for (i, agency) in feed.agency.rows.iter().enumerate() {
            if let Some(id) = &agency.agency_id {
                indices.agency_ids.insert(id.clone(), i);
            }
        }
        for (i, trip) in feed.trips.rows.iter().enumerate() {
            indices.trip_ids.insert(trip.trip_id.clone(), i);
            indices
                .trips_by_route
                .entry(trip.route_id.clone())
                .or_default()
                .push(i);
            indices
                .trips_by_service
                .entry(trip.service_id.clone())
                .or_default()
                .push(i);
            if let Some(block_id) = &trip.block_id {
                indices.trips_by_block.entry(block_id.clone()).or_default().push(i);
            }
        }
        if let Some(calendar) = &feed.calendar {
            for (i, service) in calendar.rows.iter().enumerate() {
                indices
                    .service_ids_from_calendar
                    .insert(service.service_id.clone(), i);
            }
        }
        if let Some(calendar_dates) = &feed.calendar_dates {
            for (i, exception) in calendar_dates.rows.iter().enumerate() {
                indices
                    .service_ids_from_calendar_dates
                    .entry(exception.service_id.clone())
                    .or_default()
                    .push(i);
            }
        }
        if let Some(shapes) = &feed.shapes {
            for (i, point) in shapes.rows.iter().enumerate() {
                indices.shape_ids.entry(point.shape_id.clone()).or_default().push(i);
            }
        }
        if let Some(fare_attributes) = &feed.fare_attributes {
            for (i, fare) in fare_attributes.rows.iter().enumerate() {
                indices.fare_ids.insert(fare.fare_id.clone(), i);
            }
        }
        if let Some(levels) = &feed.levels {
            for (i, level) in levels.rows.iter().enumerate() {
                indices.level_ids.insert(level.level_id.clone(), i);
            }
        }
        for (i, stop_time) in feed.stop_times.rows.iter().enumerate() {
            indices
                .stop_times_by_trip
                .entry(stop_time.trip_id.clone())
                .or_default()
                .push(i);
        }

        indices.active_dates = build_active_dates(feed);

        indices
    }

    pub fn has_service(&self, service_id: &str) -> bool {
        self.service_ids_from_calendar.contains_key(service_id)
            || self
                .service_ids_from_calendar_dates
                .contains_key(service_id)
    }
}

/// Caps how many days a single `calendar.txt` row can expand to. GTFS
/// calendars conventionally span a year or two; a row spanning centuries
/// (a malformed or placeholder date range) would otherwise blow up memory.
const MAX_CALENDAR_EXPANSION_DAYS: i64 = 5 * 365;

fn build_active_dates(feed: &GtfsFeed) -> HashMap<CompactString, BTreeSet<NaiveDate>> {
    let mut active: HashMap<CompactString, BTreeSet<NaiveDate>> = HashMap::new();

    if let Some(calendar) = &feed.calendar {
        for service in &calendar.rows {
            let (Some(start), Some(end)) =
                (service.start_date.to_naive(), service.end_date.to_naive())
            else {
                continue;
            };
            if end < start || (end - start).num_days() > MAX_CALENDAR_EXPANSION_DAYS {
                continue;
            }
            let dates = active
                .entry(CompactString::from(service.service_id.as_str()))
                .or_default();
            let mut day = start;
            while day <= end {
                if service.available_on_weekday(day.weekday()) {
                    dates.insert(day);
                }
                day = match day.checked_add_days(Days::new(1)) {
                    Some(next) => next,
                    None => break,
                };
            }
        }
    }

    if let Some(calendar_dates) = &feed.calendar_dates {
        for exception in &calendar_dates.rows {
            let Some(date) = exception.date.to_naive() else {
                continue;
            };
            let dates = active
                .entry(CompactString::from(exception.service_id.as_str()))
                .or_default();
            match exception.exception_type {
                ExceptionType::Added => {
                    dates.insert(date);
                }
                ExceptionType::Removed => {
                    dates.remove(&date);
                }
                ExceptionType::Other => {}
            }
        }
    }

    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::CsvTable;
    use gtfs_model::{Route, RouteType, Stop, Trip};

    #[test]
    fn indexes_stops_routes_and_trips_by_id() {
        let mut feed = GtfsFeed::default();
        feed.stops = CsvTable {
            headers: vec!["stop_id".into()],
            rows: vec![Stop {
                stop_id: "S1".into(),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        feed.routes = CsvTable {
            headers: vec!["route_id".into()],
            rows: vec![Route {
                route_id: "R1".into(),
                route_type: RouteType::Bus,
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        feed.trips = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![Trip {
                route_id: "R1".into(),
                service_id: "SVC".into(),
                trip_id: "T1".into(),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };

        let indices = FeedIndices::build(&feed);
        assert!(indices.stop_ids.contains_key("S1"));
        assert!(indices.route_ids.contains_key("R1"));
        assert_eq!(indices.trips_by_route.get("R1").unwrap().len(), 1);
    }
}
