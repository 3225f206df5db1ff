use gtfs_model::PickupDropOffType;

use crate::feed::{GtfsFeed, STOP_TIMES_FILE};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_STOP_TIME_DECREASING_TIME: &str = "stop_time_decreasing_time";
const CODE_STOP_TIME_ARRIVAL_AFTER_DEPARTURE: &str = "stop_time_arrival_after_departure";
const CODE_NON_INCREASING_STOP_SEQUENCE: &str = "non_increasing_stop_sequence";
const CODE_DUPLICATE_STOP_SEQUENCE: &str = "duplicate_stop_sequence";
const CODE_EXCESSIVE_TRAVEL_SPEED: &str = "excessive_travel_speed";
const CODE_MISSING_TRIP_EDGE: &str = "missing_trip_edge";

/// Great-circle distance in kilometers (haversine), used to turn consecutive
/// stop coordinates plus a time delta into a travel speed.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// A single trip's `stop_times` sorted by `stop_sequence`, with each row's
/// original `(row_number, index)` preserved. Every validator in this file
/// walks trips this way, so it's built once per trip per run.
fn stop_times_for_trip<'a>(
    feed: &'a GtfsFeed,
    indices: &FeedIndices,
    trip_id: &str,
) -> Vec<(u64, &'a gtfs_model::StopTime)> {
    let Some(rows) = indices.stop_times_by_trip.get(trip_id) else {
        return Vec::new();
    };
    let mut entries: Vec<(u64, &gtfs_model::StopTime)> = rows
        .iter()
        .map(|&i| (feed.stop_times.row_numbers[i], &feed.stop_times.rows[i]))
        .collect();
    entries.sort_by_key(|(_, st)| st.stop_sequence);
    entries
}

/// Walks each trip's `stop_times` in `stop_sequence` order and flags four
/// distinct defects: a repeated `stop_sequence` value, a `stop_sequence` that
/// decreases without repeating, a stop_time that arrives before the previous
/// stop_time departed, and a stop_time that departs before it arrives.
#[derive(Debug, Default)]
pub struct StopTimeOrderingValidator;

impl Validator for StopTimeOrderingValidator {
    fn name(&self) -> &'static str {
        CODE_STOP_TIME_DECREASING_TIME
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
        for trip_id in indices.stop_times_by_trip.keys() {
            let entries = stop_times_for_trip(feed, indices, trip_id);
            let mut previous_sequence: Option<i32> = None;
            let mut previous_departure: Option<(u64, gtfs_model::GtfsTime)> = None;

            for (row, stop_time) in &entries {
                if let Some(previous_sequence) = previous_sequence {
                    if stop_time.stop_sequence == previous_sequence {
                        let mut notice = ValidationNotice::new(
                            CODE_DUPLICATE_STOP_SEQUENCE,
                            NoticeSeverity::Error,
                            format!(
                                "trip {trip_id:?} has more than one stop_time at stop_sequence {}",
                                stop_time.stop_sequence
                            ),
                        );
                        notice.file = Some(STOP_TIMES_FILE.to_string());
                        notice.row = Some(*row);
                        notice.insert_context_field("tripId", trip_id);
                        notice.insert_context_field("stopSequence", stop_time.stop_sequence);
                        notices.push(notice);
                    } else if stop_time.stop_sequence < previous_sequence {
                        let mut notice = ValidationNotice::new(
                            CODE_NON_INCREASING_STOP_SEQUENCE,
                            NoticeSeverity::Error,
                            format!(
                                "trip {trip_id:?} stop_time at row {row} has stop_sequence {} which is lower than the previous stop_sequence {previous_sequence}",
                                stop_time.stop_sequence
                            ),
                        );
                        notice.file = Some(STOP_TIMES_FILE.to_string());
                        notice.row = Some(*row);
                        notice.insert_context_field("tripId", trip_id);
                        notice.insert_context_field("stopSequence", stop_time.stop_sequence);
                        notice.insert_context_field("prevStopSequence", previous_sequence);
                        notices.push(notice);
                    }
                }
                previous_sequence = Some(stop_time.stop_sequence);

                if let Some(arrival) = stop_time.arrival_time {
                    if let Some((prev_row, prev_departure)) = previous_departure {
                        if arrival.total_seconds() < prev_departure.total_seconds() {
                            let mut notice = ValidationNotice::new(
                                CODE_STOP_TIME_DECREASING_TIME,
                                NoticeSeverity::Error,
                                format!(
                                    "trip {trip_id:?} stop_time at row {row} (stop_sequence {}) arrives at {arrival} before the previous stop_time (row {prev_row}) departed at {prev_departure}",
                                    stop_time.stop_sequence
                                ),
                            );
                            notice.file = Some(STOP_TIMES_FILE.to_string());
                            notice.row = Some(*row);
                            notice.insert_context_field("tripId", trip_id);
                            notice.insert_context_field("stopSequence", stop_time.stop_sequence);
                            notice.insert_context_field("prevDepartureTime", prev_departure);
                            notices.push(notice);
                        }
                    }
                }

                let departure = stop_time.departure_time.or(stop_time.arrival_time);
                if let (Some(arrival), Some(departure)) = (stop_time.arrival_time, departure) {
                    if departure.total_seconds() < arrival.total_seconds() {
                        let mut notice = ValidationNotice::new(
                            CODE_STOP_TIME_ARRIVAL_AFTER_DEPARTURE,
                            NoticeSeverity::Error,
                            format!("trip {trip_id:?} stop_time at row {row} departs before it arrives"),
                        );
                        notice.file = Some(STOP_TIMES_FILE.to_string());
                        notice.row = Some(*row);
                        notice.insert_context_field("tripId", trip_id);
                        notices.push(notice);
                    }
                }

                if let Some(departure) = departure {
                    previous_departure = Some((*row, departure));
                }
            }
        }
    }
}

/// Flags trips whose first stop_time has `pickup_type = NoPickup` or whose
/// last has `drop_off_type = NoPickup` — a trip a passenger can neither
/// board nor alight from at its own endpoints.
#[derive(Debug, Default)]
pub struct MissingTripEdgeValidator;

impl Validator for MissingTripEdgeValidator {
    fn name(&self) -> &'static str {
        CODE_MISSING_TRIP_EDGE
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
        for trip_id in indices.stop_times_by_trip.keys() {
            let entries = stop_times_for_trip(feed, indices, trip_id);
            let Some((first_row, first)) = entries.first() else {
                continue;
            };
            let Some((last_row, last)) = entries.last() else {
                continue;
            };

            if first.pickup_type == Some(PickupDropOffType::NoPickup) {
                let mut notice = ValidationNotice::new(
                    CODE_MISSING_TRIP_EDGE,
                    NoticeSeverity::Error,
                    format!("trip {trip_id:?} disallows pickup at its first stop_time"),
                );
                notice.file = Some(STOP_TIMES_FILE.to_string());
                notice.row = Some(*first_row);
                notice.insert_context_field("tripId", trip_id);
                notices.push(notice);
            }
            if last.drop_off_type == Some(PickupDropOffType::NoPickup) {
                let mut notice = ValidationNotice::new(
                    CODE_MISSING_TRIP_EDGE,
                    NoticeSeverity::Error,
                    format!("trip {trip_id:?} disallows drop off at its last stop_time"),
                );
                notice.file = Some(STOP_TIMES_FILE.to_string());
                notice.row = Some(*last_row);
                notice.insert_context_field("tripId", trip_id);
                notices.push(notice);
            }
        }
    }
}

/// Flags consecutive stop_times whose implied travel speed exceeds the
/// route's mode-specific ceiling (`RouteType::max_speed_kph`) — a proxy for
/// stop_sequence or time-field data entry errors rather than a literal speed
/// limit.
#[derive(Debug, Default)]
pub struct ExcessiveTravelSpeedValidator;

impl Validator for ExcessiveTravelSpeedValidator {
    fn name(&self) -> &'static str {
        CODE_EXCESSIVE_TRAVEL_SPEED
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Relational
    }

    fn cost_class(&self) -> crate::validator::CostClass {
        crate::validator::CostClass::Moderate
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        for (trip_id, &trip_index) in &indices.trip_ids {
            let trip = &feed.trips.rows[trip_index];
            let Some(&route_index) = indices.route_ids.get(&trip.route_id) else {
                continue;
            };
            let route_type = feed.routes.rows[route_index].route_type;
            let max_speed = route_type.max_speed_kph();

            let entries = stop_times_for_trip(feed, indices, trip_id);
            for window in entries.windows(2) {
                let (prev_row, prev) = window[0];
                let (row, current) = window[1];
                let (Some(prev_stop), Some(current_stop)) = (
                    indices.stop_ids.get(&prev.stop_id),
                    indices.stop_ids.get(&current.stop_id),
                ) else {
                    continue;
                };
                let prev_stop = &feed.stops.rows[*prev_stop];
                let current_stop = &feed.stops.rows[*current_stop];
                let (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) = (
                    prev_stop.stop_lat,
                    prev_stop.stop_lon,
                    current_stop.stop_lat,
                    current_stop.stop_lon,
                ) else {
                    continue;
                };

                let prev_time = prev.departure_time.or(prev.arrival_time);
                let current_time = current.arrival_time.or(current.departure_time);
                let (Some(prev_time), Some(current_time)) = (prev_time, current_time) else {
                    continue;
                };
                let elapsed_hours =
                    (current_time.total_seconds() - prev_time.total_seconds()) as f64 / 3600.0;
                if elapsed_hours <= 0.0 {
                    continue;
                }

                let distance_km = haversine_km(lat1, lon1, lat2, lon2);
                let speed_kph = distance_km / elapsed_hours;
                if speed_kph > max_speed {
                    let mut notice = ValidationNotice::new(
                        CODE_EXCESSIVE_TRAVEL_SPEED,
                        NoticeSeverity::Warning,
                        format!(
                            "trip {trip_id:?} implies {speed_kph:.1} km/h between rows {prev_row} and {row}, above the {max_speed:.0} km/h ceiling for its route type"
                        ),
                    );
                    notice.file = Some(STOP_TIMES_FILE.to_string());
                    notice.row = Some(row);
                    notice.insert_context_field("tripId", trip_id);
                    notice.insert_context_field("speed", speed_kph);
                    notice.insert_context_field("speedLimit", max_speed);
                    notice.insert_context_field("routeType", route_type.as_i32());
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
    use gtfs_model::{GtfsTime, Route, RouteType, Stop, StopTime, Trip};

    fn build_feed() -> GtfsFeed {
        let mut feed = GtfsFeed::default();
        feed.stops = CsvTable {
            headers: vec!["stop_id".into()],
            rows: vec![
                Stop { stop_id: "S1".into(), stop_lat: Some(0.0), stop_lon: Some(0.0), ..Default::default() },
                Stop { stop_id: "S2".into(), stop_lat: Some(0.0), stop_lon: Some(1.0), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        feed.routes = CsvTable {
            headers: vec!["route_id".into()],
            rows: vec![Route { route_id: "R1".into(), route_type: RouteType::Bus, ..Default::default() }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        feed.trips = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![Trip { route_id: "R1".into(), service_id: "SVC".into(), trip_id: "T1".into(), ..Default::default() }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        feed
    }

    #[test]
    fn flags_departure_before_arrival() {
        let mut feed = build_feed();
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![StopTime {
                trip_id: "T1".into(),
                stop_id: "S1".into(),
                stop_sequence: 1,
                arrival_time: Some(GtfsTime::from_seconds(3700)),
                departure_time: Some(GtfsTime::from_seconds(3600)),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        StopTimeOrderingValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices
            .iter()
            .any(|n| n.code == CODE_STOP_TIME_ARRIVAL_AFTER_DEPARTURE));
    }

    #[test]
    fn flags_decreasing_time_across_stops_with_spec_context() {
        let mut feed = build_feed();
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime {
                    trip_id: "T1".into(),
                    stop_id: "S1".into(),
                    stop_sequence: 1,
                    arrival_time: Some(GtfsTime::from_seconds(8 * 3600)),
                    departure_time: None,
                    ..Default::default()
                },
                StopTime {
                    trip_id: "T1".into(),
                    stop_id: "S2".into(),
                    stop_sequence: 2,
                    arrival_time: Some(GtfsTime::from_seconds(7 * 3600 + 55 * 60)),
                    departure_time: None,
                    ..Default::default()
                },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        StopTimeOrderingValidator.validate(&feed, &indices, &ctx, &notices);

        let notice = notices
            .iter()
            .find(|n| n.code == CODE_STOP_TIME_DECREASING_TIME)
            .expect("expected a stop_time_decreasing_time notice");
        assert_eq!(notice.context["tripId"], serde_json::json!("T1"));
        assert_eq!(notice.context["stopSequence"], serde_json::json!(2));
        assert_eq!(
            notice.context["prevDepartureTime"],
            serde_json::json!("08:00:00")
        );
    }

    #[test]
    fn flags_duplicate_stop_sequence() {
        let mut feed = build_feed();
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime { trip_id: "T1".into(), stop_id: "S1".into(), stop_sequence: 1, arrival_time: Some(GtfsTime::from_seconds(0)), departure_time: Some(GtfsTime::from_seconds(0)), ..Default::default() },
                StopTime { trip_id: "T1".into(), stop_id: "S2".into(), stop_sequence: 1, arrival_time: Some(GtfsTime::from_seconds(60)), departure_time: Some(GtfsTime::from_seconds(60)), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        StopTimeOrderingValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_DUPLICATE_STOP_SEQUENCE));
    }

    #[test]
    fn flags_decreasing_stop_sequence_without_a_duplicate() {
        let mut feed = build_feed();
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime { trip_id: "T1".into(), stop_id: "S1".into(), stop_sequence: 3, arrival_time: Some(GtfsTime::from_seconds(0)), departure_time: Some(GtfsTime::from_seconds(0)), ..Default::default() },
                StopTime { trip_id: "T1".into(), stop_id: "S2".into(), stop_sequence: 2, arrival_time: Some(GtfsTime::from_seconds(60)), departure_time: Some(GtfsTime::from_seconds(60)), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        StopTimeOrderingValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_NON_INCREASING_STOP_SEQUENCE));
    }

    #[test]
    fn strictly_increasing_stop_sequence_is_not_flagged() {
        let mut feed = build_feed();
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime { trip_id: "T1".into(), stop_id: "S1".into(), stop_sequence: 1, arrival_time: Some(GtfsTime::from_seconds(0)), departure_time: Some(GtfsTime::from_seconds(0)), ..Default::default() },
                StopTime { trip_id: "T1".into(), stop_id: "S2".into(), stop_sequence: 2, arrival_time: Some(GtfsTime::from_seconds(60)), departure_time: Some(GtfsTime::from_seconds(60)), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        StopTimeOrderingValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(!notices
            .iter()
            .any(|n| n.code == CODE_NON_INCREASING_STOP_SEQUENCE));
    }

    #[test]
    fn flags_excessive_speed_between_implausibly_close_times() {
        let mut feed = build_feed();
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime { trip_id: "T1".into(), stop_id: "S1".into(), stop_sequence: 1, arrival_time: Some(GtfsTime::from_seconds(0)), departure_time: Some(GtfsTime::from_seconds(0)), ..Default::default() },
                StopTime { trip_id: "T1".into(), stop_id: "S2".into(), stop_sequence: 2, arrival_time: Some(GtfsTime::from_seconds(1)), departure_time: Some(GtfsTime::from_seconds(1)), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        ExcessiveTravelSpeedValidator.validate(&feed, &indices, &ctx, &notices);
        let notice = notices
            .iter()
            .find(|n| n.code == CODE_EXCESSIVE_TRAVEL_SPEED)
            .expect("expected an excessive_travel_speed notice");
        assert!(notice.context.contains_key("speed"));
        assert_eq!(
            notice.context["speedLimit"],
            serde_json::json!(RouteType::Bus.max_speed_kph())
        );
        assert_eq!(
            notice.context["routeType"],
            serde_json::json!(RouteType::Bus.as_i32())
        );
    }
}
