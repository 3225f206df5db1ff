use crate::feed::{GtfsFeed, TRIPS_FILE};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_BLOCK_TRIPS_OVERLAP: &str = "block_trips_overlap";

/// A trip's first-arrival/last-departure span, used to test whether two
/// trips sharing a `block_id` could physically be the same vehicle.
fn trip_span(feed: &GtfsFeed, indices: &FeedIndices, trip_id: &str) -> Option<(i32, i32)> {
    let rows = indices.stop_times_by_trip.get(trip_id)?;
    let mut min_time = i32::MAX;
    let mut max_time = i32::MIN;
    for &i in rows {
        let stop_time = &feed.stop_times.rows[i];
        if let Some(arrival) = stop_time.arrival_time {
            min_time = min_time.min(arrival.total_seconds());
        }
        if let Some(departure) = stop_time.departure_time {
            max_time = max_time.max(departure.total_seconds());
        }
    }
    if min_time == i32::MAX || max_time == i32::MIN {
        None
    } else {
        Some((min_time, max_time))
    }
}

/// Two trips sharing a `block_id` represent the same physical vehicle
/// running back to back; if their stop_time spans overlap in time the
/// vehicle would have to be in two places at once, and only services that
/// actually run on the same day should be compared.
#[derive(Debug, Default)]
pub struct BlockTripsOverlapValidator;

impl Validator for BlockTripsOverlapValidator {
    fn name(&self) -> &'static str {
        CODE_BLOCK_TRIPS_OVERLAP
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
        for block_trip_indices in indices.trips_by_block.values() {
            if block_trip_indices.len() < 2 {
                continue;
            }

            let mut spans: Vec<(u64, &str, &str, i32, i32)> = Vec::new();
            for &trip_index in block_trip_indices {
                let trip = &feed.trips.rows[trip_index];
                let Some((start, end)) = trip_span(feed, indices, &trip.trip_id) else {
                    continue;
                };
                spans.push((
                    feed.trips.row_numbers[trip_index],
                    trip.trip_id.as_str(),
                    trip.service_id.as_str(),
                    start,
                    end,
                ));
            }
            spans.sort_by_key(|&(_, _, _, start, _)| start);

            for window in spans.windows(2) {
                let (prev_row, prev_trip, prev_service, _, prev_end) = window[0];
                let (row, trip, service, start, _) = window[1];
                let share_a_service_day = indices
                    .active_dates
                    .get(prev_service)
                    .zip(indices.active_dates.get(service))
                    .map(|(a, b)| a.intersection(b).next().is_some())
                    .unwrap_or(true);
                if share_a_service_day && start < prev_end {
                    let mut notice = ValidationNotice::new(
                        CODE_BLOCK_TRIPS_OVERLAP,
                        NoticeSeverity::Error,
                        format!("trips {prev_trip:?} and {trip:?} share block_id and overlap in time"),
                    );
                    notice.file = Some(TRIPS_FILE.to_string());
                    notice.row = Some(row);
                    notice.insert_context_field("prevTripId", prev_trip);
                    notice.insert_context_field("tripId", trip);
                    notice.insert_context_field("prevCsvRowNumber", prev_row);
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
    use gtfs_model::{GtfsTime, StopTime, Trip};

    #[test]
    fn flags_overlapping_trips_sharing_a_block() {
        let mut feed = GtfsFeed::default();
        feed.trips = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                Trip { route_id: "R1".into(), service_id: "SVC".into(), trip_id: "T1".into(), block_id: Some("B1".into()), ..Default::default() },
                Trip { route_id: "R1".into(), service_id: "SVC".into(), trip_id: "T2".into(), block_id: Some("B1".into()), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime { trip_id: "T1".into(), stop_id: "S1".into(), stop_sequence: 1, arrival_time: Some(GtfsTime::from_seconds(0)), departure_time: Some(GtfsTime::from_seconds(3600)), ..Default::default() },
                StopTime { trip_id: "T2".into(), stop_id: "S1".into(), stop_sequence: 1, arrival_time: Some(GtfsTime::from_seconds(1800)), departure_time: Some(GtfsTime::from_seconds(5400)), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        BlockTripsOverlapValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_BLOCK_TRIPS_OVERLAP));
    }

    #[test]
    fn flags_overlapping_trips_on_the_same_block_with_different_service_ids() {
        let mut feed = GtfsFeed::default();
        feed.trips = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                Trip { route_id: "R1".into(), service_id: "WEEKDAY".into(), trip_id: "T1".into(), block_id: Some("B1".into()), ..Default::default() },
                Trip { route_id: "R1".into(), service_id: "WEEKEND".into(), trip_id: "T2".into(), block_id: Some("B1".into()), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime { trip_id: "T1".into(), stop_id: "S1".into(), stop_sequence: 1, arrival_time: Some(GtfsTime::from_seconds(0)), departure_time: Some(GtfsTime::from_seconds(3600)), ..Default::default() },
                StopTime { trip_id: "T2".into(), stop_id: "S1".into(), stop_sequence: 1, arrival_time: Some(GtfsTime::from_seconds(1800)), departure_time: Some(GtfsTime::from_seconds(5400)), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        // Neither service_id appears in calendar/calendar_dates, so there is
        // no active-date evidence either way and the check must default to
        // assuming they could share a service day.
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        BlockTripsOverlapValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_BLOCK_TRIPS_OVERLAP));
    }
}
