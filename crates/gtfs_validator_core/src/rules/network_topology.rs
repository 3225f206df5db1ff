use std::collections::{HashMap, HashSet, VecDeque};

use crate::feed::{GtfsFeed, STOPS_FILE};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_FRAGMENTED_NETWORK: &str = "fragmented_network";
const CODE_ISOLATED_STOP: &str = "isolated_stop";
const CODE_NETWORK_HUB: &str = "network_hub";

/// A stop served by this many distinct routes is reported as a network hub.
const HUB_ROUTE_THRESHOLD: usize = 5;

/// A network is "fragmented" once the largest connected component covers
/// less than this share of every stop a trip actually serves.
const FRAGMENTED_COVERAGE_THRESHOLD: f64 = 0.95;

/// Builds the undirected adjacency implied by consecutive stop_times within
/// each trip: an edge between stop A and stop B whenever some trip visits
/// them back to back. Every served stop gets an entry, even an empty one, so
/// a stop with no edges is still visible as a singleton component.
fn build_adjacency(feed: &GtfsFeed, indices: &FeedIndices) -> HashMap<usize, HashSet<usize>> {
    let mut adjacency: HashMap<usize, HashSet<usize>> = HashMap::new();
    for stop_time_indices in indices.stop_times_by_trip.values() {
        let mut ordered: Vec<&gtfs_model::StopTime> = stop_time_indices
            .iter()
            .map(|&i| &feed.stop_times.rows[i])
            .collect();
        ordered.sort_by_key(|st| st.stop_sequence);

        for stop_time in &ordered {
            if let Some(&stop_index) = indices.stop_ids.get(&stop_time.stop_id) {
                adjacency.entry(stop_index).or_default();
            }
        }
        for window in ordered.windows(2) {
            let (Some(&a), Some(&b)) = (
                indices.stop_ids.get(&window[0].stop_id),
                indices.stop_ids.get(&window[1].stop_id),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }
    }
    adjacency
}

/// Counts the distinct routes serving each stop, via the trip each
/// `stop_time` belongs to.
fn routes_per_stop(feed: &GtfsFeed, indices: &FeedIndices) -> HashMap<usize, HashSet<&str>> {
    let mut routes: HashMap<usize, HashSet<&str>> = HashMap::new();
    for stop_time in &feed.stop_times.rows {
        let (Some(&stop_index), Some(&trip_index)) = (
            indices.stop_ids.get(&stop_time.stop_id),
            indices.trip_ids.get(&stop_time.trip_id),
        ) else {
            continue;
        };
        let route_id = feed.trips.rows[trip_index].route_id.as_str();
        routes.entry(stop_index).or_default().insert(route_id);
    }
    routes
}

fn connected_components(adjacency: &HashMap<usize, HashSet<usize>>) -> Vec<Vec<usize>> {
    let mut visited: HashSet<usize> = HashSet::new();
    let mut components = Vec::new();

    for &start in adjacency.keys() {
        if visited.contains(&start) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited.insert(start);
        while let Some(node) = queue.pop_front() {
            component.push(node);
            if let Some(neighbors) = adjacency.get(&node) {
                for &neighbor in neighbors {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        components.push(component);
    }
    components
}

/// Groups every stop reachable from every other stop (via shared-trip
/// adjacency) into connected components. More than one component, with the
/// largest covering less than [`FRAGMENTED_COVERAGE_THRESHOLD`] of all served
/// stops, means the network serves disconnected service areas
/// (`fragmented_network`); a stop with no adjacency at all that some trip
/// still visits in isolation is `isolated_stop`; a stop served by
/// [`HUB_ROUTE_THRESHOLD`] or more distinct routes is reported as a
/// `network_hub`, informationally.
#[derive(Debug, Default)]
pub struct NetworkTopologyValidator;

impl Validator for NetworkTopologyValidator {
    fn name(&self) -> &'static str {
        CODE_FRAGMENTED_NETWORK
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Business
    }

    fn cost_class(&self) -> crate::validator::CostClass {
        crate::validator::CostClass::Expensive
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let adjacency = build_adjacency(feed, indices);
        let components = connected_components(&adjacency);
        let served_stop_count: usize = components.iter().map(|c| c.len()).sum();

        if served_stop_count > 0 {
            let largest = components.iter().map(|c| c.len()).max().unwrap_or(0);
            let coverage = largest as f64 / served_stop_count as f64;
            if components.len() > 1 && coverage < FRAGMENTED_COVERAGE_THRESHOLD {
                let mut notice = ValidationNotice::new(
                    CODE_FRAGMENTED_NETWORK,
                    NoticeSeverity::Warning,
                    format!(
                        "the served stop network splits into {} disconnected groups; the largest covers only {:.1}% of stops",
                        components.len(),
                        coverage * 100.0
                    ),
                );
                notice.insert_context_field("componentCount", components.len());
                notice.insert_context_field("largestComponentCoverage", coverage);
                notices.push(notice);
            }
        }

        for component in &components {
            if component.len() == 1 {
                let stop_index = component[0];
                let stop = &feed.stops.rows[stop_index];
                let mut notice = ValidationNotice::new(
                    CODE_ISOLATED_STOP,
                    NoticeSeverity::Info,
                    format!("stop {:?} is visited by trips but connects to no other stop", stop.stop_id),
                );
                notice.file = Some(STOPS_FILE.to_string());
                notice.insert_context_field("stopId", &stop.stop_id);
                notices.push(notice);
            }
        }

        let routes = routes_per_stop(feed, indices);
        for (&stop_index, serving_routes) in &routes {
            if serving_routes.len() >= HUB_ROUTE_THRESHOLD {
                let stop = &feed.stops.rows[stop_index];
                let mut notice = ValidationNotice::new(
                    CODE_NETWORK_HUB,
                    NoticeSeverity::Info,
                    format!(
                        "stop {:?} is served by {} distinct routes",
                        stop.stop_id,
                        serving_routes.len()
                    ),
                );
                notice.file = Some(STOPS_FILE.to_string());
                notice.insert_context_field("stopId", &stop.stop_id);
                notice.insert_context_field("routeCount", serving_routes.len());
                notices.push(notice);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::CsvTable;
    use gtfs_model::{Stop, StopTime, Trip};

    #[test]
    fn flags_two_disconnected_stop_clusters() {
        let mut feed = GtfsFeed::default();
        feed.stops = CsvTable {
            headers: vec!["stop_id".into()],
            rows: vec!["A", "B", "C", "D"]
                .into_iter()
                .map(|id| Stop { stop_id: id.into(), ..Default::default() })
                .collect(),
            row_numbers: vec![2, 3, 4, 5],
            field_count_mismatches: Vec::new(),
        };
        feed.trips = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                Trip { route_id: "R1".into(), service_id: "SVC".into(), trip_id: "T1".into(), ..Default::default() },
                Trip { route_id: "R1".into(), service_id: "SVC".into(), trip_id: "T2".into(), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime { trip_id: "T1".into(), stop_id: "A".into(), stop_sequence: 1, ..Default::default() },
                StopTime { trip_id: "T1".into(), stop_id: "B".into(), stop_sequence: 2, ..Default::default() },
                StopTime { trip_id: "T2".into(), stop_id: "C".into(), stop_sequence: 1, ..Default::default() },
                StopTime { trip_id: "T2".into(), stop_id: "D".into(), stop_sequence: 2, ..Default::default() },
            ],
            row_numbers: vec![2, 3, 4, 5],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        NetworkTopologyValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_FRAGMENTED_NETWORK));
    }

    #[test]
    fn flags_isolated_stop_with_a_single_stop_trip() {
        let mut feed = GtfsFeed::default();
        feed.stops = CsvTable {
            headers: vec!["stop_id".into()],
            rows: vec!["A", "B", "C"]
                .into_iter()
                .map(|id| Stop { stop_id: id.into(), ..Default::default() })
                .collect(),
            row_numbers: vec![2, 3, 4],
            field_count_mismatches: Vec::new(),
        };
        feed.trips = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                Trip { route_id: "R1".into(), service_id: "SVC".into(), trip_id: "T1".into(), ..Default::default() },
                Trip { route_id: "R1".into(), service_id: "SVC".into(), trip_id: "T2".into(), ..Default::default() },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: vec![
                StopTime { trip_id: "T1".into(), stop_id: "A".into(), stop_sequence: 1, ..Default::default() },
                StopTime { trip_id: "T1".into(), stop_id: "B".into(), stop_sequence: 2, ..Default::default() },
                // T2 visits only C: no adjacent stop_time to pair it with.
                StopTime { trip_id: "T2".into(), stop_id: "C".into(), stop_sequence: 1, ..Default::default() },
            ],
            row_numbers: vec![2, 3, 4],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        NetworkTopologyValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_ISOLATED_STOP));
    }

    #[test]
    fn flags_stop_served_by_many_routes_as_a_hub() {
        let mut feed = GtfsFeed::default();
        feed.stops = CsvTable {
            headers: vec!["stop_id".into()],
            rows: vec!["HUB", "A", "B", "C", "D", "E"]
                .into_iter()
                .map(|id| Stop { stop_id: id.into(), ..Default::default() })
                .collect(),
            row_numbers: vec![2, 3, 4, 5, 6, 7],
            field_count_mismatches: Vec::new(),
        };
        let route_ids = ["R1", "R2", "R3", "R4", "R5"];
        feed.trips = CsvTable {
            headers: vec!["trip_id".into()],
            rows: route_ids
                .iter()
                .enumerate()
                .map(|(i, route_id)| Trip {
                    route_id: (*route_id).into(),
                    service_id: "SVC".into(),
                    trip_id: format!("T{i}"),
                    ..Default::default()
                })
                .collect(),
            row_numbers: (2..(2 + route_ids.len() as u64)).collect(),
            field_count_mismatches: Vec::new(),
        };
        let other_stops = ["A", "B", "C", "D", "E"];
        feed.stop_times = CsvTable {
            headers: vec!["trip_id".into()],
            rows: other_stops
                .iter()
                .enumerate()
                .flat_map(|(i, stop_id)| {
                    vec![
                        StopTime {
                            trip_id: format!("T{i}"),
                            stop_id: "HUB".into(),
                            stop_sequence: 1,
                            ..Default::default()
                        },
                        StopTime {
                            trip_id: format!("T{i}"),
                            stop_id: (*stop_id).into(),
                            stop_sequence: 2,
                            ..Default::default()
                        },
                    ]
                })
                .collect(),
            row_numbers: (2..(2 + 2 * other_stops.len() as u64)).collect(),
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        NetworkTopologyValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_NETWORK_HUB));
    }
}
