use crate::feed::{GtfsFeed, SHAPES_FILE};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_SHAPE_INCREASING_DISTANCE: &str = "shape_increasing_distance";
const CODE_UNREALISTIC_SHAPE_DISTANCE: &str = "unrealistic_shape_distance";
const CODE_SINGLE_SHAPE_POINT: &str = "single_shape_point";

/// `shape_dist_traveled` must start at 0 within this tolerance (spec.md §4.5).
const SHAPE_DIST_START_EPSILON: f64 = 1e-3;
/// Default ratio band for `recorded_km / geometric_km`; outside this range
/// the recorded distance and the geometry it's meant to describe disagree
/// too much to be a unit mismatch (spec.md §4.5).
const SHAPE_DISTANCE_RATIO_MIN: f64 = 0.5;
const SHAPE_DISTANCE_RATIO_MAX: f64 = 2.0;

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// A shape whose points don't advance `shape_dist_traveled` monotonically,
/// whose recorded distance diverges wildly from the geometric distance
/// between its points, or which has only one point (too few to describe a
/// path) all point to corrupted shape data rather than a real trip geometry.
#[derive(Debug, Default)]
pub struct ShapeMonotonicityValidator;

impl Validator for ShapeMonotonicityValidator {
    fn name(&self) -> &'static str {
        CODE_SHAPE_INCREASING_DISTANCE
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
        let Some(shapes) = &feed.shapes else {
            return;
        };

        for (shape_id, point_indices) in &indices.shape_ids {
            let mut points: Vec<(u64, &gtfs_model::Shape)> = point_indices
                .iter()
                .map(|&i| (shapes.row_numbers[i], &shapes.rows[i]))
                .collect();
            points.sort_by_key(|(_, point)| point.shape_pt_sequence);

            if let Some((first_row, first_point)) = points.first() {
                if let Some(first_dist) = first_point.shape_dist_traveled {
                    if first_dist.abs() > SHAPE_DIST_START_EPSILON {
                        let mut notice = ValidationNotice::new(
                            CODE_UNREALISTIC_SHAPE_DISTANCE,
                            NoticeSeverity::Warning,
                            format!(
                                "shape {shape_id:?} shape_dist_traveled starts at {first_dist:.3} instead of 0"
                            ),
                        );
                        notice.file = Some(SHAPES_FILE.to_string());
                        notice.row = Some(*first_row);
                        notice.insert_context_field("shapeId", shape_id);
                        notice.insert_context_field("shapeDistTraveled", first_dist);
                        notices.push(notice);
                    }
                }
            }

            if points.len() == 1 {
                let (row, _) = points[0];
                let mut notice = ValidationNotice::new(
                    CODE_SINGLE_SHAPE_POINT,
                    NoticeSeverity::Warning,
                    format!("shape {shape_id:?} has only a single point"),
                );
                notice.file = Some(SHAPES_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("shapeId", shape_id);
                notices.push(notice);
                continue;
            }

            for window in points.windows(2) {
                let (prev_row, prev) = window[0];
                let (row, current) = window[1];

                if let (Some(prev_dist), Some(current_dist)) =
                    (prev.shape_dist_traveled, current.shape_dist_traveled)
                {
                    if current_dist < prev_dist {
                        let mut notice = ValidationNotice::new(
                            CODE_SHAPE_INCREASING_DISTANCE,
                            NoticeSeverity::Error,
                            format!(
                                "shape {shape_id:?} shape_dist_traveled decreases between rows {prev_row} and {row}"
                            ),
                        );
                        notice.file = Some(SHAPES_FILE.to_string());
                        notice.row = Some(row);
                        notice.insert_context_field("shapeId", shape_id);
                        notices.push(notice);
                    }

                    let geometric_km = haversine_km(
                        prev.shape_pt_lat,
                        prev.shape_pt_lon,
                        current.shape_pt_lat,
                        current.shape_pt_lon,
                    );
                    let recorded_km = (current_dist - prev_dist).max(0.0);
                    if geometric_km > 0.05 {
                        let ratio = recorded_km / geometric_km;
                        if !(SHAPE_DISTANCE_RATIO_MIN..=SHAPE_DISTANCE_RATIO_MAX).contains(&ratio)
                        {
                            let mut notice = ValidationNotice::new(
                                CODE_UNREALISTIC_SHAPE_DISTANCE,
                                NoticeSeverity::Warning,
                                format!(
                                    "shape {shape_id:?} records {recorded_km:.2} distance units between rows {prev_row} and {row}, a {ratio:.2}x ratio against the {geometric_km:.2} km of geometric separation"
                                ),
                            );
                            notice.file = Some(SHAPES_FILE.to_string());
                            notice.row = Some(row);
                            notice.insert_context_field("shapeId", shape_id);
                            notice.insert_context_field("ratio", ratio);
                            notices.push(notice);
                        }
                    }
                }
            }
        }
    }
}
