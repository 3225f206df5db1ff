use crate::feed::{GtfsFeed, PATHWAYS_FILE, STOPS_FILE};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};
use gtfs_model::PathwayMode;

const CODE_NUMBER_OUT_OF_RANGE: &str = "number_out_of_range";
const CODE_MISSING_RECOMMENDED_FIELD: &str = "missing_recommended_field";

fn out_of_range_notice(
    file: &str,
    field: &str,
    row: u64,
    field_type: &str,
    value: impl ToString,
) -> ValidationNotice {
    let value = value.to_string();
    let mut notice = ValidationNotice::new(
        CODE_NUMBER_OUT_OF_RANGE,
        NoticeSeverity::Error,
        format!("{file} row {row} field {field:?} value {value} is out of range"),
    );
    notice.file = Some(file.to_string());
    notice.field = Some(field.to_string());
    notice.row = Some(row);
    notice.insert_context_field("filename", file);
    notice.insert_context_field("fieldName", field);
    notice.insert_context_field("fieldType", field_type);
    notice.insert_context_field("fieldValue", value);
    notice.insert_context_field("csvRowNumber", row);
    notice
}

fn missing_recommended_field_notice(file: &str, field: &str, row: u64) -> ValidationNotice {
    let mut notice = ValidationNotice::new(
        CODE_MISSING_RECOMMENDED_FIELD,
        NoticeSeverity::Warning,
        format!("{file} row {row} is missing recommended field {field:?}"),
    );
    notice.file = Some(file.to_string());
    notice.field = Some(field.to_string());
    notice.row = Some(row);
    notice.insert_context_field("filename", file);
    notice.insert_context_field("fieldName", field);
    notice.insert_context_field("csvRowNumber", row);
    notice
}

/// Checks numeric fields whose valid range is narrower than their type:
/// `stop_lat`/`stop_lon` must be real-world coordinates, and a pathway's
/// `traversal_time` of zero seconds describes a pathway nobody can traverse.
#[derive(Debug, Default)]
pub struct NumberOutOfRangeValidator;

impl Validator for NumberOutOfRangeValidator {
    fn name(&self) -> &'static str {
        CODE_NUMBER_OUT_OF_RANGE
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Semantic
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        for (row, stop) in feed.stops.iter_with_row() {
            if let Some(lat) = stop.stop_lat {
                if !(-90.0..=90.0).contains(&lat) {
                    notices.push(out_of_range_notice(STOPS_FILE, "stop_lat", row, "float", lat));
                }
            }
            if let Some(lon) = stop.stop_lon {
                if !(-180.0..=180.0).contains(&lon) {
                    notices.push(out_of_range_notice(STOPS_FILE, "stop_lon", row, "float", lon));
                }
            }
        }

        if let Some(pathways) = &feed.pathways {
            for (row, pathway) in pathways.iter_with_row() {
                if pathway.traversal_time == Some(0) {
                    notices.push(out_of_range_notice(
                        PATHWAYS_FILE,
                        "traversal_time",
                        row,
                        "integer",
                        0,
                    ));
                }
            }
        }
    }
}

/// `pathways.txt`'s `length` and `stair_count` are conditionally-required by
/// the GTFS reference rather than strictly required: a non-exit-gate pathway
/// should record its length, and a stairs pathway should record its step
/// count, but a feed missing either is incomplete rather than invalid.
#[derive(Debug, Default)]
pub struct MissingRecommendedFieldValidator;

impl Validator for MissingRecommendedFieldValidator {
    fn name(&self) -> &'static str {
        CODE_MISSING_RECOMMENDED_FIELD
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Semantic
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
            if pathway.length.is_none() && pathway.pathway_mode != PathwayMode::ExitGate {
                notices.push(missing_recommended_field_notice(PATHWAYS_FILE, "length", row));
            }
            if pathway.pathway_mode == PathwayMode::Stairs && pathway.stair_count.is_none() {
                notices.push(missing_recommended_field_notice(
                    PATHWAYS_FILE,
                    "stair_count",
                    row,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::CsvTable;
    use gtfs_model::{Pathway, Stop};

    #[test]
    fn flags_out_of_range_coordinates() {
        let mut feed = GtfsFeed::default();
        feed.stops = CsvTable {
            headers: vec!["stop_id".into()],
            rows: vec![Stop {
                stop_id: "S1".into(),
                stop_lat: Some(190.0),
                stop_lon: Some(-181.0),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        NumberOutOfRangeValidator.validate(&feed, &indices, &ctx, &notices);
        let fields: Vec<String> = notices
            .iter()
            .filter(|n| n.code == CODE_NUMBER_OUT_OF_RANGE)
            .filter_map(|n| n.field.clone())
            .collect();
        assert!(fields.contains(&"stop_lat".to_string()));
        assert!(fields.contains(&"stop_lon".to_string()));
    }

    #[test]
    fn accepts_valid_coordinates() {
        let mut feed = GtfsFeed::default();
        feed.stops = CsvTable {
            headers: vec!["stop_id".into()],
            rows: vec![Stop {
                stop_id: "S1".into(),
                stop_lat: Some(47.6),
                stop_lon: Some(-122.3),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        NumberOutOfRangeValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.is_empty());
    }

    #[test]
    fn flags_zero_traversal_time() {
        let mut feed = GtfsFeed::default();
        feed.pathways = Some(CsvTable {
            headers: vec!["pathway_id".into()],
            rows: vec![Pathway {
                pathway_id: "P1".into(),
                traversal_time: Some(0),
                pathway_mode: PathwayMode::Walkway,
                length: Some(1.0),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        NumberOutOfRangeValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_NUMBER_OUT_OF_RANGE));
    }

    #[test]
    fn flags_missing_length_for_non_exit_gate() {
        let mut feed = GtfsFeed::default();
        feed.pathways = Some(CsvTable {
            headers: vec!["pathway_id".into()],
            rows: vec![Pathway {
                pathway_id: "P1".into(),
                pathway_mode: PathwayMode::Walkway,
                length: None,
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        MissingRecommendedFieldValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices
            .iter()
            .any(|n| n.code == CODE_MISSING_RECOMMENDED_FIELD && n.field.as_deref() == Some("length")));
    }

    #[test]
    fn exit_gate_does_not_require_length() {
        let mut feed = GtfsFeed::default();
        feed.pathways = Some(CsvTable {
            headers: vec!["pathway_id".into()],
            rows: vec![Pathway {
                pathway_id: "P1".into(),
                pathway_mode: PathwayMode::ExitGate,
                length: None,
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        MissingRecommendedFieldValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.is_empty());
    }

    #[test]
    fn flags_missing_stair_count_for_stairs() {
        let mut feed = GtfsFeed::default();
        feed.pathways = Some(CsvTable {
            headers: vec!["pathway_id".into()],
            rows: vec![Pathway {
                pathway_id: "P1".into(),
                pathway_mode: PathwayMode::Stairs,
                length: Some(2.0),
                stair_count: None,
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        MissingRecommendedFieldValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(
            |n| n.code == CODE_MISSING_RECOMMENDED_FIELD && n.field.as_deref() == Some("stair_count")
        ));
    }
}
