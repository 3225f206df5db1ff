use crate::feed::{
    AGENCY_FILE, CALENDAR_DATES_FILE, CALENDAR_FILE, FARE_ATTRIBUTES_FILE, FARE_RULES_FILE,
    FEED_INFO_FILE, FREQUENCIES_FILE, GtfsFeed, LEVELS_FILE, PATHWAYS_FILE, ROUTES_FILE,
    SHAPES_FILE, STOPS_FILE, STOP_TIMES_FILE, TRANSLATIONS_FILE, TRIPS_FILE,
};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_MISSING_REQUIRED_COLUMN: &str = "missing_required_column";
const CODE_WRONG_NUMBER_OF_FIELDS: &str = "wrong_number_of_fields";

/// Declares the columns a file must have, and how to read its parsed header
/// row back out of the feed (`None` when the file wasn't present at all —
/// that case is `missing_required_file`/absent-optional-file territory, not
/// this validator's).
struct RequiredColumnsDeclaration {
    file: &'static str,
    columns: &'static [&'static str],
    headers: fn(&GtfsFeed) -> Option<Vec<String>>,
}

fn declarations() -> Vec<RequiredColumnsDeclaration> {
    vec![
        RequiredColumnsDeclaration {
            file: AGENCY_FILE,
            columns: &["agency_name", "agency_url", "agency_timezone"],
            headers: |feed| Some(feed.agency.headers.clone()).filter(|h| !h.is_empty()),
        },
        RequiredColumnsDeclaration {
            file: STOPS_FILE,
            columns: &["stop_id"],
            headers: |feed| Some(feed.stops.headers.clone()).filter(|h| !h.is_empty()),
        },
        RequiredColumnsDeclaration {
            file: ROUTES_FILE,
            columns: &["route_id", "route_type"],
            headers: |feed| Some(feed.routes.headers.clone()).filter(|h| !h.is_empty()),
        },
        RequiredColumnsDeclaration {
            file: TRIPS_FILE,
            columns: &["route_id", "service_id", "trip_id"],
            headers: |feed| Some(feed.trips.headers.clone()).filter(|h| !h.is_empty()),
        },
        RequiredColumnsDeclaration {
            file: STOP_TIMES_FILE,
            columns: &["trip_id", "stop_id", "stop_sequence"],
            headers: |feed| Some(feed.stop_times.headers.clone()).filter(|h| !h.is_empty()),
        },
        RequiredColumnsDeclaration {
            file: CALENDAR_FILE,
            columns: &[
                "service_id", "monday", "tuesday", "wednesday", "thursday", "friday",
                "saturday", "sunday", "start_date", "end_date",
            ],
            headers: |feed| feed.calendar.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: CALENDAR_DATES_FILE,
            columns: &["service_id", "date", "exception_type"],
            headers: |feed| feed.calendar_dates.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: FARE_ATTRIBUTES_FILE,
            columns: &["fare_id", "price", "currency_type", "payment_method"],
            headers: |feed| feed.fare_attributes.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: FARE_RULES_FILE,
            columns: &["fare_id"],
            headers: |feed| feed.fare_rules.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: SHAPES_FILE,
            columns: &["shape_id", "shape_pt_lat", "shape_pt_lon", "shape_pt_sequence"],
            headers: |feed| feed.shapes.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: FREQUENCIES_FILE,
            columns: &["trip_id", "start_time", "end_time", "headway_secs"],
            headers: |feed| feed.frequencies.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: FEED_INFO_FILE,
            columns: &["feed_publisher_name", "feed_publisher_url", "feed_lang"],
            headers: |feed| feed.feed_info.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: LEVELS_FILE,
            columns: &["level_id", "level_index"],
            headers: |feed| feed.levels.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: PATHWAYS_FILE,
            columns: &[
                "pathway_id", "from_stop_id", "to_stop_id", "pathway_mode", "is_bidirectional",
            ],
            headers: |feed| feed.pathways.as_ref().map(|t| t.headers.clone()),
        },
        RequiredColumnsDeclaration {
            file: TRANSLATIONS_FILE,
            columns: &["table_name", "field_name", "language", "translation"],
            headers: |feed| feed.translations.as_ref().map(|t| t.headers.clone()),
        },
    ]
}

#[derive(Debug, Default)]
pub struct MissingRequiredColumnValidator;

impl Validator for MissingRequiredColumnValidator {
    fn name(&self) -> &'static str {
        CODE_MISSING_REQUIRED_COLUMN
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Structural
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        for decl in declarations() {
            let Some(headers) = (decl.headers)(feed) else {
                continue;
            };
            for column in decl.columns {
                if !headers.iter().any(|h| h == column) {
                    let mut notice = ValidationNotice::new(
                        CODE_MISSING_REQUIRED_COLUMN,
                        NoticeSeverity::Error,
                        format!("{} is missing required column {column:?}", decl.file),
                    );
                    notice.file = Some(decl.file.to_string());
                    notice.field = Some((*column).to_string());
                    notice.insert_context_field("filename", decl.file);
                    notice.insert_context_field("columnName", *column);
                    notices.push(notice);
                }
            }
        }
    }
}

/// Surfaces the field-count mismatches `parse_csv_table` already recorded
/// (rows padded or truncated to the header length) as the notice spec.md
/// assigns to the structural layer rather than the parser itself.
#[derive(Debug, Default)]
pub struct WrongNumberOfFieldsValidator;

impl Validator for WrongNumberOfFieldsValidator {
    fn name(&self) -> &'static str {
        CODE_WRONG_NUMBER_OF_FIELDS
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Structural
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        let mut tables: Vec<(&str, usize, &[(u64, usize)])> = vec![
            (AGENCY_FILE, feed.agency.headers.len(), &feed.agency.field_count_mismatches),
            (STOPS_FILE, feed.stops.headers.len(), &feed.stops.field_count_mismatches),
            (ROUTES_FILE, feed.routes.headers.len(), &feed.routes.field_count_mismatches),
            (TRIPS_FILE, feed.trips.headers.len(), &feed.trips.field_count_mismatches),
            (
                STOP_TIMES_FILE,
                feed.stop_times.headers.len(),
                &feed.stop_times.field_count_mismatches,
            ),
        ];
        if let Some(t) = &feed.calendar {
            tables.push((CALENDAR_FILE, t.headers.len(), &t.field_count_mismatches));
        }
        if let Some(t) = &feed.calendar_dates {
            tables.push((CALENDAR_DATES_FILE, t.headers.len(), &t.field_count_mismatches));
        }
        if let Some(t) = &feed.shapes {
            tables.push((SHAPES_FILE, t.headers.len(), &t.field_count_mismatches));
        }

        for (file, header_len, mismatches) in tables {
            for &(row, actual_len) in mismatches {
                let mut notice = ValidationNotice::new(
                    CODE_WRONG_NUMBER_OF_FIELDS,
                    NoticeSeverity::Error,
                    format!("{file} row {row} has {actual_len} fields, expected {header_len}"),
                );
                notice.file = Some(file.to_string());
                notice.row = Some(row);
                notice.insert_context_field("filename", file);
                notice.insert_context_field("csvRowNumber", row);
                notice.insert_context_field("expectedFieldCount", header_len);
                notice.insert_context_field("actualFieldCount", actual_len);
                notices.push(notice);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::CsvTable;
    use gtfs_model::Agency;

    #[test]
    fn flags_missing_agency_url_and_timezone() {
        let mut feed = GtfsFeed::default();
        feed.agency = CsvTable {
            headers: vec!["agency_id".into(), "agency_name".into()],
            rows: vec![Agency {
                agency_id: Some("A1".into()),
                agency_name: "Test".into(),
                ..Default::default()
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        MissingRequiredColumnValidator.validate(&feed, &indices, &ctx, &notices);

        let missing_columns: Vec<String> = notices
            .iter()
            .filter(|n| n.code == CODE_MISSING_REQUIRED_COLUMN)
            .filter_map(|n| n.field.clone())
            .collect();
        assert_eq!(missing_columns.len(), 2);
        assert!(missing_columns.contains(&"agency_url".to_string()));
        assert!(missing_columns.contains(&"agency_timezone".to_string()));
    }

    #[test]
    fn reports_recorded_field_count_mismatches() {
        let mut feed = GtfsFeed::default();
        feed.stops.headers = vec!["stop_id".into(), "stop_name".into()];
        feed.stops.field_count_mismatches = vec![(3, 1)];
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        WrongNumberOfFieldsValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices
            .iter()
            .any(|n| n.code == CODE_WRONG_NUMBER_OF_FIELDS && n.row == Some(3)));
    }
}
