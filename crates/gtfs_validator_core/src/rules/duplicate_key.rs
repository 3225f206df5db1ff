use std::collections::HashMap;

use crate::feed::{
    AGENCY_FILE, CALENDAR_FILE, FARE_ATTRIBUTES_FILE, FEED_INFO_FILE, LEVELS_FILE, PATHWAYS_FILE,
    ROUTES_FILE, STOPS_FILE, STOP_TIMES_FILE, TRIPS_FILE,
};
use crate::{GtfsFeed, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{FeedIndices, Validator, ValidatorCategory};

const CODE_DUPLICATE_KEY: &str = "duplicate_key";

/// Declares one table's primary (or composite) key so `DuplicateKeyValidator`
/// can check it generically instead of one near-identical block per table —
/// every GTFS table with an identity column follows the same
/// "first occurrence wins, rest are duplicates" rule.
struct KeyDeclaration {
    file: &'static str,
    field_names: &'static [&'static str],
    keys: fn(&GtfsFeed) -> Vec<(u64, Vec<String>)>,
}

fn declarations() -> Vec<KeyDeclaration> {
    vec![
        KeyDeclaration {
            file: AGENCY_FILE,
            field_names: &["agency_id"],
            keys: |feed| {
                feed.agency
                    .iter_with_row()
                    .filter_map(|(row, a)| a.agency_id.clone().map(|id| (row, vec![id])))
                    .collect()
            },
        },
        KeyDeclaration {
            file: STOPS_FILE,
            field_names: &["stop_id"],
            keys: |feed| {
                feed.stops
                    .iter_with_row()
                    .map(|(row, s)| (row, vec![s.stop_id.clone()]))
                    .collect()
            },
        },
        KeyDeclaration {
            file: ROUTES_FILE,
            field_names: &["route_id"],
            keys: |feed| {
                feed.routes
                    .iter_with_row()
                    .map(|(row, r)| (row, vec![r.route_id.clone()]))
                    .collect()
            },
        },
        KeyDeclaration {
            file: TRIPS_FILE,
            field_names: &["trip_id"],
            keys: |feed| {
                feed.trips
                    .iter_with_row()
                    .map(|(row, t)| (row, vec![t.trip_id.clone()]))
                    .collect()
            },
        },
        KeyDeclaration {
            file: STOP_TIMES_FILE,
            field_names: &["trip_id", "stop_sequence"],
            keys: |feed| {
                feed.stop_times
                    .iter_with_row()
                    .map(|(row, st)| (row, vec![st.trip_id.clone(), st.stop_sequence.to_string()]))
                    .collect()
            },
        },
        KeyDeclaration {
            file: CALENDAR_FILE,
            field_names: &["service_id"],
            keys: |feed| {
                feed.calendar
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .map(|(row, c)| (row, vec![c.service_id.clone()]))
                            .collect()
                    })
                    .unwrap_or_default()
            },
        },
        KeyDeclaration {
            file: FARE_ATTRIBUTES_FILE,
            field_names: &["fare_id"],
            keys: |feed| {
                feed.fare_attributes
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .map(|(row, f)| (row, vec![f.fare_id.clone()]))
                            .collect()
                    })
                    .unwrap_or_default()
            },
        },
        KeyDeclaration {
            file: LEVELS_FILE,
            field_names: &["level_id"],
            keys: |feed| {
                feed.levels
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .map(|(row, l)| (row, vec![l.level_id.clone()]))
                            .collect()
                    })
                    .unwrap_or_default()
            },
        },
        KeyDeclaration {
            file: PATHWAYS_FILE,
            field_names: &["pathway_id"],
            keys: |feed| {
                feed.pathways
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .map(|(row, p)| (row, vec![p.pathway_id.clone()]))
                            .collect()
                    })
                    .unwrap_or_default()
            },
        },
        KeyDeclaration {
            file: FEED_INFO_FILE,
            field_names: &["feed_publisher_name"],
            keys: |feed| {
                feed.feed_info
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .map(|(row, _)| (row, vec!["feed_info".to_string()]))
                            .collect()
                    })
                    .unwrap_or_default()
            },
        },
    ]
}

#[derive(Debug, Default)]
pub struct DuplicateKeyValidator;

impl Validator for DuplicateKeyValidator {
    fn name(&self) -> &'static str {
        "duplicate_key"
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
            let mut seen: HashMap<Vec<String>, u64> = HashMap::new();
            for (row, key) in (decl.keys)(feed) {
                if key.iter().any(String::is_empty) {
                    continue;
                }
                if let Some(&first_row) = seen.get(&key) {
                    notices.push(duplicate_key_notice(decl.file, decl.field_names, &key, first_row, row));
                } else {
                    seen.insert(key, row);
                }
            }
        }
    }
}

fn duplicate_key_notice(
    file: &str,
    field_names: &[&str],
    key: &[String],
    old_row: u64,
    new_row: u64,
) -> ValidationNotice {
    let mut notice = ValidationNotice::new(
        CODE_DUPLICATE_KEY,
        NoticeSeverity::Error,
        format!("duplicate key in {file}"),
    );
    notice.file = Some(file.to_string());
    notice.row = Some(new_row);
    notice.insert_context_field("filename", file);
    notice.insert_context_field("fieldName", field_names.join(","));
    notice.insert_context_field("fieldValue", key.join(","));
    notice.insert_context_field("oldCsvRowNumber", old_row);
    notice.insert_context_field("newCsvRowNumber", new_row);
    notice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::CsvTable;
    use gtfs_model::Stop;

    #[test]
    fn flags_second_occurrence_of_duplicate_stop_id() {
        let mut feed = GtfsFeed::default();
        feed.stops = CsvTable {
            headers: vec!["stop_id".into()],
            rows: vec![
                Stop {
                    stop_id: "S1".into(),
                    ..Default::default()
                },
                Stop {
                    stop_id: "S1".into(),
                    ..Default::default()
                },
            ],
            row_numbers: vec![2, 3],
            field_count_mismatches: Vec::new(),
        };

        let validator = DuplicateKeyValidator;
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        validator.validate(&feed, &indices, &ctx, &notices);

        let found: Vec<_> = notices.iter().filter(|n| n.code == CODE_DUPLICATE_KEY).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].row, Some(3));
    }
}
