use crate::feed::{
    FARE_RULES_FILE, PATHWAYS_FILE, ROUTES_FILE, STOPS_FILE, STOP_TIMES_FILE, TRANSFERS_FILE,
    TRIPS_FILE,
};
use crate::{FeedIndices, GtfsFeed, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_FOREIGN_KEY_VIOLATION: &str = "foreign_key_violation";

/// One declared foreign key: the table/field the value came from, and a
/// lookup closure that checks whether the referenced id exists in the
/// relevant index. Generalizes the GTFS reference graph (`trips.route_id` ->
/// `routes.route_id`, `stop_times.stop_id` -> `stops.stop_id`, and so on)
/// instead of writing one checker function per edge.
struct ForeignKeyDeclaration {
    child_file: &'static str,
    child_field: &'static str,
    parent_file: &'static str,
    parent_field: &'static str,
    references: fn(&GtfsFeed) -> Vec<(u64, String)>,
    exists: fn(&FeedIndices, &str) -> bool,
}

fn declarations() -> Vec<ForeignKeyDeclaration> {
    vec![
        ForeignKeyDeclaration {
            child_file: ROUTES_FILE,
            child_field: "agency_id",
            parent_file: "agency.txt",
            parent_field: "agency_id",
            references: |feed| {
                feed.routes
                    .iter_with_row()
                    .filter_map(|(row, r)| r.agency_id.clone().map(|id| (row, id)))
                    .collect()
            },
            exists: |idx, id| idx.agency_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: TRIPS_FILE,
            child_field: "route_id",
            parent_file: ROUTES_FILE,
            parent_field: "route_id",
            references: |feed| {
                feed.trips
                    .iter_with_row()
                    .map(|(row, t)| (row, t.route_id.clone()))
                    .collect()
            },
            exists: |idx, id| idx.route_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: TRIPS_FILE,
            child_field: "service_id",
            parent_file: "calendar.txt/calendar_dates.txt",
            parent_field: "service_id",
            references: |feed| {
                feed.trips
                    .iter_with_row()
                    .map(|(row, t)| (row, t.service_id.clone()))
                    .collect()
            },
            exists: |idx, id| idx.has_service(id),
        },
        ForeignKeyDeclaration {
            child_file: STOP_TIMES_FILE,
            child_field: "trip_id",
            parent_file: TRIPS_FILE,
            parent_field: "trip_id",
            references: |feed| {
                feed.stop_times
                    .iter_with_row()
                    .map(|(row, st)| (row, st.trip_id.clone()))
                    .collect()
            },
            exists: |idx, id| idx.trip_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: STOP_TIMES_FILE,
            child_field: "stop_id",
            parent_file: STOPS_FILE,
            parent_field: "stop_id",
            references: |feed| {
                feed.stop_times
                    .iter_with_row()
                    .map(|(row, st)| (row, st.stop_id.clone()))
                    .collect()
            },
            exists: |idx, id| idx.stop_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: STOPS_FILE,
            child_field: "parent_station",
            parent_file: STOPS_FILE,
            parent_field: "stop_id",
            references: |feed| {
                feed.stops
                    .iter_with_row()
                    .filter_map(|(row, s)| s.parent_station.clone().map(|id| (row, id)))
                    .collect()
            },
            exists: |idx, id| idx.stop_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: STOPS_FILE,
            child_field: "level_id",
            parent_file: "levels.txt",
            parent_field: "level_id",
            references: |feed| {
                feed.stops
                    .iter_with_row()
                    .filter_map(|(row, s)| s.level_id.clone().map(|id| (row, id)))
                    .collect()
            },
            exists: |idx, id| idx.level_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: FARE_RULES_FILE,
            child_field: "route_id",
            parent_file: ROUTES_FILE,
            parent_field: "route_id",
            references: |feed| {
                feed.fare_rules
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .filter_map(|(row, r)| r.route_id.clone().map(|id| (row, id)))
                            .collect()
                    })
                    .unwrap_or_default()
            },
            exists: |idx, id| idx.route_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: "fare_rules.txt",
            child_field: "fare_id",
            parent_file: "fare_attributes.txt",
            parent_field: "fare_id",
            references: |feed| {
                feed.fare_rules
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .map(|(row, r)| (row, r.fare_id.clone()))
                            .collect()
                    })
                    .unwrap_or_default()
            },
            exists: |idx, id| idx.fare_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: TRANSFERS_FILE,
            child_field: "from_stop_id",
            parent_file: STOPS_FILE,
            parent_field: "stop_id",
            references: |feed| {
                feed.transfers
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .filter_map(|(row, t)| t.from_stop_id.clone().map(|id| (row, id)))
                            .collect()
                    })
                    .unwrap_or_default()
            },
            exists: |idx, id| idx.stop_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: TRANSFERS_FILE,
            child_field: "to_stop_id",
            parent_file: STOPS_FILE,
            parent_field: "stop_id",
            references: |feed| {
                feed.transfers
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .filter_map(|(row, t)| t.to_stop_id.clone().map(|id| (row, id)))
                            .collect()
                    })
                    .unwrap_or_default()
            },
            exists: |idx, id| idx.stop_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: PATHWAYS_FILE,
            child_field: "from_stop_id",
            parent_file: STOPS_FILE,
            parent_field: "stop_id",
            references: |feed| {
                feed.pathways
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .map(|(row, p)| (row, p.from_stop_id.clone()))
                            .collect()
                    })
                    .unwrap_or_default()
            },
            exists: |idx, id| idx.stop_ids.contains_key(id),
        },
        ForeignKeyDeclaration {
            child_file: PATHWAYS_FILE,
            child_field: "to_stop_id",
            parent_file: STOPS_FILE,
            parent_field: "stop_id",
            references: |feed| {
                feed.pathways
                    .as_ref()
                    .map(|table| {
                        table
                            .iter_with_row()
                            .map(|(row, p)| (row, p.to_stop_id.clone()))
                            .collect()
                    })
                    .unwrap_or_default()
            },
            exists: |idx, id| idx.stop_ids.contains_key(id),
        },
    ]
}

#[derive(Debug, Default)]
pub struct ReferentialIntegrityValidator;

impl Validator for ReferentialIntegrityValidator {
    fn name(&self) -> &'static str {
        "referential_integrity"
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
        for decl in declarations() {
            for (row, value) in (decl.references)(feed) {
                if value.is_empty() {
                    continue;
                }
                if !(decl.exists)(indices, &value) {
                    notices.push(foreign_key_notice(&decl, row, &value));
                }
            }
        }
    }
}

fn foreign_key_notice(decl: &ForeignKeyDeclaration, row: u64, value: &str) -> ValidationNotice {
    let mut notice = ValidationNotice::new(
        CODE_FOREIGN_KEY_VIOLATION,
        NoticeSeverity::Error,
        format!(
            "{} references unknown {} {:?}",
            decl.child_file, decl.parent_field, value
        ),
    );
    notice.file = Some(decl.child_file.to_string());
    notice.field = Some(decl.child_field.to_string());
    notice.row = Some(row);
    notice.insert_context_field("childFilename", decl.child_file);
    notice.insert_context_field("childFieldName", decl.child_field);
    notice.insert_context_field("parentFilename", decl.parent_file);
    notice.insert_context_field("parentFieldName", decl.parent_field);
    notice.insert_context_field("fieldValue", value);
    notice.insert_context_field("csvRowNumber", row);
    notice
}
