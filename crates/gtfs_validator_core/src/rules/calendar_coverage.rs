use chrono::{Days, NaiveDate};

use crate::feed::{CALENDAR_FILE, GtfsFeed};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_EXPIRED_CALENDAR: &str = "expired_calendar";
const CODE_UNUSED_SERVICE: &str = "unused_service";
const CODE_NO_SERVICE_IN_NEXT_7_OR_30_DAYS: &str = "no_service_in_next_7_or_30_days";
const CODE_FEED_EXPIRATION_DATE: &str = "feed_expiration_date";
const CODE_FEED_SERVICE_DATE: &str = "feed_service_date";

/// Flags `calendar.txt` rows whose date range has already ended, and
/// `service_id`s (from either `calendar.txt` or `calendar_dates.txt`) that no
/// `trip` references at all — both indicate schedule data nobody will ever
/// ride, and a feed has to look at `indices.active_dates`/`trips_by_service`
/// together with `ctx.current_date` to find them.
#[derive(Debug, Default)]
pub struct CalendarCoverageValidator;

impl Validator for CalendarCoverageValidator {
    fn name(&self) -> &'static str {
        CODE_EXPIRED_CALENDAR
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Business
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        if let Some(calendar) = &feed.calendar {
            for (row, service) in calendar.iter_with_row() {
                if let Some(end) = service.end_date.to_naive() {
                    if end < ctx.current_date {
                        let mut notice = ValidationNotice::new(
                            CODE_EXPIRED_CALENDAR,
                            NoticeSeverity::Warning,
                            format!("service {:?} ended on {end}, before the validation date", service.service_id),
                        );
                        notice.file = Some(CALENDAR_FILE.to_string());
                        notice.row = Some(row);
                        notice.insert_context_field("serviceId", &service.service_id);
                        notice.insert_context_field("endDate", end.to_string());
                        notices.push(notice);
                    }
                }
            }
        }

        for service_id in indices.active_dates.keys() {
            if !indices.trips_by_service.contains_key(service_id.as_str()) {
                let mut notice = ValidationNotice::new(
                    CODE_UNUSED_SERVICE,
                    NoticeSeverity::Warning,
                    format!("service {service_id:?} is defined but no trip references it"),
                );
                notice.insert_context_field("serviceId", service_id);
                notices.push(notice);
            }
        }

        if !indices.active_dates.is_empty() {
            let window_end_7 = ctx
                .current_date
                .checked_add_days(Days::new(7))
                .unwrap_or(ctx.current_date);
            let window_end_30 = ctx
                .current_date
                .checked_add_days(Days::new(30))
                .unwrap_or(ctx.current_date);
            let has_service_within = |window_end: NaiveDate| {
                indices.active_dates.values().any(|dates| {
                    dates
                        .iter()
                        .any(|&date| date >= ctx.current_date && date <= window_end)
                })
            };

            if !has_service_within(window_end_30) {
                let mut notice = ValidationNotice::new(
                    CODE_NO_SERVICE_IN_NEXT_7_OR_30_DAYS,
                    NoticeSeverity::Warning,
                    "feed defines no service in the next 30 days",
                );
                notice.insert_context_field("currentDate", ctx.current_date.to_string());
                notice.insert_context_field("windowDays", 30);
                notice.insert_context_field("windowEnd", window_end_30.to_string());
                notices.push(notice);
            } else if !has_service_within(window_end_7) {
                let mut notice = ValidationNotice::new(
                    CODE_NO_SERVICE_IN_NEXT_7_OR_30_DAYS,
                    NoticeSeverity::Warning,
                    "feed defines no service in the next 7 days",
                );
                notice.insert_context_field("currentDate", ctx.current_date.to_string());
                notice.insert_context_field("windowDays", 7);
                notice.insert_context_field("windowEnd", window_end_7.to_string());
                notices.push(notice);
            }
        }

        if let Some(feed_info) = &feed.feed_info {
            for (row, info) in feed_info.iter_with_row() {
                if let Some(end) = info.feed_end_date.and_then(|d| d.to_naive()) {
                    if end < ctx.current_date {
                        let mut notice = ValidationNotice::new(
                            CODE_FEED_EXPIRATION_DATE,
                            NoticeSeverity::Warning,
                            format!("feed_info declares an end date of {end}, which has already passed"),
                        );
                        notice.file = Some(crate::feed::FEED_INFO_FILE.to_string());
                        notice.row = Some(row);
                        notice.insert_context_field("feedEndDate", end.to_string());
                        notices.push(notice);
                    } else if end < ctx.current_date + chrono::Duration::days(7) {
                        let mut notice = ValidationNotice::new(
                            CODE_FEED_EXPIRATION_DATE,
                            NoticeSeverity::Warning,
                            format!("feed_info declares an end date of {end}, within 7 days of the validation date"),
                        );
                        notice.file = Some(crate::feed::FEED_INFO_FILE.to_string());
                        notice.row = Some(row);
                        notice.insert_context_field("feedEndDate", end.to_string());
                        notices.push(notice);
                    }
                }
                if let Some(start) = info.feed_start_date.and_then(|d| d.to_naive()) {
                    if start > ctx.current_date {
                        let mut notice = ValidationNotice::new(
                            CODE_FEED_SERVICE_DATE,
                            NoticeSeverity::Info,
                            format!("feed_info declares a start date of {start}, in the future"),
                        );
                        notice.file = Some(crate::feed::FEED_INFO_FILE.to_string());
                        notice.row = Some(row);
                        notice.insert_context_field("feedStartDate", start.to_string());
                        notices.push(notice);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::CsvTable;
    use gtfs_model::{Calendar, GtfsDate, ServiceAvailability};

    #[test]
    fn flags_calendar_row_whose_end_date_has_passed() {
        let mut feed = GtfsFeed::default();
        feed.calendar = Some(CsvTable {
            headers: vec!["service_id".into()],
            rows: vec![Calendar {
                service_id: "SVC".into(),
                monday: ServiceAvailability::Available,
                tuesday: ServiceAvailability::Available,
                wednesday: ServiceAvailability::Available,
                thursday: ServiceAvailability::Available,
                friday: ServiceAvailability::Available,
                saturday: ServiceAvailability::Unavailable,
                sunday: ServiceAvailability::Unavailable,
                start_date: GtfsDate::from_naive(ctx_date() - chrono::Duration::days(60)),
                end_date: GtfsDate::from_naive(ctx_date() - chrono::Duration::days(30)),
            }],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default().with_current_date(ctx_date());
        let notices = NoticeContainer::new();
        CalendarCoverageValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_EXPIRED_CALENDAR));
        assert!(notices.iter().any(|n| n.code == CODE_NO_SERVICE_IN_NEXT_7_OR_30_DAYS));
    }

    fn ctx_date() -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2026, 7, 29).unwrap()
    }
}
