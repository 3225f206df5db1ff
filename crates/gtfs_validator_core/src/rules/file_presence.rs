use crate::feed::{CALENDAR_DATES_FILE, CALENDAR_FILE, FEED_INFO_FILE, GtfsFeed};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_MISSING_CALENDAR_AND_CALENDAR_DATES: &str = "missing_calendar_and_calendar_dates";

/// `feed_info.txt` isn't required by GTFS, but a feed without it can't report
/// a publisher or a feed version, which every recommended-file check in the
/// catalog flags as a warning.
#[derive(Debug, Default)]
pub struct MissingRecommendedFileValidator;

impl Validator for MissingRecommendedFileValidator {
    fn name(&self) -> &'static str {
        "missing_recommended_file"
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::FilePresence
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        if feed.feed_info.is_none() {
            notices.push_missing_recommended_file(FEED_INFO_FILE);
        }
    }
}

/// GTFS requires at least one of `calendar.txt` or `calendar_dates.txt`; a
/// feed with neither can define no service at all.
#[derive(Debug, Default)]
pub struct MissingCalendarAndCalendarDatesValidator;

impl Validator for MissingCalendarAndCalendarDatesValidator {
    fn name(&self) -> &'static str {
        "missing_calendar_and_calendar_dates"
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::FilePresence
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        if feed.calendar.is_none() && feed.calendar_dates.is_none() {
            let mut notice = ValidationNotice::new(
                CODE_MISSING_CALENDAR_AND_CALENDAR_DATES,
                NoticeSeverity::Error,
                "feed defines no service: neither calendar.txt nor calendar_dates.txt is present",
            );
            notice.insert_context_field("expectedFilenames", vec![CALENDAR_FILE, CALENDAR_DATES_FILE]);
            notices.push(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_feed_with_neither_calendar_file() {
        let feed = GtfsFeed::default();
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        MissingCalendarAndCalendarDatesValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices
            .iter()
            .any(|n| n.code == CODE_MISSING_CALENDAR_AND_CALENDAR_DATES));
    }

    #[test]
    fn silent_when_calendar_dates_present() {
        let mut feed = GtfsFeed::default();
        feed.calendar_dates = Some(crate::csv_io::CsvTable::default());
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        MissingCalendarAndCalendarDatesValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.is_empty());
    }
}
