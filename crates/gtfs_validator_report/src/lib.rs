//! The JSON report schema a validation run produces, and the summary builder
//! that assembles one from a [`gtfs_guru_core::ValidationOutcome`].

use gtfs_guru_core::{GtfsFeed, NoticeContainer, NoticeGroup, NoticeSeverity, ValidationMode};
use gtfs_guru_model::GtfsDate;
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Counts of the core entity tables, for a quick sense of feed size without
/// re-reading the feed.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeedCounts {
    pub agencies: usize,
    pub routes: usize,
    pub trips: usize,
    pub stops: usize,
    pub stop_times: usize,
    pub shapes: usize,
    pub services: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    pub feed_path: String,
    #[serde(flatten)]
    pub counts: FeedCounts,
    pub service_date_from: Option<GtfsDate>,
    pub service_date_to: Option<GtfsDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatorInfo {
    pub version: &'static str,
    pub mode: &'static str,
    pub validation_time_seconds: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ValidationCounts {
    pub errors: u64,
    pub warnings: u64,
    pub infos: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub feed_info: FeedInfo,
    pub validator_info: ValidatorInfo,
    pub counts: ValidationCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub summary: ReportSummary,
    pub notices: Vec<NoticeGroup>,
}

impl ValidationReport {
    /// Builds the boundary report from a feed (absent when loading failed
    /// outright), the notices collected during the run, the mode that ran,
    /// and the label/elapsed time the engine recorded for the run.
    pub fn build(
        feed: Option<&GtfsFeed>,
        feed_path: impl Into<String>,
        notices: &NoticeContainer,
        mode: ValidationMode,
        validation_time_seconds: f64,
    ) -> Self {
        let notice_groups = notices.snapshot();
        let counts = count_by_severity(&notice_groups);
        let feed_counts = feed.map(feed_counts_for).unwrap_or(FeedCounts {
            agencies: 0,
            routes: 0,
            trips: 0,
            stops: 0,
            stop_times: 0,
            shapes: 0,
            services: 0,
        });
        let (service_date_from, service_date_to) = feed
            .map(service_date_window)
            .unwrap_or((None, None));

        Self {
            summary: ReportSummary {
                feed_info: FeedInfo {
                    feed_path: feed_path.into(),
                    counts: feed_counts,
                    service_date_from,
                    service_date_to,
                },
                validator_info: ValidatorInfo {
                    version: env!("CARGO_PKG_VERSION"),
                    mode: mode_label(mode),
                    validation_time_seconds,
                },
                counts,
            },
            notices: notice_groups,
        }
    }

    /// A report is passing when no notice reached error severity, regardless
    /// of warning/info volume.
    pub fn is_passing(&self) -> bool {
        self.summary.counts.errors == 0
    }
}

/// Builds a [`ValidationReport`] straight from a finished
/// [`gtfs_guru_core::ValidationOutcome`], the entrypoint the CLI uses.
pub fn build_report(
    outcome: &gtfs_guru_core::ValidationOutcome,
    ctx: &gtfs_guru_core::ValidationContext,
) -> ValidationReport {
    ValidationReport::build(
        outcome.feed.as_ref(),
        outcome.feed_label.clone(),
        &outcome.notices,
        ctx.mode,
        outcome.elapsed_seconds,
    )
}

fn mode_label(mode: ValidationMode) -> &'static str {
    match mode {
        ValidationMode::Performance => "PERFORMANCE",
        ValidationMode::Default => "DEFAULT",
        ValidationMode::Comprehensive => "COMPREHENSIVE",
    }
}

fn count_by_severity(groups: &[NoticeGroup]) -> ValidationCounts {
    let mut counts = ValidationCounts::default();
    for group in groups {
        match group.severity {
            NoticeSeverity::Error => counts.errors += group.total_count,
            NoticeSeverity::Warning => counts.warnings += group.total_count,
            NoticeSeverity::Info => counts.infos += group.total_count,
        }
    }
    counts
}

fn feed_counts_for(feed: &GtfsFeed) -> FeedCounts {
    let mut services: FxHashSet<&str> = FxHashSet::default();
    if let Some(calendar) = feed.calendar.as_ref() {
        services.extend(calendar.rows.iter().map(|row| row.service_id.as_str()));
    }
    if let Some(calendar_dates) = feed.calendar_dates.as_ref() {
        services.extend(calendar_dates.rows.iter().map(|row| row.service_id.as_str()));
    }

    FeedCounts {
        agencies: feed.agency.len(),
        routes: feed.routes.len(),
        trips: feed.trips.len(),
        stops: feed.stops.len(),
        stop_times: feed.stop_times.len(),
        shapes: feed.shapes.as_ref().map(|t| t.len()).unwrap_or(0),
        services: services.len(),
    }
}

/// The earliest/latest service dates a feed declares, across `calendar.txt`'s
/// ranges and `calendar_dates.txt`'s individual exception dates. `None` when
/// the feed declares no service at all.
fn service_date_window(feed: &GtfsFeed) -> (Option<GtfsDate>, Option<GtfsDate>) {
    let mut from: Option<GtfsDate> = None;
    let mut to: Option<GtfsDate> = None;

    let mut consider = |date: GtfsDate| {
        from = Some(match from {
            Some(current) if current <= date => current,
            _ => date,
        });
        to = Some(match to {
            Some(current) if current >= date => current,
            _ => date,
        });
    };

    if let Some(calendar) = feed.calendar.as_ref() {
        for row in &calendar.rows {
            consider(row.start_date);
            consider(row.end_date);
        }
    }
    if let Some(calendar_dates) = feed.calendar_dates.as_ref() {
        for row in &calendar_dates.rows {
            consider(row.date);
        }
    }

    (from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_guru_core::{NoticeContainer, ValidationNotice};

    #[test]
    fn counts_notices_by_severity() {
        let notices = NoticeContainer::new();
        notices.push(ValidationNotice::new(
            "e",
            NoticeSeverity::Error,
            "boom",
        ));
        notices.push(ValidationNotice::new(
            "w",
            NoticeSeverity::Warning,
            "hmm",
        ));
        notices.push(ValidationNotice::new("i", NoticeSeverity::Info, "fyi"));

        let report = ValidationReport::build(None, "feed", &notices, ValidationMode::Default, 1.5);
        assert_eq!(report.summary.counts.errors, 1);
        assert_eq!(report.summary.counts.warnings, 1);
        assert_eq!(report.summary.counts.infos, 1);
        assert!(!report.is_passing());
    }

    #[test]
    fn passing_report_has_no_errors() {
        let notices = NoticeContainer::new();
        notices.push(ValidationNotice::new(
            "w",
            NoticeSeverity::Warning,
            "hmm",
        ));
        let report = ValidationReport::build(None, "feed", &notices, ValidationMode::Default, 0.1);
        assert!(report.is_passing());
    }

    #[test]
    fn derives_service_date_window_from_calendar() {
        let mut feed = GtfsFeed::default();
        let mut calendar = gtfs_guru_core::CsvTable::default();
        calendar.rows.push(gtfs_guru_model::Calendar {
            service_id: "WKDY".to_string(),
            start_date: GtfsDate::parse("20240101").unwrap(),
            end_date: GtfsDate::parse("20241231").unwrap(),
            ..Default::default()
        });
        calendar.row_numbers.push(2);
        feed.calendar = Some(calendar);

        let (from, to) = service_date_window(&feed);
        assert_eq!(from, Some(GtfsDate::parse("20240101").unwrap()));
        assert_eq!(to, Some(GtfsDate::parse("20241231").unwrap()));
    }
}
