//! The fixed catalog of validation rules. Each submodule groups a handful of
//! related validators; this module is only responsible for registering every
//! one of them into a [`Scheduler`] in the right dependency order.
//!
//! Dependencies here are deliberately sparse: most rules are independent
//! reads over the shared [`FeedIndices`](crate::indices::FeedIndices) and
//! gain nothing from an explicit edge. Registration order still matters for
//! readability: file-presence checks first, then structural, then semantic,
//! then relational, then business-logic, mirroring the mode-mapping table's
//! category order. (The weekday `0/1` fields that the source validated twice
//! are, here, parsed once into a typed `ServiceAvailability` at CSV
//! deserialization time, so there is no duplicate-notice question to
//! resolve via the dependency graph.)

pub mod block_overlap;
pub mod business_misc;
pub mod calendar_coverage;
pub mod colors;
pub mod duplicate_key;
pub mod field_ranges;
pub mod file_presence;
pub mod network_topology;
pub mod referential_integrity;
pub mod semantic_fields;
pub mod shapes;
pub mod stop_times;
pub mod structural;

use crate::scheduler::Scheduler;

/// Registers every catalog validator. This is what [`crate::default_scheduler`]
/// calls, and what a CLI or embedder should call unless it has a reason to
/// run a narrower custom set.
pub fn register_all(scheduler: &mut Scheduler) {
    // File presence: always first, no dependencies. Cheapest possible checks,
    // and every other category assumes the required-file notices already
    // exist when its own notices are read back by a report.
    scheduler.register(file_presence::MissingRecommendedFileValidator);
    scheduler.register(file_presence::MissingCalendarAndCalendarDatesValidator);

    // Structural: validates shape of the CSVs themselves (columns, field
    // counts).
    scheduler.register(structural::MissingRequiredColumnValidator);
    scheduler.register(structural::WrongNumberOfFieldsValidator);
    scheduler.register(duplicate_key::DuplicateKeyValidator);

    // Single-file semantic: format/range checks on individual fields.
    scheduler.register(semantic_fields::InvalidUrlValidator);
    scheduler.register(semantic_fields::InvalidEmailValidator);
    scheduler.register(semantic_fields::InvalidPhoneNumberValidator);
    scheduler.register(semantic_fields::InvalidTimezoneValidator);
    scheduler.register(semantic_fields::InvalidLanguageCodeValidator);
    scheduler.register(semantic_fields::InvalidCurrencyValidator);
    scheduler.register(field_ranges::NumberOutOfRangeValidator);
    scheduler.register(field_ranges::MissingRecommendedFieldValidator);
    scheduler.register(colors::RouteColorContrastValidator);

    // Cross-file relational: depend on the referring table's own columns
    // being intact, which `missing_required_column` already checked.
    scheduler.register(referential_integrity::ReferentialIntegrityValidator);
    scheduler.register(stop_times::StopTimeOrderingValidator);
    scheduler.register(stop_times::MissingTripEdgeValidator);
    scheduler.register(stop_times::ExcessiveTravelSpeedValidator);
    scheduler.register(shapes::ShapeMonotonicityValidator);
    scheduler.register(block_overlap::BlockTripsOverlapValidator);
    scheduler.register(calendar_coverage::CalendarCoverageValidator);

    // Business logic: the most expensive, most holistic checks.
    scheduler.register(network_topology::NetworkTopologyValidator);
    scheduler.register(business_misc::UnusedEntitiesValidator);
    scheduler.register(business_misc::DuplicateRouteNameValidator);
    scheduler.register(business_misc::DuplicateFareIdValidator);
    scheduler.register(business_misc::AgencyInconsistentTimezoneValidator);
    scheduler.register(business_misc::MatchingFeedAndAgencyLangValidator);
    scheduler.register(business_misc::OverlappingFrequencyValidator);
    scheduler.register(business_misc::PathwayDanglingGenericNodeValidator);
    scheduler.register(business_misc::PathwayLoopValidator);
    scheduler.register(business_misc::MissingLevelIdValidator);
    scheduler.register(business_misc::TransfersValidator);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationContext;
    use crate::feed::GtfsFeed;
    use crate::indices::FeedIndices;

    #[test]
    fn register_all_builds_a_schedulable_catalog() {
        let mut scheduler = Scheduler::new();
        register_all(&mut scheduler);
        assert!(!scheduler.is_empty());

        let feed = GtfsFeed::default();
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = scheduler.run(&feed, &indices, &ctx);
        assert!(!notices
            .iter()
            .any(|n| n.code == "validator_scheduling_error"));
    }
}
